//! AWS Systems Manager Parameter Store integration.

use aws_sdk_ssm::types::ParameterType;
use aws_sdk_ssm::Client as SsmClient;
use std::collections::HashMap;
use std::env;
use std::sync::OnceLock;
use tokio::sync::RwLock;
use tracing::warn;

use crate::config::running_in_lambda;
use crate::{Error, Result};

/// Cached parameters with lazy initialization.
static PARAMETER_CACHE: OnceLock<RwLock<HashMap<String, String>>> = OnceLock::new();

fn get_cache() -> &'static RwLock<HashMap<String, String>> {
    PARAMETER_CACHE.get_or_init(|| RwLock::new(HashMap::new()))
}

/// Parameter names for the Canva integration.
pub mod canva_params {
    pub const CLIENT_ID: &str = "/global/curriculum-designer/canva-client-id";
    pub const CLIENT_SECRET: &str = "/global/curriculum-designer/canva-client-secret";
    pub const ACCESS_TOKEN: &str = "/global/curriculum-designer/canva-access-token";
    pub const REFRESH_TOKEN: &str = "/global/curriculum-designer/canva-refresh-token";
    /// Prefix for PKCE verifiers waiting on their OAuth callback.
    pub const PKCE_PREFIX: &str = "/global/curriculum-designer/canva-pkce/";
}

/// A credential that lives in Parameter Store when deployed and in a plain
/// environment variable locally.
#[derive(Debug, Clone, Copy)]
pub struct SecretKey {
    /// Env var holding the parameter name
    pub param_env: &'static str,
    /// Env var holding the value itself
    pub fallback_env: &'static str,
}

pub const TRELLO_API_KEY: SecretKey = SecretKey {
    param_env: "TRELLO_API_KEY_PARAM",
    fallback_env: "TRELLO_API_KEY",
};
pub const TRELLO_TOKEN: SecretKey = SecretKey {
    param_env: "TRELLO_TOKEN_PARAM",
    fallback_env: "TRELLO_TOKEN",
};
pub const OPENAI_API_KEY: SecretKey = SecretKey {
    param_env: "OPENAI_API_KEY_PARAM",
    fallback_env: "OPENAI_API_KEY",
};
pub const GOOGLE_DRIVE_API_KEY: SecretKey = SecretKey {
    param_env: "GOOGLE_DRIVE_API_KEY_PARAM",
    fallback_env: "GOOGLE_DRIVE_API_KEY",
};

/// Get a parameter value from Parameter Store with caching.
pub async fn get_parameter(client: &SsmClient, name: &str) -> Result<String> {
    // Check cache first
    {
        let cache = get_cache().read().await;
        if let Some(value) = cache.get(name) {
            return Ok(value.clone());
        }
    }

    let response = client
        .get_parameter()
        .name(name)
        .with_decryption(true)
        .send()
        .await
        .map_err(|e| Error::Aws(format!("Failed to get parameter {}: {}", name, e)))?;

    let value = response
        .parameter()
        .and_then(|p| p.value())
        .ok_or_else(|| Error::Aws(format!("Parameter {} has no value", name)))?
        .to_string();

    {
        let mut cache = get_cache().write().await;
        cache.insert(name.to_string(), value.clone());
    }

    Ok(value)
}

/// Get a parameter, treating any failure as absent.
pub async fn get_optional_parameter(client: &SsmClient, name: &str) -> Option<String> {
    match get_parameter(client, name).await {
        Ok(value) if !value.is_empty() => Some(value),
        Ok(_) => None,
        Err(e) => {
            warn!(parameter = name, error = %e, "Parameter unavailable");
            None
        }
    }
}

/// Write a SecureString parameter, overwriting any previous value.
pub async fn put_parameter(client: &SsmClient, name: &str, value: &str) -> Result<()> {
    client
        .put_parameter()
        .name(name)
        .value(value)
        .r#type(ParameterType::SecureString)
        .overwrite(true)
        .send()
        .await
        .map_err(|e| Error::Aws(format!("Failed to store parameter {}: {}", name, e)))?;

    let mut cache = get_cache().write().await;
    cache.insert(name.to_string(), value.to_string());
    Ok(())
}

/// Delete a parameter. Missing parameters are not an error.
pub async fn delete_parameter(client: &SsmClient, name: &str) -> Result<()> {
    {
        let mut cache = get_cache().write().await;
        cache.remove(name);
    }

    match client.delete_parameter().name(name).send().await {
        Ok(_) => Ok(()),
        Err(e) if e.to_string().contains("ParameterNotFound") => Ok(()),
        Err(e) => Err(Error::Aws(format!("Failed to delete parameter {}: {}", name, e))),
    }
}

/// Resolve a credential: Parameter Store inside Lambda, env var otherwise or on failure.
pub async fn resolve(client: &SsmClient, key: SecretKey) -> Option<String> {
    if running_in_lambda() {
        if let Ok(param_name) = env::var(key.param_env) {
            if !param_name.is_empty() {
                match get_parameter(client, &param_name).await {
                    Ok(value) => return Some(value),
                    Err(e) => {
                        warn!(parameter = %param_name, error = %e, "Falling back to environment");
                    }
                }
            }
        }
    }
    from_env(key)
}

fn from_env(key: SecretKey) -> Option<String> {
    env::var(key.fallback_env).ok().filter(|v| !v.is_empty())
}

/// Third-party credentials used by the Lambdas.
#[derive(Clone, Default)]
pub struct Credentials {
    pub trello_api_key: Option<String>,
    pub trello_token: Option<String>,
    pub openai_api_key: Option<String>,
    pub google_drive_api_key: Option<String>,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("trello_api_key", &self.trello_api_key.is_some())
            .field("trello_token", &self.trello_token.is_some())
            .field("openai_api_key", &self.openai_api_key.is_some())
            .field("google_drive_api_key", &self.google_drive_api_key.is_some())
            .finish()
    }
}

impl Credentials {
    pub async fn load(client: &SsmClient) -> Self {
        Self {
            trello_api_key: resolve(client, TRELLO_API_KEY).await,
            trello_token: resolve(client, TRELLO_TOKEN).await,
            openai_api_key: resolve(client, OPENAI_API_KEY).await,
            google_drive_api_key: resolve(client, GOOGLE_DRIVE_API_KEY).await,
        }
    }

    pub fn trello_ready(&self) -> bool {
        self.trello_api_key.is_some() && self.trello_token.is_some()
    }

    pub fn openai_ready(&self) -> bool {
        self.openai_api_key.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_env_fallback_ignores_blank_values() {
        let key = SecretKey {
            param_env: "CURRICULUM_TEST_SECRET_PARAM",
            fallback_env: "CURRICULUM_TEST_SECRET",
        };
        env::set_var("CURRICULUM_TEST_SECRET", "");
        assert_eq!(from_env(key), None);
        env::set_var("CURRICULUM_TEST_SECRET", "abc123");
        assert_eq!(from_env(key).as_deref(), Some("abc123"));
        env::remove_var("CURRICULUM_TEST_SECRET");
    }

    #[test]
    fn test_debug_hides_credential_values() {
        let creds = Credentials {
            trello_api_key: Some("super-secret".to_string()),
            ..Default::default()
        };
        let printed = format!("{:?}", creds);
        assert!(!printed.contains("super-secret"));
        assert!(printed.contains("trello_api_key: true"));
        assert!(!creds.trello_ready());
    }
}
