//! Canva OAuth 2.0 with PKCE.

use aws_sdk_ssm::Client as SsmClient;
use base64::engine::general_purpose::{STANDARD, URL_SAFE_NO_PAD};
use base64::Engine;
use rand::RngCore;
use serde::Deserialize;
use sha2::{Digest, Sha256};
use tracing::{info, warn};

use crate::secrets::{self, canva_params};
use crate::{Error, Result};

pub const AUTHORIZE_URL: &str = "https://www.canva.com/api/oauth/authorize";
pub const TOKEN_URL: &str = "https://api.canva.com/rest/v1/oauth/token";
pub const SCOPES: &str = "design:content:read design:content:write asset:read asset:write";

/// PKCE verifier and its S256 challenge.
#[derive(Debug, Clone)]
pub struct Pkce {
    pub verifier: String,
    pub challenge: String,
}

impl Pkce {
    pub fn generate() -> Self {
        let mut bytes = [0u8; 32];
        rand::thread_rng().fill_bytes(&mut bytes);
        Self::from_verifier(URL_SAFE_NO_PAD.encode(bytes))
    }

    pub fn from_verifier(verifier: String) -> Self {
        let challenge = URL_SAFE_NO_PAD.encode(Sha256::digest(verifier.as_bytes()));
        Self { verifier, challenge }
    }
}

/// Opaque value tying an authorization redirect to its stored verifier.
pub fn generate_state() -> String {
    let mut bytes = [0u8; 16];
    rand::thread_rng().fill_bytes(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}

/// Parameter Store name holding the verifier for `state`.
pub fn verifier_parameter(state: &str) -> String {
    format!("{}{}", canva_params::PKCE_PREFIX, state)
}

pub fn authorization_url(client_id: &str, redirect_uri: &str, challenge: &str, state: &str) -> String {
    format!(
        "{}?client_id={}&response_type=code&redirect_uri={}&scope={}&code_challenge={}&code_challenge_method=S256&state={}",
        AUTHORIZE_URL,
        urlencoding::encode(client_id),
        urlencoding::encode(redirect_uri),
        urlencoding::encode(SCOPES),
        urlencoding::encode(challenge),
        urlencoding::encode(state),
    )
}

/// Canva token endpoint response.
#[derive(Debug, Clone, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub refresh_token: Option<String>,
    pub expires_in: Option<i64>,
    pub token_type: Option<String>,
    pub scope: Option<String>,
}

/// Confidential client credentials for the token endpoint.
#[derive(Clone)]
pub struct CanvaOAuth {
    http: reqwest::Client,
    client_id: String,
    client_secret: String,
}

impl std::fmt::Debug for CanvaOAuth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CanvaOAuth")
            .field("client_id", &self.client_id)
            .finish_non_exhaustive()
    }
}

impl CanvaOAuth {
    pub fn new(http: reqwest::Client, client_id: impl Into<String>, client_secret: impl Into<String>) -> Self {
        Self {
            http,
            client_id: client_id.into(),
            client_secret: client_secret.into(),
        }
    }

    /// Load client credentials from Parameter Store.
    pub async fn load(http: reqwest::Client, ssm: &SsmClient) -> Result<Self> {
        let client_id = secrets::get_parameter(ssm, canva_params::CLIENT_ID).await?;
        let client_secret = secrets::get_parameter(ssm, canva_params::CLIENT_SECRET).await?;
        Ok(Self::new(http, client_id, client_secret))
    }

    pub fn client_id(&self) -> &str {
        &self.client_id
    }

    fn basic_auth_header(&self) -> String {
        let credentials = STANDARD.encode(format!("{}:{}", self.client_id, self.client_secret));
        format!("Basic {}", credentials)
    }

    /// Exchange an authorization code for tokens.
    pub async fn exchange_code(&self, code: &str, verifier: &str, redirect_uri: &str) -> Result<TokenResponse> {
        let params = [
            ("grant_type", "authorization_code"),
            ("code", code),
            ("code_verifier", verifier),
            ("redirect_uri", redirect_uri),
        ];
        self.token_request(&params).await
    }

    /// Trade a refresh token for a new access token.
    pub async fn refresh(&self, refresh_token: &str) -> Result<TokenResponse> {
        let params = [("grant_type", "refresh_token"), ("refresh_token", refresh_token)];
        self.token_request(&params).await
    }

    async fn token_request(&self, params: &[(&str, &str)]) -> Result<TokenResponse> {
        let response = self
            .http
            .post(TOKEN_URL)
            .header("Authorization", self.basic_auth_header())
            .form(params)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Upstream {
                service: "Canva",
                status: status.as_u16(),
                body,
            });
        }
        Ok(response.json().await?)
    }
}

/// Persist tokens so every function picks them up on its next call.
pub async fn store_tokens(ssm: &SsmClient, tokens: &TokenResponse) -> Result<()> {
    secrets::put_parameter(ssm, canva_params::ACCESS_TOKEN, &tokens.access_token).await?;
    match &tokens.refresh_token {
        Some(refresh) => secrets::put_parameter(ssm, canva_params::REFRESH_TOKEN, refresh).await?,
        None => warn!("Token response carried no refresh token"),
    }
    info!("Stored Canva tokens");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_challenge_matches_rfc7636_example() {
        let pkce = Pkce::from_verifier("dBjftJeZ4CVP-mB92K27uhbUJU1p1r_wW1gFWFOEjXk".to_string());
        assert_eq!(pkce.challenge, "E9Melhoa2OwvFrEMTJguCHaoeK1t8URWbuGJSstw-cM");
    }

    #[test]
    fn test_generated_verifier_is_unpadded_url_safe() {
        let pkce = Pkce::generate();
        assert_eq!(pkce.verifier.len(), 43);
        assert!(!pkce.verifier.contains('='));
        assert!(!pkce.verifier.contains('+'));
        assert_ne!(Pkce::generate().verifier, pkce.verifier);
    }

    #[test]
    fn test_authorization_url_carries_pkce_and_scopes() {
        let url = authorization_url("abc", "https://x.test/canva-callback", "chal", "st");
        assert!(url.starts_with(AUTHORIZE_URL));
        assert!(url.contains("code_challenge=chal"));
        assert!(url.contains("code_challenge_method=S256"));
        assert!(url.contains("scope=design%3Acontent%3Aread%20design%3Acontent%3Awrite"));
        assert!(url.contains("redirect_uri=https%3A%2F%2Fx.test%2Fcanva-callback"));
        assert!(url.contains("state=st"));
    }

    #[test]
    fn test_basic_auth_encodes_client_credentials() {
        let oauth = CanvaOAuth::new(reqwest::Client::new(), "id", "secret");
        assert_eq!(oauth.basic_auth_header(), "Basic aWQ6c2VjcmV0");
        assert!(!format!("{:?}", oauth).contains("secret"));
    }

    #[test]
    fn test_verifier_parameter_name() {
        assert_eq!(verifier_parameter("xyz"), "/global/curriculum-designer/canva-pkce/xyz");
    }
}
