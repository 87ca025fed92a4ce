//! Canva Connect API client for presentation designs.

use aws_sdk_ssm::Client as SsmClient;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{info, warn};

use crate::oauth::{self, CanvaOAuth};
use crate::secrets::{self, canva_params};
use crate::slides::Slide;
use crate::{Error, Result};

pub const CANVA_API_BASE: &str = "https://api.canva.com/rest/v1";
pub const DEFAULT_EXPORT_FORMAT: &str = "pdf";

/// Result of asking Canva for a design.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum DesignOutcome {
    Created {
        design_id: String,
        edit_url: Option<String>,
        view_url: Option<String>,
        title: String,
        slides_count: usize,
        slides_data: Vec<Slide>,
        note: String,
    },
    /// No access token; the slides can still be built by hand.
    ReadyForManualCreation {
        error: String,
        title: String,
        slides_data: Vec<Slide>,
    },
}

#[derive(Debug, Clone, Serialize)]
pub struct ExportResult {
    pub export_id: Option<String>,
    pub status: Option<String>,
    pub download_url: Option<String>,
    pub format: String,
}

#[derive(Debug, Default, Deserialize)]
struct DesignUrls {
    edit_url: Option<String>,
    view_url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CreatedDesign {
    id: String,
    #[serde(default)]
    urls: DesignUrls,
}

#[derive(Debug, Deserialize)]
struct CreateDesignResponse {
    design: CreatedDesign,
}

#[derive(Debug, Default, Deserialize)]
struct ExportUrls {
    download_url: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct ExportJob {
    id: Option<String>,
    status: Option<String>,
    #[serde(default)]
    urls: ExportUrls,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ExportResponse {
    Wrapped { job: ExportJob },
    Flat(ExportJob),
}

/// Canva client holding the current token pair.
pub struct CanvaClient {
    http: reqwest::Client,
    ssm: SsmClient,
    access_token: Option<String>,
    refresh_token: Option<String>,
}

impl CanvaClient {
    /// Load tokens from Parameter Store. Missing tokens are not an error.
    pub async fn load(http: reqwest::Client, ssm: SsmClient) -> Self {
        let access_token = secrets::get_optional_parameter(&ssm, canva_params::ACCESS_TOKEN).await;
        let refresh_token = secrets::get_optional_parameter(&ssm, canva_params::REFRESH_TOKEN).await;
        info!(has_access_token = access_token.is_some(), "Canva client loaded");
        Self {
            http,
            ssm,
            access_token,
            refresh_token,
        }
    }

    pub fn is_authorized(&self) -> bool {
        self.access_token.is_some()
    }

    /// Create a presentation design. An expired token is refreshed once.
    pub async fn create_design(&mut self, title: &str, slides: Vec<Slide>) -> Result<DesignOutcome> {
        let Some(token) = self.access_token.clone() else {
            warn!("Canva access token not configured");
            return Ok(DesignOutcome::ReadyForManualCreation {
                error: "Canva access token not configured".to_string(),
                title: title.to_string(),
                slides_data: slides,
            });
        };

        let body = json!({
            "design_type": {"type": "preset", "name": "presentation"},
            "title": title,
        });

        info!(title, "Creating Canva design");
        let mut response = self.post_design(&token, &body).await?;
        if response.status() == StatusCode::UNAUTHORIZED {
            info!("Canva access token expired, refreshing");
            let token = self.refresh_access_token().await?;
            response = self.post_design(&token, &body).await?;
        }

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Upstream {
                service: "Canva",
                status: status.as_u16(),
                body,
            });
        }

        let created: CreateDesignResponse = response.json().await?;
        info!(design_id = %created.design.id, "Canva design created");
        Ok(DesignOutcome::Created {
            design_id: created.design.id,
            edit_url: created.design.urls.edit_url,
            view_url: created.design.urls.view_url,
            title: title.to_string(),
            slides_count: slides.len(),
            slides_data: slides,
            note: "Design created in Canva. Open edit_url to add and customize the slides.".to_string(),
        })
    }

    async fn post_design(&self, token: &str, body: &serde_json::Value) -> Result<reqwest::Response> {
        Ok(self
            .http
            .post(format!("{}/designs", CANVA_API_BASE))
            .bearer_auth(token)
            .json(body)
            .send()
            .await?)
    }

    async fn refresh_access_token(&mut self) -> Result<String> {
        let refresh_token = self.refresh_token.clone().ok_or_else(|| {
            Error::Config("Canva access token expired; re-authorize the Canva integration".to_string())
        })?;

        let client = CanvaOAuth::load(self.http.clone(), &self.ssm).await?;
        let tokens = client.refresh(&refresh_token).await?;
        if let Err(e) = oauth::store_tokens(&self.ssm, &tokens).await {
            warn!(error = %e, "Could not store refreshed Canva tokens");
        }

        self.access_token = Some(tokens.access_token.clone());
        if let Some(refresh) = tokens.refresh_token {
            self.refresh_token = Some(refresh);
        }
        Ok(tokens.access_token)
    }

    /// Start an export job for a design.
    pub async fn export_design(&self, design_id: &str, format: &str) -> Result<ExportResult> {
        let token = self
            .access_token
            .as_deref()
            .ok_or_else(|| Error::Config("Canva access token not configured".to_string()))?;

        let response = self
            .http
            .post(format!("{}/designs/{}/exports", CANVA_API_BASE, design_id))
            .bearer_auth(token)
            .json(&json!({"format": format, "quality": "print"}))
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

        let parsed: ExportResponse = response.json().await?;
        Ok(export_result(parsed, format))
    }
}

fn export_result(response: ExportResponse, format: &str) -> ExportResult {
    let job = match response {
        ExportResponse::Wrapped { job } => job,
        ExportResponse::Flat(job) => job,
    };
    ExportResult {
        export_id: job.id,
        status: job.status,
        download_url: job.urls.download_url,
        format: format.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_design_response_parses_urls() {
        let parsed: CreateDesignResponse = serde_json::from_str(
            r#"{"design":{"id":"DAF1","title":"x","urls":{"edit_url":"https://canva.test/e","view_url":"https://canva.test/v"}}}"#,
        )
        .unwrap();
        assert_eq!(parsed.design.id, "DAF1");
        assert_eq!(parsed.design.urls.edit_url.as_deref(), Some("https://canva.test/e"));
    }

    #[test]
    fn test_export_response_shapes() {
        let wrapped: ExportResponse =
            serde_json::from_str(r#"{"job":{"id":"e1","status":"in_progress"}}"#).unwrap();
        let result = export_result(wrapped, "pdf");
        assert_eq!(result.export_id.as_deref(), Some("e1"));
        assert_eq!(result.status.as_deref(), Some("in_progress"));
        assert_eq!(result.download_url, None);

        let flat: ExportResponse = serde_json::from_str(
            r#"{"id":"e2","status":"success","urls":{"download_url":"https://dl.test/f.png"}}"#,
        )
        .unwrap();
        let result = export_result(flat, "png");
        assert_eq!(result.download_url.as_deref(), Some("https://dl.test/f.png"));
        assert_eq!(result.format, "png");
    }

    #[test]
    fn test_manual_outcome_serializes_status() {
        let outcome = DesignOutcome::ReadyForManualCreation {
            error: "Canva access token not configured".to_string(),
            title: "Lesson: Untitled".to_string(),
            slides_data: Vec::new(),
        };
        let value = serde_json::to_value(&outcome).unwrap();
        assert_eq!(value["status"], "ready_for_manual_creation");
        assert_eq!(value["slides_data"], serde_json::json!([]));
    }
}
