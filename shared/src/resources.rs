//! Teaching resources outside the activity board: Google Drive files and
//! business context.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{info, warn};

use crate::models::Activity;
use crate::{Error, Result};

pub const DRIVE_FILES_URL: &str = "https://www.googleapis.com/drive/v3/files";
const PLACEHOLDER_WEBSITE: &str = "https://example.com";
const WEBSITE_PROBE_TIMEOUT: Duration = Duration::from_secs(10);
const SUMMARY_SAMPLE: usize = 5;

/// File in the shared resources folder.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DriveFile {
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub mime_type: String,
    pub size: String,
    pub modified: String,
    pub url: String,
    pub is_document: bool,
    pub is_spreadsheet: bool,
    pub is_presentation: bool,
    pub is_pdf: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawDriveFile {
    id: String,
    name: String,
    mime_type: String,
    size: Option<String>,
    #[serde(default)]
    modified_time: String,
    #[serde(default)]
    web_view_link: String,
}

#[derive(Debug, Deserialize)]
struct DriveListing {
    #[serde(default)]
    files: Vec<RawDriveFile>,
}

impl From<RawDriveFile> for DriveFile {
    fn from(raw: RawDriveFile) -> Self {
        let mime = raw.mime_type.as_str();
        Self {
            is_document: mime.contains("document"),
            is_spreadsheet: mime.contains("spreadsheet"),
            is_presentation: mime.contains("presentation"),
            is_pdf: mime.contains("pdf"),
            id: raw.id,
            name: raw.name,
            size: raw.size.unwrap_or_else(|| "N/A".to_string()),
            modified: raw.modified_time,
            url: raw.web_view_link,
            mime_type: raw.mime_type,
        }
    }
}

/// Drive search expression for files in `folder_id`, optionally by name.
pub fn drive_query(folder_id: &str, name_filter: Option<&str>) -> String {
    let escape = |s: &str| s.replace('\\', "\\\\").replace('\'', "\\'");
    let mut q = format!("'{}' in parents and trashed=false", escape(folder_id));
    if let Some(name) = name_filter.filter(|n| !n.is_empty()) {
        q.push_str(&format!(" and name contains '{}'", escape(name)));
    }
    q
}

/// Google Drive client scoped to one folder.
#[derive(Clone)]
pub struct DriveClient {
    http: reqwest::Client,
    api_key: String,
    folder_id: String,
}

impl DriveClient {
    pub fn new(http: reqwest::Client, api_key: impl Into<String>, folder_id: impl Into<String>) -> Self {
        Self {
            http,
            api_key: api_key.into(),
            folder_id: folder_id.into(),
        }
    }

    /// Build a client when both the key and folder are configured.
    pub fn configured(http: reqwest::Client, api_key: Option<String>, folder_id: Option<String>) -> Result<Self> {
        match (api_key, folder_id) {
            (Some(key), Some(folder)) => Ok(Self::new(http, key, folder)),
            _ => Err(Error::Config(
                "Google Drive not configured; set GOOGLE_DRIVE_API_KEY and GOOGLE_DRIVE_FOLDER_ID".to_string(),
            )),
        }
    }

    /// Files in the folder, most recently modified first.
    pub async fn list_files(&self, name_filter: Option<&str>) -> Result<Vec<DriveFile>> {
        let query = drive_query(&self.folder_id, name_filter);
        let response = self
            .http
            .get(DRIVE_FILES_URL)
            .query(&[
                ("key", self.api_key.as_str()),
                ("q", query.as_str()),
                ("fields", "files(id,name,mimeType,size,modifiedTime,webViewLink,parents)"),
                ("orderBy", "modifiedTime desc"),
            ])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Upstream {
                service: "Google Drive",
                status: status.as_u16(),
                body,
            });
        }

        let listing: DriveListing = response.json().await?;
        info!(count = listing.files.len(), "Drive files listed");
        Ok(listing.files.into_iter().map(DriveFile::from).collect())
    }
}

/// Who the curriculum is built for.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BusinessContext {
    pub business_name: String,
    pub website: String,
    pub description: String,
    pub services: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub website_status: Option<String>,
}

impl BusinessContext {
    pub fn new(business_name: impl Into<String>, website: impl Into<String>) -> Self {
        Self {
            business_name: business_name.into(),
            website: website.into(),
            description: "Curriculum design and educational content creation".to_string(),
            services: [
                "English language curriculum development",
                "Activity and lesson plan creation",
                "Educational content organization",
                "AI-assisted curriculum design",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
            website_status: None,
        }
    }

    fn has_real_website(&self) -> bool {
        !self.website.is_empty() && self.website != PLACEHOLDER_WEBSITE
    }

    /// Check whether the website answers. The placeholder site is never probed.
    pub async fn probe_website(mut self, http: &reqwest::Client) -> Self {
        if !self.has_real_website() {
            return self;
        }
        let status = match http.get(&self.website).timeout(WEBSITE_PROBE_TIMEOUT).send().await {
            Ok(response) if response.status().is_success() => "accessible".to_string(),
            Ok(response) => format!("HTTP {}", response.status().as_u16()),
            Err(e) => {
                warn!(website = %self.website, error = %e, "Website probe failed");
                format!("Error: {}", e)
            }
        };
        self.website_status = Some(status);
        self
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct TrelloSource {
    pub count: usize,
    pub activities: Vec<Activity>,
}

#[derive(Debug, Clone, Serialize)]
pub struct DriveSource {
    pub count: usize,
    pub files: Vec<DriveFile>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Sources {
    pub trello: TrelloSource,
    pub google_drive: DriveSource,
    pub business_context: BusinessContext,
}

#[derive(Debug, Clone, Serialize)]
pub struct ResourceSummary {
    pub total_trello_activities: usize,
    pub total_drive_files: usize,
    pub business_name: String,
    pub last_updated: String,
}

/// Everything known about a topic across all sources.
#[derive(Debug, Clone, Serialize)]
pub struct ComprehensiveResources {
    pub topic: String,
    pub sources: Sources,
    pub summary: ResourceSummary,
}

/// Combine per-source results into one overview with a few samples each.
pub fn summarize(
    topic: Option<&str>,
    mut activities: Vec<Activity>,
    drive: Result<Vec<DriveFile>>,
    business: BusinessContext,
    now: DateTime<Utc>,
) -> ComprehensiveResources {
    let total_activities = activities.len();
    activities.truncate(SUMMARY_SAMPLE);

    let google_drive = match drive {
        Ok(mut files) => {
            let count = files.len();
            files.truncate(SUMMARY_SAMPLE);
            DriveSource { count, files, error: None }
        }
        Err(e) => DriveSource {
            count: 0,
            files: Vec::new(),
            error: Some(e.to_string()),
        },
    };

    let summary = ResourceSummary {
        total_trello_activities: total_activities,
        total_drive_files: google_drive.count,
        business_name: business.business_name.clone(),
        last_updated: now.to_rfc3339(),
    };

    ComprehensiveResources {
        topic: topic.unwrap_or("all").to_string(),
        sources: Sources {
            trello: TrelloSource {
                count: total_activities,
                activities,
            },
            google_drive,
            business_context: business,
        },
        summary,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn activity(name: &str) -> Activity {
        Activity {
            id: name.to_string(),
            name: name.to_string(),
            description: String::new(),
            url: None,
            list_name: "Unknown".to_string(),
            level: "beginner".to_string(),
            duration_minutes: 20,
            category: "general".to_string(),
            materials: String::new(),
            tags: Vec::new(),
            parsed_fields: Default::default(),
        }
    }

    #[test]
    fn test_drive_query_escapes_quotes() {
        assert_eq!(drive_query("F1", None), "'F1' in parents and trashed=false");
        assert_eq!(
            drive_query("F1", Some("teacher's notes")),
            "'F1' in parents and trashed=false and name contains 'teacher\\'s notes'"
        );
    }

    #[test]
    fn test_drive_file_flags_from_mime_type() {
        let listing: DriveListing = serde_json::from_str(
            r#"{"files":[{"id":"1","name":"Unit 3","mimeType":"application/vnd.google-apps.presentation",
                          "modifiedTime":"2025-01-01T00:00:00Z","webViewLink":"https://drive.test/1"},
                         {"id":"2","name":"Scan","mimeType":"application/pdf","size":"1024"}]}"#,
        )
        .unwrap();
        let files: Vec<DriveFile> = listing.files.into_iter().map(DriveFile::from).collect();
        assert!(files[0].is_presentation && !files[0].is_pdf);
        assert_eq!(files[0].size, "N/A");
        assert!(files[1].is_pdf);
        assert_eq!(files[1].size, "1024");
    }

    #[test]
    fn test_drive_requires_configuration() {
        let err = DriveClient::configured(reqwest::Client::new(), Some("k".to_string()), None).err();
        assert!(matches!(err, Some(Error::Config(_))));
    }

    #[tokio::test]
    async fn test_placeholder_website_is_not_probed() {
        let context = BusinessContext::new("Acme English", PLACEHOLDER_WEBSITE)
            .probe_website(&reqwest::Client::new())
            .await;
        assert_eq!(context.website_status, None);
        assert_eq!(context.services.len(), 4);
    }

    #[test]
    fn test_summary_samples_and_counts() {
        let activities: Vec<Activity> = (0..8).map(|i| activity(&format!("a{i}"))).collect();
        let summary = summarize(
            Some("grammar"),
            activities,
            Err(Error::Config("Google Drive not configured".to_string())),
            BusinessContext::new("Acme English", "https://acme.test"),
            Utc::now(),
        );
        assert_eq!(summary.topic, "grammar");
        assert_eq!(summary.sources.trello.count, 8);
        assert_eq!(summary.sources.trello.activities.len(), 5);
        assert_eq!(summary.summary.total_drive_files, 0);
        assert!(summary.sources.google_drive.error.is_some());
        assert_eq!(summary.summary.business_name, "Acme English");
    }
}
