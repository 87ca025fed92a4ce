//! Configuration management for Lambda functions.

use std::env;

use crate::{Error, Result};

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// Board holding the activity bank
    pub trello_board_id: String,
    /// Board that receives one card per saved lesson plan
    pub lesson_plans_board_id: Option<String>,
    /// List on the lesson plans board where new cards land
    pub active_list_id: Option<String>,
    /// DynamoDB table for lesson plans
    pub lesson_table: Option<String>,
    /// DynamoDB table for feedback
    pub feedback_table: Option<String>,
    /// Shared Google Drive folder with teaching resources
    pub google_drive_folder_id: Option<String>,
    pub business_name: String,
    pub business_website: String,
    /// Canva OAuth redirect URI (the `canva-callback` route)
    pub canva_redirect_uri: Option<String>,
    /// Public URL Trello should call for board events
    pub webhook_callback_url: Option<String>,
    /// Chat completion model
    pub openai_model: String,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            trello_board_id: env::var("TRELLO_BOARD_ID")
                .map_err(|_| Error::Config("TRELLO_BOARD_ID not set".to_string()))?,
            lesson_plans_board_id: optional("TRELLO_LESSON_PLANS_BOARD_ID"),
            active_list_id: optional("TRELLO_ACTIVE_LIST_ID"),
            lesson_table: optional("DYNAMODB_TABLE_NAME"),
            feedback_table: optional("DYNAMODB_FEEDBACK_TABLE_NAME"),
            google_drive_folder_id: optional("GOOGLE_DRIVE_FOLDER_ID"),
            business_name: env::var("BUSINESS_NAME")
                .unwrap_or_else(|_| "Curriculum Design Organization".to_string()),
            business_website: env::var("BUSINESS_WEBSITE")
                .unwrap_or_else(|_| "https://example.com".to_string()),
            canva_redirect_uri: optional("CANVA_REDIRECT_URI"),
            webhook_callback_url: optional("WEBHOOK_CALLBACK_URL"),
            openai_model: env::var("OPENAI_MODEL").unwrap_or_else(|_| "gpt-3.5-turbo".to_string()),
        })
    }

    /// Redirect URI registered with Canva, required by the OAuth flow.
    pub fn require_canva_redirect_uri(&self) -> Result<&str> {
        self.canva_redirect_uri
            .as_deref()
            .ok_or_else(|| Error::Config("CANVA_REDIRECT_URI not set".to_string()))
    }

    /// Whether saved plans should also be mirrored to Trello.
    pub fn lesson_plan_cards_enabled(&self) -> bool {
        self.lesson_plans_board_id.is_some() && self.active_list_id.is_some()
    }
}

/// Unset and blank variables both count as absent.
fn optional(name: &str) -> Option<String> {
    env::var(name).ok().filter(|value| !value.trim().is_empty())
}

/// Whether the process runs inside AWS Lambda.
pub fn running_in_lambda() -> bool {
    env::var("AWS_LAMBDA_FUNCTION_NAME").is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> Config {
        Config {
            trello_board_id: "board1".to_string(),
            lesson_plans_board_id: Some("plans".to_string()),
            active_list_id: None,
            lesson_table: None,
            feedback_table: None,
            google_drive_folder_id: None,
            business_name: "Acme English".to_string(),
            business_website: "https://example.com".to_string(),
            canva_redirect_uri: None,
            webhook_callback_url: None,
            openai_model: "gpt-3.5-turbo".to_string(),
        }
    }

    #[test]
    fn test_canva_redirect_uri_is_required_for_oauth() {
        let mut config = config();
        assert!(matches!(config.require_canva_redirect_uri(), Err(Error::Config(_))));

        config.canva_redirect_uri = Some("https://api.example.com/canva-callback".to_string());
        assert_eq!(
            config.require_canva_redirect_uri().unwrap(),
            "https://api.example.com/canva-callback"
        );
    }

    #[test]
    fn test_lesson_plan_cards_need_board_and_list() {
        let mut config = config();
        assert!(!config.lesson_plan_cards_enabled());
        config.active_list_id = Some("list1".to_string());
        assert!(config.lesson_plan_cards_enabled());
    }
}
