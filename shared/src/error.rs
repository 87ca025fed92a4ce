//! Error types for Curriculum Designer Lambda functions.

use thiserror::Error;

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in Curriculum Designer Lambda functions.
#[derive(Error, Debug)]
pub enum Error {
    /// AWS SDK error
    #[error("AWS error: {0}")]
    Aws(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Validation error
    #[error("Validation error: {0}")]
    Validation(String),

    /// Not found error
    #[error("Not found: {0}")]
    NotFound(String),

    /// The level/focus filter left nothing to build a lesson from
    #[error("{}", no_matching_message(.level, .focus_area.as_deref()))]
    NoMatchingActivities {
        level: String,
        focus_area: Option<String>,
    },

    /// A third-party API answered with a non-success status
    #[error("{service} API error: {status} {body}")]
    Upstream {
        service: &'static str,
        status: u16,
        body: String,
    },

    /// Transport error talking to a third-party API
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

fn no_matching_message(level: &str, focus_area: Option<&str>) -> String {
    match focus_area {
        Some(focus) => format!(
            "No activities found for level '{}' and category '{}'",
            level, focus
        ),
        None => format!("No activities found for level '{}'", level),
    }
}

impl Error {
    /// Get HTTP status code for this error.
    pub fn status_code(&self) -> u16 {
        match self {
            Error::Validation(_) => 400,
            Error::NotFound(_) | Error::NoMatchingActivities { .. } => 404,
            Error::Upstream { .. } | Error::Http(_) => 502,
            _ => 500,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_matching_message_includes_criteria() {
        let err = Error::NoMatchingActivities {
            level: "native".to_string(),
            focus_area: None,
        };
        assert_eq!(err.to_string(), "No activities found for level 'native'");

        let err = Error::NoMatchingActivities {
            level: "beginner".to_string(),
            focus_area: Some("Grammar".to_string()),
        };
        assert_eq!(
            err.to_string(),
            "No activities found for level 'beginner' and category 'Grammar'"
        );
        assert_eq!(err.status_code(), 404);
    }
}
