//! OpenAI chat completion client for the teaching assistant.

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::{Error, Result};

pub const OPENAI_CHAT_URL: &str = "https://api.openai.com/v1/chat/completions";

pub const SYSTEM_PROMPT: &str = "You are an English teaching assistant. Help teachers with \
curriculum planning, activity suggestions, and lesson organization. Be practical and concise.";

pub const FALLBACK_REPLY: &str = "Sorry, I couldn't generate a response.";

/// Prefix for every comment the assistant posts.
pub const COMMENT_PREFIX: &str = "🤖 **AI Assistant:**\n\n";

pub const DEFAULT_MAX_TOKENS: u32 = 500;
pub const ANALYSIS_MAX_TOKENS: u32 = 600;

/// Chat message.
#[derive(Debug, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

/// Request to the chat completion endpoint.
#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage>,
    max_tokens: u32,
    temperature: f32,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

/// Client for the teaching assistant.
#[derive(Clone)]
pub struct AssistantClient {
    http: reqwest::Client,
    api_key: String,
    model: String,
}

impl AssistantClient {
    /// Create a new assistant client.
    pub fn new(http: reqwest::Client, api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            http,
            api_key: api_key.into(),
            model: model.into(),
        }
    }

    /// Ask the assistant a question.
    pub async fn complete(&self, prompt: &str, max_tokens: u32) -> Result<String> {
        let request = ChatRequest {
            model: &self.model,
            messages: vec![
                ChatMessage {
                    role: "system".to_string(),
                    content: SYSTEM_PROMPT.to_string(),
                },
                ChatMessage {
                    role: "user".to_string(),
                    content: prompt.to_string(),
                },
            ],
            max_tokens,
            temperature: 0.7,
        };

        let response = self
            .http
            .post(OPENAI_CHAT_URL)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        info!(status = status.as_u16(), "OpenAI response received");
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Upstream {
                service: "OpenAI",
                status: status.as_u16(),
                body,
            });
        }

        let chat: ChatResponse = response.json().await?;
        Ok(first_reply(chat))
    }
}

fn first_reply(chat: ChatResponse) -> String {
    chat.choices
        .into_iter()
        .next()
        .map(|choice| choice.message.content)
        .unwrap_or_else(|| FALLBACK_REPLY.to_string())
}

/// Format an assistant answer as a Trello comment.
pub fn format_comment(reply: &str) -> String {
    format!("{}{}", COMMENT_PREFIX, reply)
}

/// Prompts for each kind of request a teacher can make.
pub mod prompts {
    pub fn general(request: &str, card_name: &str, card_desc: &str) -> String {
        format!(
            "Teacher asks: {}\nContext: Card: {}\nDescription: {}",
            request, card_name, card_desc
        )
    }

    pub fn suggest_activities(level: &str, focus: &str, minutes: u32) -> String {
        format!(
            "Suggest 3-4 English learning activities for:\n\
             - Student level: {level}\n\
             - Focus area: {focus}\n\
             - Total duration: {minutes} minutes\n\n\
             For each activity, provide:\n\
             - Name and brief description\n\
             - Duration (in minutes)\n\
             - Materials needed\n\
             - Learning objectives\n\n\
             Format as a clear, practical list."
        )
    }

    pub fn lesson_plan(activities_text: &str, minutes: u32) -> String {
        format!(
            "Create a {minutes}-minute lesson plan using these activities:\n\
             {activities_text}\n\n\
             Organize into:\n\
             1. Warm-up (5-10 minutes)\n\
             2. Main activities (with timing)\n\
             3. Wrap-up (5 minutes)\n\n\
             Include transitions and timing for each section."
        )
    }

    pub fn analyze_activity(name: &str, description: &str) -> String {
        format!(
            "Analyze this English teaching activity:\n\n\
             Activity: {name}\n\
             Description: {description}\n\n\
             Provide:\n\
             1. Strengths of this activity\n\
             2. Potential improvements\n\
             3. Variations for different levels\n\
             4. What to teach before/after this"
        )
    }

    pub fn alternatives(name: &str, description: &str) -> String {
        format!(
            "Find 3 alternative activities similar to:\n\n\
             Activity: {name}\n\
             Description: {description}\n\n\
             For each alternative, provide:\n\
             - Activity name\n\
             - Brief description\n\
             - Why it's a good alternative\n\
             - Any differences in difficulty/focus"
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_choices_fall_back() {
        let chat: ChatResponse = serde_json::from_str(r#"{"error":{"message":"quota"}}"#).unwrap();
        assert_eq!(first_reply(chat), FALLBACK_REPLY);
    }

    #[test]
    fn test_first_choice_is_used() {
        let chat: ChatResponse = serde_json::from_str(
            r#"{"choices":[{"message":{"role":"assistant","content":"Try a gap fill."}},
                           {"message":{"role":"assistant","content":"ignored"}}]}"#,
        )
        .unwrap();
        assert_eq!(first_reply(chat), "Try a gap fill.");
    }

    #[test]
    fn test_prompts_carry_parameters() {
        let prompt = prompts::suggest_activities("beginner", "speaking", 45);
        assert!(prompt.contains("Student level: beginner"));
        assert!(prompt.contains("Total duration: 45 minutes"));
        assert!(format_comment("hi").starts_with("🤖 **AI Assistant:**"));
    }
}
