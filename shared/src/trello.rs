//! Trello REST client and lesson plan card rendering.

use regex::Regex;
use reqwest::{RequestBuilder, Response};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::OnceLock;
use tracing::info;

use crate::models::{Card, Label};
use crate::{Error, Result};

pub const TRELLO_BASE: &str = "https://api.trello.com/1";

/// Board summary returned by the `/board-structure` route.
#[derive(Debug, Clone, Serialize)]
pub struct BoardStructure {
    pub board_name: Option<String>,
    pub board_description: Option<String>,
    pub board_url: Option<String>,
    pub lists: Vec<BoardList>,
    pub labels: Vec<BoardLabel>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BoardList {
    pub name: String,
    pub id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BoardLabel {
    #[serde(default)]
    pub name: String,
    pub color: Option<String>,
}

#[derive(Debug, Deserialize)]
struct BoardResponse {
    name: Option<String>,
    desc: Option<String>,
    url: Option<String>,
    #[serde(default)]
    lists: Vec<BoardList>,
    #[serde(default)]
    labels: Vec<BoardLabel>,
}

/// Registered Trello webhook.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Webhook {
    pub id: String,
    #[serde(rename = "callbackURL")]
    pub callback_url: String,
    pub id_model: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub active: bool,
}

/// Checklist created on a card.
#[derive(Debug, Clone, Deserialize)]
pub struct Checklist {
    pub id: String,
    #[serde(default)]
    pub name: String,
}

/// Minimal Trello API client authenticated by key and token.
#[derive(Clone)]
pub struct TrelloClient {
    http: reqwest::Client,
    api_key: String,
    token: String,
    base_url: String,
}

impl TrelloClient {
    pub fn new(http: reqwest::Client, api_key: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            http,
            api_key: api_key.into(),
            token: token.into(),
            base_url: TRELLO_BASE.to_string(),
        }
    }

    fn auth(&self, request: RequestBuilder) -> RequestBuilder {
        request.query(&[("key", self.api_key.as_str()), ("token", self.token.as_str())])
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// All cards on a board, with labels and list membership.
    pub async fn board_cards(&self, board_id: &str) -> Result<Vec<Card>> {
        let request = self
            .http
            .get(self.url(&format!("/boards/{}/cards", board_id)))
            .query(&[
                ("fields", "name,desc,labels,list,url,idList"),
                ("list", "true"),
                ("labels", "true"),
            ]);
        let response = check(self.auth(request).send().await?).await?;
        Ok(response.json().await?)
    }

    /// Board name, lists and labels.
    pub async fn board_structure(&self, board_id: &str) -> Result<BoardStructure> {
        let request = self
            .http
            .get(self.url(&format!("/boards/{}", board_id)))
            .query(&[("fields", "name,desc,url"), ("lists", "all"), ("labels", "all")]);
        let response = check(self.auth(request).send().await?).await?;
        let board: BoardResponse = response.json().await?;

        Ok(BoardStructure {
            board_name: board.name,
            board_description: board.desc,
            board_url: board.url,
            lists: board.lists,
            labels: board.labels,
        })
    }

    pub async fn card(&self, card_id: &str) -> Result<Card> {
        let request = self
            .http
            .get(self.url(&format!("/cards/{}", card_id)))
            .query(&[("fields", "name,desc,labels,idList,url"), ("list", "true")]);
        let response = check(self.auth(request).send().await?).await?;
        Ok(response.json().await?)
    }

    pub async fn create_card(&self, list_id: &str, name: &str, desc: &str) -> Result<Card> {
        let request = self
            .http
            .post(self.url("/cards"))
            .query(&[("idList", list_id), ("name", name), ("desc", desc)]);
        let response = check(self.auth(request).send().await?).await?;
        Ok(response.json().await?)
    }

    pub async fn add_comment(&self, card_id: &str, text: &str) -> Result<()> {
        let request = self
            .http
            .post(self.url(&format!("/cards/{}/actions/comments", card_id)))
            .form(&[("text", text)]);
        check(self.auth(request).send().await?).await?;
        info!(card_id, "Posted comment");
        Ok(())
    }

    /// Create a checklist and fill it with items, in order.
    pub async fn add_checklist(&self, card_id: &str, name: &str, items: &[&str]) -> Result<Checklist> {
        let request = self
            .http
            .post(self.url("/checklists"))
            .form(&[("idCard", card_id), ("name", name)]);
        let checklist: Checklist = check(self.auth(request).send().await?).await?.json().await?;

        for item in items {
            let request = self
                .http
                .post(self.url(&format!("/checklists/{}/checkItems", checklist.id)))
                .form(&[("name", *item)]);
            check(self.auth(request).send().await?).await?;
        }
        Ok(checklist)
    }

    pub async fn create_list(&self, board_id: &str, name: &str, pos: u32) -> Result<BoardList> {
        let pos = pos.to_string();
        let request = self
            .http
            .post(self.url("/lists"))
            .form(&[("name", name), ("idBoard", board_id), ("pos", pos.as_str())]);
        Ok(check(self.auth(request).send().await?).await?.json().await?)
    }

    pub async fn create_label(&self, board_id: &str, name: &str, color: &str) -> Result<Label> {
        let request = self
            .http
            .post(self.url("/labels"))
            .form(&[("name", name), ("color", color), ("idBoard", board_id)]);
        Ok(check(self.auth(request).send().await?).await?.json().await?)
    }

    /// Webhooks registered under this token.
    pub async fn list_webhooks(&self) -> Result<Vec<Webhook>> {
        let request = self.http.get(self.url(&format!("/tokens/{}/webhooks", self.token)));
        Ok(check(self.auth(request).send().await?).await?.json().await?)
    }

    pub async fn register_webhook(
        &self,
        callback_url: &str,
        model_id: &str,
        description: &str,
    ) -> Result<Webhook> {
        let request = self.http.post(self.url("/webhooks/")).form(&[
            ("callbackURL", callback_url),
            ("idModel", model_id),
            ("description", description),
        ]);
        Ok(check(self.auth(request).send().await?).await?.json().await?)
    }

    pub async fn delete_webhook(&self, webhook_id: &str) -> Result<()> {
        let request = self.http.delete(self.url(&format!("/webhooks/{}", webhook_id)));
        check(self.auth(request).send().await?).await?;
        Ok(())
    }
}

async fn check(response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(Error::Upstream {
        service: "Trello",
        status: status.as_u16(),
        body,
    })
}

/// Public card URL for a card id.
pub fn card_url(card_id: &str) -> String {
    format!("https://trello.com/c/{}", card_id)
}

/// Card title for a stored lesson plan.
pub fn lesson_plan_card_title(plan: &Value) -> String {
    match plan.get("title").and_then(Value::as_str) {
        Some(title) if !title.is_empty() => title.to_string(),
        _ => format!(
            "Lesson Plan: {}",
            plan.get("focus_area").and_then(Value::as_str).unwrap_or("General")
        ),
    }
}

fn display(value: Option<&Value>) -> Option<String> {
    match value? {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn activity_minutes(activity: &Value) -> Option<String> {
    display(activity.get("duration_minutes")).or_else(|| display(activity.get("duration")))
}

fn push_activity_lines(description: &mut String, heading: &str, activities: &[Value]) {
    description.push_str(&format!("\n\n**{}:**", heading));
    for (i, activity) in activities.iter().enumerate() {
        let n = i + 1;
        let name = display(activity.get("name")).unwrap_or_else(|| format!("Activity {}", n));
        description.push_str(&format!("\n{}. {}", n, name));
        if let Some(minutes) = activity_minutes(activity) {
            description.push_str(&format!(" ({}m)", minutes));
        }
    }
}

/// Markdown description for the Trello card mirroring a saved plan.
pub fn lesson_plan_card_description(plan: &Value, plan_id: &str) -> String {
    let title = lesson_plan_card_title(plan);
    let level = display(plan.get("level")).unwrap_or_else(|| "Unknown".to_string());
    let duration = display(plan.get("duration"))
        .or_else(|| display(plan.get("total_duration_minutes")))
        .or_else(|| display(plan.get("total_duration")))
        .unwrap_or_else(|| "N/A".to_string());

    let mut description = format!(
        "# 📚 {}\n\n**Level:** {}\n**Duration:** {} minutes\n**Plan ID:** {}\n\n## 📋 Structure:\n",
        title, level, duration, plan_id
    );

    let structure = plan.get("structure");
    if let Some(warmup) = structure.and_then(|s| s.get("warmup")).filter(|w| w.is_object()) {
        let name = display(warmup.get("name")).unwrap_or_else(|| "Warm-up activity".to_string());
        description.push_str(&format!("\n**Warm-up:** {}", name));
    }

    let main = structure
        .and_then(|s| s.get("main_activities"))
        .and_then(Value::as_array)
        .filter(|a| !a.is_empty());
    match main {
        Some(activities) => push_activity_lines(&mut description, "Main Activities", activities),
        None => {
            if let Some(activities) = plan
                .get("activities")
                .and_then(Value::as_array)
                .filter(|a| !a.is_empty())
            {
                push_activity_lines(&mut description, "Activities", activities);
            }
        }
    }

    let materials: Vec<&str> = plan
        .get("materials_needed")
        .and_then(Value::as_array)
        .map(|items| items.iter().filter_map(Value::as_str).collect())
        .unwrap_or_default();
    if !materials.is_empty() {
        description.push_str(&format!("\n\n**Materials:** {}", materials.join(", ")));
    }

    description.push_str(&format!(
        "\n\n---\n*Generated by Curriculum Designer*\n*Stored in DynamoDB as: {}*",
        plan_id
    ));
    description
}

fn plan_id_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"\*\*Plan ID:\*\*\s*(\S+)").expect("plan id pattern is valid"))
}

/// Recover the lesson plan id from a mirrored card's description.
pub fn plan_id_from_description(description: &str) -> Option<String> {
    plan_id_pattern()
        .captures(description)
        .map(|caps| caps[1].to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample_plan() -> Value {
        json!({
            "level": "beginner",
            "focus_area": "Grammar",
            "total_duration_minutes": 60,
            "structure": {
                "warmup": {"name": "Two Truths", "duration_minutes": 10},
                "main_activities": [
                    {"name": "Gap Fill", "duration_minutes": 15},
                    {"name": "", "duration_minutes": 25}
                ],
                "cooldown": null
            },
            "materials_needed": ["Worksheet", "Timer"]
        })
    }

    #[test]
    fn test_title_defaults_to_focus_area() {
        assert_eq!(lesson_plan_card_title(&sample_plan()), "Lesson Plan: Grammar");
        assert_eq!(lesson_plan_card_title(&json!({"title": "Week 3"})), "Week 3");
        assert_eq!(lesson_plan_card_title(&json!({})), "Lesson Plan: General");
    }

    #[test]
    fn test_description_lists_structure() {
        let desc = lesson_plan_card_description(&sample_plan(), "lesson_42");
        assert!(desc.contains("**Level:** beginner"));
        assert!(desc.contains("**Duration:** 60 minutes"));
        assert!(desc.contains("**Warm-up:** Two Truths"));
        assert!(desc.contains("\n1. Gap Fill (15m)"));
        assert!(desc.contains("\n2. Activity 2 (25m)"));
        assert!(desc.contains("**Materials:** Worksheet, Timer"));
        assert!(desc.ends_with("*Stored in DynamoDB as: lesson_42*"));
    }

    #[test]
    fn test_free_form_activities_are_listed() {
        let desc = lesson_plan_card_description(
            &json!({"activities": [{"name": "Debate", "duration": 30}]}),
            "p1",
        );
        assert!(desc.contains("**Activities:**\n1. Debate (30m)"));
        assert!(desc.contains("**Duration:** N/A minutes"));
    }

    #[test]
    fn test_plan_id_round_trips_through_description() {
        let desc = lesson_plan_card_description(&sample_plan(), "lesson_1700000000");
        assert_eq!(plan_id_from_description(&desc).as_deref(), Some("lesson_1700000000"));
        assert_eq!(plan_id_from_description("no id here"), None);
    }

    #[test]
    fn test_webhook_deserializes_trello_shape() {
        let hook: Webhook = serde_json::from_value(json!({
            "id": "w1",
            "callbackURL": "https://example.com/webhook",
            "idModel": "board1",
            "active": true
        }))
        .unwrap();
        assert_eq!(hook.callback_url, "https://example.com/webhook");
        assert_eq!(hook.id_model, "board1");
    }
}
