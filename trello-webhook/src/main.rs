//! Trello Webhook Lambda - Reacts to activity board events.
//!
//! Trello verifies the callback with a HEAD request, then POSTs every board
//! action. Comments mentioning `@ai` get an assistant reply or are recorded
//! as lesson plan feedback, cards moved to "This Week" get a preparation
//! checklist, and "🤖 AI: Build Lesson" cards get the lesson builder prompt.
//!
//! Every POST is acknowledged with 200 so Trello keeps the webhook active.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use lambda_runtime::{service_fn, Error, LambdaEvent};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use shared::curriculum::BoardReaction;
use shared::models::ListRef;
use shared::CurriculumService;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

/// API Gateway proxy request (simplified)
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct ApiGatewayRequest {
    http_method: String,
    path: String,
    body: Option<String>,
    is_base64_encoded: bool,
}

/// API Gateway proxy response
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ApiGatewayResponse {
    status_code: u16,
    headers: HashMap<String, String>,
    body: String,
    is_base64_encoded: bool,
}

impl ApiGatewayResponse {
    fn new(status_code: u16, body: &str, content_type: &str) -> Self {
        let mut headers = HashMap::new();
        headers.insert("content-type".to_string(), content_type.to_string());
        Self {
            status_code,
            headers,
            body: body.to_string(),
            is_base64_encoded: false,
        }
    }

    fn json<T: Serialize>(status_code: u16, data: &T) -> Result<Self, Error> {
        let body = serde_json::to_string(data)?;
        Ok(Self::new(status_code, &body, "application/json"))
    }
}

/// Trello webhook notification
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct WebhookPayload {
    action: Option<TrelloAction>,
}

#[derive(Debug, Deserialize)]
struct TrelloAction {
    #[serde(rename = "type")]
    action_type: String,
    #[serde(default)]
    data: ActionData,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ActionData {
    text: Option<String>,
    card: Option<ActionCard>,
    #[serde(rename = "listAfter")]
    list_after: Option<ListRef>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ActionCard {
    id: String,
    name: String,
}

/// Board event the webhook acts on.
#[derive(Debug, PartialEq)]
enum BoardEvent<'a> {
    Comment { card_id: &'a str, text: &'a str },
    CardMoved { card_id: &'a str, list_name: &'a str },
    CardCreated { card_id: &'a str, card_name: &'a str },
    Other,
}

impl TrelloAction {
    fn event(&self) -> BoardEvent<'_> {
        let Some(card) = &self.data.card else {
            return BoardEvent::Other;
        };
        match self.action_type.as_str() {
            "commentCard" => match &self.data.text {
                Some(text) => BoardEvent::Comment {
                    card_id: &card.id,
                    text,
                },
                None => BoardEvent::Other,
            },
            "updateCard" => match &self.data.list_after {
                Some(list) => BoardEvent::CardMoved {
                    card_id: &card.id,
                    list_name: &list.name,
                },
                None => BoardEvent::Other,
            },
            "createCard" => BoardEvent::CardCreated {
                card_id: &card.id,
                card_name: &card.name,
            },
            _ => BoardEvent::Other,
        }
    }
}

/// Request body, decoding base64 when API Gateway says so.
fn decode_body(request: &ApiGatewayRequest) -> Result<String, Error> {
    let body = request.body.clone().unwrap_or_default();
    if !request.is_base64_encoded {
        return Ok(body);
    }
    let bytes = STANDARD
        .decode(body.as_bytes())
        .map_err(|e| format!("Invalid base64 body: {}", e))?;
    Ok(String::from_utf8(bytes)?)
}

/// Application state
struct AppState {
    service: CurriculumService,
}

impl AppState {
    async fn new() -> Result<Self, Error> {
        let service = CurriculumService::from_env().await?;
        Ok(Self { service })
    }

    async fn process(&self, action: &TrelloAction) -> shared::Result<BoardReaction> {
        match action.event() {
            BoardEvent::Comment { card_id, text } => self.service.handle_comment(card_id, text).await,
            BoardEvent::CardMoved { card_id, list_name } => {
                self.service.handle_card_moved(card_id, list_name).await
            }
            BoardEvent::CardCreated { card_id, card_name } => {
                self.service.handle_card_created(card_id, card_name).await
            }
            BoardEvent::Other => Ok(BoardReaction::Ignored),
        }
    }
}

async fn handle_notification(state: &AppState, body: &str) -> Result<ApiGatewayResponse, Error> {
    let payload: WebhookPayload = match serde_json::from_str(body) {
        Ok(payload) => payload,
        Err(e) => {
            warn!(error = %e, "Unparseable webhook body");
            WebhookPayload::default()
        }
    };

    let Some(action) = payload.action else {
        return ApiGatewayResponse::json(200, &json!({"status": "ok", "processed": Value::Null}));
    };

    info!(action_type = %action.action_type, "Received webhook");
    match state.process(&action).await {
        Ok(reaction) => {
            info!(action_type = %action.action_type, reaction = ?reaction, "Webhook processed");
            ApiGatewayResponse::json(200, &json!({"status": "ok", "processed": action.action_type}))
        }
        Err(e) => {
            error!(action_type = %action.action_type, error = %e, "Webhook processing failed");
            ApiGatewayResponse::json(200, &json!({"status": "error", "message": e.to_string()}))
        }
    }
}

async fn handler(state: Arc<AppState>, event: LambdaEvent<Value>) -> Result<Value, Error> {
    let (payload, _context) = event.into_parts();
    let request: ApiGatewayRequest = serde_json::from_value(payload)?;

    let response = match (request.http_method.as_str(), request.path.as_str()) {
        ("GET", "/webhook") => ApiGatewayResponse::json(200, &json!({"status": "webhook endpoint ready"}))?,
        ("HEAD", "/webhook") => ApiGatewayResponse::new(200, "", "application/json"),
        ("POST", "/webhook") => handle_notification(&state, &decode_body(&request)?).await?,
        ("GET", "/health") => {
            let status = state.service.status();
            ApiGatewayResponse::json(
                200,
                &json!({
                    "status": "healthy",
                    "timestamp": chrono::Utc::now().to_rfc3339(),
                    "services": {"trello": status.trello, "openai": status.openai}
                }),
            )?
        }
        ("GET", "/") => ApiGatewayResponse::json(
            200,
            &json!({"message": "Curriculum AI Webhook Handler", "status": "running"}),
        )?,
        _ => ApiGatewayResponse::json(404, &json!({"message": "Not found"}))?,
    };

    Ok(serde_json::to_value(response)?)
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .json()
        .init();

    let state = Arc::new(AppState::new().await?);

    lambda_runtime::run(service_fn(move |event| {
        let state = Arc::clone(&state);
        async move { handler(state, event).await }
    }))
    .await
}

#[cfg(test)]
mod tests {
    use super::*;

    fn action(raw: &str) -> TrelloAction {
        let payload: WebhookPayload = serde_json::from_str(raw).unwrap();
        payload.action.unwrap()
    }

    #[test]
    fn test_comment_event() {
        let action = action(
            r#"{"action":{"type":"commentCard","data":{"text":"@ai analyze this","card":{"id":"c1","name":"Role Play"}}}}"#,
        );
        assert_eq!(
            action.event(),
            BoardEvent::Comment {
                card_id: "c1",
                text: "@ai analyze this"
            }
        );
    }

    #[test]
    fn test_card_moved_event() {
        let action = action(
            r#"{"action":{"type":"updateCard","data":{"card":{"id":"c2","name":"Quiz"},
                "listBefore":{"id":"l1","name":"Backlog"},"listAfter":{"id":"l2","name":"📅 This Week"}}}}"#,
        );
        assert_eq!(
            action.event(),
            BoardEvent::CardMoved {
                card_id: "c2",
                list_name: "📅 This Week"
            }
        );

        let renamed = action_without_list();
        assert_eq!(renamed.event(), BoardEvent::Other);
    }

    fn action_without_list() -> TrelloAction {
        action(r#"{"action":{"type":"updateCard","data":{"card":{"id":"c2","name":"Quiz 2"}}}}"#)
    }

    #[test]
    fn test_card_created_event() {
        let action = action(
            r#"{"action":{"type":"createCard","data":{"card":{"id":"c3","name":"🤖 AI: Build Lesson"}}}}"#,
        );
        assert_eq!(
            action.event(),
            BoardEvent::CardCreated {
                card_id: "c3",
                card_name: "🤖 AI: Build Lesson"
            }
        );
    }

    #[test]
    fn test_base64_body_is_decoded() {
        let request = ApiGatewayRequest {
            http_method: "POST".to_string(),
            path: "/webhook".to_string(),
            body: Some(STANDARD.encode(r#"{"action":null}"#)),
            is_base64_encoded: true,
        };
        assert_eq!(decode_body(&request).unwrap(), r#"{"action":null}"#);
    }

    #[test]
    fn test_proxy_request_tolerates_missing_fields() {
        let request: ApiGatewayRequest =
            serde_json::from_value(json!({"httpMethod": "HEAD", "path": "/webhook"})).unwrap();
        assert_eq!(request.http_method, "HEAD");
        assert!(request.body.is_none());
        assert!(!request.is_base64_encoded);
    }
}
