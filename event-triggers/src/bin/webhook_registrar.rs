//! Webhook Registrar Lambda - Manages the Trello board webhook.
//!
//! Invoked manually or from deployment tooling with one of:
//! - `{"command": "list"}`
//! - `{"command": "register"}` (optionally with `callback_url`)
//! - `{"command": "delete", "webhook_id": "..."}`
//! - `{"command": "replace"}` - delete webhooks on the board, then register

use lambda_runtime::{run, service_fn, Error, LambdaEvent};
use serde::{Deserialize, Serialize};
use shared::trello::Webhook;
use shared::CurriculumService;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

const WEBHOOK_DESCRIPTION: &str = "Curriculum Designer AI Webhook";

#[derive(Debug, Deserialize)]
#[serde(tag = "command", rename_all = "snake_case")]
enum RegistrarCommand {
    List,
    Register {
        #[serde(default)]
        callback_url: Option<String>,
    },
    Delete {
        webhook_id: String,
    },
    Replace {
        #[serde(default)]
        callback_url: Option<String>,
    },
}

#[derive(Debug, Default, Serialize)]
struct RegistrarResponse {
    webhooks: Vec<Webhook>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    deleted: Vec<String>,
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

    fn callback_url(&self, requested: Option<String>) -> Result<String, Error> {
        requested
            .filter(|url| !url.trim().is_empty())
            .or_else(|| self.service.config().webhook_callback_url.clone())
            .ok_or_else(|| "WEBHOOK_CALLBACK_URL not set and no callback_url given".into())
    }

    async fn register(&self, callback_url: Option<String>) -> Result<Webhook, Error> {
        let callback_url = self.callback_url(callback_url)?;
        let board_id = &self.service.config().trello_board_id;
        let webhook = self
            .service
            .trello()?
            .register_webhook(&callback_url, board_id, WEBHOOK_DESCRIPTION)
            .await?;
        info!(webhook_id = %webhook.id, board_id = %board_id, "Registered Trello webhook");
        Ok(webhook)
    }
}

/// Webhooks pointing at a board.
fn board_webhooks<'a>(webhooks: &'a [Webhook], board_id: &str) -> Vec<&'a Webhook> {
    webhooks.iter().filter(|w| w.id_model == board_id).collect()
}

async fn handler(state: Arc<AppState>, event: LambdaEvent<RegistrarCommand>) -> Result<RegistrarResponse, Error> {
    let trello = state.service.trello()?;

    match event.payload {
        RegistrarCommand::List => {
            let webhooks = trello.list_webhooks().await?;
            info!(count = webhooks.len(), "Listed Trello webhooks");
            Ok(RegistrarResponse {
                webhooks,
                ..Default::default()
            })
        }

        RegistrarCommand::Register { callback_url } => Ok(RegistrarResponse {
            webhooks: vec![state.register(callback_url).await?],
            ..Default::default()
        }),

        RegistrarCommand::Delete { webhook_id } => {
            trello.delete_webhook(&webhook_id).await?;
            info!(webhook_id = %webhook_id, "Deleted Trello webhook");
            Ok(RegistrarResponse {
                webhooks: Vec::new(),
                deleted: vec![webhook_id],
            })
        }

        RegistrarCommand::Replace { callback_url } => {
            let existing = trello.list_webhooks().await?;
            let mut deleted = Vec::new();
            for webhook in board_webhooks(&existing, &state.service.config().trello_board_id) {
                match trello.delete_webhook(&webhook.id).await {
                    Ok(()) => deleted.push(webhook.id.clone()),
                    Err(e) => warn!(webhook_id = %webhook.id, error = %e, "Could not delete webhook"),
                }
            }
            Ok(RegistrarResponse {
                webhooks: vec![state.register(callback_url).await?],
                deleted,
            })
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .json()
        .init();

    let state = Arc::new(AppState::new().await?);
    let state_clone = state.clone();

    run(service_fn(move |event| {
        let state = state_clone.clone();
        async move { handler(state, event).await }
    }))
    .await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_parsing() {
        let command: RegistrarCommand = serde_json::from_str(r#"{"command":"list"}"#).unwrap();
        assert!(matches!(command, RegistrarCommand::List));

        let command: RegistrarCommand =
            serde_json::from_str(r#"{"command":"delete","webhook_id":"5f4b2c1a"}"#).unwrap();
        assert!(matches!(command, RegistrarCommand::Delete { webhook_id } if webhook_id == "5f4b2c1a"));

        let command: RegistrarCommand = serde_json::from_str(r#"{"command":"register"}"#).unwrap();
        assert!(matches!(command, RegistrarCommand::Register { callback_url: None }));

        assert!(serde_json::from_str::<RegistrarCommand>(r#"{"command":"delete"}"#).is_err());
    }

    #[test]
    fn test_board_webhooks_filter() {
        let webhooks: Vec<Webhook> = serde_json::from_str(
            r#"[
                {"id":"w1","callbackURL":"https://a/webhook","idModel":"board1","active":true},
                {"id":"w2","callbackURL":"https://b/webhook","idModel":"board2","active":true}
            ]"#,
        )
        .unwrap();
        let matching = board_webhooks(&webhooks, "board1");
        assert_eq!(matching.len(), 1);
        assert_eq!(matching[0].id, "w1");
    }
}
