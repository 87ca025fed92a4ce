//! Board Setup Lambda - Creates the workflow lists and labels.
//!
//! Safe to run more than once: lists and labels already on the board (matched
//! by name, case-insensitively) are left alone.

use lambda_runtime::{run, service_fn, Error, LambdaEvent};
use serde::{Deserialize, Serialize};
use shared::trello::BoardStructure;
use shared::CurriculumService;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

const WORKFLOW_LISTS: [&str; 8] = [
    "📚 Activity Bank",
    "🤖 AI Requests",
    "📋 AI Suggestions",
    "📅 This Week",
    "⏰ Today",
    "✅ Completed",
    "🔄 Needs Revision",
    "🗂️ Templates",
];

const BOARD_LABELS: [(&str, &str); 10] = [
    ("Beginner", "green"),
    ("Intermediate", "yellow"),
    ("Advanced", "red"),
    ("Grammar", "blue"),
    ("Speaking", "purple"),
    ("Writing", "black"),
    ("Business English", "orange"),
    ("Listening", "sky"),
    ("Warmup", "lime"),
    ("Assessment", "pink"),
];

/// Invocation payload; defaults to the activity board.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct SetupRequest {
    board_id: Option<String>,
}

#[derive(Debug, Default, Serialize)]
struct SetupResponse {
    board_id: String,
    lists_created: Vec<String>,
    labels_created: Vec<String>,
    skipped: Vec<String>,
    errors: Vec<String>,
}

fn has_name<'a>(mut names: impl Iterator<Item = &'a str>, wanted: &str) -> bool {
    names.any(|name| name.trim().eq_ignore_ascii_case(wanted))
}

/// Lists still missing from the board, with their 1-based workflow position.
fn missing_lists(board: &BoardStructure) -> Vec<(u32, &'static str)> {
    (1u32..)
        .zip(WORKFLOW_LISTS)
        .filter(|(_, name)| !has_name(board.lists.iter().map(|l| l.name.as_str()), name))
        .collect()
}

fn missing_labels(board: &BoardStructure) -> Vec<(&'static str, &'static str)> {
    BOARD_LABELS
        .into_iter()
        .filter(|(name, _)| !has_name(board.labels.iter().map(|l| l.name.as_str()), name))
        .collect()
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
}

async fn handler(state: Arc<AppState>, event: LambdaEvent<SetupRequest>) -> Result<SetupResponse, Error> {
    let board_id = event
        .payload
        .board_id
        .unwrap_or_else(|| state.service.config().trello_board_id.clone());
    let trello = state.service.trello()?;
    let board = trello.board_structure(&board_id).await?;

    info!(board_id = %board_id, lists = board.lists.len(), labels = board.labels.len(), "Setting up board");

    let lists = missing_lists(&board);
    let labels = missing_labels(&board);
    let skipped_lists = WORKFLOW_LISTS
        .into_iter()
        .filter(|name| !lists.iter().any(|(_, missing)| missing == name));
    let skipped_labels = BOARD_LABELS
        .into_iter()
        .map(|(name, _)| name)
        .filter(|name| !labels.iter().any(|(missing, _)| missing == name));
    let mut response = SetupResponse {
        board_id: board_id.clone(),
        skipped: skipped_lists.chain(skipped_labels).map(str::to_string).collect(),
        ..Default::default()
    };

    for (pos, name) in lists {
        match trello.create_list(&board_id, name, pos).await {
            Ok(list) => {
                info!(list_id = %list.id, name = %name, "Created list");
                response.lists_created.push(name.to_string());
            }
            Err(e) => {
                warn!(name = %name, error = %e, "Could not create list");
                response.errors.push(format!("list {}: {}", name, e));
            }
        }
    }

    for (name, color) in labels {
        match trello.create_label(&board_id, name, color).await {
            Ok(label) => {
                info!(label_id = %label.id, name = %name, color = %color, "Created label");
                response.labels_created.push(name.to_string());
            }
            Err(e) => {
                warn!(name = %name, error = %e, "Could not create label");
                response.errors.push(format!("label {}: {}", name, e));
            }
        }
    }

    Ok(response)
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
