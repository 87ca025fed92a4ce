//! Lesson Plan Sync Lambda - Mirrors saved lesson plans to Trello.
//!
//! Runs on a schedule (EventBridge) and creates a card on the lesson plans
//! board for each recently saved plan.

use chrono::Utc;
use lambda_runtime::{run, service_fn, Error, LambdaEvent};
use serde::{Deserialize, Serialize};
use shared::curriculum::SyncReport;
use shared::CurriculumService;
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

/// EventBridge scheduled event
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ScheduledEvent {
    #[serde(rename = "detail-type")]
    detail_type: String,
}

#[derive(Debug, Serialize)]
struct SyncResponse {
    started_at: String,
    #[serde(flatten)]
    report: SyncReport,
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

async fn handler(state: Arc<AppState>, event: LambdaEvent<ScheduledEvent>) -> Result<SyncResponse, Error> {
    let started_at = Utc::now().to_rfc3339();
    info!(detail_type = %event.payload.detail_type, "Starting lesson plan sync");

    let report = state.service.sync_lesson_plans_to_trello().await.map_err(|e| {
        error!(error = %e, "Lesson plan sync failed");
        e
    })?;

    for failure in &report.details.errors {
        error!(failure = %failure, "Lesson plan not synced");
    }
    info!(
        total = report.total_plans,
        synced = report.synced_count,
        errors = report.error_count,
        "Lesson plan sync complete"
    );

    Ok(SyncResponse { started_at, report })
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
    fn test_scheduled_event_parsing() {
        let event: ScheduledEvent = serde_json::from_str(
            r#"{"version":"0","detail-type":"Scheduled Event","source":"aws.events","detail":{}}"#,
        )
        .unwrap();
        assert_eq!(event.detail_type, "Scheduled Event");

        let manual: ScheduledEvent = serde_json::from_str("{}").unwrap();
        assert!(manual.detail_type.is_empty());
    }
}
