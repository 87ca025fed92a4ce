//! Curriculum API Lambda - Activities, lesson plans, feedback and Canva.
//!
//! Endpoints:
//! - GET /health - Service status
//! - GET /activities - List activities (category, level, duration filters)
//! - GET /search?q= - Keyword search
//! - POST /lesson-plan - Assemble a lesson plan
//! - GET /board-structure - Lists and labels of the activity board
//! - GET /drive-resources - Shared Drive folder listing
//! - GET /business-context - Organization details
//! - GET /comprehensive-resources - Everything on a topic
//! - GET /saved-lesson-plans, GET /lesson-plan/{id}, POST /save-lesson-plan
//! - POST /sync-lesson-plans-to-trello
//! - POST /feedback, GET /feedback/{id}, GET /feedback-analysis
//! - POST /canva-presentation, POST /canva-activity-card, POST /canva-export

use lambda_http::{run, service_fn, Body, Error, Request, RequestExt, Response};
use serde::Serialize;
use serde_json::json;
use shared::feedback::FeedbackRequest;
use shared::http::{error_response, from_error, json_response};
use shared::models::{
    CanvaActivityRequest, CanvaExportRequest, CanvaPresentationRequest, SaveLessonPlanRequest,
};
use shared::store::DEFAULT_LIST_LIMIT;
use shared::{parse_body, ActivityFilter, CurriculumService, LessonRequest};
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

const CAPABILITIES: [&str; 17] = [
    "get_activities",
    "search_activities",
    "suggest_lesson_plan",
    "get_board_structure",
    "get_drive_resources",
    "get_business_context",
    "get_comprehensive_resources",
    "save_lesson_plan",
    "get_saved_lesson_plans",
    "get_lesson_plan_by_id",
    "sync_lesson_plans_to_trello",
    "submit_feedback",
    "get_lesson_plan_feedback",
    "analyze_feedback_patterns",
    "create_canva_presentation",
    "create_canva_activity_card",
    "export_canva_design",
];

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

/// Turn a service result into a response, logging failures.
fn respond<T: Serialize>(status: u16, result: shared::Result<T>) -> Result<Response<Body>, Error> {
    match result {
        Ok(data) => json_response(status, &data),
        Err(e) => {
            error!(error = %e, "Request failed");
            from_error(&e)
        }
    }
}

/// Filters from `category`, `level` and `duration` query parameters.
fn activity_filter(category: Option<&str>, level: Option<&str>, duration: Option<&str>) -> ActivityFilter {
    ActivityFilter {
        category: category.filter(|c| !c.is_empty()).map(str::to_string),
        level: level.filter(|l| !l.is_empty()).map(str::to_string),
        max_duration: duration.and_then(|d| d.parse().ok()),
    }
}

/// Identifier after a route prefix, if non-empty.
fn path_tail<'a>(path: &'a str, prefix: &str) -> Option<&'a str> {
    path.strip_prefix(prefix)
        .map(|tail| tail.trim_end_matches('/'))
        .filter(|tail| !tail.is_empty())
}

async fn handler(state: Arc<AppState>, event: Request) -> Result<Response<Body>, Error> {
    let method = event.method().as_str();
    let path = event.uri().path();
    let params = event.query_string_parameters();
    let service = &state.service;

    info!("Curriculum request: {} {}", method, path);

    match (method, path) {
        ("GET", "/health") => json_response(
            200,
            &json!({
                "status": "healthy",
                "service": "curriculum-designer",
                "capabilities": CAPABILITIES,
                "services": service.status(),
            }),
        ),

        ("GET", "/activities") => {
            let filter = activity_filter(params.first("category"), params.first("level"), params.first("duration"));
            respond(200, service.activities(&filter).await)
        }

        ("GET", "/search") => match params.first("q").filter(|q| !q.is_empty()) {
            Some(query) => respond(200, service.search_activities(query).await),
            None => error_response(400, "Query parameter \"q\" is required"),
        },

        ("POST", "/lesson-plan") => {
            let request: LessonRequest = parse_body!(event.body());
            respond(200, service.suggest_lesson_plan(&request).await)
        }

        ("GET", "/board-structure") => respond(200, service.board_structure().await),

        ("GET", "/drive-resources") => respond(200, service.drive_resources(params.first("q")).await),

        ("GET", "/business-context") => json_response(200, &service.business_context().await),

        ("GET", "/comprehensive-resources") => {
            respond(200, service.comprehensive_resources(params.first("topic")).await)
        }

        ("GET", "/saved-lesson-plans") => {
            let limit = params
                .first("limit")
                .and_then(|l| l.parse().ok())
                .unwrap_or(DEFAULT_LIST_LIMIT);
            respond(200, service.saved_lesson_plans(limit).await)
        }

        ("GET", _) if path.starts_with("/lesson-plan/") => match path_tail(path, "/lesson-plan/") {
            Some(plan_id) => respond(200, service.lesson_plan(plan_id).await),
            None => error_response(400, "Lesson plan ID required"),
        },

        ("POST", "/save-lesson-plan") => {
            let request: SaveLessonPlanRequest = parse_body!(event.body());
            respond(200, service.save_lesson_plan(request.lesson_plan, request.plan_id).await)
        }

        ("POST", "/sync-lesson-plans-to-trello") => respond(200, service.sync_lesson_plans_to_trello().await),

        ("POST", "/feedback") => {
            let request: FeedbackRequest = parse_body!(event.body());
            respond(201, service.submit_feedback(request).await)
        }

        ("GET", "/feedback-analysis") => respond(200, service.feedback_analysis().await),

        ("GET", _) if path.starts_with("/feedback/") => match path_tail(path, "/feedback/") {
            Some(plan_id) => respond(200, service.lesson_plan_feedback(plan_id).await),
            None => error_response(400, "Lesson plan ID required"),
        },

        ("POST", "/canva-presentation") => {
            let request: CanvaPresentationRequest = parse_body!(event.body());
            respond(
                200,
                service
                    .create_canva_presentation(request.lesson_plan_id.as_deref(), request.lesson_plan_data)
                    .await,
            )
        }

        ("POST", "/canva-activity-card") => {
            let request: CanvaActivityRequest = parse_body!(event.body());
            respond(200, service.create_canva_activity_card(request.activity_data).await)
        }

        ("POST", "/canva-export") => {
            let request: CanvaExportRequest = parse_body!(event.body());
            respond(200, service.export_canva_design(&request.design_id, &request.format).await)
        }

        _ => error_response(404, "Not found"),
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
    fn test_activity_filter_from_query() {
        let filter = activity_filter(Some("speaking"), Some(""), Some("30"));
        assert_eq!(filter.category.as_deref(), Some("speaking"));
        assert!(filter.level.is_none());
        assert_eq!(filter.max_duration, Some(30));
        assert_eq!(activity_filter(None, None, Some("soon")).max_duration, None);
    }

    #[test]
    fn test_path_tail() {
        assert_eq!(path_tail("/lesson-plan/lesson_1", "/lesson-plan/"), Some("lesson_1"));
        assert_eq!(path_tail("/feedback/abc/", "/feedback/"), Some("abc"));
        assert_eq!(path_tail("/feedback/", "/feedback/"), None);
    }
}
