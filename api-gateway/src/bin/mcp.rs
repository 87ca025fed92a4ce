//! MCP Lambda - Exposes curriculum operations as Model Context Protocol tools.
//!
//! Accepts JSON-RPC 2.0 requests for `initialize`, `tools/list` and
//! `tools/call`. Tool results are returned as pretty-printed JSON text.

use lambda_http::{run, service_fn, Body, Error, Request, Response};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use shared::feedback::FeedbackRequest;
use shared::http::json_response;
use shared::store::DEFAULT_LIST_LIMIT;
use shared::{ActivityFilter, CurriculumService, LessonRequest};
use std::sync::Arc;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

const PROTOCOL_VERSION: &str = "2024-11-05";

const PARSE_ERROR: i64 = -32700;
const METHOD_NOT_FOUND: i64 = -32601;

/// JSON-RPC request envelope
#[derive(Debug, Deserialize)]
struct RpcRequest {
    #[serde(default)]
    id: Value,
    method: String,
    #[serde(default)]
    params: Value,
}

#[derive(Debug, Serialize)]
struct RpcError {
    code: i64,
    message: String,
}

#[derive(Debug, Serialize)]
struct RpcResponse {
    jsonrpc: &'static str,
    id: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<RpcError>,
}

impl RpcResponse {
    fn result(id: Value, result: Value) -> Self {
        Self {
            jsonrpc: "2.0",
            id,
            result: Some(result),
            error: None,
        }
    }

    fn error(id: Value, code: i64, message: impl Into<String>) -> Self {
        Self {
            jsonrpc: "2.0",
            id,
            result: None,
            error: Some(RpcError {
                code,
                message: message.into(),
            }),
        }
    }
}

#[derive(Debug, Deserialize)]
struct ToolCall {
    name: String,
    #[serde(default)]
    arguments: Value,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct TopicArgs {
    query: Option<String>,
    topic: Option<String>,
}

#[derive(Debug, Deserialize)]
struct PlanIdArgs {
    #[serde(alias = "lesson_plan_id")]
    plan_id: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct LimitArgs {
    limit: Option<i32>,
}

#[derive(Debug, Deserialize)]
struct SaveArgs {
    lesson_plan: Value,
    plan_id: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct PresentationArgs {
    lesson_plan_id: Option<String>,
    #[serde(alias = "lesson_plan")]
    lesson_plan_data: Option<Value>,
}

#[derive(Debug, Deserialize)]
struct ActivityCardArgs {
    #[serde(alias = "activity")]
    activity_data: Value,
}

#[derive(Debug, Deserialize)]
struct ExportArgs {
    design_id: String,
    format: Option<String>,
}

fn tool(name: &str, description: &str, properties: Value, required: &[&str]) -> Value {
    json!({
        "name": name,
        "description": description,
        "inputSchema": {
            "type": "object",
            "properties": properties,
            "required": required,
        }
    })
}

/// Tools advertised by `tools/list`.
fn tool_definitions() -> Vec<Value> {
    vec![
        tool(
            "get_activities",
            "Get curriculum activities from Trello board",
            json!({
                "category": {"type": "string", "description": "Filter by category"},
                "level": {"type": "string", "description": "Filter by student level"},
                "duration": {"type": "number", "description": "Maximum duration in minutes"}
            }),
            &[],
        ),
        tool(
            "search_activities",
            "Search activities by keyword",
            json!({"query": {"type": "string", "description": "Search term"}}),
            &["query"],
        ),
        tool(
            "suggest_lesson_plan",
            "Generate lesson plan using available activities",
            json!({
                "student_level": {"type": "string", "description": "Student level"},
                "focus_area": {"type": "string", "description": "Focus area"},
                "total_duration": {"type": "number", "description": "Duration in minutes"}
            }),
            &["student_level"],
        ),
        tool("get_board_structure", "Get Trello board structure", json!({}), &[]),
        tool(
            "get_drive_resources",
            "Get files from Google Drive shared folder",
            json!({"query": {"type": "string", "description": "Search term for Drive files"}}),
            &[],
        ),
        tool(
            "get_business_context",
            "Get business/organization context and website information",
            json!({}),
            &[],
        ),
        tool(
            "get_comprehensive_resources",
            "Get all available resources for a topic from all sources",
            json!({"topic": {"type": "string", "description": "Topic to search for across all sources"}}),
            &[],
        ),
        tool(
            "save_lesson_plan",
            "Save a lesson plan to persistent storage",
            json!({
                "lesson_plan": {"type": "object", "description": "The lesson plan data to save"},
                "plan_id": {"type": "string", "description": "Optional custom ID for the lesson plan"}
            }),
            &["lesson_plan"],
        ),
        tool(
            "get_saved_lesson_plans",
            "Retrieve saved lesson plans from storage",
            json!({"limit": {"type": "number", "description": "Maximum number of plans to retrieve (default: 10)"}}),
            &[],
        ),
        tool(
            "get_lesson_plan_by_id",
            "Retrieve a specific lesson plan by its ID",
            json!({"plan_id": {"type": "string", "description": "The ID of the lesson plan to retrieve"}}),
            &["plan_id"],
        ),
        tool(
            "sync_lesson_plans_to_trello",
            "Sync all existing lesson plans from storage to Trello board",
            json!({}),
            &[],
        ),
        tool(
            "submit_feedback",
            "Submit feedback for a lesson plan to improve future generations",
            json!({
                "lesson_plan_id": {"type": "string", "description": "ID of the lesson plan"},
                "feedback_type": {"type": "string", "description": "Type of feedback: like, dislike, improve, rating"},
                "feedback_text": {"type": "string", "description": "Detailed feedback text"},
                "rating": {"type": "number", "description": "Optional rating (1-5)"},
                "source": {"type": "string", "description": "Source of feedback (api, trello_comment, etc.)"}
            }),
            &["lesson_plan_id", "feedback_type", "feedback_text"],
        ),
        tool(
            "get_lesson_plan_feedback",
            "Get all feedback for a specific lesson plan",
            json!({"lesson_plan_id": {"type": "string", "description": "ID of the lesson plan"}}),
            &["lesson_plan_id"],
        ),
        tool(
            "analyze_feedback_patterns",
            "Analyze feedback patterns to understand preferences and improvement areas",
            json!({}),
            &[],
        ),
        tool(
            "create_canva_presentation",
            "Create a Canva presentation from a saved or inline lesson plan",
            json!({
                "lesson_plan_id": {"type": "string", "description": "ID of a saved lesson plan"},
                "lesson_plan_data": {"type": "object", "description": "Lesson plan data to use instead of a saved plan"}
            }),
            &[],
        ),
        tool(
            "create_canva_activity_card",
            "Create a single-activity Canva card",
            json!({"activity_data": {"type": "object", "description": "Activity name, duration, level, category, description, materials"}}),
            &["activity_data"],
        ),
        tool(
            "export_canva_design",
            "Export a Canva design",
            json!({
                "design_id": {"type": "string", "description": "Canva design ID"},
                "format": {"type": "string", "description": "pdf, png or jpg (default: pdf)"}
            }),
            &["design_id"],
        ),
    ]
}

fn args<T: serde::de::DeserializeOwned>(arguments: Value) -> shared::Result<T> {
    let arguments = if arguments.is_null() { json!({}) } else { arguments };
    serde_json::from_value(arguments)
        .map_err(|e| shared::Error::Validation(format!("Invalid arguments: {}", e)))
}

fn to_json<T: Serialize>(result: shared::Result<T>) -> shared::Result<Value> {
    Ok(serde_json::to_value(result?)?)
}

/// Run a tool and return its JSON result.
async fn call_tool(service: &CurriculumService, call: ToolCall) -> shared::Result<Value> {
    let arguments = call.arguments;
    match call.name.as_str() {
        "get_activities" => {
            let filter: ActivityFilter = args(arguments)?;
            to_json(service.activities(&filter).await)
        }
        "search_activities" => {
            let topic: TopicArgs = args(arguments)?;
            let query = topic
                .query
                .filter(|q| !q.is_empty())
                .ok_or_else(|| shared::Error::Validation("query is required".to_string()))?;
            to_json(service.search_activities(&query).await)
        }
        "suggest_lesson_plan" => {
            let request: LessonRequest = args(arguments)?;
            to_json(service.suggest_lesson_plan(&request).await)
        }
        "get_board_structure" => to_json(service.board_structure().await),
        "get_drive_resources" => {
            let topic: TopicArgs = args(arguments)?;
            to_json(service.drive_resources(topic.query.as_deref()).await)
        }
        "get_business_context" => Ok(serde_json::to_value(service.business_context().await)?),
        "get_comprehensive_resources" => {
            let topic: TopicArgs = args(arguments)?;
            to_json(service.comprehensive_resources(topic.topic.as_deref()).await)
        }
        "save_lesson_plan" => {
            let save: SaveArgs = args(arguments)?;
            to_json(service.save_lesson_plan(save.lesson_plan, save.plan_id).await)
        }
        "get_saved_lesson_plans" => {
            let limit: LimitArgs = args(arguments)?;
            to_json(service.saved_lesson_plans(limit.limit.unwrap_or(DEFAULT_LIST_LIMIT)).await)
        }
        "get_lesson_plan_by_id" => {
            let id: PlanIdArgs = args(arguments)?;
            to_json(service.lesson_plan(&id.plan_id).await)
        }
        "sync_lesson_plans_to_trello" => to_json(service.sync_lesson_plans_to_trello().await),
        "submit_feedback" => {
            let request: FeedbackRequest = args(arguments)?;
            to_json(service.submit_feedback(request).await)
        }
        "get_lesson_plan_feedback" => {
            let id: PlanIdArgs = args(arguments)?;
            to_json(service.lesson_plan_feedback(&id.plan_id).await)
        }
        "analyze_feedback_patterns" => to_json(service.feedback_analysis().await),
        "create_canva_presentation" => {
            let request: PresentationArgs = args(arguments)?;
            to_json(
                service
                    .create_canva_presentation(request.lesson_plan_id.as_deref(), request.lesson_plan_data)
                    .await,
            )
        }
        "create_canva_activity_card" => {
            let request: ActivityCardArgs = args(arguments)?;
            to_json(service.create_canva_activity_card(request.activity_data).await)
        }
        "export_canva_design" => {
            let request: ExportArgs = args(arguments)?;
            let format = request.format.unwrap_or_else(|| "pdf".to_string());
            to_json(service.export_canva_design(&request.design_id, &format).await)
        }
        other => Err(shared::Error::Validation(format!("Unknown tool: {}", other))),
    }
}

/// Wrap a tool outcome as MCP text content.
fn tool_content(outcome: shared::Result<Value>) -> Value {
    match outcome {
        Ok(value) => {
            let text = serde_json::to_string_pretty(&value).unwrap_or_else(|_| value.to_string());
            json!({"content": [{"type": "text", "text": text}]})
        }
        Err(e) => json!({"content": [{"type": "text", "text": e.to_string()}], "isError": true}),
    }
}

async fn dispatch(service: &CurriculumService, request: RpcRequest) -> RpcResponse {
    info!(method = %request.method, "MCP request");
    match request.method.as_str() {
        "initialize" => RpcResponse::result(
            request.id,
            json!({
                "protocolVersion": PROTOCOL_VERSION,
                "capabilities": {"tools": {}},
                "serverInfo": {"name": "curriculum-designer", "version": env!("CARGO_PKG_VERSION")}
            }),
        ),
        "tools/list" => RpcResponse::result(request.id, json!({"tools": tool_definitions()})),
        "tools/call" => {
            let outcome = match serde_json::from_value::<ToolCall>(request.params) {
                Ok(call) => {
                    let name = call.name.clone();
                    let outcome = call_tool(service, call).await;
                    if let Err(e) = &outcome {
                        warn!(tool = %name, error = %e, "Tool call failed");
                    }
                    outcome
                }
                Err(e) => Err(shared::Error::Validation(format!("Invalid tool call: {}", e))),
            };
            RpcResponse::result(request.id, tool_content(outcome))
        }
        other => RpcResponse::error(request.id, METHOD_NOT_FOUND, format!("Unknown method: {}", other)),
    }
}

/// Application state
struct AppState {
    service: CurriculumService,
}

async fn handler(state: Arc<AppState>, event: Request) -> Result<Response<Body>, Error> {
    let request: RpcRequest = match serde_json::from_slice(event.body().as_ref()) {
        Ok(request) => request,
        Err(e) => {
            error!(error = %e, "Unparseable JSON-RPC request");
            return json_response(200, &RpcResponse::error(Value::Null, PARSE_ERROR, e.to_string()));
        }
    };
    json_response(200, &dispatch(&state.service, request).await)
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .json()
        .init();

    let service = CurriculumService::from_env().await?;
    let state = Arc::new(AppState { service });
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
    fn test_every_tool_is_listed_once() {
        let tools = tool_definitions();
        let mut names: Vec<&str> = tools.iter().filter_map(|t| t["name"].as_str()).collect();
        assert_eq!(names.len(), 17);
        names.sort();
        names.dedup();
        assert_eq!(names.len(), 17);
        assert_eq!(tools[1]["inputSchema"]["required"], json!(["query"]));
    }

    #[test]
    fn test_null_arguments_become_empty_object() {
        let limit: LimitArgs = args(Value::Null).unwrap();
        assert!(limit.limit.is_none());
        assert!(args::<PlanIdArgs>(json!({})).is_err());
        let id: PlanIdArgs = args(json!({"lesson_plan_id": "lesson_1"})).unwrap();
        assert_eq!(id.plan_id, "lesson_1");
    }

    #[test]
    fn test_tool_errors_are_flagged() {
        let content = tool_content(Err(shared::Error::Validation("query is required".to_string())));
        assert_eq!(content["isError"], true);
        let content = tool_content(Ok(json!({"a": 1})));
        assert!(content["content"][0]["text"].as_str().unwrap().contains("\"a\": 1"));
    }

    #[test]
    fn test_rpc_error_shape() {
        let response = serde_json::to_value(RpcResponse::error(json!(7), METHOD_NOT_FOUND, "nope")).unwrap();
        assert_eq!(response["id"], 7);
        assert_eq!(response["error"]["code"], -32601);
        assert!(response.get("result").is_none());
    }
}
