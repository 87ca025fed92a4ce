//! DynamoDB persistence for lesson plans and feedback.

use aws_sdk_dynamodb::types::AttributeValue;
use aws_sdk_dynamodb::Client as DynamoClient;
use serde_json::{Map, Number, Value};
use std::collections::HashMap;
use tracing::info;
use uuid::Uuid;

use crate::config::Config;
use crate::feedback::{FeedbackRecord, FeedbackRequest, FeedbackType};
use crate::models::{CanvaDesignRef, SavedLessonPlan};
use crate::{Error, Result};

pub const LESSON_PLAN_TYPE: &str = "lesson_plan";
pub const LESSON_PLAN_INDEX: &str = "type-created_at-index";
pub const FEEDBACK_INDEX: &str = "lesson-plan-feedback-index";
pub const DEFAULT_LIST_LIMIT: i32 = 10;

type Item = HashMap<String, AttributeValue>;

/// Convert a JSON value into a DynamoDB attribute.
pub fn to_attribute(value: &Value) -> AttributeValue {
    match value {
        Value::Null => AttributeValue::Null(true),
        Value::Bool(b) => AttributeValue::Bool(*b),
        Value::Number(n) => AttributeValue::N(n.to_string()),
        Value::String(s) => AttributeValue::S(s.clone()),
        Value::Array(items) => AttributeValue::L(items.iter().map(to_attribute).collect()),
        Value::Object(map) => AttributeValue::M(
            map.iter()
                .map(|(k, v)| (k.clone(), to_attribute(v)))
                .collect(),
        ),
    }
}

/// Convert a DynamoDB attribute back into JSON.
pub fn from_attribute(attr: &AttributeValue) -> Value {
    match attr {
        AttributeValue::S(s) => Value::String(s.clone()),
        AttributeValue::N(n) => parse_number(n),
        AttributeValue::Bool(b) => Value::Bool(*b),
        AttributeValue::L(items) => Value::Array(items.iter().map(from_attribute).collect()),
        AttributeValue::M(map) => Value::Object(
            map.iter()
                .map(|(k, v)| (k.clone(), from_attribute(v)))
                .collect::<Map<_, _>>(),
        ),
        AttributeValue::Ss(items) => Value::Array(items.iter().cloned().map(Value::String).collect()),
        AttributeValue::Ns(items) => Value::Array(items.iter().map(|n| parse_number(n)).collect()),
        _ => Value::Null,
    }
}

fn parse_number(n: &str) -> Value {
    if let Ok(i) = n.parse::<i64>() {
        return Value::Number(i.into());
    }
    n.parse::<f64>()
        .ok()
        .and_then(Number::from_f64)
        .map(Value::Number)
        .unwrap_or(Value::Null)
}

/// Convert a JSON object into an item.
pub fn item_from_value(value: &Value) -> Result<Item> {
    match value {
        Value::Object(map) => Ok(map.iter().map(|(k, v)| (k.clone(), to_attribute(v))).collect()),
        _ => Err(Error::Validation("Item must be a JSON object".to_string())),
    }
}

pub fn value_from_item(item: &Item) -> Value {
    Value::Object(
        item.iter()
            .map(|(k, v)| (k.clone(), from_attribute(v)))
            .collect(),
    )
}

fn lesson_plan_from_item(item: &Item) -> Result<SavedLessonPlan> {
    Ok(serde_json::from_value(value_from_item(item))?)
}

/// Lesson plans table.
#[derive(Clone)]
pub struct LessonPlanStore {
    client: DynamoClient,
    table: String,
}

impl LessonPlanStore {
    pub fn new(client: DynamoClient, table: impl Into<String>) -> Self {
        Self {
            client,
            table: table.into(),
        }
    }

    pub fn from_config(client: DynamoClient, config: &Config) -> Result<Self> {
        let table = config
            .lesson_table
            .clone()
            .ok_or_else(|| Error::Config("DynamoDB table not configured".to_string()))?;
        Ok(Self::new(client, table))
    }

    pub fn table_name(&self) -> &str {
        &self.table
    }

    /// Store a plan under `id`, or a fresh `lesson_<unix seconds>` id.
    pub async fn save(&self, id: Option<String>, lesson_plan: Value) -> Result<SavedLessonPlan> {
        let now = chrono::Utc::now();
        let saved = SavedLessonPlan {
            id: id
                .filter(|id| !id.is_empty())
                .unwrap_or_else(|| format!("lesson_{}", now.timestamp())),
            created_at: now.to_rfc3339(),
            status: "active".to_string(),
            lesson_plan,
            canva_design: None,
        };

        let mut item = item_from_value(&serde_json::to_value(&saved)?)?;
        item.insert("type".to_string(), AttributeValue::S(LESSON_PLAN_TYPE.to_string()));

        self.client
            .put_item()
            .table_name(&self.table)
            .set_item(Some(item))
            .send()
            .await
            .map_err(|e| Error::Aws(format!("Failed to save lesson plan: {}", e)))?;

        info!(id = %saved.id, table = %self.table, "Lesson plan saved");
        Ok(saved)
    }

    /// Most recent plans first.
    pub async fn list(&self, limit: i32) -> Result<Vec<SavedLessonPlan>> {
        let output = self
            .client
            .query()
            .table_name(&self.table)
            .index_name(LESSON_PLAN_INDEX)
            .key_condition_expression("#type = :type")
            .expression_attribute_names("#type", "type")
            .expression_attribute_values(":type", AttributeValue::S(LESSON_PLAN_TYPE.to_string()))
            .scan_index_forward(false)
            .limit(limit)
            .send()
            .await
            .map_err(|e| Error::Aws(format!("Failed to list lesson plans: {}", e)))?;

        output.items().iter().map(lesson_plan_from_item).collect()
    }

    pub async fn get(&self, id: &str) -> Result<SavedLessonPlan> {
        let output = self
            .client
            .get_item()
            .table_name(&self.table)
            .key("id", AttributeValue::S(id.to_string()))
            .key("type", AttributeValue::S(LESSON_PLAN_TYPE.to_string()))
            .send()
            .await
            .map_err(|e| Error::Aws(format!("Failed to get lesson plan: {}", e)))?;

        match output.item() {
            Some(item) => lesson_plan_from_item(item),
            None => Err(Error::NotFound(format!("Lesson plan {}", id))),
        }
    }

    /// Record the Canva design generated for a plan.
    pub async fn attach_canva_design(&self, id: &str, design: &CanvaDesignRef) -> Result<()> {
        self.client
            .update_item()
            .table_name(&self.table)
            .key("id", AttributeValue::S(id.to_string()))
            .key("type", AttributeValue::S(LESSON_PLAN_TYPE.to_string()))
            .update_expression("SET canva_design = :design")
            .expression_attribute_values(":design", to_attribute(&serde_json::to_value(design)?))
            .send()
            .await
            .map_err(|e| Error::Aws(format!("Failed to record Canva design: {}", e)))?;
        Ok(())
    }
}

/// Check a submission and turn it into a record.
pub fn new_feedback_record(request: FeedbackRequest) -> Result<FeedbackRecord> {
    if request.lesson_plan_id.trim().is_empty() {
        return Err(Error::Validation("lesson_plan_id is required".to_string()));
    }
    if request.feedback_text.trim().is_empty() {
        return Err(Error::Validation("feedback_text is required".to_string()));
    }
    let feedback_type = FeedbackType::parse(&request.feedback_type).ok_or_else(|| {
        Error::Validation("feedback_type must be one of: like, dislike, improve, rating".to_string())
    })?;

    Ok(FeedbackRecord {
        feedback_id: Uuid::new_v4().to_string(),
        created_at: chrono::Utc::now().to_rfc3339(),
        lesson_plan_id: request.lesson_plan_id,
        feedback_type: feedback_type.as_str().to_string(),
        feedback_text: request.feedback_text,
        source: request.source,
        processed: false,
        rating: request.rating.map(|r| r as f64),
    })
}

/// Feedback table.
#[derive(Clone)]
pub struct FeedbackStore {
    client: DynamoClient,
    table: String,
}

impl FeedbackStore {
    pub fn new(client: DynamoClient, table: impl Into<String>) -> Self {
        Self {
            client,
            table: table.into(),
        }
    }

    pub fn from_config(client: DynamoClient, config: &Config) -> Result<Self> {
        let table = config
            .feedback_table
            .clone()
            .ok_or_else(|| Error::Config("Feedback table not configured".to_string()))?;
        Ok(Self::new(client, table))
    }

    pub async fn submit(&self, request: FeedbackRequest) -> Result<FeedbackRecord> {
        let record = new_feedback_record(request)?;
        let item = item_from_value(&serde_json::to_value(&record)?)?;

        self.client
            .put_item()
            .table_name(&self.table)
            .set_item(Some(item))
            .send()
            .await
            .map_err(|e| Error::Aws(format!("Failed to store feedback: {}", e)))?;

        info!(
            feedback_id = %record.feedback_id,
            lesson_plan_id = %record.lesson_plan_id,
            feedback_type = %record.feedback_type,
            "Feedback stored"
        );
        Ok(record)
    }

    /// Feedback for one plan, newest first.
    pub async fn for_plan(&self, lesson_plan_id: &str) -> Result<Vec<FeedbackRecord>> {
        let output = self
            .client
            .query()
            .table_name(&self.table)
            .index_name(FEEDBACK_INDEX)
            .key_condition_expression("lesson_plan_id = :id")
            .expression_attribute_values(":id", AttributeValue::S(lesson_plan_id.to_string()))
            .scan_index_forward(false)
            .send()
            .await
            .map_err(|e| Error::Aws(format!("Failed to query feedback: {}", e)))?;

        output
            .items()
            .iter()
            .map(|item| Ok(serde_json::from_value(value_from_item(item))?))
            .collect()
    }

    /// Every feedback item, following scan pagination.
    pub async fn all(&self) -> Result<Vec<FeedbackRecord>> {
        let mut records = Vec::new();
        let mut start_key: Option<Item> = None;

        loop {
            let output = self
                .client
                .scan()
                .table_name(&self.table)
                .set_exclusive_start_key(start_key.take())
                .send()
                .await
                .map_err(|e| Error::Aws(format!("Failed to scan feedback: {}", e)))?;

            for item in output.items() {
                records.push(serde_json::from_value(value_from_item(item))?);
            }

            match output.last_evaluated_key() {
                Some(key) if !key.is_empty() => start_key = Some(key.clone()),
                _ => break,
            }
        }

        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn request(kind: &str, text: &str) -> FeedbackRequest {
        FeedbackRequest {
            lesson_plan_id: "lesson_1".to_string(),
            feedback_type: kind.to_string(),
            feedback_text: text.to_string(),
            rating: None,
            source: "api".to_string(),
        }
    }

    #[test]
    fn test_nested_plan_survives_attribute_mapping() {
        let plan = json!({
            "level": "beginner",
            "total_duration_minutes": 60,
            "structure": {"warmup": null, "main_activities": [{"name": "Quiz", "duration_minutes": 15}]},
            "materials_needed": ["cards"],
            "ratio": 0.5,
            "draft": false
        });
        let item = item_from_value(&plan).unwrap();
        assert!(matches!(item.get("level"), Some(AttributeValue::S(s)) if s == "beginner"));
        assert!(matches!(item.get("total_duration_minutes"), Some(AttributeValue::N(n)) if n == "60"));
        assert_eq!(value_from_item(&item), plan);
    }

    #[test]
    fn test_non_object_is_not_an_item() {
        assert!(matches!(item_from_value(&json!([1, 2])), Err(Error::Validation(_))));
    }

    #[test]
    fn test_saved_plan_reads_back_from_item() {
        let mut item = item_from_value(&json!({
            "id": "lesson_1700000000",
            "created_at": "2025-01-01T00:00:00+00:00",
            "status": "active",
            "lesson_plan": {"level": "advanced"},
            "canva_design": {"design_id": "D1", "created_at": "2025-01-02T00:00:00+00:00"}
        }))
        .unwrap();
        item.insert("type".to_string(), AttributeValue::S(LESSON_PLAN_TYPE.to_string()));

        let saved = lesson_plan_from_item(&item).unwrap();
        assert_eq!(saved.id, "lesson_1700000000");
        assert_eq!(saved.lesson_plan["level"], "advanced");
        assert_eq!(saved.canva_design.unwrap().edit_url, "");
    }

    #[test]
    fn test_feedback_record_normalizes_type() {
        let mut req = request("Rating", "solid lesson");
        req.rating = Some(4);
        let record = new_feedback_record(req).unwrap();
        assert_eq!(record.feedback_type, "rating");
        assert_eq!(record.rating, Some(4.0));
        assert!(!record.processed);
        assert!(Uuid::parse_str(&record.feedback_id).is_ok());
    }

    #[test]
    fn test_feedback_validation() {
        assert!(matches!(new_feedback_record(request("meh", "x")), Err(Error::Validation(_))));
        assert!(matches!(new_feedback_record(request("like", "  ")), Err(Error::Validation(_))));
        let mut missing_plan = request("like", "good");
        missing_plan.lesson_plan_id.clear();
        assert!(matches!(new_feedback_record(missing_plan), Err(Error::Validation(_))));
    }

    #[test]
    fn test_feedback_record_round_trips_through_item() {
        let mut req = request("rating", "fine");
        req.rating = Some(5);
        let record = new_feedback_record(req).unwrap();
        let item = item_from_value(&serde_json::to_value(&record).unwrap()).unwrap();
        let back: FeedbackRecord = serde_json::from_value(value_from_item(&item)).unwrap();
        assert_eq!(back.feedback_id, record.feedback_id);
        assert_eq!(back.rating, Some(5.0));
    }
}
