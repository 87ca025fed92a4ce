//! Shared data models.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Default lesson length when a request does not name one.
pub const DEFAULT_LESSON_MINUTES: u32 = 120;

/// Label attached to a Trello card.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Label {
    pub id: String,
    pub name: String,
    pub color: Option<String>,
}

/// The list a card sits in, when Trello includes it.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ListRef {
    pub id: String,
    pub name: String,
}

/// Raw Trello card as returned by the REST API.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Card {
    pub id: String,
    pub name: String,
    pub desc: String,
    pub url: Option<String>,
    #[serde(rename = "idList")]
    pub id_list: Option<String>,
    pub labels: Vec<Label>,
    pub list: Option<ListRef>,
}

impl Card {
    /// Label names in card order.
    pub fn label_names(&self) -> Vec<String> {
        self.labels.iter().map(|l| l.name.clone()).collect()
    }
}

/// One teaching activity parsed from a card.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Activity {
    pub id: String,
    pub name: String,
    pub description: String,
    pub url: Option<String>,
    pub list_name: String,
    pub level: String,
    pub duration_minutes: u32,
    pub category: String,
    pub materials: String,
    pub tags: Vec<String>,
    /// Every `[key: value]` tag found in the description, keys lower-cased.
    pub parsed_fields: BTreeMap<String, String>,
}

/// Lesson plan request payload.
#[derive(Debug, Clone, Deserialize)]
pub struct LessonRequest {
    #[serde(alias = "student_level")]
    pub level: String,
    pub focus_area: Option<String>,
    #[serde(default = "default_lesson_minutes", alias = "total_duration")]
    pub total_duration_minutes: u32,
}

fn default_lesson_minutes() -> u32 {
    DEFAULT_LESSON_MINUTES
}

impl LessonRequest {
    pub fn new(level: impl Into<String>) -> Self {
        Self {
            level: level.into(),
            focus_area: None,
            total_duration_minutes: DEFAULT_LESSON_MINUTES,
        }
    }

    pub fn with_focus(mut self, focus_area: impl Into<String>) -> Self {
        self.focus_area = Some(focus_area.into());
        self
    }

    pub fn with_duration(mut self, minutes: u32) -> Self {
        self.total_duration_minutes = minutes;
        self
    }
}

/// Warm-up, main activities and the reserved cooldown slot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LessonStructure {
    pub warmup: Option<Activity>,
    pub main_activities: Vec<Activity>,
    /// Ten minutes are reserved for this slot but nothing fills it yet.
    pub cooldown: Option<Activity>,
}

/// Assembled lesson plan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LessonPlan {
    pub level: String,
    pub focus_area: String,
    pub total_duration_minutes: u32,
    pub structure: LessonStructure,
    pub materials_needed: Vec<String>,
    pub estimated_duration_minutes: u32,
}

/// Canva design reference recorded on a stored lesson plan.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CanvaDesignRef {
    pub design_id: String,
    #[serde(default)]
    pub edit_url: String,
    #[serde(default)]
    pub view_url: String,
    pub created_at: String,
}

/// Lesson plan as stored in DynamoDB.
///
/// The plan body is kept as a free-form document: plans can be generated by
/// the assembler or written by hand or by the assistant.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SavedLessonPlan {
    pub id: String,
    pub created_at: String,
    pub status: String,
    pub lesson_plan: serde_json::Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub canva_design: Option<CanvaDesignRef>,
}

/// Response for a save request.
#[derive(Debug, Serialize)]
pub struct SaveLessonPlanResponse {
    pub id: String,
    pub created_at: String,
    pub status: String,
    pub table_name: String,
    pub lesson_plan: serde_json::Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trello_card_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trello_url: Option<String>,
}

/// Body of a save request.
#[derive(Debug, Clone, Deserialize)]
pub struct SaveLessonPlanRequest {
    pub lesson_plan: serde_json::Value,
    pub plan_id: Option<String>,
}

/// Presentation from a stored plan id or inline plan data.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct CanvaPresentationRequest {
    pub lesson_plan_id: Option<String>,
    #[serde(alias = "lesson_plan")]
    pub lesson_plan_data: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CanvaActivityRequest {
    #[serde(alias = "activity")]
    pub activity_data: serde_json::Value,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CanvaExportRequest {
    pub design_id: String,
    #[serde(default = "default_export_format")]
    pub format: String,
}

fn default_export_format() -> String {
    "pdf".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lesson_request_accepts_original_keys() {
        let req: LessonRequest = serde_json::from_str(
            r#"{"student_level":"beginner","focus_area":"Grammar","total_duration":90}"#,
        )
        .unwrap();
        assert_eq!(req.level, "beginner");
        assert_eq!(req.focus_area.as_deref(), Some("Grammar"));
        assert_eq!(req.total_duration_minutes, 90);

        let req: LessonRequest = serde_json::from_str(r#"{"level":"advanced"}"#).unwrap();
        assert_eq!(req.total_duration_minutes, DEFAULT_LESSON_MINUTES);

        let req: LessonRequest =
            serde_json::from_str(r#"{"level":"advanced","total_duration_minutes":45}"#).unwrap();
        assert_eq!(req.total_duration_minutes, 45);
        assert!(req.focus_area.is_none());
    }

    #[test]
    fn test_card_tolerates_missing_fields() {
        let card: Card = serde_json::from_str(
            r#"{"id":"c1","name":"Warmup","labels":[{"name":"Speaking","color":"purple"}]}"#,
        )
        .unwrap();
        assert_eq!(card.desc, "");
        assert_eq!(card.label_names(), vec!["Speaking".to_string()]);
        assert!(card.list.is_none());
    }

    #[test]
    fn test_canva_requests_accept_short_keys() {
        let req: CanvaPresentationRequest =
            serde_json::from_str(r#"{"lesson_plan":{"level":"beginner"}}"#).unwrap();
        assert!(req.lesson_plan_id.is_none());
        assert_eq!(req.lesson_plan_data.unwrap()["level"], "beginner");

        let export: CanvaExportRequest = serde_json::from_str(r#"{"design_id":"D1"}"#).unwrap();
        assert_eq!(export.format, "pdf");
    }
}
