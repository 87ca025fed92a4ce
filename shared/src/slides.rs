//! Turning lesson plans into presentation slides.
//!
//! Plans arrive as free-form JSON (assembled plans, saved plans or
//! hand-written ones) so every field is optional and both `duration` and
//! `duration_minutes` spellings are accepted.

use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::{Error, Result};

const MAX_OBJECTIVES: usize = 5;
const MAX_SKILLS: usize = 3;

/// Lesson plan as read for slide generation.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct PresentationSource {
    pub title: Option<String>,
    pub level: Option<String>,
    #[serde(alias = "total_duration_minutes")]
    pub total_duration: Option<u32>,
    pub focus_area: Option<String>,
    #[serde(deserialize_with = "null_as_default")]
    pub objectives: Vec<String>,
    #[serde(deserialize_with = "null_as_default")]
    pub materials_needed: Vec<String>,
    #[serde(deserialize_with = "null_as_default")]
    pub skills: Vec<String>,
    pub homework: Option<String>,
    pub next_lesson: Option<String>,
    #[serde(deserialize_with = "null_as_default")]
    pub structure: SourceStructure,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct SourceStructure {
    pub warmup: Option<SourceActivity>,
    #[serde(deserialize_with = "null_as_default")]
    pub main_activities: Vec<SourceActivity>,
    pub cooldown: Option<SourceActivity>,
}

/// Activity as read for slide generation.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct SourceActivity {
    pub name: Option<String>,
    #[serde(deserialize_with = "null_as_default")]
    pub description: String,
    #[serde(alias = "duration_minutes")]
    pub duration: Option<u32>,
    #[serde(deserialize_with = "null_as_default")]
    pub category: String,
    #[serde(deserialize_with = "null_as_default")]
    pub level: String,
    /// Either a list of items or a single string
    pub materials: Value,
    #[serde(deserialize_with = "null_as_default")]
    pub instructions: Vec<String>,
}

/// Explicit `null` reads as the field's default.
fn null_as_default<'de, D, T>(deserializer: D) -> std::result::Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

impl SourceActivity {
    fn materials_text(&self) -> String {
        match &self.materials {
            Value::String(s) => s.clone(),
            Value::Array(items) => items
                .iter()
                .filter_map(Value::as_str)
                .collect::<Vec<_>>()
                .join(", "),
            _ => String::new(),
        }
    }
}

impl PresentationSource {
    pub fn from_value(plan: &Value) -> Result<Self> {
        serde_json::from_value(plan.clone())
            .map_err(|e| Error::Validation(format!("Unreadable lesson plan: {}", e)))
    }

    fn focus(&self) -> Option<&str> {
        self.focus_area.as_deref().filter(|f| !f.is_empty())
    }

    /// Design title used for the presentation.
    pub fn design_title(&self) -> String {
        format!("Lesson: {}", self.title.as_deref().unwrap_or("Untitled"))
    }
}

/// Content of an activity slide.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ActivitySlide {
    pub heading: String,
    pub title: String,
    pub duration: String,
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub level: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub materials: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub instructions: Vec<String>,
}

/// Content of a standalone activity card.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ActivityCard {
    pub title: String,
    pub duration: String,
    pub level: String,
    pub category: String,
    pub description: String,
    pub materials: String,
    pub instructions: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", content = "elements", rename_all = "snake_case")]
pub enum Slide {
    Title {
        title: String,
        subtitle: String,
        duration: String,
        date: String,
    },
    Objectives {
        heading: String,
        bullet_points: Vec<String>,
    },
    Materials {
        heading: String,
        items: Vec<String>,
    },
    Activity(ActivitySlide),
    Summary {
        heading: String,
        key_points: Vec<String>,
        homework: String,
        next_lesson: String,
    },
    ActivityCard(ActivityCard),
}

fn minutes(duration: Option<u32>, default: u32) -> String {
    format!("{} minutes", duration.unwrap_or(default))
}

fn phase_slide(activity: &SourceActivity, heading: &str, fallback_name: &str) -> ActivitySlide {
    ActivitySlide {
        heading: heading.to_string(),
        title: activity.name.clone().unwrap_or_else(|| fallback_name.to_string()),
        duration: minutes(activity.duration, 10),
        description: activity.description.clone(),
        category: None,
        level: None,
        materials: None,
        instructions: activity.instructions.clone(),
    }
}

/// Build the slide deck for a lesson plan dated `date`.
pub fn lesson_slides(source: &PresentationSource, date: NaiveDate) -> Vec<Slide> {
    let mut slides = vec![Slide::Title {
        title: source.title.clone().unwrap_or_else(|| "Lesson Plan".to_string()),
        subtitle: format!("Level: {}", source.level.as_deref().unwrap_or("Intermediate")),
        duration: minutes(source.total_duration, 90),
        date: date.format("%B %d, %Y").to_string(),
    }];

    let mut objectives = source.objectives.clone();
    if objectives.is_empty() {
        if let Some(focus) = source.focus() {
            objectives.push(format!("Master {} concepts", focus));
        }
    }
    objectives.truncate(MAX_OBJECTIVES);
    slides.push(Slide::Objectives {
        heading: "Learning Objectives".to_string(),
        bullet_points: objectives,
    });

    if !source.materials_needed.is_empty() {
        slides.push(Slide::Materials {
            heading: "Materials Needed".to_string(),
            items: source.materials_needed.clone(),
        });
    }

    let structure = &source.structure;
    if let Some(warmup) = &structure.warmup {
        slides.push(Slide::Activity(phase_slide(warmup, "Warm-Up Activity", "Warm-up")));
    }

    for (i, activity) in structure.main_activities.iter().enumerate() {
        let n = i + 1;
        slides.push(Slide::Activity(ActivitySlide {
            heading: format!("Activity {}", n),
            title: activity.name.clone().unwrap_or_else(|| format!("Activity {}", n)),
            duration: minutes(activity.duration, 15),
            description: activity.description.clone(),
            category: Some(activity.category.clone()),
            level: Some(activity.level.clone()),
            materials: Some(activity.materials_text()),
            instructions: Vec::new(),
        }));
    }

    if let Some(cooldown) = &structure.cooldown {
        let mut slide = phase_slide(cooldown, "Cool-Down & Review", "Cool-down");
        slide.instructions.clear();
        slides.push(Slide::Activity(slide));
    }

    slides.push(Slide::Summary {
        heading: "Lesson Summary".to_string(),
        key_points: key_points(source),
        homework: source
            .homework
            .clone()
            .unwrap_or_else(|| "Review today's materials".to_string()),
        next_lesson: source
            .next_lesson
            .clone()
            .unwrap_or_else(|| "To be announced".to_string()),
    });

    slides
}

/// Slides for today's date.
pub fn lesson_slides_today(source: &PresentationSource) -> Vec<Slide> {
    lesson_slides(source, Utc::now().date_naive())
}

fn key_points(source: &PresentationSource) -> Vec<String> {
    let mut points = Vec::new();
    if let Some(focus) = source.focus() {
        points.push(format!("Focused on {}", focus));
    }
    let count = source.structure.main_activities.len();
    if count > 0 {
        points.push(format!("Completed {} main activities", count));
    }
    if !source.skills.is_empty() {
        let skills: Vec<&str> = source.skills.iter().take(MAX_SKILLS).map(String::as_str).collect();
        points.push(format!("Practiced: {}", skills.join(", ")));
    }
    if points.is_empty() {
        points = vec!["Great work today!".to_string(), "Keep practicing!".to_string()];
    }
    points
}

/// Single-slide card for one activity.
pub fn activity_card(activity: &SourceActivity) -> ActivityCard {
    let non_empty = |value: &str, default: &str| {
        if value.is_empty() {
            default.to_string()
        } else {
            value.to_string()
        }
    };
    ActivityCard {
        title: activity.name.clone().unwrap_or_else(|| "Activity".to_string()),
        duration: minutes(activity.duration, 15),
        level: non_empty(&activity.level, "Intermediate"),
        category: non_empty(&activity.category, "General"),
        description: activity.description.clone(),
        materials: activity.materials_text(),
        instructions: activity.instructions.clone(),
    }
}
