//! Lesson plan feedback: types, comment parsing and pattern analysis.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::sync::OnceLock;

/// Kind of feedback a teacher leaves on a plan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FeedbackType {
    Like,
    Dislike,
    Improve,
    Rating,
}

impl FeedbackType {
    pub fn as_str(&self) -> &'static str {
        match self {
            FeedbackType::Like => "like",
            FeedbackType::Dislike => "dislike",
            FeedbackType::Improve => "improve",
            FeedbackType::Rating => "rating",
        }
    }

    /// Parse a type name case-insensitively.
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "like" => Some(FeedbackType::Like),
            "dislike" => Some(FeedbackType::Dislike),
            "improve" => Some(FeedbackType::Improve),
            "rating" => Some(FeedbackType::Rating),
            _ => None,
        }
    }
}

impl fmt::Display for FeedbackType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Feedback submission payload.
#[derive(Debug, Clone, Deserialize)]
pub struct FeedbackRequest {
    pub lesson_plan_id: String,
    pub feedback_type: String,
    pub feedback_text: String,
    pub rating: Option<i64>,
    #[serde(default = "default_source")]
    pub source: String,
}

fn default_source() -> String {
    "api".to_string()
}

/// Feedback as stored and returned.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedbackRecord {
    pub feedback_id: String,
    pub created_at: String,
    pub lesson_plan_id: String,
    pub feedback_type: String,
    pub feedback_text: String,
    #[serde(default = "unknown_source")]
    pub source: String,
    #[serde(default)]
    pub processed: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rating: Option<f64>,
}

fn unknown_source() -> String {
    "unknown".to_string()
}

/// Feedback recovered from a Trello comment.
#[derive(Debug, Clone, PartialEq)]
pub struct CommentFeedback {
    pub feedback_type: FeedbackType,
    pub feedback_text: String,
    pub rating: Option<i64>,
}

fn rating_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"(?i)rating:\s*(\d+)(?:/\d+)?").expect("rating pattern is valid"))
}

/// Text after `kind:` when present, otherwise the comment without `@ai kind`.
fn text_after_marker(comment: &str, lower: &str, kind: &str) -> String {
    let marker = format!("{}:", kind);
    if let Some(pos) = lower.find(&marker) {
        return comment[pos + marker.len()..].trim().to_string();
    }
    let phrase = format!("@ai {}", kind);
    match lower.find(&phrase) {
        Some(pos) => format!("{}{}", &comment[..pos], &comment[pos + phrase.len()..])
            .trim()
            .to_string(),
        None => comment.trim().to_string(),
    }
}

/// Parse `@ai like: ...`, `@ai dislike: ...`, `@ai improve: ...` or
/// `@ai rating: 4/5` style comments. Returns `None` for anything else.
pub fn parse_comment_feedback(comment: &str) -> Option<CommentFeedback> {
    // ASCII lowering keeps byte offsets aligned with the original text.
    let lower = comment.to_ascii_lowercase();
    if !lower.contains("@ai") {
        return None;
    }

    for (kind, feedback_type) in [
        ("dislike", FeedbackType::Dislike),
        ("like", FeedbackType::Like),
        ("improve", FeedbackType::Improve),
    ] {
        if lower.contains(&format!("{}:", kind)) || lower.contains(&format!("@ai {}", kind)) {
            return Some(CommentFeedback {
                feedback_type,
                feedback_text: text_after_marker(comment, &lower, kind),
                rating: None,
            });
        }
    }

    if lower.contains("rating:") {
        let rating = rating_pattern()
            .captures(comment)
            .and_then(|caps| caps[1].parse::<i64>().ok())?;
        return Some(CommentFeedback {
            feedback_type: FeedbackType::Rating,
            feedback_text: comment.to_string(),
            rating: Some(rating),
        });
    }

    None
}

/// Source tag recorded for comment feedback.
pub fn comment_source(card_id: &str) -> String {
    format!("trello_comment:{}", card_id)
}

/// Counts per feedback type.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct FeedbackBreakdown {
    pub like: u32,
    pub dislike: u32,
    pub improve: u32,
    pub rating: u32,
}

/// Aggregate view over all feedback.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FeedbackAnalysis {
    pub total_feedback: usize,
    pub feedback_breakdown: FeedbackBreakdown,
    pub average_rating: f64,
    pub common_likes: Vec<String>,
    pub common_dislikes: Vec<String>,
    pub improvement_suggestions: Vec<String>,
    pub lessons_with_feedback: usize,
}

const SAMPLE_SIZE: usize = 5;

/// Summarise feedback: counts, average rating and a few samples of each kind.
pub fn analyze(items: &[FeedbackRecord]) -> FeedbackAnalysis {
    let mut breakdown = FeedbackBreakdown::default();
    let mut ratings = Vec::new();
    let mut likes = Vec::new();
    let mut dislikes = Vec::new();
    let mut improvements = Vec::new();

    for item in items {
        match FeedbackType::parse(&item.feedback_type) {
            Some(FeedbackType::Like) => {
                breakdown.like += 1;
                likes.push(item.feedback_text.clone());
            }
            Some(FeedbackType::Dislike) => {
                breakdown.dislike += 1;
                dislikes.push(item.feedback_text.clone());
            }
            Some(FeedbackType::Improve) => {
                breakdown.improve += 1;
                improvements.push(item.feedback_text.clone());
            }
            Some(FeedbackType::Rating) => {
                breakdown.rating += 1;
                if let Some(rating) = item.rating.filter(|r| *r != 0.0) {
                    ratings.push(rating);
                }
            }
            None => {}
        }
    }

    let average_rating = if ratings.is_empty() {
        0.0
    } else {
        let mean = ratings.iter().sum::<f64>() / ratings.len() as f64;
        (mean * 100.0).round() / 100.0
    };

    let lessons: HashSet<&str> = items.iter().map(|i| i.lesson_plan_id.as_str()).collect();

    likes.truncate(SAMPLE_SIZE);
    dislikes.truncate(SAMPLE_SIZE);
    improvements.truncate(SAMPLE_SIZE);

    FeedbackAnalysis {
        total_feedback: items.len(),
        feedback_breakdown: breakdown,
        average_rating,
        common_likes: likes,
        common_dislikes: dislikes,
        improvement_suggestions: improvements,
        lessons_with_feedback: lessons.len(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(plan: &str, kind: &str, text: &str, rating: Option<f64>) -> FeedbackRecord {
        FeedbackRecord {
            feedback_id: format!("{plan}-{kind}-{text}"),
            created_at: "2025-01-01T00:00:00Z".to_string(),
            lesson_plan_id: plan.to_string(),
            feedback_type: kind.to_string(),
            feedback_text: text.to_string(),
            source: "api".to_string(),
            processed: false,
            rating,
        }
    }

    #[test]
    fn test_comment_without_mention_is_ignored() {
        assert_eq!(parse_comment_feedback("like: great warmup"), None);
        assert_eq!(parse_comment_feedback("@ai what should I teach next?"), None);
    }

    #[test]
    fn test_like_with_colon() {
        let fb = parse_comment_feedback("@ai like: the roleplay worked well").unwrap();
        assert_eq!(fb.feedback_type, FeedbackType::Like);
        assert_eq!(fb.feedback_text, "the roleplay worked well");
    }

    #[test]
    fn test_dislike_is_not_mistaken_for_like() {
        let fb = parse_comment_feedback("@AI Dislike: too long for beginners").unwrap();
        assert_eq!(fb.feedback_type, FeedbackType::Dislike);
        assert_eq!(fb.feedback_text, "too long for beginners");
    }

    #[test]
    fn test_phrase_without_colon() {
        let fb = parse_comment_feedback("@ai improve add a listening task").unwrap();
        assert_eq!(fb.feedback_type, FeedbackType::Improve);
        assert_eq!(fb.feedback_text, "add a listening task");
    }

    #[test]
    fn test_rating_with_scale() {
        let fb = parse_comment_feedback("@ai rating: 4/5").unwrap();
        assert_eq!(fb.feedback_type, FeedbackType::Rating);
        assert_eq!(fb.rating, Some(4));
        assert_eq!(fb.feedback_text, "@ai rating: 4/5");
        assert_eq!(parse_comment_feedback("@ai rating: great").map(|f| f.rating), None);
    }

    #[test]
    fn test_analysis_counts_and_samples() {
        let items = vec![
            record("p1", "like", "fun", None),
            record("p1", "dislike", "long", None),
            record("p2", "rating", "@ai rating: 4", Some(4.0)),
            record("p2", "rating", "@ai rating: 5", Some(5.0)),
            record("p3", "rating", "@ai rating: 3", Some(3.0)),
            record("p3", "improve", "more speaking", None),
            record("p3", "other", "ignored", None),
        ];
        let analysis = analyze(&items);
        assert_eq!(analysis.total_feedback, 7);
        assert_eq!(
            analysis.feedback_breakdown,
            FeedbackBreakdown { like: 1, dislike: 1, improve: 1, rating: 3 }
        );
        assert_eq!(analysis.average_rating, 4.0);
        assert_eq!(analysis.common_likes, vec!["fun"]);
        assert_eq!(analysis.improvement_suggestions, vec!["more speaking"]);
        assert_eq!(analysis.lessons_with_feedback, 3);
    }

    #[test]
    fn test_average_is_rounded_to_two_places() {
        let items = vec![
            record("p", "rating", "", Some(4.0)),
            record("p", "rating", "", Some(4.0)),
            record("p", "rating", "", Some(5.0)),
        ];
        assert_eq!(analyze(&items).average_rating, 4.33);
        assert_eq!(analyze(&[]).average_rating, 0.0);
    }

    #[test]
    fn test_samples_capped_at_five() {
        let items: Vec<_> = (0..8).map(|i| record("p", "like", &i.to_string(), None)).collect();
        assert_eq!(analyze(&items).common_likes.len(), 5);
    }
}
