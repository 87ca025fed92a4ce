//! Interpreting `@ai` comments and board events from Trello.

use regex::Regex;
use std::sync::OnceLock;

use crate::assistant::COMMENT_PREFIX;
use crate::feedback::{parse_comment_feedback, CommentFeedback};
use crate::models::Card;

pub const MENTION: &str = "@ai";

const DEFAULT_SUGGESTION_LEVEL: &str = "intermediate";
const DEFAULT_SUGGESTION_MINUTES: u32 = 30;
const DEFAULT_LESSON_MINUTES: u32 = 120;
const DEFAULT_FOCUS: &str = "general english";
const FOCUS_SKILLS: [&str; 5] = ["grammar", "speaking", "writing", "reading", "business"];

/// What a teacher asked for in an `@ai` comment.
#[derive(Debug, Clone, PartialEq)]
pub enum CommentIntent {
    /// Feedback on the lesson plan the card mirrors
    Feedback(CommentFeedback),
    SuggestActivities { level: String, minutes: u32 },
    BuildLessonPlan { minutes: u32 },
    AnalyzeActivity,
    FindAlternatives,
    /// Anything else, with the mention stripped
    Question(String),
}

fn level_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"(?i)(beginner|intermediate|advanced)").expect("level pattern is valid")
    })
}

fn minutes_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"(\d+)\s*min").expect("minutes pattern is valid"))
}

fn minutes_in(request: &str) -> Option<u32> {
    minutes_pattern()
        .captures(request)
        .and_then(|caps| caps[1].parse().ok())
}

pub fn mentions_assistant(comment: &str) -> bool {
    comment.to_lowercase().contains(MENTION)
}

/// Whether the comment was posted by the assistant itself.
pub fn is_own_comment(comment: &str) -> bool {
    let comment = comment.trim();
    comment.starts_with(COMMENT_PREFIX.trim_end())
        || [SCHEDULED_COMMENT, LESSON_BUILDER_COMMENT]
            .iter()
            .any(|own| comment == own.trim())
}

/// Classify an `@ai` comment. Returns `None` when the assistant is not
/// mentioned or the comment is one of its own.
pub fn classify(comment: &str) -> Option<CommentIntent> {
    if !mentions_assistant(comment) || is_own_comment(comment) {
        return None;
    }
    if let Some(feedback) = parse_comment_feedback(comment) {
        return Some(CommentIntent::Feedback(feedback));
    }
    Some(classify_request(&strip_mention(comment)))
}

/// Classify a request that is not feedback.
pub fn classify_request(request: &str) -> CommentIntent {
    if request.contains("suggest") && request.contains("activity") {
        let level = level_pattern()
            .captures(request)
            .map(|caps| caps[1].to_lowercase())
            .unwrap_or_else(|| DEFAULT_SUGGESTION_LEVEL.to_string());
        CommentIntent::SuggestActivities {
            level,
            minutes: minutes_in(request).unwrap_or(DEFAULT_SUGGESTION_MINUTES),
        }
    } else if request.contains("lesson plan") || request.contains("build lesson") {
        CommentIntent::BuildLessonPlan {
            minutes: minutes_in(request).unwrap_or(DEFAULT_LESSON_MINUTES),
        }
    } else if request.contains("analyze") {
        CommentIntent::AnalyzeActivity
    } else if request.contains("alternative") {
        CommentIntent::FindAlternatives
    } else {
        CommentIntent::Question(request.to_string())
    }
}

/// Lower-case the comment and drop every `@ai` mention.
pub fn strip_mention(comment: &str) -> String {
    comment.to_lowercase().replace(MENTION, "").trim().to_string()
}

/// First skill-like label on the card, lower-cased.
pub fn focus_from_card(card: &Card) -> String {
    card.labels
        .iter()
        .map(|label| label.name.to_lowercase())
        .find(|name| FOCUS_SKILLS.iter().any(|skill| name.contains(skill)))
        .unwrap_or_else(|| DEFAULT_FOCUS.to_string())
}

/// Lists whose arrival triggers board automation.
pub const THIS_WEEK_LIST: &str = "This Week";

pub const PREPARATION_CHECKLIST_NAME: &str = "📋 Preparation Checklist";

pub const PREPARATION_ITEMS: [&str; 5] = [
    "Review activity materials",
    "Check equipment needed",
    "Prepare handouts/worksheets",
    "Set up learning environment",
    "Review student backgrounds",
];

pub const SCHEDULED_COMMENT: &str = "🗓️ **Scheduled for This Week**\n\nI've added a preparation \
checklist. Need any help with materials or setup? Just ask @ai!";

pub const COMMAND_CARD_PREFIX: &str = "🤖 AI:";

pub const LESSON_BUILDER_COMMENT: &str = "🤖 **Lesson Builder Ready**\n\nI'll help build your \
lesson! Please provide:\n- Student level\n- Duration\n- Focus area\n- Any specific \
requirements\n\nJust comment with these details!";

/// Whether a card moved into `list_name` should get a preparation checklist.
pub fn is_scheduling_move(list_name: &str) -> bool {
    list_name.contains(THIS_WEEK_LIST)
}

/// Whether a newly created card asks for the lesson builder.
pub fn is_lesson_builder_card(card_name: &str) -> bool {
    card_name.starts_with(COMMAND_CARD_PREFIX) && card_name.contains("Build Lesson")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feedback::FeedbackType;
    use crate::models::Label;

    #[test]
    fn test_no_mention_means_no_intent() {
        assert_eq!(classify("great activity!"), None);
    }

    #[test]
    fn test_own_comments_are_ignored() {
        assert_eq!(classify(SCHEDULED_COMMENT), None);
        assert_eq!(classify(&format!("{}\n", SCHEDULED_COMMENT)), None);
        let reply = crate::assistant::format_comment("Try a quick @ai warm-up quiz next time.");
        assert!(is_own_comment(&reply));
        assert_eq!(classify(&reply), None);
        assert!(!is_own_comment("@ai analyze this"));
    }

    #[test]
    fn test_feedback_takes_priority() {
        match classify("@ai like: students loved it") {
            Some(CommentIntent::Feedback(fb)) => assert_eq!(fb.feedback_type, FeedbackType::Like),
            other => panic!("unexpected intent: {other:?}"),
        }
    }

    #[test]
    fn test_activity_suggestion_parameters() {
        assert_eq!(
            classify("@ai suggest an activity for Advanced students, 45 min"),
            Some(CommentIntent::SuggestActivities {
                level: "advanced".to_string(),
                minutes: 45
            })
        );
        assert_eq!(
            classify("@AI please suggest an activity"),
            Some(CommentIntent::SuggestActivities {
                level: "intermediate".to_string(),
                minutes: 30
            })
        );
    }

    #[test]
    fn test_lesson_plan_defaults_to_two_hours() {
        assert_eq!(
            classify("@ai build lesson from this"),
            Some(CommentIntent::BuildLessonPlan { minutes: 120 })
        );
        assert_eq!(
            classify("@ai make a lesson plan for 90 minutes"),
            Some(CommentIntent::BuildLessonPlan { minutes: 90 })
        );
    }

    #[test]
    fn test_other_requests() {
        assert_eq!(classify("@ai analyze this"), Some(CommentIntent::AnalyzeActivity));
        assert_eq!(classify("@ai any alternatives?"), Some(CommentIntent::FindAlternatives));
        assert_eq!(
            classify("@ai How do I pace this?"),
            Some(CommentIntent::Question("how do i pace this?".to_string()))
        );
    }

    #[test]
    fn test_focus_from_labels() {
        let card = Card {
            labels: vec![
                Label { name: "Advanced".to_string(), ..Default::default() },
                Label { name: "Business English".to_string(), ..Default::default() },
            ],
            ..Default::default()
        };
        assert_eq!(focus_from_card(&card), "business english");
        assert_eq!(focus_from_card(&Card::default()), "general english");
    }

    #[test]
    fn test_board_automation_triggers() {
        assert!(is_scheduling_move("📅 This Week"));
        assert!(!is_scheduling_move("⏰ Today"));
        assert!(is_lesson_builder_card("🤖 AI: Build Lesson - Sample Request"));
        assert!(!is_lesson_builder_card("Build Lesson"));
    }
}
