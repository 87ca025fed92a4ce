//! Card parser for the `[key: value]` description micro-format.
//!
//! Content authors tag activity cards with bracketed fields such as
//! `[level: beginner] [duration: 15 minutes] [materials: flashcards]`.
//! Parsing never fails: anything missing or malformed falls back to a default.

use regex::Regex;
use std::collections::BTreeMap;
use std::sync::OnceLock;

use crate::models::{Activity, Card};

pub const DEFAULT_LEVEL: &str = "intermediate";
pub const DEFAULT_DURATION_MINUTES: u32 = 20;
pub const DEFAULT_CATEGORY: &str = "general";
pub const DEFAULT_LIST_NAME: &str = "Unknown";

fn tag_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"\[(\w+):\s*([^\]]+)\]").expect("tag pattern is valid"))
}

/// Extract every `[key: value]` tag from a description.
///
/// Keys are lower-cased and values trimmed. A repeated key keeps its last value.
pub fn extract_tags(description: &str) -> BTreeMap<String, String> {
    let mut fields = BTreeMap::new();
    for caps in tag_pattern().captures_iter(description) {
        fields.insert(caps[1].to_lowercase(), caps[2].trim().to_string());
    }
    fields
}

/// Parse the leading integer of a duration value such as `"15 minutes"`.
///
/// Returns `None` when the first token is not a positive integer.
pub fn parse_duration(value: &str) -> Option<u32> {
    value
        .split_whitespace()
        .next()
        .and_then(|token| token.parse::<u32>().ok())
        .filter(|minutes| *minutes > 0)
}

/// Convert one card into an [`Activity`].
pub fn parse_card(card: &Card) -> Activity {
    let fields = extract_tags(&card.desc);
    let labels = card.label_names();

    let level = fields
        .get("level")
        .cloned()
        .unwrap_or_else(|| DEFAULT_LEVEL.to_string());

    let duration_minutes = fields
        .get("duration")
        .and_then(|value| parse_duration(value))
        .unwrap_or(DEFAULT_DURATION_MINUTES);

    let category = fields
        .get("category")
        .cloned()
        .or_else(|| labels.first().cloned())
        .unwrap_or_else(|| DEFAULT_CATEGORY.to_string());

    let materials = fields.get("materials").cloned().unwrap_or_default();

    let list_name = card
        .list
        .as_ref()
        .map(|list| list.name.clone())
        .unwrap_or_else(|| DEFAULT_LIST_NAME.to_string());

    Activity {
        id: card.id.clone(),
        name: card.name.clone(),
        description: card.desc.clone(),
        url: card.url.clone(),
        list_name,
        level,
        duration_minutes,
        category,
        materials,
        tags: labels,
        parsed_fields: fields,
    }
}

/// Parse a whole board snapshot, keeping card order.
pub fn parse_cards(cards: &[Card]) -> Vec<Activity> {
    cards.iter().map(parse_card).collect()
}
