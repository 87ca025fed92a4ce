//! Filtering and keyword search over the activity bank.

use serde::Deserialize;

use crate::models::Activity;

/// Case-folded comparison; stored values keep their casing.
pub(crate) fn eq_ignore_case(a: &str, b: &str) -> bool {
    a.to_lowercase() == b.to_lowercase()
}

/// Optional filters for listing activities.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ActivityFilter {
    pub category: Option<String>,
    pub level: Option<String>,
    /// Drop activities longer than this many minutes.
    #[serde(alias = "duration")]
    pub max_duration: Option<u32>,
}

impl ActivityFilter {
    pub fn matches(&self, activity: &Activity) -> bool {
        if let Some(category) = &self.category {
            if !eq_ignore_case(&activity.category, category) {
                return false;
            }
        }
        if let Some(level) = &self.level {
            if !eq_ignore_case(&activity.level, level) {
                return false;
            }
        }
        if let Some(max) = self.max_duration {
            if activity.duration_minutes > max {
                return false;
            }
        }
        true
    }

    pub fn apply(&self, activities: Vec<Activity>) -> Vec<Activity> {
        activities.into_iter().filter(|a| self.matches(a)).collect()
    }
}

/// Case-insensitive substring search over name, description and tags.
pub fn search(activities: Vec<Activity>, query: &str) -> Vec<Activity> {
    let needle = query.to_lowercase();
    activities
        .into_iter()
        .filter(|activity| {
            let haystack = format!(
                "{} {} {}",
                activity.name,
                activity.description,
                activity.tags.join(" ")
            )
            .to_lowercase();
            haystack.contains(&needle)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Card, Label};
    use crate::parser::parse_card;

    fn bank() -> Vec<Activity> {
        let cards = vec![
            Card {
                id: "1".to_string(),
                name: "Present Perfect Practice".to_string(),
                desc: "[level: Intermediate] [duration: 20 minutes] [category: Grammar]".to_string(),
                ..Default::default()
            },
            Card {
                id: "2".to_string(),
                name: "Business Meeting Roleplay".to_string(),
                desc: "[level: Advanced] [duration: 30]".to_string(),
                labels: vec![Label {
                    name: "Speaking".to_string(),
                    ..Default::default()
                }],
                ..Default::default()
            },
            Card {
                id: "3".to_string(),
                name: "Two Truths and a Lie".to_string(),
                desc: "[level: intermediate] [duration: 10] icebreaker".to_string(),
                labels: vec![Label {
                    name: "Warmup".to_string(),
                    ..Default::default()
                }],
                ..Default::default()
            },
        ];
        cards.iter().map(parse_card).collect()
    }

    fn ids(activities: &[Activity]) -> Vec<&str> {
        activities.iter().map(|a| a.id.as_str()).collect()
    }

    #[test]
    fn test_empty_filter_keeps_everything() {
        assert_eq!(ids(&ActivityFilter::default().apply(bank())), vec!["1", "2", "3"]);
    }

    #[test]
    fn test_level_and_duration_filters() {
        let filter = ActivityFilter {
            level: Some("INTERMEDIATE".to_string()),
            max_duration: Some(15),
            ..Default::default()
        };
        assert_eq!(ids(&filter.apply(bank())), vec!["3"]);
    }

    #[test]
    fn test_category_filter_uses_label_fallback() {
        let filter = ActivityFilter {
            category: Some("speaking".to_string()),
            ..Default::default()
        };
        assert_eq!(ids(&filter.apply(bank())), vec!["2"]);
    }

    #[test]
    fn test_search_covers_name_description_and_tags() {
        assert_eq!(ids(&search(bank(), "roleplay")), vec!["2"]);
        assert_eq!(ids(&search(bank(), "ICEBREAKER")), vec!["3"]);
        assert_eq!(ids(&search(bank(), "warmup")), vec!["3"]);
        assert!(search(bank(), "pronunciation").is_empty());
    }

    #[test]
    fn test_case_folding_keeps_stored_casing() {
        assert!(eq_ignore_case("Business English", "business english"));
        assert!(eq_ignore_case("ÉCRITURE", "écriture"));
        assert!(!eq_ignore_case("Grammar", "Grammar Review"));

        let filter = ActivityFilter {
            category: Some("GRAMMAR".to_string()),
            ..Default::default()
        };
        let matched = filter.apply(bank());
        assert_eq!(ids(&matched), vec!["1"]);
        assert_eq!(matched[0].category, "Grammar");
    }
}
