//! Lesson plan assembly from a pool of parsed activities.
//!
//! The assembler picks the first short activity as a warm-up, reserves a fixed
//! block for a cooldown, then packs main activities smallest-first into what is
//! left of the budget. It is a pure function of its inputs.

use crate::catalog::eq_ignore_case;
use crate::models::{Activity, LessonPlan, LessonRequest, LessonStructure};
use crate::{Error, Result};

/// Longest activity that can serve as a warm-up.
pub const WARMUP_MAX_MINUTES: u32 = 15;
/// Minutes held back for the cooldown slot.
pub const COOLDOWN_RESERVE_MINUTES: i64 = 10;
pub const DEFAULT_FOCUS_AREA: &str = "general";

/// Keeps first-seen order and drops repeats.
#[derive(Debug, Default)]
struct MaterialsChecklist(Vec<String>);

impl MaterialsChecklist {
    fn add(&mut self, materials: &str) {
        if !materials.is_empty() && !self.0.iter().any(|m| m == materials) {
            self.0.push(materials.to_string());
        }
    }

    fn into_vec(self) -> Vec<String> {
        self.0
    }
}

/// Activities at `level` (and in `focus_area` when given), in pool order.
pub fn filter_pool<'a>(
    pool: &'a [Activity],
    level: &str,
    focus_area: Option<&str>,
) -> Vec<&'a Activity> {
    pool.iter()
        .filter(|a| eq_ignore_case(&a.level, level))
        .filter(|a| focus_area.map_or(true, |focus| eq_ignore_case(&a.category, focus)))
        .collect()
}

/// Build a lesson plan for `request` out of `pool`.
///
/// Fails with [`Error::NoMatchingActivities`] when the level/focus filter
/// leaves nothing to choose from.
pub fn assemble(pool: &[Activity], request: &LessonRequest) -> Result<LessonPlan> {
    let focus_area = request.focus_area.as_deref();
    let candidates = filter_pool(pool, &request.level, focus_area);

    if candidates.is_empty() {
        return Err(Error::NoMatchingActivities {
            level: request.level.clone(),
            focus_area: request.focus_area.clone(),
        });
    }

    let mut materials = MaterialsChecklist::default();
    let mut estimated: i64 = 0;

    let warmup_index = candidates
        .iter()
        .position(|a| a.duration_minutes <= WARMUP_MAX_MINUTES);

    if let Some(index) = warmup_index {
        let warmup = candidates[index];
        estimated += i64::from(warmup.duration_minutes);
        materials.add(&warmup.materials);
    }

    let remaining_budget =
        i64::from(request.total_duration_minutes) - estimated - COOLDOWN_RESERVE_MINUTES;

    // Stable sort keeps pool order between equal durations.
    let mut by_duration: Vec<(usize, &Activity)> = candidates.iter().copied().enumerate().collect();
    by_duration.sort_by_key(|(_, a)| a.duration_minutes);

    let mut main_activities = Vec::new();
    let mut main_minutes: i64 = 0;

    for (index, activity) in by_duration {
        if Some(index) == warmup_index {
            continue;
        }
        let minutes = i64::from(activity.duration_minutes);
        if main_minutes + minutes <= remaining_budget {
            main_minutes += minutes;
            materials.add(&activity.materials);
            main_activities.push(activity.clone());
        }
    }
    estimated += main_minutes;

    Ok(LessonPlan {
        level: request.level.clone(),
        focus_area: request
            .focus_area
            .clone()
            .unwrap_or_else(|| DEFAULT_FOCUS_AREA.to_string()),
        total_duration_minutes: request.total_duration_minutes,
        structure: LessonStructure {
            warmup: warmup_index.map(|index| candidates[index].clone()),
            main_activities,
            cooldown: None,
        },
        materials_needed: materials.into_vec(),
        estimated_duration_minutes: u32::try_from(estimated).unwrap_or(u32::MAX),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    fn activity(id: &str, minutes: u32, level: &str, category: &str, materials: &str) -> Activity {
        Activity {
            id: id.to_string(),
            name: format!("Activity {id}"),
            description: String::new(),
            url: None,
            list_name: "Unknown".to_string(),
            level: level.to_string(),
            duration_minutes: minutes,
            category: category.to_string(),
            materials: materials.to_string(),
            tags: Vec::new(),
            parsed_fields: BTreeMap::new(),
        }
    }

    fn ids(activities: &[Activity]) -> Vec<&str> {
        activities.iter().map(|a| a.id.as_str()).collect()
    }

    fn beginner_pool() -> Vec<Activity> {
        vec![
            activity("a10", 10, "beginner", "general", ""),
            activity("b25", 25, "beginner", "general", ""),
            activity("c15", 15, "beginner", "general", ""),
            activity("d30", 30, "beginner", "general", ""),
        ]
    }

    #[test]
    fn test_packs_smallest_first_within_budget() {
        let request = LessonRequest::new("beginner").with_duration(60);
        let plan = assemble(&beginner_pool(), &request).unwrap();

        assert_eq!(plan.structure.warmup.as_ref().map(|a| a.id.as_str()), Some("a10"));
        assert_eq!(ids(&plan.structure.main_activities), vec!["c15", "b25"]);
        assert_eq!(plan.estimated_duration_minutes, 50);
        assert!(plan.structure.cooldown.is_none());
        assert_eq!(plan.focus_area, "general");
        assert_eq!(plan.total_duration_minutes, 60);
    }

    #[test]
    fn test_unknown_level_is_an_error() {
        let mut pool = beginner_pool();
        pool.push(activity("i1", 20, "intermediate", "general", ""));
        pool.push(activity("adv", 20, "advanced", "general", ""));

        let err = assemble(&pool, &LessonRequest::new("native")).unwrap_err();
        match err {
            Error::NoMatchingActivities { level, focus_area } => {
                assert_eq!(level, "native");
                assert!(focus_area.is_none());
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_focus_filter_reported_in_error() {
        let err = assemble(&beginner_pool(), &LessonRequest::new("beginner").with_focus("Writing"))
            .unwrap_err();
        assert!(matches!(
            err,
            Error::NoMatchingActivities { focus_area: Some(ref f), .. } if f == "Writing"
        ));
    }

    #[test]
    fn test_level_and_focus_compare_case_insensitively() {
        let pool = vec![
            activity("g1", 20, "Beginner", "Grammar", ""),
            activity("s1", 20, "beginner", "Speaking", ""),
        ];
        let plan = assemble(&pool, &LessonRequest::new("BEGINNER").with_focus("grammar")).unwrap();
        assert_eq!(ids(&plan.structure.main_activities), vec!["g1"]);
        assert_eq!(plan.level, "BEGINNER");
        assert_eq!(plan.structure.main_activities[0].level, "Beginner");
    }

    #[test]
    fn test_warmup_is_first_short_activity_in_pool_order() {
        let pool = vec![
            activity("long", 40, "beginner", "general", ""),
            activity("w15", 15, "beginner", "general", ""),
            activity("w5", 5, "beginner", "general", ""),
        ];
        let plan = assemble(&pool, &LessonRequest::new("beginner")).unwrap();
        assert_eq!(plan.structure.warmup.as_ref().map(|a| a.id.as_str()), Some("w15"));
        assert_eq!(ids(&plan.structure.main_activities), vec!["w5", "long"]);
    }

    #[test]
    fn test_no_warmup_when_everything_is_long() {
        let pool = vec![
            activity("x", 30, "beginner", "general", ""),
            activity("y", 20, "beginner", "general", ""),
        ];
        let plan = assemble(&pool, &LessonRequest::new("beginner").with_duration(45)).unwrap();
        assert!(plan.structure.warmup.is_none());
        assert_eq!(ids(&plan.structure.main_activities), vec!["y"]);
        assert_eq!(plan.estimated_duration_minutes, 20);
    }

    #[test]
    fn test_identical_twin_of_warmup_is_still_a_main_candidate() {
        let pool = vec![
            activity("same", 10, "beginner", "general", ""),
            activity("same", 10, "beginner", "general", ""),
        ];
        let plan = assemble(&pool, &LessonRequest::new("beginner")).unwrap();
        assert_eq!(plan.structure.main_activities.len(), 1);
        assert_eq!(plan.estimated_duration_minutes, 20);
    }

    #[test]
    fn test_equal_durations_keep_pool_order() {
        let pool = vec![
            activity("first", 20, "beginner", "general", ""),
            activity("second", 20, "beginner", "general", ""),
            activity("third", 20, "beginner", "general", ""),
        ];
        let plan = assemble(&pool, &LessonRequest::new("beginner").with_duration(50)).unwrap();
        assert_eq!(ids(&plan.structure.main_activities), vec!["first", "second"]);
    }

    #[test]
    fn test_tight_budget_leaves_only_warmup() {
        let pool = vec![
            activity("w", 10, "beginner", "general", ""),
            activity("m20", 20, "beginner", "general", ""),
            activity("m20b", 20, "beginner", "general", ""),
        ];
        // 30 - 10 warm-up - 10 cooldown leaves 10: nothing else fits.
        let plan = assemble(&pool, &LessonRequest::new("beginner").with_duration(30)).unwrap();
        assert!(plan.structure.main_activities.is_empty());
        assert_eq!(plan.estimated_duration_minutes, 10);
    }

    #[test]
    fn test_budget_smaller_than_reserve_selects_only_warmup() {
        let plan = assemble(&beginner_pool(), &LessonRequest::new("beginner").with_duration(5)).unwrap();
        assert!(plan.structure.warmup.is_some());
        assert!(plan.structure.main_activities.is_empty());
    }

    #[test]
    fn test_materials_are_deduplicated_in_first_seen_order() {
        let pool = vec![
            activity("w", 10, "beginner", "general", "Flashcards"),
            activity("m1", 15, "beginner", "general", "Worksheet"),
            activity("m2", 20, "beginner", "general", "Flashcards"),
            activity("m3", 25, "beginner", "general", ""),
        ];
        let plan = assemble(&pool, &LessonRequest::new("beginner")).unwrap();
        assert_eq!(plan.materials_needed, vec!["Flashcards", "Worksheet"]);
    }

    #[test]
    fn test_assembly_is_repeatable() {
        let pool = beginner_pool();
        let request = LessonRequest::new("beginner").with_duration(90);
        assert_eq!(assemble(&pool, &request).unwrap(), assemble(&pool, &request).unwrap());
    }
}
