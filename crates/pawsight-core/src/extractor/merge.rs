//! Folding newly extracted facts into a dog's fact history.

use std::collections::BTreeSet;

use chrono::Duration;

use crate::models::Fact;

/// Default identity window for duplicate facts.
pub const DEFAULT_MERGE_WINDOW_HOURS: i64 = 24;

/// Result of a merge: the full collection plus the IDs that must be persisted.
#[derive(Debug, Clone, Default)]
pub struct MergeOutcome {
    /// Existing facts (possibly updated in place) followed by appended new facts
    pub facts: Vec<Fact>,
    /// IDs of facts that were appended or updated
    pub changed_ids: BTreeSet<String>,
}

impl MergeOutcome {
    /// Facts that were appended or updated, in collection order.
    pub fn changed(&self) -> impl Iterator<Item = &Fact> {
        self.facts
            .iter()
            .filter(|f| self.changed_ids.contains(&f.id))
    }
}

/// Merge `new_facts` into `existing` using the default 24-hour window.
pub fn merge_facts(new_facts: Vec<Fact>, existing: Vec<Fact>) -> Vec<Fact> {
    merge(new_facts, existing, Duration::hours(DEFAULT_MERGE_WINDOW_HOURS)).facts
}

/// Merge `new_facts` into `existing`.
///
/// A new fact matches a fact of the same dog with the same primary tag and
/// category whose `occurred_at` lies strictly within `window`; of several
/// matches the most recent wins. When the new fact is not older than the
/// match, the match takes over its severity, possible conditions,
/// recommended actions and timestamp. An older new fact is dropped.
/// Unmatched or untagged facts are appended.
///
/// A moved timestamp never lands inside the window of another fact with the
/// same identity.
pub fn merge(new_facts: Vec<Fact>, existing: Vec<Fact>, window: Duration) -> MergeOutcome {
    let mut outcome = MergeOutcome {
        facts: existing,
        changed_ids: BTreeSet::new(),
    };

    for fact in new_facts {
        let Some(position) = find_duplicate(&outcome.facts, &fact, window) else {
            outcome.changed_ids.insert(fact.id.clone());
            outcome.facts.push(fact);
            continue;
        };

        let target = &mut outcome.facts[position];
        if fact.occurred_at >= target.occurred_at {
            target.severity = fact.severity;
            target.possible_conditions = fact.possible_conditions;
            target.recommended_actions = fact.recommended_actions;
            target.occurred_at = fact.occurred_at;
            outcome.changed_ids.insert(target.id.clone());
        }
    }

    outcome
}

fn find_duplicate(facts: &[Fact], candidate: &Fact, window: Duration) -> Option<usize> {
    let tag = candidate.primary_tag()?;
    facts
        .iter()
        .enumerate()
        .filter(|(_, f)| {
            f.dog_id == candidate.dog_id
                && f.category == candidate.category
                && f.primary_tag() == Some(tag)
                && (f.occurred_at - candidate.occurred_at).abs() < window
        })
        .max_by_key(|(_, f)| f.occurred_at)
        .map(|(position, _)| position)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{FactCategory, FactOrigin, FactSource, Severity};
    use chrono::{DateTime, Utc};
    use proptest::prelude::*;

    fn fact(tag: &str, severity: Severity, at: DateTime<Utc>) -> Fact {
        Fact::new(
            "dog-1",
            tag,
            FactCategory::Symptom,
            vec![tag.to_string()],
            severity,
            FactSource::new(FactOrigin::Chat),
            at,
        )
    }

    #[test]
    fn test_duplicate_within_window_updates_in_place() {
        let now = Utc::now();
        let existing = fact("vomiting", Severity::Mild, now - Duration::hours(3));
        let existing_id = existing.id.clone();

        let mut newer = fact("vomiting", Severity::Severe, now);
        newer.possible_conditions = vec!["pancreatitis".into()];

        let outcome = merge(vec![newer], vec![existing], Duration::hours(24));

        assert_eq!(outcome.facts.len(), 1);
        let merged = &outcome.facts[0];
        assert_eq!(merged.id, existing_id);
        assert_eq!(merged.severity, Severity::Severe);
        assert_eq!(merged.occurred_at, now);
        assert_eq!(merged.possible_conditions, vec!["pancreatitis"]);
        assert!(outcome.changed_ids.contains(&existing_id));
    }

    #[test]
    fn test_older_duplicate_leaves_existing_untouched() {
        let now = Utc::now();
        let existing = fact("vomiting", Severity::Moderate, now);
        let older = fact("vomiting", Severity::Severe, now - Duration::hours(2));

        let outcome = merge(vec![older], vec![existing.clone()], Duration::hours(24));

        assert_eq!(outcome.facts, vec![existing]);
        assert!(outcome.changed_ids.is_empty());
    }

    #[test]
    fn test_outside_window_appends() {
        let now = Utc::now();
        let existing = fact("vomiting", Severity::Mild, now - Duration::hours(25));
        let outcome = merge(
            vec![fact("vomiting", Severity::Mild, now)],
            vec![existing],
            Duration::hours(24),
        );
        assert_eq!(outcome.facts.len(), 2);
        assert_eq!(outcome.changed_ids.len(), 1);
    }

    #[test]
    fn test_category_and_dog_scope_identity() {
        let now = Utc::now();
        let existing = fact("itching", Severity::Mild, now);

        let mut as_condition = fact("itching", Severity::Mild, now);
        as_condition.category = FactCategory::Condition;

        let mut other_dog = fact("itching", Severity::Mild, now);
        other_dog.dog_id = "dog-2".into();

        let merged = merge_facts(vec![as_condition, other_dog], vec![existing]);
        assert_eq!(merged.len(), 3);
    }

    #[test]
    fn test_batch_internal_duplicates_collapse() {
        let now = Utc::now();
        let batch = vec![
            fact("limping", Severity::Mild, now - Duration::hours(1)),
            fact("limping", Severity::Moderate, now),
        ];
        let merged = merge_facts(batch, Vec::new());
        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].severity, Severity::Moderate);
    }

    #[test]
    fn test_matches_most_recent_neighbour() {
        let base = Utc::now();
        let first = fact("vomiting", Severity::Mild, base);
        let second = fact("vomiting", Severity::Mild, base + Duration::hours(30));
        let between = fact("vomiting", Severity::Severe, base + Duration::hours(20));

        let outcome = merge(
            vec![between],
            vec![first.clone(), second.clone()],
            Duration::hours(24),
        );

        assert_eq!(outcome.facts, vec![first, second]);
        assert!(outcome.changed_ids.is_empty());
    }

    #[test]
    fn test_untagged_never_deduplicated() {
        let now = Utc::now();
        let mut a = fact("x", Severity::Mild, now);
        a.tags.clear();
        let mut b = fact("x", Severity::Mild, now);
        b.tags.clear();
        assert_eq!(merge_facts(vec![a, b], Vec::new()).len(), 2);
    }

    proptest! {
        #[test]
        fn prop_no_close_duplicates_survive(offsets in prop::collection::vec(0i64..200, 1..20)) {
            let base = Utc::now();
            let batch: Vec<Fact> = offsets
                .iter()
                .map(|h| fact("cough", Severity::Mild, base + Duration::hours(*h)))
                .collect();

            let merged = merge_facts(batch, Vec::new());
            for (i, a) in merged.iter().enumerate() {
                for b in merged.iter().skip(i + 1) {
                    prop_assert!((a.occurred_at - b.occurred_at).abs() >= Duration::hours(24));
                }
            }
        }
    }
}
