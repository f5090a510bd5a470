//! Recurring symptom detection over a dog's fact history.

use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::models::{normalize_tag, Fact, Pattern, Severity};

/// Detection options.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct PatternOptions {
    /// Minimum number of facts sharing a tag
    pub threshold: usize,
    /// Look-back window in days
    pub window_days: i64,
}

impl Default for PatternOptions {
    fn default() -> Self {
        Self {
            threshold: 3,
            window_days: 30,
        }
    }
}

/// Rank a severity label: critical > high/severe > moderate > low/mild.
///
/// Unrecognized labels rank lowest (0).
pub fn severity_rank(label: &str) -> u8 {
    match label.trim().to_lowercase().as_str() {
        "critical" => 4,
        "high" | "severe" => 3,
        "moderate" => 2,
        "low" | "mild" => 1,
        _ => 0,
    }
}

/// Detect patterns relative to the current time.
pub fn detect_patterns(facts: &[Fact], options: PatternOptions) -> Vec<Pattern> {
    detect(facts, options, Utc::now())
}

/// Detect recurring tags among facts that occurred in `[now - window, now]`.
///
/// Every tag of a fact counts toward its own group. Weight readings are
/// measurements, not recurring events, and never join a group. Groups
/// reaching the threshold become patterns, sorted by severity then count
/// (both descending), then tag.
pub fn detect(facts: &[Fact], options: PatternOptions, now: DateTime<Utc>) -> Vec<Pattern> {
    let window_start = now - Duration::days(options.window_days);

    let mut groups: BTreeMap<String, BTreeMap<&str, &Fact>> = BTreeMap::new();
    for fact in facts
        .iter()
        .filter(|f| f.occurred_at >= window_start && f.occurred_at <= now)
        .filter(|f| !f.is_weight_reading())
    {
        let tags: BTreeSet<String> = fact
            .tags
            .iter()
            .map(|t| normalize_tag(t))
            .filter(|t| !t.is_empty())
            .collect();
        for tag in tags {
            groups.entry(tag).or_default().insert(fact.id.as_str(), fact);
        }
    }

    let mut patterns: Vec<Pattern> = groups
        .into_iter()
        .filter(|(_, members)| members.len() >= options.threshold.max(1))
        .filter_map(|(tag, members)| build_pattern(tag, &members, options.window_days))
        .collect();

    patterns.sort_by(|a, b| {
        severity_rank(b.severity.as_str())
            .cmp(&severity_rank(a.severity.as_str()))
            .then(b.count.cmp(&a.count))
            .then(a.tag.cmp(&b.tag))
    });
    patterns
}

fn build_pattern(tag: String, members: &BTreeMap<&str, &Fact>, window_days: i64) -> Option<Pattern> {
    let first_seen = members.values().map(|f| f.occurred_at).min()?;
    let last_seen = members.values().map(|f| f.occurred_at).max()?;
    let severity = members
        .values()
        .map(|f| f.severity)
        .max_by_key(|s| severity_rank(s.as_str()))
        .unwrap_or(Severity::Mild);
    let count = members.len();

    Some(Pattern {
        description: format!(
            "{} reported {} times in the last {} days",
            capitalize(&tag),
            count,
            window_days
        ),
        tag,
        count,
        severity,
        first_seen,
        last_seen,
        fact_ids: members.keys().map(|id| id.to_string()).collect(),
    })
}

fn capitalize(text: &str) -> String {
    let mut chars = text.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
