//! Recurring-symptom patterns (derived, never persisted).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::Severity;

/// A tag that recurs across several facts within a time window.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Pattern {
    /// The shared (lower-cased) tag
    pub tag: String,
    /// Number of contributing facts
    pub count: usize,
    /// Highest severity among contributing facts
    pub severity: Severity,
    pub first_seen: DateTime<Utc>,
    pub last_seen: DateTime<Utc>,
    /// Contributing fact IDs (deduplicated, sorted)
    pub fact_ids: Vec<String>,
    /// Human-readable summary
    pub description: String,
}
