//! Normalized health facts.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Fact category.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum FactCategory {
    Symptom,
    Condition,
    LabResult,
}

/// Fact severity. Ordered so that `Severe > Moderate > Mild`.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    #[default]
    Mild,
    Moderate,
    Severe,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Mild => "mild",
            Severity::Moderate => "moderate",
            Severity::Severe => "severe",
        }
    }
}

/// Lifecycle state of a fact.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum FactStatus {
    #[default]
    Active,
    Resolved,
}

/// Which analysis produced a fact.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum FactOrigin {
    Chat,
    Photo,
    Lab,
}

/// Source descriptor of a fact.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FactSource {
    pub origin: FactOrigin,
    #[serde(default)]
    pub session_id: Option<String>,
    #[serde(default)]
    pub message_id: Option<String>,
}

impl FactSource {
    pub fn new(origin: FactOrigin) -> Self {
        Self {
            origin,
            session_id: None,
            message_id: None,
        }
    }
}

/// Lab measurement attached to a `lab_result` fact.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LabValue {
    /// Marker name (e.g., "ALT", "weight")
    pub marker: String,
    pub value: Option<f64>,
    pub unit: Option<String>,
    pub reference_range: Option<String>,
    /// Marker status label (normal, low, high, critical, ...)
    pub status: String,
}

/// A normalized health observation about one dog.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Fact {
    /// Unique fact ID
    pub id: String,
    /// Dog this fact belongs to
    pub dog_id: String,
    /// Human-readable description
    pub description: String,
    pub category: FactCategory,
    /// Lower-cased grouping keywords; the first is the primary tag
    pub tags: Vec<String>,
    pub severity: Severity,
    #[serde(default)]
    pub status: FactStatus,
    /// When the observation happened
    pub occurred_at: DateTime<Utc>,
    /// When the record was created
    pub created_at: DateTime<Utc>,
    pub source: FactSource,
    #[serde(default)]
    pub possible_conditions: Vec<String>,
    #[serde(default)]
    pub recommended_actions: Vec<String>,
    #[serde(default)]
    pub resolved_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub lab_value: Option<LabValue>,
    /// Permanently remembered by the owner (host-driven)
    #[serde(default)]
    pub pinned: bool,
}

impl Fact {
    /// Create a new active fact observed at `occurred_at`.
    pub fn new(
        dog_id: impl Into<String>,
        description: impl Into<String>,
        category: FactCategory,
        tags: Vec<String>,
        severity: Severity,
        source: FactSource,
        occurred_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            dog_id: dog_id.into(),
            description: description.into(),
            category,
            tags: tags.into_iter().map(|t| normalize_tag(&t)).filter(|t| !t.is_empty()).collect(),
            severity,
            status: FactStatus::Active,
            occurred_at,
            created_at: Utc::now(),
            source,
            possible_conditions: Vec::new(),
            recommended_actions: Vec::new(),
            resolved_at: None,
            lab_value: None,
            pinned: false,
        }
    }

    /// A body-weight observation in kilograms.
    pub fn weight_reading(dog_id: impl Into<String>, kg: f64, occurred_at: DateTime<Utc>) -> Self {
        let mut fact = Self::new(
            dog_id,
            format!("Weight {:.1} kg", kg),
            FactCategory::LabResult,
            vec![WEIGHT_TAG.to_string()],
            Severity::Mild,
            FactSource::new(FactOrigin::Chat),
            occurred_at,
        );
        fact.lab_value = Some(LabValue {
            marker: WEIGHT_TAG.to_string(),
            value: Some(kg),
            unit: Some("kg".into()),
            reference_range: None,
            status: "normal".into(),
        });
        fact
    }

    /// The primary (first) tag, if any.
    pub fn primary_tag(&self) -> Option<&str> {
        self.tags.first().map(String::as_str)
    }

    /// Check whether the fact carries a tag (case-insensitive).
    pub fn has_tag(&self, tag: &str) -> bool {
        let tag = normalize_tag(tag);
        self.tags.iter().any(|t| normalize_tag(t) == tag)
    }

    /// Weight in kilograms, read from the lab value or the description.
    pub fn weight_kg(&self) -> Option<f64> {
        if let Some(value) = self.lab_value.as_ref().and_then(|v| v.value) {
            return Some(value);
        }
        first_number(&self.description)
    }

    /// Whether this is a body-weight observation rather than a health event.
    pub fn is_weight_reading(&self) -> bool {
        self.has_tag(WEIGHT_TAG)
    }

    pub fn is_active(&self) -> bool {
        matches!(self.status, FactStatus::Active)
    }
}

/// Tag used for body-weight observations.
pub const WEIGHT_TAG: &str = "weight";

/// Canonical tag form: trimmed and lower-cased.
pub fn normalize_tag(tag: &str) -> String {
    tag.trim().to_lowercase()
}

fn first_number(text: &str) -> Option<f64> {
    let mut current = String::new();
    for c in text.chars().chain(std::iter::once(' ')) {
        if c.is_ascii_digit() || (c == '.' && !current.is_empty() && !current.contains('.')) {
            current.push(c);
        } else if !current.is_empty() {
            if let Ok(n) = current.trim_end_matches('.').parse::<f64>() {
                return Some(n);
            }
            current.clear();
        }
    }
    None
}
