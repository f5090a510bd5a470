//! Actionable health alerts.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Rule family that produced an alert.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum AlertType {
    BreedRisk,
    SymptomPattern,
    VaccinationDue,
    WeightTrend,
    LabTrend,
    ImagingFollowup,
    AbnormalLab,
}

impl AlertType {
    pub fn as_str(&self) -> &'static str {
        match self {
            AlertType::BreedRisk => "breed_risk",
            AlertType::SymptomPattern => "symptom_pattern",
            AlertType::VaccinationDue => "vaccination_due",
            AlertType::WeightTrend => "weight_trend",
            AlertType::LabTrend => "lab_trend",
            AlertType::ImagingFollowup => "imaging_followup",
            AlertType::AbnormalLab => "abnormal_lab",
        }
    }
}

/// Alert priority. Ordered so that `High > Medium > Low`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    Low,
    Medium,
    High,
}

impl Priority {
    /// Map a severity label to a priority.
    ///
    /// `high`/`critical`/`severe` map to High, `moderate` to Medium,
    /// anything else to Low.
    pub fn from_severity_label(label: &str) -> Self {
        match label.trim().to_lowercase().as_str() {
            "high" | "critical" | "severe" => Priority::High,
            "moderate" => Priority::Medium,
            _ => Priority::Low,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Priority::Low => "low",
            Priority::Medium => "medium",
            Priority::High => "high",
        }
    }
}

/// Alert lifecycle state.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum AlertStatus {
    #[default]
    Active,
    Snoozed,
    Dismissed,
}

impl AlertStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AlertStatus::Active => "active",
            AlertStatus::Snoozed => "snoozed",
            AlertStatus::Dismissed => "dismissed",
        }
    }
}

/// Metadata field holding the deduplication key.
pub const METADATA_KEY: &str = "key";

/// An actionable notification for one dog.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Alert {
    pub id: String,
    pub dog_id: String,
    pub alert_type: AlertType,
    pub title: String,
    pub message: String,
    pub priority: Priority,
    #[serde(default)]
    pub status: AlertStatus,
    /// Rule-specific details; `key` is the deduplication key
    #[serde(default)]
    pub metadata: BTreeMap<String, Value>,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub dismissed_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub snooze_until: Option<DateTime<Utc>>,
}

impl Alert {
    /// Create a new active alert carrying its deduplication key.
    pub fn new(
        dog_id: impl Into<String>,
        alert_type: AlertType,
        key: String,
        title: impl Into<String>,
        message: impl Into<String>,
        priority: Priority,
        created_at: DateTime<Utc>,
    ) -> Self {
        let mut metadata = BTreeMap::new();
        metadata.insert(METADATA_KEY.to_string(), Value::String(key));
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            dog_id: dog_id.into(),
            alert_type,
            title: title.into(),
            message: message.into(),
            priority,
            status: AlertStatus::Active,
            metadata,
            created_at,
            dismissed_at: None,
            snooze_until: None,
        }
    }

    /// Attach an extra metadata field.
    pub fn with_meta(mut self, field: &str, value: impl Into<Value>) -> Self {
        self.metadata.insert(field.to_string(), value.into());
        self
    }

    /// The deduplication key, if present.
    pub fn dedup_key(&self) -> Option<&str> {
        self.metadata.get(METADATA_KEY).and_then(Value::as_str)
    }

    /// Whether this alert still blocks a new alert with the same type and key.
    ///
    /// Dismissed alerts never block; snoozed alerts block until `snooze_until`.
    pub fn is_live(&self, now: DateTime<Utc>) -> bool {
        match self.status {
            AlertStatus::Active => true,
            AlertStatus::Dismissed => false,
            AlertStatus::Snoozed => self.snooze_until.map(|until| until > now).unwrap_or(false),
        }
    }
}
