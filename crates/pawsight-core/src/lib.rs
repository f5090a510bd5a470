//! Pawsight Core Library
//!
//! Pet health intelligence pipeline: AI assessments become deduplicated
//! facts, recurring facts become patterns, and rules over the dog's profile
//! and history become alerts.
//!
//! # Architecture
//!
//! ```text
//!  chat / photo / lab ──▶ AiService ──▶ AnalysisRecord (raw, persisted)
//!                                            │
//!                                      Fact Extractor
//!                                            │
//!                                 merge with fact history
//!                                            │
//!                                    Pattern Detector
//!                                            │
//!                 breed risks ──▶      Alert Engine      ◀── existing alerts
//!                                            │
//!                              new alerts + pin suggestion
//! ```
//!
//! # Modules
//!
//! - [`models`]: Domain types (DogProfile, Fact, Pattern, Alert, payloads)
//! - [`extractor`]: Payload to fact mapping and fact merging
//! - [`patterns`]: Recurring tag detection
//! - [`alerts`]: Alert rules, breed-risk table, dismiss/snooze
//! - [`pipeline`]: Orchestrator tying the components to the AI service and store
//! - [`store`]: Record store trait with SQLite and in-memory implementations
//! - [`config`]: TOML configuration

pub mod ai;
pub mod alerts;
pub mod config;
pub mod extractor;
pub mod models;
pub mod patterns;
pub mod pipeline;
pub mod store;

// Re-export commonly used types
pub use ai::{AiError, AiErrorKind, AiService, ChatRole, ChatTurn};
pub use alerts::{AlertEngine, AlertInput, AlertRules, BreedRisk, BreedRiskTable, BuiltinBreedRisks};
pub use config::{ConfigError, PipelineConfig};
pub use models::{
    Alert, AlertStatus, AlertType, AnalysisRecord, ChatAssessment, DogProfile, Fact, LabAssessment,
    LabType, Pattern, PhotoAssessment, Priority, Severity,
};
pub use pipeline::{AnalysisOutcome, Orchestrator, PinSuggestion, PipelineError};
pub use store::{Database, InMemoryStore, RecordStore, StoreError};

// UniFFI setup - using proc macros
uniffi::setup_scaffolding!();

use std::sync::{Arc, Mutex};

use chrono::{DateTime, SecondsFormat, Utc};

// =========================================================================
// FFI Error Type
// =========================================================================

#[derive(Debug, thiserror::Error, uniffi::Error)]
pub enum PawsightError {
    #[error("Database error: {0}")]
    DatabaseError(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),

    #[error("AI service error: {0}")]
    UpstreamError(String),
}

impl From<StoreError> for PawsightError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::NotFound(what) => PawsightError::NotFound(what),
            StoreError::Json(e) => PawsightError::SerializationError(e.to_string()),
            other => PawsightError::DatabaseError(other.to_string()),
        }
    }
}

impl From<serde_json::Error> for PawsightError {
    fn from(e: serde_json::Error) -> Self {
        PawsightError::SerializationError(e.to_string())
    }
}

impl From<ConfigError> for PawsightError {
    fn from(e: ConfigError) -> Self {
        PawsightError::InvalidInput(e.to_string())
    }
}

impl From<PipelineError> for PawsightError {
    fn from(e: PipelineError) -> Self {
        match e {
            PipelineError::Upstream(ai) => PawsightError::UpstreamError(ai.to_string()),
            PipelineError::Store(store) => store.into(),
        }
    }
}

impl<T> From<std::sync::PoisonError<T>> for PawsightError {
    fn from(e: std::sync::PoisonError<T>) -> Self {
        PawsightError::DatabaseError(format!("Lock poisoned: {}", e))
    }
}

// =========================================================================
// Factory Functions (exported to FFI)
// =========================================================================

/// Open or create a database at the given path.
#[uniffi::export]
pub fn open_database(path: String) -> Result<Arc<PawsightCore>, PawsightError> {
    let db = Database::open(&path)?;
    Ok(Arc::new(PawsightCore {
        db: Arc::new(Mutex::new(db)),
    }))
}

/// Create an in-memory database (for testing).
#[uniffi::export]
pub fn open_database_in_memory() -> Result<Arc<PawsightCore>, PawsightError> {
    let db = Database::open_in_memory()?;
    Ok(Arc::new(PawsightCore {
        db: Arc::new(Mutex::new(db)),
    }))
}

// =========================================================================
// Main API Object
// =========================================================================

/// Thread-safe record store wrapper for FFI.
#[derive(uniffi::Object)]
pub struct PawsightCore {
    db: Arc<Mutex<Database>>,
}

#[uniffi::export]
impl PawsightCore {
    // =========================================================================
    // Fact Operations
    // =========================================================================

    /// All facts recorded for a dog, oldest first.
    pub fn list_facts(&self, dog_id: String) -> Result<Vec<FfiFact>, PawsightError> {
        let db = self.db.lock()?;
        let facts = db.facts(&dog_id)?;
        Ok(facts.into_iter().map(|f| f.into()).collect())
    }

    /// Mark a fact as permanently remembered (or forget it).
    pub fn set_fact_pinned(
        &self,
        dog_id: String,
        fact_id: String,
        pinned: bool,
    ) -> Result<FfiFact, PawsightError> {
        let db = self.db.lock()?;
        let mut fact = db
            .facts(&dog_id)?
            .into_iter()
            .find(|f| f.id == fact_id)
            .ok_or_else(|| PawsightError::NotFound(format!("fact {}", fact_id)))?;
        fact.pinned = pinned;
        db.save_fact(&fact)?;
        Ok(fact.into())
    }

    /// Recurring tags in the dog's fact history, using default thresholds.
    pub fn detect_patterns(&self, dog_id: String) -> Result<Vec<FfiPattern>, PawsightError> {
        let db = self.db.lock()?;
        let facts = db.facts(&dog_id)?;
        let found = patterns::detect_patterns(&facts, patterns::PatternOptions::default());
        Ok(found.into_iter().map(|p| p.into()).collect())
    }

    // =========================================================================
    // Alert Operations
    // =========================================================================

    /// All alerts for a dog, oldest first.
    pub fn list_alerts(&self, dog_id: String) -> Result<Vec<FfiAlert>, PawsightError> {
        let db = self.db.lock()?;
        let alerts = db.alerts(&dog_id)?;
        Ok(alerts.into_iter().map(|a| a.into()).collect())
    }

    /// Alerts that are active or still snoozed, highest priority first.
    pub fn list_live_alerts(&self, dog_id: String) -> Result<Vec<FfiAlert>, PawsightError> {
        let db = self.db.lock()?;
        let now = Utc::now();
        let mut live: Vec<Alert> = db
            .alerts(&dog_id)?
            .into_iter()
            .filter(|a| a.is_live(now))
            .collect();
        live.sort_by(|a, b| b.priority.cmp(&a.priority).then(b.created_at.cmp(&a.created_at)));
        Ok(live.into_iter().map(|a| a.into()).collect())
    }

    /// Dismiss an alert.
    pub fn dismiss_alert(&self, dog_id: String, alert_id: String) -> Result<FfiAlert, PawsightError> {
        self.transition(&dog_id, &alert_id, |alerts, now| alerts::dismiss(alerts, &alert_id, now))
    }

    /// Snooze an alert for `days`.
    pub fn snooze_alert(
        &self,
        dog_id: String,
        alert_id: String,
        days: u32,
    ) -> Result<FfiAlert, PawsightError> {
        self.transition(&dog_id, &alert_id, |alerts, now| {
            alerts::snooze(alerts, &alert_id, days, now)
        })
    }
}

impl PawsightCore {
    fn transition<F>(&self, dog_id: &str, alert_id: &str, apply: F) -> Result<FfiAlert, PawsightError>
    where
        F: FnOnce(&[Alert], DateTime<Utc>) -> Vec<Alert>,
    {
        let db = self.db.lock()?;
        let alerts = db.alerts(dog_id)?;
        let updated = apply(&alerts, Utc::now())
            .into_iter()
            .find(|a| a.id == alert_id)
            .ok_or_else(|| PawsightError::NotFound(format!("alert {}", alert_id)))?;
        db.save_alert(&updated)?;
        Ok(updated.into())
    }
}

// =========================================================================
// FFI Types
// =========================================================================

fn ffi_timestamp(at: &DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// FFI-safe fact.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiFact {
    pub id: String,
    pub dog_id: String,
    pub description: String,
    pub category: String,
    pub tags: Vec<String>,
    pub severity: String,
    pub active: bool,
    pub occurred_at: String,
    pub possible_conditions: Vec<String>,
    pub recommended_actions: Vec<String>,
    pub pinned: bool,
}

impl From<Fact> for FfiFact {
    fn from(fact: Fact) -> Self {
        let category = match fact.category {
            models::FactCategory::Symptom => "symptom",
            models::FactCategory::Condition => "condition",
            models::FactCategory::LabResult => "lab_result",
        };
        Self {
            active: fact.is_active(),
            occurred_at: ffi_timestamp(&fact.occurred_at),
            id: fact.id,
            dog_id: fact.dog_id,
            description: fact.description,
            category: category.to_string(),
            tags: fact.tags,
            severity: fact.severity.as_str().to_string(),
            possible_conditions: fact.possible_conditions,
            recommended_actions: fact.recommended_actions,
            pinned: fact.pinned,
        }
    }
}

/// FFI-safe pattern.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiPattern {
    pub tag: String,
    pub count: u32,
    pub severity: String,
    pub first_seen: String,
    pub last_seen: String,
    pub fact_ids: Vec<String>,
    pub description: String,
}

impl From<Pattern> for FfiPattern {
    fn from(pattern: Pattern) -> Self {
        Self {
            count: pattern.count as u32,
            severity: pattern.severity.as_str().to_string(),
            first_seen: ffi_timestamp(&pattern.first_seen),
            last_seen: ffi_timestamp(&pattern.last_seen),
            tag: pattern.tag,
            fact_ids: pattern.fact_ids,
            description: pattern.description,
        }
    }
}

/// FFI-safe alert. Metadata is a JSON object string.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiAlert {
    pub id: String,
    pub dog_id: String,
    pub alert_type: String,
    pub title: String,
    pub message: String,
    pub priority: String,
    pub status: String,
    pub metadata_json: String,
    pub created_at: String,
    pub dismissed_at: Option<String>,
    pub snooze_until: Option<String>,
}

impl From<Alert> for FfiAlert {
    fn from(alert: Alert) -> Self {
        Self {
            alert_type: alert.alert_type.as_str().to_string(),
            priority: alert.priority.as_str().to_string(),
            status: alert.status.as_str().to_string(),
            metadata_json: serde_json::to_string(&alert.metadata).unwrap_or_else(|_| "{}".into()),
            created_at: ffi_timestamp(&alert.created_at),
            dismissed_at: alert.dismissed_at.as_ref().map(ffi_timestamp),
            snooze_until: alert.snooze_until.as_ref().map(ffi_timestamp),
            id: alert.id,
            dog_id: alert.dog_id,
            title: alert.title,
            message: alert.message,
        }
    }
}
