//! Record store: per-dog collections of analyses, facts and alerts.
//!
//! The pipeline only talks to the [`RecordStore`] trait. [`Database`] is the
//! SQLite implementation; [`InMemoryStore`] backs tests and hosts that keep
//! their own persistence.

mod alerts;
mod analyses;
mod facts;
mod memory;
mod schema;

pub use memory::*;
pub use schema::*;

use std::path::Path;

use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::Connection;
use thiserror::Error;

use crate::config::StoreConfig;
use crate::models::{Alert, AnalysisRecord, Fact};

/// Store errors.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Record not found: {0}")]
    NotFound(String),

    #[error("Store lock poisoned")]
    LockPoisoned,
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Persistence seam for the pipeline. Every collection is scoped by dog ID.
pub trait RecordStore {
    /// Append a raw analysis result.
    fn save_analysis(&self, record: &AnalysisRecord) -> StoreResult<()>;

    /// All analyses for a dog, oldest first.
    fn analyses(&self, dog_id: &str) -> StoreResult<Vec<AnalysisRecord>>;

    /// Insert or replace a fact by ID.
    fn save_fact(&self, fact: &Fact) -> StoreResult<()>;

    /// All facts for a dog, oldest occurrence first.
    fn facts(&self, dog_id: &str) -> StoreResult<Vec<Fact>>;

    /// Insert or replace an alert by ID.
    fn save_alert(&self, alert: &Alert) -> StoreResult<()>;

    /// All alerts for a dog, oldest first.
    fn alerts(&self, dog_id: &str) -> StoreResult<Vec<Alert>>;
}

/// Database connection wrapper.
pub struct Database {
    conn: Connection,
}

impl Database {
    /// Open database at path, creating if needed.
    pub fn open<P: AsRef<Path>>(path: P) -> StoreResult<Self> {
        let conn = Connection::open(path)?;
        let db = Self { conn };
        db.initialize()?;
        Ok(db)
    }

    /// Create in-memory database (for testing).
    pub fn open_in_memory() -> StoreResult<Self> {
        let conn = Connection::open_in_memory()?;
        let db = Self { conn };
        db.initialize()?;
        Ok(db)
    }

    /// Open the database named by `config`, or an in-memory one when no
    /// path is set.
    pub fn from_config(config: &StoreConfig) -> StoreResult<Self> {
        match &config.path {
            Some(path) => Self::open(path),
            None => Self::open_in_memory(),
        }
    }

    /// Initialize schema.
    fn initialize(&self) -> StoreResult<()> {
        self.conn.execute_batch(SCHEMA)?;
        Ok(())
    }

    /// Get raw connection (for advanced queries).
    pub fn conn(&self) -> &Connection {
        &self.conn
    }
}

impl RecordStore for Database {
    fn save_analysis(&self, record: &AnalysisRecord) -> StoreResult<()> {
        self.insert_analysis(record)
    }

    fn analyses(&self, dog_id: &str) -> StoreResult<Vec<AnalysisRecord>> {
        self.list_analyses(dog_id)
    }

    fn save_fact(&self, fact: &Fact) -> StoreResult<()> {
        self.upsert_fact(fact)
    }

    fn facts(&self, dog_id: &str) -> StoreResult<Vec<Fact>> {
        self.list_facts(dog_id)
    }

    fn save_alert(&self, alert: &Alert) -> StoreResult<()> {
        self.upsert_alert(alert)
    }

    fn alerts(&self, dog_id: &str) -> StoreResult<Vec<Alert>> {
        self.list_alerts(dog_id)
    }
}

/// Fixed-width UTC timestamp so TEXT columns sort chronologically.
fn timestamp(at: &DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Micros, true)
}
