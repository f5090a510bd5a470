//! SQLite schema definition.

/// Complete database schema for the record store.
pub const SCHEMA: &str = r#"
-- ============================================================================
-- Raw AI Analyses (Append-Only)
-- ============================================================================

CREATE TABLE IF NOT EXISTS analyses (
    id TEXT PRIMARY KEY,
    dog_id TEXT NOT NULL,
    kind TEXT NOT NULL CHECK (kind IN ('chat', 'photo', 'lab')),
    payload TEXT NOT NULL,                       -- JSON AnalysisRecord
    created_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_analyses_dog ON analyses(dog_id, created_at);

-- ============================================================================
-- Facts (Updated in place on merge)
-- ============================================================================

CREATE TABLE IF NOT EXISTS facts (
    id TEXT PRIMARY KEY,
    dog_id TEXT NOT NULL,
    primary_tag TEXT,
    category TEXT NOT NULL,
    payload TEXT NOT NULL,                       -- JSON Fact
    occurred_at TEXT NOT NULL,
    updated_at TEXT NOT NULL DEFAULT (datetime('now'))
);

CREATE INDEX IF NOT EXISTS idx_facts_dog ON facts(dog_id, occurred_at);
CREATE INDEX IF NOT EXISTS idx_facts_tag ON facts(dog_id, primary_tag, category);

-- ============================================================================
-- Alerts
-- ============================================================================

CREATE TABLE IF NOT EXISTS alerts (
    id TEXT PRIMARY KEY,
    dog_id TEXT NOT NULL,
    alert_type TEXT NOT NULL,
    dedup_key TEXT,
    status TEXT NOT NULL CHECK (status IN ('active', 'snoozed', 'dismissed')),
    payload TEXT NOT NULL,                       -- JSON Alert
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL DEFAULT (datetime('now'))
);

CREATE INDEX IF NOT EXISTS idx_alerts_dog ON alerts(dog_id, created_at);
CREATE INDEX IF NOT EXISTS idx_alerts_key ON alerts(dog_id, alert_type, dedup_key);
"#;
