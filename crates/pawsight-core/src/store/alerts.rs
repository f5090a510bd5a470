//! Alert database operations.

use rusqlite::params;

use super::{timestamp, Database, StoreResult};
use crate::models::Alert;

impl Database {
    /// Insert an alert, or replace the stored copy with the same ID.
    pub fn upsert_alert(&self, alert: &Alert) -> StoreResult<()> {
        let payload = serde_json::to_string(alert)?;

        self.conn.execute(
            r#"
            INSERT INTO alerts (id, dog_id, alert_type, dedup_key, status, payload, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            ON CONFLICT(id) DO UPDATE SET
                status = excluded.status,
                payload = excluded.payload,
                updated_at = datetime('now')
            "#,
            params![
                alert.id,
                alert.dog_id,
                alert.alert_type.as_str(),
                alert.dedup_key(),
                alert.status.as_str(),
                payload,
                timestamp(&alert.created_at),
            ],
        )?;
        Ok(())
    }

    /// List all alerts for a dog, oldest first.
    pub fn list_alerts(&self, dog_id: &str) -> StoreResult<Vec<Alert>> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT payload FROM alerts
            WHERE dog_id = ?
            ORDER BY created_at, rowid
            "#,
        )?;

        let rows = stmt.query_map([dog_id], |row| row.get::<_, String>(0))?;

        let mut alerts = Vec::new();
        for payload in rows {
            alerts.push(serde_json::from_str(&payload?)?);
        }
        Ok(alerts)
    }

    /// List alerts for a dog with the given status.
    pub fn list_alerts_by_status(&self, dog_id: &str, status: &str) -> StoreResult<Vec<Alert>> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT payload FROM alerts
            WHERE dog_id = ? AND status = ?
            ORDER BY created_at, rowid
            "#,
        )?;

        let rows = stmt.query_map([dog_id, status], |row| row.get::<_, String>(0))?;

        let mut alerts = Vec::new();
        for payload in rows {
            alerts.push(serde_json::from_str(&payload?)?);
        }
        Ok(alerts)
    }
}
