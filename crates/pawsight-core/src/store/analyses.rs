//! Raw analysis database operations.

use rusqlite::params;

use super::{timestamp, Database, StoreResult};
use crate::models::AnalysisRecord;

impl Database {
    /// Append a raw analysis record.
    pub fn insert_analysis(&self, record: &AnalysisRecord) -> StoreResult<()> {
        let payload = serde_json::to_string(record)?;
        self.conn.execute(
            r#"
            INSERT INTO analyses (id, dog_id, kind, payload, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5)
            "#,
            params![
                record.id,
                record.dog_id,
                record.kind().as_str(),
                payload,
                timestamp(&record.created_at),
            ],
        )?;
        Ok(())
    }

    /// List all analyses for a dog, oldest first.
    pub fn list_analyses(&self, dog_id: &str) -> StoreResult<Vec<AnalysisRecord>> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT payload FROM analyses
            WHERE dog_id = ?
            ORDER BY created_at, rowid
            "#,
        )?;

        let rows = stmt.query_map([dog_id], |row| row.get::<_, String>(0))?;

        let mut records = Vec::new();
        for payload in rows {
            records.push(serde_json::from_str(&payload?)?);
        }
        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Assessment, ChatAssessment, LabAssessment, LabType};
    use chrono::{Duration, Utc};

    #[test]
    fn test_insert_and_list() {
        let db = Database::open_in_memory().unwrap();
        let now = Utc::now();

        let lab = LabAssessment {
            lab_type: LabType::Bloodwork,
            overall_assessment: Some("concerning".into()),
            ..Default::default()
        };
        let later = AnalysisRecord::new("dog-1", Assessment::Lab(lab), now);
        let earlier = AnalysisRecord::new(
            "dog-1",
            Assessment::Chat(ChatAssessment::default()),
            now - Duration::hours(1),
        );
        let other_dog = AnalysisRecord::new("dog-2", Assessment::Chat(ChatAssessment::default()), now);

        db.insert_analysis(&later).unwrap();
        db.insert_analysis(&earlier).unwrap();
        db.insert_analysis(&other_dog).unwrap();

        let records = db.list_analyses("dog-1").unwrap();
        assert_eq!(records, vec![earlier, later]);
    }

    #[test]
    fn test_duplicate_id_rejected() {
        let db = Database::open_in_memory().unwrap();
        let record = AnalysisRecord::new("dog-1", Assessment::Chat(ChatAssessment::default()), Utc::now());
        db.insert_analysis(&record).unwrap();
        assert!(db.insert_analysis(&record).is_err());
    }
}
