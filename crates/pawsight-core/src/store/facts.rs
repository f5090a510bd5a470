//! Fact database operations.

use rusqlite::params;

use super::{timestamp, Database, StoreResult};
use crate::models::Fact;

impl Database {
    /// Insert a fact, or replace the stored copy with the same ID.
    pub fn upsert_fact(&self, fact: &Fact) -> StoreResult<()> {
        let payload = serde_json::to_string(fact)?;
        let category = serde_json::to_value(fact.category)?;

        self.conn.execute(
            r#"
            INSERT INTO facts (id, dog_id, primary_tag, category, payload, occurred_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            ON CONFLICT(id) DO UPDATE SET
                primary_tag = excluded.primary_tag,
                category = excluded.category,
                payload = excluded.payload,
                occurred_at = excluded.occurred_at,
                updated_at = datetime('now')
            "#,
            params![
                fact.id,
                fact.dog_id,
                fact.primary_tag(),
                category.as_str().unwrap_or_default(),
                payload,
                timestamp(&fact.occurred_at),
            ],
        )?;
        Ok(())
    }

    /// List all facts for a dog, oldest occurrence first.
    pub fn list_facts(&self, dog_id: &str) -> StoreResult<Vec<Fact>> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT payload FROM facts
            WHERE dog_id = ?
            ORDER BY occurred_at, rowid
            "#,
        )?;

        let rows = stmt.query_map([dog_id], |row| row.get::<_, String>(0))?;

        let mut facts = Vec::new();
        for payload in rows {
            facts.push(serde_json::from_str(&payload?)?);
        }
        Ok(facts)
    }

    /// Count facts stored for a dog.
    pub fn count_facts(&self, dog_id: &str) -> StoreResult<usize> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM facts WHERE dog_id = ?",
            [dog_id],
            |row| row.get(0),
        )?;
        Ok(count as usize)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{FactCategory, FactOrigin, FactSource, Severity};
    use chrono::Utc;

    fn fact(tag: &str) -> Fact {
        Fact::new(
            "dog-1",
            tag,
            FactCategory::Symptom,
            vec![tag.to_string()],
            Severity::Mild,
            FactSource::new(FactOrigin::Chat),
            Utc::now(),
        )
    }

    #[test]
    fn test_upsert_inserts_then_updates() {
        let db = Database::open_in_memory().unwrap();

        let mut fact = fact("itching");
        db.upsert_fact(&fact).unwrap();
        assert_eq!(db.count_facts("dog-1").unwrap(), 1);

        fact.severity = Severity::Severe;
        db.upsert_fact(&fact).unwrap();
        assert_eq!(db.count_facts("dog-1").unwrap(), 1);

        let stored = db.list_facts("dog-1").unwrap();
        assert_eq!(stored[0].severity, Severity::Severe);
    }

    #[test]
    fn test_list_scoped_by_dog() {
        let db = Database::open_in_memory().unwrap();
        let mut other = fact("cough");
        other.dog_id = "dog-2".into();

        db.upsert_fact(&fact("itching")).unwrap();
        db.upsert_fact(&other).unwrap();

        assert_eq!(db.list_facts("dog-1").unwrap().len(), 1);
        assert_eq!(db.list_facts("dog-2").unwrap().len(), 1);
        assert!(db.list_facts("dog-3").unwrap().is_empty());
    }

    #[test]
    fn test_primary_tag_column() {
        let db = Database::open_in_memory().unwrap();
        db.upsert_fact(&fact("Vomiting")).unwrap();

        let (tag, category): (String, String) = db
            .conn()
            .query_row("SELECT primary_tag, category FROM facts", [], |row| {
                Ok((row.get(0)?, row.get(1)?))
            })
            .unwrap();
        assert_eq!(tag, "vomiting");
        assert_eq!(category, "symptom");
    }
}
