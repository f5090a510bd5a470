//! In-memory record store.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use super::{RecordStore, StoreError, StoreResult};
use crate::models::{Alert, AnalysisRecord, Fact};

#[derive(Debug, Default)]
struct DogRecords {
    analyses: Vec<AnalysisRecord>,
    facts: Vec<Fact>,
    alerts: Vec<Alert>,
}

/// Record store kept entirely in process memory.
///
/// Collections keep insertion order; upserts replace in place.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    dogs: Mutex<HashMap<String, DogRecords>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> StoreResult<MutexGuard<'_, HashMap<String, DogRecords>>> {
        self.dogs.lock().map_err(|_| StoreError::LockPoisoned)
    }
}

fn upsert<T: Clone>(items: &mut Vec<T>, item: &T, same: impl Fn(&T) -> bool) {
    match items.iter_mut().find(|existing| same(existing)) {
        Some(existing) => *existing = item.clone(),
        None => items.push(item.clone()),
    }
}

impl RecordStore for InMemoryStore {
    fn save_analysis(&self, record: &AnalysisRecord) -> StoreResult<()> {
        let mut dogs = self.lock()?;
        let records = dogs.entry(record.dog_id.clone()).or_default();
        upsert(&mut records.analyses, record, |r| r.id == record.id);
        Ok(())
    }

    fn analyses(&self, dog_id: &str) -> StoreResult<Vec<AnalysisRecord>> {
        let dogs = self.lock()?;
        let mut analyses = dogs.get(dog_id).map(|r| r.analyses.clone()).unwrap_or_default();
        analyses.sort_by_key(|r| r.created_at);
        Ok(analyses)
    }

    fn save_fact(&self, fact: &Fact) -> StoreResult<()> {
        let mut dogs = self.lock()?;
        let records = dogs.entry(fact.dog_id.clone()).or_default();
        upsert(&mut records.facts, fact, |f| f.id == fact.id);
        Ok(())
    }

    fn facts(&self, dog_id: &str) -> StoreResult<Vec<Fact>> {
        let dogs = self.lock()?;
        let mut facts = dogs.get(dog_id).map(|r| r.facts.clone()).unwrap_or_default();
        facts.sort_by_key(|f| f.occurred_at);
        Ok(facts)
    }

    fn save_alert(&self, alert: &Alert) -> StoreResult<()> {
        let mut dogs = self.lock()?;
        let records = dogs.entry(alert.dog_id.clone()).or_default();
        upsert(&mut records.alerts, alert, |a| a.id == alert.id);
        Ok(())
    }

    fn alerts(&self, dog_id: &str) -> StoreResult<Vec<Alert>> {
        let dogs = self.lock()?;
        let mut alerts = dogs.get(dog_id).map(|r| r.alerts.clone()).unwrap_or_default();
        alerts.sort_by_key(|a| a.created_at);
        Ok(alerts)
    }
}
