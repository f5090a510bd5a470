//! Orchestrator: one analysis event end to end.
//!
//! ```text
//! AI call ──err──▶ PipelineError::Upstream (nothing written)
//!    │
//!    ▼
//! save AnalysisRecord ─▶ extract ─▶ merge with history ─▶ save changed facts
//!                                          │
//!                                          ▼
//!                       detect patterns ─▶ alert engine ─▶ save new alerts
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, warn};

use crate::ai::{AiError, AiService, ChatTurn};
use crate::alerts::{AlertEngine, AlertInput, BreedRiskTable, BuiltinBreedRisks};
use crate::config::{ConfigResult, PipelineConfig};
use crate::extractor::{self, merge};
use crate::models::{
    Alert, AnalysisRecord, Assessment, ChatAssessment, DogProfile, Fact, LabAssessment, LabType,
    PhotoAssessment, Severity,
};
use crate::patterns;
use crate::store::{RecordStore, StoreError};

/// Orchestrator errors.
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("AI service error: {0}")]
    Upstream(AiError),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}

pub type PipelineResult<T> = Result<T, PipelineError>;

/// Prompt for the host UI to permanently remember a fact.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PinSuggestion {
    pub fact_id: String,
    pub description: String,
    pub severity: Severity,
}

/// What one analysis event returns to the caller.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AnalysisOutcome<T> {
    /// ID of the persisted raw record
    pub analysis_id: String,
    /// The AI payload, as returned by the service
    pub result: T,
    pub pin_suggestion: Option<PinSuggestion>,
    /// Facts appended or updated by this event
    pub new_facts: Vec<Fact>,
    pub new_alerts: Vec<Alert>,
}

struct Ingested {
    analysis_id: String,
    pin_suggestion: Option<PinSuggestion>,
    new_facts: Vec<Fact>,
    new_alerts: Vec<Alert>,
}

impl Ingested {
    fn with_result<T>(self, result: T) -> AnalysisOutcome<T> {
        AnalysisOutcome {
            analysis_id: self.analysis_id,
            result,
            pin_suggestion: self.pin_suggestion,
            new_facts: self.new_facts,
            new_alerts: self.new_alerts,
        }
    }
}

/// Wires the AI service, extractor, pattern detector, alert engine and
/// record store together.
pub struct Orchestrator<A, S> {
    ai: A,
    store: S,
    config: PipelineConfig,
    breed_risks: Box<dyn BreedRiskTable + Send + Sync>,
}

impl<A: AiService, S: RecordStore> Orchestrator<A, S> {
    /// Create an orchestrator with default configuration and the built-in
    /// breed-risk table.
    pub fn new(ai: A, store: S) -> Self {
        Self {
            ai,
            store,
            config: PipelineConfig::default(),
            breed_risks: Box::new(BuiltinBreedRisks::builtin()),
        }
    }

    /// Create an orchestrator from a validated configuration.
    pub fn with_config(ai: A, store: S, config: PipelineConfig) -> ConfigResult<Self> {
        config.validate()?;
        let breed_risks = config.breed_risks()?;
        Ok(Self {
            ai,
            store,
            config,
            breed_risks: Box::new(breed_risks),
        })
    }

    /// Replace the breed-risk reference.
    pub fn with_breed_risks(mut self, table: impl BreedRiskTable + Send + Sync + 'static) -> Self {
        self.breed_risks = Box::new(table);
        self
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn ai(&self) -> &A {
        &self.ai
    }

    /// Run a chat turn through the pipeline.
    pub async fn run_chat_analysis(
        &self,
        dog: &DogProfile,
        message: &str,
        history: &[ChatTurn],
        session_id: Option<&str>,
        message_id: Option<&str>,
    ) -> PipelineResult<AnalysisOutcome<ChatAssessment>> {
        let result = self
            .ai
            .chat(dog, message, history)
            .await
            .map_err(|err| upstream(dog, err))?;

        let now = Utc::now();
        let extracted =
            extractor::extract_from_chat(&result.metadata, &dog.id, session_id, message_id, now);
        let record = AnalysisRecord::new(&dog.id, Assessment::Chat(result.clone()), now);
        let ingested = self.ingest(dog, record, extracted, now)?;
        Ok(ingested.with_result(result))
    }

    /// Run a photo analysis through the pipeline.
    pub async fn run_photo_analysis(
        &self,
        dog: &DogProfile,
        image: &[u8],
        body_area: Option<&str>,
        description: Option<&str>,
    ) -> PipelineResult<AnalysisOutcome<PhotoAssessment>> {
        let result = self
            .ai
            .analyze_photo(image, dog, body_area, description)
            .await
            .map_err(|err| upstream(dog, err))?;

        let now = Utc::now();
        let extracted = extractor::extract_from_photo_of_area(&result, body_area, &dog.id, now);
        let record = AnalysisRecord::new(&dog.id, Assessment::Photo(result.clone()), now);
        let ingested = self.ingest(dog, record, extracted, now)?;
        Ok(ingested.with_result(result))
    }

    /// Run a lab or imaging report through the pipeline.
    pub async fn run_lab_analysis(
        &self,
        dog: &DogProfile,
        image: &[u8],
        lab_type: LabType,
        notes: Option<&str>,
    ) -> PipelineResult<AnalysisOutcome<LabAssessment>> {
        let result = self
            .ai
            .analyze_lab(image, dog, lab_type, notes)
            .await
            .map_err(|err| upstream(dog, err))?;

        let now = Utc::now();
        let extracted = extractor::extract_from_lab(&result, &dog.id, now);
        let record = AnalysisRecord::new(&dog.id, Assessment::Lab(result.clone()), now)
            .with_requested_lab_type(lab_type);
        let ingested = self.ingest(dog, record, extracted, now)?;
        Ok(ingested.with_result(result))
    }

    fn ingest(
        &self,
        dog: &DogProfile,
        record: AnalysisRecord,
        extracted: Vec<Fact>,
        now: DateTime<Utc>,
    ) -> PipelineResult<Ingested> {
        self.store.save_analysis(&record)?;

        let history = self.store.facts(&dog.id)?;
        let merged = merge(extracted, history, self.config.merge_window());
        let new_facts: Vec<Fact> = merged.changed().cloned().collect();
        for fact in &new_facts {
            self.store.save_fact(fact)?;
        }

        let patterns = patterns::detect(&merged.facts, self.config.patterns, now);

        let existing_alerts = self.store.alerts(&dog.id)?;
        let diagnostics = self.store.analyses(&dog.id)?;
        let engine = AlertEngine::with_rules(self.breed_risks.as_ref(), self.config.alerts.clone());
        let new_alerts = engine.generate(
            &AlertInput {
                dog,
                facts: &merged.facts,
                patterns: &patterns,
                existing_alerts: &existing_alerts,
                diagnostics: &diagnostics,
            },
            now,
        );
        for alert in &new_alerts {
            self.store.save_alert(alert)?;
        }

        let pin_suggestion = suggest_pin(&new_facts);

        info!(
            dog_id = %dog.id,
            kind = record.kind().as_str(),
            facts = new_facts.len(),
            patterns = patterns.len(),
            alerts = new_alerts.len(),
            "analysis ingested"
        );

        Ok(Ingested {
            analysis_id: record.id,
            pin_suggestion,
            new_facts,
            new_alerts,
        })
    }
}

fn upstream(dog: &DogProfile, err: AiError) -> PipelineError {
    warn!(dog_id = %dog.id, kind = err.kind.as_str(), "AI service failed");
    PipelineError::Upstream(err)
}

/// Suggest pinning the most severe unpinned fact of moderate or higher
/// severity. Ties keep the earliest.
pub fn suggest_pin(facts: &[Fact]) -> Option<PinSuggestion> {
    let mut best: Option<&Fact> = None;
    for fact in facts
        .iter()
        .filter(|f| !f.pinned && f.severity >= Severity::Moderate)
    {
        if best.map_or(true, |b| fact.severity > b.severity) {
            best = Some(fact);
        }
    }
    best.map(|fact| PinSuggestion {
        fact_id: fact.id.clone(),
        description: fact.description.clone(),
        severity: fact.severity,
    })
}
