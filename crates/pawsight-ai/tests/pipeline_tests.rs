//! End-to-end pipeline tests driven by scripted AI responses.

use chrono::{Duration, Utc};

use pawsight_ai::{OfflineAssessor, ScriptedAiService};
use pawsight_core::models::{
    AlertType, FactCategory, FactOrigin, FactSource, Severity, Vaccination,
};
use pawsight_core::{
    AiError, AiErrorKind, Database, DogProfile, Fact, InMemoryStore, LabType, Orchestrator,
    PipelineConfig, PipelineError, Priority, RecordStore,
};

fn dog() -> DogProfile {
    DogProfile::new("dog-1", "Biscuit")
}

fn vomiting_reply(urgency: &str) -> String {
    format!(
        r#"{{"response": "Withhold food for a few hours.",
            "metadata": {{"urgency_level": "{}", "symptoms": ["Vomiting"],
                          "possible_conditions": ["Gastritis"]}}}}"#,
        urgency
    )
}

fn past_vomiting(days_ago: i64) -> Fact {
    Fact::new(
        "dog-1",
        "Vomiting",
        FactCategory::Symptom,
        vec!["vomiting".into()],
        Severity::Mild,
        FactSource::new(FactOrigin::Chat),
        Utc::now() - Duration::days(days_ago),
    )
}

#[tokio::test]
async fn third_vomiting_report_raises_pattern_alert() {
    let ai = ScriptedAiService::new();
    ai.push_chat_raw(&vomiting_reply("moderate"));

    let store = InMemoryStore::new();
    store.save_fact(&past_vomiting(10)).unwrap();
    store.save_fact(&past_vomiting(5)).unwrap();

    let orchestrator = Orchestrator::new(ai, store);
    let outcome = orchestrator
        .run_chat_analysis(&dog(), "She threw up again", &[], Some("session-1"), None)
        .await
        .unwrap();

    assert_eq!(outcome.result.response, "Withhold food for a few hours.");
    assert_eq!(outcome.new_facts.len(), 1);
    assert_eq!(orchestrator.store().facts("dog-1").unwrap().len(), 3);

    let pattern_alerts: Vec<_> = outcome
        .new_alerts
        .iter()
        .filter(|a| a.alert_type == AlertType::SymptomPattern)
        .collect();
    assert_eq!(pattern_alerts.len(), 1);
    assert_eq!(pattern_alerts[0].dedup_key(), Some("symptom_pattern:vomiting"));

    let pin = outcome.pin_suggestion.expect("moderate fact should be offered for pinning");
    assert_eq!(pin.fact_id, outcome.new_facts[0].id);
}

#[tokio::test]
async fn repeated_analysis_does_not_duplicate_alerts() {
    let ai = ScriptedAiService::new();
    ai.push_chat_raw(r#"{"response": "Sounds fine."}"#)
        .push_chat_raw(r#"{"response": "Still fine."}"#);

    let dog = DogProfile {
        breed: Some("Labrador Retriever".into()),
        age: Some(4.0),
        ..dog()
    };
    let orchestrator = Orchestrator::new(ai, InMemoryStore::new());

    let first = orchestrator
        .run_chat_analysis(&dog, "How is he doing?", &[], None, None)
        .await
        .unwrap();
    assert!(first
        .new_alerts
        .iter()
        .any(|a| a.dedup_key() == Some("breed_risk:Hip Dysplasia")));
    assert!(first.new_facts.is_empty());
    assert!(first.pin_suggestion.is_none());

    let second = orchestrator
        .run_chat_analysis(&dog, "And now?", &[], None, None)
        .await
        .unwrap();
    assert!(second.new_alerts.is_empty());

    let stored = orchestrator.store().alerts("dog-1").unwrap();
    assert_eq!(stored.len(), first.new_alerts.len());
}

#[tokio::test]
async fn reported_weight_gain_raises_high_alert() {
    let ai = ScriptedAiService::new();
    ai.push_chat_raw(r#"{"response": "Noted.", "metadata": {"weight_kg": 56}}"#);

    let store = InMemoryStore::new();
    store
        .save_fact(&Fact::weight_reading("dog-1", 50.0, Utc::now() - Duration::days(45)))
        .unwrap();

    let orchestrator = Orchestrator::new(ai, store);
    let outcome = orchestrator
        .run_chat_analysis(&dog(), "He weighs 56 kg now", &[], None, None)
        .await
        .unwrap();

    let weight = outcome
        .new_alerts
        .iter()
        .find(|a| a.alert_type == AlertType::WeightTrend)
        .expect("weight alert");
    assert_eq!(weight.priority, Priority::High);
    assert_eq!(weight.dedup_key(), Some("weight_trend:gain"));
}

#[tokio::test]
async fn vaccination_due_soon_is_high_priority() {
    let ai = ScriptedAiService::new();
    ai.push_chat_raw(r#"{"response": "Hello!"}"#);

    let today = Utc::now().date_naive();
    let dog = DogProfile {
        vaccinations: vec![
            Vaccination {
                name: "Rabies".into(),
                next_due: Some(today + Duration::days(3)),
            },
            Vaccination {
                name: "DHPP".into(),
                next_due: Some(today + Duration::days(14)),
            },
            Vaccination {
                name: "Leptospirosis".into(),
                next_due: Some(today + Duration::days(60)),
            },
        ],
        ..dog()
    };

    let orchestrator = Orchestrator::new(ai, InMemoryStore::new());
    let outcome = orchestrator
        .run_chat_analysis(&dog, "Hi", &[], None, None)
        .await
        .unwrap();

    let priorities: Vec<_> = outcome
        .new_alerts
        .iter()
        .filter(|a| a.alert_type == AlertType::VaccinationDue)
        .map(|a| (a.dedup_key().unwrap_or_default().to_string(), a.priority))
        .collect();
    assert_eq!(
        priorities,
        vec![
            ("vaccination_due:Rabies".to_string(), Priority::High),
            ("vaccination_due:DHPP".to_string(), Priority::Medium),
        ]
    );
}

#[tokio::test]
async fn upstream_error_is_returned_unmodified() {
    let ai = ScriptedAiService::new();
    ai.push_photo(Err(AiError::new(
        AiErrorKind::SafetyRejected,
        "Image rejected by safety filter",
    )));

    let orchestrator = Orchestrator::new(ai, InMemoryStore::new());
    let err = orchestrator
        .run_photo_analysis(&dog(), b"jpeg", Some("paw"), None)
        .await
        .unwrap_err();

    match err {
        PipelineError::Upstream(ai) => {
            assert_eq!(ai.kind, AiErrorKind::SafetyRejected);
            assert_eq!(ai.message, "Image rejected by safety filter");
        }
        other => panic!("unexpected error: {other}"),
    }
    assert!(orchestrator.store().analyses("dog-1").unwrap().is_empty());
}

#[tokio::test]
async fn embedded_error_in_model_output_short_circuits() {
    let ai = ScriptedAiService::new();
    ai.push_lab_raw(r#"{"error": {"type": "rate_limit_error", "message": "Slow down"}}"#);

    let orchestrator = Orchestrator::new(ai, InMemoryStore::new());
    let err = orchestrator
        .run_lab_analysis(&dog(), b"pdf", LabType::Bloodwork, None)
        .await
        .unwrap_err();

    assert!(matches!(err, PipelineError::Upstream(AiError { kind: AiErrorKind::RateLimited, .. })));
}

#[tokio::test]
async fn malformed_payload_yields_no_facts() {
    let ai = ScriptedAiService::new();
    ai.push_photo_raw(r#"{"summary": ["not", "a", "string"], "symptoms": 42, "urgency": {}}"#);

    let orchestrator = Orchestrator::new(ai, InMemoryStore::new());
    let outcome = orchestrator
        .run_photo_analysis(&dog(), b"jpeg", None, None)
        .await
        .unwrap();

    assert!(outcome.new_facts.is_empty());
    assert!(outcome.pin_suggestion.is_none());
    assert_eq!(orchestrator.store().analyses("dog-1").unwrap().len(), 1);
}

#[tokio::test]
async fn repeated_lab_panels_raise_lab_trend_on_sqlite() {
    let panel = r#"{
        "lab_type": "bloodwork",
        "overall_assessment": "needs_attention",
        "values": [{"name": "ALT", "value": 150, "unit": "U/L", "status": "high"}]
    }"#;
    let ai = ScriptedAiService::new();
    ai.push_lab_raw(panel).push_lab_raw(panel);

    let dir = tempfile::tempdir().unwrap();
    let db = Database::open(dir.path().join("pawsight.db")).unwrap();
    let orchestrator = Orchestrator::new(ai, db);

    let first = orchestrator
        .run_lab_analysis(&dog(), b"pdf", LabType::Bloodwork, None)
        .await
        .unwrap();
    assert_eq!(first.new_facts.len(), 1);
    assert_eq!(first.new_facts[0].severity, Severity::Moderate);
    assert!(first.new_alerts.iter().all(|a| a.alert_type != AlertType::LabTrend));

    let second = orchestrator
        .run_lab_analysis(&dog(), b"pdf", LabType::Bloodwork, None)
        .await
        .unwrap();
    assert!(second
        .new_alerts
        .iter()
        .any(|a| a.dedup_key() == Some("lab_trend:alt")));
    // Same marker within a day merges into the existing fact.
    assert_eq!(orchestrator.store().facts("dog-1").unwrap().len(), 1);
}

#[tokio::test]
async fn offline_assessor_drives_pipeline() {
    let config = PipelineConfig::from_toml_str("[patterns]\nthreshold = 2\n").unwrap();
    let orchestrator =
        Orchestrator::with_config(OfflineAssessor::new(), InMemoryStore::new(), config).unwrap();

    orchestrator
        .store()
        .save_fact(&past_vomiting(3))
        .unwrap();

    let outcome = orchestrator
        .run_chat_analysis(&dog(), "He was vomiting again this morning", &[], None, None)
        .await
        .unwrap();

    assert_eq!(outcome.result.metadata.urgency_level.as_deref(), Some("moderate"));
    assert_eq!(outcome.new_facts[0].severity, Severity::Moderate);
    assert!(outcome
        .new_alerts
        .iter()
        .any(|a| a.dedup_key() == Some("symptom_pattern:vomiting")));
}
