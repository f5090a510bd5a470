//! Fact extraction from AI assessment payloads.
//!
//! Each `extract_from_*` function maps one payload to zero or more facts.
//! Extraction never fails: missing fields simply produce fewer facts.

mod merge;

pub use merge::*;

use chrono::{DateTime, Utc};
use tracing::debug;

use crate::models::{
    normalize_label, ChatMetadata, Fact, FactCategory, FactOrigin, FactSource, LabAssessment,
    LabValue, MarkerStatus, PhotoAssessment, Severity,
};

/// Map an urgency label to a fact severity.
///
/// `emergency`/`urgent` are severe, `moderate` is moderate, everything else
/// (including `low`, `none` and absent) is mild.
pub fn severity_from_urgency(urgency: Option<&str>) -> Severity {
    match urgency.map(normalize_label).as_deref() {
        Some("emergency") | Some("urgent") => Severity::Severe,
        Some("moderate") => Severity::Moderate,
        _ => Severity::Mild,
    }
}

/// Severity of a lab fact, governed by the panel's overall assessment.
///
/// An abnormal marker in a panel assessed as `normal` falls through to
/// moderate; only a normal marker in a normal panel is mild.
pub fn lab_fact_severity(overall_assessment: Option<&str>, marker: MarkerStatus) -> Severity {
    match overall_assessment.map(normalize_label).as_deref() {
        Some("concerning") => Severity::Severe,
        Some("needs_attention") => Severity::Moderate,
        Some("normal") if marker.is_normal() => Severity::Mild,
        _ => Severity::Moderate,
    }
}

/// Extract facts from chat metadata.
pub fn extract_from_chat(
    metadata: &ChatMetadata,
    dog_id: &str,
    session_id: Option<&str>,
    message_id: Option<&str>,
    observed_at: DateTime<Utc>,
) -> Vec<Fact> {
    let severity = severity_from_urgency(metadata.urgency_level.as_deref());
    let source = FactSource {
        origin: FactOrigin::Chat,
        session_id: session_id.map(str::to_string),
        message_id: message_id.map(str::to_string),
    };

    let mut facts = observation_facts(
        &metadata.symptoms,
        &metadata.possible_conditions,
        &metadata.recommended_actions,
        Vec::new(),
        dog_id,
        severity,
        &source,
        observed_at,
    );

    if let Some(kg) = metadata.weight_kg.filter(|kg| *kg > 0.0) {
        let mut weight = Fact::weight_reading(dog_id, kg, observed_at);
        weight.source = source.clone();
        facts.push(weight);
    }

    debug!(dog_id, count = facts.len(), "extracted chat facts");
    facts
}

/// Extract facts from a photo analysis.
pub fn extract_from_photo(
    result: &PhotoAssessment,
    dog_id: &str,
    observed_at: DateTime<Utc>,
) -> Vec<Fact> {
    extract_from_photo_of_area(result, None, dog_id, observed_at)
}

/// Extract facts from a photo analysis, tagging `requested_area` when the
/// payload names no body area.
pub fn extract_from_photo_of_area(
    result: &PhotoAssessment,
    requested_area: Option<&str>,
    dog_id: &str,
    observed_at: DateTime<Utc>,
) -> Vec<Fact> {
    let severity = severity_from_urgency(result.urgency.as_deref());
    let area_tags: Vec<String> = result
        .body_area
        .as_deref()
        .or(requested_area)
        .map(str::trim)
        .filter(|area| !area.is_empty())
        .map(str::to_string)
        .into_iter()
        .collect();

    let facts = observation_facts(
        &result.symptoms,
        &result.possible_conditions,
        &result.recommended_actions,
        area_tags,
        dog_id,
        severity,
        &FactSource::new(FactOrigin::Photo),
        observed_at,
    );

    debug!(dog_id, count = facts.len(), "extracted photo facts");
    facts
}

/// Extract facts from a lab analysis: one per non-normal marker.
pub fn extract_from_lab(
    result: &LabAssessment,
    dog_id: &str,
    observed_at: DateTime<Utc>,
) -> Vec<Fact> {
    let facts: Vec<Fact> = result
        .abnormal_markers()
        .filter(|marker| !marker.name.trim().is_empty())
        .map(|marker| {
            let marker_tag = normalize_label(&marker.name);
            let status = marker.status.as_str();
            let severity = lab_fact_severity(result.overall_assessment.as_deref(), marker.status);

            let mut fact = Fact::new(
                dog_id,
                describe_marker(&marker.name, status, marker.value, marker.unit.as_deref()),
                FactCategory::LabResult,
                vec![format!("{}_{}", marker_tag, status), marker_tag],
                severity,
                FactSource::new(FactOrigin::Lab),
                observed_at,
            );
            fact.possible_conditions = result.possible_conditions.clone();
            fact.recommended_actions = result.recommended_actions.clone();
            fact.lab_value = Some(LabValue {
                marker: marker.name.clone(),
                value: marker.value,
                unit: marker.unit.clone(),
                reference_range: marker.reference_range.clone(),
                status: status.to_string(),
            });
            fact
        })
        .collect();

    debug!(dog_id, count = facts.len(), "extracted lab facts");
    facts
}

/// Symptoms win over conditions so one health event is not counted twice.
#[allow(clippy::too_many_arguments)]
fn observation_facts(
    symptoms: &[String],
    conditions: &[String],
    actions: &[String],
    extra_tags: Vec<String>,
    dog_id: &str,
    severity: Severity,
    source: &FactSource,
    observed_at: DateTime<Utc>,
) -> Vec<Fact> {
    let (items, category) = if !symptoms.is_empty() {
        (symptoms, FactCategory::Symptom)
    } else {
        (conditions, FactCategory::Condition)
    };

    items
        .iter()
        .map(|item| item.trim())
        .filter(|item| !item.is_empty())
        .map(|item| {
            let mut tags = vec![item.to_string()];
            tags.extend(extra_tags.iter().cloned());

            let mut fact = Fact::new(
                dog_id,
                item,
                category,
                tags,
                severity,
                source.clone(),
                observed_at,
            );
            fact.possible_conditions = conditions.to_vec();
            fact.recommended_actions = actions.to_vec();
            fact
        })
        .collect()
}

fn describe_marker(name: &str, status: &str, value: Option<f64>, unit: Option<&str>) -> String {
    match (value, unit) {
        (Some(v), Some(u)) => format!("{} {}: {} {}", name, status, v, u),
        (Some(v), None) => format!("{} {}: {}", name, status, v),
        _ => format!("{} {}", name, status),
    }
}
