//! Individual alert rules. Each rule reads the input and offers candidates
//! to the sink; none depends on another's output.

use std::collections::BTreeMap;

use chrono::Duration;
use serde_json::json;
use tracing::debug;

use super::keys::{self, WeightDirection};
use super::{AlertInput, AlertRules, AlertSink, BreedRiskTable};
use crate::models::{
    normalize_label, Alert, AlertType, AnalysisRecord, LabAssessment, LabType, MarkerStatus,
    Priority,
};

/// Panel assessments that warrant an immediate notification.
const CONCERNING_ASSESSMENTS: &[&str] = &["concerning", "critical", "urgent"];

pub(super) fn breed_risk(table: &dyn BreedRiskTable, input: &AlertInput<'_>, sink: &mut AlertSink<'_>) {
    let dog = input.dog;
    let Some(breed) = dog.known_breed() else {
        return;
    };
    let Some(age) = dog.resolve_age(sink.now().date_naive()) else {
        return;
    };

    for risk in table.lookup(breed) {
        if !risk.age_range.contains(age) {
            continue;
        }
        let alert = Alert::new(
            &dog.id,
            AlertType::BreedRisk,
            keys::breed_risk_key(&risk.condition),
            format!("{} risk", risk.condition),
            format!(
                "{}s between {} and {} years old are predisposed to {}. {}",
                breed,
                risk.age_range.min,
                risk.age_range.max,
                risk.condition.to_lowercase(),
                risk.description
            )
            .trim_end()
            .to_string(),
            Priority::from_severity_label(&risk.severity),
            sink.now(),
        )
        .with_meta("condition", risk.condition.clone())
        .with_meta("breed", breed)
        .with_meta("age", age);
        sink.offer(alert);
    }
}

pub(super) fn symptom_patterns(input: &AlertInput<'_>, sink: &mut AlertSink<'_>) {
    for pattern in input.patterns {
        let alert = Alert::new(
            &input.dog.id,
            AlertType::SymptomPattern,
            keys::symptom_pattern_key(&pattern.tag),
            format!("Recurring {}", pattern.tag),
            format!(
                "{}. Recurring symptoms are worth discussing with your veterinarian.",
                pattern.description
            ),
            Priority::from_severity_label(pattern.severity.as_str()),
            sink.now(),
        )
        .with_meta("tag", pattern.tag.clone())
        .with_meta("count", pattern.count)
        .with_meta("fact_ids", json!(pattern.fact_ids));
        sink.offer(alert);
    }
}

pub(super) fn vaccinations_due(rules: &AlertRules, input: &AlertInput<'_>, sink: &mut AlertSink<'_>) {
    let today = sink.now().date_naive();
    let dog = input.dog;

    for vaccination in &dog.vaccinations {
        let Some(due) = vaccination.next_due else {
            continue;
        };
        let days_until = (due - today).num_days();
        if days_until > rules.vaccination_lookahead_days {
            continue;
        }

        let priority = if days_until <= rules.vaccination_urgent_days {
            Priority::High
        } else {
            Priority::Medium
        };
        let (title, timing) = match days_until {
            d if d < 0 => (
                format!("{} vaccination overdue", vaccination.name),
                format!("was due {} ago", day_count(-d)),
            ),
            0 => (
                format!("{} vaccination due", vaccination.name),
                "is due today".to_string(),
            ),
            d => (
                format!("{} vaccination due", vaccination.name),
                format!("is due in {}", day_count(d)),
            ),
        };

        let alert = Alert::new(
            &dog.id,
            AlertType::VaccinationDue,
            keys::vaccination_due_key(&vaccination.name),
            title,
            format!("{}'s {} vaccination {}.", dog.name, vaccination.name, timing),
            priority,
            sink.now(),
        )
        .with_meta("vaccine", vaccination.name.clone())
        .with_meta("due_date", due.to_string())
        .with_meta("days_until", days_until);
        sink.offer(alert);
    }
}

pub(super) fn weight_trend(rules: &AlertRules, input: &AlertInput<'_>, sink: &mut AlertSink<'_>) {
    let now = sink.now();
    let window_start = now - Duration::days(rules.weight_window_days);

    let mut readings: Vec<_> = input
        .facts
        .iter()
        .filter(|f| f.is_weight_reading())
        .filter(|f| f.occurred_at >= window_start && f.occurred_at <= now)
        .filter_map(|f| f.weight_kg().map(|kg| (f.occurred_at, kg)))
        .collect();
    if readings.len() < 2 {
        return;
    }
    readings.sort_by_key(|(at, _)| *at);

    let (_, first) = readings[0];
    let (_, last) = readings[readings.len() - 1];
    if first <= 0.0 {
        return;
    }
    let change_pct = (last - first) / first * 100.0;
    if change_pct.abs() < rules.weight_change_pct {
        debug!(change_pct, "weight change below threshold");
        return;
    }

    let direction = if change_pct > 0.0 {
        WeightDirection::Gain
    } else {
        WeightDirection::Loss
    };
    let priority = if change_pct.abs() >= rules.weight_change_high_pct {
        Priority::High
    } else {
        Priority::Medium
    };
    let verb = match direction {
        WeightDirection::Gain => "gained",
        WeightDirection::Loss => "lost",
    };

    let alert = Alert::new(
        &input.dog.id,
        AlertType::WeightTrend,
        keys::weight_trend_key(direction),
        format!("Weight {} detected", direction.as_str()),
        format!(
            "{} has {} {:.1} kg ({:.1}%) over the last {} days.",
            input.dog.name,
            verb,
            (last - first).abs(),
            change_pct.abs(),
            rules.weight_window_days
        ),
        priority,
        now,
    )
    .with_meta("direction", direction.as_str())
    .with_meta("from_kg", first)
    .with_meta("to_kg", last)
    .with_meta("change_pct", change_pct);
    sink.offer(alert);
}

struct MarkerHistory {
    display_name: String,
    panels: usize,
    latest_status: MarkerStatus,
}

pub(super) fn lab_trends(rules: &AlertRules, input: &AlertInput<'_>, sink: &mut AlertSink<'_>) {
    let mut panels: Vec<(&AnalysisRecord, &LabAssessment)> = input
        .diagnostics
        .iter()
        .filter(|r| r.lab_type() == Some(LabType::Bloodwork))
        .filter_map(|r| r.as_lab().map(|lab| (r, lab)))
        .collect();
    panels.sort_by_key(|(record, _)| record.created_at);

    let mut history: BTreeMap<String, MarkerHistory> = BTreeMap::new();
    for (_, panel) in &panels {
        let mut seen_in_panel = std::collections::BTreeSet::new();
        for marker in panel.abnormal_markers() {
            let name = normalize_label(&marker.name);
            if name.is_empty() {
                continue;
            }
            let entry = history.entry(name.clone()).or_insert_with(|| MarkerHistory {
                display_name: marker.name.clone(),
                panels: 0,
                latest_status: marker.status,
            });
            if seen_in_panel.insert(name) {
                entry.panels += 1;
            }
            entry.latest_status = marker.status;
            entry.display_name = marker.name.clone();
        }
    }

    for (marker, entry) in history {
        if entry.panels < rules.lab_trend_min_panels {
            continue;
        }
        let priority = if entry.latest_status == MarkerStatus::Critical {
            Priority::High
        } else {
            Priority::Medium
        };
        let alert = Alert::new(
            &input.dog.id,
            AlertType::LabTrend,
            keys::lab_trend_key(&marker),
            format!("{} repeatedly abnormal", entry.display_name),
            format!(
                "{} has been abnormal in {} blood panels; most recently {}.",
                entry.display_name,
                entry.panels,
                entry.latest_status.as_str()
            ),
            priority,
            sink.now(),
        )
        .with_meta("marker", marker)
        .with_meta("panels", entry.panels)
        .with_meta("latest_status", entry.latest_status.as_str());
        sink.offer(alert);
    }
}

pub(super) fn imaging_followups(rules: &AlertRules, input: &AlertInput<'_>, sink: &mut AlertSink<'_>) {
    let now = sink.now();
    let window_start = now - Duration::days(rules.imaging_window_days);

    for record in input.diagnostics {
        let Some(lab) = record.as_lab() else {
            continue;
        };
        if record.lab_type() != Some(LabType::Xray)
            || record.created_at < window_start
            || record.created_at > now
        {
            continue;
        }
        let abnormal_finding = lab.findings.iter().any(|f| f.abnormal);
        let abnormal_impression = lab
            .overall_impression
            .as_deref()
            .map(|i| normalize_label(i) != "normal")
            .unwrap_or(false);
        if !lab.recommends_additional_views || !(abnormal_finding || abnormal_impression) {
            continue;
        }

        let alert = Alert::new(
            &input.dog.id,
            AlertType::ImagingFollowup,
            keys::imaging_followup_key(&record.id),
            "X-ray follow-up recommended",
            format!(
                "The X-ray from {} showed {} and additional views were recommended.",
                record.created_at.format("%Y-%m-%d"),
                lab.overall_impression
                    .as_deref()
                    .unwrap_or("abnormal findings")
                    .to_lowercase()
            ),
            Priority::Medium,
            now,
        )
        .with_meta("analysis_id", record.id.clone());
        sink.offer(alert);
    }
}

pub(super) fn abnormal_labs(rules: &AlertRules, input: &AlertInput<'_>, sink: &mut AlertSink<'_>) {
    let now = sink.now();
    let window_start = now - Duration::days(rules.abnormal_lab_window_days);

    for record in input.diagnostics {
        let (Some(lab), Some(lab_type)) = (record.as_lab(), record.lab_type()) else {
            continue;
        };
        if lab_type == LabType::Urinalysis
            || record.created_at < window_start
            || record.created_at > now
        {
            continue;
        }
        let concerning = lab
            .assessment_label()
            .map(|label| CONCERNING_ASSESSMENTS.contains(&label.as_str()))
            .unwrap_or(false);
        if !concerning {
            continue;
        }

        let critical: Vec<&str> = lab
            .values
            .iter()
            .filter(|m| m.status == MarkerStatus::Critical)
            .map(|m| m.name.as_str())
            .collect();
        let message = if critical.is_empty() {
            format!(
                "A recent {} result needs attention. Review the full report with your veterinarian.",
                report_name(lab_type)
            )
        } else {
            format!(
                "A recent {} result flagged critical values: {}. Contact your veterinarian.",
                report_name(lab_type),
                critical.join(", ")
            )
        };

        let alert = Alert::new(
            &input.dog.id,
            AlertType::AbnormalLab,
            keys::abnormal_lab_key(&record.id),
            format!("Abnormal {} result", report_name(lab_type)),
            message,
            Priority::High,
            now,
        )
        .with_meta("analysis_id", record.id.clone())
        .with_meta("critical_markers", json!(critical));
        sink.offer(alert);
    }
}

fn report_name(lab_type: LabType) -> &'static str {
    match lab_type {
        LabType::Bloodwork => "blood work",
        LabType::Urinalysis => "urinalysis",
        LabType::Xray => "X-ray",
        LabType::Other => "lab",
    }
}

fn day_count(days: i64) -> String {
    if days == 1 {
        "1 day".to_string()
    } else {
        format!("{} days", days)
    }
}
