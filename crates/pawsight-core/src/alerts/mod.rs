//! Alert engine: rule evaluation over a dog's profile, facts, patterns and
//! diagnostic history, plus the host-driven dismiss/snooze transitions.
//!
//! # Deduplication
//!
//! An alert is only created when no *live* alert (active, or snoozed with a
//! future `snooze_until`) of the same type already carries its key. Alerts
//! created earlier in the same `generate` call count as existing.

mod breed_risk;
pub mod keys;
mod rules;

pub use breed_risk::*;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::config::{ConfigError, ConfigResult};
use crate::models::{Alert, AlertStatus, AlertType, AnalysisRecord, DogProfile, Fact, Pattern};

/// Rule thresholds.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AlertRules {
    /// Vaccinations due within this many days (or overdue) alert
    pub vaccination_lookahead_days: i64,
    /// Due within this many days (or overdue) is high priority
    pub vaccination_urgent_days: i64,
    /// Weight readings older than this are ignored
    pub weight_window_days: i64,
    /// Minimum absolute percent change that alerts
    pub weight_change_pct: f64,
    /// Percent change at which the alert becomes high priority
    pub weight_change_high_pct: f64,
    /// Number of panels a marker must be abnormal in
    pub lab_trend_min_panels: usize,
    pub imaging_window_days: i64,
    pub abnormal_lab_window_days: i64,
}

impl Default for AlertRules {
    fn default() -> Self {
        Self {
            vaccination_lookahead_days: 30,
            vaccination_urgent_days: 7,
            weight_window_days: 90,
            weight_change_pct: 5.0,
            weight_change_high_pct: 10.0,
            lab_trend_min_panels: 2,
            imaging_window_days: 30,
            abnormal_lab_window_days: 7,
        }
    }
}

impl AlertRules {
    pub fn validate(&self) -> ConfigResult<()> {
        if self.vaccination_urgent_days > self.vaccination_lookahead_days {
            return Err(ConfigError::Invalid(
                "alerts.vaccination_urgent_days exceeds vaccination_lookahead_days".into(),
            ));
        }
        if self.weight_window_days <= 0
            || self.imaging_window_days <= 0
            || self.abnormal_lab_window_days <= 0
        {
            return Err(ConfigError::Invalid("alert windows must be positive".into()));
        }
        if !(self.weight_change_pct > 0.0 && self.weight_change_pct <= self.weight_change_high_pct) {
            return Err(ConfigError::Invalid(
                "alerts.weight_change_pct must be positive and not exceed weight_change_high_pct"
                    .into(),
            ));
        }
        if self.lab_trend_min_panels < 2 {
            return Err(ConfigError::Invalid("alerts.lab_trend_min_panels must be at least 2".into()));
        }
        Ok(())
    }
}

/// Everything the rules read.
#[derive(Debug, Clone, Copy)]
pub struct AlertInput<'a> {
    pub dog: &'a DogProfile,
    pub facts: &'a [Fact],
    pub patterns: &'a [Pattern],
    pub existing_alerts: &'a [Alert],
    /// Raw analysis records for the dog (lab records feed the diagnostic rules)
    pub diagnostics: &'a [AnalysisRecord],
}

/// Rule evaluator.
pub struct AlertEngine<'a> {
    breed_risks: &'a dyn BreedRiskTable,
    rules: AlertRules,
}

impl<'a> AlertEngine<'a> {
    /// Create an engine with default thresholds.
    pub fn new(breed_risks: &'a dyn BreedRiskTable) -> Self {
        Self::with_rules(breed_risks, AlertRules::default())
    }

    pub fn with_rules(breed_risks: &'a dyn BreedRiskTable, rules: AlertRules) -> Self {
        Self { breed_risks, rules }
    }

    pub fn rules(&self) -> &AlertRules {
        &self.rules
    }

    /// Run every rule and return the new alerts, highest priority first.
    pub fn generate(&self, input: &AlertInput<'_>, now: DateTime<Utc>) -> Vec<Alert> {
        let mut sink = AlertSink::new(input.existing_alerts, now);

        rules::breed_risk(self.breed_risks, input, &mut sink);
        rules::symptom_patterns(input, &mut sink);
        rules::vaccinations_due(&self.rules, input, &mut sink);
        rules::weight_trend(&self.rules, input, &mut sink);
        rules::lab_trends(&self.rules, input, &mut sink);
        rules::imaging_followups(&self.rules, input, &mut sink);
        rules::abnormal_labs(&self.rules, input, &mut sink);

        let mut created = sink.into_created();
        created.sort_by(|a, b| b.priority.cmp(&a.priority));

        info!(dog_id = %input.dog.id, count = created.len(), "generated alerts");
        created
    }
}

/// Collects candidate alerts, dropping live duplicates.
pub(crate) struct AlertSink<'a> {
    existing: &'a [Alert],
    created: Vec<Alert>,
    now: DateTime<Utc>,
}

impl<'a> AlertSink<'a> {
    fn new(existing: &'a [Alert], now: DateTime<Utc>) -> Self {
        Self {
            existing,
            created: Vec::new(),
            now,
        }
    }

    pub(crate) fn now(&self) -> DateTime<Utc> {
        self.now
    }

    /// Whether an alert of this type and key would be a live duplicate.
    pub(crate) fn blocks(&self, alert_type: AlertType, key: &str) -> bool {
        has_live_duplicate(
            self.existing.iter().chain(self.created.iter()),
            alert_type,
            key,
            self.now,
        )
    }

    /// Keep `alert` unless a live duplicate exists.
    pub(crate) fn offer(&mut self, alert: Alert) {
        if let Some(key) = alert.dedup_key().map(str::to_string) {
            if self.blocks(alert.alert_type, &key) {
                debug!(key = %key, "skipping live duplicate alert");
                return;
            }
        }
        self.created.push(alert);
    }

    fn into_created(self) -> Vec<Alert> {
        self.created
    }
}

/// Check whether any alert in `alerts` is a live duplicate of (type, key).
pub fn has_live_duplicate<'a, I>(alerts: I, alert_type: AlertType, key: &str, now: DateTime<Utc>) -> bool
where
    I: IntoIterator<Item = &'a Alert>,
{
    alerts.into_iter().any(|a| {
        a.alert_type == alert_type && a.dedup_key() == Some(key) && a.is_live(now)
    })
}

/// Dismiss the alert with `alert_id`. Unknown IDs leave the list unchanged.
pub fn dismiss(alerts: &[Alert], alert_id: &str, now: DateTime<Utc>) -> Vec<Alert> {
    alerts
        .iter()
        .map(|alert| {
            if alert.id != alert_id || alert.status == AlertStatus::Dismissed {
                return alert.clone();
            }
            Alert {
                status: AlertStatus::Dismissed,
                dismissed_at: Some(now),
                ..alert.clone()
            }
        })
        .collect()
}

/// Snooze the alert with `alert_id` for `days`. Unknown IDs leave the list unchanged.
pub fn snooze(alerts: &[Alert], alert_id: &str, days: u32, now: DateTime<Utc>) -> Vec<Alert> {
    alerts
        .iter()
        .map(|alert| {
            if alert.id != alert_id {
                return alert.clone();
            }
            Alert {
                status: AlertStatus::Snoozed,
                snooze_until: Some(now + Duration::days(i64::from(days))),
                ..alert.clone()
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Priority;
    use proptest::prelude::*;

    fn alert(key: &str) -> Alert {
        Alert::new(
            "dog-1",
            AlertType::SymptomPattern,
            key.to_string(),
            "title",
            "message",
            Priority::Medium,
            Utc::now(),
        )
    }

    #[test]
    fn test_dismiss_only_touches_target() {
        let now = Utc::now();
        let alerts = vec![alert("a"), alert("b")];
        let target = alerts[0].id.clone();

        let updated = dismiss(&alerts, &target, now);
        assert_eq!(updated[0].status, AlertStatus::Dismissed);
        assert_eq!(updated[0].dismissed_at, Some(now));
        assert_eq!(updated[1], alerts[1]);
    }

    #[test]
    fn test_dismiss_is_idempotent() {
        let now = Utc::now();
        let alerts = vec![alert("a")];
        let id = alerts[0].id.clone();

        let once = dismiss(&alerts, &id, now);
        let twice = dismiss(&once, &id, now + Duration::hours(1));
        assert_eq!(once, twice);
    }

    #[test]
    fn test_snooze_sets_deadline() {
        let now = Utc::now();
        let alerts = vec![alert("a")];
        let updated = snooze(&alerts, &alerts[0].id, 7, now);

        assert_eq!(updated[0].status, AlertStatus::Snoozed);
        assert_eq!(updated[0].snooze_until, Some(now + Duration::days(7)));
        assert!(updated[0].is_live(now + Duration::days(6)));
        assert!(!updated[0].is_live(now + Duration::days(8)));
    }

    #[test]
    fn test_unknown_id_is_noop() {
        let now = Utc::now();
        let alerts = vec![alert("a"), alert("b")];
        assert_eq!(dismiss(&alerts, "missing", now), alerts);
        assert_eq!(snooze(&alerts, "missing", 3, now), alerts);
    }

    #[test]
    fn test_live_duplicate_rules() {
        let now = Utc::now();
        let mut existing = alert("symptom_pattern:cough");
        assert!(has_live_duplicate([&existing], AlertType::SymptomPattern, "symptom_pattern:cough", now));
        assert!(!has_live_duplicate([&existing], AlertType::BreedRisk, "symptom_pattern:cough", now));
        assert!(!has_live_duplicate([&existing], AlertType::SymptomPattern, "symptom_pattern:itch", now));

        existing.status = AlertStatus::Dismissed;
        assert!(!has_live_duplicate([&existing], AlertType::SymptomPattern, "symptom_pattern:cough", now));

        existing.status = AlertStatus::Snoozed;
        existing.snooze_until = Some(now - Duration::days(1));
        assert!(!has_live_duplicate([&existing], AlertType::SymptomPattern, "symptom_pattern:cough", now));
    }

    #[test]
    fn test_rules_validation() {
        assert!(AlertRules::default().validate().is_ok());

        let rules = AlertRules {
            vaccination_urgent_days: 40,
            ..Default::default()
        };
        assert!(rules.validate().is_err());

        let rules = AlertRules {
            lab_trend_min_panels: 1,
            ..Default::default()
        };
        assert!(rules.validate().is_err());
    }

    proptest! {
        #[test]
        fn prop_transitions_preserve_length(count in 0usize..10, pick in 0usize..12, days in 0u32..60) {
            let now = Utc::now();
            let alerts: Vec<Alert> = (0..count).map(|i| alert(&format!("k{}", i))).collect();
            let id = alerts.get(pick).map(|a| a.id.clone()).unwrap_or_else(|| "unknown".into());

            let dismissed = dismiss(&alerts, &id, now);
            let snoozed = snooze(&alerts, &id, days, now);
            prop_assert_eq!(dismissed.len(), alerts.len());
            prop_assert_eq!(snoozed.len(), alerts.len());

            for (before, after) in alerts.iter().zip(dismissed.iter()) {
                if before.id != id {
                    prop_assert_eq!(before, after);
                }
            }
            for (before, after) in alerts.iter().zip(snoozed.iter()) {
                if before.id != id {
                    prop_assert_eq!(before, after);
                }
            }
        }
    }
}
