//! Deduplication key construction, one function per alert type.
//!
//! Two live alerts of the same type must never share a key, so every rule
//! builds its key through these functions and nowhere else.

use crate::models::AlertType;

pub fn breed_risk_key(condition: &str) -> String {
    format!("{}:{}", AlertType::BreedRisk.as_str(), condition)
}

pub fn symptom_pattern_key(tag: &str) -> String {
    format!("{}:{}", AlertType::SymptomPattern.as_str(), tag)
}

pub fn vaccination_due_key(vaccine: &str) -> String {
    format!("{}:{}", AlertType::VaccinationDue.as_str(), vaccine)
}

/// Direction of a weight change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WeightDirection {
    Gain,
    Loss,
}

impl WeightDirection {
    pub fn as_str(&self) -> &'static str {
        match self {
            WeightDirection::Gain => "gain",
            WeightDirection::Loss => "loss",
        }
    }
}

pub fn weight_trend_key(direction: WeightDirection) -> String {
    format!("{}:{}", AlertType::WeightTrend.as_str(), direction.as_str())
}

pub fn lab_trend_key(marker: &str) -> String {
    format!("{}:{}", AlertType::LabTrend.as_str(), marker)
}

pub fn imaging_followup_key(analysis_id: &str) -> String {
    format!("{}:{}", AlertType::ImagingFollowup.as_str(), analysis_id)
}

pub fn abnormal_lab_key(analysis_id: &str) -> String {
    format!("{}:{}", AlertType::AbnormalLab.as_str(), analysis_id)
}
