//! AI assessment payloads (chat, photo, lab).
//!
//! Every field is defaulted at the deserialization boundary so downstream
//! code never has to check for absent or mistyped values.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use super::lenient;

/// Result of a chat turn.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ChatAssessment {
    /// Assistant reply shown to the owner
    #[serde(deserialize_with = "lenient::string")]
    pub response: String,
    /// Structured health metadata attached to the reply
    #[serde(deserialize_with = "lenient::or_default")]
    pub metadata: ChatMetadata,
}

/// Structured health metadata of a chat reply.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ChatMetadata {
    #[serde(deserialize_with = "lenient::opt_string")]
    pub urgency_level: Option<String>,
    #[serde(deserialize_with = "lenient::string_list")]
    pub symptoms: Vec<String>,
    #[serde(deserialize_with = "lenient::string_list")]
    pub possible_conditions: Vec<String>,
    #[serde(deserialize_with = "lenient::string_list")]
    pub recommended_actions: Vec<String>,
    #[serde(deserialize_with = "lenient::flag")]
    pub should_see_vet: bool,
    /// Weight reported by the owner during the conversation
    #[serde(deserialize_with = "lenient::opt_number")]
    pub weight_kg: Option<f64>,
}

/// Result of a photo analysis.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct PhotoAssessment {
    #[serde(deserialize_with = "lenient::string")]
    pub summary: String,
    #[serde(deserialize_with = "lenient::opt_string")]
    pub urgency: Option<String>,
    #[serde(deserialize_with = "lenient::opt_string")]
    pub body_area: Option<String>,
    #[serde(deserialize_with = "lenient::string_list")]
    pub observations: Vec<String>,
    #[serde(deserialize_with = "lenient::string_list")]
    pub symptoms: Vec<String>,
    #[serde(deserialize_with = "lenient::string_list")]
    pub possible_conditions: Vec<String>,
    #[serde(deserialize_with = "lenient::string_list")]
    pub recommended_actions: Vec<String>,
    #[serde(deserialize_with = "lenient::flag")]
    pub should_see_vet: bool,
}

/// Kind of diagnostic document submitted for lab analysis.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum LabType {
    /// Blood-work panel (CBC, chemistry)
    Bloodwork,
    Urinalysis,
    Xray,
    /// Any other lab report
    #[default]
    #[serde(other)]
    Other,
}

impl LabType {
    pub fn as_str(&self) -> &'static str {
        match self {
            LabType::Bloodwork => "bloodwork",
            LabType::Urinalysis => "urinalysis",
            LabType::Xray => "xray",
            LabType::Other => "other",
        }
    }
}

/// Status of a single lab marker.
#[derive(Debug, Clone, Copy, Default, Serialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum MarkerStatus {
    #[default]
    Normal,
    Low,
    High,
    Critical,
    /// Any non-normal status the model invents ("borderline", "elevated", ...)
    Abnormal,
}

impl MarkerStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            MarkerStatus::Normal => "normal",
            MarkerStatus::Low => "low",
            MarkerStatus::High => "high",
            MarkerStatus::Critical => "critical",
            MarkerStatus::Abnormal => "abnormal",
        }
    }

    /// Parse a status label in any case ("HIGH", "Critical", "normal").
    pub fn from_label(label: &str) -> Self {
        match normalize_label(label).as_str() {
            "normal" => MarkerStatus::Normal,
            "low" => MarkerStatus::Low,
            "high" => MarkerStatus::High,
            "critical" => MarkerStatus::Critical,
            _ => MarkerStatus::Abnormal,
        }
    }

    pub fn is_normal(&self) -> bool {
        matches!(self, MarkerStatus::Normal)
    }
}

// Non-string statuses (null, numbers) read as normal.
impl<'de> Deserialize<'de> for MarkerStatus {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        Ok(match Option::<Value>::deserialize(deserializer)? {
            Some(Value::String(s)) if !s.trim().is_empty() => MarkerStatus::from_label(&s),
            _ => MarkerStatus::Normal,
        })
    }
}

/// A single measured marker in a lab report.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct LabMarker {
    #[serde(deserialize_with = "lenient::string")]
    pub name: String,
    #[serde(deserialize_with = "lenient::opt_number")]
    pub value: Option<f64>,
    #[serde(deserialize_with = "lenient::opt_string")]
    pub unit: Option<String>,
    #[serde(deserialize_with = "lenient::opt_string")]
    pub reference_range: Option<String>,
    #[serde(deserialize_with = "lenient::or_default")]
    pub status: MarkerStatus,
}

/// A finding on an imaging study.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ImagingFinding {
    #[serde(deserialize_with = "lenient::string")]
    pub description: String,
    #[serde(deserialize_with = "lenient::flag")]
    pub abnormal: bool,
}

/// Result of a lab or imaging analysis.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct LabAssessment {
    #[serde(deserialize_with = "lenient::or_default")]
    pub lab_type: LabType,
    #[serde(deserialize_with = "lenient::string")]
    pub summary: String,
    /// Panel-level assessment: normal, needs_attention, concerning, ...
    #[serde(deserialize_with = "lenient::opt_string")]
    pub overall_assessment: Option<String>,
    #[serde(deserialize_with = "lenient::entries")]
    pub values: Vec<LabMarker>,
    #[serde(deserialize_with = "lenient::string_list")]
    pub possible_conditions: Vec<String>,
    #[serde(deserialize_with = "lenient::string_list")]
    pub recommended_actions: Vec<String>,
    #[serde(deserialize_with = "lenient::flag")]
    pub should_see_vet: bool,
    /// Imaging findings (X-ray only)
    #[serde(deserialize_with = "lenient::entries")]
    pub findings: Vec<ImagingFinding>,
    /// Radiologist-style overall impression (X-ray only)
    #[serde(deserialize_with = "lenient::opt_string")]
    pub overall_impression: Option<String>,
    #[serde(deserialize_with = "lenient::flag")]
    pub recommends_additional_views: bool,
}

impl LabAssessment {
    /// Markers whose status is not normal.
    pub fn abnormal_markers(&self) -> impl Iterator<Item = &LabMarker> {
        self.values.iter().filter(|m| !m.status.is_normal())
    }

    /// Lower-cased panel assessment, falling back to the imaging impression.
    pub fn assessment_label(&self) -> Option<String> {
        self.overall_assessment
            .as_deref()
            .or(self.overall_impression.as_deref())
            .map(normalize_label)
    }
}

/// Lower-case and snake a free-form label ("Needs Attention" -> "needs_attention").
pub fn normalize_label(label: &str) -> String {
    label
        .trim()
        .to_lowercase()
        .split(|c: char| c.is_whitespace() || c == '-')
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join("_")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chat_metadata_full() {
        let json = r#"{
            "response": "Sounds like an upset stomach.",
            "metadata": {
                "urgency_level": "moderate",
                "symptoms": ["Vomiting", "lethargy"],
                "possible_conditions": ["gastritis"],
                "recommended_actions": ["withhold food for 12 hours"],
                "should_see_vet": true
            }
        }"#;

        let chat: ChatAssessment = serde_json::from_str(json).unwrap();
        assert_eq!(chat.metadata.urgency_level.as_deref(), Some("moderate"));
        assert_eq!(chat.metadata.symptoms, vec!["Vomiting", "lethargy"]);
        assert!(chat.metadata.should_see_vet);
        assert_eq!(chat.metadata.weight_kg, None);
    }

    #[test]
    fn test_malformed_fields_default() {
        let json = r#"{
            "metadata": {
                "urgency_level": 7,
                "symptoms": "itching",
                "possible_conditions": [null, 3, "allergy"],
                "recommended_actions": {"oops": true},
                "should_see_vet": "yes",
                "weight_kg": "31.5"
            }
        }"#;

        let chat: ChatAssessment = serde_json::from_str(json).unwrap();
        assert_eq!(chat.response, "");
        assert_eq!(chat.metadata.urgency_level, None);
        assert_eq!(chat.metadata.symptoms, vec!["itching"]);
        assert_eq!(chat.metadata.possible_conditions, vec!["allergy"]);
        assert!(chat.metadata.recommended_actions.is_empty());
        assert!(chat.metadata.should_see_vet);
        assert_eq!(chat.metadata.weight_kg, Some(31.5));
    }

    #[test]
    fn test_empty_object_is_valid() {
        let photo: PhotoAssessment = serde_json::from_str("{}").unwrap();
        assert_eq!(photo, PhotoAssessment::default());

        let lab: LabAssessment = serde_json::from_str("{}").unwrap();
        assert_eq!(lab.lab_type, LabType::Other);
        assert!(lab.values.is_empty());
    }

    #[test]
    fn test_lab_markers_and_unknown_status() {
        let json = r#"{
            "lab_type": "bloodwork",
            "overall_assessment": "Needs Attention",
            "values": [
                {"name": "ALT", "value": 180, "unit": "U/L", "status": "high"},
                {"name": "BUN", "value": "22", "status": "normal"},
                {"name": "Glucose", "status": "borderline"},
                "garbage"
            ]
        }"#;

        let lab: LabAssessment = serde_json::from_str(json).unwrap();
        assert_eq!(lab.lab_type, LabType::Bloodwork);
        assert_eq!(lab.values.len(), 3);
        assert_eq!(lab.values[1].value, Some(22.0));
        assert_eq!(lab.values[2].status, MarkerStatus::Abnormal);
        assert_eq!(lab.abnormal_markers().count(), 2);
        assert_eq!(lab.assessment_label().as_deref(), Some("needs_attention"));
    }

    #[test]
    fn test_marker_status_any_case() {
        let json = r#"{"values": [
            {"name": "BUN", "status": "Normal"},
            {"name": "ALT", "status": "HIGH"},
            {"name": "K", "status": " Critical "},
            {"name": "Na", "status": "Low"},
            {"name": "Ca", "status": "Elevated"},
            {"name": "P", "status": null}
        ]}"#;

        let lab: LabAssessment = serde_json::from_str(json).unwrap();
        let statuses: Vec<MarkerStatus> = lab.values.iter().map(|m| m.status).collect();
        assert_eq!(
            statuses,
            vec![
                MarkerStatus::Normal,
                MarkerStatus::High,
                MarkerStatus::Critical,
                MarkerStatus::Low,
                MarkerStatus::Abnormal,
                MarkerStatus::Normal,
            ]
        );
        assert_eq!(serde_json::to_string(&MarkerStatus::Critical).unwrap(), "\"critical\"");
    }

    #[test]
    fn test_unknown_lab_type_is_other() {
        let lab: LabAssessment = serde_json::from_str(r#"{"lab_type": "cytology"}"#).unwrap();
        assert_eq!(lab.lab_type, LabType::Other);

        let lab: LabAssessment = serde_json::from_str(r#"{"lab_type": 12}"#).unwrap();
        assert_eq!(lab.lab_type, LabType::Other);
    }

    #[test]
    fn test_mistyped_metadata_defaults() {
        let chat: ChatAssessment =
            serde_json::from_str(r#"{"response": "ok", "metadata": "none"}"#).unwrap();
        assert_eq!(chat.metadata, ChatMetadata::default());
    }

    #[test]
    fn test_normalize_label() {
        assert_eq!(normalize_label("  Needs attention "), "needs_attention");
        assert_eq!(normalize_label("follow-up"), "follow_up");
        assert_eq!(normalize_label("CONCERNING"), "concerning");
    }
}
