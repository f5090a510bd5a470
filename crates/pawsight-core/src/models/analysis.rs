//! Raw analysis records as persisted by the orchestrator.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{ChatAssessment, LabAssessment, LabType, PhotoAssessment};

/// Which AI operation produced a record.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum AnalysisKind {
    Chat,
    Photo,
    Lab,
}

impl AnalysisKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            AnalysisKind::Chat => "chat",
            AnalysisKind::Photo => "photo",
            AnalysisKind::Lab => "lab",
        }
    }
}

/// A successful AI payload, tagged by analysis type.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "kind", content = "payload", rename_all = "snake_case")]
pub enum Assessment {
    Chat(ChatAssessment),
    Photo(PhotoAssessment),
    Lab(LabAssessment),
}

impl Assessment {
    pub fn kind(&self) -> AnalysisKind {
        match self {
            Assessment::Chat(_) => AnalysisKind::Chat,
            Assessment::Photo(_) => AnalysisKind::Photo,
            Assessment::Lab(_) => AnalysisKind::Lab,
        }
    }
}

/// A raw AI result persisted for one dog.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AnalysisRecord {
    /// Unique analysis ID
    pub id: String,
    pub dog_id: String,
    pub created_at: DateTime<Utc>,
    pub assessment: Assessment,
    /// Lab type named by the caller, kept beside the untouched payload
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub requested_lab_type: Option<LabType>,
}

impl AnalysisRecord {
    /// Wrap a fresh assessment for `dog_id`.
    pub fn new(dog_id: impl Into<String>, assessment: Assessment, created_at: DateTime<Utc>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            dog_id: dog_id.into(),
            created_at,
            assessment,
            requested_lab_type: None,
        }
    }

    pub fn with_requested_lab_type(mut self, lab_type: LabType) -> Self {
        self.requested_lab_type = Some(lab_type);
        self
    }

    pub fn kind(&self) -> AnalysisKind {
        self.assessment.kind()
    }

    /// The lab payload, if this is a lab record.
    pub fn as_lab(&self) -> Option<&LabAssessment> {
        match &self.assessment {
            Assessment::Lab(lab) => Some(lab),
            _ => None,
        }
    }

    /// Lab type of a lab record. A payload that says `other` defers to the
    /// requested type.
    pub fn lab_type(&self) -> Option<LabType> {
        let lab = self.as_lab()?;
        Some(match (lab.lab_type, self.requested_lab_type) {
            (LabType::Other, Some(requested)) => requested,
            (reported, _) => reported,
        })
    }
}
