//! AI inference service seam.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::models::{ChatAssessment, DogProfile, LabAssessment, LabType, PhotoAssessment};

/// Classification of an upstream failure.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum AiErrorKind {
    RateLimited,
    SafetyRejected,
    AuthFailed,
    Timeout,
    Unknown,
}

impl AiErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            AiErrorKind::RateLimited => "rate_limited",
            AiErrorKind::SafetyRejected => "safety_rejected",
            AiErrorKind::AuthFailed => "auth_failed",
            AiErrorKind::Timeout => "timeout",
            AiErrorKind::Unknown => "unknown",
        }
    }
}

/// Error reported by the AI service. Passed to callers unmodified.
#[derive(Error, Debug, Clone, PartialEq, Serialize, Deserialize)]
#[error("{}: {message}", kind.as_str())]
pub struct AiError {
    pub kind: AiErrorKind,
    pub message: String,
}

impl AiError {
    pub fn new(kind: AiErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

/// Speaker of a prior chat turn.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ChatRole {
    User,
    Assistant,
}

/// One prior turn of a chat conversation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChatTurn {
    pub role: ChatRole,
    pub content: String,
}

impl ChatTurn {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::Assistant,
            content: content.into(),
        }
    }
}

/// The opaque AI service producing health assessments.
#[async_trait]
pub trait AiService: Send + Sync {
    /// Answer one owner message about `dog`.
    async fn chat(
        &self,
        dog: &DogProfile,
        message: &str,
        history: &[ChatTurn],
    ) -> Result<ChatAssessment, AiError>;

    /// Assess a photo of `dog`.
    async fn analyze_photo(
        &self,
        image: &[u8],
        dog: &DogProfile,
        body_area: Option<&str>,
        description: Option<&str>,
    ) -> Result<PhotoAssessment, AiError>;

    /// Interpret a lab report or X-ray image.
    async fn analyze_lab(
        &self,
        image: &[u8],
        dog: &DogProfile,
        lab_type: LabType,
        notes: Option<&str>,
    ) -> Result<LabAssessment, AiError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = AiError::new(AiErrorKind::RateLimited, "slow down");
        assert_eq!(err.to_string(), "rate_limited: slow down");
    }

    #[test]
    fn test_kind_serde() {
        let json = serde_json::to_string(&AiErrorKind::SafetyRejected).unwrap();
        assert_eq!(json, "\"safety_rejected\"");
    }
}
