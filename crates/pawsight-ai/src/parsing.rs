//! Assessment parsing from raw model output.

use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::debug;

use pawsight_core::{AiError, AiErrorKind, ChatAssessment, LabAssessment, PhotoAssessment};

/// Wording that marks a refusal on safety grounds.
const SAFETY_MARKERS: &[&str] = &["safety", "content policy", "content_filter", "blocked", "harmful"];

/// Locate the outermost JSON object in `raw` (models often wrap it in prose).
fn json_slice(raw: &str) -> Option<&str> {
    let start = raw.find('{')?;
    let end = raw.rfind('}')?;
    (end > start).then(|| &raw[start..=end])
}

fn parse_object(raw: &str) -> Result<Value, AiError> {
    let slice = json_slice(raw).ok_or_else(|| {
        AiError::new(AiErrorKind::Unknown, "No JSON object found in response")
    })?;
    let value: Value = serde_json::from_str(slice)
        .map_err(|e| AiError::new(AiErrorKind::Unknown, format!("JSON parse error: {}", e)))?;
    if let Some(err) = embedded_error(&value) {
        return Err(err);
    }
    Ok(value)
}

fn decode<T: DeserializeOwned>(value: Value) -> Result<T, AiError> {
    serde_json::from_value(value)
        .map_err(|e| AiError::new(AiErrorKind::Unknown, format!("Invalid response format: {}", e)))
}

/// Map an `"error"` member (object or string) to an [`AiError`].
fn embedded_error(value: &Value) -> Option<AiError> {
    let error = value.get("error")?;
    if error.is_null() {
        return None;
    }
    let (label, message) = match error {
        Value::String(message) => (None, message.clone()),
        Value::Object(fields) => {
            let label = ["type", "code", "kind"]
                .iter()
                .find_map(|k| fields.get(*k).and_then(Value::as_str));
            let message = fields
                .get("message")
                .and_then(Value::as_str)
                .unwrap_or("AI service reported an error")
                .to_string();
            (label, message)
        }
        other => (None, other.to_string()),
    };
    let kind = label
        .map(kind_from_label)
        .filter(|k| *k != AiErrorKind::Unknown)
        .unwrap_or_else(|| kind_from_text(&message));
    Some(AiError::new(kind, message))
}

/// Classify an error type label such as `rate_limit_error`.
pub fn kind_from_label(label: &str) -> AiErrorKind {
    let label = label.trim().to_lowercase();
    if label.contains("rate_limit") || label.contains("overloaded") || label.contains("quota") {
        AiErrorKind::RateLimited
    } else if label.contains("auth") || label.contains("permission") || label.contains("api_key") {
        AiErrorKind::AuthFailed
    } else if label.contains("timeout") || label.contains("timed_out") {
        AiErrorKind::Timeout
    } else if SAFETY_MARKERS.iter().any(|m| label.contains(m)) {
        AiErrorKind::SafetyRejected
    } else {
        AiErrorKind::Unknown
    }
}

fn kind_from_text(message: &str) -> AiErrorKind {
    let message = message.to_lowercase();
    if SAFETY_MARKERS.iter().any(|m| message.contains(m)) {
        AiErrorKind::SafetyRejected
    } else {
        AiErrorKind::Unknown
    }
}

/// Classify a failed HTTP exchange with the inference service.
pub fn error_from_status(status: u16, body: &str) -> AiError {
    let message = serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|v| {
            v.get("error")
                .and_then(|e| e.get("message").or(Some(e)))
                .and_then(Value::as_str)
                .map(str::to_string)
        })
        .or_else(|| Some(body.trim().to_string()).filter(|b| !b.is_empty()))
        .unwrap_or_else(|| format!("HTTP {}", status));

    let kind = match status {
        429 => AiErrorKind::RateLimited,
        401 | 403 => AiErrorKind::AuthFailed,
        408 | 504 => AiErrorKind::Timeout,
        _ => kind_from_text(&message),
    };
    debug!(status, kind = kind.as_str(), "classified upstream failure");
    AiError::new(kind, message)
}

/// Parse a chat reply. Text without a JSON object becomes a plain reply
/// with empty metadata.
pub fn parse_chat_response(raw: &str) -> Result<ChatAssessment, AiError> {
    if json_slice(raw).is_none() {
        return Ok(ChatAssessment {
            response: raw.trim().to_string(),
            ..Default::default()
        });
    }
    decode(parse_object(raw)?)
}

/// Parse a photo assessment.
pub fn parse_photo_response(raw: &str) -> Result<PhotoAssessment, AiError> {
    decode(parse_object(raw)?)
}

/// Parse a lab or imaging assessment.
pub fn parse_lab_response(raw: &str) -> Result<LabAssessment, AiError> {
    decode(parse_object(raw)?)
}
