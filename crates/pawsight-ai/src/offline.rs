//! Offline chat triage from keywords, used when the inference service is
//! unreachable.

use async_trait::async_trait;
use tracing::debug;

use pawsight_core::models::ChatMetadata;
use pawsight_core::{
    AiError, AiErrorKind, AiService, ChatAssessment, ChatTurn, DogProfile, LabAssessment, LabType,
    PhotoAssessment,
};

/// Urgency levels in ascending order.
const URGENCY_ORDER: &[&str] = &["low", "moderate", "urgent", "emergency"];

/// (keyword, symptom, urgency)
const KEYWORDS: &[(&str, &str, &str)] = &[
    ("seizure", "seizure", "emergency"),
    ("collapse", "collapse", "emergency"),
    ("not breathing", "breathing difficulty", "emergency"),
    ("can't breathe", "breathing difficulty", "emergency"),
    ("poison", "toxin ingestion", "emergency"),
    ("chocolate", "toxin ingestion", "emergency"),
    ("bloat", "bloated abdomen", "emergency"),
    ("blood", "bleeding", "urgent"),
    ("can't walk", "inability to walk", "urgent"),
    ("not eating", "loss of appetite", "moderate"),
    ("won't eat", "loss of appetite", "moderate"),
    ("vomit", "vomiting", "moderate"),
    ("threw up", "vomiting", "moderate"),
    ("diarrhea", "diarrhea", "moderate"),
    ("limp", "limping", "moderate"),
    ("letharg", "lethargy", "moderate"),
    ("cough", "coughing", "low"),
    ("sneez", "sneezing", "low"),
    ("itch", "itching", "low"),
    ("scratch", "itching", "low"),
];

/// Keyword-based [`AiService`] for chat turns. Photo and lab analysis need
/// the real service and fail with an `unknown` error.
#[derive(Debug, Clone, Default)]
pub struct OfflineAssessor;

impl OfflineAssessor {
    pub fn new() -> Self {
        Self
    }

    /// Triage one owner message.
    pub fn assess(&self, dog: &DogProfile, message: &str) -> ChatAssessment {
        let text = message.to_lowercase();

        let mut symptoms: Vec<String> = Vec::new();
        let mut urgency = 0;
        for (keyword, symptom, level) in KEYWORDS {
            if !text.contains(keyword) {
                continue;
            }
            if !symptoms.iter().any(|s| s == symptom) {
                symptoms.push(symptom.to_string());
            }
            let rank = URGENCY_ORDER.iter().position(|l| l == level).unwrap_or(0);
            urgency = urgency.max(rank);
        }
        let urgency_level = URGENCY_ORDER[urgency];
        let should_see_vet = urgency >= 2;

        let response = if symptoms.is_empty() {
            format!(
                "I'm offline right now, but nothing in your message about {} sounds alarming. \
                 Contact your veterinarian if anything changes.",
                dog.name
            )
        } else if should_see_vet {
            format!(
                "I'm offline right now. {} may need prompt veterinary attention for {}. \
                 Please contact your veterinarian.",
                dog.name,
                symptoms.join(", ")
            )
        } else {
            format!(
                "I'm offline right now. Keep an eye on {}'s {} and contact your veterinarian \
                 if it persists.",
                dog.name,
                symptoms.join(", ")
            )
        };

        debug!(dog_id = %dog.id, urgency = urgency_level, symptoms = symptoms.len(), "offline triage");

        ChatAssessment {
            response,
            metadata: ChatMetadata {
                urgency_level: Some(urgency_level.to_string()),
                symptoms,
                possible_conditions: Vec::new(),
                recommended_actions: if should_see_vet {
                    vec!["Contact your veterinarian".to_string()]
                } else {
                    Vec::new()
                },
                should_see_vet,
                weight_kg: weight_in_text(&text),
            },
        }
    }
}

/// Find a weight such as "23 kg", "23.5kg" or "weighs 23.5 kilos".
fn weight_in_text(text: &str) -> Option<f64> {
    let tokens: Vec<&str> = text
        .split(|c: char| c.is_whitespace() || c == ',' || c == '!' || c == '?')
        .filter(|t| !t.is_empty())
        .collect();

    for (i, token) in tokens.iter().enumerate() {
        let token = token.trim_end_matches('.');
        if let Some(number) = token.strip_suffix("kg") {
            if let Ok(kg) = number.parse::<f64>() {
                return Some(kg).filter(|kg| *kg > 0.0);
            }
        }
        let unit = tokens.get(i + 1).map(|u| u.trim_end_matches('.'));
        if matches!(unit, Some("kg") | Some("kgs") | Some("kilos") | Some("kilograms")) {
            if let Ok(kg) = token.parse::<f64>() {
                return Some(kg).filter(|kg| *kg > 0.0);
            }
        }
    }
    None
}

fn unsupported(operation: &str) -> AiError {
    AiError::new(
        AiErrorKind::Unknown,
        format!("{} analysis is unavailable offline", operation),
    )
}

#[async_trait]
impl AiService for OfflineAssessor {
    async fn chat(
        &self,
        dog: &DogProfile,
        message: &str,
        _history: &[ChatTurn],
    ) -> Result<ChatAssessment, AiError> {
        Ok(self.assess(dog, message))
    }

    async fn analyze_photo(
        &self,
        _image: &[u8],
        _dog: &DogProfile,
        _body_area: Option<&str>,
        _description: Option<&str>,
    ) -> Result<PhotoAssessment, AiError> {
        Err(unsupported("photo"))
    }

    async fn analyze_lab(
        &self,
        _image: &[u8],
        _dog: &DogProfile,
        _lab_type: LabType,
        _notes: Option<&str>,
    ) -> Result<LabAssessment, AiError> {
        Err(unsupported("lab"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dog() -> DogProfile {
        DogProfile::new("dog-1", "Rex")
    }

    #[test]
    fn test_emergency_keywords() {
        let chat = OfflineAssessor::new().assess(&dog(), "He had a seizure and is vomiting");
        assert_eq!(chat.metadata.urgency_level.as_deref(), Some("emergency"));
        assert_eq!(chat.metadata.symptoms, vec!["seizure", "vomiting"]);
        assert!(chat.metadata.should_see_vet);
    }

    #[test]
    fn test_mild_message() {
        let chat = OfflineAssessor::new().assess(&dog(), "She keeps scratching and itching her ear");
        assert_eq!(chat.metadata.urgency_level.as_deref(), Some("low"));
        assert_eq!(chat.metadata.symptoms, vec!["itching"]);
        assert!(!chat.metadata.should_see_vet);
    }

    #[test]
    fn test_nothing_matched() {
        let chat = OfflineAssessor::new().assess(&dog(), "What treats are healthy?");
        assert!(chat.metadata.symptoms.is_empty());
        assert_eq!(chat.metadata.urgency_level.as_deref(), Some("low"));
        assert!(chat.response.contains("Rex"));
    }

    #[test]
    fn test_weight_in_text() {
        assert_eq!(weight_in_text("he weighs 23.5 kg now"), Some(23.5));
        assert_eq!(weight_in_text("down to 21kg."), Some(21.0));
        assert_eq!(weight_in_text("about 30 kilos"), Some(30.0));
        assert_eq!(weight_in_text("ate 2 treats"), None);
    }

    #[tokio::test]
    async fn test_photo_unavailable() {
        let err = OfflineAssessor::new()
            .analyze_photo(b"", &dog(), None, None)
            .await
            .unwrap_err();
        assert_eq!(err.kind, AiErrorKind::Unknown);
    }
}
