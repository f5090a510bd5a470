//! Scripted AI service: replays queued responses and records every call.

use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use tracing::debug;

use pawsight_core::{
    AiError, AiErrorKind, AiService, ChatAssessment, ChatTurn, DogProfile, LabAssessment, LabType,
    PhotoAssessment,
};

use crate::parsing::{parse_chat_response, parse_lab_response, parse_photo_response};

/// A call received by [`ScriptedAiService`].
#[derive(Debug, Clone, PartialEq)]
pub enum ScriptedCall {
    Chat {
        dog_id: String,
        message: String,
        history_len: usize,
    },
    Photo {
        dog_id: String,
        image_len: usize,
        body_area: Option<String>,
        description: Option<String>,
    },
    Lab {
        dog_id: String,
        image_len: usize,
        lab_type: LabType,
        notes: Option<String>,
    },
}

#[derive(Default)]
struct Script {
    chat: VecDeque<Result<ChatAssessment, AiError>>,
    photo: VecDeque<Result<PhotoAssessment, AiError>>,
    lab: VecDeque<Result<LabAssessment, AiError>>,
    calls: Vec<ScriptedCall>,
}

/// An [`AiService`] answering from per-operation FIFO queues.
///
/// An empty queue answers with an `unknown` error.
#[derive(Default)]
pub struct ScriptedAiService {
    script: Mutex<Script>,
}

fn exhausted(operation: &str) -> AiError {
    AiError::new(
        AiErrorKind::Unknown,
        format!("no scripted {} response left", operation),
    )
}

impl ScriptedAiService {
    pub fn new() -> Self {
        Self::default()
    }

    // A panicking holder leaves the queues intact, so poisoning is ignored.
    fn script(&self) -> MutexGuard<'_, Script> {
        self.script.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Queue a chat result.
    pub fn push_chat(&self, result: Result<ChatAssessment, AiError>) -> &Self {
        self.script().chat.push_back(result);
        self
    }

    /// Queue a photo result.
    pub fn push_photo(&self, result: Result<PhotoAssessment, AiError>) -> &Self {
        self.script().photo.push_back(result);
        self
    }

    /// Queue a lab result.
    pub fn push_lab(&self, result: Result<LabAssessment, AiError>) -> &Self {
        self.script().lab.push_back(result);
        self
    }

    /// Queue raw model output for a chat turn, parsed like a live response.
    pub fn push_chat_raw(&self, raw: &str) -> &Self {
        self.push_chat(parse_chat_response(raw))
    }

    pub fn push_photo_raw(&self, raw: &str) -> &Self {
        self.push_photo(parse_photo_response(raw))
    }

    pub fn push_lab_raw(&self, raw: &str) -> &Self {
        self.push_lab(parse_lab_response(raw))
    }

    /// Calls received so far, in order.
    pub fn calls(&self) -> Vec<ScriptedCall> {
        self.script().calls.clone()
    }

    /// Number of queued responses not yet consumed.
    pub fn pending(&self) -> usize {
        let script = self.script();
        script.chat.len() + script.photo.len() + script.lab.len()
    }
}

#[async_trait]
impl AiService for ScriptedAiService {
    async fn chat(
        &self,
        dog: &DogProfile,
        message: &str,
        history: &[ChatTurn],
    ) -> Result<ChatAssessment, AiError> {
        let mut script = self.script();
        script.calls.push(ScriptedCall::Chat {
            dog_id: dog.id.clone(),
            message: message.to_string(),
            history_len: history.len(),
        });
        debug!(dog_id = %dog.id, remaining = script.chat.len(), "scripted chat call");
        script.chat.pop_front().unwrap_or_else(|| Err(exhausted("chat")))
    }

    async fn analyze_photo(
        &self,
        image: &[u8],
        dog: &DogProfile,
        body_area: Option<&str>,
        description: Option<&str>,
    ) -> Result<PhotoAssessment, AiError> {
        let mut script = self.script();
        script.calls.push(ScriptedCall::Photo {
            dog_id: dog.id.clone(),
            image_len: image.len(),
            body_area: body_area.map(str::to_string),
            description: description.map(str::to_string),
        });
        debug!(dog_id = %dog.id, remaining = script.photo.len(), "scripted photo call");
        script.photo.pop_front().unwrap_or_else(|| Err(exhausted("photo")))
    }

    async fn analyze_lab(
        &self,
        image: &[u8],
        dog: &DogProfile,
        lab_type: LabType,
        notes: Option<&str>,
    ) -> Result<LabAssessment, AiError> {
        let mut script = self.script();
        script.calls.push(ScriptedCall::Lab {
            dog_id: dog.id.clone(),
            image_len: image.len(),
            lab_type,
            notes: notes.map(str::to_string),
        });
        debug!(dog_id = %dog.id, remaining = script.lab.len(), "scripted lab call");
        script.lab.pop_front().unwrap_or_else(|| Err(exhausted("lab")))
    }
}
