use serde::{Deserialize, Serialize};
use std::fmt;

use crate::cache::CacheStatsSnapshot;
use crate::emotion::Emotion;
use crate::persona::Personality;

/// Who said a turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Speaker {
    User,
    Assistant,
}

impl Speaker {
    pub fn as_str(&self) -> &'static str {
        match self {
            Speaker::User => "user",
            Speaker::Assistant => "assistant",
        }
    }
}

impl fmt::Display for Speaker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One utterance in a conversation. Immutable once built.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Turn {
    speaker: Speaker,
    text: String,
}

impl Turn {
    pub fn new(speaker: Speaker, text: impl Into<String>) -> Self {
        Self {
            speaker,
            text: text.into(),
        }
    }

    pub fn user(text: impl Into<String>) -> Self {
        Self::new(Speaker::User, text)
    }

    pub fn assistant(text: impl Into<String>) -> Self {
        Self::new(Speaker::Assistant, text)
    }

    pub fn speaker(&self) -> Speaker {
        self.speaker
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    /// Chat-completions style message (`{"role", "content"}`).
    pub fn as_provider_message(&self) -> serde_json::Value {
        serde_json::json!({
            "role": self.speaker.as_str(),
            "content": self.text,
        })
    }
}

/// Body of `POST /api/chat/message`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatRequest {
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub personality: Option<Personality>,
    #[serde(default)]
    pub regenerate: bool,
}

/// Reply to `POST /api/chat/message`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatResponse {
    pub session_id: String,
    pub response: String,
    pub emotion: Emotion,
    pub cached: bool,
    pub tokens: u32,
    pub response_time_ms: u64,
}

/// Current context window of a session, as returned by the context endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContextView {
    pub session_id: String,
    pub turns: Vec<Turn>,
}

/// Reply to `DELETE /api/chat/sessions/{session_id}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClearResponse {
    pub success: bool,
    /// False when the session had no context entry.
    pub cleared: bool,
}

/// Reply to `GET /api/chat/stats`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatsResponse {
    pub provider: String,
    pub context: CacheStatsSnapshot,
    pub responses: CacheStatsSnapshot,
}
