//! Chat message types.
//!
//! A [`ChatMessage`] is one entry of a chat [`Transcript`](crate::Transcript).
//! Its `role` says who produced it; `thinking` messages are transient
//! placeholders shown while the assistant has not answered yet and are never
//! persisted.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Content of the placeholder shown while waiting for the first fragment.
pub const THINKING_TEXT: &str = "Thinking...";

/// Assistant message shown when a chat is first opened.
pub const GREETING_TEXT: &str = "Hello! How can I assist you today?";

// ---------------------------------------------------------------------------
// ChatRole
// ---------------------------------------------------------------------------

/// Who produced a [`ChatMessage`].
#[derive(
    Serialize,
    Deserialize,
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    strum::Display,
    strum::EnumString,
    strum::EnumIter,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum ChatRole {
    /// Text typed by the user.
    User,
    /// Text produced by the assistant, possibly still streaming.
    Assistant,
    /// Transient "waiting for the assistant" placeholder.
    Thinking,
}

// ---------------------------------------------------------------------------
// ChatMessage
// ---------------------------------------------------------------------------

/// A single entry in a chat transcript.
///
/// `timestamp` is fixed at creation. `content` is the only field that may
/// change afterwards, and only for the assistant message currently being
/// streamed.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ChatMessage {
    /// Unique message identifier (UUID v4).
    pub id: Uuid,
    /// Who produced the message.
    pub role: ChatRole,
    /// Message text.
    pub content: String,
    /// UTC creation time.
    pub timestamp: DateTime<Utc>,
}

impl ChatMessage {
    /// Create a message with a fresh id and the current time.
    pub fn new(role: ChatRole, content: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            role,
            content: content.into(),
            timestamp: Utc::now(),
        }
    }

    /// A message typed by the user.
    pub fn user(content: impl Into<String>) -> Self {
        Self::new(ChatRole::User, content)
    }

    /// A message produced by the assistant.
    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(ChatRole::Assistant, content)
    }

    /// The "Thinking..." placeholder.
    pub fn thinking() -> Self {
        Self::new(ChatRole::Thinking, THINKING_TEXT)
    }

    /// The assistant's opening line.
    pub fn greeting() -> Self {
        Self::assistant(GREETING_TEXT)
    }

    /// Returns `true` for the transient placeholder.
    pub fn is_thinking(&self) -> bool {
        self.role == ChatRole::Thinking
    }
}
