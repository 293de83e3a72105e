//! Ordered chat transcript.
//!
//! A [`Transcript`] is the list of messages the UI renders, oldest first.
//! It enforces two invariants:
//!
//! - at most one `thinking` placeholder exists, and while present it is the
//!   most recently appended message;
//! - only the last message can be rewritten, and only when it is an
//!   assistant message (the streaming target).
//!
//! Every successful mutation returns a [`TranscriptChange`] describing what
//! happened so the owner can notify subscribers.

use serde::{Deserialize, Serialize};

use crate::error::ModelError;
use crate::message::{ChatMessage, ChatRole};

// ---------------------------------------------------------------------------
// TranscriptChange
// ---------------------------------------------------------------------------

/// A single mutation applied to a [`Transcript`].
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TranscriptChange {
    /// A message was appended at `index`.
    Appended {
        /// Position of the new message.
        index: usize,
    },
    /// The content of the message at `index` was replaced.
    Updated {
        /// Position of the rewritten message.
        index: usize,
    },
    /// The message previously at `index` was removed.
    Removed {
        /// Former position of the removed message.
        index: usize,
    },
}

// ---------------------------------------------------------------------------
// Transcript
// ---------------------------------------------------------------------------

/// Ordered sequence of chat messages; insertion order is display order.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct Transcript {
    messages: Vec<ChatMessage>,
}

impl Transcript {
    /// Create an empty transcript.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a transcript holding the assistant's opening line.
    pub fn with_greeting() -> Self {
        Self {
            messages: vec![ChatMessage::greeting()],
        }
    }

    /// Append a message.
    ///
    /// Rejects a second placeholder, and any regular message while a
    /// placeholder is pending.
    pub fn append(&mut self, message: ChatMessage) -> Result<TranscriptChange, ModelError> {
        if let Some(index) = self.thinking_index() {
            if message.is_thinking() {
                return Err(ModelError::ThinkingAlreadyPresent { index });
            }
            return Err(ModelError::ThinkingNotLast {
                role: message.role.to_string(),
            });
        }

        self.messages.push(message);
        Ok(TranscriptChange::Appended {
            index: self.messages.len() - 1,
        })
    }

    /// Replace the content of the last message, which must be an assistant
    /// message.
    ///
    /// Returns `Ok(None)` when the content is already identical.
    pub fn replace_last_content(
        &mut self,
        content: &str,
    ) -> Result<Option<TranscriptChange>, ModelError> {
        let index = self
            .messages
            .len()
            .checked_sub(1)
            .ok_or_else(|| ModelError::NoStreamingTarget {
                reason: "transcript is empty".into(),
            })?;

        let last = &mut self.messages[index];
        if last.role != ChatRole::Assistant {
            return Err(ModelError::NoStreamingTarget {
                reason: format!("last message is a {} message", last.role),
            });
        }

        if last.content == content {
            return Ok(None);
        }
        content.clone_into(&mut last.content);
        Ok(Some(TranscriptChange::Updated { index }))
    }

    /// Remove the thinking placeholder if one is present.
    pub fn remove_thinking(&mut self) -> Option<TranscriptChange> {
        let index = self.thinking_index()?;
        self.messages.remove(index);
        Some(TranscriptChange::Removed { index })
    }

    /// Position of the thinking placeholder, if any.
    pub fn thinking_index(&self) -> Option<usize> {
        self.messages.iter().position(ChatMessage::is_thinking)
    }

    /// Returns `true` while a placeholder is pending.
    pub fn has_thinking(&self) -> bool {
        self.thinking_index().is_some()
    }

    /// All messages, oldest first.
    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    /// The most recent message.
    pub fn last(&self) -> Option<&ChatMessage> {
        self.messages.last()
    }

    /// Message at `index`.
    pub fn get(&self, index: usize) -> Option<&ChatMessage> {
        self.messages.get(index)
    }

    /// Number of messages.
    pub fn len(&self) -> usize {
        self.messages.len()
    }

    /// Returns `true` if there are no messages.
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Iterate over messages, oldest first.
    pub fn iter(&self) -> std::slice::Iter<'_, ChatMessage> {
        self.messages.iter()
    }
}

impl<'a> IntoIterator for &'a Transcript {
    type Item = &'a ChatMessage;
    type IntoIter = std::slice::Iter<'a, ChatMessage>;

    fn into_iter(self) -> Self::IntoIter {
        self.messages.iter()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
