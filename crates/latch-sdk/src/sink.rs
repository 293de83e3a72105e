//! The transcript mutations a decode session needs.
//!
//! The decoder never owns the transcript: it is handed something that can
//! append, rewrite the last message and drop the placeholder. A bare
//! [`Transcript`] works for tests and offline replay;
//! [`TranscriptHandle`](crate::TranscriptHandle) adds sharing and change
//! notifications for a live UI.

use latch_models::{ChatMessage, ModelError, Transcript, TranscriptChange};

/// Mutation interface exposed by the UI layer to the decoder.
pub trait TranscriptSink {
    /// Append a message.
    fn append(&mut self, message: ChatMessage) -> Result<TranscriptChange, ModelError>;

    /// Replace the content of the last (assistant) message.
    fn replace_last_content(
        &mut self,
        content: &str,
    ) -> Result<Option<TranscriptChange>, ModelError>;

    /// Remove the thinking placeholder if present.
    fn remove_thinking(&mut self) -> Option<TranscriptChange>;
}

impl TranscriptSink for Transcript {
    fn append(&mut self, message: ChatMessage) -> Result<TranscriptChange, ModelError> {
        Transcript::append(self, message)
    }

    fn replace_last_content(
        &mut self,
        content: &str,
    ) -> Result<Option<TranscriptChange>, ModelError> {
        Transcript::replace_last_content(self, content)
    }

    fn remove_thinking(&mut self) -> Option<TranscriptChange> {
        Transcript::remove_thinking(self)
    }
}

impl<T: TranscriptSink + ?Sized> TranscriptSink for &mut T {
    fn append(&mut self, message: ChatMessage) -> Result<TranscriptChange, ModelError> {
        (**self).append(message)
    }

    fn replace_last_content(
        &mut self,
        content: &str,
    ) -> Result<Option<TranscriptChange>, ModelError> {
        (**self).replace_last_content(content)
    }

    fn remove_thinking(&mut self) -> Option<TranscriptChange> {
        (**self).remove_thinking()
    }
}
