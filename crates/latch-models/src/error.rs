//! Error types for the `latch-models` crate.
//!
//! Every fallible [`Transcript`](crate::Transcript) mutation returns a
//! variant of [`ModelError`].

/// Errors produced when a transcript mutation would break an invariant.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ModelError {
    /// A thinking placeholder is already present in the transcript.
    #[error("a thinking placeholder is already present at index {index}")]
    ThinkingAlreadyPresent {
        /// Position of the existing placeholder.
        index: usize,
    },

    /// A non-placeholder message was appended while a placeholder is pending.
    #[error("cannot append a {role} message while a thinking placeholder is pending")]
    ThinkingNotLast {
        /// Role of the rejected message.
        role: String,
    },

    /// The last message is not an assistant message that can be rewritten.
    #[error("no assistant message to update: {reason}")]
    NoStreamingTarget {
        /// Human-readable explanation.
        reason: String,
    },
}
