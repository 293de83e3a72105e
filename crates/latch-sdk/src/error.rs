//! SDK error types.
//!
//! [`SdkError`] is the single error type returned by every fallible
//! operation in the SDK. It wraps transport, serialization, configuration
//! and transcript errors into a unified enum.
//!
//! Per-fragment failures inside a stream are *not* `SdkError`s: they are
//! [`FragmentError`](crate::fragment::FragmentError)s, recovered locally by
//! the decoder.

use latch_models::ModelError;

/// Error type for all SDK operations.
#[derive(Debug, thiserror::Error)]
pub enum SdkError {
    /// Invalid or missing configuration (e.g. bad URL, empty assistant id).
    #[error("configuration error: {0}")]
    Config(String),

    /// HTTP transport failure (connection refused, reset, body read error).
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The backend answered with a non-success status before streaming.
    #[error("backend returned {status}: {body}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// Response body, possibly empty.
        body: String,
    },

    /// A response was missing a field the client relies on.
    #[error("missing `{0}` in backend response")]
    MissingField(&'static str),

    /// JSON serialization / deserialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// A transcript mutation broke an invariant.
    #[error("transcript error: {0}")]
    Model(#[from] ModelError),

    /// Generic I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl SdkError {
    /// Returns `true` for failures of the transport itself, as opposed to
    /// local misconfiguration.
    pub fn is_transport(&self) -> bool {
        matches!(self, Self::Http(_) | Self::Status { .. } | Self::Io(_))
    }
}
