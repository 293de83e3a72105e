//! Shared transcript with change notifications.
//!
//! [`TranscriptHandle`] is what a UI keeps: it can take snapshots at any
//! time and subscribe to [`TranscriptChange`]s, while the active decode
//! session writes through the [`TranscriptSink`] implementation.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use latch_models::{ChatMessage, ModelError, Transcript, TranscriptChange};
use tokio::sync::broadcast;

use crate::sink::TranscriptSink;

/// Buffered notifications per subscriber before it starts lagging.
const CHANGE_CAPACITY: usize = 256;

/// Cloneable, thread-safe owner of a [`Transcript`].
///
/// Subscribers that fall more than a few hundred changes behind receive
/// [`broadcast::error::RecvError::Lagged`] and should resynchronise from
/// [`snapshot`](Self::snapshot).
#[derive(Debug, Clone)]
pub struct TranscriptHandle {
    inner: Arc<Mutex<Transcript>>,
    changes: broadcast::Sender<TranscriptChange>,
}

impl Default for TranscriptHandle {
    fn default() -> Self {
        Self::new(Transcript::new())
    }
}

impl TranscriptHandle {
    /// Wrap an existing transcript.
    pub fn new(transcript: Transcript) -> Self {
        let (changes, _) = broadcast::channel(CHANGE_CAPACITY);
        Self {
            inner: Arc::new(Mutex::new(transcript)),
            changes,
        }
    }

    /// Receive every change applied from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<TranscriptChange> {
        self.changes.subscribe()
    }

    /// Copy of the current transcript.
    pub fn snapshot(&self) -> Transcript {
        self.lock().clone()
    }

    /// Read the transcript in place without copying it.
    pub fn with<R>(&self, f: impl FnOnce(&Transcript) -> R) -> R {
        f(&self.lock())
    }

    fn lock(&self) -> MutexGuard<'_, Transcript> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn notify(&self, change: TranscriptChange) {
        // No subscribers is not an error.
        let _ = self.changes.send(change);
    }
}

impl TranscriptSink for TranscriptHandle {
    fn append(&mut self, message: ChatMessage) -> Result<TranscriptChange, ModelError> {
        let change = self.lock().append(message)?;
        self.notify(change);
        Ok(change)
    }

    fn replace_last_content(
        &mut self,
        content: &str,
    ) -> Result<Option<TranscriptChange>, ModelError> {
        let change = self.lock().replace_last_content(content)?;
        if let Some(change) = change {
            self.notify(change);
        }
        Ok(change)
    }

    fn remove_thinking(&mut self) -> Option<TranscriptChange> {
        let change = self.lock().remove_thinking();
        if let Some(change) = change {
            self.notify(change);
        }
        change
    }
}
