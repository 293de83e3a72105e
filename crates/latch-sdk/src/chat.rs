//! Chat controller: one thread, one transcript, at most one live stream.
//!
//! [`AssistantChat`] ties the pieces together. Each [`send`](AssistantChat::send)
//! begins a [`DecodeSession`] on the shared transcript and spawns a task
//! that opens the run stream and drives it into the session. Sending again
//! while a response is still streaming aborts the old task first and waits
//! for it to unwind, so its placeholder is gone before the new one is
//! appended.

use std::panic;
use std::pin::pin;

use futures::{Stream, StreamExt};
use latch_models::Transcript;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::api::{BabyProfile, RunRequest, ThreadId};
use crate::client::LatchClient;
use crate::error::SdkError;
use crate::handle::TranscriptHandle;
use crate::session::{DecodeSession, SessionSummary};
use crate::sink::TranscriptSink;

type StreamTask = JoinHandle<Result<SessionSummary, SdkError>>;

/// An open conversation with the assistant.
#[derive(Debug)]
pub struct AssistantChat {
    client: LatchClient,
    transcript: TranscriptHandle,
    thread_id: ThreadId,
    profiles: Vec<BabyProfile>,
    active: Option<StreamTask>,
}

impl AssistantChat {
    /// Look up the assistant, create a thread and start a transcript with
    /// the greeting.
    ///
    /// `profiles` is the run context sent with every message. A failed
    /// assistant lookup is only logged; a failed thread creation is an
    /// error.
    pub async fn open(client: LatchClient, profiles: Vec<BabyProfile>) -> Result<Self, SdkError> {
        if let Err(e) = client.get_assistant().await {
            warn!(error = %e, "assistant lookup failed");
        }
        let thread_id = client.create_thread().await?;
        Ok(Self::with_thread(client, thread_id, profiles))
    }

    /// Resume an existing thread without any network call.
    pub fn with_thread(client: LatchClient, thread_id: ThreadId, profiles: Vec<BabyProfile>) -> Self {
        Self {
            client,
            transcript: TranscriptHandle::new(Transcript::with_greeting()),
            thread_id,
            profiles,
            active: None,
        }
    }

    /// Shared transcript; clone it to subscribe or take snapshots.
    pub fn transcript(&self) -> &TranscriptHandle {
        &self.transcript
    }

    /// Thread every run is sent to.
    pub fn thread_id(&self) -> &ThreadId {
        &self.thread_id
    }

    /// Run context sent with each message.
    pub fn profiles(&self) -> &[BabyProfile] {
        &self.profiles
    }

    /// Replace the run context for subsequent messages.
    pub fn set_profiles(&mut self, profiles: Vec<BabyProfile>) {
        self.profiles = profiles;
    }

    /// Returns `true` while a response task is still running.
    pub fn is_streaming(&self) -> bool {
        self.active.as_ref().is_some_and(|task| !task.is_finished())
    }

    /// Send a user message and start streaming the answer.
    ///
    /// Returns `Ok(false)` for blank input, which changes nothing. Any
    /// response still streaming is cancelled first.
    pub async fn send(&mut self, text: &str) -> Result<bool, SdkError> {
        if text.trim().is_empty() {
            return Ok(false);
        }
        self.cancel_active().await;

        let Some(session) = DecodeSession::begin(self.transcript.clone(), text)? else {
            return Ok(false);
        };

        let request = RunRequest::new(&self.client.config().assistant_id, text, self.profiles.clone());
        let client = self.client.clone();
        let thread_id = self.thread_id.clone();
        info!(thread_id = %thread_id, chars = text.chars().count(), "sending message");

        self.active = Some(tokio::spawn(run(client, thread_id, request, session)));
        Ok(true)
    }

    /// Wait for the active response to finish.
    ///
    /// Returns `None` when nothing is streaming or the response was
    /// cancelled. Dropping the returned future leaves the response running.
    pub async fn wait(&mut self) -> Option<Result<SessionSummary, SdkError>> {
        let task = self.active.as_mut()?;
        let joined = task.await;
        self.active = None;

        match joined {
            Ok(outcome) => Some(outcome),
            Err(e) if e.is_panic() => panic::resume_unwind(e.into_panic()),
            Err(_) => None,
        }
    }

    /// Cancel the active response, if any.
    pub async fn close(&mut self) {
        self.cancel_active().await;
    }

    async fn cancel_active(&mut self) {
        let Some(task) = self.active.take() else {
            return;
        };
        task.abort();
        match task.await {
            Ok(Ok(summary)) => debug!(applied = summary.applied, "previous response had already finished"),
            Ok(Err(e)) => debug!(error = %e, "previous response had already failed"),
            Err(e) if e.is_cancelled() => info!("previous response cancelled"),
            Err(e) => warn!(error = %e, "previous response panicked"),
        }
    }
}

impl Drop for AssistantChat {
    fn drop(&mut self) {
        if let Some(task) = &self.active {
            task.abort();
        }
    }
}

async fn run(
    client: LatchClient,
    thread_id: ThreadId,
    request: RunRequest,
    mut session: DecodeSession<TranscriptHandle>,
) -> Result<SessionSummary, SdkError> {
    match client.stream_run(&thread_id, &request).await {
        Ok(body) => drive_stream(session, body).await,
        Err(e) => {
            session.fail(&e);
            Err(e)
        }
    }
}

/// Feed every chunk of `stream` into `session` in order.
///
/// Ends the session when the stream completes and fails it on the first
/// transport error, which is returned.
pub async fn drive_stream<S, St, B>(
    mut session: DecodeSession<S>,
    stream: St,
) -> Result<SessionSummary, SdkError>
where
    S: TranscriptSink,
    St: Stream<Item = Result<B, SdkError>>,
    B: AsRef<[u8]>,
{
    let mut stream = pin!(stream);
    while let Some(chunk) = stream.next().await {
        match chunk {
            Ok(bytes) => {
                session.feed(bytes.as_ref());
            }
            Err(e) => {
                session.fail(&e);
                return Err(e);
            }
        }
    }
    session.end();
    Ok(session.summary())
}
