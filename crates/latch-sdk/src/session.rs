//! Streaming transcript decoder.
//!
//! A [`DecodeSession`] lives for exactly one assistant response. It turns
//! raw stream chunks into transcript mutations:
//!
//! 1. [`begin`](DecodeSession::begin) appends the user's message and a
//!    "Thinking..." placeholder.
//! 2. [`feed`](DecodeSession::feed) decodes bytes, tokenizes them into
//!    payloads and applies each content fragment. The first fragment
//!    replaces the placeholder with a new assistant message; later ones
//!    rewrite that message, because every fragment carries the full text
//!    so far.
//! 3. [`end`](DecodeSession::end) or [`fail`](DecodeSession::fail) makes
//!    the session terminal and guarantees no placeholder is left behind.
//!
//! Dropping a session that is still streaming has the same cleanup effect
//! as `end`, without flushing held text. This is how a cancelled stream
//! releases the transcript.

use latch_models::ChatMessage;
use tracing::{debug, warn};

use crate::error::SdkError;
use crate::fragment::extract_content;
use crate::frame::{EventKind, FrameDecoder, Payload};
use crate::sink::TranscriptSink;
use crate::utf8::Utf8StreamDecoder;

/// Lifecycle state of a [`DecodeSession`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Accepting chunks.
    Streaming,
    /// The transport finished normally.
    Ended,
    /// The transport failed.
    Failed,
}

impl SessionState {
    /// Returns `true` once no more chunks will be applied.
    pub fn is_terminal(self) -> bool {
        !matches!(self, Self::Streaming)
    }
}

/// Counters describing what a session did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionSummary {
    /// Final (or current) state.
    pub state: SessionState,
    /// Content fragments applied to the transcript.
    pub applied: usize,
    /// Payloads skipped (metadata, other events, malformed fragments).
    pub skipped: usize,
}

/// Decoder state for one streaming response, bound to a transcript.
#[derive(Debug)]
pub struct DecodeSession<S: TranscriptSink> {
    sink: S,
    text: Utf8StreamDecoder,
    frames: FrameDecoder,
    is_first_chunk: bool,
    state: SessionState,
    applied: usize,
    skipped: usize,
}

impl<S: TranscriptSink> DecodeSession<S> {
    /// Start a response to `user_text`.
    ///
    /// Appends the user message and the thinking placeholder. Blank input
    /// is a no-op and returns `Ok(None)` without touching the transcript.
    pub fn begin(mut sink: S, user_text: &str) -> Result<Option<Self>, SdkError> {
        if user_text.trim().is_empty() {
            debug!("ignoring blank message");
            return Ok(None);
        }

        sink.append(ChatMessage::user(user_text))?;
        sink.append(ChatMessage::thinking())?;

        Ok(Some(Self {
            sink,
            text: Utf8StreamDecoder::new(),
            frames: FrameDecoder::new(),
            is_first_chunk: true,
            state: SessionState::Streaming,
            applied: 0,
            skipped: 0,
        }))
    }

    /// Process the next raw chunk; returns the number of fragments applied.
    ///
    /// Malformed fragments are skipped. Chunks arriving after the session
    /// is terminal are ignored.
    pub fn feed(&mut self, chunk: &[u8]) -> usize {
        if self.state.is_terminal() {
            debug!(bytes = chunk.len(), state = ?self.state, "ignoring chunk after end of stream");
            return 0;
        }

        let text = self.text.decode(chunk);
        let payloads = self.frames.push(&text);
        self.apply_all(payloads)
    }

    /// The transport finished: flush held text and drop a dangling
    /// placeholder.
    pub fn end(&mut self) {
        if self.state.is_terminal() {
            return;
        }

        let tail = self.text.finish();
        let mut payloads = self.frames.push(&tail);
        payloads.extend(self.frames.finish());
        self.apply_all(payloads);

        if self.sink.remove_thinking().is_some() {
            debug!("stream ended without any content");
        }
        self.state = SessionState::Ended;
        debug!(applied = self.applied, skipped = self.skipped, "stream ended");
    }

    /// The transport failed: drop the placeholder and stop.
    pub fn fail(&mut self, error: &SdkError) {
        if self.state.is_terminal() {
            return;
        }

        self.sink.remove_thinking();
        self.state = SessionState::Failed;
        warn!(error = %error, applied = self.applied, "stream failed");
    }

    /// Current lifecycle state.
    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Returns `true` until the first fragment has been applied.
    pub fn is_first_chunk(&self) -> bool {
        self.is_first_chunk
    }

    /// What the session has done so far.
    pub fn summary(&self) -> SessionSummary {
        SessionSummary {
            state: self.state,
            applied: self.applied,
            skipped: self.skipped,
        }
    }

    /// The transcript this session writes to.
    pub fn sink(&self) -> &S {
        &self.sink
    }

    fn apply_all(&mut self, payloads: Vec<Payload>) -> usize {
        let mut applied = 0;
        for payload in &payloads {
            if self.apply(payload) {
                applied += 1;
            } else {
                self.skipped += 1;
            }
        }
        self.applied += applied;
        applied
    }

    fn apply(&mut self, payload: &Payload) -> bool {
        match &payload.event {
            EventKind::Metadata => {
                debug!("skipping metadata event");
                return false;
            }
            kind if kind.is_error() => {
                warn!(data = %payload.data, "backend reported an error event");
                return false;
            }
            EventKind::Other(name) => {
                debug!(event = %name, "skipping non-content event");
                return false;
            }
            EventKind::Partial | EventKind::Untyped => {}
        }

        let content = match extract_content(&payload.data) {
            Ok(content) => content,
            Err(e) => {
                warn!(error = %e, "skipping fragment");
                return false;
            }
        };

        if self.is_first_chunk {
            self.sink.remove_thinking();
            if let Err(e) = self.sink.append(ChatMessage::assistant(content)) {
                warn!(error = %e, "could not start assistant message");
                return false;
            }
            self.is_first_chunk = false;
        } else if let Err(e) = self.sink.replace_last_content(&content) {
            warn!(error = %e, "could not update assistant message");
            return false;
        }

        true
    }
}

impl<S: TranscriptSink> Drop for DecodeSession<S> {
    fn drop(&mut self) {
        if self.state.is_terminal() {
            return;
        }
        if self.sink.remove_thinking().is_some() {
            debug!("session dropped while waiting for the first fragment");
        }
        self.state = SessionState::Ended;
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use latch_models::{ChatRole, Transcript};

    use super::*;

    fn partial(content: &str) -> String {
        format!(
            "event: messages/partial\ndata: [{{\"content\":{},\"type\":\"AIMessageChunk\"}}]\n\n",
            serde_json::to_string(content).unwrap()
        )
    }

    fn roles(t: &Transcript) -> Vec<ChatRole> {
        t.iter().map(|m| m.role).collect()
    }

    /// Feed `chunks` into a fresh session and return the final transcript.
    fn run(chunks: &[&[u8]]) -> Transcript {
        let mut transcript = Transcript::new();
        let mut session = DecodeSession::begin(&mut transcript, "Hi").unwrap().unwrap();
        for chunk in chunks {
            session.feed(chunk);
        }
        session.end();
        drop(session);
        transcript
    }

    #[test]
    fn begin_appends_user_and_placeholder() {
        let mut transcript = Transcript::new();
        let session = DecodeSession::begin(&mut transcript, "Hi").unwrap().unwrap();
        assert!(session.is_first_chunk());
        let t = session.sink();
        assert_eq!(roles(t), vec![ChatRole::User, ChatRole::Thinking]);
        assert_eq!(t.get(0).unwrap().content, "Hi");
        assert_eq!(t.get(1).unwrap().content, "Thinking...");
    }

    #[test]
    fn blank_input_is_a_no_op() {
        let mut transcript = Transcript::new();
        assert!(DecodeSession::begin(&mut transcript, "   \n").unwrap().is_none());
        assert!(transcript.is_empty());
    }

    #[test]
    fn concrete_scenario() {
        let mut transcript = Transcript::new();
        let mut session = DecodeSession::begin(&mut transcript, "Hi").unwrap().unwrap();

        assert_eq!(session.feed(b"event:messages/partial\ndata:[{\"content\":\"Hello\"}]"), 1);
        {
            let t = session.sink();
            assert_eq!(roles(t), vec![ChatRole::User, ChatRole::Assistant]);
            assert_eq!(t.last().unwrap().content, "Hello");
        }
        let id = session.sink().last().unwrap().id;

        assert_eq!(session.feed(b"data:[{\"content\":\"Hello there!\"}]"), 1);
        assert_eq!(session.sink().last().unwrap().content, "Hello there!");
        assert_eq!(session.sink().last().unwrap().id, id);

        session.end();
        assert_eq!(session.state(), SessionState::Ended);
        drop(session);
        assert_eq!(transcript.len(), 2);
        assert_eq!(transcript.last().unwrap().content, "Hello there!");
    }

    #[test]
    fn single_fragment_replaces_placeholder() {
        let t = run(&[partial("Hello").as_bytes()]);
        assert_eq!(roles(&t), vec![ChatRole::User, ChatRole::Assistant]);
        assert_eq!(t.last().unwrap().content, "Hello");
    }

    #[test]
    fn progressive_fragments_coalesce() {
        let updates = ["Sleep", "Sleep is", "Sleep is important", "Sleep is important!"];
        let stream: String = updates.iter().map(|u| partial(u)).collect();
        let t = run(&[stream.as_bytes()]);

        let assistants: Vec<_> = t.iter().filter(|m| m.role == ChatRole::Assistant).collect();
        assert_eq!(assistants.len(), 1);
        assert_eq!(assistants[0].content, "Sleep is important!");
    }

    #[test]
    fn metadata_only_chunk_changes_nothing() {
        let mut transcript = Transcript::new();
        let mut session = DecodeSession::begin(&mut transcript, "Hi").unwrap().unwrap();
        let before = (**session.sink()).clone();

        let applied = session.feed(
            b"event: messages/metadata\ndata: {\"run-1\":{\"metadata\":{\"langgraph_step\":1}}}\n\n",
        );
        assert_eq!(applied, 0);
        assert_eq!(**session.sink(), before);
        assert!(session.is_first_chunk());
    }

    #[test]
    fn metadata_between_fragments_does_not_reset_first_chunk() {
        let meta = "event: messages/metadata\ndata: {\"m\":1}\n\n";
        let stream = format!("{meta}{}{meta}{meta}{}", partial("a"), partial("ab"));
        let t = run(&[stream.as_bytes()]);
        assert_eq!(roles(&t), vec![ChatRole::User, ChatRole::Assistant]);
        assert_eq!(t.last().unwrap().content, "ab");
    }

    #[test]
    fn every_two_way_split_gives_the_same_transcript() {
        let stream = format!(
            "event: metadata\ndata: {{\"run_id\":\"r\"}}\n\nevent: messages/metadata\ndata: {{}}\n\n{}: heartbeat\n\nretry: 1000\n\n{}",
            partial("Bébé dort 🍼").replace("]\n\n", "]\nid: 1\n\n"),
            partial("Bébé dort 🍼 bien")
        );
        let bytes = stream.as_bytes();
        let whole = run(&[bytes]);

        for cut in 0..=bytes.len() {
            let split = run(&[&bytes[..cut], &bytes[cut..]]);
            assert_eq!(roles(&split), roles(&whole), "split at {cut}");
            assert_eq!(
                split.last().unwrap().content,
                whole.last().unwrap().content,
                "split at {cut}"
            );
        }
        assert_eq!(whole.last().unwrap().content, "Bébé dort 🍼 bien");
    }

    #[test]
    fn id_and_comment_lines_do_not_swallow_the_answer() {
        let with_id = "event: messages/partial\ndata: [{\"content\":\"Hello\"}]\nid: 1\n\n";
        let with_heartbeat =
            "event: messages/partial\ndata: [{\"content\":\"Hello\"}]\n\n: heartbeat\n\nevent: end\n\n";

        for stream in [with_id, with_heartbeat] {
            let cut = stream.find(']').unwrap() + 1;
            let bytes = stream.as_bytes();
            for t in [run(&[bytes]), run(&[&bytes[..cut], &bytes[cut..]])] {
                assert_eq!(roles(&t), vec![ChatRole::User, ChatRole::Assistant]);
                assert_eq!(t.last().unwrap().content, "Hello");
            }
        }
    }

    #[test]
    fn byte_by_byte_feeding() {
        let stream = format!("{}{}", partial("one"), partial("one two"));
        let chunks: Vec<&[u8]> = stream.as_bytes().chunks(1).collect();
        let t = run(&chunks);
        assert_eq!(t.len(), 2);
        assert_eq!(t.last().unwrap().content, "one two");
    }

    #[test]
    fn end_without_content_removes_placeholder() {
        let t = run(&[]);
        assert_eq!(roles(&t), vec![ChatRole::User]);
        assert_eq!(t.last().unwrap().content, "Hi");
    }

    #[test]
    fn malformed_fragment_is_skipped() {
        let stream = format!(
            "event: messages/partial\ndata: [{{\"content\": oops}}]\n\n{}",
            partial("fine")
        );
        let mut transcript = Transcript::new();
        let mut session = DecodeSession::begin(&mut transcript, "Hi").unwrap().unwrap();
        assert_eq!(session.feed(stream.as_bytes()), 1);
        session.end();
        assert_eq!(session.summary().skipped, 1);
        drop(session);
        assert_eq!(transcript.last().unwrap().content, "fine");
    }

    #[test]
    fn other_events_are_ignored() {
        let stream = "event: messages/complete\ndata: [{\"content\":\"final\"}]\n\n\
                      event: error\ndata: {\"error\":\"boom\"}\n\n\
                      event: end\n\n";
        let t = run(&[stream.as_bytes()]);
        assert_eq!(roles(&t), vec![ChatRole::User]);
    }

    #[test]
    fn feed_after_end_is_a_no_op() {
        let mut transcript = Transcript::new();
        let mut session = DecodeSession::begin(&mut transcript, "Hi").unwrap().unwrap();
        session.feed(partial("done").as_bytes());
        session.end();
        assert_eq!(session.feed(partial("late").as_bytes()), 0);
        drop(session);
        assert_eq!(transcript.last().unwrap().content, "done");
    }

    #[test]
    fn held_unparseable_tail_is_skipped_at_end() {
        let mut transcript = Transcript::new();
        let mut session = DecodeSession::begin(&mut transcript, "Hi").unwrap().unwrap();
        session.feed(b"event: messages/partial\ndata: [{\"content\":\"trunc");
        session.end();
        let summary = session.summary();
        assert_eq!(summary.applied, 0);
        assert_eq!(summary.skipped, 1);
        drop(session);
        assert_eq!(roles(&transcript), vec![ChatRole::User]);
    }

    #[test]
    fn fail_removes_placeholder() {
        let mut transcript = Transcript::new();
        let mut session = DecodeSession::begin(&mut transcript, "Hi").unwrap().unwrap();
        session.fail(&SdkError::Status {
            status: 500,
            body: String::new(),
        });
        assert_eq!(session.state(), SessionState::Failed);
        assert_eq!(session.feed(partial("late").as_bytes()), 0);
        drop(session);
        assert_eq!(roles(&transcript), vec![ChatRole::User]);
    }

    #[test]
    fn fail_after_content_keeps_partial_answer() {
        let mut transcript = Transcript::new();
        let mut session = DecodeSession::begin(&mut transcript, "Hi").unwrap().unwrap();
        session.feed(partial("Half an ans").as_bytes());
        session.fail(&SdkError::MissingField("body"));
        drop(session);
        assert_eq!(roles(&transcript), vec![ChatRole::User, ChatRole::Assistant]);
        assert_eq!(transcript.last().unwrap().content, "Half an ans");
    }

    #[test]
    fn dropping_a_live_session_cleans_up() {
        let mut transcript = Transcript::with_greeting();
        let session = DecodeSession::begin(&mut transcript, "Hi").unwrap().unwrap();
        drop(session);
        assert!(!transcript.has_thinking());
        assert_eq!(transcript.len(), 2);
    }

    #[test]
    fn begin_rejects_pending_placeholder() {
        let mut transcript = Transcript::new();
        transcript.append(ChatMessage::thinking()).unwrap();
        let err = DecodeSession::begin(&mut transcript, "Hi").unwrap_err();
        assert!(matches!(err, SdkError::Model(_)));
    }
}
