//! Event/data framing of the assistant run stream.
//!
//! The backend streams text shaped like server-sent events:
//!
//! ```text
//! event: messages/metadata
//! data: {"run-1": {"metadata": {}}}
//!
//! event: messages/partial
//! data: [{"content": "Hello", "type": "ai"}]
//!
//! event: messages/partial
//! data: [{"content": "Hello there!", "type": "ai"}]
//! ```
//!
//! [`FrameDecoder`] tokenizes that text incrementally. It is a small state
//! machine over three states:
//!
//! ```text
//!                 event: line             data:
//! AwaitingEvent ─────────────▶ InEventBody ─────▶ AwaitingData
//!       │                        ▲    ▲                │
//!       │ data: (no event yet)   │    └── end of line ─┘ (payload ends)
//!       └────────────────────────┼──────────▶ AwaitingData
//! ```
//!
//! Delimiters are only recognised at the start of a line or at the start of
//! the pending buffer, which is always a token boundary. JSON strings cannot
//! contain raw newlines, so a literal `data:` inside a payload never splits
//! it. Text that belongs to no delimiter (blank lines, `id:` and `retry:`
//! lines, SSE comments) is discarded.
//!
//! A payload ends at the end of its line. An unterminated content payload
//! is released early once it ends in `]` or `}` and parses as a complete
//! JSON value, otherwise it is held until more text arrives or the stream
//! finishes.

use serde::de::IgnoredAny;
use tracing::trace;

/// Literal that starts an event block.
pub const EVENT_DELIMITER: &str = "event:";
/// Literal that starts a data payload.
pub const DATA_DELIMITER: &str = "data:";
/// Marker of metadata-only events.
pub const METADATA_MARKER: &str = "messages/metadata";
/// Marker of content-bearing events.
pub const PARTIAL_MARKER: &str = "messages/partial";

// ---------------------------------------------------------------------------
// EventKind
// ---------------------------------------------------------------------------

/// Classification of an event block by its name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventKind {
    /// `messages/partial`: payloads carry cumulative assistant text.
    Partial,
    /// `messages/metadata`: never reaches the transcript.
    Metadata,
    /// Payloads seen before any `event:` line, or under an empty name.
    Untyped,
    /// Any other named event (`metadata`, `messages/complete`, `end`, ...).
    Other(String),
}

impl EventKind {
    /// Classify an event from the text following `event:`.
    pub fn classify(name: &str) -> Self {
        let name = name.trim();
        if name.contains(METADATA_MARKER) {
            Self::Metadata
        } else if name.contains(PARTIAL_MARKER) {
            Self::Partial
        } else if name.is_empty() {
            Self::Untyped
        } else {
            Self::Other(name.to_string())
        }
    }

    /// Returns `true` if payloads of this event may hold displayable text.
    pub fn carries_content(&self) -> bool {
        matches!(self, Self::Partial | Self::Untyped)
    }

    /// Returns `true` for the backend's `error` event.
    pub fn is_error(&self) -> bool {
        matches!(self, Self::Other(name) if name == "error")
    }
}

// ---------------------------------------------------------------------------
// FrameState / Payload
// ---------------------------------------------------------------------------

/// Tokenizer state between two calls to [`FrameDecoder::push`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FrameState {
    /// No event block has started yet.
    AwaitingEvent,
    /// Inside an event block, between payloads.
    InEventBody(EventKind),
    /// Collecting a payload that has not been terminated yet.
    AwaitingData(EventKind),
}

/// One `data:` payload together with the event it belongs to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Payload {
    /// Event the payload was found in.
    pub event: EventKind,
    /// Raw payload text, trimmed.
    pub data: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Delimiter {
    Event,
    Data,
}

impl Delimiter {
    fn len(self) -> usize {
        match self {
            Self::Event => EVENT_DELIMITER.len(),
            Self::Data => DATA_DELIMITER.len(),
        }
    }
}

// ---------------------------------------------------------------------------
// FrameDecoder
// ---------------------------------------------------------------------------

/// Incremental tokenizer turning stream text into [`Payload`]s.
#[derive(Debug, Clone)]
pub struct FrameDecoder {
    state: FrameState,
    buffer: String,
    /// Bytes of a held payload already known to contain no newline.
    scanned: usize,
}

impl Default for FrameDecoder {
    fn default() -> Self {
        Self {
            state: FrameState::AwaitingEvent,
            buffer: String::new(),
            scanned: 0,
        }
    }
}

impl FrameDecoder {
    /// Create a decoder waiting for the first event.
    pub fn new() -> Self {
        Self::default()
    }

    /// Current tokenizer state.
    pub fn state(&self) -> &FrameState {
        &self.state
    }

    /// Text received but not yet turned into payloads.
    pub fn pending(&self) -> &str {
        &self.buffer
    }

    /// Append decoded text and return every payload it completes.
    pub fn push(&mut self, text: &str) -> Vec<Payload> {
        self.buffer.push_str(text);
        self.drain(false)
    }

    /// Flush everything held back at end of stream and reset the decoder.
    pub fn finish(&mut self) -> Vec<Payload> {
        let payloads = self.drain(true);
        self.buffer.clear();
        self.scanned = 0;
        self.state = FrameState::AwaitingEvent;
        payloads
    }

    fn drain(&mut self, at_end: bool) -> Vec<Payload> {
        let mut out = Vec::new();

        loop {
            match self.state.clone() {
                FrameState::AwaitingEvent | FrameState::InEventBody(_) => {
                    let Some((pos, delimiter)) = find_delimiter(&self.buffer) else {
                        self.discard_noise(at_end);
                        break;
                    };
                    self.skip(pos);

                    match delimiter {
                        Delimiter::Event => {
                            if !self.read_event_header(at_end) {
                                break;
                            }
                        }
                        Delimiter::Data => {
                            let kind = match &self.state {
                                FrameState::InEventBody(kind) => kind.clone(),
                                _ => EventKind::Untyped,
                            };
                            self.buffer.drain(..delimiter.len());
                            self.state = FrameState::AwaitingData(kind);
                        }
                    }
                }
                FrameState::AwaitingData(kind) => {
                    // The newline stays in the buffer and is dropped as noise.
                    if let Some(offset) = self.buffer[self.scanned..].find('\n') {
                        let end = self.scanned + offset;
                        let data: String = self.buffer.drain(..end).collect();
                        self.scanned = 0;
                        push_payload(&mut out, &kind, &data);
                        self.state = FrameState::InEventBody(kind);
                        continue;
                    }
                    self.scanned = self.buffer.len();

                    let release = at_end || (kind.carries_content() && is_complete_json(&self.buffer));
                    if release {
                        let data = std::mem::take(&mut self.buffer);
                        self.scanned = 0;
                        push_payload(&mut out, &kind, &data);
                        self.state = FrameState::InEventBody(kind);
                    }
                    break;
                }
            }
        }

        out
    }

    /// Consume an `event:` line sitting at the start of the buffer.
    ///
    /// Returns `false` when the line is not complete yet.
    fn read_event_header(&mut self, at_end: bool) -> bool {
        let start = Delimiter::Event.len();
        let end = match self.buffer[start..].find('\n') {
            Some(offset) => start + offset,
            None if at_end => self.buffer.len(),
            None => return false,
        };

        let kind = EventKind::classify(&self.buffer[start..end]);
        trace!(?kind, "event header");
        let consumed = (end + 1).min(self.buffer.len());
        self.buffer.drain(..consumed);
        self.state = FrameState::InEventBody(kind);
        true
    }

    /// Drop the first `len` bytes, which hold no delimiter.
    fn skip(&mut self, len: usize) {
        if len == 0 {
            return;
        }
        let noise: String = self.buffer.drain(..len).collect();
        if !noise.trim().is_empty() {
            trace!(noise = %noise.trim(), "discarding text outside any payload");
        }
    }

    /// No delimiter in the buffer: drop it, keeping only a trailing line
    /// that could still grow into a delimiter.
    fn discard_noise(&mut self, at_end: bool) {
        let line_start = self.buffer.rfind('\n').map_or(0, |i| i + 1);
        let tail = &self.buffer[line_start..];
        let keep = !at_end
            && (EVENT_DELIMITER.starts_with(tail) || DATA_DELIMITER.starts_with(tail));

        if keep {
            self.skip(line_start);
        } else {
            self.skip(self.buffer.len());
        }
    }
}

fn push_payload(out: &mut Vec<Payload>, kind: &EventKind, data: &str) {
    let data = data.trim();
    if data.is_empty() {
        return;
    }
    out.push(Payload {
        event: kind.clone(),
        data: data.to_string(),
    });
}

fn is_complete_json(text: &str) -> bool {
    let text = text.trim_end();
    text.ends_with(|c: char| c == ']' || c == '}')
        && serde_json::from_str::<IgnoredAny>(text).is_ok()
}

/// Earliest line-anchored delimiter in `buf`.
fn find_delimiter(buf: &str) -> Option<(usize, Delimiter)> {
    let event = find_at_line_start(buf, EVENT_DELIMITER).map(|p| (p, Delimiter::Event));
    let data = find_at_line_start(buf, DATA_DELIMITER).map(|p| (p, Delimiter::Data));

    match (event, data) {
        (Some(e), Some(d)) => Some(if e.0 < d.0 { e } else { d }),
        (e, d) => e.or(d),
    }
}

fn find_at_line_start(buf: &str, needle: &str) -> Option<usize> {
    let bytes = buf.as_bytes();
    buf.match_indices(needle)
        .map(|(i, _)| i)
        .find(|&i| i == 0 || matches!(bytes[i - 1], b'\n' | b'\r'))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
