//! Plain-text rendering of a streaming transcript.
//!
//! Assistant content arrives cumulatively, so the printer remembers what it
//! already wrote for the current answer and only prints the new suffix. If
//! the backend rewrites earlier text, the answer is printed again on a new
//! line.

use std::io::{self, Write};

use latch_models::{ChatMessage, ChatRole, Transcript, TranscriptChange};
use uuid::Uuid;

const ASSISTANT_PROMPT: &str = "assistant> ";

/// Writes assistant answers to a terminal as they stream.
pub struct StreamPrinter<W: Write> {
    out: W,
    current: Option<Uuid>,
    printed: String,
}

impl<W: Write> StreamPrinter<W> {
    /// Create a printer writing to `out`, with no answer in progress.
    pub fn new(out: W) -> Self {
        Self {
            out,
            current: None,
            printed: String::new(),
        }
    }

    /// Print a finished message (the greeting, replayed history).
    pub fn print_message(&mut self, message: &ChatMessage) -> io::Result<()> {
        match message.role {
            ChatRole::Assistant => writeln!(self.out, "{ASSISTANT_PROMPT}{}", message.content)?,
            ChatRole::User => writeln!(self.out, "you> {}", message.content)?,
            ChatRole::Thinking => {}
        }
        self.out.flush()
    }

    /// React to one change, reading the message it refers to from
    /// `transcript`.
    pub fn apply(&mut self, change: TranscriptChange, transcript: &Transcript) -> io::Result<()> {
        match change {
            TranscriptChange::Appended { index } | TranscriptChange::Updated { index } => {
                match transcript.get(index) {
                    Some(message) if message.role == ChatRole::Assistant => self.show(message),
                    _ => Ok(()),
                }
            }
            TranscriptChange::Removed { .. } => Ok(()),
        }
    }

    /// Resynchronise from the last message after missed changes.
    pub fn catch_up(&mut self, transcript: &Transcript) -> io::Result<()> {
        match transcript.last() {
            Some(message) if message.role == ChatRole::Assistant => self.show(message),
            _ => Ok(()),
        }
    }

    /// End the current answer.
    pub fn finish(&mut self) -> io::Result<()> {
        if self.current.take().is_some() {
            writeln!(self.out)?;
        }
        self.printed.clear();
        self.out.flush()
    }

    fn show(&mut self, message: &ChatMessage) -> io::Result<()> {
        if self.current == Some(message.id) {
            if let Some(suffix) = message.content.strip_prefix(self.printed.as_str()) {
                write!(self.out, "{suffix}")?;
            } else {
                write!(self.out, "\n{ASSISTANT_PROMPT}{}", message.content)?;
            }
        } else {
            if self.current.is_some() {
                writeln!(self.out)?;
            }
            write!(self.out, "{ASSISTANT_PROMPT}{}", message.content)?;
            self.current = Some(message.id);
        }
        message.content.clone_into(&mut self.printed);
        self.out.flush()
    }

    #[cfg(test)]
    fn into_inner(self) -> W {
        self.out
    }
}
