//! # Latch SDK
//!
//! Client side of the Latch AI assistant: talks to the backend and turns
//! its streamed answers into a live chat transcript.
//!
//! The SDK provides:
//!
//! * [`DecodeSession`]: the streaming transcript decoder. Feed it raw
//!   body chunks; it maintains the user message, the "Thinking..."
//!   placeholder and the progressively rewritten assistant answer.
//! * [`TranscriptHandle`]: shared transcript with change notifications
//!   for a UI.
//! * [`LatchClient`]: HTTP client for assistant lookup, thread creation,
//!   baby profiles and streaming runs.
//! * [`AssistantChat`]: one conversation with at most one live stream.
//! * [`ClientConfig`]: layered configuration (defaults, file, env).
//! * [`SdkError`]: unified error type for all SDK operations.
//!
//! The lower layers ([`Utf8StreamDecoder`], [`FrameDecoder`],
//! [`extract_content`]) are public for replaying captures and tests.
//!
//! # Quick start
//!
//! ```rust,no_run
//! use latch_sdk::{AssistantChat, ClientConfig, LatchClient};
//!
//! # async fn run() -> Result<(), latch_sdk::SdkError> {
//! let client = LatchClient::new(ClientConfig::load()?)?;
//! let mut chat = AssistantChat::open(client, Vec::new()).await?;
//!
//! let mut changes = chat.transcript().subscribe();
//! chat.send("How much should a 3 month old sleep?").await?;
//! # let _ = changes.try_recv();
//! chat.wait().await;
//!
//! for message in chat.transcript().snapshot().iter() {
//!     println!("{}: {}", message.role, message.content);
//! }
//! # Ok(())
//! # }
//! ```

pub mod api;
pub mod chat;
pub mod client;
pub mod config;
pub mod endpoints;
pub mod error;
pub mod fragment;
pub mod frame;
pub mod handle;
pub mod session;
pub mod sink;
pub mod utf8;

pub use api::{Assistant, BabyProfile, RunRequest, ThreadId};
pub use chat::{drive_stream, AssistantChat};
pub use client::LatchClient;
pub use config::ClientConfig;
pub use endpoints::Endpoints;
pub use error::SdkError;
pub use fragment::{extract_content, FragmentError};
pub use frame::{EventKind, FrameDecoder, FrameState, Payload};
pub use handle::TranscriptHandle;
pub use session::{DecodeSession, SessionState, SessionSummary};
pub use sink::TranscriptSink;
pub use utf8::Utf8StreamDecoder;

// Re-export the transcript model for ergonomic usage.
pub use latch_models::{ChatMessage, ChatRole, Transcript, TranscriptChange};
