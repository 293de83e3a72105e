#![deny(missing_docs)]

//! # Latch Models
//!
//! Core data types for the Latch AI assistant chat.
//!
//! ## Transcript layout
//!
//! ```text
//! Transcript
//! ├── ChatMessage { role: User,      content: "Hi" }
//! ├── ChatMessage { role: Assistant, content: "Hello there!" }   ← streaming target
//! ├── ChatMessage { role: User,      content: "Any tips?" }
//! └── ChatMessage { role: Thinking,  content: "Thinking..." }    ← always last
//! ```
//!
//! ## Module layout
//!
//! | Module | Contents |
//! |--------|----------|
//! | [`message`] | `ChatRole`, `ChatMessage` |
//! | [`transcript`] | `Transcript` and the `TranscriptChange` notifications it produces |
//! | [`error`] | `ModelError` |

pub mod error;
pub mod message;
pub mod transcript;

// Re-export all public types at crate root for convenience.
pub use error::*;
pub use message::*;
pub use transcript::*;
