//! Request and response bodies of the assistant backend.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

// ---------------------------------------------------------------------------
// ThreadId
// ---------------------------------------------------------------------------

/// Conversation thread on the backend; every run of a chat goes to the
/// same thread.
///
/// ```
/// use latch_sdk::ThreadId;
///
/// let id = ThreadId::new("3f1c");
/// assert_eq!(id.to_string(), "3f1c");
/// let id2: ThreadId = "3f1c".into();
/// assert_eq!(id, id2);
/// ```
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Hash)]
pub struct ThreadId(String);

impl ThreadId {
    /// Wrap an id returned by the backend.
    pub fn new(id: &str) -> Self {
        Self(id.to_string())
    }

    /// Fresh random id for thread creation.
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Return the inner string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ThreadId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ThreadId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for ThreadId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

// ---------------------------------------------------------------------------
// Assistant / threads
// ---------------------------------------------------------------------------

/// The parts of an assistant record the client looks at.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Assistant {
    /// Assistant id.
    pub assistant_id: String,
    /// Graph backing the assistant.
    #[serde(default)]
    pub graph_id: Option<String>,
    /// Display name.
    #[serde(default)]
    pub name: Option<String>,
}

/// What the backend does when the requested thread id already exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IfExists {
    /// Fail the request.
    Raise,
    /// Return the existing thread.
    DoNothing,
}

/// Body of `POST /threads`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CreateThreadRequest {
    /// Client-chosen thread id.
    pub thread_id: ThreadId,
    /// Conflict policy.
    pub if_exists: IfExists,
}

impl CreateThreadRequest {
    /// New random thread id, failing on conflict.
    pub fn new() -> Self {
        Self {
            thread_id: ThreadId::generate(),
            if_exists: IfExists::Raise,
        }
    }
}

impl Default for CreateThreadRequest {
    fn default() -> Self {
        Self::new()
    }
}

/// Response of `POST /threads`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ThreadResponse {
    /// Id of the created thread.
    #[serde(default)]
    pub thread_id: Option<ThreadId>,
}

// ---------------------------------------------------------------------------
// Runs
// ---------------------------------------------------------------------------

/// One message of a run's input.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InputMessage {
    /// Always `user` for messages sent by the client.
    pub role: String,
    /// Message text.
    pub content: String,
}

/// Input of a run: the user's message plus the run context.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunInput {
    /// Messages added to the thread by this run.
    pub messages: Vec<InputMessage>,
    /// Profiles of the user's babies, so answers can refer to them.
    pub baby_profiles: Vec<BabyProfile>,
}

/// Body of `POST /threads/{thread_id}/runs/stream`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunRequest {
    /// Assistant handling the run.
    pub assistant_id: String,
    /// Run input.
    pub input: RunInput,
    /// Requested stream modes; the decoder understands `messages`.
    pub stream_mode: Vec<String>,
}

impl RunRequest {
    /// A run sending `text` as a user message with `baby_profiles` as context.
    pub fn new(assistant_id: &str, text: &str, baby_profiles: Vec<BabyProfile>) -> Self {
        Self {
            assistant_id: assistant_id.to_string(),
            input: RunInput {
                messages: vec![InputMessage {
                    role: "user".to_string(),
                    content: text.to_string(),
                }],
                baby_profiles,
            },
            stream_mode: vec!["messages".to_string()],
        }
    }
}

// ---------------------------------------------------------------------------
// BabyProfile
// ---------------------------------------------------------------------------

/// A baby registered by the user, as returned by the babies API and
/// forwarded unchanged as run context.
///
/// Log collections are kept as opaque JSON.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BabyProfile {
    /// Profile id.
    pub id: i64,
    /// Owning user.
    pub user_id: i64,
    /// Name.
    pub name: String,
    /// Age.
    pub age: f64,
    /// Weight.
    pub weight: f64,
    /// Height.
    pub height: f64,
    /// Base64 photo, if any.
    pub image_base: Option<String>,
    /// Birth date as sent by the backend.
    pub birth_date: String,
    /// Gender.
    pub gender: String,
    /// Creation time as sent by the backend.
    pub created_at: String,
    /// Last update time as sent by the backend.
    pub updated_at: String,
    /// Pumping sessions.
    pub pump_sessions: Vec<Value>,
    /// Health log entries.
    pub health_logs: Vec<Value>,
    /// Feeds.
    pub feeds: Vec<Value>,
    /// Sleep log entries.
    pub sleep_logs: Vec<Value>,
    /// Diaper log entries.
    pub tush_logs: Vec<Value>,
}
