//! Canonical backend URLs.
//!
//! Every URL the client calls is built through [`Endpoints`], so the route
//! layout is defined in exactly one place:
//!
//! ```text
//! GET  {backend}/api/langgraph/assistants/{assistant_id}
//! POST {backend}/api/langgraph/threads
//! POST {backend}/api/langgraph/threads/{thread_id}/runs/stream
//! GET  {backend}/api/babies/get-babies/{user_id}
//! ```

/// Route prefix of the assistant API.
const LANGGRAPH: &str = "api/langgraph";

/// URL builder bound to one backend base URL.
///
/// # Examples
///
/// ```
/// use latch_sdk::Endpoints;
///
/// let endpoints = Endpoints::new("http://localhost:8000/");
/// assert_eq!(
///     endpoints.assistant("abc"),
///     "http://localhost:8000/api/langgraph/assistants/abc",
/// );
/// assert_eq!(
///     endpoints.run_stream("t-1"),
///     "http://localhost:8000/api/langgraph/threads/t-1/runs/stream",
/// );
/// assert_eq!(
///     endpoints.baby_profiles("42"),
///     "http://localhost:8000/api/babies/get-babies/42",
/// );
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoints {
    base: String,
}

impl Endpoints {
    /// Bind to a base URL; a trailing `/` is ignored.
    pub fn new(base: &str) -> Self {
        Self {
            base: base.trim_end_matches('/').to_string(),
        }
    }

    /// Base URL without trailing `/`.
    pub fn base(&self) -> &str {
        &self.base
    }

    /// Assistant lookup.
    pub fn assistant(&self, assistant_id: &str) -> String {
        format!("{}/{LANGGRAPH}/assistants/{assistant_id}", self.base)
    }

    /// Thread creation.
    pub fn threads(&self) -> String {
        format!("{}/{LANGGRAPH}/threads", self.base)
    }

    /// Streaming run on a thread.
    pub fn run_stream(&self, thread_id: &str) -> String {
        format!("{}/{LANGGRAPH}/threads/{thread_id}/runs/stream", self.base)
    }

    /// Profiles of every baby registered by a user.
    pub fn baby_profiles(&self, user_id: &str) -> String {
        format!("{}/api/babies/get-babies/{user_id}", self.base)
    }
}
