//! HTTP client for the assistant backend.
//!
//! [`LatchClient`] covers the four calls the chat needs: assistant lookup,
//! thread creation, baby profile lookup and the streaming run. It knows
//! nothing about framing: [`stream_run`](LatchClient::stream_run) hands back
//! raw body chunks for a [`DecodeSession`](crate::DecodeSession).
//!
//! # Typical usage
//!
//! ```rust,no_run
//! use futures::StreamExt;
//! use latch_sdk::{ClientConfig, LatchClient, RunRequest};
//!
//! # async fn run() -> Result<(), latch_sdk::SdkError> {
//! let client = LatchClient::new(ClientConfig::load()?)?;
//! let thread = client.create_thread().await?;
//! let request = RunRequest::new(&client.config().assistant_id, "Hi", Vec::new());
//!
//! let mut body = Box::pin(client.stream_run(&thread, &request).await?);
//! while let Some(chunk) = body.next().await {
//!     println!("{} bytes", chunk?.as_ref().len());
//! }
//! # Ok(())
//! # }
//! ```

use futures::{Stream, StreamExt};
use reqwest::Response;
use serde::de::DeserializeOwned;
use tracing::{debug, info};

use crate::api::{Assistant, BabyProfile, CreateThreadRequest, RunRequest, ThreadId, ThreadResponse};
use crate::config::ClientConfig;
use crate::endpoints::Endpoints;
use crate::error::SdkError;

/// Client bound to one backend and assistant.
#[derive(Debug, Clone)]
pub struct LatchClient {
    http: reqwest::Client,
    config: ClientConfig,
    endpoints: Endpoints,
}

impl LatchClient {
    /// Build a client; the configuration is validated first.
    pub fn new(mut config: ClientConfig) -> Result<Self, SdkError> {
        config.validate()?;
        let endpoints = Endpoints::new(&config.backend_url);
        Ok(Self {
            http: reqwest::Client::new(),
            config,
            endpoints,
        })
    }

    /// Configuration in use.
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// URL builder for this backend.
    pub fn endpoints(&self) -> &Endpoints {
        &self.endpoints
    }

    // ------------------------------------------------------------------
    // Setup calls
    // ------------------------------------------------------------------

    /// Fetch the configured assistant.
    pub async fn get_assistant(&self) -> Result<Assistant, SdkError> {
        let url = self.endpoints.assistant(&self.config.assistant_id);
        let res = self
            .http
            .get(url)
            .timeout(self.config.request_timeout())
            .send()
            .await?;
        let assistant: Assistant = read_json(res).await?;
        debug!(assistant_id = %assistant.assistant_id, "assistant found");
        Ok(assistant)
    }

    /// Create a fresh conversation thread.
    pub async fn create_thread(&self) -> Result<ThreadId, SdkError> {
        let body = CreateThreadRequest::new();
        let res = self
            .http
            .post(self.endpoints.threads())
            .timeout(self.config.request_timeout())
            .json(&body)
            .send()
            .await?;
        let created: ThreadResponse = read_json(res).await?;
        let thread_id = created.thread_id.ok_or(SdkError::MissingField("thread_id"))?;
        info!(thread_id = %thread_id, "thread created");
        Ok(thread_id)
    }

    /// Profiles of every baby registered by `user_id`.
    pub async fn fetch_baby_profiles(&self, user_id: &str) -> Result<Vec<BabyProfile>, SdkError> {
        let res = self
            .http
            .get(self.endpoints.baby_profiles(user_id))
            .timeout(self.config.request_timeout())
            .send()
            .await?;
        let profiles: Vec<BabyProfile> = read_json(res).await?;
        debug!(user_id, count = profiles.len(), "baby profiles loaded");
        Ok(profiles)
    }

    // ------------------------------------------------------------------
    // Streaming
    // ------------------------------------------------------------------

    /// Start a run and return its response body as a chunk stream.
    ///
    /// A non-success status is reported here, before any chunk. Errors
    /// while reading the body are yielded by the stream.
    pub async fn stream_run(
        &self,
        thread_id: &ThreadId,
        request: &RunRequest,
    ) -> Result<impl Stream<Item = Result<impl AsRef<[u8]>, SdkError>> + Send + 'static, SdkError>
    {
        let res = self
            .http
            .post(self.endpoints.run_stream(thread_id.as_str()))
            .json(request)
            .send()
            .await?;
        let res = check_status(res).await?;
        debug!(thread_id = %thread_id, "run stream opened");

        Ok(res.bytes_stream().map(|chunk| chunk.map_err(SdkError::from)))
    }
}

/// Turn a non-success response into [`SdkError::Status`] with its body.
async fn check_status(res: Response) -> Result<Response, SdkError> {
    let status = res.status();
    if status.is_success() {
        return Ok(res);
    }
    let body = res.text().await.unwrap_or_default();
    Err(SdkError::Status {
        status: status.as_u16(),
        body,
    })
}

async fn read_json<T: DeserializeOwned>(res: Response) -> Result<T, SdkError> {
    let res = check_status(res).await?;
    let bytes = res.bytes().await?;
    Ok(serde_json::from_slice(&bytes)?)
}
