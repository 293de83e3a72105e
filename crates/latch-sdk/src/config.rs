//! Client configuration.
//!
//! Values are layered, later layers winning:
//!
//! 1. built-in defaults,
//! 2. `{config_dir}/latch/config.json` if it exists,
//! 3. environment variables,
//! 4. explicit overrides from the caller (CLI flags).
//!
//! | Variable                      | Default                                  |
//! |-------------------------------|------------------------------------------|
//! | `LATCH_BACKEND_URL`           | `https://back-end-wk4i.onrender.com`     |
//! | `LATCH_ASSISTANT_ID`          | `fe096781-5601-53d2-b2f6-0d3403f7e9ca`   |
//! | `LATCH_REQUEST_TIMEOUT_SECS`  | `30`                                     |

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::SdkError;

const APP_DIR: &str = "latch";
const CONFIG_FILE: &str = "config.json";

/// Default assistant backend.
pub const DEFAULT_BACKEND_URL: &str = "https://back-end-wk4i.onrender.com";
/// Default assistant (graph) id.
pub const DEFAULT_ASSISTANT_ID: &str = "fe096781-5601-53d2-b2f6-0d3403f7e9ca";
/// Default timeout for non-streaming requests, in seconds.
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

/// Environment variable overriding [`ClientConfig::backend_url`].
pub const ENV_BACKEND_URL: &str = "LATCH_BACKEND_URL";
/// Environment variable overriding [`ClientConfig::assistant_id`].
pub const ENV_ASSISTANT_ID: &str = "LATCH_ASSISTANT_ID";
/// Environment variable overriding [`ClientConfig::request_timeout_secs`].
pub const ENV_REQUEST_TIMEOUT_SECS: &str = "LATCH_REQUEST_TIMEOUT_SECS";

/// Connection settings for [`LatchClient`](crate::LatchClient).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Base URL of the backend, without a trailing `/`.
    pub backend_url: String,
    /// Assistant the runs are sent to.
    pub assistant_id: String,
    /// Timeout for assistant lookup, thread creation and profile lookup.
    /// Streaming runs are not bounded.
    pub request_timeout_secs: u64,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            backend_url: DEFAULT_BACKEND_URL.to_string(),
            assistant_id: DEFAULT_ASSISTANT_ID.to_string(),
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
        }
    }
}

impl ClientConfig {
    /// Defaults, then the config file, then the process environment.
    pub fn load() -> Result<Self, SdkError> {
        let mut config = match Self::default_path() {
            Some(path) if path.exists() => Self::from_file(&path)?,
            _ => Self::default(),
        };
        config.apply_env();
        config.validate()?;
        Ok(config)
    }

    /// `{config_dir}/latch/config.json`, if the platform has a config dir.
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join(APP_DIR).join(CONFIG_FILE))
    }

    /// Read a JSON config file. Missing keys keep their defaults.
    pub fn from_file(path: &Path) -> Result<Self, SdkError> {
        let content = fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&content)?;
        debug!(path = %path.display(), "loaded client config");
        Ok(config)
    }

    /// Apply the `LATCH_*` environment variables.
    pub fn apply_env(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    /// Apply overrides looked up by environment variable name.
    ///
    /// Unparseable timeouts are ignored with a warning.
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(url) = lookup(ENV_BACKEND_URL) {
            self.backend_url = url;
        }
        if let Some(id) = lookup(ENV_ASSISTANT_ID) {
            self.assistant_id = id;
        }
        if let Some(raw) = lookup(ENV_REQUEST_TIMEOUT_SECS) {
            match raw.trim().parse() {
                Ok(secs) => self.request_timeout_secs = secs,
                Err(e) => warn!(value = %raw, error = %e, "ignoring invalid request timeout"),
            }
        }
    }

    /// Override the backend URL.
    #[must_use]
    pub fn with_backend_url(mut self, url: impl Into<String>) -> Self {
        self.backend_url = url.into();
        self
    }

    /// Override the assistant id.
    #[must_use]
    pub fn with_assistant_id(mut self, id: impl Into<String>) -> Self {
        self.assistant_id = id.into();
        self
    }

    /// Override the request timeout.
    #[must_use]
    pub fn with_request_timeout_secs(mut self, secs: u64) -> Self {
        self.request_timeout_secs = secs;
        self
    }

    /// Normalise and check the values.
    pub fn validate(&mut self) -> Result<(), SdkError> {
        let trimmed = self.backend_url.trim().trim_end_matches('/');
        if trimmed.is_empty() {
            return Err(SdkError::Config("backend URL is empty".into()));
        }
        self.backend_url = trimmed.to_string();

        let id = self.assistant_id.trim();
        if id.is_empty() {
            return Err(SdkError::Config("assistant id is empty".into()));
        }
        self.assistant_id = id.to_string();
        Ok(())
    }

    /// [`request_timeout_secs`](Self::request_timeout_secs) as a duration.
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}
