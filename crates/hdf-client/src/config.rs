//! Configuration for the HDF5 service client.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Connection settings for the HDF5 service.
///
/// Passed explicitly to [`crate::HttpHdfClient::new`]; nothing is read from
/// global state after construction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Base URL of the server hosting the `/hdf/...` endpoints.
    pub base_url: String,

    /// Token sent as `Authorization: token <value>`.
    pub token: Option<String>,

    /// Per-request timeout in seconds.
    pub request_timeout_secs: u64,

    /// TCP connect timeout in seconds.
    pub connect_timeout_secs: u64,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8888".to_string(),
            token: None,
            request_timeout_secs: 60,
            connect_timeout_secs: 10,
        }
    }
}

impl ClientConfig {
    /// Create a config for the given base URL with default timeouts.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Self::default()
        }
    }

    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(val) = std::env::var("HDF_BASE_URL") {
            config.base_url = val;
        }

        if let Ok(val) = std::env::var("HDF_TOKEN") {
            if !val.is_empty() {
                config.token = Some(val);
            }
        }

        if let Ok(val) = std::env::var("HDF_REQUEST_TIMEOUT_SECS") {
            if let Ok(secs) = val.parse() {
                config.request_timeout_secs = secs;
            }
        }

        if let Ok(val) = std::env::var("HDF_CONNECT_TIMEOUT_SECS") {
            if let Ok(secs) = val.parse() {
                config.connect_timeout_secs = secs;
            }
        }

        config
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), String> {
        if self.base_url.is_empty() {
            return Err("base_url must not be empty".to_string());
        }

        if !self.base_url.starts_with("http://") && !self.base_url.starts_with("https://") {
            return Err(format!("base_url must be an http(s) URL: {}", self.base_url));
        }

        if self.request_timeout_secs == 0 {
            return Err("request_timeout_secs must be > 0".to_string());
        }

        Ok(())
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }
}
