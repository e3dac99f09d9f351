//! Error types for the HDF5 service client.

use hdf_common::HdfErrorPayload;
use thiserror::Error;

/// Errors returned by [`crate::HdfService`] implementations.
#[derive(Error, Debug)]
pub enum ServiceError {
    /// The service reported a domain-level problem with a diagnostic payload.
    #[error("HDF5 service error: {}", .0.message)]
    Hdf(HdfErrorPayload),

    /// The service answered with a non-200 status and no domain payload.
    #[error("Invalid response: {status} {message}")]
    Response {
        status: u16,
        message: String,
        traceback: String,
    },

    /// The request never produced a response.
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// A 200 response whose body could not be decoded.
    #[error("failed to decode service response: {0}")]
    Decode(#[from] serde_json::Error),

    /// The request could not be built.
    #[error("invalid request: {0}")]
    InvalidRequest(String),
}

impl ServiceError {
    /// Classify a non-200 response body.
    pub fn from_response(status: u16, body: String) -> Self {
        if let Some(payload) = HdfErrorPayload::from_body(&body) {
            return Self::Hdf(payload);
        }

        let traceback = serde_json::from_str::<serde_json::Value>(&body)
            .ok()
            .and_then(|v| v.get("traceback").and_then(|t| t.as_str()).map(String::from))
            .unwrap_or_default();

        Self::Response {
            status,
            message: body,
            traceback,
        }
    }

    /// Whether this is one of the two error kinds a viewer is expected to
    /// show to the user and recover from. Everything else is unexpected and
    /// should be propagated.
    pub fn is_reportable(&self) -> bool {
        matches!(self, Self::Hdf(_) | Self::Response { .. })
    }
}

/// Result type for service calls.
pub type Result<T> = std::result::Result<T, ServiceError>;
