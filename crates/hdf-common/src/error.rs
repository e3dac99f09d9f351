//! Error types shared across the HDF5 grid crates.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type alias using CommonError.
pub type CommonResult<T> = Result<T, CommonError>;

/// Errors raised while interpreting service payloads.
#[derive(Debug, Error)]
pub enum CommonError {
    #[error("Expected a {expected} at '{uri}', found a {found}")]
    UnexpectedEntity {
        uri: String,
        expected: &'static str,
        found: &'static str,
    },
}

/// Structured diagnostic sent by the HDF5 service for domain-level failures
/// (bad uri, index out of range for the real shape, ...).
///
/// Wire form: `{"type": "HdfError", "message": ..., "debugVars": {...}, "traceback": ...}`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HdfErrorPayload {
    #[serde(default)]
    pub message: String,
    #[serde(default, rename = "debugVars")]
    pub debug_vars: serde_json::Map<String, serde_json::Value>,
    #[serde(default)]
    pub traceback: String,
}

impl HdfErrorPayload {
    /// Type tags the service uses to mark a body as a domain error.
    pub const TYPE_TAGS: [&'static str; 2] = ["HdfError", "JhdfError"];

    /// Try to read a domain error out of a response body.
    ///
    /// The service appends the HTTP reason on a trailing line, so the first
    /// line is tried when the whole body is not valid JSON.
    pub fn from_body(body: &str) -> Option<Self> {
        let value: serde_json::Value = serde_json::from_str(body)
            .ok()
            .or_else(|| serde_json::from_str(body.lines().next()?).ok())?;

        let tag = value.get("type")?.as_str()?;
        if !Self::TYPE_TAGS.contains(&tag) {
            return None;
        }

        serde_json::from_value(value).ok()
    }
}
