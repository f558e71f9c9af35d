//! Failure taxonomy for a single fetch.
//!
//! Every variant ends up as the human-readable `error` string of the slot
//! that issued the request; nothing here escapes the coordinator.

use thiserror::Error;

/// Why a fetch produced no data
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum FetchError {
    /// The request never produced an HTTP response
    #[error("Network error: {0}")]
    Transport(String),

    /// HTTP 429 from the upstream API
    #[error("Too many requests, please wait a moment and try again")]
    RateLimited,

    /// Any other non-2xx status
    #[error("Request failed with status {status}: {message}")]
    Status { status: u16, message: String },

    /// The body was not the `{data, pagination?}` shape the slot expects
    #[error("Unexpected response from server: {0}")]
    MalformedEnvelope(String),
}

impl FetchError {
    pub fn malformed(reason: impl Into<String>) -> Self {
        FetchError::MalformedEnvelope(reason.into())
    }
}

impl From<reqwest::Error> for FetchError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            FetchError::MalformedEnvelope(err.to_string())
        } else {
            FetchError::Transport(err.to_string())
        }
    }
}

impl From<serde_json::Error> for FetchError {
    fn from(err: serde_json::Error) -> Self {
        FetchError::MalformedEnvelope(err.to_string())
    }
}
