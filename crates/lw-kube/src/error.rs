//! Error taxonomy for lease API calls

use lw_common::Retryable;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, KubeApiError>;

#[derive(Error, Debug)]
pub enum KubeApiError {
    /// The lease already exists (HTTP 409). Authoritative: the caller
    /// switches to inspecting the existing record instead of retrying.
    #[error("lease already exists")]
    Conflict,

    #[error("lease not found")]
    NotFound,

    #[error("request timed out")]
    Timeout,

    #[error("connection failed: {0}")]
    Connection(String),

    #[error("transport error: {0}")]
    Transport(String),

    #[error("API returned HTTP {status}: {message}")]
    Status { status: u16, message: String },

    #[error("serialization error: {0}")]
    Decode(String),

    #[error("client configuration error: {0}")]
    Config(String),
}

impl KubeApiError {
    pub fn is_conflict(&self) -> bool {
        matches!(self, KubeApiError::Conflict)
    }

    /// Classify a reqwest failure by what went wrong on the wire.
    pub fn from_request(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            KubeApiError::Timeout
        } else if err.is_connect() {
            KubeApiError::Connection(err.to_string())
        } else if err.is_decode() {
            KubeApiError::Decode(err.to_string())
        } else {
            KubeApiError::Transport(err.to_string())
        }
    }

    /// Map a non-success HTTP status to an error variant.
    pub fn from_status(status: reqwest::StatusCode, message: String) -> Self {
        match status {
            reqwest::StatusCode::CONFLICT => KubeApiError::Conflict,
            reqwest::StatusCode::NOT_FOUND => KubeApiError::NotFound,
            status => KubeApiError::Status {
                status: status.as_u16(),
                message,
            },
        }
    }
}

impl Retryable for KubeApiError {
    /// Conflict counts as transient here. Call sites where a 409 is an
    /// answer rather than a hiccup opt out with a no-retry predicate.
    fn is_transient(&self) -> bool {
        matches!(
            self,
            KubeApiError::Conflict
                | KubeApiError::Timeout
                | KubeApiError::Connection(_)
                | KubeApiError::Transport(_)
                | KubeApiError::Status { .. }
        )
    }
}
