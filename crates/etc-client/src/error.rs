//! Error taxonomy for the external-task client (§4.1, §7).

use thiserror::Error;

pub type EtcResult<T> = Result<T, EtcError>;

#[derive(Debug, Error)]
pub enum EtcError {
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("invalid response: {0}")]
    InvalidResponse(String),

    #[error("task {0} timed out")]
    TaskTimeout(String),

    #[error("task {0} failed: {1}")]
    TaskFailed(String, String),

    #[error("authentication error: {0}")]
    AuthError(String),

    #[error("rate limited: {0}")]
    RateLimited(String),

    #[error("no model candidate available for this task")]
    SelectionUnavailable,

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("polling cancelled")]
    Cancelled,
}

impl EtcError {
    /// Transient-transport signals retried by the HTTP layer (§4.1:
    /// "retried only on transient signals: timeout, temporary, connection
    /// refused, HTTP 429").
    pub fn is_retryable(&self) -> bool {
        match self {
            EtcError::Network(e) => e.is_timeout() || e.is_connect() || e.is_request(),
            EtcError::RateLimited(_) => true,
            _ => false,
        }
    }

    pub fn invalid_response(msg: impl Into<String>) -> Self {
        EtcError::InvalidResponse(msg.into())
    }
}
