//! Queue error types (§4.4, §7).

use thiserror::Error;

pub type QueueResult<T> = Result<T, QueueError>;

#[derive(Debug, Error)]
pub enum QueueError {
    #[error("connection failed: {0}")]
    ConnectionFailed(String),

    #[error("enqueue failed: {0}")]
    EnqueueFailed(String),

    #[error("reserve failed: {0}")]
    ReserveFailed(String),

    #[error("job not found: {0}")]
    JobNotFound(String),

    #[error("queue is shutting down")]
    ShuttingDown,

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("redis error: {0}")]
    Redis(#[from] redis::RedisError),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

impl QueueError {
    pub fn connection_failed(msg: impl Into<String>) -> Self {
        Self::ConnectionFailed(msg.into())
    }

    pub fn enqueue_failed(msg: impl Into<String>) -> Self {
        Self::EnqueueFailed(msg.into())
    }

    pub fn reserve_failed(msg: impl Into<String>) -> Self {
        Self::ReserveFailed(msg.into())
    }

    /// Connection-level failures are worth retrying; a rejected enqueue or
    /// a not-found lookup is not (§7).
    pub fn is_retryable(&self) -> bool {
        matches!(self, QueueError::ConnectionFailed(_) | QueueError::Redis(_))
    }
}
