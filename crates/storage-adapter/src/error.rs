//! Error types for persistence and vector-index operations (§4.3, §7
//! "storage_error").

use thiserror::Error;

pub type StorageResult<T> = Result<T, StorageError>;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("document not found: {0}")]
    NotFound(String),

    #[error("document already exists: {0}")]
    AlreadyExists(String),

    #[error("request failed: {0}")]
    RequestFailed(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("config error: {0}")]
    Config(String),

    #[error("vector index error: {0}")]
    VectorIndex(String),

    #[error("transient error: {0}")]
    Transient(String),
}

impl StorageError {
    pub fn not_found(id: impl Into<String>) -> Self {
        Self::NotFound(id.into())
    }

    pub fn request_failed(msg: impl Into<String>) -> Self {
        Self::RequestFailed(msg.into())
    }

    pub fn config_error(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Transient failures are retried internally by `StorageAdapter`;
    /// everything else surfaces to PE as `storage_error` immediately (§4.3).
    pub fn is_retryable(&self) -> bool {
        matches!(self, StorageError::Transient(_))
    }
}
