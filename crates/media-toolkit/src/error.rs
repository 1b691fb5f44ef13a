//! Error types for media operations (§7 "Media error").

use std::path::PathBuf;
use thiserror::Error;

pub type MediaResult<T> = Result<T, MediaError>;

#[derive(Debug, Error)]
pub enum MediaError {
    #[error("ffmpeg not found in PATH")]
    FfmpegNotFound,

    #[error("ffprobe not found in PATH")]
    FfprobeNotFound,

    #[error("yt-dlp not found in PATH")]
    YtDlpNotFound,

    #[error("ffmpeg command failed: {message}")]
    FfmpegFailed {
        message: String,
        stderr: Option<String>,
        exit_code: Option<i32>,
    },

    #[error("ffprobe command failed: {message}")]
    FfprobeFailed { message: String, stderr: Option<String> },

    #[error("download failed: {message}")]
    DownloadFailed { message: String },

    #[error("file not found: {0}")]
    FileNotFound(PathBuf),

    #[error("operation cancelled")]
    Cancelled,

    #[error("operation timed out after {0} seconds")]
    Timeout(u64),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json parse error: {0}")]
    JsonParse(#[from] serde_json::Error),

    #[error("invalid video file: {0}")]
    InvalidVideo(String),

    #[error("validation error: {0}")]
    Validation(String),

    #[error("security violation: {0}")]
    SecurityViolation(String),

    #[error("resource limit exceeded: {0}")]
    ResourceLimit(String),

    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),
}

impl MediaError {
    pub fn ffmpeg_failed(message: impl Into<String>, stderr: Option<String>, exit_code: Option<i32>) -> Self {
        Self::FfmpegFailed {
            message: message.into(),
            stderr,
            exit_code,
        }
    }

    pub fn ffprobe_failed(message: impl Into<String>, stderr: Option<String>) -> Self {
        Self::FfprobeFailed {
            message: message.into(),
            stderr,
        }
    }

    pub fn download_failed(message: impl Into<String>) -> Self {
        Self::DownloadFailed { message: message.into() }
    }

    /// Transient transport failures, retried internally by MTK (§7).
    pub fn is_retryable(&self) -> bool {
        matches!(self, MediaError::Network(_) | MediaError::Timeout(_))
    }
}
