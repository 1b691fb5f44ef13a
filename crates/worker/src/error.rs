//! Worker error types (§7 "unchanged … adapted to this domain's error
//! variants"). Wraps the lower-level errors the executor sees once a job
//! moves past pipeline-engine's own fatal/tolerant split.

use thiserror::Error;

use pipeline_engine::PipelineError;
use queue_adapter::QueueError;

pub type WorkerResult<T> = Result<T, WorkerError>;

#[derive(Debug, Error)]
pub enum WorkerError {
    #[error("job failed: {0}")]
    JobFailed(String),

    #[error("configuration error: {0}")]
    ConfigError(String),

    #[error("pipeline error: {0}")]
    Pipeline(#[from] PipelineError),

    #[error("queue error: {0}")]
    Queue(#[from] QueueError),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl WorkerError {
    pub fn job_failed(msg: impl Into<String>) -> Self {
        Self::JobFailed(msg.into())
    }

    pub fn config_error(msg: impl Into<String>) -> Self {
        Self::ConfigError(msg.into())
    }

    /// Stable code attached to the job's terminal `JobError` (§6, §7).
    pub fn code(&self) -> &'static str {
        match self {
            WorkerError::JobFailed(_) => "job_failed",
            WorkerError::ConfigError(_) => "config_error",
            WorkerError::Pipeline(e) => e.code(),
            WorkerError::Queue(_) => "queue_error",
            WorkerError::Io(_) => "io_error",
        }
    }

    /// Whether the queue should redeliver the job (§7). Cancellation and
    /// dependency-unmet failures are never retried — they will reproduce
    /// identically on the next attempt.
    pub fn is_retryable(&self) -> bool {
        match self {
            WorkerError::Pipeline(PipelineError::Cancelled) => false,
            WorkerError::Pipeline(PipelineError::DependencyUnmet { .. }) => false,
            WorkerError::Pipeline(PipelineError::Media(e)) => e.is_retryable(),
            WorkerError::Pipeline(PipelineError::Etc(e)) => e.is_retryable(),
            WorkerError::Pipeline(PipelineError::Storage(e)) => e.is_retryable(),
            WorkerError::Pipeline(PipelineError::Fatal(_)) => false,
            WorkerError::Queue(e) => e.is_retryable(),
            WorkerError::JobFailed(_) | WorkerError::ConfigError(_) | WorkerError::Io(_) => false,
        }
    }

    /// A failure the source video itself makes permanent — retrying
    /// against the same URL will reproduce the same outcome every time.
    /// Mirrors the content-unavailable patterns yt-dlp reports on stderr.
    pub fn is_permanent_failure(&self) -> bool {
        let msg = self.to_string().to_lowercase();

        (msg.contains("age") && (msg.contains("restrict") || msg.contains("verif")))
            || msg.contains("private video")
            || msg.contains("video is private")
            || msg.contains("video unavailable")
            || msg.contains("video is unavailable")
            || msg.contains("video has been removed")
            || msg.contains("copyright") && msg.contains("block")
            || msg.contains("not available in your country")
            || msg.contains("live stream") && msg.contains("not")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cancelled_is_not_retryable() {
        let err = WorkerError::Pipeline(PipelineError::Cancelled);
        assert!(!err.is_retryable());
    }

    #[test]
    fn test_dependency_unmet_is_not_retryable() {
        let err = WorkerError::Pipeline(PipelineError::dependency_unmet("scene_detection", "frame_analysis"));
        assert!(!err.is_retryable());
    }

    #[test]
    fn test_permanent_failure_detects_private_video() {
        let err = WorkerError::job_failed("download failed: this video is private");
        assert!(err.is_permanent_failure());
    }
}
