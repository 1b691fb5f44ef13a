//! Structured job logging (§4.6 "Structured event emission").
//!
//! Every lifecycle event the dispatcher emits carries the same job_id/
//! operation pair and an `event` field, so a log aggregator can group a
//! job's whole lifecycle by `job_id` regardless of which worker processed
//! which attempt.

use tracing::{error, info, warn, Span};

use pipeline_models::JobId;

#[derive(Debug, Clone)]
pub struct JobLogger {
    job_id: String,
    operation: String,
}

impl JobLogger {
    pub fn new(job_id: &JobId, operation: &str) -> Self {
        Self {
            job_id: job_id.to_string(),
            operation: operation.to_string(),
        }
    }

    pub fn job_id(&self) -> &str {
        &self.job_id
    }

    pub fn operation(&self) -> &str {
        &self.operation
    }

    pub fn create_span(&self) -> Span {
        tracing::info_span!("job", job_id = %self.job_id, operation = %self.operation)
    }

    pub fn log_reserved(&self) {
        info!(job_id = %self.job_id, operation = %self.operation, event = "reserved", "job reserved");
    }

    pub fn log_progress(&self, percent: u8) {
        info!(job_id = %self.job_id, operation = %self.operation, event = "progress", percent, "job progress");
    }

    pub fn log_completed(&self, processing_time_ms: i64) {
        info!(
            job_id = %self.job_id,
            operation = %self.operation,
            event = "completed",
            processing_time_ms,
            "job completed"
        );
    }

    pub fn log_failed(&self, error: &str, will_retry: bool) {
        warn!(
            job_id = %self.job_id,
            operation = %self.operation,
            event = "failed",
            will_retry,
            "job failed: {}", error
        );
    }

    pub fn log_stalled(&self) {
        warn!(job_id = %self.job_id, operation = %self.operation, event = "stalled", "job reclaimed from a stalled owner");
    }

    pub fn log_error(&self, message: &str) {
        error!(job_id = %self.job_id, operation = %self.operation, event = "error", "{}", message);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_job_logger_creation() {
        let job_id = JobId::new();
        let logger = JobLogger::new(&job_id, "pipeline");
        assert_eq!(logger.job_id(), job_id.to_string());
        assert_eq!(logger.operation(), "pipeline");
    }
}
