//! Enqueue options, the reservation lease and queue-level metrics (§4.4).

use std::time::Duration;

use chrono::{DateTime, Utc};
use pipeline_models::BackoffKind;

/// Options accepted by `Enqueue` (§4.4 contract).
#[derive(Debug, Clone)]
pub struct EnqueueOptions {
    /// 1 (highest) .. 10 (lowest).
    pub priority: u8,
    pub delay: Option<Duration>,
    pub attempts: u32,
    pub backoff: BackoffKind,
    pub backoff_delay: Duration,
    pub timeout: Duration,
    pub remove_on_complete: usize,
    pub remove_on_fail: usize,
}

impl Default for EnqueueOptions {
    fn default() -> Self {
        Self {
            priority: 5,
            delay: None,
            attempts: 3,
            backoff: BackoffKind::Exponential,
            backoff_delay: Duration::from_secs(1),
            timeout: Duration::from_secs(3600),
            remove_on_complete: 100,
            remove_on_fail: 500,
        }
    }
}

/// A worker's claim on a reserved job, renewed periodically while the job
/// is being processed (§4.4 `Reserve`).
#[derive(Debug, Clone)]
pub struct Lease {
    pub message_id: String,
    pub stream: String,
    pub worker_id: String,
    pub acquired_at: DateTime<Utc>,
    pub duration: Duration,
}

impl Lease {
    pub fn expires_at(&self) -> DateTime<Utc> {
        self.acquired_at + chrono::Duration::from_std(self.duration).unwrap_or_default()
    }

    pub fn is_expired(&self) -> bool {
        Utc::now() >= self.expires_at()
    }
}

/// Aggregate counts across all priority streams (§4.4 `Metrics`).
#[derive(Debug, Clone, Default)]
pub struct QueueMetrics {
    pub waiting: u64,
    pub active: u64,
    pub completed: u64,
    pub failed: u64,
    pub delayed: u64,
    pub paused: u64,
}

/// Result of a single stall-recovery sweep: jobs still under
/// `max_stalled_count` are redelivered for another attempt, jobs that hit
/// the cap are terminal and must be reported as `failed(stalled)` rather
/// than redelivered again (§4.4 "Stall recovery", §8 "maxStalledCount →
/// failed(stalled)").
#[derive(Debug, Clone, Default)]
pub struct StalledClaims {
    pub claimed: Vec<(String, pipeline_models::Job)>,
    pub exhausted: Vec<pipeline_models::Job>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lease_not_expired_immediately_after_acquisition() {
        let lease = Lease {
            message_id: "1-0".into(),
            stream: "vidscan:jobs:p5".into(),
            worker_id: "worker-1".into(),
            acquired_at: Utc::now(),
            duration: Duration::from_secs(60),
        };
        assert!(!lease.is_expired());
    }

    #[test]
    fn test_lease_expired_once_duration_elapses() {
        let lease = Lease {
            message_id: "1-0".into(),
            stream: "vidscan:jobs:p5".into(),
            worker_id: "worker-1".into(),
            acquired_at: Utc::now() - chrono::Duration::seconds(120),
            duration: Duration::from_secs(60),
        };
        assert!(lease.is_expired());
    }

    #[test]
    fn test_default_enqueue_options_use_mid_priority_and_three_attempts() {
        let options = EnqueueOptions::default();
        assert_eq!(options.priority, 5);
        assert_eq!(options.attempts, 3);
        assert!(options.delay.is_none());
    }
}
