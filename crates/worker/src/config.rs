//! Worker configuration (§6 "CLI / config surface").

use std::time::Duration;

/// Worker configuration.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// Max jobs processed concurrently by this process (`BRIDGE_CONCURRENCY`).
    pub max_concurrent_jobs: usize,
    /// Max frames/audio chunks analysed concurrently within one job (`FRAME_CONCURRENCY`).
    pub frame_concurrency: usize,
    /// Per-job deadline (`JOB_TIMEOUT`, milliseconds on the wire).
    pub job_timeout: Duration,
    /// Graceful shutdown budget before forcing exit.
    pub shutdown_timeout: Duration,
    /// How often the worker sweeps for stalled (crashed-owner) jobs.
    pub claim_interval: Duration,
    /// Minimum idle time before a stalled job can be reclaimed.
    pub claim_min_idle: Duration,
    /// How often an active job's lease is renewed; §9 fixes this at
    /// half the lease duration.
    pub job_heartbeat_interval: Duration,
    /// Lease duration granted to each reservation.
    pub lease_duration: Duration,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        let lease_duration = Duration::from_secs(60);
        Self {
            max_concurrent_jobs: 3,
            frame_concurrency: 4,
            job_timeout: Duration::from_secs(3600),
            shutdown_timeout: Duration::from_secs(30),
            claim_interval: Duration::from_secs(30),
            claim_min_idle: Duration::from_secs(300),
            job_heartbeat_interval: lease_duration / 2,
            lease_duration,
        }
    }
}

impl WorkerConfig {
    /// Build from environment, following the `WORKER_*`/spec env surface.
    pub fn from_env() -> Self {
        let default = Self::default();
        let lease_duration = Duration::from_secs(
            std::env::var("WORKER_LEASE_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(default.lease_duration.as_secs()),
        );

        Self {
            max_concurrent_jobs: std::env::var("BRIDGE_CONCURRENCY")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(default.max_concurrent_jobs),
            frame_concurrency: std::env::var("FRAME_CONCURRENCY")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(default.frame_concurrency),
            job_timeout: Duration::from_millis(
                std::env::var("JOB_TIMEOUT")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(default.job_timeout.as_millis() as u64),
            ),
            shutdown_timeout: Duration::from_secs(
                std::env::var("WORKER_SHUTDOWN_TIMEOUT_SECS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(default.shutdown_timeout.as_secs()),
            ),
            claim_interval: Duration::from_secs(
                std::env::var("WORKER_CLAIM_INTERVAL_SECS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(default.claim_interval.as_secs()),
            ),
            claim_min_idle: Duration::from_secs(
                std::env::var("WORKER_CLAIM_MIN_IDLE_SECS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(default.claim_min_idle.as_secs()),
            ),
            job_heartbeat_interval: lease_duration / 2,
            lease_duration,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_heartbeat_is_half_the_lease() {
        let config = WorkerConfig::default();
        assert_eq!(config.job_heartbeat_interval, config.lease_duration / 2);
    }

    #[test]
    fn test_default_job_timeout_is_one_hour() {
        assert_eq!(WorkerConfig::default().job_timeout, Duration::from_secs(3600));
    }
}
