//! Queue adapter configuration (§4.4).

use std::time::Duration;

#[derive(Debug, Clone)]
pub struct QueueConfig {
    pub redis_url: String,
    /// Base name; per-priority streams are `{stream_prefix}:p{priority}`.
    pub stream_prefix: String,
    pub consumer_group: String,
    pub dlq_stream_name: String,
    pub default_attempts: u32,
    pub default_lease: Duration,
    pub max_stalled_count: u32,
    pub stalled_interval: Duration,
    pub remove_on_complete: usize,
    pub remove_on_fail: usize,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            redis_url: "redis://localhost:6379".to_string(),
            stream_prefix: "vidscan:jobs".to_string(),
            consumer_group: "vidscan:workers".to_string(),
            dlq_stream_name: "vidscan:dlq".to_string(),
            default_attempts: 3,
            default_lease: Duration::from_secs(60),
            max_stalled_count: 3,
            stalled_interval: Duration::from_secs(30),
            remove_on_complete: 100,
            remove_on_fail: 500,
        }
    }
}

impl QueueConfig {
    pub fn from_env() -> Self {
        let default = Self::default();
        Self {
            redis_url: std::env::var("REDIS_URL").unwrap_or(default.redis_url),
            stream_prefix: std::env::var("QUEUE_STREAM_PREFIX").unwrap_or(default.stream_prefix),
            consumer_group: std::env::var("QUEUE_CONSUMER_GROUP").unwrap_or(default.consumer_group),
            dlq_stream_name: std::env::var("QUEUE_DLQ_STREAM").unwrap_or(default.dlq_stream_name),
            default_attempts: std::env::var("QUEUE_DEFAULT_ATTEMPTS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(default.default_attempts),
            default_lease: Duration::from_secs(
                std::env::var("QUEUE_DEFAULT_LEASE_SECS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(default.default_lease.as_secs()),
            ),
            max_stalled_count: std::env::var("QUEUE_MAX_STALLED_COUNT")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(default.max_stalled_count),
            stalled_interval: Duration::from_secs(
                std::env::var("QUEUE_STALLED_INTERVAL_SECS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(default.stalled_interval.as_secs()),
            ),
            remove_on_complete: std::env::var("QUEUE_REMOVE_ON_COMPLETE")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(default.remove_on_complete),
            remove_on_fail: std::env::var("QUEUE_REMOVE_ON_FAIL")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(default.remove_on_fail),
        }
    }

    /// Priority 1 (highest) .. 10 (lowest) maps to a dedicated stream so
    /// consumers can enforce strict priority ordering by polling streams
    /// high-to-low (§4.4 "Ordering").
    pub fn stream_for_priority(&self, priority: u8) -> String {
        format!("{}:p{}", self.stream_prefix, priority.clamp(1, 10))
    }

    pub fn all_streams(&self) -> Vec<String> {
        (1..=10u8).map(|p| self.stream_for_priority(p)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stream_for_priority_clamps_out_of_range() {
        let config = QueueConfig::default();
        assert_eq!(config.stream_for_priority(0), config.stream_for_priority(1));
        assert_eq!(config.stream_for_priority(255), config.stream_for_priority(10));
    }

    #[test]
    fn test_all_streams_covers_every_priority_band() {
        let config = QueueConfig::default();
        let streams = config.all_streams();
        assert_eq!(streams.len(), 10);
        assert_eq!(streams[0], format!("{}:p1", config.stream_prefix));
        assert_eq!(streams[9], format!("{}:p10", config.stream_prefix));
    }
}
