//! `EtcConfig::from_env()` (§4.1 ambient addition).

use std::time::Duration;

#[derive(Debug, Clone)]
pub struct EtcConfig {
    pub base_url: String,
    pub timeout: Duration,
    pub orchestration_timeout: Duration,
    pub poll_interval: Duration,
    pub max_poll_attempts: u32,
    pub max_consecutive_errors: u32,
    pub max_retries: u32,
}

impl Default for EtcConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8000".to_string(),
            timeout: Duration::from_secs(120),
            orchestration_timeout: Duration::from_secs(300),
            poll_interval: Duration::from_secs(2),
            max_poll_attempts: 60,
            max_consecutive_errors: 5,
            max_retries: 3,
        }
    }
}

impl EtcConfig {
    pub fn from_env() -> Self {
        let default = Self::default();

        Self {
            base_url: std::env::var("MODEL_SERVICE_URL").unwrap_or(default.base_url),
            timeout: Duration::from_secs(
                std::env::var("MODEL_SERVICE_TIMEOUT")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(120),
            ),
            orchestration_timeout: default.orchestration_timeout,
            poll_interval: Duration::from_millis(
                std::env::var("MODEL_SERVICE_POLL_INTERVAL_MS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(2_000),
            ),
            max_poll_attempts: std::env::var("MODEL_SERVICE_MAX_POLL_ATTEMPTS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(60),
            max_consecutive_errors: std::env::var("MODEL_SERVICE_MAX_CONSECUTIVE_ERRORS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(5),
            max_retries: std::env::var("MODEL_SERVICE_MAX_RETRIES")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(3),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_spec() {
        let config = EtcConfig::default();
        assert_eq!(config.poll_interval, Duration::from_secs(2));
        assert_eq!(config.timeout, Duration::from_secs(120));
        assert_eq!(config.max_poll_attempts, 60);
        assert_eq!(config.max_consecutive_errors, 5);
    }
}
