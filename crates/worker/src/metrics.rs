//! Worker metrics (ambient addition; no scrape endpoint is exposed by
//! this binary, only the process-local recorder — a deployment that wants
//! `/metrics` mounts `PrometheusHandle::render()` behind whatever admin
//! surface it already runs).

use metrics_exporter_prometheus::PrometheusBuilder;

pub mod names {
    pub const JOBS_RESERVED_TOTAL: &str = "vidscan_jobs_reserved_total";
    pub const JOBS_COMPLETED_TOTAL: &str = "vidscan_jobs_completed_total";
    pub const JOBS_FAILED_TOTAL: &str = "vidscan_jobs_failed_total";
    pub const JOBS_RETRIED_TOTAL: &str = "vidscan_jobs_retried_total";
    pub const JOBS_STALLED_TOTAL: &str = "vidscan_jobs_stalled_total";
    pub const JOBS_ACTIVE: &str = "vidscan_jobs_active";
    pub const JOB_DURATION_SECONDS: &str = "vidscan_job_duration_seconds";
}

/// Installs the process-wide Prometheus recorder. Call once from `main`.
pub fn init_metrics() {
    if let Err(e) = PrometheusBuilder::new().install_recorder() {
        tracing::warn!("failed to install prometheus recorder: {}", e);
    }
}

pub fn record_reserved() {
    metrics::counter!(names::JOBS_RESERVED_TOTAL).increment(1);
}

pub fn record_completed(duration_secs: f64) {
    metrics::counter!(names::JOBS_COMPLETED_TOTAL).increment(1);
    metrics::histogram!(names::JOB_DURATION_SECONDS).record(duration_secs);
}

pub fn record_failed(will_retry: bool) {
    metrics::counter!(names::JOBS_FAILED_TOTAL).increment(1);
    if will_retry {
        metrics::counter!(names::JOBS_RETRIED_TOTAL).increment(1);
    }
}

pub fn record_stalled_reclaimed(count: usize) {
    metrics::counter!(names::JOBS_STALLED_TOTAL).increment(count as u64);
}

pub fn set_active_jobs(count: usize) {
    metrics::gauge!(names::JOBS_ACTIVE).set(count as f64);
}
