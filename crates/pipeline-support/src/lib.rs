//! Shared retry, backoff and correlation-id helpers used across the
//! pipeline crates (external-task client, media toolkit, storage adapter,
//! queue adapter and worker).

mod correlation;
mod retry;

pub use correlation::{correlation_id_or_new, new_correlation_id};
pub use retry::{retry_async, FailureTracker, RetryConfig, RetryResult};
