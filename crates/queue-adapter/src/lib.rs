//! Redis Streams job queue (§4.4): priority-banded enqueue with delay,
//! lease-based reservation, progress, ack/nack with retry backoff, and
//! stall recovery.

pub mod config;
pub mod error;
pub mod job;
pub mod queue;

pub use config::QueueConfig;
pub use error::{QueueError, QueueResult};
pub use job::{EnqueueOptions, Lease, QueueMetrics, StalledClaims};
pub use queue::JobQueue;
