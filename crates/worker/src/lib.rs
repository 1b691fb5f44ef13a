//! Worker Dispatcher (§4.6): drives the job queue → pipeline engine loop,
//! owns worker-process configuration, structured job logging, and metrics.

pub mod config;
pub mod error;
pub mod executor;
pub mod logging;
pub mod metrics;

pub use config::WorkerConfig;
pub use error::{WorkerError, WorkerResult};
pub use executor::JobExecutor;
pub use logging::JobLogger;
