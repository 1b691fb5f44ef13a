//! Client for the remote AI model service: hides the submit/poll async
//! protocol and retry/backoff behind synchronous-looking operations
//! (`SelectModel`, `AnalyzeFrame`, `Transcribe`, `Synthesize`,
//! `Orchestrate`, `Classify`, `ExtractTopics`, `Sentiment`,
//! `GenerateEmbedding`, `StoreMemory`, `TrackUsage`).

pub mod cache;
pub mod client;
pub mod config;
pub mod error;
pub mod types;

pub use cache::ModelSelectionCache;
pub use client::EtcClient;
pub use config::EtcConfig;
pub use error::{EtcError, EtcResult};
