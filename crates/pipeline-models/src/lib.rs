//! Shared entity types for the video analysis pipeline: jobs, video
//! metadata, frames, scenes, audio analysis, classification, usage
//! records and the final processing result.
//!
//! All types derive `Serialize`/`Deserialize` for queue transport and
//! storage round-tripping, and `JsonSchema` for documenting the wire
//! contracts consumed by the submitter front-end.

pub mod audio;
pub mod classification;
pub mod frame;
pub mod ids;
pub mod job;
pub mod rect;
pub mod result;
pub mod scene;
pub mod usage;
pub mod video;

pub use audio::{AudioAnalysis, SpeakerSegment};
pub use classification::Classification;
pub use frame::{DetectedObject, Frame, TextBox};
pub use ids::{FrameId, JobId, SceneId};
pub use job::{
    BackoffKind, FrameSamplingMode, Job, JobError, JobOptions, JobSource, JobStatus,
    QualityPreference,
};
pub use rect::NormalizedRect;
pub use result::{ProcessingResult, ResultCounts};
pub use scene::Scene;
pub use usage::ModelUsageRecord;
pub use video::{VideoMetadata, VideoQuality};
