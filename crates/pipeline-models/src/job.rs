//! Job and job-options types.

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::ids::JobId;

/// Where the source video comes from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum JobSource {
    Url,
    Buffer,
    Youtube,
    Drive,
}

/// Frame sampling strategy for the frame-extraction stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "kebab-case")]
pub enum FrameSamplingMode {
    Keyframes,
    Uniform,
    SceneBased,
}

impl Default for FrameSamplingMode {
    fn default() -> Self {
        FrameSamplingMode::Uniform
    }
}

/// Quality/speed tradeoff preference, fed into the complexity function.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum QualityPreference {
    Speed,
    Balanced,
    Accuracy,
}

impl Default for QualityPreference {
    fn default() -> Self {
        QualityPreference::Balanced
    }
}

/// Analysis options recognised on the submitter's enqueue contract (§6).
/// Unknown keys are ignored by `serde`'s default deserialize behaviour;
/// missing keys default per field below.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct JobOptions {
    pub extract_metadata: bool,
    pub extract_frames: bool,
    pub extract_audio: bool,
    pub transcribe_audio: bool,
    pub detect_scenes: bool,
    pub detect_objects: bool,
    pub extract_text: bool,
    pub classify_content: bool,
    pub generate_summary: bool,
    pub frame_sampling_mode: FrameSamplingMode,
    pub frame_sample_rate: u32,
    pub max_frames: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub frame_interval: Option<f64>,
    pub quality_preference: QualityPreference,
    pub target_languages: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub custom_analysis: Option<String>,
}

impl Default for JobOptions {
    fn default() -> Self {
        Self {
            extract_metadata: true,
            extract_frames: false,
            extract_audio: false,
            transcribe_audio: false,
            detect_scenes: false,
            detect_objects: false,
            extract_text: false,
            classify_content: false,
            generate_summary: false,
            frame_sampling_mode: FrameSamplingMode::default(),
            frame_sample_rate: 1,
            max_frames: 30,
            frame_interval: None,
            quality_preference: QualityPreference::default(),
            target_languages: Vec::new(),
            custom_analysis: None,
        }
    }
}

impl JobOptions {
    /// `maxFrames` clamped to at least 1, per §4.5.
    pub fn clamped_max_frames(&self) -> u32 {
        self.max_frames.max(1)
    }
}

/// Retry/backoff policy attached at enqueue time (§4.4 `Enqueue` options).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum BackoffKind {
    Fixed,
    Exponential,
}

/// Job status as exposed on the status contract (§6) and driven by the
/// state machine in §4.5. `Cancelled` is reachable via `Cancel` even though
/// the status-contract enum in §6 only lists the other six — a job can
/// still be asked about after being cancelled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Waiting,
    Delayed,
    Active,
    Paused,
    Completed,
    Failed,
    Cancelled,
}

impl JobStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Waiting => "waiting",
            JobStatus::Delayed => "delayed",
            JobStatus::Active => "active",
            JobStatus::Paused => "paused",
            JobStatus::Completed => "completed",
            JobStatus::Failed => "failed",
            JobStatus::Cancelled => "cancelled",
        }
    }

    /// Terminal states never transition further (§3, §4.5).
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            JobStatus::Completed | JobStatus::Failed | JobStatus::Cancelled
        )
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// `{code, message}` describing a job's terminal failure (§6, §7).
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct JobError {
    pub code: String,
    pub message: String,
}

impl JobError {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
        }
    }
}

/// A unit of work transported by the queue and owned exclusively by the
/// worker holding its reservation (§3).
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct Job {
    pub job_id: JobId,
    pub user_id: String,
    pub source: JobSource,
    pub video_url: String,
    pub filename: String,
    pub options: JobOptions,
    pub enqueued_at: DateTime<Utc>,
    pub priority: u8,
    pub attempt: u32,
    pub status: JobStatus,
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<JobError>,
}

impl Job {
    /// Construct a freshly enqueued job. `attempt` starts at 1 (§3:
    /// `attempt ≥ 1`).
    pub fn new(
        user_id: impl Into<String>,
        source: JobSource,
        video_url: impl Into<String>,
        filename: impl Into<String>,
        options: JobOptions,
        priority: u8,
    ) -> Self {
        let now = Utc::now();
        Self {
            job_id: JobId::new(),
            user_id: user_id.into(),
            source,
            video_url: video_url.into(),
            filename: filename.into(),
            options,
            enqueued_at: now,
            priority,
            attempt: 1,
            status: JobStatus::Waiting,
            created_at: now,
            started_at: None,
            completed_at: None,
            error: None,
        }
    }

    pub fn mark_active(&mut self) {
        self.status = JobStatus::Active;
        if self.started_at.is_none() {
            self.started_at = Some(Utc::now());
        }
    }

    pub fn mark_completed(&mut self) {
        self.status = JobStatus::Completed;
        self.completed_at = Some(Utc::now());
    }

    pub fn mark_failed(&mut self, error: JobError) {
        self.status = JobStatus::Failed;
        self.completed_at = Some(Utc::now());
        self.error = Some(error);
    }

    pub fn mark_cancelled(&mut self) {
        self.status = JobStatus::Cancelled;
        self.completed_at = Some(Utc::now());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_job_starts_at_attempt_one_and_waiting() {
        let job = Job::new(
            "user-1",
            JobSource::Url,
            "https://example.com/v.mp4",
            "v.mp4",
            JobOptions::default(),
            5,
        );
        assert_eq!(job.attempt, 1);
        assert_eq!(job.status, JobStatus::Waiting);
        assert!(!job.status.is_terminal());
    }

    #[test]
    fn test_terminal_statuses() {
        assert!(JobStatus::Completed.is_terminal());
        assert!(JobStatus::Failed.is_terminal());
        assert!(JobStatus::Cancelled.is_terminal());
        assert!(!JobStatus::Active.is_terminal());
        assert!(!JobStatus::Delayed.is_terminal());
    }

    #[test]
    fn test_clamped_max_frames() {
        let mut opts = JobOptions::default();
        opts.max_frames = 0;
        assert_eq!(opts.clamped_max_frames(), 1);
    }

    #[test]
    fn test_mark_failed_sets_completed_at_and_error() {
        let mut job = Job::new(
            "u",
            JobSource::Youtube,
            "https://youtube.com/watch?v=abc",
            "v.mp4",
            JobOptions::default(),
            1,
        );
        job.mark_active();
        job.mark_failed(JobError::new("media_error", "probe failed"));
        assert_eq!(job.status, JobStatus::Failed);
        assert!(job.completed_at.is_some());
        assert_eq!(job.error.unwrap().code, "media_error");
    }
}
