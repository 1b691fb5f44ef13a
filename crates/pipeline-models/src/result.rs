//! The final assembled result of a successful job run.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::ids::JobId;

/// Entity counts recorded in a `ProcessingResult` (§3, §8: `totalFrames =
/// |frames|`).
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct ResultCounts {
    pub frames: usize,
    pub scenes: usize,
    pub objects: usize,
    pub text_boxes: usize,
}

/// Written once on terminal success (§3 `ProcessingResult`).
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ProcessingResult {
    pub job_id: JobId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    pub counts: ResultCounts,
    pub total_cost: f64,
    pub processing_time_ms: i64,
    pub payload: serde_json::Value,
}

impl ProcessingResult {
    /// `processingTime = completedAt - startedAt` (§3 invariant); caller
    /// supplies the already-computed duration.
    pub fn new(
        job_id: JobId,
        summary: Option<String>,
        counts: ResultCounts,
        total_cost: f64,
        processing_time_ms: i64,
        payload: serde_json::Value,
    ) -> Self {
        Self {
            job_id,
            summary,
            counts,
            total_cost,
            processing_time_ms,
            payload,
        }
    }

    /// `processingTime >= 0` (§8 testable property).
    pub fn is_valid(&self) -> bool {
        self.processing_time_ms >= 0
    }
}
