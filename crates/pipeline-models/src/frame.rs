//! Per-frame analysis results.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::ids::{FrameId, JobId};
use crate::rect::NormalizedRect;

/// A detected object within a frame (§3 `Object / TextBox`).
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct DetectedObject {
    pub label: String,
    pub confidence: f32,
    pub bounding_box: NormalizedRect,
}

/// A detected text region within a frame (§3 `Object / TextBox`).
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct TextBox {
    pub text: String,
    pub confidence: f32,
    pub bounding_box: NormalizedRect,
}

/// A sampled frame with its AI analysis (§3 `Frame`). Never mutated after
/// creation; an embedding may be attached by a later stage.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct Frame {
    pub frame_id: FrameId,
    pub job_id: JobId,
    pub timestamp: f64,
    pub frame_number: u32,
    pub file_path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub confidence: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model_id: Option<String>,
    #[serde(default)]
    pub objects: Vec<DetectedObject>,
    #[serde(default)]
    pub text_boxes: Vec<TextBox>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub embedding: Option<Vec<f32>>,
    /// Set when `ETC.AnalyzeFrame` failed for this frame; downstream
    /// tolerant stages degrade using this instead of `description`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl Frame {
    pub fn new(job_id: JobId, timestamp: f64, frame_number: u32, file_path: impl Into<String>) -> Self {
        Self {
            frame_id: FrameId::new(),
            job_id,
            timestamp,
            frame_number,
            file_path: file_path.into(),
            description: None,
            confidence: 0.0,
            model_id: None,
            objects: Vec::new(),
            text_boxes: Vec::new(),
            embedding: None,
            error: None,
        }
    }

    pub fn is_errored(&self) -> bool {
        self.error.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_frame_has_no_analysis_yet() {
        let frame = Frame::new(JobId::new(), 1.0, 0, "/tmp/frame_0000.jpg");
        assert!(!frame.is_errored());
        assert!(frame.embedding.is_none());
    }
}
