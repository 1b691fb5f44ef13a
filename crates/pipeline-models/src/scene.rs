//! Detected scene segments.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::ids::{FrameId, SceneId};

/// A maximal run of adjacent frames whose pairwise similarity exceeds the
/// scene threshold (§3 `Scene`, GLOSSARY).
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct Scene {
    pub scene_id: SceneId,
    pub start_frame: u32,
    pub end_frame: u32,
    pub start_time: f64,
    pub end_time: f64,
    pub keyframe_id: FrameId,
    pub description: String,
    pub confidence: f32,
}

impl Scene {
    pub fn new(
        start_frame: u32,
        end_frame: u32,
        start_time: f64,
        end_time: f64,
        keyframe_id: FrameId,
        description: impl Into<String>,
        confidence: f32,
    ) -> Self {
        Self {
            scene_id: SceneId::new(),
            start_frame,
            end_frame,
            start_time,
            end_time,
            keyframe_id,
            description: description.into(),
            confidence,
        }
    }

    /// `startFrame <= endFrame` (§3 invariant).
    pub fn is_valid(&self) -> bool {
        self.start_frame <= self.end_frame && self.start_time <= self.end_time
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scene_validity() {
        let scene = Scene::new(0, 4, 0.0, 4.0, FrameId::new(), "an opening shot", 0.8);
        assert!(scene.is_valid());
    }

    #[test]
    fn test_inverted_range_is_invalid() {
        let scene = Scene::new(5, 2, 5.0, 2.0, FrameId::new(), "x", 0.1);
        assert!(!scene.is_valid());
    }
}
