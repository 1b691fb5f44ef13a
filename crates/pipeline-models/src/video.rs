//! Technical video metadata produced by the probe stage.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Coarse quality tag derived from pixel count thresholds (§3).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum VideoQuality {
    Low,
    Medium,
    High,
    #[serde(rename = "4k")]
    UltraHd,
}

impl VideoQuality {
    /// `SD < 1280x720 <= HD < 1920x1080 <= FHD < 3840x2160 <= 4K` (§3).
    pub fn from_dimensions(width: u32, height: u32) -> Self {
        let pixels = u64::from(width) * u64::from(height);
        let hd = 1280u64 * 720;
        let fhd = 1920u64 * 1080;
        let uhd = 3840u64 * 2160;

        if pixels >= uhd {
            VideoQuality::UltraHd
        } else if pixels >= fhd {
            VideoQuality::High
        } else if pixels >= hd {
            VideoQuality::Medium
        } else {
            VideoQuality::Low
        }
    }
}

/// Technical metadata produced once per job by `metadata_extraction` (§3).
/// Immutable thereafter.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct VideoMetadata {
    pub duration: f64,
    pub width: u32,
    pub height: u32,
    pub frame_rate: f64,
    pub codec: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub audio_codec: Option<String>,
    pub audio_track_count: u32,
    pub has_subtitles: bool,
    pub bitrate: u64,
    pub size: u64,
    pub quality: VideoQuality,
}

impl VideoMetadata {
    pub fn new(
        duration: f64,
        width: u32,
        height: u32,
        frame_rate: f64,
        codec: impl Into<String>,
        audio_codec: Option<String>,
        audio_track_count: u32,
        has_subtitles: bool,
        bitrate: u64,
        size: u64,
    ) -> Self {
        Self {
            duration,
            width,
            height,
            frame_rate,
            codec: codec.into(),
            audio_codec,
            audio_track_count,
            has_subtitles,
            bitrate,
            size,
            quality: VideoQuality::from_dimensions(width, height),
        }
    }

    /// `duration > 0`; resolution `>= (1,1)` (§3 invariants).
    pub fn is_valid(&self) -> bool {
        self.duration > 0.0 && self.width >= 1 && self.height >= 1
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quality_thresholds() {
        assert_eq!(VideoQuality::from_dimensions(640, 480), VideoQuality::Low);
        assert_eq!(VideoQuality::from_dimensions(1280, 720), VideoQuality::Medium);
        assert_eq!(VideoQuality::from_dimensions(1920, 1080), VideoQuality::High);
        assert_eq!(VideoQuality::from_dimensions(3840, 2160), VideoQuality::UltraHd);
    }

    #[test]
    fn test_invalid_zero_duration() {
        let meta = VideoMetadata::new(0.0, 1920, 1080, 30.0, "h264", None, 1, false, 1_000_000, 500_000);
        assert!(!meta.is_valid());
    }
}
