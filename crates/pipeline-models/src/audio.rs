//! Audio transcription and diarization results.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// One speaker's contiguous contribution to the transcript (§3 `(start,
/// end, speakerId)`).
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct SpeakerSegment {
    pub start: f64,
    pub end: f64,
    pub speaker_id: String,
}

impl SpeakerSegment {
    /// `start <= end` (§3 invariant).
    pub fn is_valid(&self) -> bool {
        self.start <= self.end
    }

    /// Shift this segment's timestamps by a cumulative chunk offset, used
    /// when merging chunked transcriptions (§4.5 audio_transcription).
    pub fn offset(&self, by: f64) -> Self {
        Self {
            start: self.start + by,
            end: self.end + by,
            speaker_id: self.speaker_id.clone(),
        }
    }
}

/// Full audio analysis for a job (§3 `AudioAnalysis`). One per job.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct AudioAnalysis {
    pub transcription: String,
    pub language: String,
    pub confidence: f32,
    #[serde(default)]
    pub speakers: Vec<SpeakerSegment>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sentiment: Option<String>,
    #[serde(default)]
    pub topics: Vec<String>,
    #[serde(default)]
    pub keywords: Vec<String>,
    pub source_audio_path: String,
    pub model_id: String,
}

impl AudioAnalysis {
    /// Segments ordered by `start`; confidence in `[0,1]` (§3 invariant).
    pub fn is_valid(&self) -> bool {
        (0.0..=1.0).contains(&self.confidence)
            && self
                .speakers
                .windows(2)
                .all(|w| w[0].start <= w[1].start)
            && self.speakers.iter().all(SpeakerSegment::is_valid)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_segment_offset() {
        let seg = SpeakerSegment {
            start: 0.5,
            end: 1.5,
            speaker_id: "spk_0".into(),
        };
        let shifted = seg.offset(10.0);
        assert_eq!(shifted.start, 10.5);
        assert_eq!(shifted.end, 11.5);
    }

    #[test]
    fn test_analysis_validity_requires_ordered_segments() {
        let analysis = AudioAnalysis {
            transcription: "hello world".into(),
            language: "en".into(),
            confidence: 0.9,
            speakers: vec![
                SpeakerSegment { start: 0.0, end: 1.0, speaker_id: "a".into() },
                SpeakerSegment { start: 0.5, end: 1.0, speaker_id: "b".into() },
            ],
            sentiment: None,
            topics: vec![],
            keywords: vec![],
            source_audio_path: "/tmp/audio.wav".into(),
            model_id: "m1".into(),
        };
        assert!(!analysis.is_valid());
    }
}
