//! The stage catalogue (§4.5). Stage-failure tolerance is a property of
//! the stage, encoded here in one table rather than scattered across call
//! sites (§9 design notes).

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StageName {
    MetadataExtraction,
    FrameExtraction,
    AudioExtraction,
    FrameAnalysis,
    AudioTranscription,
    SceneDetection,
    ContentClassification,
    SummaryGeneration,
}

impl StageName {
    pub fn as_str(&self) -> &'static str {
        match self {
            StageName::MetadataExtraction => "metadata_extraction",
            StageName::FrameExtraction => "frame_extraction",
            StageName::AudioExtraction => "audio_extraction",
            StageName::FrameAnalysis => "frame_analysis",
            StageName::AudioTranscription => "audio_transcription",
            StageName::SceneDetection => "scene_detection",
            StageName::ContentClassification => "content_classification",
            StageName::SummaryGeneration => "summary_generation",
        }
    }

    /// A tolerant stage proceeds given error-valued inputs, degrading its
    /// output deterministically rather than failing the job (§4.5 partial-
    /// failure policy; only `metadata_extraction` is unconditionally fatal).
    pub fn is_tolerant(&self) -> bool {
        matches!(
            self,
            StageName::SceneDetection | StageName::ContentClassification | StageName::SummaryGeneration
        )
    }
}
