//! DAG resolution: which stages are enabled for a job's options, in a
//! dependency-respecting execution order, failing fast on an unmet
//! dependency before any side effect (§4.5 "DAG executor", §8 scenario 5).

use pipeline_models::JobOptions;

use crate::error::{PipelineError, PipelineResult};
use crate::stage::StageName;

/// `frame_extraction`/`audio_extraction` are requested directly by their
/// options flag. `frame_analysis` has no flag of its own — it is implied by
/// the analysis flags and silently absent (not "unmet") when frames were
/// never asked for. `audio_transcription` and `scene_detection` each have
/// their own flag *and* a hard dependency, so requesting one without its
/// input is a contradiction in the request, not an implicit no-op.
/// `content_classification`/`summary_generation` declare their dependency
/// set as "whichever upstream stages are enabled" (§4.5 items 7-8), so they
/// can never be unmet — they are tolerant stages that degrade instead.
pub fn enabled_stages(options: &JobOptions) -> PipelineResult<Vec<StageName>> {
    let frame_extraction = options.extract_frames;
    let audio_extraction = options.extract_audio;

    let frame_analysis =
        frame_extraction && (options.detect_objects || options.extract_text || options.classify_content);

    if options.transcribe_audio && !audio_extraction {
        return Err(PipelineError::dependency_unmet(
            StageName::AudioTranscription.as_str(),
            StageName::AudioExtraction.as_str(),
        ));
    }
    let audio_transcription = options.transcribe_audio && audio_extraction;

    if options.detect_scenes && !frame_analysis {
        return Err(PipelineError::dependency_unmet(
            StageName::SceneDetection.as_str(),
            StageName::FrameAnalysis.as_str(),
        ));
    }
    let scene_detection = options.detect_scenes && frame_analysis;

    let content_classification = options.classify_content;
    let summary_generation = options.generate_summary;

    let mut stages = vec![StageName::MetadataExtraction];
    if frame_extraction {
        stages.push(StageName::FrameExtraction);
    }
    if audio_extraction {
        stages.push(StageName::AudioExtraction);
    }
    if frame_analysis {
        stages.push(StageName::FrameAnalysis);
    }
    if audio_transcription {
        stages.push(StageName::AudioTranscription);
    }
    if scene_detection {
        stages.push(StageName::SceneDetection);
    }
    if content_classification {
        stages.push(StageName::ContentClassification);
    }
    if summary_generation {
        stages.push(StageName::SummaryGeneration);
    }

    Ok(stages)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn opts(f: impl FnOnce(&mut JobOptions)) -> JobOptions {
        let mut o = JobOptions::default();
        f(&mut o);
        o
    }

    #[test]
    fn test_metadata_only_by_default() {
        let stages = enabled_stages(&JobOptions::default()).unwrap();
        assert_eq!(stages, vec![StageName::MetadataExtraction]);
    }

    #[test]
    fn test_scene_detection_without_frames_is_dependency_unmet() {
        let options = opts(|o| {
            o.detect_scenes = true;
            o.extract_frames = false;
        });
        let err = enabled_stages(&options).unwrap_err();
        assert_eq!(err.code(), "dependency_unmet");
    }

    #[test]
    fn test_transcription_without_audio_extraction_is_dependency_unmet() {
        let options = opts(|o| {
            o.transcribe_audio = true;
            o.extract_audio = false;
        });
        let err = enabled_stages(&options).unwrap_err();
        assert_eq!(err.code(), "dependency_unmet");
    }

    #[test]
    fn test_full_pipeline_enables_all_eight_stages_in_dependency_order() {
        let options = opts(|o| {
            o.extract_frames = true;
            o.extract_audio = true;
            o.transcribe_audio = true;
            o.detect_objects = true;
            o.detect_scenes = true;
            o.classify_content = true;
            o.generate_summary = true;
        });
        let stages = enabled_stages(&options).unwrap();
        assert_eq!(stages.len(), 8);
        assert_eq!(stages[0], StageName::MetadataExtraction);
        assert_eq!(stages[7], StageName::SummaryGeneration);
    }

    #[test]
    fn test_frame_analysis_silently_absent_without_analysis_flags() {
        let options = opts(|o| o.extract_frames = true);
        let stages = enabled_stages(&options).unwrap();
        assert!(!stages.contains(&StageName::FrameAnalysis));
    }
}
