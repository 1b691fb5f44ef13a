//! Complexity scoring fed to `ETC.SelectModel` (§4.5).

use pipeline_models::{JobOptions, QualityPreference, VideoQuality};

fn quality_preference_adjustment(pref: QualityPreference) -> f32 {
    match pref {
        QualityPreference::Speed => -0.1,
        QualityPreference::Balanced => 0.0,
        QualityPreference::Accuracy => 0.2,
    }
}

/// Frame-analysis complexity (§4.5 "Complexity function"). The result is
/// clamped to `[0,1]`; the raw (pre-clamp) value may exceed that range
/// (§9 open question) but only the clamped value crosses the ETC boundary.
pub fn frame_analysis_complexity(options: &JobOptions, quality: VideoQuality) -> f32 {
    let mut c = 0.3;
    if options.detect_objects {
        c += 0.2;
    }
    if options.extract_text {
        c += 0.15;
    }
    if options.classify_content {
        c += 0.1;
    }
    if options.detect_scenes {
        c += 0.15;
    }
    c += quality_preference_adjustment(options.quality_preference);
    c += match quality {
        VideoQuality::UltraHd => 0.1,
        VideoQuality::Low => -0.05,
        VideoQuality::Medium | VideoQuality::High => 0.0,
    };
    if options.max_frames > 50 {
        c -= 0.1;
    }
    c.clamp(0.0, 1.0)
}

/// Transcription complexity (§4.5: "an analogous function exists for
/// transcription"). Diarization and multi-language targets raise it the
/// way object/text detection raise the frame-analysis score; quality
/// preference applies the same way.
pub fn transcription_complexity(options: &JobOptions) -> f32 {
    let mut c = 0.3;
    if !options.target_languages.is_empty() {
        c += 0.2;
    }
    if options.classify_content {
        c += 0.1;
    }
    c += quality_preference_adjustment(options.quality_preference);
    c.clamp(0.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_baseline_complexity_is_point_three() {
        let c = frame_analysis_complexity(&JobOptions::default(), VideoQuality::Medium);
        assert!((c - 0.3).abs() < 1e-6);
    }

    #[test]
    fn test_all_flags_and_accuracy_and_4k_saturates_at_one() {
        let mut options = JobOptions::default();
        options.detect_objects = true;
        options.extract_text = true;
        options.classify_content = true;
        options.detect_scenes = true;
        options.quality_preference = QualityPreference::Accuracy;
        let c = frame_analysis_complexity(&options, VideoQuality::UltraHd);
        assert_eq!(c, 1.0);
    }

    #[test]
    fn test_speed_preference_and_low_quality_and_many_frames_lowers_score() {
        let mut options = JobOptions::default();
        options.quality_preference = QualityPreference::Speed;
        options.max_frames = 100;
        let c = frame_analysis_complexity(&options, VideoQuality::Low);
        assert!((c - (0.3 - 0.1 - 0.05 - 0.1)).abs() < 1e-6);
    }

    #[test]
    fn test_transcription_complexity_rises_with_target_languages() {
        let mut options = JobOptions::default();
        options.target_languages = vec!["en".to_string(), "fr".to_string()];
        let c = transcription_complexity(&options);
        assert!((c - 0.5).abs() < 1e-6);
    }
}
