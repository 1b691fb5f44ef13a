//! Assembles and persists the final `ProcessingResult` once every enabled
//! stage has run (§4.5 "Result assembly").

use chrono::Utc;

use pipeline_models::{AudioAnalysis, Classification, Frame, ModelUsageRecord, ProcessingResult, ResultCounts, Scene};

use crate::context::PipelineContext;
use crate::error::PipelineResult;

#[allow(clippy::too_many_arguments)]
pub async fn run(
    ctx: &PipelineContext,
    frames: &[Frame],
    scenes: &[Scene],
    audio: Option<&AudioAnalysis>,
    classification: Option<&Classification>,
    summary: Option<String>,
    usage: Vec<ModelUsageRecord>,
) -> PipelineResult<ProcessingResult> {
    let total_cost = usage.iter().map(|r| r.cost).sum();
    for record in &usage {
        ctx.storage.model_usage.append(record).await?;
    }

    let counts = ResultCounts {
        frames: frames.len(),
        scenes: scenes.len(),
        objects: frames.iter().map(|f| f.objects.len()).sum(),
        text_boxes: frames.iter().map(|f| f.text_boxes.len()).sum(),
    };

    let processing_time_ms = (Utc::now() - ctx.started_at).num_milliseconds();

    let payload = serde_json::json!({
        "audio": audio,
        "classification": classification,
    });

    let result = ProcessingResult::new(ctx.job.job_id, summary, counts, total_cost, processing_time_ms, payload);
    ctx.storage.processing_results.save(&result).await?;
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counts_sum_objects_and_text_boxes_across_frames() {
        let job_id = pipeline_models::JobId::new();
        let mut a = Frame::new(job_id, 0.0, 0, "a.jpg");
        a.objects = vec![pipeline_models::DetectedObject {
            label: "x".to_string(),
            confidence: 0.5,
            bounding_box: pipeline_models::NormalizedRect::new(0.0, 0.0, 0.1, 0.1),
        }];
        let b = Frame::new(job_id, 1.0, 1, "b.jpg");
        let frames = vec![a, b];
        let counts = ResultCounts {
            frames: frames.len(),
            scenes: 0,
            objects: frames.iter().map(|f| f.objects.len()).sum(),
            text_boxes: frames.iter().map(|f| f.text_boxes.len()).sum(),
        };
        assert_eq!(counts.objects, 1);
        assert_eq!(counts.frames, 2);
    }
}
