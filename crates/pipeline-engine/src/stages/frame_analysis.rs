//! frame_analysis (§4.5 stage 4): select a model once for the whole job,
//! then fan out across frames bounded by `frameConcurrency`. Results are
//! gathered indexed by frame number so the final list is ordered
//! independent of completion order (§5 "Ordering guarantees").

use std::path::PathBuf;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

use etc_client::EtcClient;
use pipeline_models::{Frame, JobId, JobOptions, ModelUsageRecord, QualityPreference, VideoMetadata};

use crate::complexity::frame_analysis_complexity;
use crate::context::PipelineContext;
use crate::error::{PipelineError, PipelineResult};

const MAX_TOKENS: u32 = 1024;

pub async fn run(
    ctx: &PipelineContext,
    frame_paths: &[PathBuf],
    metadata: &VideoMetadata,
) -> PipelineResult<(Vec<Frame>, Vec<ModelUsageRecord>)> {
    if frame_paths.is_empty() {
        return Ok((Vec::new(), Vec::new()));
    }

    let options = &ctx.job.options;
    let complexity = frame_analysis_complexity(options, metadata.quality);
    let prompt = build_prompt(options);
    let quality_pref = quality_preference_str(options.quality_preference);

    let selection = ctx
        .etc
        .select_model(
            "vision",
            complexity,
            serde_json::json!({ "stage": "frame_analysis" }),
            None,
            quality_pref,
            &ctx.cancel,
        )
        .await?;

    let want_embedding = options.classify_content || options.detect_scenes;
    let total = frame_paths.len();

    let mut tasks = JoinSet::new();
    for (index, path) in frame_paths.iter().cloned().enumerate() {
        let permit = ctx
            .frame_semaphore
            .clone()
            .acquire_owned()
            .await
            .map_err(|_| PipelineError::Fatal("frame concurrency semaphore closed".to_string()))?;

        let etc = ctx.etc.clone();
        let cancel = ctx.cancel.clone();
        let job_id = ctx.job.job_id;
        let prompt = prompt.clone();
        let model_id = selection.model_id.clone();
        let provider = selection.provider.clone();
        let cost = selection.estimated_cost;
        let duration = metadata.duration;

        tasks.spawn(async move {
            let _permit = permit;
            analyze_one(
                &etc, job_id, path, index as u32, total, duration, &prompt, model_id, provider, cost, complexity,
                want_embedding, &cancel,
            )
            .await
        });
    }

    let mut slots: Vec<Option<Frame>> = (0..total).map(|_| None).collect();
    let mut usage = Vec::with_capacity(total);

    while let Some(joined) = tasks.join_next().await {
        let (frame, records) =
            joined.map_err(|e| PipelineError::Fatal(format!("frame analysis task panicked: {e}")))?;
        let idx = frame.frame_number as usize;
        slots[idx] = Some(frame);
        usage.extend(records);
    }

    let frames = slots
        .into_iter()
        .map(|f| f.expect("every frame index populated by the fan-out above"))
        .collect();

    Ok((frames, usage))
}

#[allow(clippy::too_many_arguments)]
async fn analyze_one(
    etc: &EtcClient,
    job_id: JobId,
    path: PathBuf,
    index: u32,
    total: usize,
    duration: f64,
    prompt: &str,
    model_id: String,
    provider: String,
    cost: f64,
    complexity: f32,
    want_embedding: bool,
    cancel: &CancellationToken,
) -> (Frame, Vec<ModelUsageRecord>) {
    let timestamp = duration * (f64::from(index) + 0.5) / total as f64;
    let mut frame = Frame::new(job_id, timestamp, index, path.to_string_lossy().into_owned());
    let mut usage = Vec::new();

    let bytes = match tokio::fs::read(&path).await {
        Ok(bytes) => bytes,
        Err(e) => {
            frame.error = Some(format!("failed to read frame file: {e}"));
            return (frame, usage);
        }
    };
    let encoded = BASE64.encode(bytes);

    let started = std::time::Instant::now();
    match etc
        .analyze_frame(encoded, prompt.to_string(), model_id.clone(), MAX_TOKENS, None, cancel)
        .await
    {
        Ok(result) => {
            usage.push(ModelUsageRecord::new(
                job_id,
                "frame_analysis",
                model_id.clone(),
                provider.clone(),
                complexity,
                cost,
                started.elapsed().as_millis() as u64,
                true,
            ));
            frame.model_id = Some(model_id);
            frame.confidence = result.confidence;
            frame.objects = result.objects;
            frame.text_boxes = result.text;

            if want_embedding {
                match etc.generate_embedding(result.description.clone(), cancel).await {
                    Ok(embedding) => frame.embedding = Some(embedding),
                    Err(e) => tracing::warn!("embedding generation failed for frame {}: {}", index, e),
                }
            }
            frame.description = Some(result.description);
        }
        Err(e) => {
            usage.push(ModelUsageRecord::new(
                job_id,
                "frame_analysis",
                model_id,
                provider,
                complexity,
                0.0,
                started.elapsed().as_millis() as u64,
                false,
            ));
            frame.error = Some(e.to_string());
        }
    }

    (frame, usage)
}

fn build_prompt(options: &JobOptions) -> String {
    let mut asks = Vec::new();
    if options.detect_objects {
        asks.push("detect and label objects");
    }
    if options.extract_text {
        asks.push("extract any visible text");
    }
    asks.push("describe the frame");
    format!("Analyze this video frame: {}.", asks.join(", "))
}

fn quality_preference_str(pref: QualityPreference) -> &'static str {
    match pref {
        QualityPreference::Speed => "speed",
        QualityPreference::Balanced => "balanced",
        QualityPreference::Accuracy => "accuracy",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prompt_includes_requested_analyses() {
        let mut options = JobOptions::default();
        options.detect_objects = true;
        options.extract_text = true;
        let prompt = build_prompt(&options);
        assert!(prompt.contains("detect and label objects"));
        assert!(prompt.contains("extract any visible text"));
    }

    #[test]
    fn test_prompt_always_requests_a_description() {
        let prompt = build_prompt(&JobOptions::default());
        assert!(prompt.contains("describe the frame"));
    }
}
