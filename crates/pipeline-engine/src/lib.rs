//! Per-job DAG-of-stages execution (§4.5). `run_pipeline` resolves the
//! enabled stage set up front — failing fast on an unmet dependency before
//! any side effect — then acquires the source media and runs each stage in
//! dependency order, applying the partial-failure policy: a tolerant
//! stage's failure degrades its output and the job continues; any other
//! failure, or a cancellation observed at a stage boundary, is fatal.

pub mod complexity;
pub mod context;
pub mod dag;
pub mod error;
pub mod result_assembly;
pub mod stage;
pub mod stages;

pub use context::PipelineContext;
pub use error::{PipelineError, PipelineResult};
pub use stage::StageName;

use pipeline_models::{AudioAnalysis, Classification, Frame, ModelUsageRecord, ProcessingResult, Scene};

pub async fn run_pipeline(ctx: &PipelineContext) -> PipelineResult<ProcessingResult> {
    let enabled = dag::enabled_stages(&ctx.job.options)?;
    let mut usage: Vec<ModelUsageRecord> = Vec::new();

    let source_path = media_toolkit::acquire(
        ctx.job.source.clone(),
        &ctx.job.video_url,
        &ctx.job.filename,
        &ctx.job.job_id.to_string(),
        &ctx.mtk_config,
    )
    .await?;

    check_cancelled(ctx)?;
    let metadata = stages::metadata::run(ctx, &source_path).await?;

    let mut frame_paths = Vec::new();
    if enabled.contains(&StageName::FrameExtraction) {
        check_cancelled(ctx)?;
        frame_paths = stages::frames::run(ctx, &metadata, &source_path).await?;
    }

    let mut audio_path = None;
    if enabled.contains(&StageName::AudioExtraction) {
        check_cancelled(ctx)?;
        audio_path = Some(stages::audio_extract::run(ctx, &source_path).await?);
    }

    let mut frames: Vec<Frame> = Vec::new();
    if enabled.contains(&StageName::FrameAnalysis) {
        check_cancelled(ctx)?;
        let (analysed, records) = stages::frame_analysis::run(ctx, &frame_paths, &metadata).await?;
        frames = analysed;
        usage.extend(records);
        ctx.storage.frames.save_many(&frames).await?;
    }

    let mut audio: Option<AudioAnalysis> = None;
    if enabled.contains(&StageName::AudioTranscription) {
        check_cancelled(ctx)?;
        let path = audio_path.as_deref().expect("audio_transcription depends on audio_extraction");
        let (analysis, records) = stages::audio_transcription::run(ctx, path, metadata.duration).await?;
        usage.extend(records);
        ctx.storage.audio_analysis.save(ctx.job.job_id, &analysis).await?;
        audio = Some(analysis);
    }

    let mut scenes: Vec<Scene> = Vec::new();
    if enabled.contains(&StageName::SceneDetection) {
        if !ctx.is_cancelled() {
            match stages::scene_detection::run(ctx, &frames).await {
                Ok((found, records)) => {
                    scenes = found;
                    usage.extend(records);
                }
                Err(e) => tracing::warn!("scene_detection degraded: {}", e),
            }
        }
    }

    let mut classification: Option<Classification> = None;
    if enabled.contains(&StageName::ContentClassification) {
        if !ctx.is_cancelled() {
            match stages::classification::run(ctx, &frames, audio.as_ref()).await {
                Ok((found, enrichment, records)) => {
                    usage.extend(records);
                    if let (Some((sentiment, topics)), Some(analysis)) = (enrichment, audio.as_mut()) {
                        analysis.sentiment = Some(sentiment);
                        analysis.topics = topics;
                        ctx.storage.audio_analysis.save(ctx.job.job_id, analysis).await?;
                    }
                    classification = Some(found);
                }
                Err(e) => tracing::warn!("content_classification degraded: {}", e),
            }
        }
    }

    let mut summary = None;
    if enabled.contains(&StageName::SummaryGeneration) {
        if !ctx.is_cancelled() {
            match stages::summary::run(ctx, &frames, audio.as_ref(), classification.as_ref()).await {
                Ok((text, records)) => {
                    usage.extend(records);
                    summary = text;
                }
                Err(e) => tracing::warn!("summary_generation degraded: {}", e),
            }
        }
    }

    // Partial outputs produced before cancellation are not persisted as a
    // successful result (§4.5); the job is marked failed with reason
    // "cancelled" instead.
    check_cancelled(ctx)?;

    result_assembly::run(
        ctx,
        &frames,
        &scenes,
        audio.as_ref(),
        classification.as_ref(),
        summary,
        usage,
    )
    .await
}

fn check_cancelled(ctx: &PipelineContext) -> PipelineResult<()> {
    if ctx.is_cancelled() {
        Err(PipelineError::Cancelled)
    } else {
        Ok(())
    }
}
