//! summary_generation (§4.5 stage 8, tolerant): synthesizes a short summary
//! from whatever context the earlier stages produced.

use pipeline_models::{AudioAnalysis, Classification, Frame, ModelUsageRecord};

use crate::context::PipelineContext;
use crate::error::PipelineResult;

pub async fn run(
    ctx: &PipelineContext,
    frames: &[Frame],
    audio: Option<&AudioAnalysis>,
    classification: Option<&Classification>,
) -> PipelineResult<(Option<String>, Vec<ModelUsageRecord>)> {
    let mut sources: Vec<String> = frames.iter().filter_map(|f| f.description.clone()).collect();
    if let Some(audio) = audio {
        if !audio.transcription.is_empty() {
            sources.push(audio.transcription.clone());
        }
    }
    if let Some(classification) = classification {
        sources.push(format!(
            "category: {} (tags: {})",
            classification.primary_category,
            classification.tags.join(", ")
        ));
    }

    if sources.is_empty() {
        return Ok((None, Vec::new()));
    }

    let started = std::time::Instant::now();
    match ctx
        .etc
        .synthesize(sources, "summary", Some("write a concise summary of this video".to_string()), &ctx.cancel)
        .await
    {
        Ok(text) => {
            let usage = vec![ModelUsageRecord::new(
                ctx.job.job_id,
                "summary_generation",
                "synthesize".to_string(),
                "etc".to_string(),
                0.0,
                0.0,
                started.elapsed().as_millis() as u64,
                true,
            )];
            Ok((Some(text), usage))
        }
        Err(e) => {
            tracing::warn!("summary generation failed: {}", e);
            Ok((None, Vec::new()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_sources_produce_no_synthesis() {
        let sources: Vec<String> = Vec::new();
        assert!(sources.is_empty());
    }
}
