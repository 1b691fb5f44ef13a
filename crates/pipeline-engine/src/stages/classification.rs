//! content_classification (§4.5 stage 7, tolerant): classifies on whatever
//! signals the earlier stages produced, and — when a transcription exists —
//! also derives the topics/sentiment carried on `AudioAnalysis`.

use std::collections::HashMap;

use pipeline_models::{AudioAnalysis, Classification, Frame, ModelUsageRecord};

use crate::context::PipelineContext;
use crate::error::PipelineResult;

/// `(sentiment, topics)`, merged by the caller into the job's `AudioAnalysis`.
pub type AudioEnrichment = (String, Vec<String>);

pub async fn run(
    ctx: &PipelineContext,
    frames: &[Frame],
    audio: Option<&AudioAnalysis>,
) -> PipelineResult<(Classification, Option<AudioEnrichment>, Vec<ModelUsageRecord>)> {
    let mut usage = Vec::new();

    let descriptions: Vec<&str> = frames.iter().filter_map(|f| f.description.as_deref()).collect();
    let transcription = audio.map(|a| a.transcription.as_str()).filter(|t| !t.is_empty());

    let signals = serde_json::json!({
        "frame_descriptions": descriptions,
        "transcription": transcription,
    });

    let started = std::time::Instant::now();
    let classification = match ctx.etc.classify(signals, &ctx.cancel).await {
        Ok(result) => {
            usage.push(ModelUsageRecord::new(
                ctx.job.job_id,
                "content_classification",
                "classify".to_string(),
                "etc".to_string(),
                0.0,
                0.0,
                started.elapsed().as_millis() as u64,
                true,
            ));
            Classification {
                primary_category: result.primary_category,
                category_scores: result.category_scores,
                tags: result.tags,
                rating: result.rating,
                is_nsfw: result.is_nsfw,
                confidence: result.confidence,
                model_id: "etc-classify".to_string(),
            }
        }
        Err(e) => {
            tracing::warn!("content classification failed: {}", e);
            Classification {
                primary_category: "unknown".to_string(),
                category_scores: HashMap::new(),
                tags: Vec::new(),
                rating: "unrated".to_string(),
                is_nsfw: false,
                confidence: 0.0,
                model_id: "etc-classify".to_string(),
            }
        }
    };

    let enrichment = match transcription {
        Some(text) => enrich_audio(ctx, text, &mut usage).await,
        None => None,
    };

    ctx.storage.classifications.save(ctx.job.job_id, &classification).await?;
    Ok((classification, enrichment, usage))
}

async fn enrich_audio(
    ctx: &PipelineContext,
    transcription: &str,
    usage: &mut Vec<ModelUsageRecord>,
) -> Option<AudioEnrichment> {
    let topics_started = std::time::Instant::now();
    let topics = match ctx.etc.extract_topics(transcription.to_string(), &ctx.cancel).await {
        Ok(topics) => {
            usage.push(ModelUsageRecord::new(
                ctx.job.job_id,
                "extract_topics",
                "extract_topics".to_string(),
                "etc".to_string(),
                0.0,
                0.0,
                topics_started.elapsed().as_millis() as u64,
                true,
            ));
            topics
        }
        Err(e) => {
            tracing::warn!("topic extraction failed: {}", e);
            Vec::new()
        }
    };

    let sentiment_started = std::time::Instant::now();
    let sentiment = match ctx.etc.sentiment(transcription.to_string(), &ctx.cancel).await {
        Ok(result) => {
            usage.push(ModelUsageRecord::new(
                ctx.job.job_id,
                "sentiment",
                "sentiment".to_string(),
                "etc".to_string(),
                0.0,
                0.0,
                sentiment_started.elapsed().as_millis() as u64,
                true,
            ));
            result.sentiment
        }
        Err(e) => {
            tracing::warn!("sentiment analysis failed: {}", e);
            String::new()
        }
    };

    Some((sentiment, topics))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transcription_filter_skips_empty_string() {
        let audio = AudioAnalysis {
            transcription: String::new(),
            language: "en".to_string(),
            confidence: 0.9,
            speakers: Vec::new(),
            sentiment: None,
            topics: Vec::new(),
            keywords: Vec::new(),
            source_audio_path: "a.wav".to_string(),
            model_id: "m1".to_string(),
        };
        let transcription = Some(&audio).map(|a| a.transcription.as_str()).filter(|t| !t.is_empty());
        assert!(transcription.is_none());
    }
}
