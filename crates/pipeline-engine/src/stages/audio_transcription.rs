//! audio_transcription (§4.5 stage 5): transcribe in one call when the
//! audio fits a single request, otherwise chunk and fan out bounded by
//! the same semaphore frame analysis uses (§5 "Audio-chunk fan-out uses
//! the frameConcurrency semaphore, shared with frames").

use std::path::Path;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use tokio::task::JoinSet;

use media_toolkit::MediaError;
use pipeline_models::{AudioAnalysis, ModelUsageRecord, QualityPreference, SpeakerSegment};

use crate::complexity::transcription_complexity;
use crate::context::PipelineContext;
use crate::error::{PipelineError, PipelineResult};

const SINGLE_CALL_MAX_BYTES: u64 = 10 * 1024 * 1024;
const CHUNK_TARGET_MB: f64 = 8.0;

pub async fn run(
    ctx: &PipelineContext,
    audio_path: &Path,
    duration: f64,
) -> PipelineResult<(AudioAnalysis, Vec<ModelUsageRecord>)> {
    let options = &ctx.job.options;
    let complexity = transcription_complexity(options);
    let quality_pref = quality_preference_str(options.quality_preference);
    let language = options.target_languages.first().cloned();

    let selection = ctx
        .etc
        .select_model(
            "audio",
            complexity,
            serde_json::json!({ "stage": "audio_transcription" }),
            None,
            quality_pref,
            &ctx.cancel,
        )
        .await?;

    let size = tokio::fs::metadata(audio_path)
        .await
        .map_err(MediaError::from)?
        .len();

    if size <= SINGLE_CALL_MAX_BYTES {
        let bytes = tokio::fs::read(audio_path).await.map_err(MediaError::from)?;
        let (analysis, usage) = transcribe_bytes(
            ctx,
            audio_path,
            bytes,
            language,
            selection.model_id.clone(),
            selection.provider.clone(),
            selection.estimated_cost,
            complexity,
        )
        .await;
        return Ok((analysis, usage));
    }

    let out_dir = ctx.job_dir.join("audio_chunks");
    let chunks = media_toolkit::chunk_audio(
        audio_path,
        &out_dir,
        duration,
        size,
        CHUNK_TARGET_MB,
        Some(ctx.mtk_cancel()),
    )
    .await?;

    let total = chunks.len();
    let mut tasks = JoinSet::new();
    for chunk in chunks {
        let permit = ctx
            .frame_semaphore
            .clone()
            .acquire_owned()
            .await
            .map_err(|_| PipelineError::Fatal("frame concurrency semaphore closed".to_string()))?;

        let etc = ctx.etc.clone();
        let cancel = ctx.cancel.clone();
        let language = language.clone();
        let model_id = selection.model_id.clone();
        let provider = selection.provider.clone();
        let cost = selection.estimated_cost;
        let job_id = ctx.job.job_id;

        tasks.spawn(async move {
            let _permit = permit;
            let index = chunk.index as usize;
            let start = chunk.start;
            let bytes = match tokio::fs::read(&chunk.path).await {
                Ok(bytes) => bytes,
                Err(e) => return (index, None, Vec::new(), Some(format!("failed to read audio chunk: {e}"))),
            };
            let encoded = BASE64.encode(bytes);

            let started = std::time::Instant::now();
            match etc
                .transcribe(encoded, language, model_id.clone(), true, &cancel)
                .await
            {
                Ok(result) => {
                    let usage = vec![ModelUsageRecord::new(
                        job_id,
                        "audio_transcription",
                        model_id,
                        provider,
                        0.0,
                        cost,
                        started.elapsed().as_millis() as u64,
                        true,
                    )];
                    (index, Some((result, start)), usage, None)
                }
                Err(e) => {
                    let usage = vec![ModelUsageRecord::new(
                        job_id,
                        "audio_transcription",
                        model_id,
                        provider,
                        0.0,
                        0.0,
                        started.elapsed().as_millis() as u64,
                        false,
                    )];
                    (index, None, usage, Some(e.to_string()))
                }
            }
        });
    }

    let mut slots: Vec<Option<(etc_client::types::TranscribeResult, f64)>> = (0..total).map(|_| None).collect();
    let mut usage = Vec::new();
    while let Some(joined) = tasks.join_next().await {
        let (index, result, records, warning) =
            joined.map_err(|e| PipelineError::Fatal(format!("transcription task panicked: {e}")))?;
        if let Some(message) = warning {
            tracing::warn!("audio chunk {} transcription failed: {}", index, message);
        }
        slots[index] = result;
        usage.extend(records);
    }

    let analysis = merge_chunks(selection.model_id.clone(), audio_path, slots);
    Ok((analysis, usage))
}

async fn transcribe_bytes(
    ctx: &PipelineContext,
    audio_path: &Path,
    bytes: Vec<u8>,
    language: Option<String>,
    model_id: String,
    provider: String,
    cost: f64,
    complexity: f32,
) -> (AudioAnalysis, Vec<ModelUsageRecord>) {
    let encoded = BASE64.encode(bytes);
    let started = std::time::Instant::now();
    let source_audio_path = audio_path.to_string_lossy().into_owned();

    match ctx
        .etc
        .transcribe(encoded, language, model_id.clone(), true, &ctx.cancel)
        .await
    {
        Ok(result) => {
            let usage = vec![ModelUsageRecord::new(
                ctx.job.job_id,
                "audio_transcription",
                model_id.clone(),
                provider,
                complexity,
                cost,
                started.elapsed().as_millis() as u64,
                true,
            )];
            let analysis = AudioAnalysis {
                transcription: result.transcription,
                language: result.language,
                confidence: result.confidence,
                speakers: result.speakers,
                sentiment: None,
                topics: Vec::new(),
                keywords: Vec::new(),
                source_audio_path,
                model_id,
            };
            (analysis, usage)
        }
        Err(e) => {
            let usage = vec![ModelUsageRecord::new(
                ctx.job.job_id,
                "audio_transcription",
                model_id.clone(),
                provider,
                complexity,
                0.0,
                started.elapsed().as_millis() as u64,
                false,
            )];
            let analysis = AudioAnalysis {
                transcription: String::new(),
                language: String::new(),
                confidence: 0.0,
                speakers: Vec::new(),
                sentiment: None,
                topics: Vec::new(),
                keywords: Vec::new(),
                source_audio_path,
                model_id,
            };
            tracing::warn!("audio transcription failed: {}", e);
            (analysis, usage)
        }
    }
}

fn merge_chunks(
    model_id: String,
    audio_path: &Path,
    slots: Vec<Option<(etc_client::types::TranscribeResult, f64)>>,
) -> AudioAnalysis {
    let mut texts = Vec::new();
    let mut speakers: Vec<SpeakerSegment> = Vec::new();
    let mut confidences = Vec::new();
    let mut language = String::new();

    for slot in slots.into_iter().flatten() {
        let (result, chunk_start) = slot;
        if language.is_empty() {
            language = result.language.clone();
        }
        texts.push(result.transcription);
        confidences.push(result.confidence);
        speakers.extend(result.speakers.into_iter().map(|s| s.offset(chunk_start)));
    }

    let confidence = if confidences.is_empty() {
        0.0
    } else {
        confidences.iter().sum::<f32>() / confidences.len() as f32
    };

    AudioAnalysis {
        transcription: texts.join(" "),
        language,
        confidence,
        speakers,
        sentiment: None,
        topics: Vec::new(),
        keywords: Vec::new(),
        source_audio_path: audio_path.to_string_lossy().into_owned(),
        model_id,
    }
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
    use etc_client::types::TranscribeResult;

    fn result(text: &str, lang: &str, confidence: f32, speaker_at: f64) -> TranscribeResult {
        TranscribeResult {
            transcription: text.to_string(),
            language: lang.to_string(),
            confidence,
            speakers: vec![SpeakerSegment {
                start: speaker_at,
                end: speaker_at + 1.0,
                speaker_id: "spk-0".to_string(),
            }],
        }
    }

    #[test]
    fn test_merge_concatenates_in_index_order_with_single_space() {
        let slots = vec![
            Some((result("hello", "en", 0.9, 0.0), 0.0)),
            Some((result("world", "en", 0.7, 8.0), 8.0)),
        ];
        let analysis = merge_chunks("m1".to_string(), Path::new("a.wav"), slots);
        assert_eq!(analysis.transcription, "hello world");
    }

    #[test]
    fn test_merge_offsets_speaker_segments_by_chunk_start() {
        let slots = vec![
            Some((result("a", "en", 1.0, 0.0), 0.0)),
            Some((result("b", "en", 1.0, 0.0), 8.0)),
        ];
        let analysis = merge_chunks("m1".to_string(), Path::new("a.wav"), slots);
        assert_eq!(analysis.speakers[1].start, 8.0);
    }

    #[test]
    fn test_merge_confidence_is_arithmetic_mean() {
        let slots = vec![
            Some((result("a", "en", 1.0, 0.0), 0.0)),
            Some((result("b", "en", 0.5, 0.0), 8.0)),
        ];
        let analysis = merge_chunks("m1".to_string(), Path::new("a.wav"), slots);
        assert!((analysis.confidence - 0.75).abs() < 1e-6);
    }
}
