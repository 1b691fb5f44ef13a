//! scene_detection (§4.5 stage 6, tolerant §4.5/§9): group adjacent
//! analysed frames into scenes by embedding similarity, falling back to a
//! coarser heuristic when embeddings are unavailable.

use pipeline_models::{Frame, ModelUsageRecord, Scene};

use crate::context::PipelineContext;
use crate::error::PipelineResult;

const SIMILARITY_BREAK_THRESHOLD: f32 = 0.85;
const OBJECT_COUNT_BREAK_DELTA: usize = 5;
const LOW_CONFIDENCE_BREAK: f32 = 0.5;

pub async fn run(ctx: &PipelineContext, frames: &[Frame]) -> PipelineResult<(Vec<Scene>, Vec<ModelUsageRecord>)> {
    if frames.is_empty() {
        return Ok((Vec::new(), Vec::new()));
    }

    let boundaries = scene_boundaries(frames);
    let mut scenes = Vec::with_capacity(boundaries.len());
    let mut usage = Vec::new();

    for (start, end) in boundaries {
        let run = &frames[start..=end];
        let keyframe = &run[0];
        let (description, records) = describe_scene(ctx, run).await;
        usage.extend(records);

        let confidence = {
            let analysed: Vec<f32> = run.iter().filter(|f| !f.is_errored()).map(|f| f.confidence).collect();
            if analysed.is_empty() {
                0.0
            } else {
                analysed.iter().sum::<f32>() / analysed.len() as f32
            }
        };

        scenes.push(Scene::new(
            keyframe.frame_number,
            run.last().expect("non-empty run").frame_number,
            keyframe.timestamp,
            run.last().expect("non-empty run").timestamp,
            keyframe.frame_id,
            description,
            confidence,
        ));
    }

    ctx.storage.scenes.save_many(ctx.job.job_id, &scenes).await?;
    Ok((scenes, usage))
}

/// Returns `(start_index, end_index)` pairs over `frames`, inclusive.
fn scene_boundaries(frames: &[Frame]) -> Vec<(usize, usize)> {
    let mut boundaries = Vec::new();
    let mut start = 0;

    for i in 1..frames.len() {
        if is_scene_break(&frames[i - 1], &frames[i]) {
            boundaries.push((start, i - 1));
            start = i;
        }
    }
    boundaries.push((start, frames.len() - 1));
    boundaries
}

fn is_scene_break(prev: &Frame, curr: &Frame) -> bool {
    match (&prev.embedding, &curr.embedding) {
        (Some(a), Some(b)) => cosine_similarity(a, b) < SIMILARITY_BREAK_THRESHOLD,
        _ => {
            let object_delta = (prev.objects.len() as isize - curr.objects.len() as isize).unsigned_abs();
            object_delta > OBJECT_COUNT_BREAK_DELTA || curr.confidence < LOW_CONFIDENCE_BREAK
        }
    }
}

fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a * norm_b)
}

/// Synthesizes a scene description from its frames' own descriptions. A
/// scene with no successfully analysed frames gets an empty description
/// instead of calling out (§9 open question: degrade rather than fail the
/// stage).
async fn describe_scene(ctx: &PipelineContext, run: &[Frame]) -> (String, Vec<ModelUsageRecord>) {
    let sources: Vec<String> = run.iter().filter_map(|f| f.description.clone()).collect();
    if sources.is_empty() {
        return (String::new(), Vec::new());
    }

    let started = std::time::Instant::now();
    match ctx
        .etc
        .synthesize(sources, "summary", Some("describe this scene in one sentence".to_string()), &ctx.cancel)
        .await
    {
        Ok(text) => {
            let usage = vec![ModelUsageRecord::new(
                ctx.job.job_id,
                "scene_description",
                "synthesize".to_string(),
                "etc".to_string(),
                0.0,
                0.0,
                started.elapsed().as_millis() as u64,
                true,
            )];
            (text, usage)
        }
        Err(e) => {
            tracing::warn!("scene description synthesis failed: {}", e);
            (String::new(), Vec::new())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pipeline_models::JobId;

    fn frame_with(job_id: JobId, number: u32, embedding: Option<Vec<f32>>, confidence: f32) -> Frame {
        let mut f = Frame::new(job_id, number as f64, number, format!("frame-{number}.jpg"));
        f.embedding = embedding;
        f.confidence = confidence;
        f
    }

    #[test]
    fn test_identical_embeddings_stay_in_one_scene() {
        let job_id = JobId::new();
        let frames = vec![
            frame_with(job_id, 0, Some(vec![1.0, 0.0]), 0.9),
            frame_with(job_id, 1, Some(vec![1.0, 0.0]), 0.9),
        ];
        assert_eq!(scene_boundaries(&frames), vec![(0, 1)]);
    }

    #[test]
    fn test_orthogonal_embeddings_split_into_two_scenes() {
        let job_id = JobId::new();
        let frames = vec![
            frame_with(job_id, 0, Some(vec![1.0, 0.0]), 0.9),
            frame_with(job_id, 1, Some(vec![0.0, 1.0]), 0.9),
        ];
        assert_eq!(scene_boundaries(&frames), vec![(0, 0), (1, 1)]);
    }

    #[test]
    fn test_missing_embeddings_fall_back_to_object_count_heuristic() {
        let job_id = JobId::new();
        let mut a = frame_with(job_id, 0, None, 0.9);
        a.objects = vec![];
        let mut b = frame_with(job_id, 1, None, 0.9);
        b.objects = (0..6)
            .map(|i| pipeline_models::DetectedObject {
                label: format!("obj-{i}"),
                confidence: 0.9,
                bounding_box: pipeline_models::NormalizedRect { x: 0.0, y: 0.0, width: 0.1, height: 0.1 },
            })
            .collect();
        assert_eq!(scene_boundaries(&[a, b]), vec![(0, 0), (1, 1)]);
    }

    #[test]
    fn test_low_confidence_frame_without_embedding_breaks_scene() {
        let job_id = JobId::new();
        let a = frame_with(job_id, 0, None, 0.9);
        let b = frame_with(job_id, 1, None, 0.2);
        assert_eq!(scene_boundaries(&[a, b]), vec![(0, 0), (1, 1)]);
    }
}
