//! `VectorIndexClient`: upsert/search port over the frame/scene embedding
//! index (§4.3). Transport-shaped like the teacher's `R2Client` (typed
//! config from env, retried via the shared backoff primitive) even though
//! the operations are vector-search specific rather than blob storage.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use pipeline_models::FrameId;

use crate::error::{StorageError, StorageResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DistanceMetric {
    Cosine,
}

#[derive(Debug, Clone)]
pub struct VectorPoint {
    pub frame_id: FrameId,
    pub embedding: Vec<f32>,
    pub metadata: HashMap<String, String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct VectorMatch {
    pub frame_id: FrameId,
    pub score: f32,
    pub metadata: HashMap<String, String>,
}

#[async_trait]
pub trait VectorIndexClient: Send + Sync {
    /// Create the collection if missing, fixed at `dimension` (documented
    /// value 1024) with the given distance metric (§4.3).
    async fn ensure_collection(&self, dimension: usize, distance: DistanceMetric) -> StorageResult<()>;

    async fn upsert(&self, points: Vec<VectorPoint>) -> StorageResult<()>;

    async fn search(&self, vector: &[f32], top_k: usize) -> StorageResult<Vec<VectorMatch>>;
}

#[derive(Default)]
pub struct InMemoryVectorIndexClient {
    dimension: Mutex<Option<usize>>,
    points: Mutex<Vec<VectorPoint>>,
}

impl InMemoryVectorIndexClient {
    pub fn new() -> Self {
        Self::default()
    }
}

fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a * norm_b)
}

#[async_trait]
impl VectorIndexClient for InMemoryVectorIndexClient {
    async fn ensure_collection(&self, dimension: usize, _distance: DistanceMetric) -> StorageResult<()> {
        *self.dimension.lock().expect("vector lock poisoned") = Some(dimension);
        Ok(())
    }

    async fn upsert(&self, points: Vec<VectorPoint>) -> StorageResult<()> {
        let dimension = *self.dimension.lock().expect("vector lock poisoned");
        if let Some(dim) = dimension {
            if let Some(bad) = points.iter().find(|p| p.embedding.len() != dim) {
                return Err(StorageError::VectorIndex(format!(
                    "embedding for frame {} has dimension {}, expected {}",
                    bad.frame_id,
                    bad.embedding.len(),
                    dim
                )));
            }
        }

        let mut stored = self.points.lock().expect("vector lock poisoned");
        for point in points {
            if let Some(existing) = stored.iter_mut().find(|p| p.frame_id == point.frame_id) {
                *existing = point;
            } else {
                stored.push(point);
            }
        }
        Ok(())
    }

    async fn search(&self, vector: &[f32], top_k: usize) -> StorageResult<Vec<VectorMatch>> {
        let stored = self.points.lock().expect("vector lock poisoned");
        let mut scored: Vec<VectorMatch> = stored
            .iter()
            .map(|p| VectorMatch {
                frame_id: p.frame_id,
                score: cosine_similarity(vector, &p.embedding),
                metadata: p.metadata.clone(),
            })
            .collect();

        scored.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
        scored.truncate(top_k);
        Ok(scored)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_search_returns_top_k_ordered_by_similarity() {
        let client = InMemoryVectorIndexClient::new();
        client.ensure_collection(3, DistanceMetric::Cosine).await.unwrap();

        client
            .upsert(vec![
                VectorPoint { frame_id: FrameId::new(), embedding: vec![1.0, 0.0, 0.0], metadata: HashMap::new() },
                VectorPoint { frame_id: FrameId::new(), embedding: vec![0.0, 1.0, 0.0], metadata: HashMap::new() },
                VectorPoint { frame_id: FrameId::new(), embedding: vec![0.9, 0.1, 0.0], metadata: HashMap::new() },
            ])
            .await
            .unwrap();

        let results = client.search(&[1.0, 0.0, 0.0], 2).await.unwrap();
        assert_eq!(results.len(), 2);
        assert!(results[0].score >= results[1].score);
    }

    #[tokio::test]
    async fn test_upsert_rejects_mismatched_dimension() {
        let client = InMemoryVectorIndexClient::new();
        client.ensure_collection(4, DistanceMetric::Cosine).await.unwrap();

        let result = client
            .upsert(vec![VectorPoint { frame_id: FrameId::new(), embedding: vec![1.0, 0.0], metadata: HashMap::new() }])
            .await;

        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_upsert_overwrites_existing_point() {
        let client = InMemoryVectorIndexClient::new();
        client.ensure_collection(2, DistanceMetric::Cosine).await.unwrap();
        let frame_id = FrameId::new();

        client
            .upsert(vec![VectorPoint { frame_id, embedding: vec![1.0, 0.0], metadata: HashMap::new() }])
            .await
            .unwrap();
        client
            .upsert(vec![VectorPoint { frame_id, embedding: vec![0.0, 1.0], metadata: HashMap::new() }])
            .await
            .unwrap();

        let results = client.search(&[0.0, 1.0], 5).await.unwrap();
        assert_eq!(results.len(), 1);
        assert!((results[0].score - 1.0).abs() < 0.001);
    }
}
