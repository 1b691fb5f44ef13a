//! Persistence port for the pipeline engine: typed repositories over a
//! relational document store plus a vector index for frame/scene
//! embeddings (§4.3).

mod config;
mod error;
mod relational;
mod repos;
mod vector;

pub use config::{StorageConfig, VECTOR_DIMENSION};
pub use error::{StorageError, StorageResult};
pub use relational::{InMemoryRelationalClient, RelationalClient};
pub use repos::{
    AudioAnalysisRepository, ClassificationRepository, FrameRepository, JobRepository,
    ModelUsageRepository, ProcessingResultRepository, SceneRepository, VideoMetadataRepository,
};
pub use vector::{DistanceMetric, InMemoryVectorIndexClient, VectorIndexClient, VectorMatch, VectorPoint};

use std::sync::Arc;

/// Facade composing the typed repositories and the vector index behind the
/// relational/vector client traits the pipeline engine depends on.
pub struct StorageAdapter {
    pub jobs: JobRepository,
    pub video_metadata: VideoMetadataRepository,
    pub frames: FrameRepository,
    pub scenes: SceneRepository,
    pub audio_analysis: AudioAnalysisRepository,
    pub classifications: ClassificationRepository,
    pub processing_results: ProcessingResultRepository,
    pub model_usage: ModelUsageRepository,
    pub vector_index: Arc<dyn VectorIndexClient>,
    config: StorageConfig,
}

impl StorageAdapter {
    /// Construct the adapter over the given relational and vector clients,
    /// ensuring schema/collection setup before returning (§4.3).
    pub async fn new(
        relational: Arc<dyn RelationalClient>,
        vector_index: Arc<dyn VectorIndexClient>,
        config: StorageConfig,
    ) -> StorageResult<Self> {
        relational.ensure_schema().await?;
        vector_index.ensure_collection(config.vector_dimension, DistanceMetric::Cosine).await?;

        Ok(Self {
            jobs: JobRepository::new(relational.clone()),
            video_metadata: VideoMetadataRepository::new(relational.clone()),
            frames: FrameRepository::new(relational.clone()),
            scenes: SceneRepository::new(relational.clone()),
            audio_analysis: AudioAnalysisRepository::new(relational.clone()),
            classifications: ClassificationRepository::new(relational.clone()),
            processing_results: ProcessingResultRepository::new(relational.clone()),
            model_usage: ModelUsageRepository::new(relational),
            vector_index,
            config,
        })
    }

    pub fn config(&self) -> &StorageConfig {
        &self.config
    }

    /// Construct an in-memory adapter for tests and local development.
    pub async fn in_memory() -> StorageResult<Self> {
        Self::new(
            Arc::new(InMemoryRelationalClient::new()),
            Arc::new(InMemoryVectorIndexClient::new()),
            StorageConfig::default(),
        )
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pipeline_models::{Job, JobId, JobOptions, JobSource};

    #[tokio::test]
    async fn test_in_memory_adapter_roundtrips_a_job() {
        let adapter = StorageAdapter::in_memory().await.unwrap();
        let job = Job::new("user-1", JobSource::Url, "https://example.com/v.mp4", "v.mp4", JobOptions::default(), 1);
        let job_id = job.job_id;

        adapter.jobs.save(&job).await.unwrap();
        let fetched = adapter.jobs.get(job_id).await.unwrap();
        assert_eq!(fetched.map(|j| j.job_id), Some(job_id));
    }

    #[tokio::test]
    async fn test_in_memory_adapter_missing_job_returns_none() {
        let adapter = StorageAdapter::in_memory().await.unwrap();
        assert!(adapter.jobs.get(JobId::new()).await.unwrap().is_none());
    }
}
