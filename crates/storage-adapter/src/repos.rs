//! Typed repositories wrapping `RelationalClient` with `pipeline_models`
//! entity (de)serialization, mirroring the teacher's `VideoRepository` /
//! `ClipRepository` (collection path + doc id + fields map) but genericized
//! over `serde_json::Value` rather than a Firestore-specific value system.

use std::sync::Arc;
use std::time::Duration;

use pipeline_models::{
    AudioAnalysis, Classification, Frame, FrameId, Job, JobId, ModelUsageRecord, ProcessingResult,
    Scene, SceneId, VideoMetadata,
};
use pipeline_support::{retry_async, RetryConfig};

use crate::error::{StorageError, StorageResult};
use crate::relational::RelationalClient;

fn retry_config(operation: &str) -> RetryConfig {
    RetryConfig::new(format!("storage:{operation}"))
        .with_max_retries(3)
        .with_base_delay(Duration::from_millis(100))
        .with_max_delay(Duration::from_secs(2))
}

async fn with_retry<T, F, Fut>(operation: &str, f: F) -> StorageResult<T>
where
    F: Fn() -> Fut,
    Fut: std::future::Future<Output = StorageResult<T>>,
{
    let config = retry_config(operation);
    retry_async(&config, StorageError::is_retryable, f).await.into_result()
}

fn decode<T: serde::de::DeserializeOwned>(value: serde_json::Value) -> StorageResult<T> {
    Ok(serde_json::from_value(value)?)
}

/// Repository for job records, keyed by `job_id` (§3 `Job`).
pub struct JobRepository {
    client: Arc<dyn RelationalClient>,
}

impl JobRepository {
    const COLLECTION: &'static str = "jobs";

    pub fn new(client: Arc<dyn RelationalClient>) -> Self {
        Self { client }
    }

    pub async fn get(&self, job_id: JobId) -> StorageResult<Option<Job>> {
        let doc_id = job_id.to_string();
        let doc = with_retry("jobs.get", || self.client.get_document(Self::COLLECTION, &doc_id)).await?;
        doc.map(decode).transpose()
    }

    pub async fn save(&self, job: &Job) -> StorageResult<()> {
        let doc_id = job.job_id.to_string();
        let fields = serde_json::to_value(job)?;
        with_retry("jobs.save", || self.client.upsert_document(Self::COLLECTION, &doc_id, fields.clone())).await
    }

    pub async fn delete(&self, job_id: JobId) -> StorageResult<()> {
        let doc_id = job_id.to_string();
        with_retry("jobs.delete", || self.client.delete_document(Self::COLLECTION, &doc_id)).await
    }
}

/// Repository for the (at most one) `VideoMetadata` record per job.
pub struct VideoMetadataRepository {
    client: Arc<dyn RelationalClient>,
}

impl VideoMetadataRepository {
    const COLLECTION: &'static str = "video_metadata";

    pub fn new(client: Arc<dyn RelationalClient>) -> Self {
        Self { client }
    }

    pub async fn get(&self, job_id: JobId) -> StorageResult<Option<VideoMetadata>> {
        let doc_id = job_id.to_string();
        let doc = with_retry("video_metadata.get", || self.client.get_document(Self::COLLECTION, &doc_id)).await?;
        doc.map(decode).transpose()
    }

    pub async fn save(&self, job_id: JobId, metadata: &VideoMetadata) -> StorageResult<()> {
        let doc_id = job_id.to_string();
        let fields = serde_json::to_value(metadata)?;
        with_retry("video_metadata.save", || {
            self.client.upsert_document(Self::COLLECTION, &doc_id, fields.clone())
        })
        .await
    }
}

/// Repository for sampled frames, keyed by `{job_id}:{frame_id}` so
/// `list_by_job` can filter on the `job_id` prefix (§3 `Frame`).
pub struct FrameRepository {
    client: Arc<dyn RelationalClient>,
}

impl FrameRepository {
    const COLLECTION: &'static str = "frames";

    pub fn new(client: Arc<dyn RelationalClient>) -> Self {
        Self { client }
    }

    fn doc_id(job_id: JobId, frame_id: FrameId) -> String {
        format!("{job_id}:{frame_id}")
    }

    pub async fn save(&self, frame: &Frame) -> StorageResult<()> {
        let doc_id = Self::doc_id(frame.job_id, frame.frame_id);
        let fields = serde_json::to_value(frame)?;
        with_retry("frames.save", || self.client.upsert_document(Self::COLLECTION, &doc_id, fields.clone())).await
    }

    pub async fn save_many(&self, frames: &[Frame]) -> StorageResult<()> {
        let writes = frames
            .iter()
            .map(|f| Ok((Self::COLLECTION.to_string(), Self::doc_id(f.job_id, f.frame_id), serde_json::to_value(f)?)))
            .collect::<StorageResult<Vec<_>>>()?;
        with_retry("frames.save_many", || self.client.transaction(writes.clone())).await
    }

    pub async fn list_by_job(&self, job_id: JobId) -> StorageResult<Vec<Frame>> {
        let prefix = format!("{job_id}:");
        let docs = with_retry("frames.list_by_job", || self.client.list_documents(Self::COLLECTION, &prefix)).await?;
        docs.into_iter().map(decode).collect()
    }
}

/// Repository for detected scenes, keyed the same way as `FrameRepository`.
pub struct SceneRepository {
    client: Arc<dyn RelationalClient>,
}

impl SceneRepository {
    const COLLECTION: &'static str = "scenes";

    pub fn new(client: Arc<dyn RelationalClient>) -> Self {
        Self { client }
    }

    fn doc_id(job_id: JobId, scene_id: SceneId) -> String {
        format!("{job_id}:{scene_id}")
    }

    pub async fn save_many(&self, job_id: JobId, scenes: &[Scene]) -> StorageResult<()> {
        let writes = scenes
            .iter()
            .map(|s| Ok((Self::COLLECTION.to_string(), Self::doc_id(job_id, s.scene_id), serde_json::to_value(s)?)))
            .collect::<StorageResult<Vec<_>>>()?;
        with_retry("scenes.save_many", || self.client.transaction(writes.clone())).await
    }

    pub async fn list_by_job(&self, job_id: JobId) -> StorageResult<Vec<Scene>> {
        let prefix = format!("{job_id}:");
        let docs = with_retry("scenes.list_by_job", || self.client.list_documents(Self::COLLECTION, &prefix)).await?;
        docs.into_iter().map(decode).collect()
    }
}

/// Repository for the (at most one) `AudioAnalysis` record per job.
pub struct AudioAnalysisRepository {
    client: Arc<dyn RelationalClient>,
}

impl AudioAnalysisRepository {
    const COLLECTION: &'static str = "audio_analysis";

    pub fn new(client: Arc<dyn RelationalClient>) -> Self {
        Self { client }
    }

    pub async fn get(&self, job_id: JobId) -> StorageResult<Option<AudioAnalysis>> {
        let doc_id = job_id.to_string();
        let doc = with_retry("audio_analysis.get", || self.client.get_document(Self::COLLECTION, &doc_id)).await?;
        doc.map(decode).transpose()
    }

    pub async fn save(&self, job_id: JobId, analysis: &AudioAnalysis) -> StorageResult<()> {
        let doc_id = job_id.to_string();
        let fields = serde_json::to_value(analysis)?;
        with_retry("audio_analysis.save", || {
            self.client.upsert_document(Self::COLLECTION, &doc_id, fields.clone())
        })
        .await
    }
}

/// Repository for the (at most one) `Classification` record per job.
pub struct ClassificationRepository {
    client: Arc<dyn RelationalClient>,
}

impl ClassificationRepository {
    const COLLECTION: &'static str = "classifications";

    pub fn new(client: Arc<dyn RelationalClient>) -> Self {
        Self { client }
    }

    pub async fn get(&self, job_id: JobId) -> StorageResult<Option<Classification>> {
        let doc_id = job_id.to_string();
        let doc = with_retry("classifications.get", || self.client.get_document(Self::COLLECTION, &doc_id)).await?;
        doc.map(decode).transpose()
    }

    pub async fn save(&self, job_id: JobId, classification: &Classification) -> StorageResult<()> {
        let doc_id = job_id.to_string();
        let fields = serde_json::to_value(classification)?;
        with_retry("classifications.save", || {
            self.client.upsert_document(Self::COLLECTION, &doc_id, fields.clone())
        })
        .await
    }
}

/// Repository for the terminal `ProcessingResult`, written once per
/// successful job (§3 `ProcessingResult`).
pub struct ProcessingResultRepository {
    client: Arc<dyn RelationalClient>,
}

impl ProcessingResultRepository {
    const COLLECTION: &'static str = "processing_results";

    pub fn new(client: Arc<dyn RelationalClient>) -> Self {
        Self { client }
    }

    pub async fn get(&self, job_id: JobId) -> StorageResult<Option<ProcessingResult>> {
        let doc_id = job_id.to_string();
        let doc =
            with_retry("processing_results.get", || self.client.get_document(Self::COLLECTION, &doc_id)).await?;
        doc.map(decode).transpose()
    }

    pub async fn save(&self, result: &ProcessingResult) -> StorageResult<()> {
        let doc_id = result.job_id.to_string();
        let fields = serde_json::to_value(result)?;
        with_retry("processing_results.save", || {
            self.client.upsert_document(Self::COLLECTION, &doc_id, fields.clone())
        })
        .await
    }
}

/// Append-only repository for model usage accounting (§3
/// `ModelUsageRecord`). Never updated, only appended and listed.
pub struct ModelUsageRepository {
    client: Arc<dyn RelationalClient>,
}

impl ModelUsageRepository {
    const COLLECTION: &'static str = "model_usage";

    pub fn new(client: Arc<dyn RelationalClient>) -> Self {
        Self { client }
    }

    pub async fn append(&self, record: &ModelUsageRecord) -> StorageResult<()> {
        let doc_id = format!("{}:{}", record.job_id, uuid::Uuid::new_v4());
        let fields = serde_json::to_value(record)?;
        with_retry("model_usage.append", || {
            self.client.upsert_document(Self::COLLECTION, &doc_id, fields.clone())
        })
        .await
    }

    pub async fn list_by_job(&self, job_id: JobId) -> StorageResult<Vec<ModelUsageRecord>> {
        let prefix = format!("{job_id}:");
        let docs =
            with_retry("model_usage.list_by_job", || self.client.list_documents(Self::COLLECTION, &prefix)).await?;
        docs.into_iter().map(decode).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::relational::InMemoryRelationalClient;
    use pipeline_models::{JobOptions, JobSource};

    fn client() -> Arc<dyn RelationalClient> {
        Arc::new(InMemoryRelationalClient::new())
    }

    #[tokio::test]
    async fn test_job_repository_save_and_get_roundtrip() {
        let repo = JobRepository::new(client());
        let job = Job::new("user-1", JobSource::Url, "https://example.com/v.mp4", "v.mp4", JobOptions::default(), 5);
        let job_id = job.job_id;

        repo.save(&job).await.unwrap();
        let fetched = repo.get(job_id).await.unwrap().expect("job should exist");
        assert_eq!(fetched.job_id, job_id);
        assert_eq!(fetched.user_id, "user-1");
    }

    #[tokio::test]
    async fn test_job_repository_get_missing_returns_none() {
        let repo = JobRepository::new(client());
        assert!(repo.get(JobId::new()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_frame_repository_list_by_job_excludes_other_jobs() {
        let repo = FrameRepository::new(client());
        let job_a = JobId::new();
        let job_b = JobId::new();

        let frames_a = vec![Frame::new(job_a, 0.0, 0, "/tmp/a0.jpg"), Frame::new(job_a, 1.0, 1, "/tmp/a1.jpg")];
        let frames_b = vec![Frame::new(job_b, 0.0, 0, "/tmp/b0.jpg")];

        repo.save_many(&frames_a).await.unwrap();
        repo.save_many(&frames_b).await.unwrap();

        let fetched = repo.list_by_job(job_a).await.unwrap();
        assert_eq!(fetched.len(), 2);
        assert!(fetched.iter().all(|f| f.job_id == job_a));
    }

    #[tokio::test]
    async fn test_model_usage_repository_is_append_only_and_listable() {
        let repo = ModelUsageRepository::new(client());
        let job_id = JobId::new();

        repo.append(&ModelUsageRecord::new(job_id, "frame_analysis", "m1", "acme", 0.5, 0.01, 120, true))
            .await
            .unwrap();
        repo.append(&ModelUsageRecord::new(job_id, "frame_analysis", "m1", "acme", 0.5, 0.01, 130, true))
            .await
            .unwrap();

        let records = repo.list_by_job(job_id).await.unwrap();
        assert_eq!(records.len(), 2);
    }
}
