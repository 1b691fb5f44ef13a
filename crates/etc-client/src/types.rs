//! Wire types for the external-task service (§4.1, §6).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use pipeline_models::{DetectedObject, SpeakerSegment, TextBox};

/// Either an immediate 200 result or a 202 task ticket.
#[derive(Debug)]
pub enum SubmitOutcome<T> {
    Immediate(T),
    Accepted { task_id: String },
}

/// Body of a 202 response: `{ taskId }`.
#[derive(Debug, Clone, Deserialize)]
pub struct AcceptedBody {
    #[serde(rename = "taskId")]
    pub task_id: String,
}

/// Terminal and non-terminal task states (§4.1: "terminal (completed,
/// failed, timeout)").
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Queued,
    Processing,
    Completed,
    Failed,
    Timeout,
}

impl TaskStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, TaskStatus::Completed | TaskStatus::Failed | TaskStatus::Timeout)
    }
}

/// `GET /tasks/{taskId}` envelope: `{ success, data: { task: {...} } }`.
#[derive(Debug, Clone, Deserialize)]
pub struct TaskEnvelope {
    pub success: bool,
    pub data: Option<TaskData>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TaskData {
    pub task: TaskRecord,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TaskRecord {
    pub id: String,
    pub status: TaskStatus,
    #[serde(default)]
    pub result: Option<serde_json::Value>,
    #[serde(rename = "type", default)]
    pub task_type: Option<String>,
    #[serde(default)]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub completed_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub error: Option<String>,
}

// ---- SelectModel ----

#[derive(Debug, Clone, Serialize)]
pub struct SelectModelRequest {
    pub task_type: String,
    pub complexity: f32,
    pub context: serde_json::Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub budget: Option<f64>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SelectModelResult {
    pub model_id: String,
    pub provider: String,
    pub estimated_cost: f64,
}

// ---- AnalyzeFrame ----

#[derive(Debug, Clone, Serialize)]
pub struct AnalyzeFrameRequest {
    pub base64_image: String,
    pub prompt: String,
    pub model_id: String,
    pub max_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AnalyzeFrameResult {
    #[serde(default)]
    pub objects: Vec<DetectedObject>,
    #[serde(default)]
    pub text: Vec<TextBox>,
    pub description: String,
    pub confidence: f32,
    #[serde(default)]
    pub metadata: serde_json::Value,
}

// ---- Transcribe ----

#[derive(Debug, Clone, Serialize)]
pub struct TranscribeRequest {
    pub base64_audio: String,
    pub language: String,
    pub model_id: String,
    pub enable_diarization: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TranscribeResult {
    pub transcription: String,
    pub language: String,
    pub confidence: f32,
    #[serde(default)]
    pub speakers: Vec<SpeakerSegment>,
}

// ---- Synthesize ----

#[derive(Debug, Clone, Serialize)]
pub struct SynthesizeRequest {
    pub sources: Vec<String>,
    pub format: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub objective: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SynthesizeResult {
    pub text: String,
}

// ---- Classify ----

#[derive(Debug, Clone, Serialize)]
pub struct ClassifyRequest {
    pub signals: serde_json::Value,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ClassifyResult {
    pub primary_category: String,
    pub category_scores: std::collections::HashMap<String, f32>,
    #[serde(default)]
    pub tags: Vec<String>,
    pub rating: String,
    pub is_nsfw: bool,
    pub confidence: f32,
}

// ---- ExtractTopics ----

#[derive(Debug, Clone, Serialize)]
pub struct ExtractTopicsRequest {
    pub text: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ExtractTopicsResult {
    pub topics: Vec<String>,
}

// ---- Sentiment ----

#[derive(Debug, Clone, Serialize)]
pub struct SentimentRequest {
    pub text: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SentimentResult {
    pub sentiment: String,
    pub confidence: f32,
}

// ---- GenerateEmbedding ----

#[derive(Debug, Clone, Serialize)]
pub struct GenerateEmbeddingRequest {
    pub text: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GenerateEmbeddingResult {
    pub embedding: Vec<f32>,
}

// ---- Orchestrate ----

#[derive(Debug, Clone, Serialize)]
pub struct OrchestrateRequest {
    pub goal: String,
    pub context: serde_json::Value,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OrchestrateResult {
    pub output: serde_json::Value,
}

// ---- best-effort operations ----

#[derive(Debug, Clone, Serialize)]
pub struct StoreMemoryRequest {
    pub job_id: String,
    pub key: String,
    pub value: serde_json::Value,
}

#[derive(Debug, Clone, Serialize)]
pub struct TrackUsageRequest {
    pub job_id: String,
    pub task_type: String,
    pub model_id: String,
    pub cost: f64,
    pub duration_ms: u64,
    pub success: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct HealthResponse {
    pub status: String,
}
