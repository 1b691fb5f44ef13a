//! Model usage accounting records.

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::ids::JobId;

/// One ETC call's cost/performance record (§3 `ModelUsageRecord`). Appended
/// per call; never mutated — an immutable log.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ModelUsageRecord {
    pub job_id: JobId,
    pub task_type: String,
    pub model_id: String,
    pub model_provider: String,
    pub complexity: f32,
    pub cost: f64,
    pub duration_ms: u64,
    pub success: bool,
    pub recorded_at: DateTime<Utc>,
}

impl ModelUsageRecord {
    pub fn new(
        job_id: JobId,
        task_type: impl Into<String>,
        model_id: impl Into<String>,
        model_provider: impl Into<String>,
        complexity: f32,
        cost: f64,
        duration_ms: u64,
        success: bool,
    ) -> Self {
        Self {
            job_id,
            task_type: task_type.into(),
            model_id: model_id.into(),
            model_provider: model_provider.into(),
            complexity,
            cost,
            duration_ms,
            success,
            recorded_at: Utc::now(),
        }
    }
}
