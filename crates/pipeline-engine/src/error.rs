//! Pipeline-engine error taxonomy (§7), scoped to DAG validation and stage
//! execution. Stage-level recovery for *tolerant* stages happens before an
//! error ever reaches this type (§4.5); what does reach it is always fatal
//! to the job.

use thiserror::Error;

use etc_client::EtcError;
use media_toolkit::MediaError;
use storage_adapter::StorageError;

pub type PipelineResult<T> = Result<T, PipelineError>;

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("dependency unmet: stage '{stage}' requires '{missing}'")]
    DependencyUnmet { stage: String, missing: String },

    #[error("media error: {0}")]
    Media(#[from] MediaError),

    #[error("model service error: {0}")]
    Etc(#[from] EtcError),

    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("job cancelled")]
    Cancelled,

    #[error("fatal: {0}")]
    Fatal(String),
}

impl PipelineError {
    /// `{code, message}` surfaced on the status contract (§6, §7).
    pub fn code(&self) -> &'static str {
        match self {
            PipelineError::DependencyUnmet { .. } => "dependency_unmet",
            PipelineError::Media(_) => "media_error",
            PipelineError::Etc(_) => "model_service_error",
            PipelineError::Storage(_) => "storage_error",
            PipelineError::Cancelled => "cancelled",
            PipelineError::Fatal(_) => "fatal",
        }
    }

    pub fn dependency_unmet(stage: impl Into<String>, missing: impl Into<String>) -> Self {
        Self::DependencyUnmet {
            stage: stage.into(),
            missing: missing.into(),
        }
    }
}
