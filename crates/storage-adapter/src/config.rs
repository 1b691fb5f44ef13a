//! Storage adapter configuration (§4.3).

/// Embedding dimension the vector index is fixed to (§4.3 documented value).
pub const VECTOR_DIMENSION: usize = 1024;

#[derive(Debug, Clone)]
pub struct StorageConfig {
    pub vector_dimension: usize,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self { vector_dimension: VECTOR_DIMENSION }
    }
}

impl StorageConfig {
    pub fn from_env() -> Self {
        Self {
            vector_dimension: std::env::var("VECTOR_DIMENSION")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(VECTOR_DIMENSION),
        }
    }
}
