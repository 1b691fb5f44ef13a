//! Content classification results.

use std::collections::HashMap;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Content classification for a job (§3 `Classification`). One per job
/// when requested.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct Classification {
    pub primary_category: String,
    pub category_scores: HashMap<String, f32>,
    #[serde(default)]
    pub tags: Vec<String>,
    pub rating: String,
    pub is_nsfw: bool,
    pub confidence: f32,
    pub model_id: String,
}

impl Classification {
    /// Category scores `∈ [0,1]` (§3 invariant).
    pub fn is_valid(&self) -> bool {
        self.category_scores.values().all(|s| (0.0..=1.0).contains(s))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_scores() {
        let mut scores = HashMap::new();
        scores.insert("education".to_string(), 0.8);
        let classification = Classification {
            primary_category: "education".into(),
            category_scores: scores,
            tags: vec![],
            rating: "general".into(),
            is_nsfw: false,
            confidence: 0.8,
            model_id: "m1".into(),
        };
        assert!(classification.is_valid());
    }
}
