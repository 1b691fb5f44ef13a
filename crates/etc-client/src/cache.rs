//! In-memory model-selection cache (§5: "keyed by `(task, complexityBand,
//! qualityPref)` with TTL (default 5 min); cache may be shared across jobs
//! within a worker; writes are protected by a mutex").

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use crate::types::SelectModelResult;

/// Complexity is bucketed into coarse bands rather than cached by exact
/// float value, since nearby complexities should hit the same cache entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ComplexityBand {
    Low,
    Medium,
    High,
}

impl ComplexityBand {
    pub fn from_complexity(c: f32) -> Self {
        if c < 0.34 {
            ComplexityBand::Low
        } else if c < 0.67 {
            ComplexityBand::Medium
        } else {
            ComplexityBand::High
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct CacheKey {
    task_type: String,
    band: ComplexityBandKey,
    quality_pref: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct ComplexityBandKey(u8);

impl From<ComplexityBand> for ComplexityBandKey {
    fn from(b: ComplexityBand) -> Self {
        ComplexityBandKey(match b {
            ComplexityBand::Low => 0,
            ComplexityBand::Medium => 1,
            ComplexityBand::High => 2,
        })
    }
}

struct CacheEntry {
    result: SelectModelResult,
    inserted_at: Instant,
}

/// Mutex-protected, TTL-bounded cache for `SelectModel` results.
pub struct ModelSelectionCache {
    ttl: Duration,
    entries: Mutex<HashMap<CacheKey, CacheEntry>>,
}

impl ModelSelectionCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: Mutex::new(HashMap::new()),
        }
    }

    pub fn get(
        &self,
        task_type: &str,
        complexity: f32,
        quality_pref: &str,
    ) -> Option<SelectModelResult> {
        let key = CacheKey {
            task_type: task_type.to_string(),
            band: ComplexityBand::from_complexity(complexity).into(),
            quality_pref: quality_pref.to_string(),
        };

        let entries = self.entries.lock().expect("model selection cache poisoned");
        entries.get(&key).and_then(|entry| {
            if entry.inserted_at.elapsed() < self.ttl {
                Some(entry.result.clone())
            } else {
                None
            }
        })
    }

    pub fn put(
        &self,
        task_type: &str,
        complexity: f32,
        quality_pref: &str,
        result: SelectModelResult,
    ) {
        let key = CacheKey {
            task_type: task_type.to_string(),
            band: ComplexityBand::from_complexity(complexity).into(),
            quality_pref: quality_pref.to_string(),
        };

        let mut entries = self.entries.lock().expect("model selection cache poisoned");
        entries.insert(
            key,
            CacheEntry {
                result,
                inserted_at: Instant::now(),
            },
        );
    }
}

impl Default for ModelSelectionCache {
    fn default() -> Self {
        Self::new(Duration::from_secs(300))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_result() -> SelectModelResult {
        SelectModelResult {
            model_id: "model-a".into(),
            provider: "provider-a".into(),
            estimated_cost: 0.01,
        }
    }

    #[test]
    fn test_cache_hit_within_band() {
        let cache = ModelSelectionCache::new(Duration::from_secs(60));
        cache.put("vision", 0.5, "balanced", sample_result());
        assert!(cache.get("vision", 0.55, "balanced").is_some());
    }

    #[test]
    fn test_cache_miss_across_bands() {
        let cache = ModelSelectionCache::new(Duration::from_secs(60));
        cache.put("vision", 0.1, "balanced", sample_result());
        assert!(cache.get("vision", 0.9, "balanced").is_none());
    }

    #[test]
    fn test_cache_expires() {
        let cache = ModelSelectionCache::new(Duration::from_millis(1));
        cache.put("vision", 0.5, "balanced", sample_result());
        std::thread::sleep(Duration::from_millis(10));
        assert!(cache.get("vision", 0.5, "balanced").is_none());
    }
}
