use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// A normalized bounding box (0.0 to 1.0) relative to a frame (§3: `Box ⊆
/// [0,1]²`).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct NormalizedRect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl NormalizedRect {
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self { x, y, width, height }
    }

    /// Check that the box lies within the unit square, with a small
    /// epsilon for floating point accumulation.
    pub fn is_valid(&self) -> bool {
        self.x >= 0.0
            && self.y >= 0.0
            && self.width > 0.0
            && self.height > 0.0
            && self.x + self.width <= 1.001
            && self.y + self.height <= 1.001
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_rect() {
        assert!(NormalizedRect::new(0.1, 0.1, 0.5, 0.5).is_valid());
    }

    #[test]
    fn test_rect_exceeding_bounds_is_invalid() {
        assert!(!NormalizedRect::new(0.6, 0.6, 0.6, 0.6).is_valid());
    }
}
