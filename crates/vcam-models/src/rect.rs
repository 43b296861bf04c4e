use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// A normalized region (0.0 to 1.0) reported by a subject detector.
///
/// Edges are relative to the frame the detector was given, so the same
/// region applies regardless of the resolution detection ran at.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct NormalizedRegion {
    /// Left edge (0.0 = left border, 1.0 = right border)
    pub left: f64,
    /// Top edge (0.0 = top border, 1.0 = bottom border)
    pub top: f64,
    /// Right edge
    pub right: f64,
    /// Bottom edge
    pub bottom: f64,
}

impl NormalizedRegion {
    /// Create a new normalized region.
    pub fn new(left: f64, top: f64, right: f64, bottom: f64) -> Self {
        Self {
            left,
            top,
            right,
            bottom,
        }
    }

    /// Check if the region is valid (edges ordered, within 0.0-1.0 range).
    pub fn is_valid(&self) -> bool {
        self.left >= 0.0
            && self.top >= 0.0
            && self.right >= self.left
            && self.bottom >= self.top
            && self.right <= 1.001 // Allow small epsilon for float precision
            && self.bottom <= 1.001
    }

    /// Check if the region has zero area.
    pub fn is_empty(&self) -> bool {
        self.right <= self.left || self.bottom <= self.top
    }

    /// Region width.
    pub fn width(&self) -> f64 {
        self.right - self.left
    }

    /// Region height.
    pub fn height(&self) -> f64 {
        self.bottom - self.top
    }
}
