//! Data models for the auto-zoom pipeline.

use serde::{Deserialize, Serialize};
use vcam_models::NormalizedRegion;

/// Axis-aligned subject bounding box in source-frame pixel coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Region {
    /// Left edge x-coordinate
    pub left: f64,
    /// Top edge y-coordinate
    pub top: f64,
    /// Right edge x-coordinate
    pub right: f64,
    /// Bottom edge y-coordinate
    pub bottom: f64,
}

impl Region {
    /// Create a new region.
    pub fn new(left: f64, top: f64, right: f64, bottom: f64) -> Self {
        Self {
            left,
            top,
            right,
            bottom,
        }
    }

    /// Convert a detector-reported normalized region to pixel coordinates.
    pub fn from_normalized(region: &NormalizedRegion, frame_width: u32, frame_height: u32) -> Self {
        let w = frame_width as f64;
        let h = frame_height as f64;
        Self {
            left: region.left * w,
            top: region.top * h,
            right: region.right * w,
            bottom: region.bottom * h,
        }
    }

    /// Region width.
    #[inline]
    pub fn width(&self) -> f64 {
        self.right - self.left
    }

    /// Region height.
    #[inline]
    pub fn height(&self) -> f64 {
        self.bottom - self.top
    }

    /// Center x-coordinate.
    #[inline]
    pub fn cx(&self) -> f64 {
        (self.left + self.right) / 2.0
    }

    /// Center y-coordinate.
    #[inline]
    pub fn cy(&self) -> f64 {
        (self.top + self.bottom) / 2.0
    }

    /// Whether the region has no usable area.
    pub fn is_empty(&self) -> bool {
        self.width() <= 0.0 || self.height() <= 0.0
    }
}

/// A single detector result: the best subject region plus its confidence.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Detection {
    /// Subject bounding box in source-frame pixels.
    pub region: Region,
    /// Detector confidence score (0.0-1.0).
    pub confidence: f64,
}

impl Detection {
    /// Create a new detection.
    pub fn new(region: Region, confidence: f64) -> Self {
        Self { region, confidence }
    }
}

/// The live crop rectangle: the sub-region of the source frame mapped
/// onto the fixed output resolution.
///
/// Treated as an immutable value everywhere. Shared state holding a
/// `CropRect` is replaced whole, never mutated field by field, so a
/// concurrent reader always observes a fully-formed rectangle.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CropRect {
    pub left: f64,
    pub top: f64,
    pub right: f64,
    pub bottom: f64,
}

impl CropRect {
    /// Create a new crop rectangle.
    pub fn new(left: f64, top: f64, right: f64, bottom: f64) -> Self {
        Self {
            left,
            top,
            right,
            bottom,
        }
    }

    /// Neutral baseline: the middle 50% of a frame on each axis.
    pub fn centered_default(frame_width: u32, frame_height: u32) -> Self {
        let w = frame_width as f64;
        let h = frame_height as f64;
        Self {
            left: w * 0.25,
            top: h * 0.25,
            right: w * 0.75,
            bottom: h * 0.75,
        }
    }

    /// Rectangle width.
    #[inline]
    pub fn width(&self) -> f64 {
        self.right - self.left
    }

    /// Rectangle height.
    #[inline]
    pub fn height(&self) -> f64 {
        self.bottom - self.top
    }

    /// Center x-coordinate.
    #[inline]
    pub fn cx(&self) -> f64 {
        (self.left + self.right) / 2.0
    }

    /// Center y-coordinate.
    #[inline]
    pub fn cy(&self) -> f64 {
        (self.top + self.bottom) / 2.0
    }

    /// Width / height ratio.
    #[inline]
    pub fn aspect(&self) -> f64 {
        self.width() / self.height()
    }

    /// Rebuild a rectangle of the given size around the same center.
    pub fn with_size_about_center(&self, width: f64, height: f64) -> Self {
        let cx = self.cx();
        let cy = self.cy();
        Self {
            left: cx - width / 2.0,
            top: cy - height / 2.0,
            right: cx + width / 2.0,
            bottom: cy + height / 2.0,
        }
    }

    /// Componentwise linear interpolation toward `target`.
    pub fn lerp_toward(&self, target: &CropRect, t: f64) -> Self {
        Self {
            left: lerp(self.left, target.left, t),
            top: lerp(self.top, target.top, t),
            right: lerp(self.right, target.right, t),
            bottom: lerp(self.bottom, target.bottom, t),
        }
    }

    /// Largest absolute edge difference against `other`.
    pub fn max_edge_delta(&self, other: &CropRect) -> f64 {
        (self.left - other.left)
            .abs()
            .max((self.top - other.top).abs())
            .max((self.right - other.right).abs())
            .max((self.bottom - other.bottom).abs())
    }

    /// Clamp all edges into `[0, frame_width] x [0, frame_height]`,
    /// shifting the rectangle to preserve its size (and center where
    /// possible) before trimming anything that still cannot fit.
    pub fn clamp(&self, frame_width: u32, frame_height: u32) -> Self {
        let fw = frame_width as f64;
        let fh = frame_height as f64;

        let width = self.width().min(fw);
        let height = self.height().min(fh);

        let mut left = self.cx() - width / 2.0;
        let mut top = self.cy() - height / 2.0;
        left = left.max(0.0).min(fw - width);
        top = top.max(0.0).min(fh - height);

        Self {
            left,
            top,
            right: left + width,
            bottom: top + height,
        }
    }
}

#[inline]
fn lerp(a: f64, b: f64, t: f64) -> f64 {
    a + (b - a) * t
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_region_from_normalized() {
        let n = NormalizedRegion::new(0.25, 0.5, 0.75, 1.0);
        let r = Region::from_normalized(&n, 1000, 800);
        assert_eq!(r, Region::new(250.0, 400.0, 750.0, 800.0));
    }

    #[test]
    fn test_centered_default() {
        let rect = CropRect::centered_default(640, 480);
        assert_eq!(rect, CropRect::new(160.0, 120.0, 480.0, 360.0));
    }

    #[test]
    fn test_lerp_toward() {
        let a = CropRect::new(0.0, 0.0, 100.0, 100.0);
        let b = CropRect::new(100.0, 100.0, 200.0, 200.0);
        let mid = a.lerp_toward(&b, 0.5);
        assert_eq!(mid, CropRect::new(50.0, 50.0, 150.0, 150.0));
        // t = 1 lands exactly on the target
        assert_eq!(a.lerp_toward(&b, 1.0), b);
    }

    #[test]
    fn test_max_edge_delta() {
        let a = CropRect::new(0.0, 0.0, 100.0, 100.0);
        let b = CropRect::new(10.0, -5.0, 100.0, 130.0);
        assert_eq!(a.max_edge_delta(&b), 30.0);
    }

    #[test]
    fn test_clamp_shifts_before_trimming() {
        // Same size as the frame but offset: clamp slides it back inside.
        let rect = CropRect::new(-50.0, 20.0, 590.0, 500.0);
        let clamped = rect.clamp(640, 480);
        assert_eq!(clamped, CropRect::new(0.0, 0.0, 640.0, 480.0));
    }

    #[test]
    fn test_clamp_oversized() {
        let rect = CropRect::new(-100.0, -100.0, 900.0, 700.0);
        let clamped = rect.clamp(640, 480);
        assert_eq!(clamped, CropRect::new(0.0, 0.0, 640.0, 480.0));
    }
}
