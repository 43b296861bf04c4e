//! Subject detection ports.
//!
//! The pipeline consumes detectors through the [`SubjectDetector`] trait:
//! one image and one monotonic timestamp in, at most one region out.
//! Face detectors, landmark detectors and person segmenters all fit the
//! same contract; [`SegmenterDetector`] adapts a mask-producing
//! [`Segmenter`] by deriving the bounding region of its foreground cells.

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::{PipelineError, PipelineResult};
use crate::frame::VideoFrame;
use crate::models::{Detection, Region};

/// Uniform interface to an external subject detector.
///
/// Implementations must be callable from a worker task distinct from the
/// frame-delivery thread. A failed call is treated as an empty result by
/// the scheduler.
#[async_trait]
pub trait SubjectDetector: Send + Sync {
    /// Detect the single best subject in `frame`.
    async fn detect(
        &self,
        frame: &VideoFrame,
        timestamp_ms: i64,
    ) -> PipelineResult<Option<Detection>>;

    /// Release detector resources. Called once at pipeline shutdown.
    async fn close(&self) {}

    /// Human-readable name for logging.
    fn name(&self) -> &'static str {
        "detector"
    }
}

/// Per-cell foreground confidence mask produced by a person segmenter.
///
/// The grid may be coarser than the frame; cell coordinates are scaled
/// to frame pixels when a bounding region is derived.
#[derive(Debug, Clone)]
pub struct ForegroundMask {
    width: u32,
    height: u32,
    values: Vec<f32>,
}

impl ForegroundMask {
    /// Build a mask from row-major per-cell confidences.
    pub fn new(width: u32, height: u32, values: Vec<f32>) -> PipelineResult<Self> {
        if width == 0 || height == 0 {
            return Err(PipelineError::invalid_frame(format!(
                "mask grid must be non-empty, got {}x{}",
                width, height
            )));
        }
        if values.len() != (width * height) as usize {
            return Err(PipelineError::invalid_frame(format!(
                "mask has {} cells, expected {}",
                values.len(),
                width * height
            )));
        }
        Ok(Self {
            width,
            height,
            values,
        })
    }

    /// Grid width in cells.
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Grid height in cells.
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Confidence at (x, y), row-major.
    pub fn value_at(&self, x: u32, y: u32) -> f32 {
        self.values[(y * self.width + x) as usize]
    }

    /// Bounding box of all cells at or above `threshold`, scaled to
    /// `frame_width` x `frame_height` pixels. Returns `None` when no
    /// cell clears the threshold.
    pub fn bounding_region(
        &self,
        threshold: f32,
        frame_width: u32,
        frame_height: u32,
    ) -> Option<(Region, f64)> {
        let mut min_x = u32::MAX;
        let mut min_y = u32::MAX;
        let mut max_x = 0u32;
        let mut max_y = 0u32;
        let mut sum = 0.0f64;
        let mut count = 0u32;

        for y in 0..self.height {
            for x in 0..self.width {
                let v = self.value_at(x, y);
                if v >= threshold {
                    min_x = min_x.min(x);
                    min_y = min_y.min(y);
                    max_x = max_x.max(x);
                    max_y = max_y.max(y);
                    sum += v as f64;
                    count += 1;
                }
            }
        }

        if count == 0 {
            return None;
        }

        let sx = frame_width as f64 / self.width as f64;
        let sy = frame_height as f64 / self.height as f64;
        // Cell (x, y) covers pixel span [x*sx, (x+1)*sx).
        let region = Region::new(
            min_x as f64 * sx,
            min_y as f64 * sy,
            (max_x + 1) as f64 * sx,
            (max_y + 1) as f64 * sy,
        );
        Some((region, sum / count as f64))
    }
}

/// Port for person-segmentation models.
#[async_trait]
pub trait Segmenter: Send + Sync {
    /// Produce a foreground mask for `frame`, or `None` when no person
    /// is visible.
    async fn segment(
        &self,
        frame: &VideoFrame,
        timestamp_ms: i64,
    ) -> PipelineResult<Option<ForegroundMask>>;

    /// Release segmenter resources.
    async fn close(&self) {}
}

/// Adapter exposing a [`Segmenter`] as a [`SubjectDetector`].
///
/// The detection confidence is the mean foreground confidence of the
/// cells that cleared the threshold.
pub struct SegmenterDetector {
    segmenter: Arc<dyn Segmenter>,
    threshold: f32,
}

impl SegmenterDetector {
    /// Wrap a segmenter with the given foreground threshold.
    pub fn new(segmenter: Arc<dyn Segmenter>, threshold: f32) -> Self {
        Self {
            segmenter,
            threshold,
        }
    }
}

#[async_trait]
impl SubjectDetector for SegmenterDetector {
    async fn detect(
        &self,
        frame: &VideoFrame,
        timestamp_ms: i64,
    ) -> PipelineResult<Option<Detection>> {
        let mask = match self.segmenter.segment(frame, timestamp_ms).await? {
            Some(mask) => mask,
            None => return Ok(None),
        };
        Ok(mask
            .bounding_region(self.threshold, frame.width(), frame.height())
            .map(|(region, confidence)| Detection::new(region, confidence)))
    }

    async fn close(&self) {
        self.segmenter.close().await;
    }

    fn name(&self) -> &'static str {
        "segmenter"
    }
}
