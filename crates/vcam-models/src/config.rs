//! Configuration for the auto-zoom pipeline.
//!
//! All values are validated once at pipeline construction; invalid
//! configuration is fatal to startup rather than recoverable at runtime.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors produced by [`PipelineConfig::validate`].
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("smoothing_rate must be in (0, 1], got {0}")]
    SmoothingRate(f64),

    #[error("padding_fraction must be in [0, 1], got {0}")]
    PaddingFraction(f64),

    #[error("sample_interval must be >= 1, got {0}")]
    SampleInterval(u32),

    #[error("min_confidence must be in [0, 1], got {0}")]
    MinConfidence(f64),

    #[error("output dimensions must be even and >= 2, got {0}x{1}")]
    OutputSize(u32, u32),

    #[error("min_update_px must be finite and >= 0, got {0}")]
    MinUpdatePx(f64),

    #[error("animated smoothing step must be >= 1 ms, got {0}")]
    StepInterval(u64),
}

/// How the live crop rectangle is driven toward a new target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "mode")]
pub enum SmoothingMode {
    /// One exponential lerp step per detection result.
    ///
    /// Cheap, but visibly jumpy when detections are sparse.
    Exponential,
    /// Cancellable repeating task lerping at a fixed cadence until the
    /// remaining delta is small enough to snap to the target.
    Animated {
        /// Milliseconds between interpolation steps.
        step_ms: u64,
    },
}

impl Default for SmoothingMode {
    fn default() -> Self {
        Self::Animated { step_ms: 30 }
    }
}

/// Configuration for the auto-zoom pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Master switch; when false every frame passes through untouched.
    pub enabled: bool,

    /// Interpolation factor per smoothing step (0, 1].
    pub smoothing_rate: f64,

    /// Padding around the detected subject as a fraction of its size.
    pub padding_fraction: f64,

    /// Number of delivered frames between detection attempts.
    pub sample_interval: u32,

    /// Minimum detector confidence for a region to be consumed.
    pub min_confidence: f64,

    /// Output frame width in pixels (even).
    pub output_width: u32,

    /// Output frame height in pixels (even).
    pub output_height: u32,

    /// Minimum leading-edge delta (pixels) before an animated update starts.
    pub min_update_px: f64,

    /// Smoothing strategy.
    pub smoothing: SmoothingMode,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            smoothing_rate: 0.2,
            padding_fraction: 0.2,
            sample_interval: 5,
            min_confidence: 0.5,
            output_width: 1280,
            output_height: 720,
            min_update_px: 4.0,
            smoothing: SmoothingMode::default(),
        }
    }
}

impl PipelineConfig {
    /// Responsive preset: samples often and smooths quickly, for
    /// tracking fast-moving subjects at the cost of more detector load.
    pub fn responsive() -> Self {
        Self {
            sample_interval: 3,
            smoothing_rate: 0.35,
            min_update_px: 2.0,
            ..Default::default()
        }
    }

    /// Quality preset: sparse sampling with slow, steady motion.
    pub fn quality() -> Self {
        Self {
            sample_interval: 10,
            smoothing_rate: 0.1,
            padding_fraction: 0.25,
            ..Default::default()
        }
    }

    /// Output aspect ratio (width / height).
    pub fn output_aspect(&self) -> f64 {
        self.output_width as f64 / self.output_height as f64
    }

    /// Validate all fields, rejecting out-of-range values.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.smoothing_rate > 0.0 && self.smoothing_rate <= 1.0) {
            return Err(ConfigError::SmoothingRate(self.smoothing_rate));
        }
        if !(0.0..=1.0).contains(&self.padding_fraction) {
            return Err(ConfigError::PaddingFraction(self.padding_fraction));
        }
        if self.sample_interval < 1 {
            return Err(ConfigError::SampleInterval(self.sample_interval));
        }
        if !(0.0..=1.0).contains(&self.min_confidence) {
            return Err(ConfigError::MinConfidence(self.min_confidence));
        }
        if self.output_width < 2
            || self.output_height < 2
            || self.output_width % 2 != 0
            || self.output_height % 2 != 0
        {
            return Err(ConfigError::OutputSize(self.output_width, self.output_height));
        }
        if !self.min_update_px.is_finite() || self.min_update_px < 0.0 {
            return Err(ConfigError::MinUpdatePx(self.min_update_px));
        }
        if let SmoothingMode::Animated { step_ms } = self.smoothing {
            if step_ms < 1 {
                return Err(ConfigError::StepInterval(step_ms));
            }
        }
        Ok(())
    }
}
