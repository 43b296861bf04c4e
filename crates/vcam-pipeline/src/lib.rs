//! Real-time auto-zoom pipeline for live camera streams.
//!
//! Continuously tracks a subject (typically a face) and re-crops each
//! outgoing frame so the subject stays framed, without ever blocking the
//! frame-delivery path. Detection is expensive and asynchronous; the
//! per-frame transform is cheap and synchronous, and the two meet only
//! at the atomically replaced live crop rectangle.
//!
//! # Architecture
//!
//! ```text
//! Frame In (every frame, sync)
//!     │
//!     ▼
//! ┌─────────────────────┐   sampled frames    ┌─────────────────┐
//! │ Detection Scheduler │ ──── (retained) ──▶ │  Subject Port   │
//! └──────────┬──────────┘     async task      └────────┬────────┘
//!            │                                         ▼
//!            │                                ┌─────────────────┐
//!            │                                │  Crop Geometry  │
//!            │                                └────────┬────────┘
//!            │                                         ▼
//!            │                                ┌─────────────────┐
//!            │              live rectangle    │    Smoother     │
//!            │          ◀── (atomic swap) ─── └─────────────────┘
//!            ▼
//! ┌─────────────────────┐
//! │   Frame Transform   │ ← crop + scale with the instantaneous rect
//! └──────────┬──────────┘
//!            ▼
//! Frame Out (exactly one per frame in)
//! ```
//!
//! Detection results only ever affect future frames; a frame is never
//! held back waiting for its own detection.

pub mod detect;
pub mod error;
pub mod frame;
pub mod geometry;
pub mod models;
pub mod pipeline;
pub mod scheduler;
pub mod smoothing;
pub mod stats;
pub mod transform;

// Re-export common types
pub use detect::{ForegroundMask, Segmenter, SegmenterDetector, SubjectDetector};
pub use error::{PipelineError, PipelineResult};
pub use frame::{FrameHandle, Rotation, VideoFrame};
pub use geometry::compute_crop_rect;
pub use models::{CropRect, Detection, Region};
pub use pipeline::AutoZoomPipeline;
pub use smoothing::CropSmoother;
pub use stats::PipelineStats;
pub use transform::{FrameTransformer, Transformed};

// Re-export the configuration surface so callers need only one crate.
pub use vcam_models::{ConfigError, NormalizedRegion, PipelineConfig, SmoothingMode, StatsSnapshot};
