//! Cumulative pipeline counters.
//!
//! Counters are observability data only and never drive control flow.
//! Hot-path increments are mirrored onto the `metrics` facade so a
//! recorder installed by the host process picks them up.

use std::sync::atomic::{AtomicU64, Ordering};

use metrics::counter;
use vcam_models::StatsSnapshot;

/// Monotonic counters shared by the delivery path and detection tasks.
#[derive(Debug, Default)]
pub struct PipelineStats {
    frames_seen: AtomicU64,
    frames_sampled: AtomicU64,
    frames_detected: AtomicU64,
    frames_cropped: AtomicU64,
    detect_failures: AtomicU64,
    transform_failures: AtomicU64,
}

impl PipelineStats {
    /// Create a zeroed counter set.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_frame_seen(&self) {
        self.frames_seen.fetch_add(1, Ordering::Relaxed);
        counter!("vcam_frames_seen_total").increment(1);
    }

    pub fn record_frame_sampled(&self) {
        self.frames_sampled.fetch_add(1, Ordering::Relaxed);
        counter!("vcam_frames_sampled_total").increment(1);
    }

    pub fn record_detection(&self) {
        self.frames_detected.fetch_add(1, Ordering::Relaxed);
        counter!("vcam_detections_total").increment(1);
    }

    pub fn record_frame_cropped(&self) {
        self.frames_cropped.fetch_add(1, Ordering::Relaxed);
        counter!("vcam_frames_cropped_total").increment(1);
    }

    pub fn record_detect_failure(&self) {
        self.detect_failures.fetch_add(1, Ordering::Relaxed);
        counter!("vcam_detect_failures_total").increment(1);
    }

    pub fn record_transform_failure(&self) {
        self.transform_failures.fetch_add(1, Ordering::Relaxed);
        counter!("vcam_transform_failures_total").increment(1);
    }

    /// Point-in-time snapshot of all counters.
    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            frames_seen: self.frames_seen.load(Ordering::Relaxed),
            frames_sampled: self.frames_sampled.load(Ordering::Relaxed),
            frames_detected: self.frames_detected.load(Ordering::Relaxed),
            frames_cropped: self.frames_cropped.load(Ordering::Relaxed),
            detect_failures: self.detect_failures.load(Ordering::Relaxed),
            transform_failures: self.transform_failures.load(Ordering::Relaxed),
        }
    }
}
