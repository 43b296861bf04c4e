//! Pipeline statistics snapshot.

use serde::{Deserialize, Serialize};

/// Point-in-time snapshot of the pipeline's cumulative counters.
///
/// Counters only ever increase for the lifetime of a pipeline instance;
/// they are observability data, never control flow.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatsSnapshot {
    /// Frames delivered to the pipeline.
    pub frames_seen: u64,
    /// Frames handed to the detector.
    pub frames_sampled: u64,
    /// Sampled frames that produced a usable region.
    pub frames_detected: u64,
    /// Frames that were actually cropped and scaled (not passthrough).
    pub frames_cropped: u64,
    /// Detection calls that failed and were treated as empty.
    pub detect_failures: u64,
    /// Transforms that failed and fell back to the original frame.
    pub transform_failures: u64,
}
