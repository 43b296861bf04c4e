//! Pipeline facade.
//!
//! Composes the scheduler, smoother and transformer into the single
//! per-frame entry point plus the shutdown sequence. The per-frame call
//! is synchronous and bounded: detection runs on background tasks and
//! only ever influences future frames through the live crop rectangle.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use arc_swap::ArcSwapOption;
use tracing::{info, warn};
use vcam_models::{PipelineConfig, StatsSnapshot};

use crate::detect::SubjectDetector;
use crate::error::{PipelineError, PipelineResult};
use crate::frame::VideoFrame;
use crate::models::CropRect;
use crate::scheduler::DetectionScheduler;
use crate::smoothing::{CropSmoother, LiveCrop};
use crate::stats::PipelineStats;
use crate::transform::FrameTransformer;

/// How long `close` waits for an outstanding detection task.
const CLOSE_GRACE: Duration = Duration::from_millis(250);
const CLOSE_POLL: Duration = Duration::from_millis(10);

/// Real-time auto-zoom pipeline.
///
/// Feed every captured frame through [`AutoZoomPipeline::on_frame`]; it
/// returns exactly one frame per call, reframed when a crop rectangle is
/// live and untouched otherwise. Detection failures, conversion failures
/// and memory pressure all degrade to passthrough, never to a dropped
/// frame or an error across the delivery boundary.
pub struct AutoZoomPipeline {
    config: Arc<PipelineConfig>,
    detector: Arc<dyn SubjectDetector>,
    live: LiveCrop,
    smoother: Arc<CropSmoother>,
    scheduler: DetectionScheduler,
    transformer: Mutex<FrameTransformer>,
    stats: Arc<PipelineStats>,
    closed: Arc<AtomicBool>,
}

impl AutoZoomPipeline {
    /// Build a pipeline around `detector`.
    ///
    /// Validates the configuration (invalid values are fatal here, not
    /// recoverable later) and binds to the current tokio runtime for the
    /// background detection and smoothing tasks.
    pub fn new(config: PipelineConfig, detector: Arc<dyn SubjectDetector>) -> PipelineResult<Self> {
        config.validate()?;
        let runtime = tokio::runtime::Handle::try_current().map_err(|_| PipelineError::NoRuntime)?;

        let config = Arc::new(config);
        let live: LiveCrop = Arc::new(ArcSwapOption::empty());
        let stats = Arc::new(PipelineStats::new());
        let closed = Arc::new(AtomicBool::new(false));

        let smoother = Arc::new(CropSmoother::new(
            Arc::clone(&live),
            config.smoothing,
            config.smoothing_rate,
            config.min_update_px,
            runtime.clone(),
        ));
        let scheduler = DetectionScheduler::new(
            Arc::clone(&detector),
            Arc::clone(&config),
            Arc::clone(&smoother),
            Arc::clone(&stats),
            Arc::clone(&closed),
            runtime,
        );
        let transformer = Mutex::new(FrameTransformer::new(
            config.output_width,
            config.output_height,
        ));

        info!(
            detector = detector.name(),
            output_width = config.output_width,
            output_height = config.output_height,
            sample_interval = config.sample_interval,
            "auto-zoom pipeline ready"
        );

        Ok(Self {
            config,
            detector,
            live,
            smoother,
            scheduler,
            transformer,
            stats,
            closed,
        })
    }

    /// Process one delivered frame. Always returns a frame.
    pub fn on_frame(&self, frame: VideoFrame) -> VideoFrame {
        self.stats.record_frame_seen();

        if !self.config.enabled || self.closed.load(Ordering::Acquire) {
            return frame;
        }

        self.scheduler.maybe_dispatch(&frame);

        let crop = self.live.load_full();
        let outcome = self
            .transformer
            .lock()
            .unwrap()
            .apply(&frame, crop.as_deref());
        match outcome {
            Ok(out) => {
                if out.is_cropped() {
                    self.stats.record_frame_cropped();
                }
                out.into_frame()
            }
            Err(e) => {
                self.stats.record_transform_failure();
                if e.resets_crop() {
                    // Forced recovery: passthrough until detection
                    // re-establishes a rectangle.
                    self.smoother.reset();
                    warn!(error = %e, "transform exhausted resources, resetting crop");
                } else {
                    warn!(error = %e, "transform failed, forwarding original frame");
                }
                frame
            }
        }
    }

    /// Shut the pipeline down.
    ///
    /// Stops admitting detection tasks, cancels the smoothing animation,
    /// waits up to a bounded grace period for the outstanding detection
    /// task, releases reusable buffers and closes the detector. Safe to
    /// call more than once.
    pub async fn close(&self) {
        if self.closed.swap(true, Ordering::AcqRel) {
            return;
        }

        self.smoother.cancel();

        let deadline = tokio::time::Instant::now() + CLOSE_GRACE;
        while self.scheduler.in_flight() {
            if tokio::time::Instant::now() >= deadline {
                warn!("detection task still running after grace period, aborting it");
                self.scheduler.abort_in_flight();
                break;
            }
            tokio::time::sleep(CLOSE_POLL).await;
        }

        self.transformer.lock().unwrap().release_buffers();
        self.detector.close().await;

        let snapshot = self.stats.snapshot();
        info!(
            frames_seen = snapshot.frames_seen,
            frames_sampled = snapshot.frames_sampled,
            frames_detected = snapshot.frames_detected,
            frames_cropped = snapshot.frames_cropped,
            detect_failures = snapshot.detect_failures,
            transform_failures = snapshot.transform_failures,
            "auto-zoom pipeline closed"
        );
    }

    /// Cumulative counters since construction.
    pub fn stats(&self) -> StatsSnapshot {
        self.stats.snapshot()
    }

    /// The crop rectangle currently applied to outgoing frames, if any.
    pub fn live_crop(&self) -> Option<CropRect> {
        self.live.load_full().map(|rect| *rect)
    }
}
