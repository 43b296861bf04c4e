//! Detection scheduling.
//!
//! Decides per frame whether to dispatch an asynchronous detection pass
//! and owns the concurrency boundary between the frame-delivery call and
//! the detection task. The delivery path never waits on the detector:
//! sampling is gated by a frame counter and an in-flight guard, and the
//! sampled frame crosses into the task as a retained handle that is
//! released when the task ends, on every exit path.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use tokio::task::JoinHandle;
use tracing::{debug, warn};
use vcam_models::PipelineConfig;

use crate::detect::SubjectDetector;
use crate::frame::VideoFrame;
use crate::geometry::compute_crop_rect;
use crate::smoothing::CropSmoother;
use crate::stats::PipelineStats;

/// Clears the in-flight flag when the detection task ends, including
/// when it unwinds.
struct InFlightGuard {
    flag: Arc<AtomicBool>,
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::Release);
    }
}

/// Samples frames for detection and applies results to the smoother.
pub struct DetectionScheduler {
    detector: Arc<dyn SubjectDetector>,
    config: Arc<PipelineConfig>,
    smoother: Arc<CropSmoother>,
    stats: Arc<PipelineStats>,
    frame_counter: AtomicU64,
    in_flight: Arc<AtomicBool>,
    task: Mutex<Option<JoinHandle<()>>>,
    closed: Arc<AtomicBool>,
    runtime: tokio::runtime::Handle,
}

impl DetectionScheduler {
    pub fn new(
        detector: Arc<dyn SubjectDetector>,
        config: Arc<PipelineConfig>,
        smoother: Arc<CropSmoother>,
        stats: Arc<PipelineStats>,
        closed: Arc<AtomicBool>,
        runtime: tokio::runtime::Handle,
    ) -> Self {
        Self {
            detector,
            config,
            smoother,
            stats,
            frame_counter: AtomicU64::new(0),
            in_flight: Arc::new(AtomicBool::new(false)),
            task: Mutex::new(None),
            closed,
            runtime,
        }
    }

    /// Whether a detection task is currently running.
    pub fn in_flight(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }

    /// Forcibly reclaim an outstanding detection task.
    ///
    /// Aborting drops the task's future, which releases its retained
    /// frame and clears the in-flight flag through the same RAII guards
    /// a normal exit uses.
    pub fn abort_in_flight(&self) {
        if let Some(handle) = self.task.lock().unwrap().take() {
            handle.abort();
        }
    }

    /// Sample `frame` for detection if it is due and nothing is in
    /// flight. Returns immediately in all cases.
    pub fn maybe_dispatch(&self, frame: &VideoFrame) {
        let count = self.frame_counter.fetch_add(1, Ordering::Relaxed);
        if count % self.config.sample_interval as u64 != 0 {
            return;
        }
        if self.closed.load(Ordering::Acquire) {
            return;
        }
        if self
            .in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            // Previous detection still running; skip this sample.
            return;
        }

        self.stats.record_frame_sampled();

        let guard = InFlightGuard {
            flag: Arc::clone(&self.in_flight),
        };
        let retained = frame.retain();
        let timestamp_ms = frame.timestamp_ms();
        let frame_width = frame.width();
        let frame_height = frame.height();

        let detector = Arc::clone(&self.detector);
        let config = Arc::clone(&self.config);
        let smoother = Arc::clone(&self.smoother);
        let stats = Arc::clone(&self.stats);

        let handle = self.runtime.spawn(async move {
            let _guard = guard;
            match detector.detect(retained.frame(), timestamp_ms).await {
                Ok(Some(detection)) if detection.confidence >= config.min_confidence => {
                    stats.record_detection();
                    let target = compute_crop_rect(
                        Some(&detection.region),
                        frame_width,
                        frame_height,
                        &config,
                    );
                    smoother.update_target(target, frame_width, frame_height);
                }
                Ok(Some(detection)) => {
                    debug!(
                        confidence = detection.confidence,
                        threshold = config.min_confidence,
                        "discarding low-confidence detection"
                    );
                    let target = compute_crop_rect(None, frame_width, frame_height, &config);
                    smoother.update_target(target, frame_width, frame_height);
                }
                Ok(None) => {
                    debug!(timestamp_ms, "no subject detected");
                    let target = compute_crop_rect(None, frame_width, frame_height, &config);
                    smoother.update_target(target, frame_width, frame_height);
                }
                Err(e) => {
                    // Last-known-good: the live rectangle stays untouched.
                    stats.record_detect_failure();
                    warn!(detector = detector.name(), error = %e, "detection failed");
                }
            }
            // `retained` drops here, releasing the extended reference.
        });
        *self.task.lock().unwrap() = Some(handle);
    }
}

impl Drop for DetectionScheduler {
    fn drop(&mut self) {
        self.abort_in_flight();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::Rotation;
    use crate::models::{CropRect, Detection, Region};
    use crate::smoothing::LiveCrop;
    use arc_swap::ArcSwapOption;
    use async_trait::async_trait;
    use std::sync::atomic::AtomicUsize;
    use std::time::Duration;
    use vcam_models::SmoothingMode;

    struct CountingDetector {
        calls: AtomicUsize,
        delay_ms: u64,
        detection: Option<Detection>,
    }

    #[async_trait]
    impl SubjectDetector for CountingDetector {
        async fn detect(
            &self,
            _frame: &VideoFrame,
            _timestamp_ms: i64,
        ) -> crate::error::PipelineResult<Option<Detection>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.delay_ms > 0 {
                tokio::time::sleep(Duration::from_millis(self.delay_ms)).await;
            }
            Ok(self.detection)
        }
    }

    fn scheduler_with(
        detector: Arc<dyn SubjectDetector>,
        config: PipelineConfig,
        live: LiveCrop,
    ) -> DetectionScheduler {
        let config = Arc::new(config);
        let smoother = Arc::new(CropSmoother::new(
            live,
            SmoothingMode::Exponential,
            config.smoothing_rate,
            config.min_update_px,
            tokio::runtime::Handle::current(),
        ));
        DetectionScheduler::new(
            detector,
            config,
            smoother,
            Arc::new(PipelineStats::new()),
            Arc::new(AtomicBool::new(false)),
            tokio::runtime::Handle::current(),
        )
    }

    #[tokio::test]
    async fn test_sampling_interval() {
        let detector = Arc::new(CountingDetector {
            calls: AtomicUsize::new(0),
            delay_ms: 0,
            detection: None,
        });
        let config = PipelineConfig {
            sample_interval: 4,
            ..PipelineConfig::default()
        };
        let live: LiveCrop = Arc::new(ArcSwapOption::empty());
        let scheduler = scheduler_with(detector.clone(), config, live);

        let frame = VideoFrame::alloc(640, 480, 0, Rotation::Deg0).unwrap();
        for _ in 0..12 {
            scheduler.maybe_dispatch(&frame);
            // Let each dispatched task finish so the in-flight guard
            // never masks the cadence under test.
            while scheduler.in_flight() {
                tokio::task::yield_now().await;
            }
        }
        assert_eq!(detector.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_in_flight_guard_admits_one() {
        let detector = Arc::new(CountingDetector {
            calls: AtomicUsize::new(0),
            delay_ms: 200,
            detection: None,
        });
        let config = PipelineConfig {
            sample_interval: 1,
            ..PipelineConfig::default()
        };
        let live: LiveCrop = Arc::new(ArcSwapOption::empty());
        let scheduler = scheduler_with(detector.clone(), config, live);

        let frame = VideoFrame::alloc(640, 480, 0, Rotation::Deg0).unwrap();
        scheduler.maybe_dispatch(&frame);
        tokio::task::yield_now().await;
        for _ in 0..10 {
            scheduler.maybe_dispatch(&frame);
        }
        // Only the first dispatch got through while the slow task runs.
        assert_eq!(detector.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_detection_updates_live_rect() {
        let detection = Detection::new(Region::new(300.0, 300.0, 500.0, 500.0), 0.9);
        let detector = Arc::new(CountingDetector {
            calls: AtomicUsize::new(0),
            delay_ms: 0,
            detection: Some(detection),
        });
        let config = PipelineConfig {
            sample_interval: 1,
            smoothing_rate: 1.0,
            ..PipelineConfig::default()
        };
        let live: LiveCrop = Arc::new(ArcSwapOption::empty());
        let scheduler = scheduler_with(detector, config, Arc::clone(&live));

        let frame = VideoFrame::alloc(1000, 1000, 0, Rotation::Deg0).unwrap();
        scheduler.maybe_dispatch(&frame);
        while scheduler.in_flight() {
            tokio::task::yield_now().await;
        }
        let rect = live.load_full().expect("live rect established");
        assert!(rect.width() > rect.height());
    }

    #[tokio::test]
    async fn test_failure_keeps_last_known_good() {
        struct FailingDetector;

        #[async_trait]
        impl SubjectDetector for FailingDetector {
            async fn detect(
                &self,
                _frame: &VideoFrame,
                _timestamp_ms: i64,
            ) -> crate::error::PipelineResult<Option<Detection>> {
                Err(crate::error::PipelineError::detection_failed("model gone"))
            }
        }

        let previous = CropRect::new(10.0, 10.0, 110.0, 110.0);
        let live: LiveCrop = Arc::new(ArcSwapOption::from_pointee(previous));
        let config = PipelineConfig {
            sample_interval: 1,
            ..PipelineConfig::default()
        };
        let scheduler = scheduler_with(Arc::new(FailingDetector), config, Arc::clone(&live));

        let frame = VideoFrame::alloc(640, 480, 0, Rotation::Deg0).unwrap();
        scheduler.maybe_dispatch(&frame);
        while scheduler.in_flight() {
            tokio::task::yield_now().await;
        }
        assert_eq!(*live.load_full().unwrap(), previous);
    }

    #[tokio::test]
    async fn test_retained_frame_released_after_task() {
        let detector = Arc::new(CountingDetector {
            calls: AtomicUsize::new(0),
            delay_ms: 10,
            detection: None,
        });
        let config = PipelineConfig {
            sample_interval: 1,
            ..PipelineConfig::default()
        };
        let live: LiveCrop = Arc::new(ArcSwapOption::empty());
        let scheduler = scheduler_with(detector, config, live);

        let frame = VideoFrame::alloc(640, 480, 0, Rotation::Deg0).unwrap();
        scheduler.maybe_dispatch(&frame);
        assert!(frame.ref_count() >= 2);
        while scheduler.in_flight() {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        tokio::task::yield_now().await;
        assert_eq!(frame.ref_count(), 1);
    }
}
