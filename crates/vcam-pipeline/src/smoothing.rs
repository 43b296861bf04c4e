//! Temporal smoothing of the live crop rectangle.
//!
//! The live rectangle is the only state shared between the frame
//! delivery path (reader) and the detection tasks (writer). It lives in
//! an [`ArcSwapOption`] and is replaced whole on every update; a reader
//! never observes a half-written rectangle.
//!
//! Two strategies drive the rectangle toward a new target:
//! - `Exponential`: one lerp step per detection result. Cheap, but the
//!   motion cadence is tied to the detection cadence.
//! - `Animated`: a cancellable tokio task lerps at a fixed cadence until
//!   the remaining leading-edge delta is small, then snaps exactly to
//!   the target. Starting a new target aborts the previous task, so at
//!   most one stepper exists per pipeline instance (last writer wins).

use std::sync::{Arc, Mutex};
use std::time::Duration;

use arc_swap::ArcSwapOption;
use tokio::task::JoinHandle;
use tracing::debug;
use vcam_models::SmoothingMode;

use crate::models::CropRect;

/// Shared handle to the live crop rectangle.
pub type LiveCrop = Arc<ArcSwapOption<CropRect>>;

/// Drives the live crop rectangle toward detection targets.
pub struct CropSmoother {
    live: LiveCrop,
    mode: SmoothingMode,
    rate: f64,
    min_update_px: f64,
    stepper: Mutex<Option<JoinHandle<()>>>,
    runtime: tokio::runtime::Handle,
}

impl CropSmoother {
    /// Create a smoother writing to `live`.
    pub fn new(
        live: LiveCrop,
        mode: SmoothingMode,
        rate: f64,
        min_update_px: f64,
        runtime: tokio::runtime::Handle,
    ) -> Self {
        Self {
            live,
            mode,
            rate,
            min_update_px,
            stepper: Mutex::new(None),
            runtime,
        }
    }

    /// Schedule the live rectangle to move toward `target`.
    ///
    /// Never blocks: exponential mode performs a single atomic replace,
    /// animated mode hands the work to a background stepper. The very
    /// first update establishes the live rectangle, starting from the
    /// centered default for the given frame size so the opening motion
    /// is a glide rather than a jump.
    pub fn update_target(&self, target: CropRect, frame_width: u32, frame_height: u32) {
        let current = match self.live.load_full() {
            Some(current) => *current,
            None => {
                let seed = CropRect::centered_default(frame_width, frame_height);
                self.live.store(Some(Arc::new(seed)));
                seed
            }
        };

        match self.mode {
            SmoothingMode::Exponential => {
                let next = step_toward(&current, &target, self.rate);
                self.live.store(Some(Arc::new(next)));
            }
            SmoothingMode::Animated { step_ms } => {
                self.cancel();
                if (current.left - target.left).abs() <= self.min_update_px {
                    return;
                }
                let live = Arc::clone(&self.live);
                let rate = self.rate;
                let handle = self.runtime.spawn(async move {
                    let mut ticker = tokio::time::interval(Duration::from_millis(step_ms));
                    // The first tick completes immediately; skip it so the
                    // rectangle starts moving one cadence step from now.
                    ticker.tick().await;
                    loop {
                        ticker.tick().await;
                        let current = match live.load_full() {
                            Some(current) => *current,
                            // Cleared by a recovery reset; do not resurrect it.
                            None => break,
                        };
                        let next = step_toward(&current, &target, rate);
                        live.store(Some(Arc::new(next)));
                        if next == target {
                            debug!(?target, "crop animation converged");
                            break;
                        }
                    }
                });
                *self.stepper.lock().unwrap() = Some(handle);
            }
        }
    }

    /// Abort any in-flight animation task.
    pub fn cancel(&self) {
        if let Some(handle) = self.stepper.lock().unwrap().take() {
            handle.abort();
        }
    }

    /// Abort the animation and clear the live rectangle.
    ///
    /// Used by the resource-exhaustion recovery path: the pipeline falls
    /// back to passthrough until a fresh detection re-establishes a
    /// rectangle.
    pub fn reset(&self) {
        self.cancel();
        self.live.store(None);
    }
}

impl Drop for CropSmoother {
    fn drop(&mut self) {
        self.cancel();
    }
}

/// One smoothing step: lerp `current` toward `target`, snapping exactly
/// onto the target once the remaining leading-edge delta falls below
/// `2 x rate` pixels.
fn step_toward(current: &CropRect, target: &CropRect, rate: f64) -> CropRect {
    let next = current.lerp_toward(target, rate);
    if (next.left - target.left).abs() < 2.0 * rate {
        *target
    } else {
        next
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn live_with(rect: CropRect) -> LiveCrop {
        Arc::new(ArcSwapOption::from_pointee(rect))
    }

    #[test]
    fn test_step_converges_monotonically() {
        let target = CropRect::new(100.0, 100.0, 500.0, 400.0);
        let mut current = CropRect::new(0.0, 0.0, 300.0, 200.0);

        let mut distance = current.max_edge_delta(&target);
        let mut steps = 0;
        while current != target {
            current = step_toward(&current, &target, 0.2);
            let next_distance = current.max_edge_delta(&target);
            assert!(
                next_distance < distance,
                "distance must strictly decrease: {} -> {}",
                distance,
                next_distance
            );
            distance = next_distance;
            steps += 1;
            assert!(steps < 1000, "did not converge");
        }

        // Exact snap, and further steps are no-ops.
        assert_eq!(current, target);
        assert_eq!(step_toward(&current, &target, 0.2), target);
    }

    #[tokio::test]
    async fn test_exponential_single_step() {
        let live = live_with(CropRect::new(0.0, 0.0, 100.0, 100.0));
        let smoother = CropSmoother::new(
            Arc::clone(&live),
            SmoothingMode::Exponential,
            0.5,
            0.0,
            tokio::runtime::Handle::current(),
        );

        smoother.update_target(CropRect::new(100.0, 0.0, 200.0, 100.0), 640, 480);
        let rect = live.load_full().unwrap();
        assert_eq!(*rect, CropRect::new(50.0, 0.0, 150.0, 100.0));
    }

    #[tokio::test]
    async fn test_first_update_seeds_centered_default() {
        let live: LiveCrop = Arc::new(ArcSwapOption::empty());
        let smoother = CropSmoother::new(
            Arc::clone(&live),
            SmoothingMode::Exponential,
            0.5,
            0.0,
            tokio::runtime::Handle::current(),
        );

        // Default for 640x480 is {160, 120, 480, 360}; one half-step
        // toward the target starts the glide from there.
        let target = CropRect::new(0.0, 0.0, 320.0, 240.0);
        smoother.update_target(target, 640, 480);
        assert_eq!(
            *live.load_full().unwrap(),
            CropRect::new(80.0, 60.0, 400.0, 300.0)
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_animated_converges_and_snaps() {
        let live = live_with(CropRect::new(0.0, 0.0, 100.0, 100.0));
        let smoother = CropSmoother::new(
            Arc::clone(&live),
            SmoothingMode::Animated { step_ms: 30 },
            0.3,
            1.0,
            tokio::runtime::Handle::current(),
        );

        let target = CropRect::new(200.0, 0.0, 300.0, 100.0);
        smoother.update_target(target, 640, 480);

        tokio::time::sleep(Duration::from_secs(2)).await;
        assert_eq!(*live.load_full().unwrap(), target);
    }

    #[tokio::test(start_paused = true)]
    async fn test_animated_below_threshold_is_noop() {
        let start = CropRect::new(0.0, 0.0, 100.0, 100.0);
        let live = live_with(start);
        let smoother = CropSmoother::new(
            Arc::clone(&live),
            SmoothingMode::Animated { step_ms: 30 },
            0.3,
            5.0,
            tokio::runtime::Handle::current(),
        );

        // Leading-edge delta of 2px is under the 5px threshold.
        smoother.update_target(CropRect::new(2.0, 0.0, 102.0, 100.0), 640, 480);
        tokio::time::sleep(Duration::from_secs(1)).await;
        assert_eq!(*live.load_full().unwrap(), start);
    }

    #[tokio::test(start_paused = true)]
    async fn test_new_target_cancels_previous() {
        let live = live_with(CropRect::new(0.0, 0.0, 100.0, 100.0));
        let smoother = CropSmoother::new(
            Arc::clone(&live),
            SmoothingMode::Animated { step_ms: 30 },
            0.3,
            1.0,
            tokio::runtime::Handle::current(),
        );

        smoother.update_target(CropRect::new(500.0, 0.0, 600.0, 100.0), 640, 480);
        tokio::time::sleep(Duration::from_millis(100)).await;

        // Last writer wins.
        let target = CropRect::new(50.0, 50.0, 150.0, 150.0);
        smoother.update_target(target, 640, 480);
        tokio::time::sleep(Duration::from_secs(3)).await;
        assert_eq!(*live.load_full().unwrap(), target);
    }

    #[tokio::test(start_paused = true)]
    async fn test_reset_stops_animation() {
        let live = live_with(CropRect::new(0.0, 0.0, 100.0, 100.0));
        let smoother = CropSmoother::new(
            Arc::clone(&live),
            SmoothingMode::Animated { step_ms: 30 },
            0.3,
            1.0,
            tokio::runtime::Handle::current(),
        );

        smoother.update_target(CropRect::new(500.0, 0.0, 600.0, 100.0), 640, 480);
        smoother.reset();
        tokio::time::sleep(Duration::from_secs(1)).await;
        assert!(live.load_full().is_none());
    }
}
