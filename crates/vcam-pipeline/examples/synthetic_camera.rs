//! Demo: auto-zoom over a synthetic camera feed.
//!
//! Drives the pipeline with generated frames and a fake detector whose
//! subject sweeps across the frame, then prints the final stats.
//!
//! Run with: cargo run -p vcam-pipeline --example synthetic_camera

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing_subscriber::EnvFilter;
use vcam_pipeline::{
    AutoZoomPipeline, Detection, PipelineConfig, PipelineResult, Region, Rotation, SubjectDetector,
    VideoFrame,
};

/// Subject bobbing along a horizontal sine path.
struct SweepingSubject;

#[async_trait]
impl SubjectDetector for SweepingSubject {
    async fn detect(
        &self,
        frame: &VideoFrame,
        timestamp_ms: i64,
    ) -> PipelineResult<Option<Detection>> {
        let w = frame.width() as f64;
        let h = frame.height() as f64;
        let phase = timestamp_ms as f64 / 3000.0;
        let cx = w * (0.5 + 0.3 * phase.sin());
        let cy = h * 0.4;
        Ok(Some(Detection::new(
            Region::new(cx - 90.0, cy - 120.0, cx + 90.0, cy + 120.0),
            0.92,
        )))
    }

    fn name(&self) -> &'static str {
        "sweeping-subject"
    }
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = PipelineConfig::responsive();
    let pipeline = AutoZoomPipeline::new(config, Arc::new(SweepingSubject))
        .expect("pipeline construction");

    // 10 seconds of 30 fps video.
    for i in 0..300i64 {
        let frame = VideoFrame::alloc(1280, 720, i * 33, Rotation::Deg0)
            .expect("frame allocation");
        let out = pipeline.on_frame(frame);
        if i % 30 == 0 {
            let rect = pipeline.live_crop();
            println!(
                "t={:>5}ms  out {}x{}  crop {:?}",
                i * 33,
                out.width(),
                out.height(),
                rect.map(|r| (r.left as i32, r.top as i32, r.right as i32, r.bottom as i32)),
            );
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }

    pipeline.close().await;
    println!("{:#?}", pipeline.stats());
}
