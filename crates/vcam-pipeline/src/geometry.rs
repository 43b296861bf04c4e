//! Crop rectangle computation.
//!
//! Pure geometry: a detected region goes in, a target crop rectangle in
//! source-frame coordinates comes out. No hidden state, so identical
//! inputs always produce an identical rectangle.

use vcam_models::PipelineConfig;

use crate::models::{CropRect, Region};

/// Convert a detected region into a target crop rectangle.
///
/// Applied in order: neutral default for empty input, symmetric padding,
/// output-aspect correction, minimum-size floor (half the frame per
/// axis), and a final clamp into the frame. Aspect correction only ever
/// grows the deficient axis, so the subsequent scale to the output
/// resolution introduces no distortion unless the frame bounds force a
/// trim.
pub fn compute_crop_rect(
    region: Option<&Region>,
    frame_width: u32,
    frame_height: u32,
    config: &PipelineConfig,
) -> CropRect {
    let region = match region {
        Some(region) if !region.is_empty() => region,
        _ => return CropRect::centered_default(frame_width, frame_height),
    };

    // Symmetric padding on each axis.
    let pad_x = config.padding_fraction * region.width();
    let pad_y = config.padding_fraction * region.height();
    let mut rect = CropRect::new(
        region.left - pad_x,
        region.top - pad_y,
        region.right + pad_x,
        region.bottom + pad_y,
    );

    rect = correct_aspect(&rect, config.output_aspect());

    // Minimum-size floor: never zoom past half the frame on either axis.
    let floor_w = frame_width as f64 / 2.0;
    let floor_h = frame_height as f64 / 2.0;
    let width = rect.width().max(floor_w).min(frame_width as f64);
    let height = rect.height().max(floor_h).min(frame_height as f64);
    if width != rect.width() || height != rect.height() {
        rect = rect.with_size_about_center(width, height);
        // The floor can distort the ratio again.
        rect = correct_aspect(&rect, config.output_aspect());
    }

    rect.clamp(frame_width, frame_height)
}

/// Grow whichever axis is too small, symmetrically about the center,
/// until width / height equals `target_aspect`.
fn correct_aspect(rect: &CropRect, target_aspect: f64) -> CropRect {
    let width = rect.width();
    let height = rect.height();
    if width < height * target_aspect {
        rect.with_size_about_center(height * target_aspect, height)
    } else if height < width / target_aspect {
        rect.with_size_about_center(width, width / target_aspect)
    } else {
        *rect
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(output_width: u32, output_height: u32, padding: f64) -> PipelineConfig {
        PipelineConfig {
            output_width,
            output_height,
            padding_fraction: padding,
            ..PipelineConfig::default()
        }
    }

    fn assert_contained(rect: &CropRect, width: u32, height: u32) {
        assert!(rect.left >= 0.0, "left {} < 0", rect.left);
        assert!(rect.top >= 0.0, "top {} < 0", rect.top);
        assert!(rect.right <= width as f64, "right {} > {}", rect.right, width);
        assert!(
            rect.bottom <= height as f64,
            "bottom {} > {}",
            rect.bottom,
            height
        );
        assert!(rect.left < rect.right);
        assert!(rect.top < rect.bottom);
    }

    #[test]
    fn test_empty_region_yields_centered_default() {
        let cfg = config(1280, 720, 0.2);
        let rect = compute_crop_rect(None, 640, 480, &cfg);
        assert_eq!(rect, CropRect::new(160.0, 120.0, 480.0, 360.0));

        let degenerate = Region::new(100.0, 100.0, 100.0, 200.0);
        let rect = compute_crop_rect(Some(&degenerate), 640, 480, &cfg);
        assert_eq!(rect, CropRect::new(160.0, 120.0, 480.0, 360.0));
    }

    #[test]
    fn test_wide_output_on_square_frame() {
        // Normalized {0.3, 0.3, 0.5, 0.5} on a 1000x1000 frame.
        let region = Region::new(300.0, 300.0, 500.0, 500.0);
        let cfg = config(1280, 720, 0.2);
        let rect = compute_crop_rect(Some(&region), 1000, 1000, &cfg);

        assert_contained(&rect, 1000, 1000);
        assert!(rect.width() > rect.height());
        // Aspect matches 16:9 (not clamped here).
        assert!((rect.aspect() - 16.0 / 9.0).abs() < 1e-6);
        // Center stays near the subject.
        assert!((rect.cx() - 400.0).abs() < 60.0);
        assert!((rect.cy() - 400.0).abs() < 1e-6);
    }

    #[test]
    fn test_determinism() {
        let cfg = config(1280, 720, 0.15);
        let region = Region::new(12.5, 40.25, 333.75, 480.5);
        let a = compute_crop_rect(Some(&region), 1920, 1080, &cfg);
        let b = compute_crop_rect(Some(&region), 1920, 1080, &cfg);
        assert_eq!(a, b);
    }

    #[test]
    fn test_containment_random_inputs() {
        use rand::{Rng, SeedableRng};
        let mut rng = rand::rngs::StdRng::seed_from_u64(7);
        let cfg = config(1080, 1920, 0.2);

        for _ in 0..500 {
            let fw = rng.random_range(1..=1920u32) * 2;
            let fh = rng.random_range(1..=1080u32) * 2;
            let left = rng.random_range(-100.0..fw as f64);
            let top = rng.random_range(-100.0..fh as f64);
            let region = Region::new(
                left,
                top,
                left + rng.random_range(0.0..500.0),
                top + rng.random_range(0.0..500.0),
            );
            let rect = compute_crop_rect(Some(&region), fw, fh, &cfg);
            assert_contained(&rect, fw, fh);
        }
    }

    #[test]
    fn test_aspect_held_unless_clamped() {
        let cfg = config(1280, 720, 0.1);
        let region = Region::new(800.0, 600.0, 900.0, 680.0);
        let rect = compute_crop_rect(Some(&region), 1920, 1080, &cfg);
        assert_contained(&rect, 1920, 1080);
        assert!((rect.aspect() - 16.0 / 9.0).abs() < 1e-6);
    }

    #[test]
    fn test_min_size_floor() {
        // A tiny detection must not zoom past half the frame.
        let cfg = config(1280, 720, 0.0);
        let region = Region::new(500.0, 500.0, 510.0, 510.0);
        let rect = compute_crop_rect(Some(&region), 1920, 1080, &cfg);
        assert!(rect.width() >= 960.0);
        assert!(rect.height() >= 540.0);
        assert_contained(&rect, 1920, 1080);
    }

    #[test]
    fn test_padding_expands_symmetrically() {
        let region = Region::new(400.0, 400.0, 600.0, 600.0);
        let no_pad = compute_crop_rect(Some(&region), 4000, 4000, &config(1000, 1000, 0.0));
        let padded = compute_crop_rect(Some(&region), 4000, 4000, &config(1000, 1000, 0.2));
        assert!(padded.width() > no_pad.width());
        assert!((padded.cx() - no_pad.cx()).abs() < 1e-6);
        assert!((padded.cy() - no_pad.cy()).abs() < 1e-6);
    }
}
