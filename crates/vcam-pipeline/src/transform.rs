//! Per-frame crop and scale.
//!
//! Runs synchronously on the delivery path: reads the instantaneous crop
//! rectangle and maps that sub-region of the source frame onto the fixed
//! output resolution. Every failure degrades to forwarding the original
//! frame; the pipeline never drops one.

use fast_image_resize as fr;
use fast_image_resize::images::{Image, ImageRef};

use crate::error::{PipelineError, PipelineResult};
use crate::frame::{try_filled, VideoFrame};
use crate::models::CropRect;

/// Outcome of a transform: either the untouched input frame or a newly
/// produced cropped-and-scaled frame.
#[derive(Debug)]
pub enum Transformed {
    Passthrough(VideoFrame),
    Cropped(VideoFrame),
}

impl Transformed {
    /// The resulting frame, whichever path produced it.
    pub fn into_frame(self) -> VideoFrame {
        match self {
            Self::Passthrough(frame) | Self::Cropped(frame) => frame,
        }
    }

    /// Whether an actual crop+scale happened.
    pub fn is_cropped(&self) -> bool {
        matches!(self, Self::Cropped(_))
    }
}

/// Integer crop window in source pixels, even-aligned for 4:2:0 chroma.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct PixelWindow {
    x: u32,
    y: u32,
    width: u32,
    height: u32,
}

/// Crops the live rectangle out of each frame and scales it to the
/// output resolution.
///
/// The resizer keeps internal scratch buffers between frames; they are
/// the only state retained across calls and are released by
/// [`FrameTransformer::release_buffers`] at shutdown.
pub struct FrameTransformer {
    output_width: u32,
    output_height: u32,
    resizer: Option<fr::Resizer>,
}

impl FrameTransformer {
    /// Create a transformer producing `output_width` x `output_height`
    /// frames (both even).
    pub fn new(output_width: u32, output_height: u32) -> Self {
        Self {
            output_width,
            output_height,
            resizer: None,
        }
    }

    /// Apply `crop` to `frame`.
    ///
    /// Identity when no rectangle is established or when the clamped
    /// rectangle covers effectively the whole frame. Errors leave no
    /// dangling buffers: all intermediates are scope-owned.
    pub fn apply(
        &mut self,
        frame: &VideoFrame,
        crop: Option<&CropRect>,
    ) -> PipelineResult<Transformed> {
        let crop = match crop {
            Some(crop) => crop,
            None => return Ok(Transformed::Passthrough(frame.clone())),
        };

        let window = clamp_window(crop, frame.width(), frame.height());
        if covers_frame(&window, frame.width(), frame.height()) {
            return Ok(Transformed::Passthrough(frame.clone()));
        }

        let resizer = self.resizer.get_or_insert_with(fr::Resizer::new);

        let y = crop_scale_plane(
            resizer,
            frame.y_plane(),
            frame.width(),
            frame.height(),
            window,
            self.output_width,
            self.output_height,
        )?;
        let chroma_window = PixelWindow {
            x: window.x / 2,
            y: window.y / 2,
            width: window.width / 2,
            height: window.height / 2,
        };
        let u = crop_scale_plane(
            resizer,
            frame.u_plane(),
            frame.width() / 2,
            frame.height() / 2,
            chroma_window,
            self.output_width / 2,
            self.output_height / 2,
        )?;
        let v = crop_scale_plane(
            resizer,
            frame.v_plane(),
            frame.width() / 2,
            frame.height() / 2,
            chroma_window,
            self.output_width / 2,
            self.output_height / 2,
        )?;

        let out = VideoFrame::from_planes(
            self.output_width,
            self.output_height,
            y,
            u,
            v,
            frame.timestamp_ms(),
            frame.rotation(),
        )?;
        Ok(Transformed::Cropped(out))
    }

    /// Drop the resizer and its internal scratch buffers.
    pub fn release_buffers(&mut self) {
        self.resizer = None;
    }
}

/// Convert float crop edges to an integer window: offsets clamped into
/// the frame and rounded down to even, sizes at least 2 and even so the
/// half-resolution chroma planes crop on exact sample boundaries.
fn clamp_window(crop: &CropRect, frame_width: u32, frame_height: u32) -> PixelWindow {
    let fw = frame_width as f64;
    let fh = frame_height as f64;

    let left = crop.left.clamp(0.0, fw - 1.0);
    let top = crop.top.clamp(0.0, fh - 1.0);
    let right = crop.right.clamp(left + 1.0, fw);
    let bottom = crop.bottom.clamp(top + 1.0, fh);

    // Even offsets: floor then clear the low bit. An even offset on an
    // even-sized frame leaves at least 2 columns/rows of room.
    let x = (left.floor() as u32) & !1;
    let y = (top.floor() as u32) & !1;
    let width = ((right.ceil() as u32).min(frame_width) - x).clamp(2, frame_width - x) & !1;
    let height = ((bottom.ceil() as u32).min(frame_height) - y).clamp(2, frame_height - y) & !1;

    PixelWindow {
        x,
        y,
        width,
        height,
    }
}

/// Whether the window is within a small margin of the full frame on all
/// four edges (effectively unzoomed), making the transform a waste.
fn covers_frame(window: &PixelWindow, frame_width: u32, frame_height: u32) -> bool {
    let margin_x = (frame_width as f64 * 0.01).max(2.0);
    let margin_y = (frame_height as f64 * 0.01).max(2.0);
    (window.x as f64) <= margin_x
        && (window.y as f64) <= margin_y
        && ((frame_width - (window.x + window.width)) as f64) <= margin_x
        && ((frame_height - (window.y + window.height)) as f64) <= margin_y
}

/// Combined crop + bilinear scale of one plane into a freshly allocated
/// buffer. Allocation failure surfaces as `ResourceExhausted`, resize
/// failure as `BufferConversion`.
fn crop_scale_plane(
    resizer: &mut fr::Resizer,
    plane: &[u8],
    plane_width: u32,
    plane_height: u32,
    window: PixelWindow,
    out_width: u32,
    out_height: u32,
) -> PipelineResult<Vec<u8>> {
    let src = ImageRef::new(plane_width, plane_height, plane, fr::PixelType::U8)
        .map_err(|e| PipelineError::buffer_conversion(format!("source plane view: {}", e)))?;

    let buf = try_filled(out_width as usize * out_height as usize, 0)?;
    let mut dst = Image::from_vec_u8(out_width, out_height, buf, fr::PixelType::U8)
        .map_err(|e| PipelineError::buffer_conversion(format!("output plane: {}", e)))?;

    let options = fr::ResizeOptions::new()
        .resize_alg(fr::ResizeAlg::Convolution(fr::FilterType::Bilinear))
        .crop(
            window.x as f64,
            window.y as f64,
            window.width as f64,
            window.height as f64,
        );
    resizer
        .resize(&src, &mut dst, &options)
        .map_err(|e| PipelineError::buffer_conversion(format!("crop/scale: {}", e)))?;

    Ok(dst.into_vec())
}
