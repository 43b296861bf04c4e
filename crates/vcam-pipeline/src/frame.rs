//! Reference-counted planar video frames.
//!
//! A [`VideoFrame`] owns planar 4:2:0 (I420) pixel data behind an `Arc`.
//! The delivery caller owns the frame for the duration of the call; any
//! component that needs it past the synchronous return must extend its
//! lifetime with [`VideoFrame::retain`], which hands out a [`FrameHandle`]
//! ownership token. The token releases the reference when dropped, so the
//! release happens on every exit path, panics included.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::{PipelineError, PipelineResult};

/// Frame rotation relative to the sensor's native orientation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Rotation {
    #[default]
    Deg0,
    Deg90,
    Deg180,
    Deg270,
}

/// Owned planar I420 pixel storage plus capture metadata.
#[derive(Debug)]
struct FrameBuffer {
    width: u32,
    height: u32,
    /// Full-resolution luma plane, `y_stride * height` bytes.
    y: Vec<u8>,
    /// Quarter-resolution chroma planes, `chroma_stride * height / 2` bytes each.
    u: Vec<u8>,
    v: Vec<u8>,
    y_stride: usize,
    chroma_stride: usize,
    timestamp_ms: i64,
    rotation: Rotation,
}

/// A reference-counted planar 4:2:0 video frame.
///
/// Cloning is a cheap reference-count increment; pixel data is never
/// copied. Two frames can be checked for buffer identity with
/// [`VideoFrame::same_buffer`].
#[derive(Debug, Clone)]
pub struct VideoFrame {
    inner: Arc<FrameBuffer>,
}

impl VideoFrame {
    /// Allocate a zero-initialized frame (black luma, neutral chroma).
    ///
    /// Dimensions must be even and at least 2x2. Allocation is fallible:
    /// exhausted memory surfaces as [`PipelineError::ResourceExhausted`]
    /// instead of aborting.
    pub fn alloc(
        width: u32,
        height: u32,
        timestamp_ms: i64,
        rotation: Rotation,
    ) -> PipelineResult<Self> {
        check_dims(width, height)?;
        let y_stride = width as usize;
        let chroma_stride = (width / 2) as usize;
        let y = try_filled(y_stride * height as usize, 16)?;
        let u = try_filled(chroma_stride * (height / 2) as usize, 128)?;
        let v = try_filled(chroma_stride * (height / 2) as usize, 128)?;
        Ok(Self {
            inner: Arc::new(FrameBuffer {
                width,
                height,
                y,
                u,
                v,
                y_stride,
                chroma_stride,
                timestamp_ms,
                rotation,
            }),
        })
    }

    /// Build a frame from pre-existing tightly packed planes.
    pub fn from_planes(
        width: u32,
        height: u32,
        y: Vec<u8>,
        u: Vec<u8>,
        v: Vec<u8>,
        timestamp_ms: i64,
        rotation: Rotation,
    ) -> PipelineResult<Self> {
        check_dims(width, height)?;
        let y_stride = width as usize;
        let chroma_stride = (width / 2) as usize;
        let chroma_len = chroma_stride * (height / 2) as usize;
        if y.len() != y_stride * height as usize {
            return Err(PipelineError::invalid_frame(format!(
                "luma plane is {} bytes, expected {}",
                y.len(),
                y_stride * height as usize
            )));
        }
        if u.len() != chroma_len || v.len() != chroma_len {
            return Err(PipelineError::invalid_frame(format!(
                "chroma planes are {}/{} bytes, expected {}",
                u.len(),
                v.len(),
                chroma_len
            )));
        }
        Ok(Self {
            inner: Arc::new(FrameBuffer {
                width,
                height,
                y,
                u,
                v,
                y_stride,
                chroma_stride,
                timestamp_ms,
                rotation,
            }),
        })
    }

    /// Frame width in pixels.
    pub fn width(&self) -> u32 {
        self.inner.width
    }

    /// Frame height in pixels.
    pub fn height(&self) -> u32 {
        self.inner.height
    }

    /// Monotonic capture timestamp in milliseconds.
    pub fn timestamp_ms(&self) -> i64 {
        self.inner.timestamp_ms
    }

    /// Capture rotation.
    pub fn rotation(&self) -> Rotation {
        self.inner.rotation
    }

    /// Luma plane bytes (row-major, [`Self::y_stride`] bytes per row).
    pub fn y_plane(&self) -> &[u8] {
        &self.inner.y
    }

    /// U chroma plane bytes (half resolution on both axes).
    pub fn u_plane(&self) -> &[u8] {
        &self.inner.u
    }

    /// V chroma plane bytes (half resolution on both axes).
    pub fn v_plane(&self) -> &[u8] {
        &self.inner.v
    }

    /// Bytes per luma row.
    pub fn y_stride(&self) -> usize {
        self.inner.y_stride
    }

    /// Bytes per chroma row.
    pub fn chroma_stride(&self) -> usize {
        self.inner.chroma_stride
    }

    /// Luma sample at (x, y), bounds-checked.
    pub fn luma_at(&self, x: u32, y: u32) -> Option<u8> {
        if x >= self.inner.width || y >= self.inner.height {
            return None;
        }
        self.inner
            .y
            .get(y as usize * self.inner.y_stride + x as usize)
            .copied()
    }

    /// Extend this frame's lifetime past the current call.
    ///
    /// The returned token owns one reference and releases it exactly
    /// once, when dropped.
    pub fn retain(&self) -> FrameHandle {
        FrameHandle {
            frame: self.clone(),
        }
    }

    /// Current strong reference count, for lifetime assertions in tests.
    pub fn ref_count(&self) -> usize {
        Arc::strong_count(&self.inner)
    }

    /// Whether two frames share the same underlying pixel buffer.
    pub fn same_buffer(&self, other: &VideoFrame) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

/// Ownership token produced by [`VideoFrame::retain`].
///
/// Holds the frame alive until dropped. Dropping is the release; there
/// is no way to release twice or forget to release.
#[derive(Debug)]
pub struct FrameHandle {
    frame: VideoFrame,
}

impl FrameHandle {
    /// Access the retained frame.
    pub fn frame(&self) -> &VideoFrame {
        &self.frame
    }
}

impl std::ops::Deref for FrameHandle {
    type Target = VideoFrame;

    fn deref(&self) -> &VideoFrame {
        &self.frame
    }
}

fn check_dims(width: u32, height: u32) -> PipelineResult<()> {
    if width < 2 || height < 2 || width % 2 != 0 || height % 2 != 0 {
        return Err(PipelineError::invalid_frame(format!(
            "I420 dimensions must be even and >= 2x2, got {}x{}",
            width, height
        )));
    }
    Ok(())
}

/// Fallible allocation of a filled plane buffer.
pub(crate) fn try_filled(len: usize, fill: u8) -> PipelineResult<Vec<u8>> {
    let mut buf = Vec::new();
    buf.try_reserve_exact(len)
        .map_err(|_| PipelineError::resource_exhausted(format!("plane allocation of {} bytes", len)))?;
    buf.resize(len, fill);
    Ok(buf)
}
