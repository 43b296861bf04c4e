//! Error types for pipeline operations.

use thiserror::Error;
use vcam_models::ConfigError;

/// Result type for pipeline operations.
pub type PipelineResult<T> = Result<T, PipelineError>;

/// Errors that can occur in the auto-zoom pipeline.
///
/// Only `Config` and `NoRuntime` are surfaced to the caller (at
/// construction). Everything else is contained per frame: the affected
/// frame is forwarded unmodified and the pipeline keeps running.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("no tokio runtime available on the constructing thread")]
    NoRuntime,

    #[error("subject detection failed: {0}")]
    DetectionFailed(String),

    #[error("buffer conversion failed: {0}")]
    BufferConversion(String),

    #[error("resource exhausted: {0}")]
    ResourceExhausted(String),

    #[error("invalid frame: {0}")]
    InvalidFrame(String),
}

impl PipelineError {
    /// Create a detection failure error.
    pub fn detection_failed(message: impl Into<String>) -> Self {
        Self::DetectionFailed(message.into())
    }

    /// Create a buffer conversion error.
    pub fn buffer_conversion(message: impl Into<String>) -> Self {
        Self::BufferConversion(message.into())
    }

    /// Create a resource exhaustion error.
    pub fn resource_exhausted(message: impl Into<String>) -> Self {
        Self::ResourceExhausted(message.into())
    }

    /// Create an invalid frame error.
    pub fn invalid_frame(message: impl Into<String>) -> Self {
        Self::InvalidFrame(message.into())
    }

    /// Whether this error must force the live crop rectangle back to
    /// passthrough before the next frame.
    pub fn resets_crop(&self) -> bool {
        matches!(self, Self::ResourceExhausted(_))
    }
}
