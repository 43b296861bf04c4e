//! Shared data models for the vcam auto-zoom pipeline.
//!
//! This crate provides Serde-serializable types for:
//! - Normalized detection regions
//! - Pipeline configuration with construction-time validation
//! - Pipeline statistics snapshots

pub mod config;
pub mod rect;
pub mod stats;

// Re-export common types
pub use config::{ConfigError, PipelineConfig, SmoothingMode};
pub use rect::NormalizedRegion;
pub use stats::StatsSnapshot;
