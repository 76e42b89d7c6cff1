//! Shared data models for the StillClip pipeline.
//!
//! This crate provides Serde-serializable types for:
//! - Media artifacts and content bounds
//! - Pipeline requests, results, and the stage state machine
//! - Encoding and pipeline configuration

pub mod asset;
pub mod bounds;
pub mod encoding;
pub mod pipeline_config;
pub mod request;
pub mod result;
pub mod stage;

// Re-export common types
pub use asset::{AssetKind, MediaAsset};
pub use bounds::{BoundsError, ContentBounds};
pub use encoding::EncodingConfig;
pub use pipeline_config::{ConfigError, PipelineConfig};
pub use request::{sanitize_base_name, PipelineRequest, UploadedFile};
pub use result::{ErrorKind, PipelineResult};
pub use stage::{PipelineState, StageKind};
