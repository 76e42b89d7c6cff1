//! Still-image clip worker.
//!
//! This crate provides:
//! - The request pipeline (stage sequencing, state machine, timeouts)
//! - Per-request artifact arena with guaranteed cleanup
//! - Configuration, structured logging and metrics

pub mod arena;
pub mod config;
pub mod error;
pub mod logging;
pub mod metrics;
pub mod pipeline;

pub use arena::ArtifactArena;
pub use config::WorkerConfig;
pub use error::{WorkerError, WorkerResult};
pub use logging::RequestLogger;
pub use pipeline::{Pipeline, StageSet};
