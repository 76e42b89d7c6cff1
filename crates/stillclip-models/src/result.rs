//! Terminal outcome of a pipeline request.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::bounds::ContentBounds;
use crate::stage::StageKind;

/// Failure categories surfaced to the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ErrorKind {
    /// Missing or empty upload. Client-side problem.
    InputError,
    /// The external media tool cannot be invoked.
    ToolUnavailable,
    /// A stage's process failed.
    StageFailure { stage: StageKind },
    /// Server-side fault outside any stage, such as an unwritable work
    /// directory.
    Internal,
}

impl ErrorKind {
    /// Whether the caller, not the server, is at fault.
    pub fn is_client_error(&self) -> bool {
        matches!(self, ErrorKind::InputError)
    }
}

/// Exactly one of these is produced per request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum PipelineResult {
    Delivered {
        output_path: PathBuf,
        bounds: ContentBounds,
        /// Loudness normalization fell back to a plain encode.
        degraded: bool,
    },
    Failed {
        kind: ErrorKind,
        message: String,
    },
}

impl PipelineResult {
    pub fn is_success(&self) -> bool {
        matches!(self, PipelineResult::Delivered { .. })
    }

    pub fn output_path(&self) -> Option<&Path> {
        match self {
            PipelineResult::Delivered { output_path, .. } => Some(output_path),
            PipelineResult::Failed { .. } => None,
        }
    }

    pub fn error_kind(&self) -> Option<ErrorKind> {
        match self {
            PipelineResult::Delivered { .. } => None,
            PipelineResult::Failed { kind, .. } => Some(*kind),
        }
    }
}
