//! Worker error types.

use stillclip_media::MediaError;
use stillclip_models::{ErrorKind, StageKind};
use thiserror::Error;

pub type WorkerResult<T> = Result<T, WorkerError>;

#[derive(Debug, Error)]
pub enum WorkerError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Tool unavailable: {0}")]
    ToolUnavailable(String),

    #[error("{stage} failed: {message}")]
    StageFailed { stage: StageKind, message: String },

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Media error: {0}")]
    Media(#[from] MediaError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl WorkerError {
    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }

    pub fn stage_failed(stage: StageKind, msg: impl Into<String>) -> Self {
        Self::StageFailed {
            stage,
            message: msg.into(),
        }
    }

    pub fn config_error(msg: impl Into<String>) -> Self {
        Self::ConfigError(msg.into())
    }

    /// Attribute a media error to the stage that raised it. A missing or
    /// broken executable is reported as such, not as a stage failure.
    pub fn from_stage(stage: StageKind, err: MediaError) -> Self {
        if err.is_tool_missing() {
            Self::ToolUnavailable(err.diagnostic())
        } else {
            Self::stage_failed(stage, err.diagnostic())
        }
    }

    /// Category reported to the caller.
    pub fn kind(&self) -> ErrorKind {
        match self {
            WorkerError::ToolUnavailable(_) => ErrorKind::ToolUnavailable,
            WorkerError::StageFailed { stage, .. } => ErrorKind::StageFailure { stage: *stage },
            WorkerError::Media(e) if e.is_tool_missing() => ErrorKind::ToolUnavailable,
            WorkerError::InvalidInput(_) => ErrorKind::InputError,
            WorkerError::ConfigError(_) | WorkerError::Media(_) | WorkerError::Io(_) => {
                ErrorKind::Internal
            }
        }
    }
}
