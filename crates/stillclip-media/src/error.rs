//! Error types for media operations.

use std::path::PathBuf;
use thiserror::Error;

/// Result type for media operations.
pub type MediaResult<T> = Result<T, MediaError>;

/// Errors that can occur during media processing.
#[derive(Debug, Error)]
pub enum MediaError {
    #[error("FFmpeg not found in PATH")]
    FfmpegNotFound,

    #[error("FFprobe not found in PATH")]
    FfprobeNotFound,

    #[error("{tool} is not usable: {reason}")]
    ToolUnavailable { tool: String, reason: String },

    #[error("FFmpeg command failed: {message}")]
    FfmpegFailed {
        /// Last meaningful stderr line
        message: String,
        stderr: Option<String>,
        exit_code: Option<i32>,
    },

    #[error("FFprobe command failed: {message}")]
    FfprobeFailed {
        message: String,
        stderr: Option<String>,
    },

    #[error("File not found: {0}")]
    FileNotFound(PathBuf),

    #[error("Operation cancelled")]
    Cancelled,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON parse error: {0}")]
    JsonParse(#[from] serde_json::Error),

    #[error("WAV error: {0}")]
    Wav(#[from] hound::Error),

    #[error("Invalid audio: {0}")]
    InvalidAudio(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl MediaError {
    /// Create an FFmpeg failure error.
    pub fn ffmpeg_failed(
        message: impl Into<String>,
        stderr: Option<String>,
        exit_code: Option<i32>,
    ) -> Self {
        Self::FfmpegFailed {
            message: message.into(),
            stderr,
            exit_code,
        }
    }

    /// Create a tool-unavailable error.
    pub fn tool_unavailable(tool: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::ToolUnavailable {
            tool: tool.into(),
            reason: reason.into(),
        }
    }

    /// Create an invalid audio error.
    pub fn invalid_audio(message: impl Into<String>) -> Self {
        Self::InvalidAudio(message.into())
    }

    /// Create an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    /// Whether the failure means the external tool itself is missing.
    pub fn is_tool_missing(&self) -> bool {
        matches!(
            self,
            MediaError::FfmpegNotFound
                | MediaError::FfprobeNotFound
                | MediaError::ToolUnavailable { .. }
        )
    }

    /// Short, actionable cause: the tool's last diagnostic line where there
    /// is one, the error's display otherwise.
    pub fn diagnostic(&self) -> String {
        match self {
            MediaError::FfmpegFailed { message, .. } | MediaError::FfprobeFailed { message, .. } => {
                message.clone()
            }
            other => other.to_string(),
        }
    }
}
