//! Structured request logging utilities.

use stillclip_models::{PipelineState, StageKind};
use tracing::{error, info, warn, Span};

/// Request logger for structured logging with consistent fields.
#[derive(Debug, Clone)]
pub struct RequestLogger {
    request_id: String,
    operation: String,
}

impl RequestLogger {
    pub fn new(request_id: impl Into<String>, operation: &str) -> Self {
        Self {
            request_id: request_id.into(),
            operation: operation.to_string(),
        }
    }

    pub fn log_start(&self, message: &str) {
        info!(
            request_id = %self.request_id,
            operation = %self.operation,
            "Request started: {}", message
        );
    }

    /// Log a state machine step.
    pub fn log_transition(&self, stage: StageKind, state: PipelineState, elapsed_ms: u128) {
        info!(
            request_id = %self.request_id,
            operation = %self.operation,
            stage = %stage,
            state = %state,
            elapsed_ms,
            "Stage complete"
        );
    }

    pub fn log_warning(&self, message: &str) {
        warn!(
            request_id = %self.request_id,
            operation = %self.operation,
            "Request warning: {}", message
        );
    }

    pub fn log_error(&self, message: &str) {
        error!(
            request_id = %self.request_id,
            operation = %self.operation,
            "Request error: {}", message
        );
    }

    pub fn log_completion(&self, message: &str) {
        info!(
            request_id = %self.request_id,
            operation = %self.operation,
            "Request completed: {}", message
        );
    }

    pub fn request_id(&self) -> &str {
        &self.request_id
    }

    pub fn operation(&self) -> &str {
        &self.operation
    }

    /// Span carrying the request fields for everything logged inside it.
    pub fn create_span(&self) -> Span {
        tracing::info_span!(
            "request",
            request_id = %self.request_id,
            operation = %self.operation
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_logger_creation() {
        let logger = RequestLogger::new("3f2c", "assemble_clip");
        assert_eq!(logger.request_id(), "3f2c");
        assert_eq!(logger.operation(), "assemble_clip");
    }
}
