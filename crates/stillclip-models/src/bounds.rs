//! Start/end of real content within a waveform.

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
#[error("invalid content bounds {start_ms}..{end_ms} for {duration_ms}ms of audio")]
pub struct BoundsError {
    pub start_ms: u64,
    pub end_ms: u64,
    pub duration_ms: u64,
}

/// Content bounds in milliseconds.
///
/// Invariant: `start_ms <= end_ms <= duration_ms` of the buffer they were
/// detected in. Only constructed through [`ContentBounds::new`] or the
/// span helpers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentBounds {
    start_ms: u64,
    end_ms: u64,
}

impl ContentBounds {
    /// Create bounds, checking them against the buffer duration.
    pub fn new(start_ms: u64, end_ms: u64, duration_ms: u64) -> Result<Self, BoundsError> {
        if start_ms > end_ms || end_ms > duration_ms {
            return Err(BoundsError {
                start_ms,
                end_ms,
                duration_ms,
            });
        }
        Ok(Self { start_ms, end_ms })
    }

    /// The whole buffer.
    pub fn full(duration_ms: u64) -> Self {
        Self {
            start_ms: 0,
            end_ms: duration_ms,
        }
    }

    /// Bounds of a zero-length buffer.
    pub fn empty() -> Self {
        Self::full(0)
    }

    pub fn start_ms(&self) -> u64 {
        self.start_ms
    }

    pub fn end_ms(&self) -> u64 {
        self.end_ms
    }

    pub fn duration_ms(&self) -> u64 {
        self.end_ms - self.start_ms
    }

    pub fn duration_secs(&self) -> f64 {
        self.duration_ms() as f64 / 1000.0
    }

    /// Whether these bounds cover the entire buffer.
    pub fn is_full(&self, duration_ms: u64) -> bool {
        self.start_ms == 0 && self.end_ms == duration_ms
    }
}
