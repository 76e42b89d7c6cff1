//! In-process audio analysis.
//!
//! ```text
//! ┌──────────────┐    ┌────────────────┐    ┌──────────────┐
//! │ Extracted    │───►│ BoundsDetector │───►│ slice_ms     │
//! │ WAV (48 kHz) │    │ (start, end)   │    │ + peak gain  │
//! └──────────────┘    └────────────────┘    └──────────────┘
//! ```

mod bounds;
mod buffer;
mod gain;

pub use bounds::BoundsDetector;
pub use buffer::{amplitude_to_dbfs, dbfs_to_amplitude, AudioBuffer};
pub use gain::normalize_peak;
