//! Pipeline stages.
//!
//! Each stage turns one or more input files into a single output file. The
//! worker drives them in order and owns every path it hands in, so a stage
//! never chooses where its output lives.
//!
//! ```text
//! image ──► FramePreparer ───────────────────────────────┐
//!                                                         ▼
//! video ──► AudioExtractor ──► SilenceTrimmer ──► LoudnessNormalizer ──► MediaAssembler
//! ```

mod assemble;
mod extract;
mod frame;
mod loudness;
mod trim;

use std::path::Path;

use async_trait::async_trait;
use stillclip_models::{ContentBounds, StageKind};

use crate::error::{MediaError, MediaResult};

pub use assemble::MediaAssembler;
pub use extract::AudioExtractor;
pub use frame::FramePreparer;
pub use loudness::LoudnessNormalizer;
pub use trim::SilenceTrimmer;

/// What a stage reports beyond the file it wrote.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StageOutput {
    /// Content bounds, for the stage that detects them
    pub bounds: Option<ContentBounds>,
    /// The stage fell back to a lesser result
    pub degraded: bool,
}

impl StageOutput {
    /// Output written with nothing else to report.
    pub fn written() -> Self {
        Self::default()
    }

    pub fn with_bounds(bounds: ContentBounds) -> Self {
        Self {
            bounds: Some(bounds),
            degraded: false,
        }
    }

    pub fn degraded() -> Self {
        Self {
            bounds: None,
            degraded: true,
        }
    }
}

/// A single pipeline step.
#[async_trait]
pub trait Stage: Send + Sync {
    /// Which step this is, for state tracking and error attribution.
    fn kind(&self) -> StageKind;

    /// External executables this stage shells out to.
    fn required_tools(&self) -> Vec<String> {
        Vec::new()
    }

    /// Read `inputs`, write `output`.
    async fn execute(&self, inputs: &[&Path], output: &Path) -> MediaResult<StageOutput>;

    /// Wait until nothing started by an abandoned `execute` can still write
    /// `output`. Stages whose work stops with their future return at once.
    async fn settle(&self, _output: &Path) {}
}

/// Destructure `inputs` into exactly `N` paths.
pub(crate) fn expect_inputs<'a, const N: usize>(
    kind: StageKind,
    inputs: &[&'a Path],
) -> MediaResult<[&'a Path; N]> {
    <[&Path; N]>::try_from(inputs).map_err(|_| {
        MediaError::internal(format!(
            "{} expects {} input(s), got {}",
            kind,
            N,
            inputs.len()
        ))
    })
}

/// Fail early with a clear error when an input was never written.
pub(crate) fn ensure_exists(path: &Path) -> MediaResult<()> {
    if path.exists() {
        Ok(())
    } else {
        Err(MediaError::FileNotFound(path.to_path_buf()))
    }
}
