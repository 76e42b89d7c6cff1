//! EBU R128 loudness normalization with a plain-encode fallback.

use std::path::Path;

use async_trait::async_trait;
use stillclip_models::{EncodingConfig, PipelineConfig, StageKind};
use tracing::{info, warn};

use super::{ensure_exists, expect_inputs, Stage, StageOutput};
use crate::command::{FfmpegCommand, FfmpegRunner};
use crate::error::MediaResult;
use crate::filters::loudnorm;

/// Encodes the trimmed audio to AAC through FFmpeg's `loudnorm` filter.
///
/// If the filter pass fails the audio is encoded without it and the output
/// is marked degraded. Only a failure of that second pass is an error.
#[derive(Debug, Clone)]
pub struct LoudnessNormalizer {
    runner: FfmpegRunner,
    integrated_lufs: f64,
    true_peak_db: f64,
    range_lu: f64,
    sample_rate: u32,
    encoding: EncodingConfig,
}

impl LoudnessNormalizer {
    pub fn new(runner: FfmpegRunner, config: &PipelineConfig) -> Self {
        Self {
            runner,
            integrated_lufs: config.loudness_target_lufs,
            true_peak_db: config.true_peak_ceiling_db,
            range_lu: config.loudness_range_lu,
            sample_rate: config.sample_rate,
            encoding: config.encoding.clone(),
        }
    }

    fn normalize_command(&self, input: &Path, output: &Path) -> FfmpegCommand {
        // loudnorm upsamples internally; pin the output rate back down
        FfmpegCommand::new(input, output)
            .audio_filter(loudnorm(self.integrated_lufs, self.true_peak_db, self.range_lu))
            .output_arg("-ar")
            .output_arg(self.sample_rate.to_string())
            .output_args(self.encoding.audio_args())
    }

    fn plain_command(&self, input: &Path, output: &Path) -> FfmpegCommand {
        FfmpegCommand::new(input, output)
            .output_arg("-ar")
            .output_arg(self.sample_rate.to_string())
            .output_args(self.encoding.audio_args())
    }
}

#[async_trait]
impl Stage for LoudnessNormalizer {
    fn kind(&self) -> StageKind {
        StageKind::LoudnessNormalization
    }

    fn required_tools(&self) -> Vec<String> {
        vec![self.runner.binary().to_string()]
    }

    async fn execute(&self, inputs: &[&Path], output: &Path) -> MediaResult<StageOutput> {
        let [input] = expect_inputs::<1>(self.kind(), inputs)?;
        ensure_exists(input)?;

        match self.runner.run(&self.normalize_command(input, output)).await {
            Ok(()) => {
                info!(
                    target_lufs = self.integrated_lufs,
                    true_peak_db = self.true_peak_db,
                    "Loudness normalized"
                );
                Ok(StageOutput::written())
            }
            Err(e) => {
                warn!(
                    error = %e.diagnostic(),
                    "Loudness normalization failed, encoding without it"
                );
                self.runner.run(&self.plain_command(input, output)).await?;
                Ok(StageOutput::degraded())
            }
        }
    }
}
