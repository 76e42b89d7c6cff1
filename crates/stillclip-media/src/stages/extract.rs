//! Audio track extraction.

use std::path::Path;

use async_trait::async_trait;
use stillclip_models::{PipelineConfig, StageKind};

use super::{ensure_exists, expect_inputs, Stage, StageOutput};
use crate::command::{FfmpegCommand, FfmpegRunner};
use crate::error::MediaResult;

/// Decodes the video's audio track to PCM WAV at the working sample rate.
#[derive(Debug, Clone)]
pub struct AudioExtractor {
    runner: FfmpegRunner,
    sample_rate: u32,
    channels: u16,
}

impl AudioExtractor {
    pub fn new(runner: FfmpegRunner, config: &PipelineConfig) -> Self {
        Self {
            runner,
            sample_rate: config.sample_rate,
            channels: config.channels,
        }
    }

    fn command(&self, video: &Path, output: &Path) -> FfmpegCommand {
        FfmpegCommand::new(video, output)
            .no_video()
            .audio_format(self.sample_rate, self.channels)
            .audio_codec("pcm_s16le")
            .format("wav")
    }
}

#[async_trait]
impl Stage for AudioExtractor {
    fn kind(&self) -> StageKind {
        StageKind::AudioExtraction
    }

    fn required_tools(&self) -> Vec<String> {
        vec![self.runner.binary().to_string()]
    }

    async fn execute(&self, inputs: &[&Path], output: &Path) -> MediaResult<StageOutput> {
        let [video] = expect_inputs::<1>(self.kind(), inputs)?;
        ensure_exists(video)?;

        self.runner.run(&self.command(video, output)).await?;
        Ok(StageOutput::written())
    }
}
