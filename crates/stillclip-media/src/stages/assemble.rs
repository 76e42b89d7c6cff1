//! Final MP4 assembly.

use std::path::Path;

use async_trait::async_trait;
use stillclip_models::{EncodingConfig, PipelineConfig, StageKind};
use tracing::debug;

use super::{ensure_exists, expect_inputs, Stage, StageOutput};
use crate::command::{FfmpegCommand, FfmpegRunner};
use crate::error::MediaResult;

/// Loops the prepared frame for the length of the normalized audio and muxes
/// both into an MP4 with its index at the front.
#[derive(Debug, Clone)]
pub struct MediaAssembler {
    runner: FfmpegRunner,
    encoding: EncodingConfig,
}

impl MediaAssembler {
    pub fn new(runner: FfmpegRunner, config: &PipelineConfig) -> Self {
        Self {
            runner,
            encoding: config.encoding.clone(),
        }
    }

    fn command(&self, frame: &Path, audio: &Path, output: &Path) -> FfmpegCommand {
        FfmpegCommand::new(frame, output)
            .loop_image(self.encoding.framerate)
            .add_input(audio)
            .output_args(self.encoding.to_ffmpeg_args())
            .shortest()
            .faststart()
    }
}

#[async_trait]
impl Stage for MediaAssembler {
    fn kind(&self) -> StageKind {
        StageKind::Assembly
    }

    fn required_tools(&self) -> Vec<String> {
        vec![self.runner.binary().to_string()]
    }

    async fn execute(&self, inputs: &[&Path], output: &Path) -> MediaResult<StageOutput> {
        let [frame, audio] = expect_inputs::<2>(self.kind(), inputs)?;
        ensure_exists(frame)?;
        ensure_exists(audio)?;

        self.runner
            .run_with_progress(&self.command(frame, audio, output), |p| {
                if p.is_complete {
                    debug!(frames = p.frame, out_time_ms = p.out_time_ms, "Assembly encode finished");
                } else {
                    debug!(frame = p.frame, speed = p.speed, "Assembly progress");
                }
            })
            .await?;

        Ok(StageOutput::written())
    }
}
