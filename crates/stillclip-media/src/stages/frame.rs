//! Still image to canvas-sized frame.

use std::path::Path;

use async_trait::async_trait;
use stillclip_models::{PipelineConfig, StageKind};
use tracing::{debug, warn};

use super::{ensure_exists, expect_inputs, Stage, StageOutput};
use crate::command::{FfmpegCommand, FfmpegRunner};
use crate::error::MediaResult;
use crate::filters::{fit_and_pad, FitGeometry};

/// Fits the image inside the canvas, pads the remainder transparent-black,
/// and writes a single PNG frame.
#[derive(Debug, Clone)]
pub struct FramePreparer {
    runner: FfmpegRunner,
    width: u32,
    height: u32,
}

impl FramePreparer {
    pub fn new(runner: FfmpegRunner, config: &PipelineConfig) -> Self {
        Self {
            runner,
            width: config.canvas_width,
            height: config.canvas_height,
        }
    }

    fn command(&self, image: &Path, output: &Path) -> FfmpegCommand {
        FfmpegCommand::new(image, output)
            .video_filter(fit_and_pad(self.width, self.height))
            .single_frame()
    }
}

#[async_trait]
impl Stage for FramePreparer {
    fn kind(&self) -> StageKind {
        StageKind::FramePreparation
    }

    fn required_tools(&self) -> Vec<String> {
        vec![self.runner.binary().to_string()]
    }

    async fn execute(&self, inputs: &[&Path], output: &Path) -> MediaResult<StageOutput> {
        let [image] = expect_inputs::<1>(self.kind(), inputs)?;
        ensure_exists(image)?;

        // Header sniffing is informational; FFmpeg decides what it can decode
        match image::image_dimensions(image) {
            Ok((w, h)) => {
                if let Some(g) = FitGeometry::compute(w, h, self.width, self.height) {
                    debug!(
                        source_width = w,
                        source_height = h,
                        scaled_width = g.scaled_width,
                        scaled_height = g.scaled_height,
                        pad_x = g.pad_x,
                        pad_y = g.pad_y,
                        "Fitting image to canvas"
                    );
                }
            }
            Err(e) => warn!(error = %e, "Could not read image header, passing to FFmpeg as is"),
        }

        self.runner.run(&self.command(image, output)).await?;
        Ok(StageOutput::written())
    }
}
