//! FFmpeg command builder and runner.

use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::process::Stdio;

use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Command;
use tracing::debug;

use crate::error::{MediaError, MediaResult};
use crate::progress::{is_progress_line, parse_progress_line, FfmpegProgress};

/// Default FFmpeg executable name.
pub const FFMPEG_BIN: &str = "ffmpeg";
/// Default FFprobe executable name.
pub const FFPROBE_BIN: &str = "ffprobe";

/// Diagnostic lines kept from stderr for error reporting.
const STDERR_TAIL_LINES: usize = 20;

/// One `-i` input with its own leading arguments.
#[derive(Debug, Clone)]
struct FfmpegInput {
    args: Vec<String>,
    path: PathBuf,
}

/// Builder for FFmpeg commands.
#[derive(Debug, Clone)]
pub struct FfmpegCommand {
    /// Inputs in `-i` order
    inputs: Vec<FfmpegInput>,
    /// Output file path
    output: PathBuf,
    /// Output arguments (after the last -i)
    output_args: Vec<String>,
}

impl FfmpegCommand {
    /// Create a new FFmpeg command.
    pub fn new(input: impl AsRef<Path>, output: impl AsRef<Path>) -> Self {
        Self {
            inputs: vec![FfmpegInput {
                args: Vec::new(),
                path: input.as_ref().to_path_buf(),
            }],
            output: output.as_ref().to_path_buf(),
            output_args: Vec::new(),
        }
    }

    /// Add another input. Subsequent `input_arg` calls apply to it.
    pub fn add_input(mut self, path: impl AsRef<Path>) -> Self {
        self.inputs.push(FfmpegInput {
            args: Vec::new(),
            path: path.as_ref().to_path_buf(),
        });
        self
    }

    /// Add an argument before the most recently added `-i`.
    pub fn input_arg(mut self, arg: impl Into<String>) -> Self {
        if let Some(input) = self.inputs.last_mut() {
            input.args.push(arg.into());
        }
        self
    }

    /// Add multiple input arguments to the most recent input.
    pub fn input_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        if let Some(input) = self.inputs.last_mut() {
            input.args.extend(args.into_iter().map(Into::into));
        }
        self
    }

    /// Add output arguments (after -i).
    pub fn output_arg(mut self, arg: impl Into<String>) -> Self {
        self.output_args.push(arg.into());
        self
    }

    /// Add multiple output arguments.
    pub fn output_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.output_args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Loop a single image input indefinitely at the given frame rate.
    pub fn loop_image(self, framerate: u32) -> Self {
        self.input_args(["-loop", "1", "-framerate"])
            .input_arg(framerate.to_string())
    }

    /// Set video filter.
    pub fn video_filter(self, filter: impl Into<String>) -> Self {
        self.output_arg("-vf").output_arg(filter)
    }

    /// Set audio filter.
    pub fn audio_filter(self, filter: impl Into<String>) -> Self {
        self.output_arg("-af").output_arg(filter)
    }

    /// Drop video streams.
    pub fn no_video(self) -> Self {
        self.output_arg("-vn")
    }

    /// Set output sample rate and channel count.
    pub fn audio_format(self, sample_rate: u32, channels: u16) -> Self {
        self.output_arg("-ac")
            .output_arg(channels.to_string())
            .output_arg("-ar")
            .output_arg(sample_rate.to_string())
    }

    /// Force the output container format.
    pub fn format(self, format: impl Into<String>) -> Self {
        self.output_arg("-f").output_arg(format)
    }

    /// Set audio codec.
    pub fn audio_codec(self, codec: impl Into<String>) -> Self {
        self.output_arg("-c:a").output_arg(codec)
    }

    /// Set audio bitrate.
    pub fn audio_bitrate(self, bitrate: impl Into<String>) -> Self {
        self.output_arg("-b:a").output_arg(bitrate)
    }

    /// Extract single frame.
    pub fn single_frame(self) -> Self {
        self.output_arg("-frames:v").output_arg("1")
    }

    /// Stop at the end of the shortest input.
    pub fn shortest(self) -> Self {
        self.output_arg("-shortest")
    }

    /// Move the MP4 index to the front for progressive playback.
    pub fn faststart(self) -> Self {
        self.output_arg("-movflags").output_arg("+faststart")
    }

    /// Build the command arguments.
    pub fn build_args(&self) -> Vec<String> {
        let mut args = Vec::new();

        args.push("-y".to_string());
        args.push("-hide_banner".to_string());
        args.push("-nostdin".to_string());

        args.push("-v".to_string());
        args.push("error".to_string());

        // Progress output to stderr
        args.push("-progress".to_string());
        args.push("pipe:2".to_string());

        for input in &self.inputs {
            args.extend(input.args.iter().cloned());
            args.push("-i".to_string());
            args.push(input.path.to_string_lossy().to_string());
        }

        args.extend(self.output_args.iter().cloned());

        args.push(self.output.to_string_lossy().to_string());

        args
    }
}

/// Runner for FFmpeg commands with progress tracking.
///
/// Children are spawned with `kill_on_drop`, so dropping a pending `run`
/// future (e.g. from an outer request timeout) terminates the process.
#[derive(Debug, Clone)]
pub struct FfmpegRunner {
    /// Executable name or path
    binary: String,
}

impl Default for FfmpegRunner {
    fn default() -> Self {
        Self::new()
    }
}

impl FfmpegRunner {
    /// Create a new runner using `ffmpeg` from PATH.
    pub fn new() -> Self {
        Self {
            binary: FFMPEG_BIN.to_string(),
        }
    }

    /// Use a specific FFmpeg executable.
    pub fn with_binary(mut self, binary: impl Into<String>) -> Self {
        self.binary = binary.into();
        self
    }

    /// Executable this runner invokes.
    pub fn binary(&self) -> &str {
        &self.binary
    }

    /// Run an FFmpeg command.
    pub async fn run(&self, cmd: &FfmpegCommand) -> MediaResult<()> {
        self.run_with_progress(cmd, |_| {}).await
    }

    /// Run an FFmpeg command with progress callback.
    pub async fn run_with_progress<F>(&self, cmd: &FfmpegCommand, progress_callback: F) -> MediaResult<()>
    where
        F: Fn(FfmpegProgress) + Send + 'static,
    {
        let program = which::which(&self.binary).map_err(|_| MediaError::FfmpegNotFound)?;

        let args = cmd.build_args();
        debug!("Running FFmpeg: {} {}", self.binary, args.join(" "));

        let mut child = Command::new(program)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()?;

        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| MediaError::internal("FFmpeg stderr not captured"))?;
        let mut reader = BufReader::new(stderr).lines();

        // Split stderr into progress snapshots and a bounded diagnostic tail
        let stderr_handle = tokio::spawn(async move {
            let mut current_progress = FfmpegProgress::default();
            let mut tail: VecDeque<String> = VecDeque::with_capacity(STDERR_TAIL_LINES);

            while let Ok(Some(line)) = reader.next_line().await {
                if is_progress_line(&line) {
                    if let Some(progress) = parse_progress_line(&line, &mut current_progress) {
                        progress_callback(progress);
                    }
                    continue;
                }
                if line.trim().is_empty() {
                    continue;
                }
                if tail.len() == STDERR_TAIL_LINES {
                    tail.pop_front();
                }
                tail.push_back(line);
            }

            tail
        });

        let status = child.wait().await;
        let tail = stderr_handle.await.unwrap_or_default();

        let status = status?;
        if status.success() {
            return Ok(());
        }

        let message = last_diagnostic_line(tail.iter().map(String::as_str))
            .unwrap_or("FFmpeg exited with non-zero status")
            .to_string();
        let stderr = Vec::from(tail).join("\n");

        Err(MediaError::ffmpeg_failed(message, Some(stderr), status.code()))
    }
}

/// Last non-empty line that is not part of the progress stream.
pub fn last_diagnostic_line<'a>(lines: impl DoubleEndedIterator<Item = &'a str>) -> Option<&'a str> {
    lines
        .rev()
        .map(str::trim)
        .find(|line| !line.is_empty() && !is_progress_line(line))
}

/// Check if FFmpeg is available.
pub fn check_ffmpeg() -> MediaResult<PathBuf> {
    which::which(FFMPEG_BIN).map_err(|_| MediaError::FfmpegNotFound)
}

/// Check if FFprobe is available.
pub fn check_ffprobe() -> MediaResult<PathBuf> {
    which::which(FFPROBE_BIN).map_err(|_| MediaError::FfprobeNotFound)
}

/// Resolve `binary` and confirm it answers `-version`.
pub async fn verify_tool(binary: &str) -> MediaResult<PathBuf> {
    let path = which::which(binary)
        .map_err(|e| MediaError::tool_unavailable(binary, format!("not found in PATH ({})", e)))?;

    let output = Command::new(&path)
        .arg("-version")
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .output()
        .await
        .map_err(|e| MediaError::tool_unavailable(binary, e.to_string()))?;

    if !output.status.success() {
        return Err(MediaError::tool_unavailable(
            binary,
            format!("`{} -version` exited with {:?}", binary, output.status.code()),
        ));
    }

    if let Some(first) = String::from_utf8_lossy(&output.stdout).lines().next() {
        debug!(tool = binary, path = %path.display(), "{}", first);
    }

    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_builder() {
        let cmd = FfmpegCommand::new("input.wav", "output.m4a")
            .audio_filter("loudnorm=I=-16:TP=-1.5:LRA=7")
            .audio_codec("aac")
            .audio_bitrate("320k");

        let args = cmd.build_args();
        assert_eq!(args.first().map(String::as_str), Some("-y"));
        assert_eq!(args.last().map(String::as_str), Some("output.m4a"));

        let joined = args.join(" ");
        assert!(joined.contains("-progress pipe:2"));
        assert!(joined.contains("-i input.wav -af loudnorm=I=-16:TP=-1.5:LRA=7"));
        assert!(joined.contains("-c:a aac -b:a 320k"));
    }

    #[test]
    fn test_input_args_attach_to_their_input() {
        let cmd = FfmpegCommand::new("frame.png", "out.mp4")
            .loop_image(30)
            .add_input("audio.m4a")
            .shortest()
            .faststart();

        let joined = cmd.build_args().join(" ");
        assert!(joined.contains("-loop 1 -framerate 30 -i frame.png -i audio.m4a -shortest"));
        assert!(joined.ends_with("-movflags +faststart out.mp4"));
    }

    #[test]
    fn test_audio_extraction_args() {
        let cmd = FfmpegCommand::new("in.mp4", "out.wav")
            .no_video()
            .audio_format(48000, 2)
            .format("wav");

        let joined = cmd.build_args().join(" ");
        assert!(joined.contains("-i in.mp4 -vn -ac 2 -ar 48000 -f wav out.wav"));
    }

    #[test]
    fn test_last_diagnostic_line_skips_progress() {
        let stderr = "[png @ 0x1] Invalid PNG signature\nin.png: Invalid data found when processing input\nprogress=end\n\n";
        assert_eq!(
            last_diagnostic_line(stderr.lines()),
            Some("in.png: Invalid data found when processing input")
        );
        assert_eq!(last_diagnostic_line("frame=1\nprogress=end".lines()), None);
    }

    #[tokio::test]
    async fn test_missing_binary_is_reported() {
        let runner = FfmpegRunner::new().with_binary("stillclip-no-such-ffmpeg");
        let cmd = FfmpegCommand::new("a", "b");
        let err = runner.run(&cmd).await.unwrap_err();
        assert!(matches!(err, MediaError::FfmpegNotFound));

        let err = verify_tool("stillclip-no-such-ffmpeg").await.unwrap_err();
        assert!(err.is_tool_missing());
    }
}
