#![deny(unreachable_patterns)]
//! Media processing for still-image clips.
//!
//! This crate provides:
//! - Type-safe FFmpeg command building and execution
//! - Progress parsing from `-progress pipe:2`
//! - In-process audio analysis (content bounds, peak gain)
//! - The pipeline stages behind a common [`Stage`] trait

pub mod audio;
pub mod command;
pub mod error;
pub mod filters;
pub mod fs_utils;
pub mod probe;
pub mod progress;
pub mod stages;

pub use audio::{AudioBuffer, BoundsDetector};
pub use command::{check_ffmpeg, check_ffprobe, verify_tool, FfmpegCommand, FfmpegRunner};
pub use error::{MediaError, MediaResult};
pub use filters::FitGeometry;
pub use fs_utils::{move_file, remove_file_if_exists};
pub use probe::{probe_media, AudioStreamInfo, MediaInfo, VideoStreamInfo};
pub use progress::FfmpegProgress;
pub use stages::{
    AudioExtractor, FramePreparer, LoudnessNormalizer, MediaAssembler, SilenceTrimmer, Stage,
    StageOutput,
};
