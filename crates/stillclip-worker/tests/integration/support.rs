//! Fixtures shared by the integration tests.

use std::f64::consts::PI;
use std::path::{Path, PathBuf};
use std::process::Stdio;

use image::{Rgb, RgbImage};
use stillclip_media::{check_ffmpeg, check_ffprobe, AudioBuffer};
use stillclip_models::{PipelineConfig, PipelineRequest, UploadedFile};
use stillclip_worker::{Pipeline, WorkerConfig};
use tempfile::TempDir;
use tokio::process::Command;

pub const RED: Rgb<u8> = Rgb([200, 30, 30]);

/// Whether ffmpeg and ffprobe can be run. Prints why a test is skipped.
pub fn media_tools_available(test: &str) -> bool {
    let available = check_ffmpeg().is_ok() && check_ffprobe().is_ok();
    if !available {
        eprintln!("skipping {}: ffmpeg/ffprobe not on PATH", test);
    }
    available
}

/// Scratch work/output/input directories for one test.
pub struct Workspace {
    dir: TempDir,
}

impl Workspace {
    pub fn new() -> Self {
        Self {
            dir: TempDir::new().expect("Failed to create temp dir"),
        }
    }

    pub fn root(&self) -> &Path {
        self.dir.path()
    }

    pub fn path(&self, name: &str) -> PathBuf {
        self.dir.path().join(name)
    }

    pub fn work_dir(&self) -> PathBuf {
        self.path("work")
    }

    pub fn output_dir(&self) -> PathBuf {
        self.path("outputs")
    }

    pub fn pipeline(&self, pipeline: PipelineConfig) -> Pipeline {
        let config = WorkerConfig::default()
            .with_work_dir(self.work_dir())
            .with_output_dir(self.output_dir())
            .with_pipeline(pipeline);
        Pipeline::new(config).expect("Failed to build pipeline")
    }

    pub fn leftover_artifacts(&self) -> usize {
        std::fs::read_dir(self.work_dir())
            .map(|entries| entries.count())
            .unwrap_or(0)
    }
}

/// Write a solid-color PNG.
pub fn write_image(path: &Path, width: u32, height: u32, color: Rgb<u8>) {
    RgbImage::from_pixel(width, height, color)
        .save(path)
        .expect("Failed to write image");
}

/// Write a 10 s video whose audio is a 440 Hz tone over `[2 s, 8 s)` and
/// digital silence elsewhere.
pub async fn write_gated_tone_video(dir: &Path, name: &str) -> PathBuf {
    let wav = dir.join(format!("{}.wav", name));
    AudioBuffer::generate(48_000, 1, 10_000, |t| {
        if (2.0..8.0).contains(&t) {
            0.1 * (2.0 * PI * 440.0 * t).sin() as f32
        } else {
            0.0
        }
    })
    .expect("Failed to synthesize audio")
    .write_wav(&wav)
    .expect("Failed to write wav");

    let video = dir.join(format!("{}.mkv", name));
    let status = Command::new("ffmpeg")
        .args(["-y", "-hide_banner", "-v", "error", "-f", "lavfi", "-i"])
        .arg("color=c=blue:s=320x240:r=25:d=10")
        .arg("-i")
        .arg(&wav)
        .args(["-c:v", "mpeg4", "-c:a", "pcm_s16le", "-shortest"])
        .arg(&video)
        .stdin(Stdio::null())
        .status()
        .await
        .expect("Failed to run ffmpeg");
    assert!(status.success(), "ffmpeg could not build the test video");

    video
}

/// Grab the first frame of `video` as an RGB image.
pub async fn first_frame(video: &Path, dir: &Path) -> RgbImage {
    let png = dir.join("first_frame.png");
    let status = Command::new("ffmpeg")
        .args(["-y", "-hide_banner", "-v", "error", "-i"])
        .arg(video)
        .args(["-frames:v", "1"])
        .arg(&png)
        .stdin(Stdio::null())
        .status()
        .await
        .expect("Failed to run ffmpeg");
    assert!(status.success(), "ffmpeg could not extract a frame");

    image::open(&png).expect("Failed to decode frame").to_rgb8()
}

pub fn upload(path: &Path) -> UploadedFile {
    let bytes = std::fs::read(path).expect("Failed to read fixture");
    let name = path.file_name().unwrap().to_string_lossy().into_owned();
    UploadedFile::new(name, bytes)
}

pub fn request(image: &Path, video: &Path, name: &str) -> PipelineRequest {
    PipelineRequest::new(upload(image), upload(video), name)
}

/// Rough color match; encoding through yuv420p shifts values slightly.
pub fn near(pixel: &Rgb<u8>, expected: Rgb<u8>, tolerance: u8) -> bool {
    pixel
        .0
        .iter()
        .zip(expected.0.iter())
        .all(|(a, b)| a.abs_diff(*b) <= tolerance)
}
