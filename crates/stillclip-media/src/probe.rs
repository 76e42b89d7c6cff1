//! FFprobe media information.

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::process::Stdio;
use tokio::process::Command;

use crate::command::FFPROBE_BIN;
use crate::error::{MediaError, MediaResult};

/// Video stream information.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VideoStreamInfo {
    pub width: u32,
    pub height: u32,
    pub codec: String,
    pub pixel_format: Option<String>,
    /// Frame rate (fps)
    pub fps: f64,
}

/// Audio stream information.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AudioStreamInfo {
    pub codec: String,
    pub sample_rate: u32,
    pub channels: u16,
    /// Stream duration in seconds, when the container reports one
    pub duration: Option<f64>,
}

/// Media file information.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MediaInfo {
    /// Container duration in seconds
    pub duration: f64,
    /// File size in bytes
    pub size: u64,
    /// Bitrate in bits/second
    pub bitrate: u64,
    /// Container format name (e.g. "mov,mp4,m4a,3gp,3g2,mj2")
    pub format_name: String,
    pub video: Option<VideoStreamInfo>,
    pub audio: Option<AudioStreamInfo>,
}

/// FFprobe JSON output format.
#[derive(Debug, Deserialize)]
struct FfprobeOutput {
    format: FfprobeFormat,
    #[serde(default)]
    streams: Vec<FfprobeStream>,
}

#[derive(Debug, Deserialize)]
struct FfprobeFormat {
    format_name: Option<String>,
    duration: Option<String>,
    size: Option<String>,
    bit_rate: Option<String>,
}

#[derive(Debug, Deserialize)]
struct FfprobeStream {
    codec_type: String,
    codec_name: Option<String>,
    width: Option<u32>,
    height: Option<u32>,
    pix_fmt: Option<String>,
    r_frame_rate: Option<String>,
    avg_frame_rate: Option<String>,
    sample_rate: Option<String>,
    channels: Option<u16>,
    duration: Option<String>,
}

/// Probe a media file for information.
pub async fn probe_media(path: impl AsRef<Path>) -> MediaResult<MediaInfo> {
    let path = path.as_ref();

    if !path.exists() {
        return Err(MediaError::FileNotFound(path.to_path_buf()));
    }

    let program = which::which(FFPROBE_BIN).map_err(|_| MediaError::FfprobeNotFound)?;

    let output = Command::new(program)
        .args([
            "-v",
            "error",
            "-print_format",
            "json",
            "-show_format",
            "-show_streams",
        ])
        .arg(path)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .output()
        .await?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr).to_string();
        let message = crate::command::last_diagnostic_line(stderr.lines())
            .unwrap_or("FFprobe failed")
            .to_string();
        return Err(MediaError::FfprobeFailed {
            message,
            stderr: Some(stderr),
        });
    }

    parse_probe_output(&output.stdout)
}

fn parse_probe_output(json: &[u8]) -> MediaResult<MediaInfo> {
    let probe: FfprobeOutput = serde_json::from_slice(json)?;

    let video = probe
        .streams
        .iter()
        .find(|s| s.codec_type == "video")
        .map(|s| VideoStreamInfo {
            width: s.width.unwrap_or(0),
            height: s.height.unwrap_or(0),
            codec: s.codec_name.clone().unwrap_or_default(),
            pixel_format: s.pix_fmt.clone(),
            fps: s
                .avg_frame_rate
                .as_deref()
                .and_then(parse_frame_rate)
                .or_else(|| s.r_frame_rate.as_deref().and_then(parse_frame_rate))
                .unwrap_or(0.0),
        });

    let audio = probe
        .streams
        .iter()
        .find(|s| s.codec_type == "audio")
        .map(|s| AudioStreamInfo {
            codec: s.codec_name.clone().unwrap_or_default(),
            sample_rate: s.sample_rate.as_deref().and_then(|r| r.parse().ok()).unwrap_or(0),
            channels: s.channels.unwrap_or(0),
            duration: s.duration.as_deref().and_then(|d| d.parse().ok()),
        });

    let parse_u64 = |v: &Option<String>| v.as_deref().and_then(|s| s.parse::<u64>().ok()).unwrap_or(0);

    Ok(MediaInfo {
        duration: probe
            .format
            .duration
            .as_deref()
            .and_then(|d| d.parse::<f64>().ok())
            .unwrap_or(0.0),
        size: parse_u64(&probe.format.size),
        bitrate: parse_u64(&probe.format.bit_rate),
        format_name: probe.format.format_name.unwrap_or_default(),
        video,
        audio,
    })
}

/// Parse frame rate string (e.g., "30/1" or "29.97").
fn parse_frame_rate(s: &str) -> Option<f64> {
    if let Some((num, den)) = s.split_once('/') {
        let num: f64 = num.parse().ok()?;
        let den: f64 = den.parse().ok()?;
        if den > 0.0 {
            return Some(num / den);
        }
        return None;
    }
    s.parse().ok()
}
