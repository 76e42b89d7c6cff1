//! Encoding configuration for the final clip and intermediate audio.

use serde::{Deserialize, Serialize};

/// Default video codec (H.264)
pub const DEFAULT_VIDEO_CODEC: &str = "libx264";
/// Default audio codec
pub const DEFAULT_AUDIO_CODEC: &str = "aac";
/// Default encoding preset
pub const DEFAULT_PRESET: &str = "medium";
/// Encoder tune for a single held frame
pub const DEFAULT_TUNE: &str = "stillimage";
/// Default CRF (Constant Rate Factor)
pub const DEFAULT_CRF: u8 = 18;
/// Default audio bitrate in kbps, shared by every audio encode
pub const DEFAULT_AUDIO_BITRATE_KBPS: u32 = 320;
/// Pixel format accepted by common players
pub const DEFAULT_PIXEL_FORMAT: &str = "yuv420p";
/// Frame rate of the looped still image
pub const DEFAULT_FRAMERATE: u32 = 30;

/// Vertical output canvas
pub const CANVAS_WIDTH: u32 = 1080;
pub const CANVAS_HEIGHT: u32 = 1920;

/// Video encoding configuration for the assembled clip.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EncodingConfig {
    /// Video codec (e.g., "libx264")
    #[serde(default = "default_video_codec")]
    pub codec: String,

    /// Encoding preset (e.g., "fast", "medium", "slow")
    #[serde(default = "default_preset")]
    pub preset: String,

    /// Encoder tune; `None` leaves the encoder default
    #[serde(default = "default_tune")]
    pub tune: Option<String>,

    /// Constant Rate Factor (quality, 0-51, lower is better)
    #[serde(default = "default_crf")]
    pub crf: u8,

    /// Output pixel format
    #[serde(default = "default_pixel_format")]
    pub pixel_format: String,

    /// Frame rate used when looping the still frame
    #[serde(default = "default_framerate")]
    pub framerate: u32,

    /// Audio codec
    #[serde(default = "default_audio_codec")]
    pub audio_codec: String,

    /// Audio bitrate in kbps
    #[serde(default = "default_audio_bitrate_kbps")]
    pub audio_bitrate_kbps: u32,

    /// Additional FFmpeg output arguments
    #[serde(default)]
    pub extra_args: Vec<String>,
}

fn default_video_codec() -> String {
    DEFAULT_VIDEO_CODEC.to_string()
}
fn default_preset() -> String {
    DEFAULT_PRESET.to_string()
}
fn default_tune() -> Option<String> {
    Some(DEFAULT_TUNE.to_string())
}
fn default_crf() -> u8 {
    DEFAULT_CRF
}
fn default_pixel_format() -> String {
    DEFAULT_PIXEL_FORMAT.to_string()
}
fn default_framerate() -> u32 {
    DEFAULT_FRAMERATE
}
fn default_audio_codec() -> String {
    DEFAULT_AUDIO_CODEC.to_string()
}
fn default_audio_bitrate_kbps() -> u32 {
    DEFAULT_AUDIO_BITRATE_KBPS
}

impl Default for EncodingConfig {
    fn default() -> Self {
        Self {
            codec: default_video_codec(),
            preset: default_preset(),
            tune: default_tune(),
            crf: DEFAULT_CRF,
            pixel_format: default_pixel_format(),
            framerate: DEFAULT_FRAMERATE,
            audio_codec: default_audio_codec(),
            audio_bitrate_kbps: DEFAULT_AUDIO_BITRATE_KBPS,
            extra_args: Vec::new(),
        }
    }
}

impl EncodingConfig {
    /// Create a new encoding configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a new config with updated CRF.
    pub fn with_crf(mut self, crf: u8) -> Self {
        self.crf = crf.min(51);
        self
    }

    /// Returns a new config with updated audio bitrate.
    pub fn with_audio_bitrate_kbps(mut self, kbps: u32) -> Self {
        self.audio_bitrate_kbps = kbps;
        self
    }

    /// Audio bitrate in FFmpeg notation (e.g. "320k").
    pub fn audio_bitrate(&self) -> String {
        format!("{}k", self.audio_bitrate_kbps)
    }

    /// Audio-only encode arguments (codec + bitrate).
    pub fn audio_args(&self) -> Vec<String> {
        vec![
            "-c:a".to_string(),
            self.audio_codec.clone(),
            "-b:a".to_string(),
            self.audio_bitrate(),
        ]
    }

    /// Convert to FFmpeg output arguments for the assembled clip.
    pub fn to_ffmpeg_args(&self) -> Vec<String> {
        let mut args = vec!["-c:v".to_string(), self.codec.clone()];

        if let Some(tune) = &self.tune {
            args.extend_from_slice(&["-tune".to_string(), tune.clone()]);
        }

        args.extend_from_slice(&[
            "-preset".to_string(),
            self.preset.clone(),
            "-crf".to_string(),
            self.crf.to_string(),
        ]);

        args.extend(self.audio_args());

        args.extend_from_slice(&["-pix_fmt".to_string(), self.pixel_format.clone()]);

        args.extend(self.extra_args.clone());

        args
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = EncodingConfig::default();
        assert_eq!(config.codec, "libx264");
        assert_eq!(config.crf, 18);
        assert_eq!(config.tune.as_deref(), Some("stillimage"));
        assert_eq!(config.audio_bitrate(), "320k");
    }

    #[test]
    fn test_ffmpeg_args() {
        let args = EncodingConfig::default().to_ffmpeg_args();
        let joined = args.join(" ");
        assert!(joined.contains("-c:v libx264"));
        assert!(joined.contains("-tune stillimage"));
        assert!(joined.contains("-crf 18"));
        assert!(joined.contains("-c:a aac -b:a 320k"));
        assert!(joined.contains("-pix_fmt yuv420p"));
    }

    #[test]
    fn test_no_tune() {
        let config = EncodingConfig {
            tune: None,
            ..Default::default()
        };
        assert!(!config.to_ffmpeg_args().contains(&"-tune".to_string()));
    }

    #[test]
    fn test_crf_clamped() {
        assert_eq!(EncodingConfig::new().with_crf(80).crf, 51);
    }

    #[test]
    fn test_deserialize_partial() {
        let config: EncodingConfig = serde_json::from_str(r#"{"crf": 23}"#).unwrap();
        assert_eq!(config.crf, 23);
        assert_eq!(config.preset, "medium");
        assert_eq!(config.audio_bitrate_kbps, 320);
    }
}
