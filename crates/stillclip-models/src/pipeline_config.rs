//! Tunables for a single pipeline run.
//!
//! One parameterized pipeline covers every variant: boundary sensitivity,
//! loudness targets, output geometry and encode bitrate all live here.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::encoding::{EncodingConfig, CANVAS_HEIGHT, CANVAS_WIDTH};

/// Minimum silent run (ms) treated as a boundary.
pub const DEFAULT_SILENCE_RUN_LENGTH_MS: u64 = 300;
/// Offsets below the mean level, least to most sensitive.
pub const DEFAULT_SILENCE_OFFSETS_DB: [f64; 3] = [22.0, 18.0, 14.0];
/// Lowest threshold ever used, also substituted for a `-inf` mean.
pub const SILENCE_FLOOR_DB: f64 = -60.0;
/// Detected content shorter than this is rejected as spurious.
pub const DEFAULT_MIN_CONTENT_SPAN_MS: u64 = 200;
/// Peak pass headroom below full scale.
pub const DEFAULT_PEAK_HEADROOM_DB: f64 = 0.1;

/// EBU R128 style loudness targets.
pub const DEFAULT_LOUDNESS_TARGET_LUFS: f64 = -16.0;
pub const DEFAULT_TRUE_PEAK_CEILING_DB: f64 = -1.5;
pub const DEFAULT_LOUDNESS_RANGE_LU: f64 = 7.0;

/// Extracted audio format.
pub const DEFAULT_SAMPLE_RATE: u32 = 48_000;
pub const DEFAULT_CHANNELS: u16 = 2;

/// Invalid pipeline configuration.
#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("canvas must be non-zero and even, got {width}x{height}")]
    InvalidCanvas { width: u32, height: u32 },

    #[error("silence run length must be positive")]
    ZeroRunLength,

    #[error("at least one silence offset is required")]
    NoSilenceOffsets,

    #[error("audio bitrate must be positive")]
    ZeroBitrate,

    #[error("invalid audio format: {0}")]
    InvalidAudioFormat(String),
}

/// Configuration for the still-image clip pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Silent windows shorter than this are not boundaries.
    pub silence_run_length_ms: u64,

    /// Relative thresholds (dB below mean) tried in order.
    pub silence_offsets_db: Vec<f64>,

    /// Absolute threshold floor in dBFS.
    pub silence_floor_db: f64,

    /// Minimum accepted span of detected content.
    pub min_content_span_ms: u64,

    /// Apply a headroom-only peak pass before loudness normalization.
    pub peak_normalize: bool,

    /// Headroom left by the peak pass, in dB.
    pub peak_headroom_db: f64,

    /// Integrated loudness target (LUFS).
    pub loudness_target_lufs: f64,

    /// True peak ceiling (dBTP).
    pub true_peak_ceiling_db: f64,

    /// Loudness range target (LU).
    pub loudness_range_lu: f64,

    pub canvas_width: u32,
    pub canvas_height: u32,

    /// Sample rate of the extracted analysis audio.
    pub sample_rate: u32,

    /// Channel count of the extracted analysis audio.
    pub channels: u16,

    /// Encoding for the final clip and audio encodes.
    pub encoding: EncodingConfig,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            silence_run_length_ms: DEFAULT_SILENCE_RUN_LENGTH_MS,
            silence_offsets_db: DEFAULT_SILENCE_OFFSETS_DB.to_vec(),
            silence_floor_db: SILENCE_FLOOR_DB,
            min_content_span_ms: DEFAULT_MIN_CONTENT_SPAN_MS,
            peak_normalize: true,
            peak_headroom_db: DEFAULT_PEAK_HEADROOM_DB,
            loudness_target_lufs: DEFAULT_LOUDNESS_TARGET_LUFS,
            true_peak_ceiling_db: DEFAULT_TRUE_PEAK_CEILING_DB,
            loudness_range_lu: DEFAULT_LOUDNESS_RANGE_LU,
            canvas_width: CANVAS_WIDTH,
            canvas_height: CANVAS_HEIGHT,
            sample_rate: DEFAULT_SAMPLE_RATE,
            channels: DEFAULT_CHANNELS,
            encoding: EncodingConfig::default(),
        }
    }
}

impl PipelineConfig {
    /// Builder-style setter for the silence run length.
    pub fn with_silence_run_length_ms(mut self, ms: u64) -> Self {
        self.silence_run_length_ms = ms;
        self
    }

    /// Builder-style setter for the loudness target.
    pub fn with_loudness_target_lufs(mut self, lufs: f64) -> Self {
        self.loudness_target_lufs = lufs;
        self
    }

    /// Builder-style setter for the true peak ceiling.
    pub fn with_true_peak_ceiling_db(mut self, db: f64) -> Self {
        self.true_peak_ceiling_db = db;
        self
    }

    /// Builder-style setter for the output canvas.
    pub fn with_canvas(mut self, width: u32, height: u32) -> Self {
        self.canvas_width = width;
        self.canvas_height = height;
        self
    }

    /// Builder-style setter for the shared audio bitrate.
    pub fn with_audio_bitrate_kbps(mut self, kbps: u32) -> Self {
        self.encoding.audio_bitrate_kbps = kbps;
        self
    }

    /// Builder-style toggle for the peak pass.
    pub fn with_peak_normalize(mut self, enabled: bool) -> Self {
        self.peak_normalize = enabled;
        self
    }

    /// Check the configuration can drive a run.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let (w, h) = (self.canvas_width, self.canvas_height);
        // yuv420p needs even dimensions
        if w == 0 || h == 0 || w % 2 != 0 || h % 2 != 0 {
            return Err(ConfigError::InvalidCanvas {
                width: w,
                height: h,
            });
        }
        if self.silence_run_length_ms == 0 {
            return Err(ConfigError::ZeroRunLength);
        }
        if self.silence_offsets_db.is_empty() {
            return Err(ConfigError::NoSilenceOffsets);
        }
        if self.encoding.audio_bitrate_kbps == 0 {
            return Err(ConfigError::ZeroBitrate);
        }
        if self.sample_rate == 0 || self.channels == 0 {
            return Err(ConfigError::InvalidAudioFormat(format!(
                "{} Hz, {} channels",
                self.sample_rate, self.channels
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = PipelineConfig::default();
        assert_eq!(config.silence_run_length_ms, 300);
        assert_eq!(config.silence_offsets_db, vec![22.0, 18.0, 14.0]);
        assert_eq!((config.canvas_width, config.canvas_height), (1080, 1920));
        assert!((config.loudness_target_lufs + 16.0).abs() < f64::EPSILON);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_builder_pattern() {
        let config = PipelineConfig::default()
            .with_silence_run_length_ms(500)
            .with_loudness_target_lufs(-14.0)
            .with_audio_bitrate_kbps(192);

        assert_eq!(config.silence_run_length_ms, 500);
        assert!((config.loudness_target_lufs + 14.0).abs() < f64::EPSILON);
        assert_eq!(config.encoding.audio_bitrate(), "192k");
    }

    #[test]
    fn test_odd_canvas_rejected() {
        let config = PipelineConfig::default().with_canvas(1081, 1920);
        assert_eq!(
            config.validate(),
            Err(ConfigError::InvalidCanvas {
                width: 1081,
                height: 1920
            })
        );
    }

    #[test]
    fn test_empty_offsets_rejected() {
        let config = PipelineConfig {
            silence_offsets_db: Vec::new(),
            ..Default::default()
        };
        assert_eq!(config.validate(), Err(ConfigError::NoSilenceOffsets));
    }

    #[test]
    fn test_deserialize_overrides() {
        let config: PipelineConfig =
            serde_json::from_str(r#"{"silence_run_length_ms": 250, "encoding": {"crf": 20}}"#)
                .unwrap();
        assert_eq!(config.silence_run_length_ms, 250);
        assert_eq!(config.encoding.crf, 20);
        assert_eq!(config.canvas_height, 1920);
    }
}
