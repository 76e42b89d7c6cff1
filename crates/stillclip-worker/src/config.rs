//! Worker configuration.

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use stillclip_media::command::FFMPEG_BIN;
use stillclip_models::PipelineConfig;

use crate::error::{WorkerError, WorkerResult};

/// Worker configuration.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// Directory for per-request intermediate artifacts
    pub work_dir: PathBuf,
    /// Directory final clips are published to
    pub output_dir: PathBuf,
    /// Wall-clock limit for a request's stages
    pub request_timeout: Option<Duration>,
    /// Maximum requests running at once
    pub max_concurrent_requests: usize,
    /// FFmpeg executable name or path
    pub ffmpeg_binary: String,
    /// Media processing parameters
    pub pipeline: PipelineConfig,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            work_dir: std::env::temp_dir().join("stillclip"),
            output_dir: PathBuf::from("outputs"),
            request_timeout: None,
            max_concurrent_requests: 2,
            ffmpeg_binary: FFMPEG_BIN.to_string(),
            pipeline: PipelineConfig::default(),
        }
    }
}

impl WorkerConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        let mut pipeline = defaults.pipeline.clone();

        pipeline.silence_run_length_ms =
            env_or("STILLCLIP_SILENCE_RUN_MS", pipeline.silence_run_length_ms);
        pipeline.loudness_target_lufs =
            env_or("STILLCLIP_LOUDNESS_TARGET", pipeline.loudness_target_lufs);
        pipeline.true_peak_ceiling_db = env_or("STILLCLIP_TRUE_PEAK", pipeline.true_peak_ceiling_db);
        pipeline.loudness_range_lu = env_or("STILLCLIP_LOUDNESS_RANGE", pipeline.loudness_range_lu);
        pipeline.canvas_width = env_or("STILLCLIP_CANVAS_WIDTH", pipeline.canvas_width);
        pipeline.canvas_height = env_or("STILLCLIP_CANVAS_HEIGHT", pipeline.canvas_height);
        pipeline.encoding.audio_bitrate_kbps = env_or(
            "STILLCLIP_AUDIO_BITRATE_KBPS",
            pipeline.encoding.audio_bitrate_kbps,
        );

        Self {
            work_dir: std::env::var("STILLCLIP_WORK_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.work_dir),
            output_dir: std::env::var("STILLCLIP_OUTPUT_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.output_dir),
            request_timeout: match env_or("STILLCLIP_REQUEST_TIMEOUT", 0u64) {
                0 => None,
                secs => Some(Duration::from_secs(secs)),
            },
            max_concurrent_requests: env_or(
                "STILLCLIP_MAX_CONCURRENT",
                defaults.max_concurrent_requests,
            ),
            ffmpeg_binary: std::env::var("FFMPEG_BIN").unwrap_or(defaults.ffmpeg_binary),
            pipeline,
        }
    }

    pub fn with_work_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.work_dir = dir.into();
        self
    }

    pub fn with_output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.output_dir = dir.into();
        self
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = Some(timeout);
        self
    }

    pub fn with_pipeline(mut self, pipeline: PipelineConfig) -> Self {
        self.pipeline = pipeline;
        self
    }

    pub fn validate(&self) -> WorkerResult<()> {
        if self.max_concurrent_requests == 0 {
            return Err(WorkerError::config_error(
                "max_concurrent_requests must be at least 1",
            ));
        }
        self.pipeline
            .validate()
            .map_err(|e| WorkerError::config_error(e.to_string()))
    }
}

/// Parse `key` from the environment, falling back to `default` when unset or
/// malformed.
fn env_or<T: FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|s| s.trim().parse().ok())
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = WorkerConfig::default();
        assert!(config.validate().is_ok());
        assert!(config.request_timeout.is_none());
        assert_eq!(config.ffmpeg_binary, "ffmpeg");
    }

    #[test]
    fn test_zero_concurrency_rejected() {
        let mut config = WorkerConfig::default();
        config.max_concurrent_requests = 0;
        assert!(matches!(config.validate(), Err(WorkerError::ConfigError(_))));
    }

    #[test]
    fn test_invalid_pipeline_rejected() {
        let config = WorkerConfig::default()
            .with_pipeline(PipelineConfig::default().with_canvas(1081, 1920));
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_env_or_falls_back_on_garbage() {
        std::env::set_var("STILLCLIP_TEST_ENV_OR", "not-a-number");
        assert_eq!(env_or("STILLCLIP_TEST_ENV_OR", 7u32), 7);
        std::env::set_var("STILLCLIP_TEST_ENV_OR", " 12 ");
        assert_eq!(env_or("STILLCLIP_TEST_ENV_OR", 7u32), 12);
        std::env::remove_var("STILLCLIP_TEST_ENV_OR");
    }
}
