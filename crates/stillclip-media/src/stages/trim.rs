//! Silence trimming.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use stillclip_models::{ContentBounds, PipelineConfig, StageKind};
use tokio::sync::Notify;
use tracing::{debug, info};

use super::{ensure_exists, expect_inputs, Stage, StageOutput};
use crate::audio::{normalize_peak, AudioBuffer, BoundsDetector};
use crate::error::{MediaError, MediaResult};

/// Detects content bounds, cuts the audio to them and optionally peak
/// normalizes the result. Runs in-process on a blocking thread.
#[derive(Debug, Clone)]
pub struct SilenceTrimmer {
    detector: BoundsDetector,
    peak_headroom_db: Option<f64>,
    jobs: Arc<ActiveJobs>,
}

impl SilenceTrimmer {
    pub fn new(config: &PipelineConfig) -> Self {
        Self {
            detector: BoundsDetector::from_config(config),
            peak_headroom_db: config.peak_normalize.then_some(config.peak_headroom_db),
            jobs: Arc::default(),
        }
    }

    /// Trim a decoded buffer, returning the kept range and the bounds used.
    pub fn trim(&self, audio: &AudioBuffer) -> (AudioBuffer, ContentBounds) {
        let duration_ms = audio.duration_ms();
        let mut bounds = self.detector.detect(audio);

        if bounds.end_ms() <= bounds.start_ms() && duration_ms > 0 {
            debug!(
                start_ms = bounds.start_ms(),
                end_ms = bounds.end_ms(),
                "Degenerate bounds, keeping full audio"
            );
            bounds = ContentBounds::full(duration_ms);
        }

        let mut trimmed = audio.slice_ms(bounds.start_ms(), bounds.end_ms());
        if let Some(headroom) = self.peak_headroom_db {
            normalize_peak(&mut trimmed, headroom);
        }

        (trimmed, bounds)
    }

    fn trim_file(&self, input: &Path, output: &Path, cancelled: &AtomicBool) -> MediaResult<ContentBounds> {
        let audio = AudioBuffer::read_wav(input)?;
        if cancelled.load(Ordering::SeqCst) {
            return Err(MediaError::Cancelled);
        }

        let (trimmed, bounds) = self.trim(&audio);
        if cancelled.load(Ordering::SeqCst) {
            debug!("Trim abandoned before writing");
            return Err(MediaError::Cancelled);
        }
        trimmed.write_wav(output)?;

        info!(
            start_ms = bounds.start_ms(),
            end_ms = bounds.end_ms(),
            source_ms = audio.duration_ms(),
            kept_ms = bounds.duration_ms(),
            "Trimmed silence"
        );
        Ok(bounds)
    }
}

#[async_trait]
impl Stage for SilenceTrimmer {
    fn kind(&self) -> StageKind {
        StageKind::BoundsDetection
    }

    async fn execute(&self, inputs: &[&Path], output: &Path) -> MediaResult<StageOutput> {
        let [input] = expect_inputs::<1>(self.kind(), inputs)?;
        ensure_exists(input)?;

        let this = self.clone();
        let input: PathBuf = input.to_path_buf();
        let slot = JobSlot::claim(&self.jobs, output);
        let cancel = CancelOnDrop::default();
        let cancelled = Arc::clone(&cancel.0);

        // The blocking thread outlives this future if it is dropped
        let bounds = tokio::task::spawn_blocking(move || {
            let slot = slot;
            this.trim_file(&input, &slot.output, &cancelled)
        })
        .await
        .map_err(|e| MediaError::internal(format!("silence trimming task failed: {}", e)))??;

        Ok(StageOutput::with_bounds(bounds))
    }

    async fn settle(&self, output: &Path) {
        self.jobs.wait_until_idle(output).await;
    }
}

/// Outputs of blocking trim jobs still running.
#[derive(Debug, Default)]
struct ActiveJobs {
    outputs: Mutex<HashSet<PathBuf>>,
    finished: Notify,
}

impl ActiveJobs {
    fn lock(&self) -> MutexGuard<'_, HashSet<PathBuf>> {
        self.outputs.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn is_running(&self, output: &Path) -> bool {
        self.lock().contains(output)
    }

    async fn wait_until_idle(&self, output: &Path) {
        loop {
            let finished = self.finished.notified();
            tokio::pin!(finished);
            finished.as_mut().enable();

            if !self.is_running(output) {
                return;
            }
            finished.await;
        }
    }
}

/// Marks `output` as being written until the blocking job drops it.
struct JobSlot {
    jobs: Arc<ActiveJobs>,
    output: PathBuf,
}

impl JobSlot {
    fn claim(jobs: &Arc<ActiveJobs>, output: &Path) -> Self {
        jobs.lock().insert(output.to_path_buf());
        Self {
            jobs: Arc::clone(jobs),
            output: output.to_path_buf(),
        }
    }
}

impl Drop for JobSlot {
    fn drop(&mut self) {
        self.jobs.lock().remove(&self.output);
        self.jobs.finished.notify_waiters();
    }
}

/// Raises its flag when the owning future goes away.
#[derive(Default)]
struct CancelOnDrop(Arc<AtomicBool>);

impl Drop for CancelOnDrop {
    fn drop(&mut self) {
        self.0.store(true, Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::PI;
    use std::time::Duration;
    use tempfile::TempDir;

    fn speech_like() -> AudioBuffer {
        AudioBuffer::generate(48_000, 2, 5_000, |t| {
            if (1.0..4.0).contains(&t) {
                0.1 * (2.0 * PI * 220.0 * t).sin() as f32
            } else {
                0.0
            }
        })
        .unwrap()
    }

    #[test]
    fn test_trim_cuts_to_bounds() {
        let trimmer = SilenceTrimmer::new(&PipelineConfig::default());
        let (trimmed, bounds) = trimmer.trim(&speech_like());

        assert!(bounds.start_ms().abs_diff(1_000) <= 5);
        assert!(bounds.end_ms().abs_diff(4_000) <= 5);
        assert!(trimmed.duration_ms().abs_diff(3_000) <= 10);
    }

    #[test]
    fn test_trim_peak_normalizes_when_enabled() {
        let config = PipelineConfig::default().with_peak_normalize(true);
        let (trimmed, _) = SilenceTrimmer::new(&config).trim(&speech_like());
        assert!((trimmed.peak_dbfs() + 0.1).abs() < 0.01);

        let config = PipelineConfig::default().with_peak_normalize(false);
        let (trimmed, _) = SilenceTrimmer::new(&config).trim(&speech_like());
        assert!((trimmed.peak() - 0.1).abs() < 1e-3);
    }

    #[test]
    fn test_trim_silent_audio_keeps_everything() {
        let audio = AudioBuffer::generate(48_000, 2, 1_000, |_| 0.0).unwrap();
        let (trimmed, bounds) = SilenceTrimmer::new(&PipelineConfig::default()).trim(&audio);
        assert!(bounds.is_full(1_000));
        assert_eq!(trimmed.frame_count(), audio.frame_count());
    }

    #[tokio::test]
    async fn test_execute_writes_trimmed_wav() {
        let dir = TempDir::new().unwrap();
        let input = dir.path().join("raw_audio.wav");
        let output = dir.path().join("trimmed_audio.wav");
        speech_like().write_wav(&input).unwrap();

        let stage = SilenceTrimmer::new(&PipelineConfig::default());
        let result = stage.execute(&[input.as_path()], &output).await.unwrap();

        let bounds = result.bounds.unwrap();
        assert!(!result.degraded);
        assert!(bounds.start_ms().abs_diff(1_000) <= 5);

        let written = AudioBuffer::read_wav(&output).unwrap();
        assert!(written.duration_ms().abs_diff(bounds.duration_ms()) <= 1);
    }

    #[tokio::test]
    async fn test_execute_rejects_corrupt_wav() {
        let dir = TempDir::new().unwrap();
        let input = dir.path().join("raw_audio.wav");
        std::fs::write(&input, b"not a wav file").unwrap();

        let stage = SilenceTrimmer::new(&PipelineConfig::default());
        let err = stage
            .execute(&[input.as_path()], &dir.path().join("out.wav"))
            .await
            .unwrap_err();
        assert!(matches!(err, MediaError::Wav(_)));
    }

    #[tokio::test]
    async fn test_abandoned_execute_never_writes() {
        let dir = TempDir::new().unwrap();
        let input = dir.path().join("raw_audio.wav");
        let output = dir.path().join("trimmed_audio.wav");
        AudioBuffer::generate(48_000, 2, 60_000, |t| 0.1 * (2.0 * PI * 220.0 * t).sin() as f32)
            .unwrap()
            .write_wav(&input)
            .unwrap();

        let stage = SilenceTrimmer::new(&PipelineConfig::default());
        // Nothing running yet
        stage.settle(&output).await;

        let abandoned = tokio::time::timeout(
            Duration::from_millis(1),
            stage.execute(&[input.as_path()], &output),
        )
        .await;
        assert!(abandoned.is_err());

        stage.settle(&output).await;
        assert!(!stage.jobs.is_running(&output));
        assert!(!output.exists());
    }
}
