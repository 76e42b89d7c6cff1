//! Request orchestration.
//!
//! A request moves through the stages below. Frame preparation and audio
//! extraction are independent and run together; everything after them is
//! sequential.
//!
//! ```text
//! ┌───────────────┐
//! │ frame         │──────────────────────────────────────┐
//! └───────────────┘                                      ▼
//! ┌───────────────┐   ┌──────────┐   ┌──────────┐   ┌──────────┐   ┌─────────┐
//! │ extract audio │──►│ trim     │──►│ loudness │──►│ assemble │──►│ deliver │
//! └───────────────┘   └──────────┘   └──────────┘   └──────────┘   └─────────┘
//! ```
//!
//! Whatever happens, every intermediate file is removed once the request
//! reaches a terminal state, and the caller gets exactly one
//! [`PipelineResult`].

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Instant;

use stillclip_media::{
    move_file, verify_tool, AudioExtractor, FfmpegRunner, FramePreparer, LoudnessNormalizer,
    MediaAssembler, SilenceTrimmer, Stage, StageOutput,
};
use stillclip_models::{
    AssetKind, ContentBounds, ErrorKind, PipelineConfig, PipelineRequest, PipelineResult,
    PipelineState, StageKind,
};
use tokio::sync::Semaphore;
use tokio::task::JoinHandle;
use tracing::{warn, Instrument};

use crate::arena::ArtifactArena;
use crate::config::WorkerConfig;
use crate::error::{WorkerError, WorkerResult};
use crate::logging::RequestLogger;
use crate::metrics;

/// The stage implementations a pipeline drives.
#[derive(Clone)]
pub struct StageSet {
    pub frame: Arc<dyn Stage>,
    pub extract: Arc<dyn Stage>,
    pub trim: Arc<dyn Stage>,
    pub loudness: Arc<dyn Stage>,
    pub assemble: Arc<dyn Stage>,
}

impl StageSet {
    /// FFmpeg-backed stages with the in-process silence trimmer.
    pub fn ffmpeg(runner: FfmpegRunner, config: &PipelineConfig) -> Self {
        Self {
            frame: Arc::new(FramePreparer::new(runner.clone(), config)),
            extract: Arc::new(AudioExtractor::new(runner.clone(), config)),
            trim: Arc::new(SilenceTrimmer::new(config)),
            loudness: Arc::new(LoudnessNormalizer::new(runner.clone(), config)),
            assemble: Arc::new(MediaAssembler::new(runner, config)),
        }
    }

    /// Every executable any stage needs, deduplicated.
    pub fn required_tools(&self) -> BTreeSet<String> {
        [
            &self.frame,
            &self.extract,
            &self.trim,
            &self.loudness,
            &self.assemble,
        ]
        .into_iter()
        .flat_map(|stage| stage.required_tools())
        .collect()
    }
}

/// Files one request moves through.
struct RequestPaths {
    image: PathBuf,
    video: PathBuf,
    frame: PathBuf,
    raw_audio: PathBuf,
    trimmed_audio: PathBuf,
    normalized_audio: PathBuf,
    final_video: PathBuf,
}

struct Delivery {
    output_path: PathBuf,
    bounds: ContentBounds,
    degraded: bool,
}

#[derive(Debug)]
struct TrackerState {
    state: PipelineState,
    in_flight: Vec<StageKind>,
}

/// State machine shared by the stages of one request.
#[derive(Debug)]
struct StageTracker {
    inner: Mutex<TrackerState>,
}

impl StageTracker {
    fn new() -> Self {
        Self {
            inner: Mutex::new(TrackerState {
                state: PipelineState::Received,
                in_flight: Vec::new(),
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, TrackerState> {
        // A poisoned lock still holds valid state
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn begin(&self, kind: StageKind) {
        self.lock().in_flight.push(kind);
    }

    fn complete(&self, kind: StageKind) -> WorkerResult<PipelineState> {
        let mut guard = self.lock();
        guard.in_flight.retain(|k| *k != kind);
        let next = kind.completes_into();
        Self::transition(&mut guard, kind, next)?;
        Ok(next)
    }

    fn advance(&self, stage: StageKind, next: PipelineState) -> WorkerResult<()> {
        Self::transition(&mut self.lock(), stage, next)
    }

    fn transition(guard: &mut TrackerState, stage: StageKind, next: PipelineState) -> WorkerResult<()> {
        if !guard.state.can_transition_to(next) {
            return Err(WorkerError::stage_failed(
                stage,
                format!("illegal transition {} -> {}", guard.state, next),
            ));
        }
        guard.state = next;
        Ok(())
    }

    fn fail(&self) {
        let mut guard = self.lock();
        if !guard.state.is_terminal() {
            guard.state = PipelineState::Failed;
        }
    }

    /// Earliest-started stage still running.
    fn in_flight(&self) -> Option<StageKind> {
        self.lock().in_flight.first().copied()
    }

    #[cfg(test)]
    fn state(&self) -> PipelineState {
        self.lock().state
    }
}

/// Runs requests end to end.
pub struct Pipeline {
    config: WorkerConfig,
    stages: StageSet,
    permits: Semaphore,
}

impl Pipeline {
    /// Build a pipeline with the FFmpeg-backed stages.
    pub fn new(config: WorkerConfig) -> WorkerResult<Self> {
        let runner = FfmpegRunner::new().with_binary(config.ffmpeg_binary.clone());
        let stages = StageSet::ffmpeg(runner, &config.pipeline);
        Self::with_stages(config, stages)
    }

    /// Build a pipeline around custom stages. Creates the work and output
    /// directories.
    pub fn with_stages(config: WorkerConfig, stages: StageSet) -> WorkerResult<Self> {
        config.validate()?;
        std::fs::create_dir_all(&config.work_dir)?;
        std::fs::create_dir_all(&config.output_dir)?;

        let permits = Semaphore::new(config.max_concurrent_requests);
        Ok(Self {
            config,
            stages,
            permits,
        })
    }

    /// Run a request and wait for its artifacts to be removed.
    pub async fn run(&self, request: &PipelineRequest) -> PipelineResult {
        let (result, cleanup) = self.run_deferred(request).await;
        if let Err(e) = cleanup.await {
            warn!(error = %e, "Artifact cleanup task failed");
        }
        result
    }

    /// Run a request, returning as soon as the result is known. Artifact
    /// removal continues on the returned handle.
    pub async fn run_deferred(&self, request: &PipelineRequest) -> (PipelineResult, JoinHandle<()>) {
        // The semaphore is never closed
        let _permit = self.permits.acquire().await.ok();

        let started = Instant::now();
        let mut arena = ArtifactArena::new(&self.config.work_dir);
        let logger = RequestLogger::new(arena.request_id().to_string(), "assemble_clip");
        let span = logger.create_span();

        let outcome = self
            .execute(request, &mut arena, &logger)
            .instrument(span)
            .await;

        let result = match outcome {
            Ok(delivery) => {
                logger.log_completion(&format!(
                    "{} ({} ms of audio kept)",
                    delivery.output_path.display(),
                    delivery.bounds.duration_ms()
                ));
                PipelineResult::Delivered {
                    output_path: delivery.output_path,
                    bounds: delivery.bounds,
                    degraded: delivery.degraded,
                }
            }
            Err(e) => {
                let message = arena.redact(&e.to_string());
                logger.log_error(&message);
                PipelineResult::Failed {
                    kind: e.kind(),
                    message,
                }
            }
        };

        metrics::record_request(outcome_label(&result), started.elapsed().as_secs_f64());

        let cleanup = tokio::task::spawn_blocking(move || {
            let failures = arena.dispose();
            if failures > 0 {
                warn!(
                    request_id = %arena.request_id(),
                    failures,
                    "Some artifacts could not be removed"
                );
            }
        });

        (result, cleanup)
    }

    async fn execute(
        &self,
        request: &PipelineRequest,
        arena: &mut ArtifactArena,
        logger: &RequestLogger,
    ) -> WorkerResult<Delivery> {
        logger.log_start(request.output_base_name());

        if request.image().is_empty() {
            return Err(WorkerError::invalid_input("image upload is empty"));
        }
        if request.video().is_empty() {
            return Err(WorkerError::invalid_input("video upload is empty"));
        }

        self.verify_tools().await?;

        let paths = RequestPaths {
            image: arena.store_upload(AssetKind::Image, request.image()).await?,
            video: arena.store_upload(AssetKind::RawVideo, request.video()).await?,
            frame: arena.allocate(AssetKind::PreparedFrame),
            raw_audio: arena.allocate(AssetKind::RawAudio),
            trimmed_audio: arena.allocate(AssetKind::TrimmedAudio),
            normalized_audio: arena.allocate(AssetKind::NormalizedAudio),
            final_video: arena.allocate(AssetKind::FinalVideo),
        };

        let tracker = StageTracker::new();
        let stages = self.run_stages(&paths, &tracker, logger);

        let (bounds, degraded) = match self.config.request_timeout {
            Some(limit) => {
                let outcome = tokio::time::timeout(limit, stages).await;
                match outcome {
                    Ok(outcome) => outcome?,
                    Err(_) => {
                        let stage = tracker.in_flight().unwrap_or(StageKind::FramePreparation);
                        tracker.fail();
                        // Abandoned in-process work must finish before the arena is disposed
                        self.settle_stages(&paths).await;
                        return Err(WorkerError::stage_failed(
                            stage,
                            format!("timed out after {:?}", limit),
                        ));
                    }
                }
            }
            None => stages.await?,
        };

        let output_path = self.config.output_dir.join(request.output_file_name());
        move_file(&paths.final_video, &output_path)
            .await
            .map_err(|e| {
                tracker.fail();
                WorkerError::stage_failed(
                    StageKind::Assembly,
                    format!("could not deliver output: {}", e.diagnostic()),
                )
            })?;
        tracker.advance(StageKind::Assembly, PipelineState::Delivered)?;

        Ok(Delivery {
            output_path,
            bounds,
            degraded,
        })
    }

    async fn settle_stages(&self, paths: &RequestPaths) {
        self.stages.frame.settle(&paths.frame).await;
        self.stages.extract.settle(&paths.raw_audio).await;
        self.stages.trim.settle(&paths.trimmed_audio).await;
        self.stages.loudness.settle(&paths.normalized_audio).await;
        self.stages.assemble.settle(&paths.final_video).await;
    }

    async fn verify_tools(&self) -> WorkerResult<()> {
        for tool in self.stages.required_tools() {
            verify_tool(&tool)
                .await
                .map_err(|e| WorkerError::ToolUnavailable(e.diagnostic()))?;
        }
        Ok(())
    }

    async fn run_stages(
        &self,
        paths: &RequestPaths,
        tracker: &StageTracker,
        logger: &RequestLogger,
    ) -> WorkerResult<(ContentBounds, bool)> {
        let image = [paths.image.as_path()];
        let video = [paths.video.as_path()];
        tokio::try_join!(
            self.run_stage(self.stages.frame.as_ref(), &image, &paths.frame, tracker, logger),
            self.run_stage(self.stages.extract.as_ref(), &video, &paths.raw_audio, tracker, logger),
        )?;

        let raw_audio = [paths.raw_audio.as_path()];
        let trimmed = self
            .run_stage(
                self.stages.trim.as_ref(),
                &raw_audio,
                &paths.trimmed_audio,
                tracker,
                logger,
            )
            .await?;
        let bounds = trimmed.bounds.ok_or_else(|| {
            tracker.fail();
            WorkerError::stage_failed(StageKind::BoundsDetection, "no content bounds reported")
        })?;

        let trimmed_audio = [paths.trimmed_audio.as_path()];
        let normalized = self
            .run_stage(
                self.stages.loudness.as_ref(),
                &trimmed_audio,
                &paths.normalized_audio,
                tracker,
                logger,
            )
            .await?;
        if normalized.degraded {
            metrics::record_degraded();
            logger.log_warning("loudness normalization fell back to a plain encode");
        }

        let assembly_inputs = [paths.frame.as_path(), paths.normalized_audio.as_path()];
        self.run_stage(
            self.stages.assemble.as_ref(),
            &assembly_inputs,
            &paths.final_video,
            tracker,
            logger,
        )
        .await?;

        Ok((bounds, normalized.degraded))
    }

    async fn run_stage(
        &self,
        stage: &dyn Stage,
        inputs: &[&Path],
        output: &Path,
        tracker: &StageTracker,
        logger: &RequestLogger,
    ) -> WorkerResult<StageOutput> {
        let kind = stage.kind();
        tracker.begin(kind);
        let started = Instant::now();

        let result = stage.execute(inputs, output).await;
        metrics::record_stage(kind, result.is_ok(), started.elapsed().as_secs_f64());

        let out = match result {
            Ok(out) => out,
            Err(e) => {
                tracker.fail();
                return Err(WorkerError::from_stage(kind, e));
            }
        };

        if !output.exists() {
            tracker.fail();
            return Err(WorkerError::stage_failed(kind, "no output was written"));
        }

        let state = tracker.complete(kind)?;
        logger.log_transition(kind, state, started.elapsed().as_millis());
        Ok(out)
    }
}

fn outcome_label(result: &PipelineResult) -> &'static str {
    match result {
        PipelineResult::Delivered { .. } => "delivered",
        PipelineResult::Failed { kind, .. } => match kind {
            ErrorKind::InputError => "input_error",
            ErrorKind::ToolUnavailable => "tool_unavailable",
            ErrorKind::StageFailure { .. } => "stage_failure",
            ErrorKind::Internal => "internal_error",
        },
    }
}
