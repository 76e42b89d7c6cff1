//! Still-image clip CLI.

use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::Parser;
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use stillclip_media::probe_media;
use stillclip_models::{PipelineRequest, PipelineResult, UploadedFile};
use stillclip_worker::{Pipeline, WorkerConfig};

/// Turn a still image and a video's audio into a vertical MP4 clip.
#[derive(Debug, Parser)]
#[command(name = "stillclip", version)]
struct Args {
    /// Still image shown for the whole clip
    #[arg(long)]
    image: PathBuf,

    /// Video whose audio track is used
    #[arg(long)]
    video: PathBuf,

    /// Output base name (defaults to the image file name)
    #[arg(long)]
    name: Option<String>,

    /// Directory the clip is written to
    #[arg(long, env = "STILLCLIP_OUTPUT_DIR")]
    output_dir: Option<PathBuf>,

    /// Directory for intermediate files
    #[arg(long, env = "STILLCLIP_WORK_DIR")]
    work_dir: Option<PathBuf>,

    /// Print the full result as JSON instead of the output path
    #[arg(long)]
    json: bool,
}

#[tokio::main]
async fn main() {
    // Load environment variables
    dotenvy::dotenv().ok();

    init_tracing();

    if let Err(e) = run(Args::parse()).await {
        error!("{:#}", e);
        eprintln!("stillclip: {:#}", e);
        std::process::exit(1);
    }
}

fn init_tracing() {
    // Colored output for dev, JSON for production
    let use_json = std::env::var("LOG_FORMAT")
        .map(|v| v.to_lowercase() == "json")
        .unwrap_or(false);

    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("stillclip=info,warn"));

    if use_json {
        tracing_subscriber::registry()
            .with(fmt::layer().json())
            .with(env_filter)
            .init();
    } else {
        tracing_subscriber::registry()
            .with(
                fmt::layer()
                    .with_ansi(true)
                    .with_target(true)
                    .with_thread_ids(false)
                    .with_file(false)
                    .with_line_number(false)
                    .with_writer(std::io::stderr),
            )
            .with(env_filter)
            .init();
    }
}

async fn run(args: Args) -> anyhow::Result<()> {
    let mut config = WorkerConfig::from_env();
    if let Some(dir) = args.work_dir {
        config.work_dir = dir;
    }
    if let Some(dir) = args.output_dir {
        config.output_dir = dir;
    }
    info!(
        work_dir = %config.work_dir.display(),
        output_dir = %config.output_dir.display(),
        "Starting stillclip"
    );

    let pipeline = Pipeline::new(config).context("invalid configuration")?;

    let image = read_upload(&args.image).await?;
    let video = read_upload(&args.video).await?;
    let request = match args.name.as_deref() {
        Some(name) => PipelineRequest::new(image, video, name),
        None => PipelineRequest::named_after_image(image, video),
    };

    let result = pipeline.run(&request).await;
    if args.json {
        println!("{}", serde_json::to_string_pretty(&result)?);
    }

    match result {
        PipelineResult::Delivered {
            output_path,
            bounds,
            degraded,
        } => {
            if degraded {
                warn!("Loudness normalization was skipped for this clip");
            }
            match probe_media(&output_path).await {
                Ok(info) => info!(
                    duration_secs = info.duration,
                    content_start_ms = bounds.start_ms(),
                    content_end_ms = bounds.end_ms(),
                    "Clip ready"
                ),
                Err(e) => warn!(error = %e, "Could not probe delivered clip"),
            }
            if !args.json {
                println!("{}", output_path.display());
            }
            Ok(())
        }
        PipelineResult::Failed { kind, message } => {
            anyhow::bail!("{} ({:?})", message, kind)
        }
    }
}

/// Read a file as if it had been uploaded under its own name.
async fn read_upload(path: &Path) -> anyhow::Result<UploadedFile> {
    let bytes = tokio::fs::read(path)
        .await
        .with_context(|| format!("could not read {}", path.display()))?;
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    Ok(UploadedFile::new(file_name, bytes))
}
