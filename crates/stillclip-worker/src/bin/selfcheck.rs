use std::path::Path;

use stillclip_media::command::FFPROBE_BIN;
use stillclip_media::verify_tool;
use stillclip_worker::WorkerConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let config = WorkerConfig::from_env();

    println!(
        "stillclip-selfcheck: starting with work_dir={} output_dir={}",
        config.work_dir.display(),
        config.output_dir.display()
    );
    config.validate()?;
    ensure_dir(&config.work_dir).await?;
    ensure_dir(&config.output_dir).await?;
    ensure_tool(&config.ffmpeg_binary).await?;
    ensure_tool(FFPROBE_BIN).await?;

    println!("stillclip-selfcheck: ok");
    Ok(())
}

async fn ensure_dir<P: AsRef<Path>>(path: P) -> anyhow::Result<()> {
    let path = path.as_ref();
    tokio::fs::create_dir_all(path).await?;
    Ok(())
}

async fn ensure_tool(binary: &str) -> anyhow::Result<()> {
    let path = verify_tool(binary)
        .await
        .map_err(|e| anyhow::anyhow!("{} not available: {}", binary, e))?;
    println!("stillclip-selfcheck: {} -> {}", binary, path.display());
    Ok(())
}
