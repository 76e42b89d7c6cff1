//! Per-request artifact ownership.
//!
//! Every intermediate file a request touches is allocated here and removed
//! when the arena is disposed or dropped, whichever comes first.

use std::path::{Path, PathBuf};

use stillclip_media::remove_file_if_exists;
use stillclip_models::{AssetKind, MediaAsset, UploadedFile};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::error::{WorkerError, WorkerResult};
use crate::metrics;

/// Fallback extension for uploads whose name carries none.
const UNKNOWN_EXTENSION: &str = "bin";

/// Registry of a request's artifacts inside the work directory.
#[derive(Debug)]
pub struct ArtifactArena {
    work_dir: PathBuf,
    request_id: Uuid,
    assets: Vec<MediaAsset>,
    disposed: bool,
}

impl ArtifactArena {
    /// The work directory must already exist.
    pub fn new(work_dir: impl Into<PathBuf>) -> Self {
        Self {
            work_dir: work_dir.into(),
            request_id: Uuid::new_v4(),
            assets: Vec::new(),
            disposed: false,
        }
    }

    pub fn request_id(&self) -> Uuid {
        self.request_id
    }

    pub fn work_dir(&self) -> &Path {
        &self.work_dir
    }

    /// Assets currently tracked.
    pub fn assets(&self) -> &[MediaAsset] {
        &self.assets
    }

    /// Reserve a fresh `<kind>_<uuid>.<ext>` path. Nothing is created on disk.
    pub fn allocate(&mut self, kind: AssetKind) -> PathBuf {
        self.allocate_with_extension(kind, kind.extension().unwrap_or(UNKNOWN_EXTENSION))
    }

    fn allocate_with_extension(&mut self, kind: AssetKind, extension: &str) -> PathBuf {
        let path = self
            .work_dir
            .join(format!("{}_{}.{}", kind.as_str(), Uuid::new_v4(), extension));
        self.assets.push(MediaAsset::new(path.clone(), kind));
        path
    }

    /// Write an uploaded file into the arena, keeping its extension so tools
    /// can sniff the container.
    pub async fn store_upload(&mut self, kind: AssetKind, upload: &UploadedFile) -> WorkerResult<PathBuf> {
        let extension = upload
            .extension()
            .unwrap_or_else(|| UNKNOWN_EXTENSION.to_string());
        let path = self.allocate_with_extension(kind, &extension);

        tokio::fs::write(&path, &upload.bytes).await.map_err(|e| {
            WorkerError::Io(std::io::Error::new(
                e.kind(),
                format!("could not store {} upload: {}", kind, e),
            ))
        })?;

        debug!(kind = %kind, bytes = upload.bytes.len(), "Stored upload");
        Ok(path)
    }

    /// Replace artifact paths in `message` with `<kind>` placeholders.
    pub fn redact(&self, message: &str) -> String {
        let mut redacted = message.to_string();
        for asset in &self.assets {
            let path = asset.path().to_string_lossy();
            redacted = redacted.replace(path.as_ref(), &format!("<{}>", asset.kind()));
        }
        let work_dir = self.work_dir.to_string_lossy();
        if !work_dir.is_empty() {
            redacted = redacted.replace(work_dir.as_ref(), "<work_dir>");
        }
        redacted
    }

    /// Delete every tracked artifact. Failures are logged, never raised, and
    /// repeated calls are no-ops. Returns how many files could not be removed.
    pub fn dispose(&mut self) -> usize {
        if self.disposed {
            return 0;
        }
        self.disposed = true;

        let mut failures = 0;
        for asset in self.assets.drain(..) {
            match remove_file_if_exists(asset.path()) {
                Ok(true) => debug!(kind = %asset.kind(), "Removed artifact"),
                Ok(false) => {}
                Err(e) => {
                    failures += 1;
                    metrics::record_cleanup_failure(asset.kind());
                    warn!(
                        request_id = %self.request_id,
                        kind = %asset.kind(),
                        path = %asset.path().display(),
                        error = %e,
                        "Failed to remove artifact"
                    );
                }
            }
        }
        failures
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed
    }
}

impl Drop for ArtifactArena {
    fn drop(&mut self) {
        if !self.disposed {
            self.dispose();
        }
    }
}
