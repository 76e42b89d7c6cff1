//! Pipeline request built from the two uploads.

use std::path::Path;
use std::sync::LazyLock;

use regex::Regex;

/// Base name used when sanitizing leaves nothing.
pub const DEFAULT_OUTPUT_BASE_NAME: &str = "video_final";

static UNSAFE_RUNS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^A-Za-z0-9_\-]+").expect("static regex"));

/// Reduce a free-text name to a filesystem-safe token.
///
/// Directory components and the extension are dropped, runs of characters
/// outside `[A-Za-z0-9_-]` become a single `_`, and leading/trailing `_` are
/// trimmed. An empty result falls back to [`DEFAULT_OUTPUT_BASE_NAME`].
pub fn sanitize_base_name(name: &str) -> String {
    let stem = Path::new(name.trim())
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();

    let cleaned = UNSAFE_RUNS.replace_all(&stem, "_");
    let cleaned = cleaned.trim_matches('_');

    if cleaned.is_empty() {
        DEFAULT_OUTPUT_BASE_NAME.to_string()
    } else {
        cleaned.to_string()
    }
}

/// One uploaded byte stream with the name the client gave it.
#[derive(Clone, PartialEq, Eq)]
pub struct UploadedFile {
    pub file_name: String,
    pub bytes: Vec<u8>,
}

impl UploadedFile {
    pub fn new(file_name: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            file_name: file_name.into(),
            bytes: bytes.into(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Extension of the client file name, if it has a safe one.
    pub fn extension(&self) -> Option<String> {
        Path::new(&self.file_name)
            .extension()
            .map(|e| e.to_string_lossy().to_ascii_lowercase())
            .filter(|e| !e.is_empty() && e.chars().all(|c| c.is_ascii_alphanumeric()))
    }
}

impl std::fmt::Debug for UploadedFile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UploadedFile")
            .field("file_name", &self.file_name)
            .field("len", &self.bytes.len())
            .finish()
    }
}

/// Immutable request: image, video, and the sanitized output base name.
#[derive(Debug, Clone)]
pub struct PipelineRequest {
    image: UploadedFile,
    video: UploadedFile,
    output_base_name: String,
}

impl PipelineRequest {
    pub fn new(image: UploadedFile, video: UploadedFile, base_name: &str) -> Self {
        Self {
            image,
            video,
            output_base_name: sanitize_base_name(base_name),
        }
    }

    /// Build a request whose output is named after the image upload.
    pub fn named_after_image(image: UploadedFile, video: UploadedFile) -> Self {
        let base = image.file_name.clone();
        Self::new(image, video, &base)
    }

    pub fn image(&self) -> &UploadedFile {
        &self.image
    }

    pub fn video(&self) -> &UploadedFile {
        &self.video
    }

    pub fn output_base_name(&self) -> &str {
        &self.output_base_name
    }

    /// Final file name, e.g. `my_clip.mp4`.
    pub fn output_file_name(&self) -> String {
        format!("{}.mp4", self.output_base_name)
    }
}
