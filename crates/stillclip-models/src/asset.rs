//! On-disk media artifacts.

use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// What an artifact holds. Determines its file prefix and extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssetKind {
    Image,
    RawVideo,
    RawAudio,
    TrimmedAudio,
    NormalizedAudio,
    PreparedFrame,
    FinalVideo,
}

impl AssetKind {
    /// Stable name used in file prefixes and redacted diagnostics.
    pub fn as_str(&self) -> &'static str {
        match self {
            AssetKind::Image => "image",
            AssetKind::RawVideo => "raw_video",
            AssetKind::RawAudio => "raw_audio",
            AssetKind::TrimmedAudio => "trimmed_audio",
            AssetKind::NormalizedAudio => "normalized_audio",
            AssetKind::PreparedFrame => "prepared_frame",
            AssetKind::FinalVideo => "final_video",
        }
    }

    /// Extension for artifacts of this kind.
    ///
    /// Uploads keep whatever extension the caller supplied, so `None` here.
    pub fn extension(&self) -> Option<&'static str> {
        match self {
            AssetKind::Image | AssetKind::RawVideo => None,
            AssetKind::RawAudio | AssetKind::TrimmedAudio => Some("wav"),
            // M4A container avoids raw ADTS .aac muxing issues
            AssetKind::NormalizedAudio => Some("m4a"),
            AssetKind::PreparedFrame => Some("png"),
            AssetKind::FinalVideo => Some("mp4"),
        }
    }
}

impl fmt::Display for AssetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Handle to bytes on disk. Stages only ever see the path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaAsset {
    path: PathBuf,
    kind: AssetKind,
}

impl MediaAsset {
    pub fn new(path: impl Into<PathBuf>, kind: AssetKind) -> Self {
        Self {
            path: path.into(),
            kind,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn kind(&self) -> AssetKind {
        self.kind
    }

    pub fn into_path(self) -> PathBuf {
        self.path
    }
}

impl AsRef<Path> for MediaAsset {
    fn as_ref(&self) -> &Path {
        &self.path
    }
}
