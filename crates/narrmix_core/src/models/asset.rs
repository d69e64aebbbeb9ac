//! Audio assets: a scratch file plus cached metadata.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Container format of an audio asset, derived from its extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AudioFormat {
    #[default]
    Mp3,
    Wav,
    Flac,
    M4a,
    Ogg,
    Unknown,
}

impl AudioFormat {
    /// Map a file extension (without the dot) to a format.
    pub fn from_extension(ext: &str) -> Self {
        match ext.to_ascii_lowercase().as_str() {
            "mp3" => AudioFormat::Mp3,
            "wav" => AudioFormat::Wav,
            "flac" => AudioFormat::Flac,
            "m4a" | "aac" | "mp4" => AudioFormat::M4a,
            "ogg" | "oga" | "opus" => AudioFormat::Ogg,
            _ => AudioFormat::Unknown,
        }
    }

    /// Format of the file at `path`.
    pub fn from_path(path: &Path) -> Self {
        path.extension()
            .and_then(|e| e.to_str())
            .map(Self::from_extension)
            .unwrap_or(AudioFormat::Unknown)
    }
}

/// A transient media file produced or consumed by a pipeline stage.
///
/// The duration is cached only after it has been measured; `None` means
/// the asset has not been probed yet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AudioAsset {
    path: PathBuf,
    #[serde(skip_serializing_if = "Option::is_none")]
    duration_seconds: Option<f64>,
    format: AudioFormat,
}

impl AudioAsset {
    /// Reference the file at `path`. Nothing is read from disk.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let format = AudioFormat::from_path(&path);
        Self {
            path,
            duration_seconds: None,
            format,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn format(&self) -> AudioFormat {
        self.format
    }

    /// Extension of the file itself, `mp3` when it has none.
    ///
    /// Stream-copied outputs must keep the source container, which
    /// [`AudioFormat`] cannot name for every input.
    pub fn file_extension(&self) -> &str {
        self.path
            .extension()
            .and_then(|e| e.to_str())
            .filter(|e| !e.is_empty())
            .unwrap_or("mp3")
    }

    /// Measured duration, if the asset has been probed.
    pub fn duration(&self) -> Option<f64> {
        self.duration_seconds
    }

    /// Record a measured duration.
    pub fn set_duration(&mut self, seconds: f64) {
        self.duration_seconds = Some(seconds);
    }

    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    /// File size in bytes, or `None` if the file is missing.
    pub fn size_bytes(&self) -> Option<u64> {
        fs::metadata(&self.path).ok().map(|m| m.len())
    }

    pub fn into_path(self) -> PathBuf {
        self.path
    }
}

impl fmt::Display for AudioAsset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.path.display())
    }
}
