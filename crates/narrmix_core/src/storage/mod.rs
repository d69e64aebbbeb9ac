//! Object storage collaborator.
//!
//! The pipeline downloads narration chunks and the music bed through an
//! [`ObjectStore`], and publishes the mixed result through it. The
//! shipped [`FsObjectStore`] maps buckets to directories.

mod fs;

pub use fs::FsObjectStore;

use std::io;
use std::path::Path;
use std::time::Duration;

use thiserror::Error;

/// Errors from storage operations.
#[derive(Error, Debug)]
pub enum StorageError {
    /// The object does not exist.
    #[error("Object not found: {bucket}/{key}")]
    NotFound { bucket: String, key: String },

    /// The bucket or key cannot be mapped to a location.
    #[error("Invalid object name: {0}")]
    InvalidKey(String),

    /// Reading or writing the object failed.
    #[error("Storage I/O error on {bucket}/{key}: {source}")]
    Io {
        bucket: String,
        key: String,
        #[source]
        source: io::Error,
    },

    /// A download link could not be produced.
    #[error("Failed to presign {bucket}/{key}: {reason}")]
    Presign {
        bucket: String,
        key: String,
        reason: String,
    },
}

impl StorageError {
    pub fn not_found(bucket: &str, key: &str) -> Self {
        Self::NotFound {
            bucket: bucket.to_string(),
            key: key.to_string(),
        }
    }

    pub fn io(bucket: &str, key: &str, source: io::Error) -> Self {
        Self::Io {
            bucket: bucket.to_string(),
            key: key.to_string(),
            source,
        }
    }

    pub fn presign(bucket: &str, key: &str, reason: impl Into<String>) -> Self {
        Self::Presign {
            bucket: bucket.to_string(),
            key: key.to_string(),
            reason: reason.into(),
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Remote object storage.
pub trait ObjectStore: Send + Sync {
    /// Copy `bucket/key` to the local file `dest`.
    fn download(&self, bucket: &str, key: &str, dest: &Path) -> StorageResult<()>;

    /// Store the local file `source` as `bucket/key`.
    fn upload(&self, bucket: &str, key: &str, source: &Path) -> StorageResult<()>;

    /// Produce a time-limited download link for `bucket/key`.
    fn presign(&self, bucket: &str, key: &str, ttl: Duration) -> StorageResult<String>;
}
