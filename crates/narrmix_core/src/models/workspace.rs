//! Per-invocation scratch directories with collision-free file names.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use uuid::Uuid;

/// Generate a fresh job identifier.
pub fn new_job_id() -> String {
    Uuid::new_v4().to_string()
}

/// Scratch directory owned by one pipeline invocation.
///
/// Every file the invocation creates lives under `temp_root/<job_id>`,
/// so concurrent invocations sharing a filesystem never collide.
#[derive(Debug)]
pub struct Workspace {
    root: PathBuf,
}

impl Workspace {
    /// Create `temp_root/<job_id>` (and parents).
    pub fn create(temp_root: impl AsRef<Path>, job_id: &str) -> io::Result<Self> {
        let root = temp_root.as_ref().join(job_id);
        fs::create_dir_all(&root)?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Allocate a unique path `prefix_<uuid>.ext`. The file is not created.
    pub fn allocate(&self, prefix: &str, ext: &str) -> PathBuf {
        self.root
            .join(format!("{}_{}.{}", prefix, Uuid::new_v4().simple(), ext))
    }

    /// Remove the directory and everything left in it.
    pub fn remove(&self) -> io::Result<()> {
        match fs::remove_dir_all(&self.root) {
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            other => other,
        }
    }
}
