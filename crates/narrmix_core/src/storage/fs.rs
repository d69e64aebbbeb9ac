//! Filesystem-backed object store.

use std::fs;
use std::path::{Component, Path, PathBuf};
use std::time::Duration;

use url::Url;

use super::{ObjectStore, StorageError, StorageResult};

/// Buckets are directories under `root`; keys are relative paths inside them.
#[derive(Debug, Clone)]
pub struct FsObjectStore {
    root: PathBuf,
}

impl FsObjectStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Location of `bucket/key` on disk.
    ///
    /// Rejects empty names and anything that could escape the bucket.
    pub fn object_path(&self, bucket: &str, key: &str) -> StorageResult<PathBuf> {
        if !is_plain_relative(bucket) || bucket.contains('/') {
            return Err(StorageError::InvalidKey(format!("bucket {:?}", bucket)));
        }
        if !is_plain_relative(key) {
            return Err(StorageError::InvalidKey(format!("key {:?}", key)));
        }
        Ok(self.root.join(bucket).join(key))
    }
}

fn is_plain_relative(name: &str) -> bool {
    !name.is_empty()
        && Path::new(name)
            .components()
            .all(|c| matches!(c, Component::Normal(_)))
}

impl ObjectStore for FsObjectStore {
    fn download(&self, bucket: &str, key: &str, dest: &Path) -> StorageResult<()> {
        let source = self.object_path(bucket, key)?;
        if !source.is_file() {
            return Err(StorageError::not_found(bucket, key));
        }
        fs::copy(&source, dest).map_err(|e| StorageError::io(bucket, key, e))?;
        tracing::debug!("Downloaded {}/{} -> {}", bucket, key, dest.display());
        Ok(())
    }

    fn upload(&self, bucket: &str, key: &str, source: &Path) -> StorageResult<()> {
        let target = self.object_path(bucket, key)?;
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent).map_err(|e| StorageError::io(bucket, key, e))?;
        }

        // Copy next to the target and rename so readers never see a partial object.
        let partial = target.with_extension("part");
        fs::copy(source, &partial).map_err(|e| StorageError::io(bucket, key, e))?;
        fs::rename(&partial, &target).map_err(|e| StorageError::io(bucket, key, e))?;
        tracing::debug!("Uploaded {} -> {}/{}", source.display(), bucket, key);
        Ok(())
    }

    fn presign(&self, bucket: &str, key: &str, ttl: Duration) -> StorageResult<String> {
        let path = self.object_path(bucket, key)?;
        if !path.is_file() {
            return Err(StorageError::not_found(bucket, key));
        }

        let absolute =
            std::path::absolute(&path).map_err(|e| StorageError::presign(bucket, key, e.to_string()))?;
        let mut url = Url::from_file_path(&absolute)
            .map_err(|_| StorageError::presign(bucket, key, "path is not representable as a URL"))?;

        let ttl = chrono::Duration::from_std(ttl)
            .map_err(|e| StorageError::presign(bucket, key, e.to_string()))?;
        let expires = chrono::Utc::now() + ttl;
        url.query_pairs_mut()
            .append_pair("expires", &expires.timestamp().to_string());

        Ok(url.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn upload_then_download() {
        let dir = tempdir().unwrap();
        let store = FsObjectStore::new(dir.path().join("store"));

        let local = dir.path().join("mix.mp3");
        fs::write(&local, b"mixed").unwrap();
        store.upload("out", "mixed/abc.mp3", &local).unwrap();
        assert!(dir.path().join("store/out/mixed/abc.mp3").is_file());
        assert!(!dir.path().join("store/out/mixed/abc.part").exists());

        let back = dir.path().join("back.mp3");
        store.download("out", "mixed/abc.mp3", &back).unwrap();
        assert_eq!(fs::read(&back).unwrap(), b"mixed");
    }

    #[test]
    fn missing_object_is_not_found() {
        let dir = tempdir().unwrap();
        let store = FsObjectStore::new(dir.path());
        let err = store
            .download("beds", "calm.mp3", &dir.path().join("x.mp3"))
            .unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn escaping_keys_are_rejected() {
        let store = FsObjectStore::new("/srv/store");
        assert!(matches!(
            store.object_path("out", "../etc/passwd"),
            Err(StorageError::InvalidKey(_))
        ));
        assert!(matches!(
            store.object_path("out", "/abs.mp3"),
            Err(StorageError::InvalidKey(_))
        ));
        assert!(matches!(
            store.object_path("", "a.mp3"),
            Err(StorageError::InvalidKey(_))
        ));
        assert_eq!(
            store.object_path("out", "mixed/a.mp3").unwrap(),
            PathBuf::from("/srv/store/out/mixed/a.mp3")
        );
    }

    #[test]
    fn presign_yields_expiring_file_url() {
        let dir = tempdir().unwrap();
        let store = FsObjectStore::new(dir.path());
        let local = dir.path().join("mix.mp3");
        fs::write(&local, b"mixed").unwrap();
        store.upload("out", "mixed/abc.mp3", &local).unwrap();

        let link = store
            .presign("out", "mixed/abc.mp3", Duration::from_secs(3600))
            .unwrap();
        let url = Url::parse(&link).unwrap();
        assert_eq!(url.scheme(), "file");
        assert!(url.path().ends_with("/out/mixed/abc.mp3"));

        let expires: i64 = url
            .query_pairs()
            .find(|(k, _)| k == "expires")
            .map(|(_, v)| v.parse().unwrap())
            .unwrap();
        let now = chrono::Utc::now().timestamp();
        assert!(expires > now + 3500 && expires <= now + 3601);
    }
}
