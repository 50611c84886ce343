//! Filesystem-backed storage gateway.
//!
//! Objects live under a root directory keyed by relative path. Used in
//! development and tests; production deployments plug in their own
//! object-store gateway.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::fs;
use tracing::debug;
use uuid::Uuid;

use crate::error::{StorageError, StorageResult};
use crate::gateway::StorageGateway;

/// Gateway over a local directory.
pub struct FsStorage {
    root: PathBuf,
}

impl FsStorage {
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    /// Resolve a reference to its path under the root, rejecting traversal.
    fn resolve(&self, reference: &str) -> StorageResult<PathBuf> {
        if reference.is_empty()
            || reference.starts_with('/')
            || reference.split('/').any(|part| part == "..")
        {
            return Err(StorageError::InvalidReference(reference.to_string()));
        }
        Ok(self.root.join(reference))
    }
}

#[async_trait]
impl StorageGateway for FsStorage {
    async fn fetch(&self, reference: &str, dest: &Path) -> StorageResult<()> {
        let src = self.resolve(reference)?;
        if !src.exists() {
            return Err(StorageError::NotFound(reference.to_string()));
        }
        if let Some(parent) = dest.parent() {
            fs::create_dir_all(parent).await?;
        }
        fs::copy(&src, dest).await?;
        debug!(reference, dest = %dest.display(), "Fetched object");
        Ok(())
    }

    async fn store(&self, src: &Path) -> StorageResult<String> {
        if !src.exists() {
            return Err(StorageError::NotFound(src.to_string_lossy().to_string()));
        }
        let ext = src
            .extension()
            .map(|e| format!(".{}", e.to_string_lossy()))
            .unwrap_or_default();
        let reference = format!("outputs/{}{}", Uuid::new_v4(), ext);

        let dest = self.root.join(&reference);
        if let Some(parent) = dest.parent() {
            fs::create_dir_all(parent).await?;
        }
        fs::copy(src, &dest).await?;
        debug!(reference, src = %src.display(), "Stored object");
        Ok(reference)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_store_then_fetch_roundtrip() {
        let root = TempDir::new().unwrap();
        let work = TempDir::new().unwrap();
        let storage = FsStorage::new(root.path());

        let src = work.path().join("clip.mp4");
        fs::write(&src, b"media bytes").await.unwrap();

        let reference = storage.store(&src).await.unwrap();
        assert!(reference.starts_with("outputs/"));
        assert!(reference.ends_with(".mp4"));

        let dest = work.path().join("fetched.mp4");
        storage.fetch(&reference, &dest).await.unwrap();
        assert_eq!(fs::read(&dest).await.unwrap(), b"media bytes");
    }

    #[tokio::test]
    async fn test_fetch_missing_object() {
        let root = TempDir::new().unwrap();
        let storage = FsStorage::new(root.path());
        let err = storage
            .fetch("outputs/nope.mp4", Path::new("/tmp/never.mp4"))
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_fetch_rejects_traversal() {
        let root = TempDir::new().unwrap();
        let storage = FsStorage::new(root.path());
        for bad in ["../etc/passwd", "/etc/passwd", "a/../../b"] {
            let err = storage
                .fetch(bad, Path::new("/tmp/never"))
                .await
                .unwrap_err();
            assert!(matches!(err, StorageError::InvalidReference(_)), "{bad}");
        }
    }

    #[tokio::test]
    async fn test_store_missing_source() {
        let root = TempDir::new().unwrap();
        let storage = FsStorage::new(root.path());
        let err = storage
            .store(Path::new("/nonexistent/file.mp4"))
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::NotFound(_)));
    }
}
