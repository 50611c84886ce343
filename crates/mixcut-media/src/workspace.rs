//! Per-task scratch workspaces.
//!
//! Each claimed task gets an exclusively-owned directory under the worker's
//! work dir. The directory is released on every exit path; a startup sweep
//! removes directories orphaned by crashed workers.

use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, warn};

use crate::error::MediaResult;

/// Directory name prefix for task workspaces.
const TASK_DIR_PREFIX: &str = "task-";

/// An exclusively-owned scratch directory for one task.
#[derive(Debug)]
pub struct ScratchWorkspace {
    dir: PathBuf,
}

impl ScratchWorkspace {
    /// Create the workspace for a task, replacing any leftover directory
    /// from a previous attempt of the same task.
    pub async fn create(work_dir: impl AsRef<Path>, task_id: &str) -> MediaResult<Self> {
        let dir = work_dir
            .as_ref()
            .join(format!("{}{}", TASK_DIR_PREFIX, task_id));
        if dir.exists() {
            debug!(dir = %dir.display(), "Replacing leftover task workspace");
            fs::remove_dir_all(&dir).await?;
        }
        fs::create_dir_all(&dir).await?;
        Ok(Self { dir })
    }

    /// The workspace directory.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of a file within the workspace.
    pub fn file(&self, name: &str) -> PathBuf {
        self.dir.join(name)
    }

    /// Release the workspace, removing it and everything in it.
    ///
    /// Removal failure is logged, not propagated: the startup sweep picks
    /// up anything left behind.
    pub async fn release(self) {
        if let Err(e) = fs::remove_dir_all(&self.dir).await {
            warn!(
                dir = %self.dir.display(),
                "Failed to release task workspace: {}", e
            );
        }
    }
}

/// Remove all task workspaces under `work_dir`.
///
/// Run at worker startup to reclaim disk from crashed runs. Returns the
/// number of directories removed.
pub async fn sweep_orphaned(work_dir: impl AsRef<Path>) -> MediaResult<u32> {
    let work_dir = work_dir.as_ref();
    if !work_dir.exists() {
        return Ok(0);
    }

    let mut removed = 0;
    let mut entries = fs::read_dir(work_dir).await?;
    while let Some(entry) = entries.next_entry().await? {
        let name = entry.file_name();
        let name = name.to_string_lossy();
        if !name.starts_with(TASK_DIR_PREFIX) {
            continue;
        }
        match fs::remove_dir_all(entry.path()).await {
            Ok(()) => {
                debug!(dir = %entry.path().display(), "Swept orphaned task workspace");
                removed += 1;
            }
            Err(e) => {
                warn!(dir = %entry.path().display(), "Failed to sweep workspace: {}", e);
            }
        }
    }
    Ok(removed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_create_and_release() {
        let root = TempDir::new().unwrap();
        let ws = ScratchWorkspace::create(root.path(), "abc").await.unwrap();
        assert!(ws.dir().exists());
        assert!(ws.dir().ends_with("task-abc"));

        fs::write(ws.file("probe.json"), b"{}").await.unwrap();
        let dir = ws.dir().to_path_buf();
        ws.release().await;
        assert!(!dir.exists());
    }

    #[tokio::test]
    async fn test_create_replaces_leftover() {
        let root = TempDir::new().unwrap();
        let ws = ScratchWorkspace::create(root.path(), "abc").await.unwrap();
        fs::write(ws.file("stale.mp4"), b"old").await.unwrap();

        // A second create for the same task starts clean.
        let ws2 = ScratchWorkspace::create(root.path(), "abc").await.unwrap();
        assert!(!ws2.file("stale.mp4").exists());
    }

    #[tokio::test]
    async fn test_sweep_orphaned() {
        let root = TempDir::new().unwrap();
        let _ = ScratchWorkspace::create(root.path(), "one").await.unwrap();
        let _ = ScratchWorkspace::create(root.path(), "two").await.unwrap();
        fs::create_dir(root.path().join("unrelated")).await.unwrap();

        let removed = sweep_orphaned(root.path()).await.unwrap();
        assert_eq!(removed, 2);
        assert!(root.path().join("unrelated").exists());
    }

    #[tokio::test]
    async fn test_sweep_missing_work_dir() {
        assert_eq!(sweep_orphaned("/nonexistent/mixcut-work").await.unwrap(), 0);
    }
}
