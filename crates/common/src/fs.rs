//! Filesystem helpers: retrying directory purge and the per-request
//! temporary workspace.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::Duration;

const PURGE_ATTEMPTS: u32 = 5;
const PURGE_RETRY_DELAY: Duration = Duration::from_millis(500);

/// Recursively remove `dir`.
///
/// Missing directories are a no-op. Permission errors (typically a file
/// still held open by a decoder on some platforms) are retried a few times.
pub fn purge_dir(dir: &Path) -> std::io::Result<()> {
    purge_dir_with(dir, PURGE_ATTEMPTS, PURGE_RETRY_DELAY)
}

fn purge_dir_with(dir: &Path, attempts: u32, delay: Duration) -> std::io::Result<()> {
    let mut attempt = 0;
    loop {
        attempt += 1;
        match std::fs::remove_dir_all(dir) {
            Ok(()) => return Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(()),
            Err(e) if e.kind() == ErrorKind::PermissionDenied && attempt < attempts => {
                tracing::debug!(
                    path = %dir.display(),
                    attempt,
                    "Directory locked, retrying purge"
                );
                std::thread::sleep(delay);
            }
            Err(e) => return Err(e),
        }
    }
}

/// A temporary directory owned by exactly one in-flight generation.
///
/// Creation erases anything left over from a previous run at the same
/// path; dropping the workspace purges it again, on success and on every
/// error path.
#[derive(Debug)]
pub struct TempWorkspace {
    path: PathBuf,
}

impl TempWorkspace {
    /// Create a fresh workspace at `root/key`.
    pub fn create(root: &Path, key: &str) -> std::io::Result<Self> {
        let path = root.join(key);
        purge_dir(&path)?;
        std::fs::create_dir_all(&path)?;
        tracing::debug!(path = %path.display(), "Created temporary workspace");
        Ok(Self { path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Path of a file inside the workspace.
    pub fn file(&self, name: &str) -> PathBuf {
        self.path.join(name)
    }
}

impl Drop for TempWorkspace {
    fn drop(&mut self) {
        match purge_dir(&self.path) {
            Ok(()) => tracing::debug!(path = %self.path.display(), "Purged temporary workspace"),
            Err(e) => tracing::error!(
                path = %self.path.display(),
                error = %e,
                "Failed to purge temporary workspace"
            ),
        }
    }
}

/// Reduce an arbitrary identifier to `[A-Za-z0-9_-]` so it is safe inside
/// file and directory names.
pub fn sanitize_component(raw: &str) -> String {
    let cleaned: String = raw
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .take(64)
        .collect();
    if cleaned.is_empty() {
        "_".to_string()
    } else {
        cleaned
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_purge_missing_dir_is_noop() {
        let root = tempfile::tempdir().unwrap();
        purge_dir(&root.path().join("never-created")).unwrap();
    }

    #[test]
    fn test_workspace_erases_stale_content_and_purges_on_drop() {
        let root = tempfile::tempdir().unwrap();
        let stale = root.path().join("req-1");
        std::fs::create_dir_all(&stale).unwrap();
        std::fs::write(stale.join("old.mp3"), b"stale").unwrap();

        let workspace = TempWorkspace::create(root.path(), "req-1").unwrap();
        assert!(workspace.path().exists());
        assert!(!workspace.file("old.mp3").exists());

        std::fs::write(workspace.file("new.mp3"), b"fresh").unwrap();
        let path = workspace.path().to_path_buf();
        drop(workspace);
        assert!(!path.exists());
    }

    #[test]
    fn test_workspaces_are_partitioned_by_key() {
        let root = tempfile::tempdir().unwrap();
        let a = TempWorkspace::create(root.path(), "a").unwrap();
        let b = TempWorkspace::create(root.path(), "b").unwrap();
        assert_ne!(a.path(), b.path());
        drop(a);
        assert!(b.path().exists());
    }

    #[test]
    fn test_sanitize_component() {
        assert_eq!(sanitize_component("abc-123_x"), "abc-123_x");
        assert_eq!(sanitize_component("../etc/passwd"), "___etc_passwd");
        assert_eq!(sanitize_component(""), "_");
    }
}
