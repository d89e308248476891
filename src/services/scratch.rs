//! Per-request scratch storage
//!
//! Uploads and their protected copies are staged on disk under random names.
//! A [`ScratchFile`] removes its file when dropped, so every exit path of a
//! request leaves the scratch directory as it found it.

use std::io;
use std::path::{Path, PathBuf};
use tempfile::TempPath;
use tokio::fs;
use tracing::warn;

/// Directory holding scratch files
#[derive(Debug, Clone)]
pub struct ScratchDir {
    root: PathBuf,
}

impl ScratchDir {
    /// Wrap a scratch directory path (not created until [`ScratchDir::ensure`])
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Scratch directory path
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Create the scratch directory if it does not exist yet
    pub async fn ensure(&self) -> io::Result<()> {
        fs::create_dir_all(&self.root).await
    }

    /// Reserve a new, uniquely named file inside the scratch directory
    ///
    /// The name is random and never derived from client input.
    pub fn reserve(&self, prefix: &str) -> io::Result<ScratchFile> {
        let path = tempfile::Builder::new()
            .prefix(prefix)
            .suffix(".pdf")
            .tempfile_in(&self.root)?
            .into_temp_path();
        Ok(ScratchFile { path: Some(path) })
    }

    /// Reserve a file and fill it with `data`
    pub async fn store(&self, prefix: &str, data: &[u8]) -> io::Result<ScratchFile> {
        let file = self.reserve(prefix)?;
        fs::write(file.path(), data).await?;
        Ok(file)
    }
}

/// A scratch file deleted when dropped
///
/// The path is only `None` while `drop` runs: it is taken there so the
/// removal error from `TempPath::close` can be logged instead of swallowed.
#[derive(Debug)]
pub struct ScratchFile {
    path: Option<TempPath>,
}

impl ScratchFile {
    /// Location of the file on disk
    pub fn path(&self) -> &Path {
        match &self.path {
            Some(path) => &**path,
            None => Path::new(""),
        }
    }
}

impl Drop for ScratchFile {
    fn drop(&mut self) {
        if let Some(path) = self.path.take() {
            let shown = path.display().to_string();
            if let Err(e) = path.close() {
                warn!(path = %shown, error = %e, "Failed to remove scratch file");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn entries(dir: &Path) -> usize {
        std::fs::read_dir(dir).map(|d| d.count()).unwrap_or(0)
    }

    #[tokio::test]
    async fn test_ensure_creates_directory() {
        let temp_dir = tempdir().expect("Failed to create temp dir");
        let root = temp_dir.path().join("nested").join("uploads");
        let scratch = ScratchDir::new(&root);

        scratch.ensure().await.expect("Failed to create scratch dir");
        assert!(root.is_dir());
        // Second call is a no-op
        scratch.ensure().await.expect("ensure should be idempotent");
    }

    #[tokio::test]
    async fn test_store_and_drop_removes_file() {
        let temp_dir = tempdir().expect("Failed to create temp dir");
        let scratch = ScratchDir::new(temp_dir.path());

        let file = scratch.store("upload-", b"%PDF-1.4").await.unwrap();
        let path = file.path().to_path_buf();
        assert!(path.starts_with(temp_dir.path()));
        assert_eq!(std::fs::read(&path).unwrap(), b"%PDF-1.4");

        drop(file);
        assert!(!path.exists());
        assert_eq!(entries(temp_dir.path()), 0);
    }

    #[tokio::test]
    async fn test_reserved_names_are_unique() {
        let temp_dir = tempdir().expect("Failed to create temp dir");
        let scratch = ScratchDir::new(temp_dir.path());

        let a = scratch.reserve("upload-").unwrap();
        let b = scratch.reserve("upload-").unwrap();
        assert_ne!(a.path(), b.path());
        assert_eq!(entries(temp_dir.path()), 2);

        drop(a);
        drop(b);
        assert_eq!(entries(temp_dir.path()), 0);
    }

    #[tokio::test]
    async fn test_drop_tolerates_already_removed_file() {
        let temp_dir = tempdir().expect("Failed to create temp dir");
        let scratch = ScratchDir::new(temp_dir.path());

        let file = scratch.reserve("protected-").unwrap();
        let path = file.path().to_path_buf();
        std::fs::remove_file(&path).unwrap();
        // Removal failure is logged, not raised
        drop(file);
        assert!(!path.exists());
        assert_eq!(entries(temp_dir.path()), 0);
    }

    #[tokio::test]
    async fn test_path_points_into_scratch_dir_until_dropped() {
        let temp_dir = tempdir().expect("Failed to create temp dir");
        let scratch = ScratchDir::new(temp_dir.path());

        let file = scratch.reserve("upload-").unwrap();
        assert_eq!(file.path().parent(), Some(temp_dir.path()));
        assert!(file.path().is_file());
        let name = file.path().file_name().unwrap().to_string_lossy().to_string();
        assert!(name.starts_with("upload-"));
        assert!(name.ends_with(".pdf"));
    }

    #[test]
    fn test_reserve_in_missing_directory_fails() {
        let scratch = ScratchDir::new("/nonexistent/path/12345");
        assert!(scratch.reserve("upload-").is_err());
    }
}
