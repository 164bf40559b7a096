//! Storage abstractions for downloaded documents.
//!
//! ## Directory Structure
//!
//! ```text
//! {output_dir}/
//! ├── Paris.txt             # one file per identifier, `.txt` or `.html`
//! ├── Berlin.txt
//! └── S%C3%A3o_Paulo.txt    # stems are sanitized, see `utils::sanitize_file_stem`
//! ```

pub mod local;

use std::io::{self, ErrorKind};
use std::path::{Path, PathBuf};
use std::process;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use tokio::io::AsyncWriteExt;

use crate::models::{Identifier, OutputFormat};

// Re-export for convenience
pub use local::LocalStorage;

/// Trait for document storage backends.
#[async_trait]
pub trait DocumentStorage: Send + Sync {
    /// Persist one document body verbatim and return where it went.
    ///
    /// A later save of the same identifier and format replaces the earlier one.
    async fn save(
        &self,
        identifier: &Identifier,
        format: OutputFormat,
        body: &[u8],
    ) -> io::Result<PathBuf>;

    /// Human-readable location of the backend, for logs and errors.
    fn location(&self) -> &Path;
}

/// Whether a write failure will repeat for every other identifier too.
///
/// `AlreadyExists` only comes from creating the output directory, which
/// means a file is in the way.
pub fn is_systemic(error: &io::Error) -> bool {
    matches!(
        error.kind(),
        ErrorKind::AlreadyExists
            | ErrorKind::PermissionDenied
            | ErrorKind::ReadOnlyFilesystem
            | ErrorKind::StorageFull
            | ErrorKind::NotADirectory
            | ErrorKind::NotFound
    )
}

static TEMP_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Write bytes atomically (write to temp, then rename).
///
/// The temp file sits next to `path` so the rename never crosses filesystems.
/// If the write fails or the future is dropped half way, `path` keeps its
/// previous content and the temp file is removed.
pub async fn write_atomic(path: &Path, bytes: &[u8]) -> io::Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            tokio::fs::create_dir_all(parent).await?;
        }
    }

    let file_name = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();
    let seq = TEMP_COUNTER.fetch_add(1, Ordering::Relaxed);
    let mut tmp = PartFile {
        path: path.with_file_name(format!(".{file_name}.{}.{seq}.part", process::id())),
        renamed: false,
    };

    let mut file = tokio::fs::File::create(&tmp.path).await?;
    file.write_all(bytes).await?;
    file.flush().await?;
    file.sync_all().await?;
    drop(file);
    tokio::fs::rename(&tmp.path, path).await?;
    tmp.renamed = true;
    Ok(())
}

/// Temp file of an in-progress [`write_atomic`]; removed unless renamed.
struct PartFile {
    path: PathBuf,
    renamed: bool,
}

impl Drop for PartFile {
    fn drop(&mut self) {
        if !self.renamed {
            let _ = std::fs::remove_file(&self.path);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn write_atomic_creates_parents_and_overwrites() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("nested/dir/out.txt");

        write_atomic(&path, b"first").await.unwrap();
        write_atomic(&path, b"second").await.unwrap();

        assert_eq!(std::fs::read(&path).unwrap(), b"second");
        let entries = std::fs::read_dir(path.parent().unwrap()).unwrap().count();
        assert_eq!(entries, 1, "temp files left behind");
    }

    #[tokio::test]
    async fn write_atomic_under_a_file_is_systemic() {
        let tmp = TempDir::new().unwrap();
        let blocker = tmp.path().join("blocker");
        std::fs::write(&blocker, b"").unwrap();

        let err = write_atomic(&blocker.join("sub/out.txt"), b"x")
            .await
            .unwrap_err();
        assert!(is_systemic(&err), "unexpected kind {:?}", err.kind());
    }

    #[tokio::test]
    async fn abandoned_write_keeps_previous_content() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("Paris.txt");
        std::fs::write(&path, b"old").unwrap();
        let body = vec![b'x'; 4 << 20];

        tokio::select! {
            biased;
            result = write_atomic(&path, &body) => result.unwrap(),
            () = std::future::ready(()) => {}
        }

        let content = std::fs::read(&path).unwrap();
        assert!(content == b"old" || content == body, "partial write visible");

        write_atomic(&path, b"new").await.unwrap();
        assert_eq!(std::fs::read(&path).unwrap(), b"new");
    }

    #[tokio::test]
    async fn failed_rename_removes_temp_file() {
        let tmp = TempDir::new().unwrap();
        let taken = tmp.path().join("taken");
        std::fs::create_dir(&taken).unwrap();
        std::fs::write(taken.join("inside"), b"").unwrap();

        assert!(write_atomic(&taken, b"x").await.is_err());

        let names: Vec<_> = std::fs::read_dir(tmp.path())
            .unwrap()
            .map(|entry| entry.unwrap().file_name())
            .collect();
        assert_eq!(names, ["taken"]);
    }

    #[test]
    fn other_errors_are_per_document() {
        let err = io::Error::new(ErrorKind::InvalidInput, "bad name");
        assert!(!is_systemic(&err));
    }
}
