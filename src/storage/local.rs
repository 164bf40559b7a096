//! Local filesystem storage implementation.
//!
//! Each document lands in `{root}/{stem}.{ext}` where `stem` is the sanitized
//! identifier and `ext` follows the output format. Writes go through
//! [`write_atomic`], so an interrupted run never leaves a truncated document.

use std::io;
use std::path::{Path, PathBuf};

use async_trait::async_trait;

use crate::models::{Identifier, OutputFormat};
use crate::storage::{DocumentStorage, write_atomic};
use crate::utils::sanitize_file_stem;

/// Local filesystem storage backend.
#[derive(Debug, Clone)]
pub struct LocalStorage {
    root_dir: PathBuf,
}

impl LocalStorage {
    /// Create a new LocalStorage rooted at the given directory.
    ///
    /// The directory is created on first write.
    pub fn new(root_dir: impl Into<PathBuf>) -> Self {
        Self {
            root_dir: root_dir.into(),
        }
    }

    /// Path a document for `identifier` is written to.
    pub fn document_path(&self, identifier: &Identifier, format: OutputFormat) -> PathBuf {
        self.root_dir.join(format!(
            "{}.{}",
            sanitize_file_stem(identifier.as_str()),
            format.extension()
        ))
    }
}

#[async_trait]
impl DocumentStorage for LocalStorage {
    async fn save(
        &self,
        identifier: &Identifier,
        format: OutputFormat,
        body: &[u8],
    ) -> io::Result<PathBuf> {
        let path = self.document_path(identifier, format);
        write_atomic(&path, body).await?;
        log::debug!("Wrote {} bytes to {}", body.len(), path.display());
        Ok(path)
    }

    fn location(&self) -> &Path {
        &self.root_dir
    }
}
