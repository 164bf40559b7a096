// src/pipeline/list.rs

//! Name listing pipeline.

use std::path::{Path, PathBuf};

use crate::error::{AppError, Result};
use crate::models::Config;
use crate::services::NameLister;
use crate::storage::write_atomic;
use crate::utils::sanitize_file_stem;

/// Where the name list for `language` is written inside `list_dir`.
pub fn list_path(list_dir: &Path, language: &str) -> PathBuf {
    list_dir.join(format!("{}_citynames.txt", sanitize_file_stem(language)))
}

/// Query the knowledge base for `language` and write the names to
/// `{list_dir}/{language}_citynames.txt`.
///
/// The file is only written when the whole result is in hand.
pub async fn run_lister(config: &Config, language: &str, list_dir: &Path) -> Result<PathBuf> {
    let lister = NameLister::new(config)?;
    let names = lister.list(language).await?;

    let path = list_path(list_dir, language);
    write_atomic(&path, names.to_lines().as_bytes())
        .await
        .map_err(|e| AppError::persistence(&path, e))?;

    log::info!("Saved {} names to {}", names.len(), path.display());
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn list_path_is_derived_from_language() {
        assert_eq!(
            list_path(Path::new("data"), "en"),
            PathBuf::from("data/en_citynames.txt")
        );
    }

    #[test]
    fn list_path_cannot_escape_list_dir() {
        let path = list_path(Path::new("data"), "../x");
        assert_eq!(path.parent(), Some(Path::new("data")));
    }

    #[tokio::test]
    async fn failed_query_writes_no_list() {
        let tmp = TempDir::new().unwrap();
        let mut config = Config::default();
        config.knowledge_base.endpoint = "http://127.0.0.1:1/sparql".into();

        let err = run_lister(&config, "en", tmp.path()).await.unwrap_err();

        assert!(matches!(err, AppError::Query { ref language, .. } if language == "en"));
        assert!(!list_path(tmp.path(), "en").exists());
        assert_eq!(std::fs::read_dir(tmp.path()).unwrap().count(), 0);
    }
}
