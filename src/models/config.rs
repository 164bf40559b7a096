//! Application configuration structures.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::{AppError, Result};

/// Placeholder replaced by the language code in [`DocumentsConfig::base_url`].
pub const LANGUAGE_PLACEHOLDER: &str = "{lang}";

/// Root application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// HTTP client settings
    #[serde(default)]
    pub http: HttpConfig,

    /// Knowledge-base (SPARQL) query settings
    #[serde(default)]
    pub knowledge_base: KnowledgeBaseConfig,

    /// Document service settings
    #[serde(default)]
    pub documents: DocumentsConfig,

    /// Fetch loop settings
    #[serde(default)]
    pub fetcher: FetcherConfig,

    /// Where lists and documents are written
    #[serde(default)]
    pub paths: PathsConfig,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }

    /// Load configuration or return default if loading fails.
    pub fn load_or_default(path: impl AsRef<Path>) -> Self {
        Self::load(&path).unwrap_or_else(|e| {
            log::warn!(
                "Config load failed from {:?}: {}. Using defaults.",
                path.as_ref(),
                e
            );
            Self::default()
        })
    }

    /// Validate configuration values for basic sanity.
    pub fn validate(&self) -> Result<()> {
        if self.http.user_agent.trim().is_empty() {
            return Err(AppError::validation("http.user_agent is empty"));
        }
        if self.http.timeout_secs == 0 {
            return Err(AppError::validation("http.timeout_secs must be > 0"));
        }
        Url::parse(&self.knowledge_base.endpoint).map_err(|e| {
            AppError::validation(format!("knowledge_base.endpoint is not a URL: {e}"))
        })?;
        if !is_entity_id(&self.knowledge_base.category) {
            return Err(AppError::validation(format!(
                "knowledge_base.category '{}' is not a Wikidata item id",
                self.knowledge_base.category
            )));
        }
        if !self.documents.base_url.contains(LANGUAGE_PLACEHOLDER) {
            return Err(AppError::validation(format!(
                "documents.base_url must contain {LANGUAGE_PLACEHOLDER}"
            )));
        }
        self.documents.base_url_for("en").map_err(|e| {
            AppError::validation(format!("documents.base_url is not a URL: {e}"))
        })?;
        validate_rate(self.fetcher.max_requests_per_second)?;
        if self.fetcher.max_in_flight == 0 {
            return Err(AppError::validation("fetcher.max_in_flight must be > 0"));
        }
        Ok(())
    }
}

/// Check that a requests-per-second ceiling is usable.
pub fn validate_rate(max_requests_per_second: f64) -> Result<()> {
    if max_requests_per_second.is_finite() && max_requests_per_second > 0.0 {
        Ok(())
    } else {
        Err(AppError::validation(format!(
            "max requests per second must be a positive number, got {max_requests_per_second}"
        )))
    }
}

fn is_entity_id(id: &str) -> bool {
    id.strip_prefix('Q')
        .is_some_and(|digits| !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit()))
}

/// HTTP client settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpConfig {
    /// User-Agent header for knowledge-base requests
    #[serde(default = "defaults::user_agent")]
    pub user_agent: String,

    /// Request timeout in seconds
    #[serde(default = "defaults::timeout")]
    pub timeout_secs: u64,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            user_agent: defaults::user_agent(),
            timeout_secs: defaults::timeout(),
        }
    }
}

/// Knowledge-base query settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KnowledgeBaseConfig {
    /// SPARQL endpoint
    #[serde(default = "defaults::sparql_endpoint")]
    pub endpoint: String,

    /// Wikidata item whose instances (and instances of its subclasses) are listed
    #[serde(default = "defaults::category")]
    pub category: String,
}

impl Default for KnowledgeBaseConfig {
    fn default() -> Self {
        Self {
            endpoint: defaults::sparql_endpoint(),
            category: defaults::category(),
        }
    }
}

/// Document service settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentsConfig {
    /// Base address template, `{lang}` is replaced by the language code
    #[serde(default = "defaults::document_base_url")]
    pub base_url: String,
}

impl DocumentsConfig {
    /// Resolve the base address for one language edition.
    pub fn base_url_for(&self, language: &str) -> Result<Url> {
        Ok(Url::parse(
            &self.base_url.replace(LANGUAGE_PLACEHOLDER, language),
        )?)
    }
}

impl Default for DocumentsConfig {
    fn default() -> Self {
        Self {
            base_url: defaults::document_base_url(),
        }
    }
}

/// Fetch loop settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FetcherConfig {
    /// Ceiling on requests issued to the document service per second
    #[serde(default = "defaults::max_requests_per_second")]
    pub max_requests_per_second: f64,

    /// Responses allowed to be outstanding at once (issue spacing still applies)
    #[serde(default = "defaults::max_in_flight")]
    pub max_in_flight: usize,
}

impl Default for FetcherConfig {
    fn default() -> Self {
        Self {
            max_requests_per_second: defaults::max_requests_per_second(),
            max_in_flight: defaults::max_in_flight(),
        }
    }
}

/// Output locations.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathsConfig {
    /// Directory for `{language}_citynames.txt` lists
    #[serde(default = "defaults::list_dir")]
    pub list_dir: PathBuf,

    /// Root directory for downloaded documents
    #[serde(default = "defaults::output_dir")]
    pub output_dir: PathBuf,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            list_dir: defaults::list_dir(),
            output_dir: defaults::output_dir(),
        }
    }
}

mod defaults {
    use std::path::PathBuf;

    pub fn user_agent() -> String {
        concat!("wikifetch/", env!("CARGO_PKG_VERSION")).into()
    }
    pub fn timeout() -> u64 {
        30
    }
    pub fn sparql_endpoint() -> String {
        "https://query.wikidata.org/sparql".into()
    }
    pub fn category() -> String {
        "Q515".into()
    }
    pub fn document_base_url() -> String {
        "https://{lang}.wikipedia.org".into()
    }
    pub fn max_requests_per_second() -> f64 {
        100.0
    }
    pub fn max_in_flight() -> usize {
        1
    }
    pub fn list_dir() -> PathBuf {
        PathBuf::from("data")
    }
    pub fn output_dir() -> PathBuf {
        PathBuf::from("data/documents")
    }
}
