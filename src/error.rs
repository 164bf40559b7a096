// src/error.rs

//! Unified error handling for wikifetch.
//!
//! [`AppError`] covers setup-level failures that abort a run. Failures of a
//! single identifier are not errors of the run; they are recorded as
//! [`crate::models::Failure`] values instead.

use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

/// Result type alias for wikifetch operations.
pub type Result<T> = std::result::Result<T, AppError>;

/// Unified application error type.
#[derive(Error, Debug)]
pub enum AppError {
    /// I/O operation failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// HTTP request failed
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON serialization/deserialization failed
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// TOML parsing failed
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    /// URL parsing failed
    #[error("URL parse error: {0}")]
    Url(#[from] url::ParseError),

    /// Identifier list could not be read
    #[error("Cannot read identifier list {path:?}: {source}")]
    ListFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Data validation error
    #[error("Validation error: {0}")]
    Validation(String),

    /// Knowledge-base query failed
    #[error("Query failed for language '{language}': {message}")]
    Query { language: String, message: String },

    /// Output directory is unusable; continuing would fail for every identifier
    #[error("Persistence failed at {path:?}: {source}")]
    Persistence {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl AppError {
    /// Create a validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Create a knowledge-base query error.
    pub fn query(language: impl Into<String>, message: impl fmt::Display) -> Self {
        Self::Query {
            language: language.into(),
            message: message.to_string(),
        }
    }

    /// Create a systemic persistence error.
    pub fn persistence(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Persistence {
            path: path.into(),
            source,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn query_error_names_language() {
        let err = AppError::query("fr", "HTTP 500");
        assert_eq!(
            err.to_string(),
            "Query failed for language 'fr': HTTP 500"
        );
    }

    #[test]
    fn io_errors_convert() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        let err: AppError = io.into();
        assert!(matches!(err, AppError::Io(_)));
    }
}
