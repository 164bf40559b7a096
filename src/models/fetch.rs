//! Requests, per-identifier results, and run accounting for the fetcher.

use std::collections::BTreeMap;
use std::fmt;
use std::io;
use std::path::PathBuf;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::error::{AppError, Result};
use crate::models::Identifier;

/// Representation requested from the document service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Structured markup (rendered article HTML)
    Html,
    /// Plain-text extract
    Text,
}

impl OutputFormat {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Html => "html",
            Self::Text => "text",
        }
    }

    /// File extension for persisted documents.
    pub fn extension(self) -> &'static str {
        match self {
            Self::Html => "html",
            Self::Text => "txt",
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OutputFormat {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "html" => Ok(Self::Html),
            "text" => Ok(Self::Text),
            other => Err(AppError::validation(format!(
                "output format must be \"html\" or \"text\", got \"{other}\""
            ))),
        }
    }
}

/// Contact details the document service requires on every request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientIdentity {
    project_name: String,
    email: String,
}

impl ClientIdentity {
    pub fn new(project_name: impl Into<String>, email: impl Into<String>) -> Result<Self> {
        let project_name = project_name.into().trim().to_string();
        let email = email.into().trim().to_string();
        if project_name.is_empty() {
            return Err(AppError::validation("project name is required"));
        }
        if !email.contains('@') {
            return Err(AppError::validation(format!(
                "contact email '{email}' is not an email address"
            )));
        }
        Ok(Self {
            project_name,
            email,
        })
    }

    /// User-Agent value in the `project (contact)` form.
    pub fn user_agent(&self) -> String {
        format!("{} ({})", self.project_name, self.email)
    }
}

/// One outbound document request.
#[derive(Debug, Clone, Copy)]
pub struct FetchRequest<'a> {
    pub identifier: &'a Identifier,
    pub language: &'a str,
    pub format: OutputFormat,
}

/// Why the document service did not produce a document.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FetchError {
    #[error("document not found")]
    NotFound,

    #[error("rate limited by the document service")]
    RateLimited { retry_after_secs: Option<u64> },

    #[error("rejected with HTTP status {status}")]
    Rejected { status: u16 },

    #[error("transport failure: {message}")]
    Transport { message: String },

    #[error("malformed response: {message}")]
    MalformedResponse { message: String },
}

impl FetchError {
    pub fn transport(message: impl fmt::Display) -> Self {
        Self::Transport {
            message: message.to_string(),
        }
    }

    pub fn malformed(message: impl fmt::Display) -> Self {
        Self::MalformedResponse {
            message: message.to_string(),
        }
    }

    /// Stable label used when grouping failures.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::NotFound => "not_found",
            Self::RateLimited { .. } => "rate_limited",
            Self::Rejected { .. } => "rejected",
            Self::Transport { .. } => "transport",
            Self::MalformedResponse { .. } => "malformed_response",
        }
    }
}

/// Stage at which an identifier failed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "stage", rename_all = "snake_case")]
pub enum FailureCause {
    Fetch { error: FetchError },
    Persist { message: String },
}

impl FailureCause {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Fetch { error } => error.kind(),
            Self::Persist { .. } => "persistence",
        }
    }
}

impl fmt::Display for FailureCause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Fetch { error } => write!(f, "{error}"),
            Self::Persist { message } => write!(f, "could not write document: {message}"),
        }
    }
}

/// A failed identifier and its cause.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Failure {
    pub identifier: Identifier,
    pub cause: FailureCause,
}

impl Failure {
    pub fn fetch(identifier: Identifier, error: FetchError) -> Self {
        Self {
            identifier,
            cause: FailureCause::Fetch { error },
        }
    }

    pub fn persist(identifier: Identifier, error: &io::Error) -> Self {
        Self {
            identifier,
            cause: FailureCause::Persist {
                message: error.to_string(),
            },
        }
    }
}

/// A document that reached disk. The body itself is not retained.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SavedDocument {
    pub identifier: Identifier,
    pub path: PathBuf,
    pub bytes: usize,
}

/// Result of attempting one identifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Attempt {
    Saved(SavedDocument),
    Failed(Failure),
}

/// Storage failure that ended a run before every identifier was attempted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RunAbort {
    pub location: PathBuf,
    pub message: String,
    #[serde(skip)]
    pub kind: io::ErrorKind,
}

impl RunAbort {
    pub fn new(location: impl Into<PathBuf>, error: &io::Error) -> Self {
        Self {
            location: location.into(),
            message: error.to_string(),
            kind: error.kind(),
        }
    }

    /// The error a run stopped this way ends with.
    pub fn to_error(&self) -> AppError {
        AppError::persistence(&self.location, io::Error::new(self.kind, self.message.clone()))
    }
}

/// Accounting for one fetch run.
#[derive(Debug, Clone, Serialize)]
pub struct FetchOutcome {
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    /// Identifiers selected for the run after applying the cap
    pub selected: usize,
    pub attempted: usize,
    pub saved: Vec<SavedDocument>,
    pub failures: Vec<Failure>,
    /// Run stopped early because of an interrupt
    pub cancelled: bool,
    /// Run stopped early because documents could no longer be written
    pub aborted: Option<RunAbort>,
}

impl FetchOutcome {
    pub fn new(selected: usize) -> Self {
        let now = Utc::now();
        Self {
            started_at: now,
            finished_at: now,
            selected,
            attempted: 0,
            saved: Vec::new(),
            failures: Vec::new(),
            cancelled: false,
            aborted: None,
        }
    }

    pub fn record(&mut self, attempt: Attempt) {
        self.attempted += 1;
        match attempt {
            Attempt::Saved(doc) => self.saved.push(doc),
            Attempt::Failed(failure) => self.failures.push(failure),
        }
    }

    pub fn finish(&mut self) {
        self.finished_at = Utc::now();
    }

    pub fn succeeded(&self) -> usize {
        self.saved.len()
    }

    pub fn failed(&self) -> usize {
        self.failures.len()
    }

    /// Failure counts keyed by [`FailureCause::kind`].
    pub fn failure_counts(&self) -> BTreeMap<&'static str, usize> {
        let mut counts = BTreeMap::new();
        for failure in &self.failures {
            *counts.entry(failure.cause.kind()).or_insert(0) += 1;
        }
        counts
    }

    pub fn elapsed_secs(&self) -> f64 {
        (self.finished_at - self.started_at).num_milliseconds() as f64 / 1000.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn output_format_parses_case_insensitively() {
        assert_eq!("HTML".parse::<OutputFormat>().unwrap(), OutputFormat::Html);
        assert_eq!("text".parse::<OutputFormat>().unwrap(), OutputFormat::Text);
        assert!("pdf".parse::<OutputFormat>().is_err());
    }

    #[test]
    fn output_format_extensions() {
        assert_eq!(OutputFormat::Html.extension(), "html");
        assert_eq!(OutputFormat::Text.extension(), "txt");
    }

    #[test]
    fn identity_builds_user_agent() {
        let identity = ClientIdentity::new(" CityCorpus ", "me@example.org").unwrap();
        assert_eq!(identity.user_agent(), "CityCorpus (me@example.org)");
    }

    #[test]
    fn identity_requires_both_fields() {
        assert!(ClientIdentity::new("", "me@example.org").is_err());
        assert!(ClientIdentity::new("CityCorpus", "nobody").is_err());
    }

    #[test]
    fn outcome_counts_by_kind() {
        let mut outcome = FetchOutcome::new(4);
        outcome.record(Attempt::Saved(SavedDocument {
            identifier: "Paris".into(),
            path: PathBuf::from("Paris.txt"),
            bytes: 12,
        }));
        outcome.record(Attempt::Failed(Failure::fetch(
            "Atlantis".into(),
            FetchError::NotFound,
        )));
        outcome.record(Attempt::Failed(Failure::fetch(
            "Troy".into(),
            FetchError::NotFound,
        )));
        outcome.record(Attempt::Failed(Failure::fetch(
            "Rome".into(),
            FetchError::RateLimited {
                retry_after_secs: Some(3),
            },
        )));

        assert_eq!(outcome.attempted, 4);
        assert_eq!(outcome.succeeded(), 1);
        assert_eq!(outcome.failed(), 3);
        let counts = outcome.failure_counts();
        assert_eq!(counts["not_found"], 2);
        assert_eq!(counts["rate_limited"], 1);
    }

    #[test]
    fn failure_serializes_with_stage_and_kind() {
        let failure = Failure::fetch("Atlantis".into(), FetchError::NotFound);
        let json = serde_json::to_value(&failure).unwrap();
        assert_eq!(json["identifier"], "Atlantis");
        assert_eq!(json["cause"]["stage"], "fetch");
        assert_eq!(json["cause"]["error"]["kind"], "not_found");
    }
}
