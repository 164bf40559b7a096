// src/models/mod.rs

//! Domain models for wikifetch.
//!
//! This module contains all data structures used throughout the application,
//! organized by their primary purpose.

mod config;
mod fetch;
mod identifier;

// Re-export all public types
pub use config::{
    Config, DocumentsConfig, FetcherConfig, HttpConfig, KnowledgeBaseConfig, PathsConfig,
    validate_rate,
};
pub use fetch::{
    Attempt, ClientIdentity, Failure, FailureCause, FetchError, FetchOutcome, FetchRequest,
    OutputFormat, RunAbort, SavedDocument,
};
pub use identifier::{Identifier, IdentifierList};
