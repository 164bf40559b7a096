//! Service layer for wikifetch.
//!
//! This module contains the business logic for:
//! - Name listing from the knowledge base (`NameLister`)
//! - Document retrieval (`DocumentSource`, `WikipediaClient`)
//! - Request spacing (`RateBudget`)
//! - The batch fetch loop (`RateLimitedFetcher`)

mod documents;
mod fetcher;
mod names;
mod rate_budget;

pub use documents::{
    DocumentSource, WikipediaClient, classify_status, document_url, parse_extract,
};
pub use fetcher::{FetchJob, RateLimitedFetcher};
pub use names::{NameLister, build_query, parse_names};
pub use rate_budget::RateBudget;
