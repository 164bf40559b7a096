//! Pipeline entry points for wikifetch operations.
//!
//! - `run_lister`: Query the knowledge base and save a name list
//! - `run_fetcher`: Fetch documents for every name in a list

pub mod fetch;
pub mod list;

pub use fetch::{FetchSettings, log_summary, run_fetcher, run_fetcher_with};
pub use list::{list_path, run_lister};
