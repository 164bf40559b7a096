// src/lib.rs

//! wikifetch library
//!
//! Lists city names from Wikidata for a language edition and fetches the
//! matching Wikipedia articles under a request-rate ceiling.

pub mod error;
pub mod models;
pub mod pipeline;
pub mod services;
pub mod storage;
pub mod utils;
