//! content-lens - hybrid content search client
//!
//! Issues text, image and combined text+image queries against an external
//! semantic search service, consolidates the scored candidates (threshold
//! filtering, weighted fusion, stable ranking, truncation), drives reindex
//! jobs and reads search analytics.

pub mod analytics;
pub mod cli;
pub mod client;
pub mod config;
pub mod error;
pub mod indexing;
pub mod ranking;
pub mod search;

pub use error::{LensError, Result};
