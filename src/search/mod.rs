//! Search over the lemma index
//!
//! This module handles:
//! - Lemmatizing queries and filtering lemmas common to most of a site
//! - Intersecting postings and scoring pages per site
//! - Titles and highlighted snippets of the returned pages

mod engine;
mod snippet;
mod title;

pub use engine::SearchEngine;
pub use snippet::build_snippet;
pub use title::{capitalize, page_title};

use crate::storage::StorageError;
use serde::Serialize;
use thiserror::Error;

/// Errors returned to the caller of a search
#[derive(Debug, Error)]
pub enum SearchError {
    #[error("Empty search query")]
    EmptyQuery,

    #[error("Site is not indexed: {0}")]
    UnknownSite(String),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
}

/// A search request
#[derive(Debug, Clone, Default)]
pub struct SearchQuery {
    /// Free-text query
    pub query: String,

    /// Root URL of the only site to search
    pub site: Option<String>,

    /// Number of results to skip
    pub offset: usize,

    /// Maximum number of results; the configured default when None
    pub limit: Option<usize>,
}

/// One ranked page
#[derive(Debug, Clone, Serialize)]
pub struct SearchItem {
    pub site_url: String,
    pub site_name: String,
    /// Page URL relative to the site root
    pub uri: String,
    pub title: String,
    /// Visible text around the hits, hits wrapped in `<b>`
    pub snippet: String,
    /// Relevance relative to the best page of the same site
    pub relevance: f64,
}

/// A page of ranked results
#[derive(Debug, Clone, Serialize)]
pub struct SearchResponse {
    pub result: bool,
    /// Number of matches before paging
    pub count: usize,
    pub items: Vec<SearchItem>,
}

impl SearchResponse {
    /// A successful response without matches
    pub fn empty() -> Self {
        Self {
            result: true,
            count: 0,
            items: Vec::new(),
        }
    }
}
