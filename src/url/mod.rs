//! URL handling module for Lemma-Seek
//!
//! This module provides query stripping, `www.` collapsing, and the scope
//! rules deciding which discovered links belong to a site crawl.

mod matcher;
mod normalize;

// Re-export main functions
pub use matcher::{is_valid_link, matches_root, root_for_host};
pub use normalize::{bare_host, clean_url, collapse_www, seed_url, site_root};
