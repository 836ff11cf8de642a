//! Inverted lemma index
//!
//! This module handles:
//! - Upserting fetched pages by their query-stripped URL
//! - Merging per-page lemma counts into site-scoped lemmas and postings
//! - Removing a page's contribution before it is re-indexed

mod builder;

pub use builder::{is_new_page, IndexBuilder, PageLemmas, StoredPage};
