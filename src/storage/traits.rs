//! Storage traits and error types
//!
//! This module defines the narrow, key-indexed interface the crawler, the
//! index builder and the search engine use to reach persisted data.

use crate::state::SiteStatus;
use crate::storage::{LemmaRecord, PageRecord, PostingRecord, SiteRecord};
use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Site not found: {0}")]
    SiteNotFound(i64),

    #[error("Page not found: {0}")]
    PageNotFound(String),

    #[error("Lemma not found: {0}")]
    LemmaNotFound(i64),

    #[error("Storage lock poisoned")]
    LockPoisoned,

    #[error("Invalid stored value: {0}")]
    InvalidValue(String),

    #[error("SQLite error: {0}")]
    Sqlite(rusqlite::Error),
}

impl From<rusqlite::Error> for StorageError {
    /// Unwraps storage errors raised while converting column values
    fn from(err: rusqlite::Error) -> Self {
        match err {
            rusqlite::Error::FromSqlConversionFailure(idx, ty, inner) => {
                match inner.downcast::<StorageError>() {
                    Ok(storage_err) => *storage_err,
                    Err(inner) => {
                        Self::Sqlite(rusqlite::Error::FromSqlConversionFailure(idx, ty, inner))
                    }
                }
            }
            other => Self::Sqlite(other),
        }
    }
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Trait for storage backend implementations
///
/// Writers batch their statements between `begin_batch` and `commit_batch`;
/// a failed batch is undone with `rollback_batch`.
pub trait Storage {
    // ===== Sites =====

    /// Inserts a site and returns its ID
    fn insert_site(&mut self, url: &str, name: &str, status: SiteStatus) -> StorageResult<i64>;

    /// Gets a site by ID
    fn get_site(&self, site_id: i64) -> StorageResult<SiteRecord>;

    /// Gets a site by its root URL
    fn find_site_by_url(&self, url: &str) -> StorageResult<Option<SiteRecord>>;

    /// Lists all sites ordered by URL
    fn list_sites(&self) -> StorageResult<Vec<SiteRecord>>;

    /// Moves a site from `from` to `to` only if it is still in `from`
    ///
    /// Returns whether the row changed. A move the status machine forbids
    /// is rejected with `StorageError::InvalidValue`.
    fn transition_site(
        &mut self,
        site_id: i64,
        from: SiteStatus,
        to: SiteStatus,
        last_error: Option<&str>,
    ) -> StorageResult<bool>;

    /// Marks every site in `from` as failed with the given error
    ///
    /// Returns the number of sites changed. Fails with
    /// `StorageError::InvalidValue` if `from` may not move to failed.
    fn fail_sites_in_status(&mut self, from: SiteStatus, error: &str) -> StorageResult<usize>;

    /// Refreshes the status time of a site
    fn touch_site(&mut self, site_id: i64) -> StorageResult<()>;

    /// Deletes a site together with its pages, lemmas and postings
    fn delete_site(&mut self, site_id: i64) -> StorageResult<()>;

    // ===== Pages =====

    /// Gets a page by its query-stripped URL
    fn find_page_by_path(&self, path: &str) -> StorageResult<Option<PageRecord>>;

    /// Gets a page by ID
    fn get_page(&self, page_id: i64) -> StorageResult<PageRecord>;

    /// Inserts a page and returns its ID
    fn insert_page(&mut self, site_id: i64, path: &str, code: u16, content: &str)
        -> StorageResult<i64>;

    /// Overwrites the owner, status code and content of a page
    fn update_page(&mut self, page_id: i64, site_id: i64, code: u16, content: &str)
        -> StorageResult<()>;

    /// Counts all pages of a site
    fn count_pages(&self, site_id: i64) -> StorageResult<u64>;

    // ===== Lemmas =====

    /// Gets a lemma by site and text
    fn find_lemma(&self, site_id: i64, lemma: &str) -> StorageResult<Option<LemmaRecord>>;

    /// Gets a lemma by ID
    fn get_lemma(&self, lemma_id: i64) -> StorageResult<LemmaRecord>;

    /// Inserts a lemma and returns its ID
    fn insert_lemma(&mut self, site_id: i64, lemma: &str, frequency: u32) -> StorageResult<i64>;

    /// Sets the page coverage of a lemma
    fn update_lemma_frequency(&mut self, lemma_id: i64, frequency: u32) -> StorageResult<()>;

    /// Deletes a lemma and its postings
    fn delete_lemma(&mut self, lemma_id: i64) -> StorageResult<()>;

    /// Counts lemmas of a site
    fn count_lemmas(&self, site_id: i64) -> StorageResult<u64>;

    // ===== Postings =====

    /// Gets the posting of a lemma on a page
    fn find_posting(&self, lemma_id: i64, page_id: i64) -> StorageResult<Option<PostingRecord>>;

    /// Inserts a posting or replaces the rank of the existing one
    fn save_posting(&mut self, lemma_id: i64, page_id: i64, rank: u32) -> StorageResult<()>;

    /// Gets all postings of a lemma
    fn postings_for_lemma(&self, lemma_id: i64) -> StorageResult<Vec<PostingRecord>>;

    /// Gets all postings on a page
    fn postings_for_page(&self, page_id: i64) -> StorageResult<Vec<PostingRecord>>;

    /// Deletes a posting
    fn delete_posting(&mut self, posting_id: i64) -> StorageResult<()>;

    // ===== Batches =====

    /// Starts a write batch
    fn begin_batch(&mut self) -> StorageResult<()>;

    /// Commits the current write batch
    fn commit_batch(&mut self) -> StorageResult<()>;

    /// Discards the current write batch
    fn rollback_batch(&mut self) -> StorageResult<()>;

    /// Deletes every site, page, lemma and posting
    fn delete_all(&mut self) -> StorageResult<()>;
}
