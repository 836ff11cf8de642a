//! Storage module for persisting crawl data
//!
//! This module handles all database operations, including:
//! - SQLite database initialization and schema management
//! - Site status persistence
//! - Page rows keyed by query-stripped URL
//! - Site-scoped lemmas and their per-page postings

mod schema;
mod sqlite;
mod traits;

pub use sqlite::SqliteStorage;
pub use traits::{Storage, StorageError, StorageResult};

use crate::state::SiteStatus;
use crate::SeekError;
use serde::Serialize;

use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};

/// Storage handle shared by crawl workers and the search engine
pub type SharedStorage = Arc<Mutex<SqliteStorage>>;

/// Initializes or opens a storage database
///
/// # Arguments
///
/// * `path` - Path to the SQLite database file
///
/// # Returns
///
/// * `Ok(SharedStorage)` - Successfully initialized storage
/// * `Err(SeekError)` - Failed to initialize storage
pub fn open_storage(path: &Path) -> Result<SharedStorage, SeekError> {
    Ok(Arc::new(Mutex::new(SqliteStorage::new(path)?)))
}

/// Locks shared storage, mapping a poisoned lock to a storage error
pub fn lock_storage(storage: &SharedStorage) -> StorageResult<MutexGuard<'_, SqliteStorage>> {
    storage.lock().map_err(|_| StorageError::LockPoisoned)
}

/// Runs a storage operation on the blocking thread pool
///
/// Async code reaches storage through this helper, so the storage lock is
/// never waited on by a runtime worker thread.
pub async fn with_storage<T, F>(storage: &SharedStorage, op: F) -> Result<T, SeekError>
where
    F: FnOnce(&mut SqliteStorage) -> StorageResult<T> + Send + 'static,
    T: Send + 'static,
{
    let storage = storage.clone();
    let value = tokio::task::spawn_blocking(move || {
        let mut guard = lock_storage(&storage)?;
        op(&mut *guard)
    })
    .await??;
    Ok(value)
}

/// Represents a site in the database
#[derive(Debug, Clone, Serialize)]
pub struct SiteRecord {
    pub id: i64,
    pub url: String,
    pub name: String,
    pub status: SiteStatus,
    pub status_time: String,
    pub last_error: Option<String>,
}

/// Represents a page in the database
#[derive(Debug, Clone)]
pub struct PageRecord {
    pub id: i64,
    pub site_id: i64,
    pub path: String,
    pub code: u16,
    pub content: String,
}

impl PageRecord {
    /// Returns true if the page was fetched with an HTTP error status
    pub fn is_error(&self) -> bool {
        self.code >= 400
    }
}

/// Represents a site-scoped lemma
#[derive(Debug, Clone)]
pub struct LemmaRecord {
    pub id: i64,
    pub site_id: i64,
    pub lemma: String,
    pub frequency: u32,
}

/// Represents the rank of a lemma on a page
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PostingRecord {
    pub id: i64,
    pub lemma_id: i64,
    pub page_id: i64,
    pub rank: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_error_status() {
        let mut page = PageRecord {
            id: 1,
            site_id: 1,
            path: "https://example.com/".to_string(),
            code: 200,
            content: String::new(),
        };
        assert!(!page.is_error());

        page.code = 404;
        assert!(page.is_error());

        page.code = 399;
        assert!(!page.is_error());
    }

    #[tokio::test]
    async fn test_with_storage_runs_on_blocking_pool() {
        let storage: SharedStorage = Arc::new(Mutex::new(SqliteStorage::new_in_memory().unwrap()));

        let id = with_storage(&storage, |s| {
            s.insert_site("https://example.com", "Example", SiteStatus::Indexing)
        })
        .await
        .unwrap();

        let site = with_storage(&storage, move |s| s.get_site(id)).await.unwrap();
        assert_eq!(site.url, "https://example.com");

        let missing = with_storage(&storage, |s| s.get_site(999)).await;
        assert!(matches!(
            missing,
            Err(SeekError::Storage(StorageError::SiteNotFound(999)))
        ));
    }

    #[test]
    fn test_lock_storage() {
        let storage: SharedStorage = Arc::new(Mutex::new(SqliteStorage::new_in_memory().unwrap()));
        let guard = lock_storage(&storage).unwrap();
        assert_eq!(guard.list_sites().unwrap().len(), 0);
    }
}
