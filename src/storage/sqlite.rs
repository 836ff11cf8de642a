//! SQLite storage implementation
//!
//! This module provides a SQLite-based implementation of the Storage trait.

use crate::state::SiteStatus;
use crate::storage::schema::initialize_schema;
use crate::storage::traits::{Storage, StorageError, StorageResult};
use crate::storage::{LemmaRecord, PageRecord, PostingRecord, SiteRecord};
use crate::SeekError;
use chrono::Utc;
use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ValueRef};
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::path::Path;

const SITE_COLUMNS: &str = "id, url, name, status, status_time, last_error";
const PAGE_COLUMNS: &str = "id, site_id, path, code, content";
const LEMMA_COLUMNS: &str = "id, site_id, lemma, frequency";
const POSTING_COLUMNS: &str = "id, lemma_id, page_id, rank";

/// SQLite storage backend
pub struct SqliteStorage {
    conn: Connection,
}

impl SqliteStorage {
    /// Creates a new SqliteStorage instance
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the SQLite database file
    ///
    /// # Returns
    ///
    /// * `Ok(SqliteStorage)` - Successfully opened/created database
    /// * `Err(SeekError)` - Failed to open database
    pub fn new(path: &Path) -> Result<Self, SeekError> {
        let conn = Connection::open(path).map_err(StorageError::from)?;

        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA foreign_keys = ON;
            PRAGMA temp_store = MEMORY;
        ",
        )
        .map_err(StorageError::from)?;

        initialize_schema(&conn).map_err(StorageError::from)?;

        Ok(Self { conn })
    }

    /// Creates an in-memory database
    pub fn new_in_memory() -> Result<Self, SeekError> {
        let conn = Connection::open_in_memory().map_err(StorageError::from)?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")
            .map_err(StorageError::from)?;
        initialize_schema(&conn).map_err(StorageError::from)?;
        Ok(Self { conn })
    }
}

impl FromSql for SiteStatus {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        let text = value.as_str()?;
        SiteStatus::from_db_string(text).ok_or_else(|| {
            FromSqlError::Other(Box::new(StorageError::InvalidValue(format!(
                "unknown site status '{}'",
                text
            ))))
        })
    }
}

/// Rejects status changes the site status machine does not allow
fn check_transition(from: SiteStatus, to: SiteStatus) -> StorageResult<()> {
    if from.can_transition_to(to) {
        Ok(())
    } else {
        Err(StorageError::InvalidValue(format!(
            "site status cannot move from {} to {}",
            from, to
        )))
    }
}

fn site_from_row(row: &Row<'_>) -> rusqlite::Result<SiteRecord> {
    Ok(SiteRecord {
        id: row.get(0)?,
        url: row.get(1)?,
        name: row.get(2)?,
        status: row.get(3)?,
        status_time: row.get(4)?,
        last_error: row.get(5)?,
    })
}

fn page_from_row(row: &Row<'_>) -> rusqlite::Result<PageRecord> {
    Ok(PageRecord {
        id: row.get(0)?,
        site_id: row.get(1)?,
        path: row.get(2)?,
        code: row.get(3)?,
        content: row.get(4)?,
    })
}

fn lemma_from_row(row: &Row<'_>) -> rusqlite::Result<LemmaRecord> {
    Ok(LemmaRecord {
        id: row.get(0)?,
        site_id: row.get(1)?,
        lemma: row.get(2)?,
        frequency: row.get(3)?,
    })
}

fn posting_from_row(row: &Row<'_>) -> rusqlite::Result<PostingRecord> {
    Ok(PostingRecord {
        id: row.get(0)?,
        lemma_id: row.get(1)?,
        page_id: row.get(2)?,
        rank: row.get(3)?,
    })
}

impl Storage for SqliteStorage {
    // ===== Sites =====

    fn insert_site(&mut self, url: &str, name: &str, status: SiteStatus) -> StorageResult<i64> {
        let now = Utc::now().to_rfc3339();
        self.conn.execute(
            "INSERT INTO sites (url, name, status, status_time) VALUES (?1, ?2, ?3, ?4)",
            params![url, name, status.to_db_string(), now],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    fn get_site(&self, site_id: i64) -> StorageResult<SiteRecord> {
        self.conn
            .query_row(
                &format!("SELECT {} FROM sites WHERE id = ?1", SITE_COLUMNS),
                params![site_id],
                site_from_row,
            )
            .optional()?
            .ok_or(StorageError::SiteNotFound(site_id))
    }

    fn find_site_by_url(&self, url: &str) -> StorageResult<Option<SiteRecord>> {
        let site = self
            .conn
            .query_row(
                &format!("SELECT {} FROM sites WHERE url = ?1", SITE_COLUMNS),
                params![url],
                site_from_row,
            )
            .optional()?;
        Ok(site)
    }

    fn list_sites(&self) -> StorageResult<Vec<SiteRecord>> {
        let mut stmt = self
            .conn
            .prepare(&format!("SELECT {} FROM sites ORDER BY url", SITE_COLUMNS))?;
        let sites = stmt
            .query_map([], site_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(sites)
    }

    fn transition_site(
        &mut self,
        site_id: i64,
        from: SiteStatus,
        to: SiteStatus,
        last_error: Option<&str>,
    ) -> StorageResult<bool> {
        check_transition(from, to)?;

        let now = Utc::now().to_rfc3339();
        let changed = self.conn.execute(
            "UPDATE sites SET status = ?1, status_time = ?2, last_error = ?3
             WHERE id = ?4 AND status = ?5",
            params![
                to.to_db_string(),
                now,
                last_error,
                site_id,
                from.to_db_string()
            ],
        )?;
        Ok(changed > 0)
    }

    fn fail_sites_in_status(&mut self, from: SiteStatus, error: &str) -> StorageResult<usize> {
        check_transition(from, SiteStatus::Failed)?;

        let now = Utc::now().to_rfc3339();
        let changed = self.conn.execute(
            "UPDATE sites SET status = ?1, status_time = ?2, last_error = ?3 WHERE status = ?4",
            params![
                SiteStatus::Failed.to_db_string(),
                now,
                error,
                from.to_db_string()
            ],
        )?;
        Ok(changed)
    }

    fn touch_site(&mut self, site_id: i64) -> StorageResult<()> {
        let now = Utc::now().to_rfc3339();
        self.conn.execute(
            "UPDATE sites SET status_time = ?1 WHERE id = ?2",
            params![now, site_id],
        )?;
        Ok(())
    }

    fn delete_site(&mut self, site_id: i64) -> StorageResult<()> {
        self.conn
            .execute("DELETE FROM sites WHERE id = ?1", params![site_id])?;
        Ok(())
    }

    // ===== Pages =====

    fn find_page_by_path(&self, path: &str) -> StorageResult<Option<PageRecord>> {
        let page = self
            .conn
            .query_row(
                &format!("SELECT {} FROM pages WHERE path = ?1", PAGE_COLUMNS),
                params![path],
                page_from_row,
            )
            .optional()?;
        Ok(page)
    }

    fn get_page(&self, page_id: i64) -> StorageResult<PageRecord> {
        self.conn
            .query_row(
                &format!("SELECT {} FROM pages WHERE id = ?1", PAGE_COLUMNS),
                params![page_id],
                page_from_row,
            )
            .optional()?
            .ok_or_else(|| StorageError::PageNotFound(format!("Page ID {}", page_id)))
    }

    fn insert_page(
        &mut self,
        site_id: i64,
        path: &str,
        code: u16,
        content: &str,
    ) -> StorageResult<i64> {
        self.conn.execute(
            "INSERT INTO pages (site_id, path, code, content) VALUES (?1, ?2, ?3, ?4)",
            params![site_id, path, code, content],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    fn update_page(
        &mut self,
        page_id: i64,
        site_id: i64,
        code: u16,
        content: &str,
    ) -> StorageResult<()> {
        let changed = self.conn.execute(
            "UPDATE pages SET site_id = ?1, code = ?2, content = ?3 WHERE id = ?4",
            params![site_id, code, content, page_id],
        )?;
        if changed == 0 {
            return Err(StorageError::PageNotFound(format!("Page ID {}", page_id)));
        }
        Ok(())
    }

    fn count_pages(&self, site_id: i64) -> StorageResult<u64> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM pages WHERE site_id = ?1",
            params![site_id],
            |row| row.get(0),
        )?;
        Ok(count as u64)
    }

    // ===== Lemmas =====

    fn find_lemma(&self, site_id: i64, lemma: &str) -> StorageResult<Option<LemmaRecord>> {
        let record = self
            .conn
            .query_row(
                &format!(
                    "SELECT {} FROM lemmas WHERE site_id = ?1 AND lemma = ?2",
                    LEMMA_COLUMNS
                ),
                params![site_id, lemma],
                lemma_from_row,
            )
            .optional()?;
        Ok(record)
    }

    fn get_lemma(&self, lemma_id: i64) -> StorageResult<LemmaRecord> {
        self.conn
            .query_row(
                &format!("SELECT {} FROM lemmas WHERE id = ?1", LEMMA_COLUMNS),
                params![lemma_id],
                lemma_from_row,
            )
            .optional()?
            .ok_or(StorageError::LemmaNotFound(lemma_id))
    }

    fn insert_lemma(&mut self, site_id: i64, lemma: &str, frequency: u32) -> StorageResult<i64> {
        self.conn.execute(
            "INSERT INTO lemmas (site_id, lemma, frequency) VALUES (?1, ?2, ?3)",
            params![site_id, lemma, frequency],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    fn update_lemma_frequency(&mut self, lemma_id: i64, frequency: u32) -> StorageResult<()> {
        let changed = self.conn.execute(
            "UPDATE lemmas SET frequency = ?1 WHERE id = ?2",
            params![frequency, lemma_id],
        )?;
        if changed == 0 {
            return Err(StorageError::LemmaNotFound(lemma_id));
        }
        Ok(())
    }

    fn delete_lemma(&mut self, lemma_id: i64) -> StorageResult<()> {
        self.conn
            .execute("DELETE FROM lemmas WHERE id = ?1", params![lemma_id])?;
        Ok(())
    }

    fn count_lemmas(&self, site_id: i64) -> StorageResult<u64> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM lemmas WHERE site_id = ?1",
            params![site_id],
            |row| row.get(0),
        )?;
        Ok(count as u64)
    }

    // ===== Postings =====

    fn find_posting(&self, lemma_id: i64, page_id: i64) -> StorageResult<Option<PostingRecord>> {
        let posting = self
            .conn
            .query_row(
                &format!(
                    "SELECT {} FROM postings WHERE lemma_id = ?1 AND page_id = ?2",
                    POSTING_COLUMNS
                ),
                params![lemma_id, page_id],
                posting_from_row,
            )
            .optional()?;
        Ok(posting)
    }

    fn save_posting(&mut self, lemma_id: i64, page_id: i64, rank: u32) -> StorageResult<()> {
        self.conn.execute(
            "INSERT INTO postings (lemma_id, page_id, rank) VALUES (?1, ?2, ?3)
             ON CONFLICT(lemma_id, page_id) DO UPDATE SET rank = excluded.rank",
            params![lemma_id, page_id, rank],
        )?;
        Ok(())
    }

    fn postings_for_lemma(&self, lemma_id: i64) -> StorageResult<Vec<PostingRecord>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {} FROM postings WHERE lemma_id = ?1 ORDER BY page_id",
            POSTING_COLUMNS
        ))?;
        let postings = stmt
            .query_map(params![lemma_id], posting_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(postings)
    }

    fn postings_for_page(&self, page_id: i64) -> StorageResult<Vec<PostingRecord>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {} FROM postings WHERE page_id = ?1 ORDER BY lemma_id",
            POSTING_COLUMNS
        ))?;
        let postings = stmt
            .query_map(params![page_id], posting_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(postings)
    }

    fn delete_posting(&mut self, posting_id: i64) -> StorageResult<()> {
        self.conn
            .execute("DELETE FROM postings WHERE id = ?1", params![posting_id])?;
        Ok(())
    }

    // ===== Batches =====

    fn begin_batch(&mut self) -> StorageResult<()> {
        self.conn.execute_batch("BEGIN IMMEDIATE")?;
        Ok(())
    }

    fn commit_batch(&mut self) -> StorageResult<()> {
        self.conn.execute_batch("COMMIT")?;
        Ok(())
    }

    fn rollback_batch(&mut self) -> StorageResult<()> {
        self.conn.execute_batch("ROLLBACK")?;
        Ok(())
    }

    fn delete_all(&mut self) -> StorageResult<()> {
        self.conn.execute_batch(
            "
            DELETE FROM postings;
            DELETE FROM lemmas;
            DELETE FROM pages;
            DELETE FROM sites;
        ",
        )?;
        Ok(())
    }
}
