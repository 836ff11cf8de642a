use crate::crawler::{parse_page, FetchedPage};
use crate::lemma::Lemmatizer;
use crate::storage::{
    lock_storage, PageRecord, SharedStorage, SqliteStorage, Storage, StorageError, StorageResult,
};
use dashmap::DashMap;
use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

/// Lemma counts of one page
pub type PageLemmas = (i64, HashMap<String, u32>);

/// A page row written by [`IndexBuilder::store_pages`]
#[derive(Debug, Clone)]
pub struct StoredPage {
    /// The page as stored
    pub record: PageRecord,

    /// Whether the page must be lemmatized and merged
    pub reindex: bool,

    /// Site that owns postings of the overwritten healthy version, if any
    pub previous_site: Option<i64>,
}

/// Returns true if a page at this path has never been indexed
///
/// A page is new when no row exists yet, or when the previous fetch ended
/// with an HTTP error and so was never lemmatized.
pub fn is_new_page(previous: Option<&PageRecord>) -> bool {
    previous.map_or(true, PageRecord::is_error)
}

/// Writes pages, lemmas and postings
///
/// Frequency updates of one site are serialized by a per-site lock held for
/// the whole read-increment-write sequence.
pub struct IndexBuilder {
    storage: SharedStorage,
    site_locks: DashMap<i64, Arc<Mutex<()>>>,
}

impl IndexBuilder {
    /// Creates a builder writing to the given storage
    pub fn new(storage: SharedStorage) -> Self {
        Self {
            storage,
            site_locks: DashMap::new(),
        }
    }

    fn site_lock(&self, site_id: i64) -> Arc<Mutex<()>> {
        self.site_locks.entry(site_id).or_default().clone()
    }

    /// Forgets the merge lock of a site that has settled or been deleted
    pub fn release_site(&self, site_id: i64) {
        self.site_locks.remove(&site_id);
    }

    /// Number of sites currently holding a merge lock entry
    pub fn locked_sites(&self) -> usize {
        self.site_locks.len()
    }

    /// Runs `f` inside one storage transaction
    fn in_batch<T>(
        &self,
        f: impl FnOnce(&mut SqliteStorage) -> StorageResult<T>,
    ) -> StorageResult<T> {
        let mut storage = lock_storage(&self.storage)?;
        storage.begin_batch()?;

        match f(&mut *storage) {
            Ok(value) => {
                storage.commit_batch()?;
                Ok(value)
            }
            Err(e) => {
                if let Err(rollback) = storage.rollback_batch() {
                    tracing::error!("Failed to roll back batch: {}", rollback);
                }
                Err(e)
            }
        }
    }

    /// Upserts fetched pages
    ///
    /// An existing path is overwritten when it is new per [`is_new_page`],
    /// or always when `overwrite` is set. Other existing pages are left
    /// untouched and not returned.
    ///
    /// # Arguments
    ///
    /// * `site_id` - Owner of the pages
    /// * `pages` - Fetched pages
    /// * `overwrite` - Overwrite healthy pages too
    ///
    /// # Returns
    ///
    /// The written pages, with the ones to lemmatize flagged
    pub fn store_pages(
        &self,
        site_id: i64,
        pages: &[FetchedPage],
        overwrite: bool,
    ) -> StorageResult<Vec<StoredPage>> {
        self.in_batch(|storage| {
            let mut stored = Vec::with_capacity(pages.len());

            for page in pages {
                let previous = storage.find_page_by_path(&page.url)?;
                let fresh = is_new_page(previous.as_ref());

                let (id, previous_site) = match previous {
                    None => (
                        storage.insert_page(site_id, &page.url, page.status, &page.html)?,
                        None,
                    ),
                    Some(prev) if fresh || overwrite => {
                        storage.update_page(prev.id, site_id, page.status, &page.html)?;
                        let previous_site = (!prev.is_error()).then_some(prev.site_id);
                        (prev.id, previous_site)
                    }
                    Some(_) => {
                        tracing::debug!("Page already indexed: {}", page.url);
                        continue;
                    }
                };

                stored.push(StoredPage {
                    record: PageRecord {
                        id,
                        site_id,
                        path: page.url.clone(),
                        code: page.status,
                        content: page.html.clone(),
                    },
                    reindex: page.is_success(),
                    previous_site,
                });
            }

            Ok(stored)
        })
    }

    /// Merges per-page lemma counts into the site's lemmas and postings
    ///
    /// A lemma seen for the first time gets frequency 1. A known lemma is
    /// incremented only when the page has no posting for it yet, so
    /// re-indexing a page never inflates its coverage. Postings take the
    /// new occurrence count as rank.
    pub fn merge(&self, site_id: i64, pages: &[PageLemmas]) -> StorageResult<()> {
        if pages.iter().all(|(_, counts)| counts.is_empty()) {
            return Ok(());
        }

        let lock = self.site_lock(site_id);
        let _guard = lock.lock().map_err(|_| StorageError::LockPoisoned)?;

        self.in_batch(|storage| {
            // lemma -> (id, frequency, changed)
            let mut cache: HashMap<&str, (i64, u32, bool)> = HashMap::new();

            for (page_id, counts) in pages {
                for (lemma, &count) in counts {
                    let entry = match cache.entry(lemma.as_str()) {
                        Entry::Occupied(entry) => entry.into_mut(),
                        Entry::Vacant(slot) => {
                            let loaded = match storage.find_lemma(site_id, lemma)? {
                                Some(record) => (record.id, record.frequency, false),
                                None => (storage.insert_lemma(site_id, lemma, 0)?, 0, true),
                            };
                            slot.insert(loaded)
                        }
                    };

                    if storage.find_posting(entry.0, *page_id)?.is_none() {
                        entry.1 += 1;
                        entry.2 = true;
                    }
                    storage.save_posting(entry.0, *page_id, count)?;
                }
            }

            for (lemma_id, frequency, changed) in cache.into_values() {
                if changed {
                    storage.update_lemma_frequency(lemma_id, frequency)?;
                }
            }

            Ok(())
        })
    }

    /// Removes a page from the index
    ///
    /// Every lemma on the page loses one unit of frequency; lemmas that
    /// reach zero are deleted. The page row itself is kept.
    pub fn remove_page(&self, site_id: i64, page_id: i64) -> StorageResult<()> {
        let lock = self.site_lock(site_id);
        let _guard = lock.lock().map_err(|_| StorageError::LockPoisoned)?;

        self.in_batch(|storage| {
            for posting in storage.postings_for_page(page_id)? {
                storage.delete_posting(posting.id)?;

                let lemma = storage.get_lemma(posting.lemma_id)?;
                if lemma.frequency <= 1 {
                    storage.delete_lemma(lemma.id)?;
                } else {
                    storage.update_lemma_frequency(lemma.id, lemma.frequency - 1)?;
                }
            }
            Ok(())
        })
    }

    /// Stores, lemmatizes and merges a batch of fetched pages
    ///
    /// Blocking; run it on a blocking thread from async code.
    ///
    /// # Returns
    ///
    /// The number of pages merged into the index
    pub fn index_pages(
        &self,
        site_id: i64,
        pages: &[FetchedPage],
        overwrite: bool,
        lemmatizer: &Lemmatizer,
    ) -> StorageResult<usize> {
        let stored = self.store_pages(site_id, pages, overwrite)?;

        for page in &stored {
            if let Some(previous_site) = page.previous_site {
                self.remove_page(previous_site, page.record.id)?;
            }
        }

        let lemmas: Vec<PageLemmas> = stored
            .iter()
            .filter(|page| page.reindex)
            .map(|page| {
                let text = parse_page(&page.record.content).text;
                (page.record.id, lemmatizer.collect_lemmas(&text))
            })
            .collect();

        self.merge(site_id, &lemmas)?;

        tracing::debug!(
            "Site {}: stored {} pages, indexed {}",
            site_id,
            stored.len(),
            lemmas.len()
        );

        Ok(lemmas.len())
    }
}
