//! Per-run crawl state
//!
//! One session is shared by every batch task of every site crawled in a
//! run. It replaces process-wide singletons for the visited set, the stop
//! flag and the worker pool.

use dashmap::DashSet;
use std::sync::Arc;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tokio_util::sync::CancellationToken;

/// Shared state of one indexing run
#[derive(Debug)]
pub struct CrawlSession {
    visited: DashSet<String>,
    cancel: CancellationToken,
    permits: Arc<Semaphore>,
}

impl CrawlSession {
    /// Creates a session whose pool runs at most `workers` batches at once
    pub fn new(workers: usize) -> Self {
        Self {
            visited: DashSet::new(),
            cancel: CancellationToken::new(),
            permits: Arc::new(Semaphore::new(workers.max(1))),
        }
    }

    /// Claims a URL for fetching
    ///
    /// Returns true for exactly one caller per URL and run.
    pub fn claim(&self, url: &str) -> bool {
        self.visited.insert(url.to_string())
    }

    /// Returns true if the URL was already claimed
    pub fn is_visited(&self, url: &str) -> bool {
        self.visited.contains(url)
    }

    /// Number of claimed URLs
    pub fn visited_count(&self) -> usize {
        self.visited.len()
    }

    /// Forgets every claimed URL
    pub fn clear(&self) {
        self.visited.clear();
    }

    /// Requests every worker of the run to stop
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Token observed by workers
    pub fn token(&self) -> &CancellationToken {
        &self.cancel
    }

    /// Waits for a worker-pool slot
    ///
    /// Returns None if the run was cancelled while waiting.
    pub async fn acquire_worker(&self) -> Option<OwnedSemaphorePermit> {
        tokio::select! {
            _ = self.cancel.cancelled() => None,
            permit = self.permits.clone().acquire_owned() => permit.ok(),
        }
    }
}
