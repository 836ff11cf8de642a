//! Crawler coordinator - indexing run orchestration
//!
//! This module contains the crawl control surface, including:
//! - Starting a run over every configured site
//! - The per-site queue of frontier batches and their fan-out/fan-in
//! - Stopping a run and settling site statuses
//! - Explicit single-page (re)indexing

use crate::config::Config;
use crate::crawler::fetcher::{build_http_client, fetch_page};
use crate::crawler::scheduler::{process_batch, split_batches, CrawlContext, SiteTarget};
use crate::crawler::session::CrawlSession;
use crate::index::IndexBuilder;
use crate::lemma::Lemmatizer;
use crate::state::{SiteStatus, STOPPED_BY_USER};
use crate::storage::{with_storage, SharedStorage, Storage};
use crate::url::{clean_url, root_for_host, seed_url, site_root};
use serde::Serialize;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Instant;
use tokio::task::{JoinHandle, JoinSet};

/// Result of [`IndexingService::start_indexing`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StartOutcome {
    pub already_running: bool,
}

/// Result of [`IndexingService::stop_indexing`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StopOutcome {
    pub was_running: bool,
}

/// Result of [`IndexingService::index_page`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct IndexPageOutcome {
    pub accepted: bool,
}

/// Slot holding the session of the active run
type SessionSlot = Arc<Mutex<Option<Arc<CrawlSession>>>>;

/// Crawl control
///
/// At most one indexing run is active at a time; the `running` flag is
/// flipped with compare-and-set.
pub struct IndexingService {
    ctx: Arc<CrawlContext>,
    running: Arc<AtomicBool>,
    session: SessionSlot,
    supervisor: tokio::sync::Mutex<Option<JoinHandle<()>>>,
}

impl IndexingService {
    /// Creates the service
    ///
    /// # Arguments
    ///
    /// * `config` - Validated configuration
    /// * `storage` - Shared storage handle
    /// * `lemmatizer` - Shared lemmatizer
    ///
    /// # Returns
    ///
    /// * `Ok(IndexingService)` - Ready service
    /// * `Err(SeekError)` - The HTTP client could not be built
    pub fn new(
        config: Config,
        storage: SharedStorage,
        lemmatizer: Arc<Lemmatizer>,
    ) -> crate::Result<Self> {
        let client =
            build_http_client(&config.user_agent, config.crawler.request_timeout_secs)?;

        let ctx = CrawlContext {
            config,
            client,
            builder: IndexBuilder::new(storage.clone()),
            storage,
            lemmatizer,
        };

        Ok(Self {
            ctx: Arc::new(ctx),
            running: Arc::new(AtomicBool::new(false)),
            session: Arc::new(Mutex::new(None)),
            supervisor: tokio::sync::Mutex::new(None),
        })
    }

    /// Returns true while a run is active
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    fn current_session(&self) -> Option<Arc<CrawlSession>> {
        self.session.lock().ok().and_then(|slot| slot.clone())
    }

    /// Starts indexing every configured site
    ///
    /// Previous rows of the configured sites are deleted together with
    /// their pages, lemmas and postings, and fresh INDEXING rows are
    /// inserted. Crawls run in the background.
    pub async fn start_indexing(&self) -> crate::Result<StartOutcome> {
        if self
            .running
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            tracing::info!("Indexing is already running");
            return Ok(StartOutcome {
                already_running: true,
            });
        }

        let session = Arc::new(CrawlSession::new(
            self.ctx.config.crawler.max_concurrent_batches,
        ));
        if let Ok(mut slot) = self.session.lock() {
            *slot = Some(session.clone());
        }

        let sites = match self.reset_sites().await {
            Ok(sites) => sites,
            Err(e) => {
                tracing::error!("Failed to prepare sites: {}", e);
                self.clear_session();
                self.running.store(false, Ordering::SeqCst);
                return Err(e);
            }
        };

        tracing::info!("Starting indexing of {} sites", sites.len());

        let handle = tokio::spawn(supervise(
            self.ctx.clone(),
            session,
            sites,
            self.running.clone(),
            self.session.clone(),
        ));
        *self.supervisor.lock().await = Some(handle);

        Ok(StartOutcome {
            already_running: false,
        })
    }

    fn clear_session(&self) {
        if let Ok(mut slot) = self.session.lock() {
            *slot = None;
        }
    }

    /// Replaces the rows of every configured site with fresh INDEXING rows
    async fn reset_sites(&self) -> crate::Result<Vec<SiteTarget>> {
        let entries = self.ctx.config.sites.clone();
        let ctx = self.ctx.clone();

        with_storage(&self.ctx.storage, move |storage| {
            let mut sites = Vec::with_capacity(entries.len());

            for entry in entries {
                let url = site_root(&entry.url);
                if let Some(existing) = storage.find_site_by_url(&url)? {
                    tracing::debug!("Deleting previous data of {}", url);
                    storage.delete_site(existing.id)?;
                    ctx.builder.release_site(existing.id);
                }

                let id = storage.insert_site(&url, &entry.name, SiteStatus::Indexing)?;
                sites.push(SiteTarget {
                    id,
                    url,
                    name: entry.name,
                });
            }

            Ok(sites)
        })
        .await
    }

    /// Stops the active run
    ///
    /// Workers are cancelled and every INDEXING site is moved to FAILED
    /// right away; fetched pages are still persisted while tasks unwind.
    pub async fn stop_indexing(&self) -> crate::Result<StopOutcome> {
        if !self.is_running() {
            return Ok(StopOutcome { was_running: false });
        }

        if let Some(session) = self.current_session() {
            session.cancel();
        }

        let failed = with_storage(&self.ctx.storage, |storage| {
            storage.fail_sites_in_status(SiteStatus::Indexing, STOPPED_BY_USER)
        })
        .await?;
        tracing::info!("Indexing stopped, {} sites marked as failed", failed);

        Ok(StopOutcome { was_running: true })
    }

    /// Waits until the active run, if any, has unwound
    ///
    /// Dropping the returned future before it completes leaves the run
    /// awaitable by a later call.
    pub async fn wait_for_completion(&self) -> crate::Result<()> {
        let mut slot = self.supervisor.lock().await;
        if let Some(handle) = slot.as_mut() {
            let joined = handle.await;
            *slot = None;
            joined?;
        }
        Ok(())
    }

    /// Fetches and (re)indexes a single page
    ///
    /// The URL is accepted only if its host, ignoring `www.`, matches the
    /// host of a configured site. The page is overwritten even if it was
    /// indexed before; no links are followed. A site row is created if the
    /// site has never been indexed; it ends FAILED if that first fetch fails.
    pub async fn index_page(&self, url: &str) -> crate::Result<IndexPageOutcome> {
        let url = clean_url(url.trim());
        let roots: Vec<String> = self
            .ctx
            .config
            .sites
            .iter()
            .map(|site| site.url.clone())
            .collect();

        let Some(idx) = root_for_host(&url, &roots) else {
            tracing::info!("Rejected page outside configured sites: {}", url);
            return Ok(IndexPageOutcome { accepted: false });
        };
        let entry = &self.ctx.config.sites[idx];
        let root = site_root(&entry.url);

        let name = entry.name.clone();
        let (site_id, created) = with_storage(&self.ctx.storage, move |storage| {
            match storage.find_site_by_url(&root)? {
                Some(site) => Ok((site.id, false)),
                None => Ok((storage.insert_site(&root, &name, SiteStatus::Indexing)?, true)),
            }
        })
        .await?;

        let referrer = &self.ctx.config.user_agent.referrer;
        let fetch_error = match fetch_page(&self.ctx.client, &url, referrer).await {
            Ok(page) => {
                let ctx = self.ctx.clone();
                let indexed = tokio::task::spawn_blocking(move || {
                    ctx.builder.index_pages(site_id, &[page], true, &ctx.lemmatizer)
                })
                .await??;
                tracing::info!("Indexed {} ({} pages merged)", url, indexed);
                None
            }
            Err(e) => {
                tracing::warn!("Single page request failed: {}", e);
                Some(e.to_string())
            }
        };

        if created {
            let status = if fetch_error.is_some() {
                SiteStatus::Failed
            } else {
                SiteStatus::Indexed
            };
            with_storage(&self.ctx.storage, move |storage| {
                storage.transition_site(
                    site_id,
                    SiteStatus::Indexing,
                    status,
                    fetch_error.as_deref(),
                )
            })
            .await?;
        } else {
            with_storage(&self.ctx.storage, move |storage| storage.touch_site(site_id)).await?;
        }

        if !self.is_running() {
            self.ctx.builder.release_site(site_id);
        }

        Ok(IndexPageOutcome { accepted: true })
    }
}

/// Runs every site crawl of a run and cleans up when all have unwound
async fn supervise(
    ctx: Arc<CrawlContext>,
    session: Arc<CrawlSession>,
    sites: Vec<SiteTarget>,
    running: Arc<AtomicBool>,
    slot: SessionSlot,
) {
    let started = Instant::now();
    let mut crawls = JoinSet::new();

    for site in sites {
        crawls.spawn(crawl_site(ctx.clone(), session.clone(), site));
    }

    while let Some(joined) = crawls.join_next().await {
        if let Err(e) = joined {
            tracing::error!("Site crawl task failed: {}", e);
        }
    }

    tracing::info!(
        "Indexing run finished: {} URLs visited in {:?}",
        session.visited_count(),
        started.elapsed()
    );

    session.clear();
    if let Ok(mut slot) = slot.lock() {
        *slot = None;
    }
    running.store(false, Ordering::SeqCst);
}

/// Crawls one site from its root
///
/// Batches are queued and at most `max-concurrent-batches` of them run at
/// once. The site is done when the queue and the in-flight set are both
/// empty.
async fn crawl_site(ctx: Arc<CrawlContext>, session: Arc<CrawlSession>, site: SiteTarget) {
    tracing::info!("Indexing site {} ({})", site.name, site.url);
    let started = Instant::now();

    let seed = match seed_url(&site.url) {
        Ok(seed) => seed,
        Err(e) => {
            settle_site(&ctx, &site, SiteStatus::Failed, Some(e.to_string())).await;
            return;
        }
    };

    let batch_size = ctx.config.crawler.batch_size;
    let max_in_flight = ctx.config.crawler.max_concurrent_batches.max(1);

    let mut queue: VecDeque<Vec<String>> = VecDeque::from([vec![seed]]);
    let mut in_flight = JoinSet::new();
    let mut pages = 0usize;
    let mut indexed = 0usize;
    let mut first_error: Option<String> = None;

    loop {
        while in_flight.len() < max_in_flight && !session.is_cancelled() {
            let Some(batch) = queue.pop_front() else {
                break;
            };
            in_flight.spawn(process_batch(
                ctx.clone(),
                session.clone(),
                site.clone(),
                batch,
            ));
        }

        let Some(joined) = in_flight.join_next().await else {
            break;
        };

        let outcome = match joined {
            Ok(outcome) => outcome,
            Err(e) => {
                tracing::error!("Batch task of {} failed: {}", site.url, e);
                continue;
            }
        };

        pages += outcome.pages;
        indexed += outcome.indexed;
        if first_error.is_none() {
            first_error = outcome
                .errors
                .iter()
                .find(|e| e.is_transport())
                .map(|e| e.to_string());
        }

        if session.is_cancelled() {
            continue;
        }

        let fresh: Vec<String> = outcome
            .discovered
            .into_iter()
            .filter(|link| !session.is_visited(link))
            .collect();
        queue.extend(split_batches(fresh, batch_size));

        if outcome.pages > 0 {
            let site_id = site.id;
            let touched = with_storage(&ctx.storage, move |storage| storage.touch_site(site_id));
            if let Err(e) = touched.await {
                tracing::error!("Failed to refresh status time of {}: {}", site.url, e);
            }
        }
    }

    let (status, error) = if session.is_cancelled() {
        (SiteStatus::Failed, Some(STOPPED_BY_USER.to_string()))
    } else if pages == 0 && first_error.is_some() {
        (SiteStatus::Failed, first_error)
    } else {
        (SiteStatus::Indexed, None)
    };

    tracing::info!(
        "Site {} finished as {}: {} pages, {} indexed in {:?}",
        site.url,
        status,
        pages,
        indexed,
        started.elapsed()
    );

    settle_site(&ctx, &site, status, error).await;
}

/// Moves a site out of INDEXING unless something else already did, then
/// drops its merge lock
async fn settle_site(
    ctx: &CrawlContext,
    site: &SiteTarget,
    status: SiteStatus,
    error: Option<String>,
) {
    let site_id = site.id;
    let result = with_storage(&ctx.storage, move |storage| {
        storage.transition_site(site_id, SiteStatus::Indexing, status, error.as_deref())
    })
    .await;

    match result {
        Ok(true) => {}
        Ok(false) => tracing::debug!("Site {} was already settled", site.url),
        Err(e) => tracing::error!("Failed to update status of {}: {}", site.url, e),
    }

    ctx.builder.release_site(site_id);
}
