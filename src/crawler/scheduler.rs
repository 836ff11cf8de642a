//! Batch scheduling for site crawls
//!
//! This module handles:
//! - Splitting discovered links into frontier batches
//! - Running one batch: claim, fetch, extract links, persist
//! - Observing cancellation per URL

use crate::config::Config;
use crate::crawler::fetcher::{fetch_page, FetchError};
use crate::crawler::parser::extract_links;
use crate::crawler::session::CrawlSession;
use crate::index::IndexBuilder;
use crate::lemma::Lemmatizer;
use crate::storage::SharedStorage;
use crate::url::clean_url;
use reqwest::Client;
use std::collections::BTreeSet;
use std::sync::Arc;
use url::Url;

/// Shared, read-only dependencies of crawl tasks
pub struct CrawlContext {
    pub config: Config,
    pub client: Client,
    pub storage: SharedStorage,
    pub builder: IndexBuilder,
    pub lemmatizer: Arc<Lemmatizer>,
}

/// The site a batch belongs to
#[derive(Debug, Clone)]
pub struct SiteTarget {
    /// Database ID of the site row
    pub id: i64,
    /// Canonical root URL
    pub url: String,
    /// Display name
    pub name: String,
}

/// Result of one batch task
#[derive(Debug, Default)]
pub struct BatchOutcome {
    /// Pages fetched and written (any status code)
    pub pages: usize,

    /// Pages lemmatized and merged into the index
    pub indexed: usize,

    /// In-scope links found on successfully fetched pages
    pub discovered: BTreeSet<String>,

    /// URLs that could not be fetched
    pub errors: Vec<FetchError>,
}

/// Splits links into batches of at most `batch_size` URLs
///
/// # Example
///
/// ```
/// use lemma_seek::crawler::split_batches;
///
/// let links: Vec<String> = (0..5).map(|i| format!("http://x.com/{}", i)).collect();
/// let batches = split_batches(links, 2);
/// assert_eq!(batches.iter().map(Vec::len).collect::<Vec<_>>(), vec![2, 2, 1]);
/// ```
pub fn split_batches<I>(links: I, batch_size: usize) -> Vec<Vec<String>>
where
    I: IntoIterator<Item = String>,
{
    let batch_size = batch_size.max(1);
    let mut batches = Vec::new();
    let mut current = Vec::with_capacity(batch_size);

    for link in links {
        current.push(link);
        if current.len() == batch_size {
            batches.push(std::mem::replace(
                &mut current,
                Vec::with_capacity(batch_size),
            ));
        }
    }

    if !current.is_empty() {
        batches.push(current);
    }

    batches
}

/// Processes one frontier batch
///
/// The batch waits for a worker-pool slot, then fetches its URLs in order.
/// Each URL is query-stripped and claimed in the visited set before the
/// request; URLs claimed elsewhere are skipped. Links are extracted only
/// from pages with a status below 400. Whatever was fetched is persisted
/// and indexed even if the run is cancelled halfway.
///
/// # Arguments
///
/// * `ctx` - Shared crawl dependencies
/// * `session` - Run state (visited set, cancellation, pool)
/// * `site` - The site being crawled
/// * `urls` - URLs of this batch
pub async fn process_batch(
    ctx: Arc<CrawlContext>,
    session: Arc<CrawlSession>,
    site: SiteTarget,
    urls: Vec<String>,
) -> BatchOutcome {
    let mut outcome = BatchOutcome::default();

    let Some(_permit) = session.acquire_worker().await else {
        return outcome;
    };

    let roots = vec![site.url.clone()];
    let referrer = ctx.config.user_agent.referrer.as_str();
    let mut fetched = Vec::new();

    for url in urls {
        if session.is_cancelled() {
            break;
        }

        let url = clean_url(&url);
        if !session.claim(&url) {
            continue;
        }

        let result = tokio::select! {
            _ = session.token().cancelled() => break,
            result = fetch_page(&ctx.client, &url, referrer) => result,
        };

        match result {
            Ok(page) => {
                if page.is_success() {
                    match Url::parse(page.base_url()) {
                        Ok(base) => outcome
                            .discovered
                            .extend(extract_links(&page.html, &base, &roots)),
                        Err(e) => {
                            tracing::debug!("Cannot resolve links of {}: {}", page.url, e)
                        }
                    }
                }
                fetched.push(page);
            }
            Err(e) => {
                tracing::warn!("{}", e);
                outcome.errors.push(e);
            }
        }
    }

    if fetched.is_empty() {
        return outcome;
    }

    outcome.pages = fetched.len();

    let task_ctx = ctx.clone();
    let site_id = site.id;
    let indexed = tokio::task::spawn_blocking(move || {
        task_ctx
            .builder
            .index_pages(site_id, &fetched, false, &task_ctx.lemmatizer)
    })
    .await;

    match indexed {
        Ok(Ok(count)) => outcome.indexed = count,
        Ok(Err(e)) => tracing::error!("Failed to index pages of {}: {}", site.url, e),
        Err(e) => tracing::error!("Indexing task of {} failed: {}", site.url, e),
    }

    outcome
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_batches_exact() {
        let links: Vec<String> = (0..4).map(|i| i.to_string()).collect();
        let batches = split_batches(links, 2);
        assert_eq!(batches, vec![vec!["0", "1"], vec!["2", "3"]]);
    }

    #[test]
    fn test_split_batches_empty() {
        assert!(split_batches(Vec::<String>::new(), 100).is_empty());
    }

    #[test]
    fn test_split_batches_zero_size() {
        let batches = split_batches(vec!["a".to_string(), "b".to_string()], 0);
        assert_eq!(batches.len(), 2);
    }

    #[test]
    fn test_split_batches_keeps_order() {
        let links: Vec<String> = (0..250).map(|i| format!("http://x.com/{}", i)).collect();
        let batches = split_batches(links.clone(), 100);
        assert_eq!(batches.len(), 3);
        assert_eq!(batches[2].len(), 50);
        assert_eq!(batches.concat(), links);
    }
}
