use super::snippet::build_snippet;
use super::title::page_title;
use super::{SearchError, SearchItem, SearchQuery, SearchResponse};
use crate::config::SearchConfig;
use crate::crawler::parse_page;
use crate::lemma::Lemmatizer;
use crate::storage::{
    lock_storage, LemmaRecord, PageRecord, SharedStorage, SiteRecord, SqliteStorage, Storage,
    StorageResult,
};
use crate::url::site_root;
use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

/// A ranked page before pagination
struct Match {
    site: Arc<SiteRecord>,
    page: PageRecord,
    title: String,
    relevance: f64,
}

/// Ranked search over the lemma index
pub struct SearchEngine {
    storage: SharedStorage,
    lemmatizer: Arc<Lemmatizer>,
    config: SearchConfig,
}

impl SearchEngine {
    pub fn new(storage: SharedStorage, lemmatizer: Arc<Lemmatizer>, config: SearchConfig) -> Self {
        Self {
            storage,
            lemmatizer,
            config,
        }
    }

    /// Runs a query
    ///
    /// Pages must contain every query lemma. Relevance is the sum of the
    /// lemmas' ranks on the page divided by the best sum within the same
    /// site. Results are ordered by relevance, then site URL, then title,
    /// and `count` always reports the number of matches before paging.
    ///
    /// The call blocks on the storage lock; async callers run it on the
    /// blocking thread pool.
    ///
    /// # Errors
    ///
    /// * `SearchError::EmptyQuery` - The query has no text
    /// * `SearchError::UnknownSite` - The requested site was never indexed
    /// * `SearchError::Storage` - The index could not be read
    pub fn search(&self, query: &SearchQuery) -> Result<SearchResponse, SearchError> {
        if query.query.trim().is_empty() {
            return Err(SearchError::EmptyQuery);
        }

        let lemmas: HashSet<String> = self
            .lemmatizer
            .collect_lemmas(&query.query)
            .into_keys()
            .collect();
        if lemmas.is_empty() {
            tracing::debug!("Query '{}' has no lemmas", query.query);
            return Ok(SearchResponse::empty());
        }

        let mut matches = {
            let storage = lock_storage(&self.storage)?;

            let sites = match &query.site {
                Some(url) => {
                    let site = storage
                        .find_site_by_url(&site_root(url))?
                        .ok_or_else(|| SearchError::UnknownSite(url.clone()))?;
                    vec![site]
                }
                None => storage.list_sites()?,
            };

            let mut matches = Vec::new();
            for site in sites {
                let site = Arc::new(site);
                for (page_id, relevance) in self.rank_site(&storage, &site, &lemmas)? {
                    let page = storage.get_page(page_id)?;
                    let title = page_title(&*storage, &page, &parse_page(&page.content))?;
                    matches.push(Match {
                        site: site.clone(),
                        page,
                        title,
                        relevance,
                    });
                }
            }
            matches
        };

        matches.sort_by(|a, b| {
            b.relevance
                .partial_cmp(&a.relevance)
                .unwrap_or(Ordering::Equal)
                .then_with(|| a.site.url.cmp(&b.site.url))
                .then_with(|| a.title.cmp(&b.title))
        });

        let count = matches.len();
        let limit = query.limit.unwrap_or(self.config.default_limit);

        let items = matches
            .into_iter()
            .skip(query.offset)
            .take(limit)
            .map(|m| self.to_item(m, &lemmas))
            .collect();

        tracing::debug!("Query '{}' matched {} pages", query.query, count);

        Ok(SearchResponse {
            result: true,
            count,
            items,
        })
    }

    /// Scores the pages of one site that contain every lemma
    ///
    /// Returns `(page_id, relative relevance)` pairs. A lemma that is
    /// missing or present on more than `presence-ratio` of the site's pages
    /// empties the result.
    fn rank_site(
        &self,
        storage: &SqliteStorage,
        site: &SiteRecord,
        lemmas: &HashSet<String>,
    ) -> StorageResult<Vec<(i64, f64)>> {
        let page_count = storage.count_pages(site.id)?;
        let presence_limit = (self.config.presence_ratio * page_count as f64).floor() as u64;

        let mut records: Vec<LemmaRecord> = Vec::with_capacity(lemmas.len());
        for lemma in lemmas {
            match storage.find_lemma(site.id, lemma)? {
                Some(record) if u64::from(record.frequency) <= presence_limit => {
                    records.push(record)
                }
                Some(record) => {
                    tracing::debug!(
                        "Lemma '{}' is too common on {} ({} of {} pages)",
                        record.lemma,
                        site.url,
                        record.frequency,
                        page_count
                    );
                    return Ok(Vec::new());
                }
                None => return Ok(Vec::new()),
            }
        }

        records.sort_by(|a, b| a.frequency.cmp(&b.frequency).then_with(|| a.lemma.cmp(&b.lemma)));

        let mut scores: HashMap<i64, u64> = HashMap::new();
        for (idx, record) in records.iter().enumerate() {
            let ranks: HashMap<i64, u32> = storage
                .postings_for_lemma(record.id)?
                .into_iter()
                .map(|posting| (posting.page_id, posting.rank))
                .collect();

            if idx == 0 {
                scores = ranks
                    .into_iter()
                    .map(|(page, rank)| (page, u64::from(rank)))
                    .collect();
            } else {
                scores.retain(|page, _| ranks.contains_key(page));
                for (page, score) in scores.iter_mut() {
                    *score += ranks.get(page).copied().map_or(0, u64::from);
                }
            }

            if scores.is_empty() {
                return Ok(Vec::new());
            }
        }

        let max = scores.values().copied().max().unwrap_or(0);
        Ok(scores
            .into_iter()
            .map(|(page, score)| {
                let relevance = if max == 0 {
                    0.0
                } else {
                    score as f64 / max as f64
                };
                (page, relevance)
            })
            .collect())
    }

    fn to_item(&self, m: Match, lemmas: &HashSet<String>) -> SearchItem {
        let text = parse_page(&m.page.content).text;
        let snippet = build_snippet(&text, lemmas, &self.lemmatizer, &self.config);
        let uri = m
            .page
            .path
            .strip_prefix(m.site.url.as_str())
            .unwrap_or(&m.page.path)
            .to_string();

        SearchItem {
            site_url: m.site.url.clone(),
            site_name: m.site.name.clone(),
            uri,
            title: m.title,
            snippet,
            relevance: m.relevance,
        }
    }
}
