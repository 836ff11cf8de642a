use serde::Deserialize;
use std::path::PathBuf;

/// Main configuration structure for Lemma-Seek
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub crawler: CrawlerConfig,
    #[serde(rename = "user-agent")]
    pub user_agent: UserAgentConfig,
    pub storage: StorageConfig,
    #[serde(default)]
    pub search: SearchConfig,
    #[serde(default)]
    pub lemmatizer: LemmatizerConfig,
    #[serde(default)]
    pub sites: Vec<SiteEntry>,
}

/// Crawler behavior configuration
#[derive(Debug, Clone, Deserialize)]
pub struct CrawlerConfig {
    /// Maximum number of URLs in one frontier batch
    #[serde(rename = "batch-size", default = "default_batch_size")]
    pub batch_size: usize,

    /// Maximum number of batches fetched concurrently
    #[serde(
        rename = "max-concurrent-batches",
        default = "default_max_concurrent_batches"
    )]
    pub max_concurrent_batches: usize,

    /// Per-request timeout (seconds)
    #[serde(
        rename = "request-timeout-secs",
        default = "default_request_timeout_secs"
    )]
    pub request_timeout_secs: u64,
}

/// Identification sent with every request
#[derive(Debug, Clone, Deserialize)]
pub struct UserAgentConfig {
    /// Value of the User-Agent header
    pub name: String,

    /// Value of the Referer header
    pub referrer: String,
}

/// Storage configuration
#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    /// Path to the SQLite database file
    #[serde(rename = "database-path")]
    pub database_path: String,
}

/// Ranking and snippet tuning
#[derive(Debug, Clone, Deserialize)]
pub struct SearchConfig {
    /// Lemmas present on more than this share of a site's pages are ignored
    #[serde(rename = "presence-ratio", default = "default_presence_ratio")]
    pub presence_ratio: f64,

    /// Maximum distance (chars) between neighbouring hits of one snippet run
    #[serde(rename = "snippet-density", default = "default_snippet_density")]
    pub snippet_density: usize,

    /// Context (chars) around a snippet made of a single hit
    #[serde(rename = "single-hit-context", default = "default_single_hit_context")]
    pub single_hit_context: usize,

    /// Context (chars) on each side of a multi-hit run
    #[serde(rename = "run-context", default = "default_run_context")]
    pub run_context: usize,

    /// Page size used when a query gives no limit
    #[serde(rename = "default-limit", default = "default_limit")]
    pub default_limit: usize,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            presence_ratio: default_presence_ratio(),
            snippet_density: default_snippet_density(),
            single_hit_context: default_single_hit_context(),
            run_context: default_run_context(),
            default_limit: default_limit(),
        }
    }
}

/// Morphology configuration
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LemmatizerConfig {
    /// Optional file with extra function words (`word<TAB>CLASS` per line)
    #[serde(rename = "function-words")]
    pub function_words: Option<PathBuf>,
}

/// A site to crawl
#[derive(Debug, Clone, Deserialize)]
pub struct SiteEntry {
    /// Root URL; every crawled page of the site starts with it
    pub url: String,

    /// Display name
    pub name: String,
}

fn default_batch_size() -> usize {
    100
}

fn default_max_concurrent_batches() -> usize {
    8
}

fn default_request_timeout_secs() -> u64 {
    30
}

fn default_presence_ratio() -> f64 {
    0.8
}

fn default_snippet_density() -> usize {
    225
}

fn default_single_hit_context() -> usize {
    100
}

fn default_run_context() -> usize {
    50
}

fn default_limit() -> usize {
    20
}
