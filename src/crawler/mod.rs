//! Crawler module for site traversal and page fetching
//!
//! This module contains the core crawling logic, including:
//! - HTTP fetching with Content-Type rejection
//! - HTML parsing, link extraction and visible text
//! - Per-run session state (visited set, cancellation, worker pool)
//! - Batch scheduling and overall run coordination

mod coordinator;
mod fetcher;
mod parser;
mod scheduler;
mod session;

pub use coordinator::{IndexPageOutcome, IndexingService, StartOutcome, StopOutcome};
pub use fetcher::{
    build_http_client, fetch_page, is_rejected_content_type, FetchError, FetchedPage,
    REJECTED_CONTENT_TYPES,
};
pub use parser::{extract_links, parse_page, ParsedPage};
pub use scheduler::{process_batch, split_batches, BatchOutcome, CrawlContext, SiteTarget};
pub use session::CrawlSession;
