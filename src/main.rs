//! Lemma-Seek main entry point
//!
//! This is the command-line interface for crawling the configured sites and
//! searching their lemma index.

use anyhow::Context;
use clap::{Parser, Subcommand};
use lemma_seek::config::{load_config_with_hash, Config};
use lemma_seek::crawler::IndexingService;
use lemma_seek::lemma::Lemmatizer;
use lemma_seek::response::ApiResponse;
use lemma_seek::search::{SearchEngine, SearchQuery};
use lemma_seek::storage::{open_storage, with_storage, SharedStorage, Storage};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

/// Lemma-Seek: a site crawler with a lemma index
///
/// Lemma-Seek crawls the sites listed in its configuration, reduces their
/// text to lemmas, and answers queries ranked by relevance with highlighted
/// snippets.
#[derive(Parser, Debug)]
#[command(name = "lemma-seek")]
#[command(version = "1.0.0")]
#[command(about = "A site crawler with a lemma index", long_about = None)]
struct Cli {
    /// Path to TOML configuration file
    #[arg(value_name = "CONFIG")]
    config: PathBuf,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose", global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Re-index every configured site (Ctrl-C stops the run)
    Crawl,

    /// Fetch and re-index a single page of a configured site
    IndexPage {
        /// URL of the page
        url: String,
    },

    /// Search the index
    Search {
        /// Free-text query
        query: String,

        /// Restrict results to one site (its configured root URL)
        #[arg(long)]
        site: Option<String>,

        /// Number of results to skip
        #[arg(long, default_value_t = 0)]
        offset: usize,

        /// Maximum number of results
        #[arg(long)]
        limit: Option<usize>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose, cli.quiet);

    // Load and validate configuration
    tracing::info!("Loading configuration from: {}", cli.config.display());
    let (config, hash) = load_config_with_hash(&cli.config)
        .with_context(|| format!("Failed to load configuration {}", cli.config.display()))?;
    tracing::info!("Configuration loaded successfully (hash: {})", hash);

    let lemmatizer = Arc::new(
        Lemmatizer::from_config(&config.lemmatizer).context("Failed to load morphology")?,
    );
    let storage = open_storage(Path::new(&config.storage.database_path))
        .with_context(|| format!("Failed to open database {}", config.storage.database_path))?;

    let ok = match cli.command {
        Command::Crawl => handle_crawl(config, storage, lemmatizer).await?,
        Command::IndexPage { url } => handle_index_page(config, storage, lemmatizer, &url).await?,
        Command::Search {
            query,
            site,
            offset,
            limit,
        } => {
            let engine = SearchEngine::new(storage, lemmatizer, config.search.clone());
            let query = SearchQuery {
                query,
                site,
                offset,
                limit,
            };
            let result = tokio::task::spawn_blocking(move || engine.search(&query)).await?;
            print_response(&ApiResponse::from(result))?
        }
    };

    Ok(if ok {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        // Only show errors
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("lemma_seek=info,warn"),
            1 => EnvFilter::new("lemma_seek=debug,info"),
            2 => EnvFilter::new("lemma_seek=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    // Logs go to stderr; stdout carries the JSON responses
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}

/// Prints a response as JSON and reports whether it was successful
fn print_response<T: Serialize>(response: &ApiResponse<T>) -> anyhow::Result<bool> {
    println!("{}", serde_json::to_string_pretty(response)?);
    Ok(response.is_ok())
}

/// Handles the crawl command: runs a full indexing run
async fn handle_crawl(
    config: Config,
    storage: SharedStorage,
    lemmatizer: Arc<Lemmatizer>,
) -> anyhow::Result<bool> {
    tracing::info!("Configured sites: {}", config.sites.len());

    let service = IndexingService::new(config, storage.clone(), lemmatizer)?;
    let started = service.start_indexing().await?;
    if !print_response(&ApiResponse::from_start(started))? {
        return Ok(false);
    }

    tokio::select! {
        signal = tokio::signal::ctrl_c() => {
            signal.context("Failed to listen for Ctrl-C")?;
            tracing::warn!("Interrupt received, stopping indexing");
            print_response(&ApiResponse::from_stop(service.stop_indexing().await?))?;
        }
        finished = service.wait_for_completion() => finished?,
    }
    service.wait_for_completion().await?;

    let sites = with_storage(&storage, |storage| storage.list_sites()).await?;
    println!("{}", serde_json::to_string_pretty(&sites)?);

    Ok(true)
}

/// Handles the index-page command: re-indexes one page
async fn handle_index_page(
    config: Config,
    storage: SharedStorage,
    lemmatizer: Arc<Lemmatizer>,
    url: &str,
) -> anyhow::Result<bool> {
    let service = IndexingService::new(config, storage, lemmatizer)?;
    let outcome = service
        .index_page(url)
        .await
        .with_context(|| format!("Failed to index {}", url))?;
    print_response(&ApiResponse::from_index_page(outcome))
}
