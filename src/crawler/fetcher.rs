//! HTTP fetcher implementation
//!
//! This module handles all HTTP requests for the crawler, including:
//! - Building the shared HTTP client with the configured user agent
//! - GET requests with the configured Referer header
//! - Rejection of binary Content-Types
//! - Error classification

use crate::config::UserAgentConfig;
use reqwest::header::{CONTENT_TYPE, REFERER};
use reqwest::Client;
use std::time::Duration;
use thiserror::Error;

/// Content-Type prefixes that are never treated as pages
pub const REJECTED_CONTENT_TYPES: &[&str] = &["application/", "image/", "audio/", "video/"];

/// A fetched page
///
/// HTTP error statuses are successful fetches; callers decide what to do
/// with the status code.
#[derive(Debug, Clone)]
pub struct FetchedPage {
    /// Requested URL (query-stripped), the key the page is stored under
    pub url: String,
    /// URL of the response after redirects
    pub final_url: String,
    /// HTTP status code
    pub status: u16,
    /// Response body
    pub html: String,
}

impl FetchedPage {
    /// Creates a page that was served without a redirect
    pub fn new(url: impl Into<String>, status: u16, html: impl Into<String>) -> Self {
        let url = url.into();
        Self {
            final_url: url.clone(),
            url,
            status,
            html: html.into(),
        }
    }

    /// Base URL relative links of the page resolve against
    pub fn base_url(&self) -> &str {
        &self.final_url
    }

    /// Returns true if the page may be lemmatized and its links followed
    pub fn is_success(&self) -> bool {
        self.status < 400
    }
}

/// Errors that prevent a page from being stored
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("Request to {url} failed: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("Request to {url} timed out")]
    Timeout { url: String },

    #[error("Rejected content type '{content_type}' at {url}")]
    ContentType { url: String, content_type: String },

    #[error("Failed to read body of {url}: {source}")]
    Body {
        url: String,
        #[source]
        source: reqwest::Error,
    },
}

impl FetchError {
    /// The URL the failed request was made to
    pub fn url(&self) -> &str {
        match self {
            Self::Transport { url, .. }
            | Self::Timeout { url }
            | Self::ContentType { url, .. }
            | Self::Body { url, .. } => url,
        }
    }

    /// Returns true for network-level failures (not content rejections)
    pub fn is_transport(&self) -> bool {
        !matches!(self, Self::ContentType { .. })
    }
}

/// Builds an HTTP client with proper configuration
///
/// # Arguments
///
/// * `config` - The user agent configuration
/// * `timeout_secs` - Per-request timeout
///
/// # Returns
///
/// * `Ok(Client)` - Successfully built HTTP client
/// * `Err(reqwest::Error)` - Failed to build client
pub fn build_http_client(
    config: &UserAgentConfig,
    timeout_secs: u64,
) -> Result<Client, reqwest::Error> {
    Client::builder()
        .user_agent(config.name.clone())
        .timeout(Duration::from_secs(timeout_secs))
        .connect_timeout(Duration::from_secs(timeout_secs.min(10)))
        .gzip(true)
        .brotli(true)
        .build()
}

/// Returns true if the Content-Type names a binary resource
pub fn is_rejected_content_type(content_type: &str) -> bool {
    let lower = content_type.trim().to_ascii_lowercase();
    REJECTED_CONTENT_TYPES
        .iter()
        .any(|prefix| lower.starts_with(prefix))
}

/// Fetches a single URL
///
/// No retries are made. Redirects are followed by the client; the page
/// keeps the requested URL as its key and the final URL as its link base.
///
/// # Arguments
///
/// * `client` - The HTTP client to use
/// * `url` - The URL to fetch
/// * `referrer` - Value of the Referer header
///
/// # Returns
///
/// * `Ok(FetchedPage)` - Any HTTP response with an accepted Content-Type
/// * `Err(FetchError)` - Transport failure or rejected Content-Type
pub async fn fetch_page(
    client: &Client,
    url: &str,
    referrer: &str,
) -> Result<FetchedPage, FetchError> {
    let response = client
        .get(url)
        .header(REFERER, referrer)
        .send()
        .await
        .map_err(|e| {
            if e.is_timeout() {
                FetchError::Timeout {
                    url: url.to_string(),
                }
            } else {
                FetchError::Transport {
                    url: url.to_string(),
                    source: e,
                }
            }
        })?;

    let status = response.status().as_u16();
    let final_url = response.url().to_string();

    let content_type = response
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("")
        .to_string();

    if is_rejected_content_type(&content_type) {
        return Err(FetchError::ContentType {
            url: url.to_string(),
            content_type,
        });
    }

    let html = response.text().await.map_err(|e| FetchError::Body {
        url: url.to_string(),
        source: e,
    })?;

    if final_url != url {
        tracing::debug!("Fetched {} via {} ({})", url, final_url, status);
    } else {
        tracing::debug!("Fetched {} ({})", url, status);
    }

    Ok(FetchedPage {
        url: url.to_string(),
        final_url,
        status,
        html,
    })
}
