//! HTML parser for extracting links, titles and visible text
//!
//! This module handles parsing HTML content to extract:
//! - In-scope links to follow (from <a> tags)
//! - The page title, with a `span[title]` fallback
//! - The visible text that gets lemmatized and snippeted

use crate::url::{clean_url, is_valid_link};
use scraper::{ElementRef, Html, Node, Selector};
use std::collections::BTreeSet;
use url::Url;

/// Elements whose text never reaches the reader
const HIDDEN_ELEMENTS: &[&str] = &["script", "style", "noscript", "template"];

/// Extracted information from an HTML page
#[derive(Debug, Clone, Default)]
pub struct ParsedPage {
    /// The `<title>` text, or the first `span[title]` attribute
    pub title: Option<String>,

    /// Visible text with collapsed whitespace
    pub text: String,
}

/// Parses HTML content into its title and visible text
///
/// # Example
///
/// ```
/// use lemma_seek::crawler::parse_page;
///
/// let html = r#"<html><head><title>Test</title></head>
///     <body><p>Hello <b>world</b></p></body></html>"#;
/// let parsed = parse_page(html);
/// assert_eq!(parsed.title, Some("Test".to_string()));
/// assert_eq!(parsed.text, "Test Hello world");
/// ```
pub fn parse_page(html: &str) -> ParsedPage {
    let document = Html::parse_document(html);

    ParsedPage {
        title: extract_title(&document),
        text: visible_text(&document),
    }
}

/// Extracts the page title from the HTML document
fn extract_title(document: &Html) -> Option<String> {
    let title_selector = Selector::parse("title").ok()?;

    let title = document
        .select(&title_selector)
        .next()
        .map(|element| collapse_whitespace(&element.text().collect::<String>()))
        .filter(|s| !s.is_empty());

    title.or_else(|| {
        let span_selector = Selector::parse("span[title]").ok()?;
        document
            .select(&span_selector)
            .filter_map(|element| element.value().attr("title"))
            .map(collapse_whitespace)
            .find(|s| !s.is_empty())
    })
}

/// Collects the document's visible text
fn visible_text(document: &Html) -> String {
    let mut parts = Vec::new();

    for node in document.root_element().descendants() {
        if let Node::Text(text) = node.value() {
            let hidden = node
                .ancestors()
                .filter_map(ElementRef::wrap)
                .any(|el| HIDDEN_ELEMENTS.contains(&el.value().name()));
            if !hidden {
                parts.push(&**text);
            }
        }
    }

    collapse_whitespace(&parts.join(" "))
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Extracts in-scope links from a page
///
/// Every `a[href]` is resolved against `base_url`; links passing
/// [`is_valid_link`] for `roots` are returned query-stripped.
///
/// # Arguments
///
/// * `html` - The HTML content
/// * `base_url` - The URL of the page, for resolving relative links
/// * `roots` - Site roots the crawl is limited to
pub fn extract_links(html: &str, base_url: &Url, roots: &[String]) -> BTreeSet<String> {
    let document = Html::parse_document(html);
    let mut links = BTreeSet::new();

    let Ok(a_selector) = Selector::parse("a[href]") else {
        return links;
    };

    for element in document.select(&a_selector) {
        if let Some(href) = element.value().attr("href") {
            if let Some(absolute_url) = resolve_link(href, base_url) {
                if is_valid_link(&absolute_url, roots) {
                    links.insert(clean_url(&absolute_url));
                }
            }
        }
    }

    links
}

/// Resolves a link href to an absolute URL
///
/// Hrefs that are empty or that only carry a `javascript:` or `data:`
/// payload resolve to None. Contact schemes such as `mailto:` are kept so
/// that [`is_valid_link`] rejects them.
fn resolve_link(href: &str, base_url: &Url) -> Option<String> {
    let href = href.trim();

    if href.is_empty() {
        return None;
    }

    let lower = href.to_ascii_lowercase();
    if lower.starts_with("javascript:") || lower.starts_with("data:") {
        return None;
    }

    base_url.join(href).ok().map(|absolute| absolute.to_string())
}
