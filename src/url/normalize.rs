use crate::{UrlError, UrlResult};
use url::Url;

/// Strips the query string from a URL
///
/// Everything from the first `?` onward is removed. The result is the
/// deduplication key for pages and visited links, so the function must be
/// idempotent.
///
/// # Examples
///
/// ```
/// use lemma_seek::url::clean_url;
///
/// assert_eq!(clean_url("http://x.com/a?x=1"), "http://x.com/a");
/// assert_eq!(clean_url("http://x.com/a"), "http://x.com/a");
/// ```
pub fn clean_url(url: &str) -> String {
    match url.find('?') {
        Some(idx) => url[..idx].to_string(),
        None => url.to_string(),
    }
}

/// Collapses a leading `www.` host segment
///
/// `https://www.example.com/a` becomes `https://example.com/a`. Only the
/// segment right after the scheme separator is touched, and the comparison
/// is case-insensitive.
pub fn collapse_www(url: &str) -> String {
    let (scheme, rest) = match url.find("://") {
        Some(idx) => (&url[..idx + 3], &url[idx + 3..]),
        None => ("", url),
    };

    if rest.len() >= 4 && rest[..4].eq_ignore_ascii_case("www.") {
        format!("{}{}", scheme, &rest[4..])
    } else {
        url.to_string()
    }
}

/// Turns a configured site root into the URL the crawl starts from
///
/// The root is parsed (which adds the trailing `/` to a bare host) and its
/// query string dropped, so the seed matches the form links to the home
/// page take after resolution.
pub fn seed_url(root: &str) -> UrlResult<String> {
    let url = Url::parse(root.trim()).map_err(|e| UrlError::Parse(e.to_string()))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(UrlError::InvalidScheme(url.scheme().to_string()));
    }
    if url.host_str().is_none() {
        return Err(UrlError::MissingHost);
    }

    let mut seed = clean_url(url.as_str());
    if let Some(idx) = seed.find('#') {
        seed.truncate(idx);
    }
    Ok(seed)
}

/// Host of a URL without a leading `www.`, lowercased
pub fn bare_host(url: &str) -> UrlResult<String> {
    let parsed = Url::parse(url.trim()).map_err(|e| UrlError::Parse(e.to_string()))?;
    let host = parsed.host_str().ok_or(UrlError::MissingHost)?.to_lowercase();

    Ok(match host.strip_prefix("www.") {
        Some(stripped) => stripped.to_string(),
        None => host,
    })
}

/// Canonical form of a configured site root, without a trailing `/`
///
/// Page URLs of the site start with this string and search results show
/// them relative to it.
pub fn site_root(url: &str) -> String {
    url.trim().trim_end_matches('/').to_string()
}
