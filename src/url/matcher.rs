use crate::url::normalize::{bare_host, clean_url, collapse_www};

/// Extensions of static assets that are never crawled
const ASSET_EXTENSIONS: &[&str] = &[
    "jpg", "bmp", "png", "gif", "pdf", "doc", "xls", "ppt", "jpeg", "zip", "tar", "jar", "gz",
    "svg", "pptx", "docx", "xlsx",
];

/// Link schemes that address a person rather than a page
const CONTACT_SCHEMES: &[&str] = &["tel:", "tg:", "mailto:"];

/// Checks whether a discovered link belongs to the crawl
///
/// A link is valid when:
/// - it does not end in a static asset extension (case-insensitive)
/// - it contains no fragment marker `#`
/// - it is not a `tel:`, `tg:` or `mailto:` link
/// - with `www.` collapsed on both sides, it starts with one of `roots`
///
/// The extension test runs on the query-stripped link, so
/// `/doc.pdf?download=1` is rejected as well.
///
/// # Examples
///
/// ```
/// use lemma_seek::url::is_valid_link;
///
/// let roots = vec!["http://x.com".to_string()];
/// assert!(is_valid_link("http://www.x.com/news", &roots));
/// assert!(!is_valid_link("http://x.com/doc.pdf", &roots));
/// assert!(!is_valid_link("http://y.com/news", &roots));
/// ```
pub fn is_valid_link(link: &str, roots: &[String]) -> bool {
    if link.contains('#') {
        return false;
    }

    let lower = link.to_lowercase();
    if CONTACT_SCHEMES.iter().any(|scheme| lower.starts_with(scheme)) {
        return false;
    }

    let cleaned = clean_url(&lower);
    if ASSET_EXTENSIONS
        .iter()
        .any(|ext| cleaned.ends_with(&format!(".{}", ext)))
    {
        return false;
    }

    matches_root(link, roots)
}

/// Checks whether a link starts with one of the configured roots
pub fn matches_root(link: &str, roots: &[String]) -> bool {
    let candidate = collapse_www(link).to_lowercase();
    roots.iter().any(|root| {
        let root = collapse_www(root).to_lowercase();
        candidate.starts_with(root.as_str())
    })
}

/// Finds the configured root whose host matches the URL's host
///
/// Hosts are compared without a leading `www.`. Returns the index of the
/// first matching root.
pub fn root_for_host(url: &str, roots: &[String]) -> Option<usize> {
    let host = bare_host(url).ok()?;
    roots
        .iter()
        .position(|root| bare_host(root).map(|h| h == host).unwrap_or(false))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn roots() -> Vec<String> {
        vec!["http://x.com".to_string(), "https://www.lenta.ru".to_string()]
    }

    #[test]
    fn test_in_scope_links() {
        assert!(is_valid_link("http://x.com/", &roots()));
        assert!(is_valid_link("http://x.com/a/b", &roots()));
        assert!(is_valid_link("https://lenta.ru/news", &roots()));
        assert!(is_valid_link("https://www.lenta.ru/news", &roots()));
    }

    #[test]
    fn test_out_of_scope_links() {
        assert!(!is_valid_link("http://y.com/a", &roots()));
        assert!(!is_valid_link("https://x.com/a", &roots()));
    }

    #[test]
    fn test_asset_extensions_rejected() {
        assert!(!is_valid_link("http://x.com/doc.pdf", &roots()));
        assert!(!is_valid_link("http://x.com/IMAGE.JPG", &roots()));
        assert!(!is_valid_link("http://x.com/archive.tar", &roots()));
        assert!(!is_valid_link("http://x.com/slides.pptx", &roots()));
        assert!(!is_valid_link("http://x.com/doc.pdf?download=1", &roots()));
        assert!(is_valid_link("http://x.com/pdf-guide", &roots()));
    }

    #[test]
    fn test_pdf_rejected_even_when_in_scope() {
        assert!(matches_root("http://x.com/doc.pdf", &roots()));
        assert!(!is_valid_link("http://x.com/doc.pdf", &roots()));
    }

    #[test]
    fn test_fragment_rejected() {
        assert!(!is_valid_link("http://x.com/a#top", &roots()));
        assert!(!is_valid_link("http://x.com/#", &roots()));
    }

    #[test]
    fn test_contact_links_rejected() {
        let contacts = vec!["mailto:".to_string(), "tel:".to_string(), "tg:".to_string()];
        assert!(!is_valid_link("mailto:me@x.com", &contacts));
        assert!(!is_valid_link("TEL:+123", &contacts));
        assert!(!is_valid_link("tg://resolve?domain=x", &contacts));
    }

    #[test]
    fn test_root_for_host() {
        assert_eq!(root_for_host("http://www.x.com/page", &roots()), Some(0));
        assert_eq!(root_for_host("https://lenta.ru/a", &roots()), Some(1));
        assert_eq!(root_for_host("https://other.ru/a", &roots()), None);
        assert_eq!(root_for_host("garbage", &roots()), None);
    }
}
