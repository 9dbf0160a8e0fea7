use crate::UrlError;
use url::Url;

/// Link prefixes that never point at an article page
const NON_NAVIGABLE_PREFIXES: &[&str] = &["javascript:", "mailto:", "tel:", "data:"];

/// Rewrites a corpus URL into its canonical key form
///
/// # Normalization Steps
///
/// 1. Trim and parse the URL; reject if malformed
/// 2. Reject non-HTTP(S) schemes
/// 3. Force the https scheme
/// 4. Drop the query string and fragment
/// 5. Strip trailing slashes
///
/// # Examples
///
/// ```
/// use corpus_harvest::url::canonical_url;
///
/// let url = canonical_url("http://www.kalerkantho.com/online/national/2024/01/01/1?ref=fb#top").unwrap();
/// assert_eq!(url, "https://www.kalerkantho.com/online/national/2024/01/01/1");
/// ```
pub fn canonical_url(url_str: &str) -> Result<String, UrlError> {
    let mut url = Url::parse(url_str.trim()).map_err(|e| UrlError::Parse(e.to_string()))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(UrlError::InvalidScheme(format!(
            "Only HTTP and HTTPS schemes are supported, got: {}",
            url.scheme()
        )));
    }

    if url.host_str().is_none() {
        return Err(UrlError::MissingDomain);
    }

    url.set_scheme("https")
        .map_err(|_| UrlError::InvalidScheme(url.scheme().to_string()))?;
    url.set_query(None);
    url.set_fragment(None);

    Ok(url.as_str().trim_end_matches('/').to_string())
}

/// Resolves a link found on a page against that page's URL
///
/// Returns None for empty or fragment-only links, non-navigable schemes
/// (javascript, mailto, tel, data), unparseable links and anything that
/// does not resolve to http(s). The fragment is dropped.
pub fn resolve_link(href: &str, base_url: &Url) -> Option<Url> {
    let href = href.trim();

    if href.is_empty() || href.starts_with('#') {
        return None;
    }

    let lower = href.to_ascii_lowercase();
    if NON_NAVIGABLE_PREFIXES.iter().any(|p| lower.starts_with(p)) {
        return None;
    }

    let mut url = base_url.join(href).ok()?;
    if url.scheme() != "http" && url.scheme() != "https" {
        return None;
    }
    url.host_str()?;

    url.set_fragment(None);
    Some(url)
}
