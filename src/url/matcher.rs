//! Host extraction and allowed-domain matching

use url::Url;

/// Returns the lowercase host of a URL, used as the politeness and
/// allowed-domain key
///
/// The port is not part of the key.
pub fn extract_domain(url: &Url) -> Option<String> {
    url.host_str().map(str::to_lowercase)
}

/// Checks if a host falls under an allowed domain
///
/// An allowed domain matches itself and every subdomain below it, so
/// `"jagonews24.com"` admits `"www.jagonews24.com"`. A leading `"*."` is
/// accepted and means the same thing.
///
/// # Arguments
///
/// * `allowed` - The allowed domain, optionally starting with "*."
/// * `host` - The lowercase host to check
///
/// # Examples
///
/// ```
/// use corpus_harvest::url::matches_domain;
///
/// assert!(matches_domain("example.com", "example.com"));
/// assert!(matches_domain("example.com", "www.example.com"));
/// assert!(matches_domain("*.example.com", "api.v2.example.com"));
/// assert!(!matches_domain("example.com", "notexample.com"));
/// ```
pub fn matches_domain(allowed: &str, host: &str) -> bool {
    let base = allowed.strip_prefix("*.").unwrap_or(allowed);
    if base.is_empty() {
        return false;
    }

    host == base
        || host
            .strip_suffix(base)
            .map_or(false, |prefix| prefix.ends_with('.'))
}
