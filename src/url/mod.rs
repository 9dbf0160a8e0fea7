//! URL handling module for Corpus-Harvest
//!
//! This module provides link resolution, canonical corpus keys, domain
//! extraction and allowed-domain matching.

mod matcher;
mod normalize;

use url::Url;

// Re-export main functions
pub use matcher::{extract_domain, matches_domain};
pub use normalize::{canonical_url, resolve_link};

/// Checks a resolved link against a target's allowed domains
///
/// An empty list allows every host.
pub fn is_allowed(url: &Url, allowed_domains: &[String]) -> bool {
    if allowed_domains.is_empty() {
        return true;
    }

    match extract_domain(url) {
        Some(host) => allowed_domains
            .iter()
            .any(|allowed| matches_domain(&allowed.to_lowercase(), &host)),
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn allowed() -> Vec<String> {
        vec!["dhakatribune.com".to_string(), "*.dailysun.com".to_string()]
    }

    #[test]
    fn test_empty_allows_all() {
        let url = Url::parse("https://anything.example/").unwrap();
        assert!(is_allowed(&url, &[]));
    }

    #[test]
    fn test_allowed_host_and_subdomain() {
        let url = Url::parse("https://www.dhakatribune.com/world/1").unwrap();
        assert!(is_allowed(&url, &allowed()));

        let url = Url::parse("https://DailySun.com/post/1").unwrap();
        assert!(is_allowed(&url, &allowed()));
    }

    #[test]
    fn test_foreign_host_rejected() {
        let url = Url::parse("https://facebook.com/share").unwrap();
        assert!(!is_allowed(&url, &allowed()));
    }
}
