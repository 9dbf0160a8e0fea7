//! HTTP fetcher implementation
//!
//! This module handles all HTTP requests for the crawler, including:
//! - Building HTTP clients with proper user agent strings
//! - GET requests with per-request headers (AJAX continuations)
//! - Politeness scheduling per host
//! - Error classification
//!
//! Failures are never fatal: the engine reads any non-success result as
//! "no content".

use crate::config::{Config, UserAgentConfig};
use crate::crawler::scheduler::Scheduler;
use crate::url::extract_domain;
use async_trait::async_trait;
use reqwest::{redirect::Policy, Client};
use std::collections::BTreeMap;
use std::time::Duration;
use url::Url;

/// A single GET request issued by the engine
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageRequest {
    pub url: String,
    pub headers: Vec<(String, String)>,
}

impl PageRequest {
    /// A plain request without extra headers
    pub fn get(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            headers: Vec::new(),
        }
    }

    /// Adds a request header
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }
}

/// Result of a fetch operation
#[derive(Debug, Clone)]
pub enum FetchResult {
    /// Successfully fetched the page
    Success {
        /// Final URL after redirects
        final_url: String,
        /// HTTP status code
        status_code: u16,
        /// Page body content (HTML or JSON)
        body: String,
    },

    /// Non-2xx response
    HttpError {
        /// The HTTP status code
        status_code: u16,
    },

    /// Network error (connection refused, timeout, etc.)
    NetworkError {
        /// Error description
        error: String,
    },
}

impl FetchResult {
    /// Returns the body of a successful fetch
    pub fn body(&self) -> Option<&str> {
        match self {
            Self::Success { body, .. } => Some(body),
            _ => None,
        }
    }

    /// Consumes the result, returning the body of a successful fetch
    pub fn into_body(self) -> Option<String> {
        match self {
            Self::Success { body, .. } => Some(body),
            _ => None,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }
}

/// Retrieves page content for the crawl engine
#[async_trait]
pub trait PageFetcher: Send + Sync {
    /// Fetches one page; failures are reported, never raised
    async fn fetch(&self, request: &PageRequest) -> FetchResult;

    /// Requests sent so far, per host
    fn request_counts(&self) -> BTreeMap<String, u32> {
        BTreeMap::new()
    }
}

/// Builds an HTTP client with proper configuration
///
/// # Arguments
///
/// * `config` - The user agent configuration
/// * `timeout` - Per-request timeout
///
/// # Returns
///
/// * `Ok(Client)` - Successfully built HTTP client
/// * `Err(reqwest::Error)` - Failed to build client
///
/// # Example
///
/// ```no_run
/// use corpus_harvest::config::UserAgentConfig;
/// use corpus_harvest::crawler::build_http_client;
/// use std::time::Duration;
///
/// let config = UserAgentConfig {
///     crawler_name: "CorpusHarvest".to_string(),
///     crawler_version: "0.1".to_string(),
///     contact_url: "https://example.com/about".to_string(),
///     contact_email: "admin@example.com".to_string(),
/// };
///
/// let client = build_http_client(&config, Duration::from_secs(20)).unwrap();
/// ```
pub fn build_http_client(
    config: &UserAgentConfig,
    timeout: Duration,
) -> Result<Client, reqwest::Error> {
    Client::builder()
        .user_agent(config.header_value())
        .timeout(timeout)
        .connect_timeout(Duration::from_secs(10))
        .redirect(Policy::limited(10))
        .gzip(true)
        .brotli(true)
        .build()
}

/// Page fetcher backed by reqwest and the politeness scheduler
pub struct HttpFetcher {
    client: Client,
    scheduler: Scheduler,
}

impl HttpFetcher {
    /// Creates a fetcher from the full configuration
    pub fn new(config: &Config) -> Result<Self, reqwest::Error> {
        let timeout = Duration::from_secs(config.crawler.request_timeout_secs);
        Ok(Self {
            client: build_http_client(&config.user_agent, timeout)?,
            scheduler: Scheduler::new(&config.crawler),
        })
    }
}

#[async_trait]
impl PageFetcher for HttpFetcher {
    /// Fetches a URL with error classification
    ///
    /// | Condition | Result |
    /// |-----------|--------|
    /// | 2xx | Success |
    /// | Any other status (404, 429, 5xx) | HttpError |
    /// | Timeout, connection refused, bad URL | NetworkError |
    async fn fetch(&self, request: &PageRequest) -> FetchResult {
        let host = match Url::parse(&request.url)
            .ok()
            .as_ref()
            .and_then(extract_domain)
        {
            Some(host) => host,
            None => {
                return FetchResult::NetworkError {
                    error: format!("Invalid request URL: {}", request.url),
                }
            }
        };

        let _slot = match self.scheduler.acquire(&host).await {
            Some(slot) => slot,
            None => {
                return FetchResult::NetworkError {
                    error: "Scheduler closed".to_string(),
                }
            }
        };

        let mut builder = self.client.get(&request.url);
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }

        tracing::debug!("GET {}", request.url);

        let response = match builder.send().await {
            Ok(response) => response,
            Err(e) => {
                let error = if e.is_timeout() {
                    "Request timeout".to_string()
                } else if e.is_connect() {
                    "Connection refused".to_string()
                } else {
                    e.to_string()
                };
                tracing::debug!("Fetch of {} failed: {}", request.url, error);
                return FetchResult::NetworkError { error };
            }
        };

        let status = response.status();
        let final_url = response.url().to_string();

        if !status.is_success() {
            tracing::debug!("Fetch of {} returned HTTP {}", request.url, status);
            return FetchResult::HttpError {
                status_code: status.as_u16(),
            };
        }

        match response.text().await {
            Ok(body) => FetchResult::Success {
                final_url,
                status_code: status.as_u16(),
                body,
            },
            Err(e) => FetchResult::NetworkError {
                error: e.to_string(),
            },
        }
    }

    fn request_counts(&self) -> BTreeMap<String, u32> {
        self.scheduler.request_counts()
    }
}
