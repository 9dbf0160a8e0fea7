//! Corpus-Harvest: a news-site crawler and corpus normalizer
//!
//! This crate crawls news websites through listing pages and their AJAX
//! "load more" continuations, extracts article fields, and writes uniform
//! article records to append-only JSON Lines corpora. It also converts
//! pre-harvested batches (JSONL, CSV, JSON arrays) into the same corpora,
//! deduplicating by URL against what was written before.

pub mod config;
pub mod convert;
pub mod crawler;
pub mod output;
pub mod record;
pub mod state;
pub mod storage;
pub mod url;

use thiserror::Error;

/// Main error type for Corpus-Harvest operations
#[derive(Debug, Error)]
pub enum HarvestError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Corpus error: {0}")]
    Corpus(#[from] storage::CorpusError),

    #[error("URL error: {0}")]
    UrlError(#[from] UrlError),

    #[error("HTTP client error: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("Failed to read input {path}: {message}")]
    Input { path: String, message: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),

    #[error("Invalid domain pattern: {0}")]
    InvalidPattern(String),

    #[error("Invalid CSS selector in target '{target}': {selector}")]
    InvalidSelector { target: String, selector: String },

    #[error("Target '{target}' is missing required parameter '{parameter}'")]
    MissingParameter { target: String, parameter: String },
}

/// URL-specific errors
#[derive(Debug, Error)]
pub enum UrlError {
    #[error("Failed to parse URL: {0}")]
    Parse(String),

    #[error("Invalid URL scheme: {0}")]
    InvalidScheme(String),

    #[error("Missing domain in URL")]
    MissingDomain,
}

/// Result type alias for Corpus-Harvest operations
pub type Result<T> = std::result::Result<T, HarvestError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Result type alias for URL operations
pub type UrlResult<T> = std::result::Result<T, UrlError>;

// Re-export commonly used types
pub use config::Config;
pub use crawler::{CrawlEngine, SiteCrawl};
pub use record::ArticleRecord;
pub use state::{CrawlPhase, CrawlState, StopReason};
