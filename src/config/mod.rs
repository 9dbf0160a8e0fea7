//! Configuration module for Corpus-Harvest
//!
//! This module handles loading, parsing, and validating TOML configuration files.
//!
//! # Example
//!
//! ```no_run
//! use corpus_harvest::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("harvest.toml")).unwrap();
//! println!("Configured targets: {}", config.targets.len());
//! ```

mod parser;
mod template;
mod types;
mod validation;

// Re-export types
pub use types::{
    ArticleRule, BatchConfig, CommandPagerConfig, Config, CorpusKind, CrawlerConfig,
    CursorPagerConfig, DivisionConfig, FieldRule, FixedPagerConfig, InputFormat, LinkRule,
    OffsetPagerConfig, OutputConfig, PaginationConfig, TargetConfig, UserAgentConfig,
};

// Re-export parser functions
pub use parser::{compute_config_hash, load_config, load_config_with_hash, resolve_path};

pub use template::{fill_cursor, has_placeholder, render_template, CURSOR_PLACEHOLDERS};
pub use validation::validate;
