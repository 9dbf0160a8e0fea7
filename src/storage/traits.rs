//! Corpus traits and error types
//!
//! This module defines the trait interface for corpus backends and
//! associated error types.

use crate::record::ArticleRecord;
use std::collections::HashSet;
use thiserror::Error;

/// Errors that can occur while reading or appending to a corpus
#[derive(Debug, Error)]
pub enum CorpusError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Result type for corpus operations
pub type CorpusResult<T> = Result<T, CorpusError>;

/// An append-only article corpus
///
/// A corpus never rewrites what it holds. Deduplication is the caller's
/// job: load the URLs once, then skip records whose URL is already there.
pub trait CorpusWriter: Send {
    /// Returns the URL of every record already in the corpus
    ///
    /// A corpus that does not exist yet is empty.
    fn load_existing_urls(&self) -> CorpusResult<HashSet<String>>;

    /// Appends one record
    fn append(&mut self, record: &ArticleRecord) -> CorpusResult<()>;

    /// Flushes buffered records to the underlying medium
    fn flush(&mut self) -> CorpusResult<()> {
        Ok(())
    }
}
