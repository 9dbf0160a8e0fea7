//! Corpus storage
//!
//! This module handles the output corpora, including:
//! - Loading the URLs already written, for cross-run deduplication
//! - Appending normalized records as JSON Lines

mod jsonl;
mod traits;

pub use jsonl::JsonlCorpus;
pub use traits::{CorpusError, CorpusResult, CorpusWriter};
