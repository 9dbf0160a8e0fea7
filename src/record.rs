//! The normalized article record written to every corpus

use serde::{Deserialize, Serialize};

/// One normalized article, one JSON object per corpus line
///
/// All keys are always serialized; only `title`, `date` and `author` may
/// be null. `tokens` is derived from `body` whenever a record is built.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArticleRecord {
    pub title: Option<String>,
    pub body: String,
    pub url: String,
    pub date: Option<String>,
    pub language: String,
    pub author: Option<String>,
    pub tokens: usize,
    pub section: String,
}

impl ArticleRecord {
    /// Builds a record, normalizing the body and recomputing `tokens`
    ///
    /// The section label is lowercased.
    pub fn new(
        url: impl Into<String>,
        body: &str,
        language: impl Into<String>,
        section: &str,
    ) -> Self {
        let body = normalize_whitespace(body);
        let tokens = count_tokens(&body);
        Self {
            title: None,
            body,
            url: url.into(),
            date: None,
            language: language.into(),
            author: None,
            tokens,
            section: section.trim().to_lowercase(),
        }
    }

    pub fn with_title(mut self, title: Option<String>) -> Self {
        self.title = non_empty(title);
        self
    }

    pub fn with_date(mut self, date: Option<String>) -> Self {
        self.date = non_empty(date);
        self
    }

    pub fn with_author(mut self, author: Option<String>) -> Self {
        self.author = non_empty(author);
        self
    }
}

/// Number of whitespace-delimited tokens in `text`
pub fn count_tokens(text: &str) -> usize {
    text.split_whitespace().count()
}

/// Collapses every whitespace run to a single space and trims the ends
pub fn normalize_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Trims a value and maps an empty result to None
pub fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
