//! Field mapping from batch inputs to article records

use crate::config::BatchConfig;
use crate::convert::reader::RawRecord;
use crate::record::{normalize_whitespace, ArticleRecord};
use crate::url::canonical_url;
use scraper::Html;
use serde_json::Value;
use std::collections::HashSet;

/// Elements whose text never belongs to an article body
const STRIPPED_TAGS: &[&str] = &[
    "script", "style", "noscript", "img", "figure", "iframe", "svg", "button", "input", "form",
    "nav",
];

/// What happened to one input record
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    Accepted(ArticleRecord),
    /// No usable URL
    Bad,
    /// URL already in the corpus
    Duplicate,
    /// Body empty or too short, or a required title missing
    Empty,
}

/// Reads a field as a trimmed, non-empty string
///
/// Numbers are accepted as text; everything else counts as missing.
fn field(record: &RawRecord, key: &str) -> Option<String> {
    let value = match record.get(key)? {
        Value::String(s) => s.trim().to_string(),
        Value::Number(n) => n.to_string(),
        _ => return None,
    };
    (!value.is_empty()).then_some(value)
}

/// Maps one input record according to the batch profile
///
/// `existing` holds every URL already in the corpus, including records
/// accepted earlier in this run.
pub fn map_record(record: &RawRecord, batch: &BatchConfig, existing: &HashSet<String>) -> Verdict {
    let Some(raw_url) = field(record, "url") else {
        return Verdict::Bad;
    };

    let url = if batch.canonical_urls {
        match canonical_url(&raw_url) {
            Ok(url) => url,
            Err(e) => {
                tracing::debug!("Bad URL {}: {}", raw_url, e);
                return Verdict::Bad;
            }
        }
    } else {
        raw_url
    };

    if existing.contains(&url) {
        return Verdict::Duplicate;
    }

    let title = field(record, "title");
    if batch.require_title && title.is_none() {
        return Verdict::Empty;
    }

    let body = field(record, "body").unwrap_or_default();
    let body = if batch.strip_html {
        strip_html(&body)
    } else {
        body
    };

    let author = if batch.override_author {
        None
    } else {
        field(record, "author")
    };

    let section = field(record, &batch.section_field).unwrap_or_default();
    let language = field(record, "language").unwrap_or_else(|| batch.language.clone());

    let record = ArticleRecord::new(url, &body, language, &section)
        .with_title(title)
        .with_date(field(record, "date"))
        .with_author(author.or_else(|| Some(batch.default_author.clone())));

    if record.body.is_empty() || record.tokens < batch.min_body_words as usize {
        return Verdict::Empty;
    }

    Verdict::Accepted(record)
}

/// Extracts readable text from an HTML body
///
/// Text inside scripts, media, forms and navigation is dropped; the rest is
/// joined and whitespace-normalized.
///
/// # Example
///
/// ```
/// use corpus_harvest::convert::strip_html;
///
/// let html = "<p>Hello <b>world</b></p><script>track()</script><nav>Home</nav>";
/// assert_eq!(strip_html(html), "Hello world");
/// ```
pub fn strip_html(html: &str) -> String {
    let fragment = Html::parse_fragment(html);

    let parts: Vec<String> = fragment
        .root_element()
        .descendants()
        .filter_map(|node| {
            let text = node.value().as_text()?;
            let hidden = node.ancestors().any(|ancestor| {
                ancestor
                    .value()
                    .as_element()
                    .map_or(false, |element| STRIPPED_TAGS.contains(&element.name()))
            });
            (!hidden).then(|| text.replace('\u{a0}', " "))
        })
        .collect();

    normalize_whitespace(&parts.join(" "))
}
