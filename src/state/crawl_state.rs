use std::collections::HashSet;
use std::fmt;

/// Strategy-specific pagination progress marker
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Cursor {
    /// No pagination (start URLs only)
    None,

    /// Next page number to request
    Page(u32),

    /// Next numeric offset to request
    Offset(u32),

    /// Opaque last-ID token carried by the next request
    LastId(String),
}

impl fmt::Display for Cursor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::None => write!(f, "-"),
            Self::Page(page) => write!(f, "page {}", page),
            Self::Offset(offset) => write!(f, "offset {}", offset),
            Self::LastId(id) => write!(f, "last id {}", id),
        }
    }
}

/// Why a crawl stopped paginating or finished
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StopReason {
    /// `max_articles` records were emitted
    QuotaReached,

    /// The page/offset safety cap was reached
    PageCapReached,

    /// The last page yielded no previously unseen link
    NoNewLinks,

    /// The continuation returned an empty payload
    EmptyPayload,

    /// The continuation request failed
    FetchFailed,

    /// The continuation payload could not be decoded
    InvalidPayload,

    /// The crawl was cancelled
    Cancelled,

    /// The target has no pagination and its listing pages are done
    NoPagination,
}

impl StopReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::QuotaReached => "quota_reached",
            Self::PageCapReached => "page_cap_reached",
            Self::NoNewLinks => "no_new_links",
            Self::EmptyPayload => "empty_payload",
            Self::FetchFailed => "fetch_failed",
            Self::InvalidPayload => "invalid_payload",
            Self::Cancelled => "cancelled",
            Self::NoPagination => "no_pagination",
        }
    }
}

impl fmt::Display for StopReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Decides whether pagination stops after a page
///
/// Checked in order: quota, safety cap, then the number of *new* links the
/// page contributed. A page made only of already seen links counts as
/// exhausted.
///
/// # Arguments
///
/// * `new_link_count` - Links on the page that were not in `seen_urls` before
/// * `item_count` - Records emitted so far
/// * `max_articles` - The crawl quota
/// * `cap_reached` - Whether the next cursor lies past the safety cap
pub fn evaluate_stop(
    new_link_count: usize,
    item_count: u32,
    max_articles: u32,
    cap_reached: bool,
) -> Option<StopReason> {
    if item_count >= max_articles {
        Some(StopReason::QuotaReached)
    } else if cap_reached {
        Some(StopReason::PageCapReached)
    } else if new_link_count == 0 {
        Some(StopReason::NoNewLinks)
    } else {
        None
    }
}

/// Mutable state owned by one running site crawl
///
/// One instance per crawl (or per division sub-crawl); it is never shared
/// between crawls. `seen_urls` only grows and `item_count` never exceeds
/// the quota it is given.
#[derive(Debug, Clone)]
pub struct CrawlState {
    seen_urls: HashSet<String>,
    item_count: u32,
    cursor: Cursor,
    last_page_new_link_count: usize,
}

impl CrawlState {
    /// Creates a fresh state positioned at `cursor`
    pub fn new(cursor: Cursor) -> Self {
        Self {
            seen_urls: HashSet::new(),
            item_count: 0,
            cursor,
            last_page_new_link_count: 0,
        }
    }

    /// Marks a URL as discovered
    ///
    /// Returns true if the URL had not been seen before and should be
    /// queued for article fetch.
    pub fn discover(&mut self, url: &str) -> bool {
        if self.seen_urls.contains(url) {
            return false;
        }
        self.seen_urls.insert(url.to_string())
    }

    /// Returns true if the URL has already been discovered
    pub fn is_seen(&self, url: &str) -> bool {
        self.seen_urls.contains(url)
    }

    pub fn seen_urls(&self) -> &HashSet<String> {
        &self.seen_urls
    }

    pub fn item_count(&self) -> u32 {
        self.item_count
    }

    /// Counts one emitted record, refusing to go past `max_articles`
    ///
    /// Returns false (and leaves the count unchanged) when the quota is
    /// already reached.
    pub fn record_emitted(&mut self, max_articles: u32) -> bool {
        if self.item_count >= max_articles {
            return false;
        }
        self.item_count += 1;
        true
    }

    pub fn cursor(&self) -> &Cursor {
        &self.cursor
    }

    pub fn set_cursor(&mut self, cursor: Cursor) {
        self.cursor = cursor;
    }

    /// Records how many new links the most recent page contributed
    pub fn record_page(&mut self, new_link_count: usize) {
        self.last_page_new_link_count = new_link_count;
    }

    pub fn last_page_new_link_count(&self) -> usize {
        self.last_page_new_link_count
    }
}
