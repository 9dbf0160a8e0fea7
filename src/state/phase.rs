//! Phase definitions for a single site crawl
//!
//! A crawl starts on its listing pages, then alternates between fetching
//! the articles it has queued and requesting the next page, until a stop
//! condition moves it to `Done`.
use std::fmt;

/// Represents where a site crawl is in its traversal
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CrawlPhase {
    /// Fetching the configured start URLs
    ListingInitial,

    /// Requesting continuation pages through the pagination strategy
    Paginating,

    /// Fetching queued article pages
    FetchingArticle,

    /// Terminal; a stop condition fired
    Done,
}

impl CrawlPhase {
    /// Returns true if this is the terminal phase
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Done)
    }

    /// Returns true if the crawl may move from this phase to `next`
    ///
    /// `Done` is reachable from every phase and never left. Listing only
    /// happens once, at the start.
    pub fn can_transition_to(&self, next: CrawlPhase) -> bool {
        match (self, next) {
            (Self::Done, _) => false,
            (_, Self::Done) => true,
            (_, Self::ListingInitial) => false,
            (Self::ListingInitial, _) => true,
            (Self::Paginating, _) => true,
            (Self::FetchingArticle, _) => true,
        }
    }

    /// Short lowercase name used in logs and reports
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ListingInitial => "listing_initial",
            Self::Paginating => "paginating",
            Self::FetchingArticle => "fetching_article",
            Self::Done => "done",
        }
    }
}

impl fmt::Display for CrawlPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
