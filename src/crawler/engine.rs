//! Crawl engine - one parametrized traversal for every site
//!
//! This module contains the listing → pagination → article loop that every
//! target runs, including:
//! - Planning a target into independent sub-crawls (one per division)
//! - Deduplicating discovered links per crawl
//! - Enforcing the article quota without overshoot
//! - Evaluating stop conditions after every page
//! - Cancellation at every fetch boundary

use crate::config::{render_template, ArticleRule, DivisionConfig, LinkRule, TargetConfig};
use crate::crawler::extractor::FieldExtractor;
use crate::crawler::fetcher::{FetchResult, PageFetcher, PageRequest};
use crate::crawler::pagination::{build_paginator, DiscoveredLink, PageOutcome, Paginator};
use crate::output::{CrawlReport, CrawlStats};
use crate::record::ArticleRecord;
use crate::state::{evaluate_stop, CrawlPhase, CrawlState, Cursor, StopReason};
use crate::url::{is_allowed, resolve_link};
use crate::ConfigError;
use futures::future::join_all;
use futures::stream::{self, Stream};
use std::collections::VecDeque;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use url::Url;

/// Article fetches issued at once by one crawl unless configured otherwise
const DEFAULT_CONCURRENCY: usize = 4;

/// Builds and runs site crawls
///
/// The engine holds the collaborators shared by every crawl it plans: the
/// page fetcher, the field extractor and the cancellation token.
#[derive(Clone)]
pub struct CrawlEngine {
    fetcher: Arc<dyn PageFetcher>,
    extractor: Arc<dyn FieldExtractor>,
    concurrency: usize,
    cancel: CancellationToken,
}

impl CrawlEngine {
    /// Creates a new engine
    pub fn new(fetcher: Arc<dyn PageFetcher>, extractor: Arc<dyn FieldExtractor>) -> Self {
        Self {
            fetcher,
            extractor,
            concurrency: DEFAULT_CONCURRENCY,
            cancel: CancellationToken::new(),
        }
    }

    /// Sets how many article pages one crawl fetches at once
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    /// Uses an externally owned cancellation token
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub fn fetcher(&self) -> &Arc<dyn PageFetcher> {
        &self.fetcher
    }

    /// Plans a target into independent sub-crawls
    ///
    /// A target with divisions yields one crawl per division, each with its
    /// own state, quota and section; otherwise a single crawl. All URL and
    /// header templates are rendered here, so a missing parameter fails
    /// before any request is made.
    ///
    /// # Returns
    ///
    /// * `Ok(Vec<SiteCrawl>)` - Crawls ready to run
    /// * `Err(ConfigError)` - A template names a parameter the division lacks
    pub fn plan(&self, target: &TargetConfig) -> Result<Vec<SiteCrawl>, ConfigError> {
        if target.divisions.is_empty() {
            return Ok(vec![self.sub_crawl(target, None)?]);
        }

        target
            .divisions
            .iter()
            .map(|division| self.sub_crawl(target, Some(division)))
            .collect()
    }

    /// Runs a target, yielding records lazily as they are accepted
    ///
    /// Sub-crawls of a target are driven concurrently; records from
    /// different divisions may interleave.
    pub fn run(
        &self,
        target: &TargetConfig,
    ) -> Result<impl Stream<Item = ArticleRecord>, ConfigError> {
        let crawls = self.plan(target)?;
        Ok(stream::select_all(
            crawls.into_iter().map(|crawl| Box::pin(crawl.into_stream())),
        ))
    }

    fn sub_crawl(
        &self,
        target: &TargetConfig,
        division: Option<&DivisionConfig>,
    ) -> Result<SiteCrawl, ConfigError> {
        let vars = division
            .map(DivisionConfig::template_vars)
            .unwrap_or_default();

        let start_urls = target
            .start_urls
            .iter()
            .map(|url| {
                render_template(url, &vars, &[]).map_err(|parameter| {
                    ConfigError::MissingParameter {
                        target: target.name.clone(),
                        parameter,
                    }
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        let referer = start_urls.first().cloned().ok_or_else(|| {
            ConfigError::Validation(format!("Target '{}' has no start URLs", target.name))
        })?;

        let paginator = build_paginator(&target.name, &target.pagination, &vars)?;

        let (name, section, max_articles) = match division {
            Some(d) => (
                format!("{}/{}", target.name, d.name),
                d.section_label().to_string(),
                d.max_articles.unwrap_or(target.max_articles),
            ),
            None => (
                target.name.clone(),
                target.section.clone(),
                target.max_articles,
            ),
        };

        Ok(SiteCrawl {
            name,
            start_urls,
            referer,
            allowed_domains: target.allowed_domains.clone(),
            links: target.links.clone(),
            article: target.article.clone(),
            language: target.language.clone(),
            section,
            default_author: target.default_author.clone(),
            max_articles,
            min_body_words: target.min_body_words as usize,
            state: CrawlState::new(paginator.initial_cursor()),
            paginator,
            fetcher: Arc::clone(&self.fetcher),
            extractor: Arc::clone(&self.extractor),
            concurrency: self.concurrency,
            cancel: self.cancel.clone(),
            phase: CrawlPhase::ListingInitial,
            pending: VecDeque::new(),
            ready: VecDeque::new(),
            stop_reason: None,
            stats: CrawlStats::default(),
        })
    }
}

/// One running crawl of a target (or of one of its divisions)
///
/// Owns its `CrawlState` exclusively. Fetches run concurrently, but every
/// state mutation happens on `&mut self` between fetch boundaries, so
/// discovery and emission are serialized.
pub struct SiteCrawl {
    name: String,
    start_urls: Vec<String>,
    referer: String,
    allowed_domains: Vec<String>,
    links: LinkRule,
    article: ArticleRule,
    language: String,
    section: String,
    default_author: Option<String>,
    max_articles: u32,
    min_body_words: usize,

    paginator: Box<dyn Paginator>,
    fetcher: Arc<dyn PageFetcher>,
    extractor: Arc<dyn FieldExtractor>,
    concurrency: usize,
    cancel: CancellationToken,

    state: CrawlState,
    phase: CrawlPhase,
    /// Discovered article URLs waiting to be fetched
    pending: VecDeque<String>,
    /// Accepted records not yet handed out
    ready: VecDeque<ArticleRecord>,
    /// Set once pagination must not continue; the crawl is done when
    /// `pending` drains
    stop_reason: Option<StopReason>,
    stats: CrawlStats,
}

impl SiteCrawl {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn state(&self) -> &CrawlState {
        &self.state
    }

    pub fn phase(&self) -> CrawlPhase {
        self.phase
    }

    pub fn stop_reason(&self) -> Option<StopReason> {
        self.stop_reason
    }

    pub fn stats(&self) -> &CrawlStats {
        &self.stats
    }

    pub fn start_urls(&self) -> &[String] {
        &self.start_urls
    }

    pub fn strategy(&self) -> &'static str {
        self.paginator.name()
    }

    pub fn max_articles(&self) -> u32 {
        self.max_articles
    }

    /// Snapshot of the crawl's counters and stop reason
    pub fn report(&self) -> CrawlReport {
        CrawlReport {
            name: self.name.clone(),
            stop_reason: self.stop_reason,
            seen_urls: self.state.seen_urls().len(),
            stats: self.stats.clone(),
        }
    }

    /// Turns the crawl into a lazy stream of records
    pub fn into_stream(self) -> impl Stream<Item = ArticleRecord> {
        stream::unfold(self, |mut crawl| async move {
            let record = crawl.next_article().await?;
            Some((record, crawl))
        })
    }

    /// Drives the crawl until the next record is accepted
    ///
    /// Returns None once the crawl is done: quota reached, pagination
    /// exhausted with no article left to fetch, or cancelled.
    pub async fn next_article(&mut self) -> Option<ArticleRecord> {
        loop {
            if self.cancel.is_cancelled() {
                self.ready.clear();
                if !self.phase.is_terminal() {
                    self.finish(StopReason::Cancelled);
                }
                return None;
            }

            if let Some(record) = self.ready.pop_front() {
                if self.state.record_emitted(self.max_articles) {
                    self.stats.emitted += 1;
                    return Some(record);
                }
                continue;
            }

            if self.phase.is_terminal() {
                return None;
            }

            if self.state.item_count() >= self.max_articles {
                self.finish(StopReason::QuotaReached);
                return None;
            }

            if !self.pending.is_empty() {
                self.set_phase(CrawlPhase::FetchingArticle);
                self.fetch_article_batch().await;
                continue;
            }

            match self.phase {
                CrawlPhase::ListingInitial => self.fetch_listing().await,
                CrawlPhase::Paginating | CrawlPhase::FetchingArticle => {
                    self.fetch_next_page().await
                }
                CrawlPhase::Done => return None,
            }
        }
    }

    /// Fetches the start URLs and queues their links
    async fn fetch_listing(&mut self) {
        let requests: Vec<PageRequest> = self.start_urls.iter().map(PageRequest::get).collect();
        let Some(results) = self.fetch_all(&requests).await else {
            return;
        };

        let mut new_links = 0;
        for (request, result) in requests.iter().zip(results) {
            self.stats.pages_fetched += 1;
            match result {
                FetchResult::Success {
                    final_url, body, ..
                } => {
                    let links = self
                        .extractor
                        .extract_links(&body, &self.links)
                        .into_iter()
                        .map(DiscoveredLink::new)
                        .collect();
                    new_links += self.discover(links, &final_url).len();
                }
                _ => {
                    tracing::debug!("{}: listing {} failed", self.name, request.url);
                    self.stats.fetch_failures += 1;
                }
            }
        }

        self.state.record_page(new_links);
        tracing::info!("{}: listing -> {} new links", self.name, new_links);

        let cursor = self.state.cursor().clone();
        self.stop_reason = match cursor {
            Cursor::None => Some(StopReason::NoPagination),
            _ => evaluate_stop(
                new_links,
                self.state.item_count(),
                self.max_articles,
                self.paginator.cap_reached(&cursor, 0),
            ),
        };
        self.set_phase(CrawlPhase::Paginating);
    }

    /// Requests the next continuation page, unless pagination has stopped
    async fn fetch_next_page(&mut self) {
        if let Some(reason) = self.stop_reason {
            self.finish(reason);
            return;
        }

        let cursor = self.state.cursor().clone();
        let request = match self.paginator.request(&cursor, &self.referer) {
            Some(request) => request,
            None => {
                self.finish(StopReason::NoPagination);
                return;
            }
        };

        self.set_phase(CrawlPhase::Paginating);
        let Some(result) = self.fetch_one(&request).await else {
            return;
        };
        self.stats.pages_fetched += 1;
        self.stats.continuation_pages += 1;

        let outcome = match result {
            FetchResult::Success {
                final_url, body, ..
            } => (
                self.paginator
                    .decode(&body, self.extractor.as_ref(), &self.links),
                final_url,
            ),
            _ => {
                self.stats.fetch_failures += 1;
                (
                    PageOutcome::Exhausted(StopReason::FetchFailed),
                    request.url.clone(),
                )
            }
        };

        match outcome {
            (PageOutcome::Exhausted(reason), _) => {
                self.state.record_page(0);
                tracing::info!("{}: {} at {} -> {}", self.name, self.paginator.name(), cursor, reason);
                self.stop_reason = Some(reason);
            }
            (PageOutcome::Links(links), base) => {
                let found = links.len();
                let new_links = self.discover(links, &base);
                self.state.record_page(new_links.len());

                let next = self.paginator.advance(&cursor, &new_links);
                tracing::info!(
                    "{}: {} at {} -> {} links, {} new",
                    self.name,
                    self.paginator.name(),
                    cursor,
                    found,
                    new_links.len()
                );

                self.stop_reason = evaluate_stop(
                    new_links.len(),
                    self.state.item_count(),
                    self.max_articles,
                    self.paginator
                        .cap_reached(&next, self.stats.continuation_pages),
                );
                self.state.set_cursor(next);
            }
        }
    }

    /// Fetches queued articles, never more than the quota still allows
    async fn fetch_article_batch(&mut self) {
        let remaining = self.max_articles.saturating_sub(self.state.item_count()) as usize;
        let count = self.concurrency.min(remaining).min(self.pending.len());
        let requests: Vec<PageRequest> = self
            .pending
            .drain(..count)
            .map(PageRequest::get)
            .collect();

        let Some(results) = self.fetch_all(&requests).await else {
            return;
        };

        for (request, result) in requests.into_iter().zip(results) {
            self.stats.articles_fetched += 1;
            match result.into_body() {
                Some(body) => match self.accept(request.url, &body) {
                    Some(record) => self.ready.push_back(record),
                    None => self.stats.rejected += 1,
                },
                None => {
                    tracing::debug!("{}: article fetch failed", self.name);
                    self.stats.fetch_failures += 1;
                }
            }
        }
    }

    /// Builds a record from an article page, or None if it is rejected
    ///
    /// Only a missing or short body rejects an article; title, date and
    /// author may be missing.
    fn accept(&self, url: String, content: &str) -> Option<ArticleRecord> {
        let article = self.extractor.extract_article(content, &self.article);
        let body = article.body?;

        let record = ArticleRecord::new(url, &body, self.language.as_str(), &self.section)
            .with_title(article.title)
            .with_date(article.date)
            .with_author(article.author.or_else(|| self.default_author.clone()));

        if record.body.is_empty() || record.tokens < self.min_body_words {
            tracing::debug!(
                "{}: rejected {} ({} words)",
                self.name,
                record.url,
                record.tokens
            );
            return None;
        }

        Some(record)
    }

    /// Resolves, filters and deduplicates links, queueing the new ones
    ///
    /// Returns the links that were new to this crawl, resolved.
    fn discover(&mut self, links: Vec<DiscoveredLink>, base: &str) -> Vec<DiscoveredLink> {
        let Ok(base) = Url::parse(base) else {
            return Vec::new();
        };

        let mut new_links = Vec::new();
        for link in links {
            self.stats.links_found += 1;

            let Some(url) = resolve_link(&link.url, &base) else {
                continue;
            };
            if !is_allowed(&url, &self.allowed_domains) {
                continue;
            }

            let url = url.to_string();
            if self.state.discover(&url) {
                self.pending.push_back(url.clone());
                new_links.push(DiscoveredLink { url, id: link.id });
            }
        }

        self.stats.new_links += new_links.len() as u32;
        new_links
    }

    /// Fetches requests concurrently; None if cancelled first
    async fn fetch_all(&self, requests: &[PageRequest]) -> Option<Vec<FetchResult>> {
        let fetches = join_all(requests.iter().map(|request| self.fetcher.fetch(request)));

        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => None,
            results = fetches => Some(results),
        }
    }

    async fn fetch_one(&self, request: &PageRequest) -> Option<FetchResult> {
        self.fetch_all(std::slice::from_ref(request))
            .await?
            .into_iter()
            .next()
    }

    fn set_phase(&mut self, next: CrawlPhase) {
        if self.phase == next {
            return;
        }
        debug_assert!(
            self.phase.can_transition_to(next),
            "invalid transition {} -> {}",
            self.phase,
            next
        );
        self.phase = next;
    }

    fn finish(&mut self, reason: StopReason) {
        self.stop_reason = Some(reason);
        self.pending.clear();
        self.set_phase(CrawlPhase::Done);
        tracing::info!(
            "{}: done ({}) after {} pages, {} articles emitted",
            self.name,
            reason,
            self.stats.pages_fetched,
            self.stats.emitted
        );
    }
}
