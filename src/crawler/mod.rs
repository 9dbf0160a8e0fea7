//! Crawler module for site traversal and article extraction
//!
//! This module contains the core crawling logic, including:
//! - HTTP fetching with per-host politeness
//! - Link and article field extraction
//! - Pagination strategies (HTML pagers, AJAX offsets, cursors, commands)
//! - The crawl engine shared by every target
//! - Harvesting a target into its corpus

mod engine;
mod extractor;
mod fetcher;
mod pagination;
mod scheduler;

pub use engine::{CrawlEngine, SiteCrawl};
pub use extractor::{ExtractedArticle, FieldExtractor, SelectorExtractor};
pub use fetcher::{build_http_client, FetchResult, HttpFetcher, PageFetcher, PageRequest};
pub use pagination::{build_paginator, DiscoveredLink, PageOutcome, Paginator};
pub use scheduler::{ScheduledRequest, Scheduler};

use crate::config::TargetConfig;
use crate::output::HarvestSummary;
use crate::record::ArticleRecord;
use crate::storage::{CorpusError, CorpusWriter};
use chrono::Utc;
use futures::future::join_all;
use tokio::sync::mpsc;

/// Records buffered between the crawls and the corpus writer
const RECORD_BUFFER: usize = 64;

/// Crawls one target and appends its records to a corpus
///
/// This is the main entry point for harvesting. It will:
/// 1. Plan the target into sub-crawls (failing before any request on a
///    missing parameter)
/// 2. Load the URLs already in the corpus
/// 3. Drive every sub-crawl concurrently
/// 4. Append each record whose URL is not in the corpus yet
///
/// All appends go through a single writer, so the corpus file is never
/// written concurrently.
///
/// # Arguments
///
/// * `engine` - The crawl engine (fetcher, extractor, cancellation)
/// * `target` - The target to crawl
/// * `corpus` - The corpus the target writes into
///
/// # Returns
///
/// * `Ok(HarvestSummary)` - Per-crawl reports and write counts
/// * `Err(HarvestError)` - Planning failed or the corpus could not be written
pub async fn harvest_target(
    engine: &CrawlEngine,
    target: &TargetConfig,
    corpus: &mut dyn CorpusWriter,
) -> crate::Result<HarvestSummary> {
    let started_at = Utc::now();
    let crawls = engine.plan(target)?;
    let mut existing = corpus.load_existing_urls()?;

    tracing::info!(
        "Harvesting {}: {} crawl(s), {} URLs already in corpus",
        target.name,
        crawls.len(),
        existing.len()
    );

    let (tx, mut rx) = mpsc::channel::<ArticleRecord>(RECORD_BUFFER);

    let drivers = join_all(crawls.into_iter().map(|mut crawl| {
        let tx = tx.clone();
        async move {
            while let Some(record) = crawl.next_article().await {
                if tx.send(record).await.is_err() {
                    // Writer gone (corpus error); stop fetching
                    break;
                }
            }
            crawl.report()
        }
    }));
    drop(tx);

    let writer = async {
        let mut written = 0u32;
        let mut duplicates = 0u32;

        while let Some(record) = rx.recv().await {
            if existing.contains(&record.url) {
                tracing::debug!("Already in corpus: {}", record.url);
                duplicates += 1;
                continue;
            }
            corpus.append(&record)?;
            existing.insert(record.url);
            written += 1;
        }

        corpus.flush()?;
        Ok::<_, CorpusError>((written, duplicates))
    };

    let (reports, written) = tokio::join!(drivers, writer);
    let (written, duplicates) = written?;

    tracing::info!(
        "Harvested {}: {} written, {} already in corpus",
        target.name,
        written,
        duplicates
    );

    Ok(HarvestSummary {
        target: target.name.clone(),
        reports,
        written,
        duplicates,
        requests_per_host: engine.fetcher().request_counts(),
        started_at: Some(started_at),
        finished_at: Some(Utc::now()),
    })
}
