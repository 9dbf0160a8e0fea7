//! Crawl and conversion reports
//!
//! This module provides the per-run summaries printed at the end of a
//! crawl or a batch conversion.

use crate::state::StopReason;
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;

/// Counters kept by one site crawl
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CrawlStats {
    /// Listing and continuation pages requested
    pub pages_fetched: u32,

    /// Continuation pages requested (pagination only)
    pub continuation_pages: u32,

    /// Links extracted from pages, duplicates included
    pub links_found: u32,

    /// Links that were new to the crawl and got queued
    pub new_links: u32,

    /// Article pages requested
    pub articles_fetched: u32,

    /// Records emitted
    pub emitted: u32,

    /// Articles dropped (no body or too short)
    pub rejected: u32,

    /// Requests that failed or returned a non-2xx status
    pub fetch_failures: u32,
}

/// Final state of one site crawl (a target, or one of its divisions)
#[derive(Debug, Clone)]
pub struct CrawlReport {
    pub name: String,
    pub stop_reason: Option<StopReason>,
    pub seen_urls: usize,
    pub stats: CrawlStats,
}

/// Outcome of crawling one target into its corpus
#[derive(Debug, Clone, Default)]
pub struct HarvestSummary {
    pub target: String,
    pub reports: Vec<CrawlReport>,

    /// Records appended to the corpus
    pub written: u32,

    /// Records skipped because the corpus already had their URL
    pub duplicates: u32,

    /// Requests per host, as counted by the fetcher
    pub requests_per_host: BTreeMap<String, u32>,

    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
}

impl HarvestSummary {
    /// Wall-clock duration of the harvest, once finished
    pub fn duration_seconds(&self) -> Option<i64> {
        match (self.started_at, self.finished_at) {
            (Some(started), Some(finished)) => Some((finished - started).num_seconds()),
            _ => None,
        }
    }
}

/// Counters for one converter batch
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConversionReport {
    pub batch: String,

    /// Records appended to the corpus
    pub added: u32,

    /// Records whose URL was already in the corpus
    pub skipped_duplicate: u32,

    /// Records with an empty or too short body, or a required title missing
    pub skipped_empty: u32,

    /// Records without a usable URL
    pub skipped_bad: u32,

    /// Lines or rows that could not be parsed
    pub malformed: u32,
}

impl ConversionReport {
    pub fn new(batch: impl Into<String>) -> Self {
        Self {
            batch: batch.into(),
            ..Self::default()
        }
    }

    /// Total records looked at, malformed input included
    pub fn total(&self) -> u32 {
        self.added + self.skipped_duplicate + self.skipped_empty + self.skipped_bad + self.malformed
    }
}

/// Prints a harvest summary to stdout in a formatted manner
pub fn print_harvest_summary(summary: &HarvestSummary) {
    println!("=== Harvest: {} ===\n", summary.target);

    for report in &summary.reports {
        let reason = report
            .stop_reason
            .map(|r| r.to_string())
            .unwrap_or_else(|| "running".to_string());
        println!("  {} (stopped: {})", report.name, reason);
        println!(
            "    pages: {} ({} continuation), links: {} ({} new), seen: {}",
            report.stats.pages_fetched,
            report.stats.continuation_pages,
            report.stats.links_found,
            report.stats.new_links,
            report.seen_urls
        );
        println!(
            "    articles: {} fetched, {} emitted, {} rejected, {} fetch failures",
            report.stats.articles_fetched,
            report.stats.emitted,
            report.stats.rejected,
            report.stats.fetch_failures
        );
    }

    println!();
    println!("  Written: {}", summary.written);
    println!("  Already in corpus: {}", summary.duplicates);
    if let Some(seconds) = summary.duration_seconds() {
        println!("  Duration: {} seconds", seconds);
    }

    if !summary.requests_per_host.is_empty() {
        println!("  Requests per host:");
        for (host, count) in &summary.requests_per_host {
            println!("    {}: {}", host, count);
        }
    }
    println!();
}

/// Prints a conversion report to stdout in a formatted manner
pub fn print_conversion_report(report: &ConversionReport) {
    println!("=== Batch: {} ===\n", report.batch);
    println!("  Added: {}", report.added);
    println!("  Skipped (duplicate): {}", report.skipped_duplicate);
    println!("  Skipped (empty): {}", report.skipped_empty);
    println!("  Skipped (bad url): {}", report.skipped_bad);
    println!("  Malformed: {}", report.malformed);
    println!("  Total: {}", report.total());
    println!();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_conversion_total() {
        let report = ConversionReport {
            batch: "prothomalo".to_string(),
            added: 5,
            skipped_duplicate: 2,
            skipped_empty: 1,
            skipped_bad: 1,
            malformed: 3,
        };
        assert_eq!(report.total(), 12);
    }

    #[test]
    fn test_harvest_duration() {
        let started = Utc::now();
        let mut summary = HarvestSummary {
            target: "dailystar".to_string(),
            started_at: Some(started),
            ..HarvestSummary::default()
        };
        assert_eq!(summary.duration_seconds(), None);

        summary.finished_at = Some(started + chrono::Duration::seconds(90));
        assert_eq!(summary.duration_seconds(), Some(90));
    }

    #[test]
    fn test_conversion_report_new() {
        let report = ConversionReport::new("newage");
        assert_eq!(report.batch, "newage");
        assert_eq!(report.total(), 0);
    }
}
