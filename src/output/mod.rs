//! Output module for crawl and conversion reports
//!
//! This module handles:
//! - Per-crawl counters and stop reasons
//! - Harvest and batch conversion summaries
//! - Printing reports at the end of a run

mod report;

pub use report::{
    print_conversion_report, print_harvest_summary, ConversionReport, CrawlReport, CrawlStats,
    HarvestSummary,
};
