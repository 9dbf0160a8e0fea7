//! State module for tracking crawl progress
//!
//! This module provides the per-crawl state machine and bookkeeping.
//!
//! # Components
//!
//! - `CrawlPhase`: Where a site crawl is in its listing/pagination/article loop
//! - `CrawlState`: Seen URLs, emitted count and pagination cursor of one crawl
//! - `StopReason`: Why a crawl stopped paginating or finished
//! - `HostState`: Per-host request bookkeeping for politeness delays

mod crawl_state;
mod host_state;
mod phase;

// Re-export main types
pub use crawl_state::{evaluate_stop, CrawlState, Cursor, StopReason};
pub use host_state::HostState;
pub use phase::CrawlPhase;
