//! Image crawler core library.
//!
//! This library crawls a fixed list of pages, extracts image references via a
//! CSS selector, and downloads the images into a per-page directory tree,
//! resuming safely across runs.
//!
//! # Architecture
//!
//! - [`scrape`] - page fetching and CSS-selector image extraction
//! - [`download`] - concurrent download engine with collision-free
//!   filename allocation
//! - [`state`] - durable deduplication ledger (`.state.json`)
//! - [`recompress`] - best-effort lossy re-encoding of JPEG/WebP files
//! - [`progress`] - progress bars and run statistics
//! - [`report`] - per-page crawl report

// Clippy lints - strict for library code
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod config;
pub mod download;
pub mod input;
pub mod paths;
pub mod progress;
pub mod recompress;
pub mod report;
pub mod scrape;
pub mod state;

// Re-export commonly used types
pub use config::Config;
pub use download::{DownloadError, DownloadOptions, DownloadOutcome, Downloader};
pub use progress::{CrawlProgress, CrawlStats};
pub use report::ReportRow;
pub use scrape::{PageResult, PageScraper, ScrapeError};
pub use state::Ledger;
