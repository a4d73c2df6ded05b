//! Runtime configuration for one crawl run.
//!
//! Built by the CLI layer from already-validated arguments; the library
//! treats every field as trusted.

use std::path::PathBuf;
use std::time::Duration;

/// Validated crawl configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Text file containing page URLs, one per line.
    pub urls_file: PathBuf,
    /// CSS selector matching image elements.
    pub selector: String,
    /// CSS selector for the per-page folder title; page skipped when absent.
    pub title_selector: String,
    /// Output root directory.
    pub output: PathBuf,
    /// Max concurrent image downloads per page (1-50).
    pub concurrency: usize,
    /// Seconds to wait between page requests.
    pub delay: f64,
    /// Per-request timeout.
    pub timeout: Duration,
    /// User-Agent header for all requests.
    pub user_agent: String,
    /// Re-download images recorded in the ledger.
    pub redownload: bool,
    /// List images without downloading them.
    pub dry_run: bool,
    /// Suppress progress bars.
    pub no_progress: bool,
    /// Lossy recompression quality for JPEG/WebP (1-95).
    pub image_quality: u8,
    /// Only crawl pages whose URL contains this substring.
    pub url_filter: Option<String>,
    /// Max number of pages to crawl.
    pub limit: Option<usize>,
}
