//! CLI argument definitions using clap derive macros.

use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;

use crawler::Config;
use crawler::download::DEFAULT_CONCURRENCY;

/// Crawl pages from a URL list file and download images via CSS selector.
#[derive(Parser, Debug)]
#[command(name = "image-crawler")]
#[command(author, version, about)]
pub struct Args {
    /// Path to a text file containing page URLs, one per line
    #[arg(long, value_parser = parse_existing_file)]
    pub urls_file: PathBuf,

    /// CSS selector to match image elements (e.g. "article img")
    #[arg(long)]
    pub selector: String,

    /// CSS selector to extract the folder title from each page; page is
    /// skipped if not found
    #[arg(long)]
    pub title_selector: String,

    /// Directory to save downloaded images
    #[arg(long, default_value = "./downloads")]
    pub output: PathBuf,

    /// Max concurrent image downloads per page (1-50)
    #[arg(long, default_value_t = DEFAULT_CONCURRENCY as u8, value_parser = clap::value_parser!(u8).range(1..=50))]
    pub concurrency: u8,

    /// Seconds to wait between page requests
    #[arg(long, default_value_t = 1.0, value_parser = parse_non_negative)]
    pub delay: f64,

    /// Request timeout in seconds
    #[arg(long, default_value_t = 30, value_parser = clap::value_parser!(u64).range(1..))]
    pub timeout: u64,

    /// User-Agent header
    #[arg(long, default_value = "image-crawler/1.0")]
    pub user_agent: String,

    /// Re-download images that were already downloaded in a previous run
    #[arg(long)]
    pub redownload: bool,

    /// Lossy compression quality for JPEG and WebP images (1-95).
    /// Has no effect on PNG, GIF, or other formats.
    #[arg(long, default_value_t = 85, value_parser = clap::value_parser!(u8).range(1..=95))]
    pub image_quality: u8,

    /// List images without downloading them
    #[arg(long)]
    pub dry_run: bool,

    /// Suppress progress bars
    #[arg(long)]
    pub no_progress: bool,

    /// Logging verbosity (overridden by RUST_LOG)
    #[arg(long, default_value = "info", value_parser = ["trace", "debug", "info", "warn", "error"])]
    pub log_level: String,

    /// Max number of pages to crawl
    #[arg(long, value_name = "N")]
    pub limit: Option<usize>,

    /// Only crawl pages whose URL contains this word or substring
    #[arg(long, value_name = "PATTERN")]
    pub url_filter: Option<String>,
}

impl Args {
    /// Converts validated arguments into the runtime configuration.
    pub fn into_config(self) -> Config {
        Config {
            urls_file: self.urls_file,
            selector: self.selector,
            title_selector: self.title_selector,
            output: self.output,
            concurrency: usize::from(self.concurrency),
            delay: self.delay,
            timeout: Duration::from_secs(self.timeout),
            user_agent: self.user_agent,
            redownload: self.redownload,
            dry_run: self.dry_run,
            no_progress: self.no_progress,
            image_quality: self.image_quality,
            url_filter: self.url_filter,
            limit: self.limit,
        }
    }
}

fn parse_existing_file(value: &str) -> Result<PathBuf, String> {
    let path = PathBuf::from(value);
    if path.is_file() {
        Ok(path)
    } else {
        Err(format!("must be an existing file path, got: {value:?}"))
    }
}

fn parse_non_negative(value: &str) -> Result<f64, String> {
    let parsed: f64 = value.parse().map_err(|e| format!("{e}"))?;
    if parsed >= 0.0 {
        Ok(parsed)
    } else {
        Err("must be >= 0".to_string())
    }
}
