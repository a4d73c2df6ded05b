//! CLI entry point for the image crawler.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{debug, info, warn};

use crawler::download::{DownloadOptions, Downloader};
use crawler::progress::CrawlProgress;
use crawler::report::{ReportRow, write_report};
use crawler::scrape::PageScraper;
use crawler::state::Ledger;
use crawler::{Config, input, paths};

mod cli;

use cli::Args;

#[tokio::main]
async fn main() -> Result<()> {
    // Parse CLI arguments first (before tracing, so --help works without logs)
    let args = Args::parse();

    // Priority: RUST_LOG env var > --log-level
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(args.log_level.clone()));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let config = args.into_config();
    debug!(?config, "configuration");

    run(config).await
}

async fn run(config: Config) -> Result<()> {
    std::fs::create_dir_all(&config.output)
        .with_context(|| format!("failed to create output dir {}", config.output.display()))?;

    let ledger = Arc::new(Ledger::load(&config.output));
    if !ledger.is_empty() {
        info!(known_urls = ledger.len(), "resuming with existing ledger");
    }

    info!(path = %config.urls_file.display(), "reading URLs");
    let mut page_urls = input::read_urls(&config.urls_file)
        .with_context(|| format!("failed to read URLs file {}", config.urls_file.display()))?;

    if let Some(pattern) = &config.url_filter {
        let before = page_urls.len();
        page_urls.retain(|u| u.contains(pattern.as_str()));
        info!(
            pattern,
            before,
            after = page_urls.len(),
            "applied url-filter"
        );
        if page_urls.is_empty() {
            warn!(pattern, "url-filter matched 0 URLs");
        }
    }

    if let Some(limit) = config.limit {
        page_urls.truncate(limit);
        info!(limit, pages = page_urls.len(), "applied page limit");
    }

    if page_urls.is_empty() {
        warn!("no page URLs found in file");
        return Ok(());
    }
    info!(pages = page_urls.len(), "pages to crawl");

    let client = reqwest::Client::builder()
        .user_agent(config.user_agent.clone())
        .build()
        .context("failed to build HTTP client")?;

    let scraper = PageScraper::new(
        client.clone(),
        config.timeout,
        &config.selector,
        &config.title_selector,
    )
    .context("invalid selector")?;

    let progress = Arc::new(CrawlProgress::new(page_urls.len(), config.no_progress));
    let downloader = Downloader::new(
        client,
        Arc::clone(&ledger),
        Arc::clone(&progress),
        DownloadOptions {
            concurrency: config.concurrency,
            timeout: config.timeout,
            dry_run: config.dry_run,
            redownload: config.redownload,
            quality: config.image_quality,
        },
    );

    // Ctrl-C stops issuing new pages; the in-flight batch finishes naturally
    // so no file is left half-written without a failure record.
    let interrupted = Arc::new(AtomicBool::new(false));
    {
        let interrupted = Arc::clone(&interrupted);
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                interrupted.store(true, Ordering::SeqCst);
                info!("interrupt received, finishing current page before saving state");
            }
        });
    }

    let mut report_rows: Vec<ReportRow> = Vec::with_capacity(page_urls.len());

    for (i, page_url) in page_urls.iter().enumerate() {
        if interrupted.load(Ordering::SeqCst) {
            break;
        }

        progress.start_page(page_url);
        debug!(url = page_url, "scraping page");
        let result = scraper.scrape(page_url).await;

        if let Some(warning) = result.warning {
            report_rows.push(ReportRow::new(page_url, warning));
            progress.finish_page(0);
        } else {
            let folder = paths::folder_for_page(result.title.as_deref(), page_url, &config.output)
                .with_context(|| format!("failed to create folder for {page_url}"))?;
            debug!(
                url = page_url,
                images = result.image_urls.len(),
                folder = %folder.display(),
                "page scraped"
            );

            if result.image_urls.is_empty() {
                report_rows.push(ReportRow::new(page_url, "No downloadable images found"));
            } else {
                downloader.download_batch(&result.image_urls, &folder).await;
                report_rows.push(ReportRow::new(page_url, ""));
            }
            progress.finish_page(result.image_urls.len());

            // Checkpoint: bounded re-download exposure on crash is one page.
            if let Err(save_error) = ledger.save() {
                warn!(error = %save_error, "failed to checkpoint ledger");
            }
        }

        if i < page_urls.len() - 1 && config.delay > 0.0 && !interrupted.load(Ordering::SeqCst) {
            tokio::time::sleep(Duration::from_secs_f64(config.delay)).await;
        }
    }

    if let Err(save_error) = ledger.save() {
        warn!(error = %save_error, "failed to save ledger on exit");
    }
    progress.close();

    let report_path = config.output.join("report.csv");
    write_report(&report_rows, &report_path)
        .with_context(|| format!("failed to write report to {}", report_path.display()))?;
    info!(path = %report_path.display(), "report written");

    Ok(())
}
