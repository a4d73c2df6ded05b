//! Concurrent download orchestrator.
//!
//! One batch corresponds to the images of one page. All tasks in a batch run
//! concurrently under a semaphore bounding simultaneous fetches; outcomes are
//! returned in input order regardless of completion order, and one task's
//! failure never cancels its siblings.
//!
//! # Race-free name allocation
//!
//! A task claims its local filename synchronously, before its first await
//! point, by resolving against the reservation set and inserting the chosen
//! path while the set's lock is held. The only suspension points that follow
//! are the network request, the chunked file write, and the dispatched
//! recompression, so no two in-flight tasks can claim the same path.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use futures_util::StreamExt;
use reqwest::Client;
use tokio::fs::File;
use tokio::io::{AsyncWriteExt, BufWriter};
use tokio::sync::Semaphore;
use tracing::{debug, error, info, warn};

use super::error::DownloadError;
use super::filename;
use crate::progress::CrawlProgress;
use crate::recompress::recompress;
use crate::state::Ledger;

/// Default number of simultaneous in-flight image fetches.
pub const DEFAULT_CONCURRENCY: usize = 5;

/// Terminal outcome of one download task. Produced exactly once per task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DownloadOutcome {
    /// Image fetched, written, and recompressed; path is final.
    Downloaded(PathBuf),
    /// URL already in the ledger, or its base path already on disk.
    SkippedDuplicate,
    /// Dry-run mode: nothing fetched, nothing recorded.
    SkippedDryRun,
    /// Fetch or write failed; recorded once, never retried automatically.
    Failed,
}

/// Engine configuration supplied by the CLI layer (already validated there).
#[derive(Debug, Clone)]
pub struct DownloadOptions {
    /// Maximum concurrent image downloads per batch.
    pub concurrency: usize,
    /// Per-request timeout.
    pub timeout: Duration,
    /// List images without downloading them.
    pub dry_run: bool,
    /// Re-download images recorded in the ledger.
    pub redownload: bool,
    /// Lossy recompression quality (1-95).
    pub quality: u8,
}

impl Default for DownloadOptions {
    fn default() -> Self {
        Self {
            concurrency: DEFAULT_CONCURRENCY,
            timeout: Duration::from_secs(30),
            dry_run: false,
            redownload: false,
            quality: 85,
        }
    }
}

/// Concurrent image downloader for one crawl run.
///
/// Cheap to clone: tasks share the semaphore, reservation set, ledger, and
/// progress tracker through `Arc`s.
#[derive(Debug, Clone)]
pub struct Downloader {
    client: Client,
    ledger: Arc<Ledger>,
    progress: Arc<CrawlProgress>,
    semaphore: Arc<Semaphore>,
    reserved: Arc<Mutex<HashSet<PathBuf>>>,
    options: DownloadOptions,
}

impl Downloader {
    /// Creates a downloader sharing the run-wide HTTP client, ledger, and
    /// progress tracker.
    #[must_use]
    pub fn new(
        client: Client,
        ledger: Arc<Ledger>,
        progress: Arc<CrawlProgress>,
        options: DownloadOptions,
    ) -> Self {
        Self {
            client,
            ledger,
            progress,
            semaphore: Arc::new(Semaphore::new(options.concurrency)),
            reserved: Arc::new(Mutex::new(HashSet::new())),
            options,
        }
    }

    /// Downloads all images of one page concurrently, bounded by the
    /// configured limit.
    ///
    /// Returns one outcome per input URL, in input order. The call returns
    /// only once every task has reached a terminal outcome; the caller is
    /// expected to checkpoint the ledger afterwards.
    pub async fn download_batch(&self, image_urls: &[String], folder: &Path) -> Vec<DownloadOutcome> {
        self.progress.start_image_batch(image_urls.len());

        let mut handles = Vec::with_capacity(image_urls.len());
        for url in image_urls {
            let worker = self.clone();
            let url = url.clone();
            let folder = folder.to_path_buf();
            handles.push(tokio::spawn(async move {
                worker.download_one(&url, &folder).await
            }));
        }

        let mut outcomes = Vec::with_capacity(handles.len());
        for (handle, url) in handles.into_iter().zip(image_urls) {
            match handle.await {
                Ok(outcome) => outcomes.push(outcome),
                Err(join_error) => {
                    warn!(url = %url, error = %join_error, "download task panicked");
                    self.progress.record_failed();
                    outcomes.push(DownloadOutcome::Failed);
                }
            }
        }
        outcomes
    }

    /// Runs the skip/fetch decision sequence for a single URL.
    async fn download_one(&self, url: &str, folder: &Path) -> DownloadOutcome {
        let Ok(_permit) = self.semaphore.acquire().await else {
            // Closed semaphore only happens on shutdown.
            return DownloadOutcome::Failed;
        };

        if !self.options.redownload && self.ledger.contains(url) {
            debug!(url, "skipping duplicate");
            self.progress.record_skipped();
            return DownloadOutcome::SkippedDuplicate;
        }

        if self.options.dry_run {
            info!(url, "dry-run: would download");
            self.progress.record_skipped();
            return DownloadOutcome::SkippedDryRun;
        }

        let base = filename::base_path(url, folder);
        if self.options.redownload {
            // Remove the prior file so resolution reuses the original name
            // rather than allocating a numbered variant.
            if base.exists()
                && let Err(io_error) = std::fs::remove_file(&base)
            {
                warn!(path = %base.display(), error = %io_error, "failed to remove prior file");
            }
        } else if base.exists() {
            debug!(path = %base.display(), url, "file already exists, skipping");
            self.ledger.mark_downloaded(url);
            self.progress.record_skipped();
            return DownloadOutcome::SkippedDuplicate;
        }

        // Claim the filename before the first await so no concurrent task
        // can resolve to the same path while this download is in flight.
        let local_path = {
            let mut reserved = lock_reservations(&self.reserved);
            let path = filename::resolve(url, folder, &reserved);
            reserved.insert(path.clone());
            path
        };

        let fetch_result = self.fetch_and_write(url, &local_path).await;

        lock_reservations(&self.reserved).remove(&local_path);

        match fetch_result {
            Ok(()) => {
                self.recompress_written(&local_path).await;
                self.ledger.mark_downloaded(url);
                self.progress.record_downloaded();
                DownloadOutcome::Downloaded(local_path)
            }
            Err(download_error) => {
                if download_error.is_write_error() {
                    error!(url, error = %download_error, "disk write failure");
                } else {
                    warn!(url, error = %download_error, "download failed");
                }
                self.progress.record_failed();
                DownloadOutcome::Failed
            }
        }
    }

    /// Fetches `url` and streams the response body to `local_path` in chunks.
    ///
    /// A partially written file is left in place on error; the task is
    /// reported as failed either way.
    async fn fetch_and_write(&self, url: &str, local_path: &Path) -> Result<(), DownloadError> {
        let response = self
            .client
            .get(url)
            .timeout(self.options.timeout)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    DownloadError::timeout(url)
                } else {
                    DownloadError::network(url, e)
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(DownloadError::http_status(url, status.as_u16()));
        }

        let file = File::create(local_path)
            .await
            .map_err(|e| DownloadError::io(local_path, e))?;
        let mut writer = BufWriter::new(file);
        let mut stream = response.bytes_stream();

        while let Some(chunk_result) = stream.next().await {
            let chunk = chunk_result.map_err(|e| DownloadError::network(url, e))?;
            writer
                .write_all(&chunk)
                .await
                .map_err(|e| DownloadError::io(local_path, e))?;
        }

        writer
            .flush()
            .await
            .map_err(|e| DownloadError::io(local_path, e))?;

        debug!(url, path = %local_path.display(), "downloaded");
        Ok(())
    }

    /// Dispatches recompression to the blocking pool and awaits it, so batch
    /// completion reflects final on-disk state. Recompression is best-effort
    /// and never fails the download.
    async fn recompress_written(&self, local_path: &Path) {
        let path = local_path.to_path_buf();
        let quality = self.options.quality;
        if let Err(join_error) =
            tokio::task::spawn_blocking(move || recompress(&path, quality)).await
        {
            warn!(path = %local_path.display(), error = %join_error, "recompression task panicked");
        }
    }
}

fn lock_reservations(
    reserved: &Mutex<HashSet<PathBuf>>,
) -> MutexGuard<'_, HashSet<PathBuf>> {
    match reserved.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}
