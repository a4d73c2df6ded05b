//! Progress bars and run statistics.
//!
//! An outer bar tracks pages, an inner bar tracks the current image batch.
//! Both are suppressible with `--no-progress`; statistics are collected
//! either way. Counters are atomic because download tasks record outcomes
//! from parallel tasks.

use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use indicatif::{MultiProgress, ProgressBar, ProgressStyle};

/// Aggregate counters for one crawl run.
#[derive(Debug, Default)]
pub struct CrawlStats {
    pages_total: AtomicUsize,
    pages_processed: AtomicUsize,
    images_found: AtomicUsize,
    images_downloaded: AtomicUsize,
    images_skipped: AtomicUsize,
    images_failed: AtomicUsize,
}

impl CrawlStats {
    /// Pages the run set out to crawl.
    #[must_use]
    pub fn pages_total(&self) -> usize {
        self.pages_total.load(Ordering::SeqCst)
    }

    /// Pages that reached a terminal state (crawled or skipped with warning).
    #[must_use]
    pub fn pages_processed(&self) -> usize {
        self.pages_processed.load(Ordering::SeqCst)
    }

    /// Image URLs extracted across all pages.
    #[must_use]
    pub fn images_found(&self) -> usize {
        self.images_found.load(Ordering::SeqCst)
    }

    /// Images fetched and written this run.
    #[must_use]
    pub fn images_downloaded(&self) -> usize {
        self.images_downloaded.load(Ordering::SeqCst)
    }

    /// Images skipped as duplicates or by dry-run.
    #[must_use]
    pub fn images_skipped(&self) -> usize {
        self.images_skipped.load(Ordering::SeqCst)
    }

    /// Images whose fetch or write failed.
    #[must_use]
    pub fn images_failed(&self) -> usize {
        self.images_failed.load(Ordering::SeqCst)
    }
}

/// Two-level progress display shared between the crawl driver and the
/// download engine.
#[derive(Debug)]
pub struct CrawlProgress {
    stats: CrawlStats,
    multi: Option<MultiProgress>,
    page_bar: Option<ProgressBar>,
    image_bar: Mutex<Option<ProgressBar>>,
}

impl CrawlProgress {
    /// Creates the tracker; bars are disabled entirely when `no_progress`.
    #[must_use]
    pub fn new(total_pages: usize, no_progress: bool) -> Self {
        let stats = CrawlStats::default();
        stats.pages_total.store(total_pages, Ordering::SeqCst);

        let (multi, page_bar) = if no_progress {
            (None, None)
        } else {
            let multi = MultiProgress::new();
            let bar = multi.add(ProgressBar::new(total_pages as u64));
            bar.set_style(bar_style("Pages   "));
            (Some(multi), Some(bar))
        };

        Self {
            stats,
            multi,
            page_bar,
            image_bar: Mutex::new(None),
        }
    }

    /// Read-only view of the counters.
    #[must_use]
    pub fn stats(&self) -> &CrawlStats {
        &self.stats
    }

    /// Marks the beginning of a page; the page URL tail is shown as the
    /// bar's message.
    pub fn start_page(&self, url: &str) {
        if let Some(bar) = &self.page_bar {
            let tail = url.char_indices().rev().nth(59).map_or(url, |(i, _)| &url[i..]);
            bar.set_message(tail.to_string());
        }
    }

    /// Marks a page as processed with `image_count` extracted images.
    pub fn finish_page(&self, image_count: usize) {
        self.stats.pages_processed.fetch_add(1, Ordering::SeqCst);
        self.stats.images_found.fetch_add(image_count, Ordering::SeqCst);
        if let Some(bar) = &self.page_bar {
            bar.inc(1);
        }
    }

    /// Replaces the inner bar with one sized for the next image batch.
    pub fn start_image_batch(&self, count: usize) {
        let Some(multi) = &self.multi else { return };
        let mut slot = lock_image_bar(&self.image_bar);
        if let Some(old) = slot.take() {
            old.finish_and_clear();
        }
        if count > 0 {
            let bar = multi.add(ProgressBar::new(count as u64));
            bar.set_style(bar_style("  Images"));
            *slot = Some(bar);
        }
    }

    /// Records a successful download.
    pub fn record_downloaded(&self) {
        self.stats.images_downloaded.fetch_add(1, Ordering::SeqCst);
        self.tick_image_bar();
    }

    /// Records a skipped image (duplicate or dry-run).
    pub fn record_skipped(&self) {
        self.stats.images_skipped.fetch_add(1, Ordering::SeqCst);
        self.tick_image_bar();
    }

    /// Records a failed image.
    pub fn record_failed(&self) {
        self.stats.images_failed.fetch_add(1, Ordering::SeqCst);
        self.tick_image_bar();
    }

    /// Finishes all bars and prints the run summary.
    pub fn close(&self) {
        if let Some(bar) = lock_image_bar(&self.image_bar).take() {
            bar.finish_and_clear();
        }
        if let Some(bar) = &self.page_bar {
            bar.finish_and_clear();
        }

        let s = &self.stats;
        println!(
            "\n--- Crawl summary ---\n\
             \x20 Pages processed : {}/{}\n\
             \x20 Images found    : {}\n\
             \x20 Downloaded      : {}\n\
             \x20 Skipped (dup)   : {}\n\
             \x20 Failed          : {}\n",
            s.pages_processed(),
            s.pages_total(),
            s.images_found(),
            s.images_downloaded(),
            s.images_skipped(),
            s.images_failed()
        );
    }

    fn tick_image_bar(&self) {
        if let Some(bar) = lock_image_bar(&self.image_bar).as_ref() {
            bar.inc(1);
        }
    }
}

fn bar_style(prefix: &str) -> ProgressStyle {
    ProgressStyle::with_template(&format!(
        "{prefix} [{{bar:40}}] {{pos}}/{{len}} {{msg}}"
    ))
    .unwrap_or_else(|_| ProgressStyle::default_bar())
    .progress_chars("=> ")
}

fn lock_image_bar(
    slot: &Mutex<Option<ProgressBar>>,
) -> std::sync::MutexGuard<'_, Option<ProgressBar>> {
    match slot.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stats_track_all_outcome_kinds() {
        let progress = CrawlProgress::new(3, true);
        progress.start_page("https://example.com/a");
        progress.start_image_batch(4);
        progress.record_downloaded();
        progress.record_downloaded();
        progress.record_skipped();
        progress.record_failed();
        progress.finish_page(4);

        let stats = progress.stats();
        assert_eq!(stats.pages_total(), 3);
        assert_eq!(stats.pages_processed(), 1);
        assert_eq!(stats.images_found(), 4);
        assert_eq!(stats.images_downloaded(), 2);
        assert_eq!(stats.images_skipped(), 1);
        assert_eq!(stats.images_failed(), 1);
    }

    #[test]
    fn no_progress_mode_has_no_bars() {
        let progress = CrawlProgress::new(1, true);
        progress.start_image_batch(10);
        // No panic, no bars; counters still work.
        progress.record_skipped();
        assert_eq!(progress.stats().images_skipped(), 1);
    }
}
