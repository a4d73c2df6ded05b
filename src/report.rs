//! Per-page crawl report.
//!
//! One row per crawled page: the page URL and any remarks (skip reason,
//! missing selector, no images). Written as CSV at the output root.

use std::path::Path;

use thiserror::Error;

/// A single report row.
#[derive(Debug, Clone)]
pub struct ReportRow {
    /// The page URL as crawled.
    pub url: String,
    /// Empty for clean pages; otherwise the warning text.
    pub remarks: String,
}

impl ReportRow {
    /// Convenience constructor.
    #[must_use]
    pub fn new(url: impl Into<String>, remarks: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            remarks: remarks.into(),
        }
    }
}

/// Error type for report writing.
#[derive(Debug, Error)]
#[error("failed to write report: {0}")]
pub struct ReportError(#[from] csv::Error);

/// Writes the crawl report to `output_path`.
///
/// # Errors
///
/// Returns [`ReportError`] when the file cannot be created or written.
pub fn write_report(rows: &[ReportRow], output_path: &Path) -> Result<(), ReportError> {
    let mut writer = csv::Writer::from_path(output_path)?;
    writer.write_record(["#", "url", "remarks"])?;
    for (i, row) in rows.iter().enumerate() {
        writer.write_record([&(i + 1).to_string(), &row.url, &row.remarks])?;
    }
    writer.flush().map_err(csv::Error::from)?;
    Ok(())
}
