//! Durable deduplication ledger.
//!
//! The ledger is the sole source of truth for which image URLs have already
//! been fully downloaded. It is loaded once at startup and checkpointed to
//! disk by the caller at the end of each page. The on-disk format is a
//! versioned JSON object written atomically (temp file + rename) so the
//! state file is never observed half-written, even on crash mid-write.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

const STATE_VERSION: u32 = 1;
const STATE_FILENAME: &str = ".state.json";
const STATE_TMP_FILENAME: &str = ".state.json.tmp";

/// Error type for ledger persistence.
#[derive(Debug, Error)]
pub enum LedgerError {
    /// Failed to write or rename the state file.
    #[error("IO error writing ledger to {path}: {source}")]
    Io {
        /// The path where the error occurred.
        path: PathBuf,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// Failed to serialize the in-memory set.
    #[error("failed to serialize ledger: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// On-disk representation of the ledger.
#[derive(Debug, Serialize, Deserialize)]
struct StateFile {
    version: u32,
    downloaded: Vec<String>,
}

/// Durable set of URLs already fully downloaded.
///
/// Membership checks and inserts run from concurrent download tasks, so the
/// in-memory set is guarded internally. Persistence is single-writer: only
/// the crawl driver calls [`save`](Ledger::save), once per page.
#[derive(Debug)]
pub struct Ledger {
    path: PathBuf,
    tmp_path: PathBuf,
    downloaded: RwLock<HashSet<String>>,
}

impl Ledger {
    /// Loads the ledger from `output_dir`, starting empty when the state
    /// file is absent, unreadable, carries an unexpected version, or has a
    /// malformed payload. Corruption is recovered from, never propagated.
    #[must_use]
    pub fn load(output_dir: &Path) -> Self {
        let path = output_dir.join(STATE_FILENAME);
        let tmp_path = output_dir.join(STATE_TMP_FILENAME);

        let downloaded = match std::fs::read_to_string(&path) {
            Ok(text) => match parse_state(&text) {
                Ok(urls) => {
                    debug!(count = urls.len(), "loaded ledger");
                    urls
                }
                Err(error) => {
                    warn!(
                        path = %path.display(),
                        %error,
                        "state file corrupt or unreadable, starting fresh"
                    );
                    HashSet::new()
                }
            },
            Err(error) if error.kind() == std::io::ErrorKind::NotFound => HashSet::new(),
            Err(error) => {
                warn!(path = %path.display(), %error, "failed to read state file, starting fresh");
                HashSet::new()
            }
        };

        Self {
            path,
            tmp_path,
            downloaded: RwLock::new(downloaded),
        }
    }

    /// Atomically writes the ledger to disk.
    ///
    /// The full set is serialized in sorted order (for reproducible diffs)
    /// to a temp file in the same directory, then renamed over the canonical
    /// file.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError`] if serialization or any filesystem step fails.
    pub fn save(&self) -> Result<(), LedgerError> {
        let mut downloaded: Vec<String> = self.read_set().iter().cloned().collect();
        downloaded.sort();
        let count = downloaded.len();

        let state = StateFile {
            version: STATE_VERSION,
            downloaded,
        };
        let json = serde_json::to_string_pretty(&state)?;

        std::fs::write(&self.tmp_path, json).map_err(|source| LedgerError::Io {
            path: self.tmp_path.clone(),
            source,
        })?;
        std::fs::rename(&self.tmp_path, &self.path).map_err(|source| LedgerError::Io {
            path: self.path.clone(),
            source,
        })?;

        debug!(count, path = %self.path.display(), "ledger saved");
        Ok(())
    }

    /// Returns whether `url` was fully downloaded in this or a prior run.
    #[must_use]
    pub fn contains(&self, url: &str) -> bool {
        self.read_set().contains(url)
    }

    /// Records `url` as fully downloaded. Does not persist; persistence
    /// happens at the caller's checkpoint boundaries.
    pub fn mark_downloaded(&self, url: &str) {
        self.write_set().insert(url.to_string());
    }

    /// Number of URLs currently recorded.
    #[must_use]
    pub fn len(&self) -> usize {
        self.read_set().len()
    }

    /// Whether the ledger is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.read_set().is_empty()
    }

    fn read_set(&self) -> RwLockReadGuard<'_, HashSet<String>> {
        match self.downloaded.read() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    fn write_set(&self) -> RwLockWriteGuard<'_, HashSet<String>> {
        match self.downloaded.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

/// Parses and validates the state file payload.
fn parse_state(text: &str) -> Result<HashSet<String>, serde_json::Error> {
    use serde::de::Error as _;

    let state: StateFile = serde_json::from_str(text)?;
    if state.version != STATE_VERSION {
        return Err(serde_json::Error::custom(format!(
            "unexpected state version {}",
            state.version
        )));
    }
    Ok(state.downloaded.into_iter().collect())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn load_missing_file_starts_empty() {
        let temp = TempDir::new().unwrap();
        let ledger = Ledger::load(temp.path());
        assert!(ledger.is_empty());
    }

    #[test]
    fn save_then_load_round_trips() {
        let temp = TempDir::new().unwrap();
        let ledger = Ledger::load(temp.path());
        ledger.mark_downloaded("https://example.com/b.jpg");
        ledger.mark_downloaded("https://example.com/a.jpg");
        ledger.save().unwrap();

        let reloaded = Ledger::load(temp.path());
        assert_eq!(reloaded.len(), 2);
        assert!(reloaded.contains("https://example.com/a.jpg"));
        assert!(reloaded.contains("https://example.com/b.jpg"));
        assert!(!reloaded.contains("https://example.com/c.jpg"));
    }

    #[test]
    fn save_empty_and_large_sets_round_trip() {
        let temp = TempDir::new().unwrap();
        let ledger = Ledger::load(temp.path());
        ledger.save().unwrap();
        assert!(Ledger::load(temp.path()).is_empty());

        for i in 0..10_000 {
            ledger.mark_downloaded(&format!("https://example.com/{i}.jpg"));
        }
        ledger.save().unwrap();
        let reloaded = Ledger::load(temp.path());
        assert_eq!(reloaded.len(), 10_000);
        assert!(reloaded.contains("https://example.com/9999.jpg"));
    }

    #[test]
    fn save_writes_sorted_urls() {
        let temp = TempDir::new().unwrap();
        let ledger = Ledger::load(temp.path());
        ledger.mark_downloaded("https://example.com/z.jpg");
        ledger.mark_downloaded("https://example.com/a.jpg");
        ledger.save().unwrap();

        let text = std::fs::read_to_string(temp.path().join(".state.json")).unwrap();
        let a = text.find("a.jpg").unwrap();
        let z = text.find("z.jpg").unwrap();
        assert!(a < z, "expected sorted order in: {text}");
    }

    #[test]
    fn save_removes_temp_file() {
        let temp = TempDir::new().unwrap();
        let ledger = Ledger::load(temp.path());
        ledger.mark_downloaded("https://example.com/a.jpg");
        ledger.save().unwrap();
        assert!(temp.path().join(".state.json").exists());
        assert!(!temp.path().join(".state.json.tmp").exists());
    }

    #[test]
    fn load_invalid_json_starts_empty() {
        let temp = TempDir::new().unwrap();
        std::fs::write(temp.path().join(".state.json"), "not json {").unwrap();
        assert!(Ledger::load(temp.path()).is_empty());
    }

    #[test]
    fn load_wrong_version_starts_empty() {
        let temp = TempDir::new().unwrap();
        std::fs::write(
            temp.path().join(".state.json"),
            r#"{"version": 2, "downloaded": ["https://example.com/a.jpg"]}"#,
        )
        .unwrap();
        assert!(Ledger::load(temp.path()).is_empty());
    }

    #[test]
    fn load_malformed_payload_starts_empty() {
        let temp = TempDir::new().unwrap();
        std::fs::write(
            temp.path().join(".state.json"),
            r#"{"version": 1, "downloaded": "not-a-list"}"#,
        )
        .unwrap();
        assert!(Ledger::load(temp.path()).is_empty());
    }

    #[test]
    fn mark_downloaded_is_idempotent() {
        let temp = TempDir::new().unwrap();
        let ledger = Ledger::load(temp.path());
        ledger.mark_downloaded("https://example.com/a.jpg");
        ledger.mark_downloaded("https://example.com/a.jpg");
        assert_eq!(ledger.len(), 1);
    }
}
