//! Concurrent image download engine.
//!
//! The orchestrator ([`Downloader`]) consumes one page's image URLs at a
//! time, applies the skip/fetch decision per URL under bounded concurrency,
//! and drives filename resolution, the dedup ledger, and post-fetch
//! recompression. Streaming writes keep memory flat for large images.

mod engine;
mod error;
pub mod filename;

pub use engine::{DEFAULT_CONCURRENCY, DownloadOptions, DownloadOutcome, Downloader};
pub use error::DownloadError;
