//! Best-effort lossy recompression of downloaded images.
//!
//! JPEG and WebP files are re-encoded at the configured quality; every other
//! format is left alone. Recompression must never turn a successful download
//! into a failure: any decode/encode/IO error is logged as a warning and the
//! original file is kept. The work is CPU-bound and is dispatched by the
//! download engine onto the blocking thread pool.

use std::path::{Path, PathBuf};

use image::codecs::jpeg::JpegEncoder;
use thiserror::Error;
use tracing::{debug, warn};

/// Error type for a single recompression attempt. Only ever logged.
#[derive(Debug, Error)]
pub enum RecompressError {
    /// Decode or encode failure (corrupt file, unsupported variant).
    #[error("image error: {0}")]
    Image(#[from] image::ImageError),

    /// Failed to write the re-encoded bytes back.
    #[error("IO error writing {path}: {source}")]
    Io {
        /// The file being rewritten.
        path: PathBuf,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },
}

/// Re-encodes a JPEG or WebP file in place at the given quality (1-95).
///
/// No-op for other extensions. Failures are swallowed with a warning so a
/// bad image never fails the parent download.
pub fn recompress(path: &Path, quality: u8) {
    let ext = path
        .extension()
        .and_then(std::ffi::OsStr::to_str)
        .map(str::to_ascii_lowercase);

    let result = match ext.as_deref() {
        Some("jpg" | "jpeg") => reencode_jpeg(path, quality),
        Some("webp") => reencode_webp(path, quality),
        _ => return,
    };

    match result {
        Ok(bytes) => debug!(path = %path.display(), bytes, quality, "recompressed"),
        Err(error) => {
            warn!(path = %path.display(), %error, "recompression skipped");
        }
    }
}

/// Re-encodes a JPEG at `quality`, flattening alpha/palette modes to RGB
/// first (JPEG cannot represent an alpha channel).
fn reencode_jpeg(path: &Path, quality: u8) -> Result<u64, RecompressError> {
    let img = image::open(path)?;
    let rgb = img.into_rgb8();

    // Encode fully in memory so a failed encode cannot truncate the original.
    let mut buf = Vec::new();
    let mut encoder = JpegEncoder::new_with_quality(&mut buf, quality);
    encoder.encode_image(&rgb)?;

    write_back(path, &buf)
}

/// Re-encodes a WebP at `quality` using lossy compression.
fn reencode_webp(path: &Path, quality: u8) -> Result<u64, RecompressError> {
    let img = image::open(path)?;
    let rgba = img.into_rgba8();
    let (width, height) = rgba.dimensions();

    let encoded = webp::Encoder::from_rgba(rgba.as_raw(), width, height).encode(f32::from(quality));

    write_back(path, &encoded)
}

fn write_back(path: &Path, bytes: &[u8]) -> Result<u64, RecompressError> {
    std::fs::write(path, bytes).map_err(|source| RecompressError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(bytes.len() as u64)
}
