//! Filename derivation and collision-free path resolution for downloads.
//!
//! A local filename is derived from the last path segment of the image URL
//! (query string stripped). The stem is sanitized and the extension is kept
//! only when it looks like a real file extension. Collisions against files
//! already on disk or paths reserved by in-flight downloads are resolved by
//! appending `_1`, `_2`, ... before the extension.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use crate::paths::sanitize;

/// Maximum length of a sanitized filename stem.
const MAX_STEM_LEN: usize = 195;

/// Maximum extension length (after the dot) considered a real extension.
const MAX_EXT_LEN: usize = 5;

/// Returns the base (no collision suffix) candidate path for an image URL.
///
/// Uses the exact same sanitization rules as [`resolve`] so both agree on
/// which local file a URL maps to.
#[must_use]
pub fn base_path(image_url: &str, folder: &Path) -> PathBuf {
    let (stem, ext) = stem_and_extension(image_url);
    folder.join(format!("{stem}{ext}"))
}

/// Derives a unique local path for an image URL.
///
/// The first candidate is the bare `stem.ext`; if that file already exists
/// or the path is reserved by a concurrent download, numeric suffixes are
/// appended until a free name is found. Deterministic given its inputs; the
/// filesystem is only consulted for existence checks.
#[must_use]
pub fn resolve(image_url: &str, folder: &Path, reserved: &HashSet<PathBuf>) -> PathBuf {
    let (stem, ext) = stem_and_extension(image_url);

    let mut counter = 0usize;
    loop {
        let name = if counter == 0 {
            format!("{stem}{ext}")
        } else {
            format!("{stem}_{counter}{ext}")
        };
        let candidate = folder.join(name);
        if !candidate.exists() && !reserved.contains(&candidate) {
            return candidate;
        }
        counter += 1;
    }
}

/// Splits the URL-derived raw name into a sanitized stem and a normalized
/// extension (including the leading dot, or empty when dropped).
fn stem_and_extension(image_url: &str) -> (String, String) {
    let raw_name = raw_name_from_url(image_url);

    let (raw_stem, raw_ext) = match raw_name.rfind('.') {
        // A leading dot is a hidden-file name, not an extension separator.
        Some(idx) if idx > 0 => (&raw_name[..idx], &raw_name[idx + 1..]),
        _ => (raw_name, ""),
    };

    let stem = if raw_stem.is_empty() {
        "image".to_string()
    } else {
        sanitize(raw_stem, MAX_STEM_LEN)
    };

    let ext = if (1..=MAX_EXT_LEN).contains(&raw_ext.len())
        && raw_ext.chars().all(|c| c.is_ascii_alphanumeric())
    {
        format!(".{}", raw_ext.to_ascii_lowercase())
    } else {
        String::new()
    };

    (stem, ext)
}

/// Extracts the last path segment of a URL, stripped of query and fragment.
/// Falls back to the literal name `image` when the segment is empty.
fn raw_name_from_url(image_url: &str) -> &str {
    let without_fragment = image_url.split('#').next().unwrap_or("");
    let without_query = without_fragment.split('?').next().unwrap_or("");
    let segment = without_query.rsplit('/').next().unwrap_or("");
    if segment.is_empty() { "image" } else { segment }
}
