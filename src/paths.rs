//! Shared name sanitization and per-page folder naming.

use std::io;
use std::path::{Path, PathBuf};

/// Maximum length of a sanitized page-folder name.
pub const FOLDER_NAME_MAX_LEN: usize = 80;

/// Collapses runs of non-alphanumeric characters to single underscores,
/// trims leading/trailing underscores, and truncates to `max_len` characters.
///
/// Returns `"untitled"` when nothing survives sanitization.
#[must_use]
pub fn sanitize(name: &str, max_len: usize) -> String {
    let mut out = String::with_capacity(name.len());
    let mut prev_sep = false;
    for ch in name.chars() {
        if ch.is_ascii_alphanumeric() {
            out.push(ch);
            prev_sep = false;
        } else if !prev_sep {
            out.push('_');
            prev_sep = true;
        }
    }
    let trimmed: String = out.trim_matches('_').chars().take(max_len).collect();
    if trimmed.is_empty() {
        "untitled".to_string()
    } else {
        trimmed
    }
}

/// Derives a folder name from the last meaningful path segment of a URL.
#[must_use]
pub fn url_to_folder_name(url: &str) -> String {
    let path = url::Url::parse(url)
        .map(|u| u.path().to_string())
        .unwrap_or_default();
    let segment = path.trim_end_matches('/').rsplit('/').next().unwrap_or("");
    if segment.is_empty() {
        "untitled".to_string()
    } else {
        sanitize(segment, FOLDER_NAME_MAX_LEN)
    }
}

/// Returns (and creates) the output folder for one page.
///
/// Prefers the sanitized page title; falls back to the last URL segment.
///
/// # Errors
///
/// Returns an error if the folder cannot be created.
pub fn folder_for_page(
    title: Option<&str>,
    page_url: &str,
    output_dir: &Path,
) -> io::Result<PathBuf> {
    let name = match title.map(str::trim).filter(|t| !t.is_empty()) {
        Some(title) => sanitize(title, FOLDER_NAME_MAX_LEN),
        None => url_to_folder_name(page_url),
    };
    let folder = output_dir.join(name);
    std::fs::create_dir_all(&folder)?;
    Ok(folder)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn sanitize_collapses_runs_to_single_underscore() {
        assert_eq!(sanitize("a  -- b", 80), "a_b");
        assert_eq!(sanitize("hello, world!", 80), "hello_world");
    }

    #[test]
    fn sanitize_trims_leading_and_trailing_separators() {
        assert_eq!(sanitize("--title--", 80), "title");
    }

    #[test]
    fn sanitize_truncates_to_max_len() {
        assert_eq!(sanitize(&"x".repeat(100), 10), "x".repeat(10));
    }

    #[test]
    fn sanitize_falls_back_to_untitled() {
        assert_eq!(sanitize("", 80), "untitled");
        assert_eq!(sanitize("!!!", 80), "untitled");
    }

    #[test]
    fn url_to_folder_name_uses_last_segment() {
        assert_eq!(
            url_to_folder_name("https://example.com/articles/my-post/"),
            "my_post"
        );
        assert_eq!(
            url_to_folder_name("https://example.com/articles/my-post?page=2"),
            "my_post"
        );
    }

    #[test]
    fn url_to_folder_name_bare_host_is_untitled() {
        assert_eq!(url_to_folder_name("https://example.com/"), "untitled");
        assert_eq!(url_to_folder_name("https://example.com"), "untitled");
    }

    #[test]
    fn folder_for_page_prefers_title() {
        let temp = TempDir::new().unwrap();
        let folder =
            folder_for_page(Some("My Page!"), "https://example.com/other", temp.path()).unwrap();
        assert_eq!(folder, temp.path().join("My_Page"));
        assert!(folder.is_dir());
    }

    #[test]
    fn folder_for_page_falls_back_to_url_segment() {
        let temp = TempDir::new().unwrap();
        let folder = folder_for_page(Some("   "), "https://example.com/posts/one", temp.path())
            .unwrap();
        assert_eq!(folder, temp.path().join("one"));

        let folder = folder_for_page(None, "https://example.com/posts/two", temp.path()).unwrap();
        assert_eq!(folder, temp.path().join("two"));
    }
}
