//! URL list file reader.

use std::io;
use std::path::Path;

/// Reads page URLs from a plain text file, one per line. Blank lines and
/// lines starting with `#` are ignored.
///
/// # Errors
///
/// Returns an error when the file cannot be read.
pub fn read_urls(path: &Path) -> io::Result<Vec<String>> {
    let text = std::fs::read_to_string(path)?;
    Ok(text
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(str::to_string)
        .collect())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn skips_blank_lines_and_comments() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("urls.txt");
        std::fs::write(
            &path,
            "https://example.com/a\n\n# comment\n  https://example.com/b  \n",
        )
        .unwrap();

        let urls = read_urls(&path).unwrap();
        assert_eq!(urls, vec!["https://example.com/a", "https://example.com/b"]);
    }

    #[test]
    fn missing_file_is_an_error() {
        assert!(read_urls(Path::new("/nonexistent/urls.txt")).is_err());
    }
}
