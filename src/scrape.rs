//! Page fetching and CSS-selector image extraction.
//!
//! Produces the page -> {title, image-URL-list} transform consumed by the
//! download engine. Page-level problems (unreachable page, selector not
//! found) are reported as warnings on the result rather than errors, so one
//! bad page never aborts the crawl.

use std::time::Duration;

use reqwest::Client;
use scraper::{Html, Selector};
use thiserror::Error;
use tracing::{debug, warn};

/// Error raised when a CSS selector fails to parse. Selectors are validated
/// once at startup; they never fail per page.
#[derive(Debug, Error)]
#[error("invalid CSS selector: {selector}")]
pub struct ScrapeError {
    /// The selector string that failed to parse.
    pub selector: String,
}

/// Result of scraping one page.
#[derive(Debug, Clone)]
pub struct PageResult {
    /// The page URL as crawled.
    pub url: String,
    /// Extracted title, when the title selector matched.
    pub title: Option<String>,
    /// Absolute image URLs in first-seen order, de-duplicated.
    pub image_urls: Vec<String>,
    /// Set when the page was skipped or had issues; shown in the report.
    pub warning: Option<String>,
}

impl PageResult {
    fn warning(url: &str, warning: impl Into<String>) -> Self {
        Self {
            url: url.to_string(),
            title: None,
            image_urls: Vec::new(),
            warning: Some(warning.into()),
        }
    }
}

/// Fetches pages and extracts image references via CSS selectors.
pub struct PageScraper {
    client: Client,
    timeout: Duration,
    image_selector: Selector,
    title_selector: Selector,
}

impl PageScraper {
    /// Creates a scraper, validating both selector strings up front.
    ///
    /// # Errors
    ///
    /// Returns [`ScrapeError`] when either selector is not valid CSS.
    pub fn new(
        client: Client,
        timeout: Duration,
        image_selector: &str,
        title_selector: &str,
    ) -> Result<Self, ScrapeError> {
        let image_selector = parse_selector(image_selector)?;
        let title_selector = parse_selector(title_selector)?;
        Ok(Self {
            client,
            timeout,
            image_selector,
            title_selector,
        })
    }

    /// Fetches a page and extracts its title and image URLs.
    ///
    /// Transport errors and non-2xx statuses produce a warning result.
    pub async fn scrape(&self, page_url: &str) -> PageResult {
        let response = match self.client.get(page_url).timeout(self.timeout).send().await {
            Ok(response) => response,
            Err(request_error) => {
                warn!(url = page_url, error = %request_error, "failed to fetch page");
                return PageResult::warning(page_url, format!("Failed to fetch: {request_error}"));
            }
        };

        let status = response.status();
        if !status.is_success() {
            warn!(url = page_url, status = status.as_u16(), "HTTP error fetching page");
            return PageResult::warning(page_url, format!("HTTP {}", status.as_u16()));
        }

        let html = match response.text().await {
            Ok(html) => html,
            Err(body_error) => {
                warn!(url = page_url, error = %body_error, "failed to read page body");
                return PageResult::warning(page_url, format!("Failed to fetch: {body_error}"));
            }
        };

        self.parse_html(page_url, &html)
    }

    /// Extracts title and image URLs from fetched HTML.
    ///
    /// Sync on purpose: the parsed document is not `Send` and must not live
    /// across an await point.
    fn parse_html(&self, page_url: &str, html: &str) -> PageResult {
        let document = Html::parse_document(html);

        let Some(title_element) = document.select(&self.title_selector).next() else {
            warn!(url = page_url, "title selector not found, skipping page");
            return PageResult::warning(page_url, "Title selector not found");
        };
        let title = title_element.text().collect::<String>().trim().to_string();
        let title = (!title.is_empty()).then_some(title);

        let mut image_urls = Vec::new();
        let mut seen = std::collections::HashSet::new();
        let mut matched_any = false;

        for element in document.select(&self.image_selector) {
            matched_any = true;
            let src = element
                .value()
                .attr("src")
                .or_else(|| element.value().attr("data-src"))
                .unwrap_or("")
                .trim();
            if src.is_empty() || src.starts_with("data:") {
                continue;
            }
            let Some(absolute) = absolutize(page_url, src) else {
                continue;
            };
            // The same image can appear multiple times on a page.
            if seen.insert(absolute.clone()) {
                image_urls.push(absolute);
            }
        }

        if !matched_any {
            warn!(url = page_url, "image selector not found, skipping page");
            return PageResult {
                url: page_url.to_string(),
                title,
                image_urls: Vec::new(),
                warning: Some("Image selector not found".to_string()),
            };
        }

        debug!(url = page_url, images = image_urls.len(), "page scraped");
        PageResult {
            url: page_url.to_string(),
            title,
            image_urls,
            warning: None,
        }
    }
}

fn parse_selector(selector: &str) -> Result<Selector, ScrapeError> {
    Selector::parse(selector).map_err(|_| ScrapeError {
        selector: selector.to_string(),
    })
}

/// Resolves an extracted `src` against the page URL.
fn absolutize(page_url: &str, src: &str) -> Option<String> {
    let base = url::Url::parse(page_url).ok()?;
    base.join(src).ok().map(Into::into)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn scraper(image_selector: &str, title_selector: &str) -> PageScraper {
        PageScraper::new(
            Client::new(),
            Duration::from_secs(5),
            image_selector,
            title_selector,
        )
        .unwrap()
    }

    #[test]
    fn invalid_selector_is_rejected_at_construction() {
        let result = PageScraper::new(Client::new(), Duration::from_secs(5), "article img", "<<<");
        assert!(result.is_err());
    }

    #[test]
    fn extracts_absolute_image_urls_in_order() {
        let html = r#"
            <html><head><title>ignored</title></head><body>
            <h1>Gallery</h1>
            <img src="/img/a.jpg">
            <img src="https://cdn.example.com/b.png">
            <img src="../c.gif">
            </body></html>"#;
        let result =
            scraper("img", "h1").parse_html("https://example.com/pages/gallery/", html);

        assert!(result.warning.is_none());
        assert_eq!(result.title.as_deref(), Some("Gallery"));
        assert_eq!(
            result.image_urls,
            vec![
                "https://example.com/img/a.jpg",
                "https://cdn.example.com/b.png",
                "https://example.com/pages/c.gif",
            ]
        );
    }

    #[test]
    fn falls_back_to_data_src_and_skips_data_uris() {
        let html = r#"
            <html><body><h1>t</h1>
            <img data-src="/lazy.jpg">
            <img src="data:image/png;base64,AAAA">
            <img src="">
            </body></html>"#;
        let result = scraper("img", "h1").parse_html("https://example.com/", html);

        assert_eq!(result.image_urls, vec!["https://example.com/lazy.jpg"]);
    }

    #[test]
    fn deduplicates_preserving_first_seen_order() {
        let html = r#"
            <html><body><h1>t</h1>
            <img src="/a.jpg"><img src="/b.jpg"><img src="/a.jpg">
            </body></html>"#;
        let result = scraper("img", "h1").parse_html("https://example.com/", html);

        assert_eq!(
            result.image_urls,
            vec!["https://example.com/a.jpg", "https://example.com/b.jpg"]
        );
    }

    #[test]
    fn missing_title_selector_yields_warning() {
        let html = "<html><body><img src='/a.jpg'></body></html>";
        let result = scraper("img", "h1.title").parse_html("https://example.com/", html);

        assert!(result.warning.is_some());
        assert!(result.image_urls.is_empty());
    }

    #[test]
    fn missing_image_selector_yields_warning_but_keeps_title() {
        let html = "<html><body><h1>Post</h1></body></html>";
        let result = scraper("article img", "h1").parse_html("https://example.com/", html);

        assert_eq!(result.title.as_deref(), Some("Post"));
        assert!(result.warning.is_some());
    }
}
