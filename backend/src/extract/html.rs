//! HTML page decoding and fetching.
//!
//! [`parse_html`] reads the JSON-LD blocks and the generic metadata out of a
//! page; [`PageFetcher`] downloads a page first. A failed request is reported
//! once and never retried.

use reqwest::header::USER_AGENT;
use scraper::{Html, Selector};
use serde_json::Value;
use std::time::Duration;
use url::Url;

use super::{ExternalDocument, PageMetadata};
use crate::error::{ExtractError, ExtractResult};

/// Browser-like agent; many shops refuse obvious bots.
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36";

/// Default request timeout in seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 10;

// =============================================================================
// Decoding
// =============================================================================

/// Decode a page into an [`ExternalDocument`].
///
/// Script blocks that are not valid JSON are skipped. Relative canonical and
/// image URLs are resolved against `source_url` when it is given.
pub fn parse_html(html: &str, source_url: Option<&str>) -> ExternalDocument {
    let document = Html::parse_document(html);
    let base = source_url.and_then(|u| Url::parse(u).ok());

    let metadata = PageMetadata {
        title: first_text(&document, "title"),
        description: first_attr(&document, r#"meta[name="description"]"#, "content"),
        canonical_url: first_attr(&document, r#"link[rel="canonical"]"#, "href")
            .map(|href| resolve(base.as_ref(), href)),
        image: first_attr(&document, r#"meta[property="og:image"]"#, "content")
            .map(|src| resolve(base.as_ref(), src)),
    };

    ExternalDocument {
        source_url: source_url.map(str::to_string),
        structured_data: json_ld_blocks(&document),
        metadata,
    }
}

fn json_ld_blocks(document: &Html) -> Vec<Value> {
    let Ok(selector) = Selector::parse(r#"script[type="application/ld+json"]"#) else {
        return Vec::new();
    };
    document
        .select(&selector)
        .filter_map(|script| {
            let text: String = script.text().collect();
            serde_json::from_str::<Value>(text.trim()).ok()
        })
        .collect()
}

fn first_text(document: &Html, css: &str) -> Option<String> {
    let selector = Selector::parse(css).ok()?;
    let element = document.select(&selector).next()?;
    non_empty(element.text().collect::<String>())
}

fn first_attr(document: &Html, css: &str, attr: &str) -> Option<String> {
    let selector = Selector::parse(css).ok()?;
    document
        .select(&selector)
        .find_map(|e| e.value().attr(attr).and_then(|v| non_empty(v.to_string())))
}

fn non_empty(text: String) -> Option<String> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

fn resolve(base: Option<&Url>, href: String) -> String {
    match base.and_then(|b| b.join(&href).ok()) {
        Some(url) => url.to_string(),
        None => href,
    }
}

// =============================================================================
// Fetching
// =============================================================================

/// HTTP page fetcher.
#[derive(Debug, Clone)]
pub struct PageFetcher {
    user_agent: String,
    timeout: Duration,
}

impl Default for PageFetcher {
    fn default() -> Self {
        Self {
            user_agent: DEFAULT_USER_AGENT.to_string(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }
}

impl PageFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_user_agent(mut self, user_agent: &str) -> Self {
        self.user_agent = user_agent.to_string();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Download `url` and decode it.
    pub async fn fetch(&self, url: &str) -> ExtractResult<ExternalDocument> {
        let parsed = Url::parse(url).map_err(|e| ExtractError::InvalidUrl(format!("{}: {}", url, e)))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(ExtractError::InvalidUrl(url.to_string()));
        }

        let client = reqwest::Client::builder()
            .timeout(self.timeout)
            .build()
            .map_err(|e| ExtractError::HttpError(e.to_string()))?;

        let response = client
            .get(parsed)
            .header(USER_AGENT, &self.user_agent)
            .send()
            .await
            .map_err(request_error)?;

        let status = response.status();
        if !status.is_success() {
            return Err(ExtractError::Status(status.as_u16()));
        }

        let final_url = response.url().to_string();
        let body = response.text().await.map_err(request_error)?;

        Ok(parse_html(&body, Some(&final_url)))
    }
}

/// Fetch and decode a page with the default fetcher.
pub async fn fetch_document(url: &str) -> ExtractResult<ExternalDocument> {
    PageFetcher::default().fetch(url).await
}

fn request_error(e: reqwest::Error) -> ExtractError {
    if e.is_timeout() {
        ExtractError::Timeout
    } else {
        ExtractError::HttpError(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extract::extract_records;

    const PRODUCT_PAGE: &str = r#"<!doctype html>
<html>
  <head>
    <title> Trail Shoe | Shop </title>
    <meta name="description" content="Waterproof trail shoe">
    <link rel="canonical" href="/p/trail-shoe">
    <meta property="og:image" content="https://cdn.example/shoe.jpg">
    <script type="application/ld+json">
      {"@context": "https://schema.org/", "@type": "Product", "name": "Trail Shoe",
       "offers": {"@type": "Offer", "price": "79.99", "priceCurrency": "USD"}}
    </script>
    <script type="application/ld+json">{ not json }</script>
  </head>
  <body></body>
</html>"#;

    #[test]
    fn test_parse_html_metadata() {
        let document = parse_html(PRODUCT_PAGE, Some("https://shop.example/p/trail-shoe?ref=ad"));

        assert_eq!(document.metadata.title.as_deref(), Some("Trail Shoe | Shop"));
        assert_eq!(document.metadata.description.as_deref(), Some("Waterproof trail shoe"));
        assert_eq!(
            document.metadata.canonical_url.as_deref(),
            Some("https://shop.example/p/trail-shoe")
        );
        assert_eq!(document.metadata.image.as_deref(), Some("https://cdn.example/shoe.jpg"));
    }

    #[test]
    fn test_parse_html_skips_invalid_json_ld() {
        let document = parse_html(PRODUCT_PAGE, None);
        assert_eq!(document.structured_data.len(), 1);

        let records = extract_records(&document);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].text("title").as_deref(), Some("Trail Shoe"));
        assert_eq!(records[0].text("price").as_deref(), Some("79.99 USD"));
    }

    #[test]
    fn test_page_without_product_falls_back_to_metadata() {
        let html = r#"<html><head><title>About us</title>
            <meta property="og:image" content="/logo.png"></head></html>"#;
        let document = parse_html(html, Some("https://shop.example/about"));
        let records = extract_records(&document);

        assert_eq!(records.len(), 1);
        assert_eq!(records[0].text("title").as_deref(), Some("About us"));
        assert_eq!(records[0].text("link").as_deref(), Some("https://shop.example/about"));
        assert_eq!(records[0].text("image_link").as_deref(), Some("https://shop.example/logo.png"));
    }

    #[tokio::test]
    async fn test_fetch_rejects_invalid_url() {
        let result = fetch_document("not a url").await;
        assert!(matches!(result, Err(ExtractError::InvalidUrl(_))));

        let result = fetch_document("ftp://shop.example/p").await;
        assert!(matches!(result, Err(ExtractError::InvalidUrl(_))));
    }
}
