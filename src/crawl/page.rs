// Course detail pages.
//
// Each detail page carries the description in its main content element
// (`id="content"`); navigation, footers and scripts around it are noise for
// the summarizer. Fetching sits behind the `PageSource` trait so the
// summarize pipeline can run against canned pages in tests.

use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use tracing::debug;

use super::html;

/// Something that turns a course URL into its description text.
#[async_trait]
pub trait PageSource: Send + Sync {
    async fn fetch_content(&self, url: &str) -> Result<String>;
}

/// HTTP page fetcher.
pub struct PageClient {
    client: Client,
}

impl PageClient {
    pub fn new() -> Result<Self> {
        let client = Client::builder()
            .user_agent(concat!("trendcover/", env!("CARGO_PKG_VERSION")))
            .timeout(Duration::from_secs(30))
            .build()
            .context("Failed to build HTTP client")?;
        Ok(Self { client })
    }
}

#[async_trait]
impl PageSource for PageClient {
    async fn fetch_content(&self, url: &str) -> Result<String> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .with_context(|| format!("Failed to fetch {url}"))?;

        if !response.status().is_success() {
            anyhow::bail!("{} returned {}", url, response.status());
        }

        let body = response
            .text()
            .await
            .with_context(|| format!("Failed to read body of {url}"))?;

        let content = extract_content(&body);
        debug!(url = url, html_bytes = body.len(), text_chars = content.chars().count(), "Fetched page");

        if content.is_empty() {
            anyhow::bail!("{url} has no readable content");
        }
        Ok(content)
    }
}

/// Plain text of the page's main content.
///
/// Looks for `id="content"` first, then `<main>`, then `<body>`, and falls
/// back to the whole document.
pub fn extract_content(html_doc: &str) -> String {
    let region = html::element_by_id(html_doc, "content")
        .or_else(|| html::element_by_tag(html_doc, "main"))
        .or_else(|| html::element_by_tag(html_doc, "body"))
        .unwrap_or(html_doc);
    html::to_text(region)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_prefers_content_element() {
        let page = r#"<html><head><style>p{}</style></head><body>
            <nav><a href="/">Home</a></nav>
            <main id="content"><h1>Minor Vision</h1><p>Image recognition &amp; robotics.</p>
            <script>track()</script></main>
            <footer>Contact</footer></body></html>"#;
        assert_eq!(
            extract_content(page),
            "Minor Vision\nImage recognition & robotics."
        );
    }

    #[test]
    fn test_extract_falls_back_to_body() {
        let page = "<html><body><p>Only body</p></body></html>";
        assert_eq!(extract_content(page), "Only body");
    }

    #[test]
    fn test_extract_plain_fragment() {
        assert_eq!(extract_content("just text"), "just text");
    }
}
