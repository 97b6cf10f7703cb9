// Course listing extraction.
//
// The catalogue overview page lists every course as an `<h4>` heading that
// wraps a link to the detail page. Links are usually site-relative, so the
// configured base URL is prepended.

use std::collections::HashSet;
use std::path::Path;
use std::sync::LazyLock;

use anyhow::{Context, Result};
use regex_lite::Regex;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::html;

static HEADING: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<h4\b[^>]*>(.*?)</h4\s*>").expect("valid heading pattern"));

static ANCHOR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?is)<a\b[^>]*?\bhref\s*=\s*(?:"([^"]*)"|'([^']*)')[^>]*>(.*?)</a\s*>"#)
        .expect("valid anchor pattern")
});

/// One course found on the listing page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListingEntry {
    pub name: String,
    pub url: String,
}

/// Join a link target onto the site's base URL.
///
/// Absolute `http(s)://` links are kept as they are.
pub fn resolve_url(base_url: &str, href: &str) -> String {
    let href = href.trim();
    if href.starts_with("http://") || href.starts_with("https://") {
        return href.to_string();
    }
    if base_url.is_empty() {
        return href.to_string();
    }
    format!(
        "{}/{}",
        base_url.trim_end_matches('/'),
        href.trim_start_matches('/')
    )
}

/// Extract `(name, url)` pairs from `<h4><a href=...>name</a></h4>` blocks.
///
/// Headings without a link, links with an empty target, and repeated URLs
/// are skipped. Entries keep page order.
pub fn parse_listing(html_doc: &str, base_url: &str) -> Vec<ListingEntry> {
    let mut seen = HashSet::new();
    let mut entries = Vec::new();

    for heading in HEADING.captures_iter(html_doc) {
        let Some(inner) = heading.get(1) else { continue };
        let Some(anchor) = ANCHOR.captures(inner.as_str()) else {
            continue;
        };

        let href = anchor
            .get(1)
            .or_else(|| anchor.get(2))
            .map(|m| html::decode_entities(m.as_str()))
            .unwrap_or_default();
        if href.trim().is_empty() {
            continue;
        }

        let url = resolve_url(base_url, &href);
        if !seen.insert(url.clone()) {
            debug!(url = %url, "Duplicate listing link skipped");
            continue;
        }

        let name = anchor
            .get(3)
            .map(|m| html::inline_text(m.as_str()))
            .unwrap_or_default();

        entries.push(ListingEntry { name, url });
    }

    entries
}

/// Parse a saved listing page from disk.
pub fn read_listing_page(path: &Path, base_url: &str) -> Result<Vec<ListingEntry>> {
    let doc = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read listing page: {}", path.display()))?;
    let entries = parse_listing(&doc, base_url);
    info!(courses = entries.len(), page = %path.display(), "Parsed course listing");
    Ok(entries)
}

/// Write listing entries as a `name,url` CSV.
pub fn write_listing_csv(path: &Path, entries: &[ListingEntry]) -> Result<()> {
    let mut writer = csv::Writer::from_path(path)
        .with_context(|| format!("Failed to create listing CSV: {}", path.display()))?;
    for entry in entries {
        writer.serialize(entry)?;
    }
    writer.flush()?;
    Ok(())
}

/// Read a `name,url` CSV written by [`write_listing_csv`].
pub fn read_listing_csv(path: &Path) -> Result<Vec<ListingEntry>> {
    let mut reader = csv::Reader::from_path(path)
        .with_context(|| format!("Failed to open listing CSV: {}", path.display()))?;
    reader
        .deserialize()
        .collect::<std::result::Result<Vec<ListingEntry>, _>>()
        .with_context(|| format!("Failed to parse listing CSV: {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAGE: &str = r#"
        <html><body>
          <h4 class="title"><a href="/minors/data-science">Data <b>Science</b> &amp; AI</a></h4>
          <p>Some teaser</p>
          <h4>No link here</h4>
          <h4><a href='https://other.example/robotics'>Robotics</a></h4>
          <h4><a href="/minors/data-science">Data Science again</a></h4>
          <h4><a href="">Empty</a></h4>
        </body></html>"#;

    #[test]
    fn test_parse_listing() {
        let entries = parse_listing(PAGE, "https://uni.example/");
        assert_eq!(
            entries,
            vec![
                ListingEntry {
                    name: "Data Science & AI".into(),
                    url: "https://uni.example/minors/data-science".into(),
                },
                ListingEntry {
                    name: "Robotics".into(),
                    url: "https://other.example/robotics".into(),
                },
            ]
        );
    }

    #[test]
    fn test_resolve_url() {
        assert_eq!(resolve_url("https://a.b", "/x"), "https://a.b/x");
        assert_eq!(resolve_url("https://a.b/", "x"), "https://a.b/x");
        assert_eq!(resolve_url("", "/x"), "/x");
        assert_eq!(resolve_url("https://a.b", "http://c.d/e"), "http://c.d/e");
    }

    #[test]
    fn test_listing_csv_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("listing.csv");
        let entries = parse_listing(PAGE, "https://uni.example");
        write_listing_csv(&path, &entries).unwrap();
        assert_eq!(read_listing_csv(&path).unwrap(), entries);
    }
}
