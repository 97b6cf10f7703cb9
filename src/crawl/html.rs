// Low-level HTML string helpers.
//
// Listing and detail pages are plain server-rendered markup; a few patterns
// cover them. Tag and attribute names are matched case-insensitively.

use std::sync::LazyLock;

use regex_lite::Regex;

static TAG: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?s)<[^>]*>").expect("valid tag pattern"));

static SCRIPT_OR_STYLE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)<script\b.*?</script\s*>|<style\b.*?</style\s*>|<!--.*?-->")
        .expect("valid script/style pattern")
});

/// Tags that end a line of text when converted to plain text.
static BLOCK_BREAK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)<br\s*/?>|</(p|div|li|h[1-6]|tr|section|article|ul|ol|table)\s*>")
        .expect("valid block pattern")
});

/// Decode the handful of entities that show up in course pages.
pub fn decode_entities(s: &str) -> String {
    s.replace("&nbsp;", " ")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&#039;", "'")
        .replace("&apos;", "'")
        .replace("&amp;", "&")
}

/// Remove every tag, decode entities and collapse whitespace to single spaces.
pub fn inline_text(html: &str) -> String {
    let stripped = TAG.replace_all(html, " ");
    decode_entities(&stripped)
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Convert an HTML fragment to plain text, one block element per line.
///
/// Scripts, styles and comments are dropped entirely. Empty lines are
/// removed, so the result is compact text suitable for a summarizer prompt.
pub fn to_text(html: &str) -> String {
    let without_code = SCRIPT_OR_STYLE.replace_all(html, " ");
    let with_breaks = BLOCK_BREAK.replace_all(&without_code, "\n");

    with_breaks
        .lines()
        .map(inline_text)
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

/// Return the inner HTML of the first element whose `id` attribute equals `id`.
///
/// Nested elements with the same tag name are balanced, so a
/// `<div id="content">` containing other divs returns the whole subtree.
pub fn element_by_id<'a>(html: &'a str, id: &str) -> Option<&'a str> {
    let open = Regex::new(&format!(
        r#"(?is)<([a-z][a-z0-9]*)\b[^>]*\bid\s*=\s*["']{}["'][^>]*>"#,
        regex_escape(id)
    ))
    .ok()?;

    let caps = open.captures(html)?;
    let tag = caps.get(1)?.as_str();
    let start = caps.get(0)?.end();
    inner_until_balanced_close(html, tag, start)
}

/// Return the inner HTML of the first `<tag ...>` element.
pub fn element_by_tag<'a>(html: &'a str, tag: &str) -> Option<&'a str> {
    let open = Regex::new(&format!(r"(?i)<{}\b[^>]*>", regex_escape(tag))).ok()?;
    let start = open.find(html)?.end();
    inner_until_balanced_close(html, tag, start)
}

/// Scan forward from `start` (just past an opening `<tag>`) to its matching close.
/// An unclosed element runs to the end of the document.
fn inner_until_balanced_close<'a>(html: &'a str, tag: &str, start: usize) -> Option<&'a str> {
    let boundary = Regex::new(&format!(r"(?i)<(/?){}\b[^>]*>", regex_escape(tag))).ok()?;

    let mut depth = 1usize;
    for caps in boundary.captures_iter(&html[start..]) {
        let m = caps.get(0)?;
        let closing = caps.get(1).is_some_and(|c| !c.as_str().is_empty());
        let self_closing = m.as_str().ends_with("/>");
        if closing {
            depth -= 1;
            if depth == 0 {
                return Some(&html[start..start + m.start()]);
            }
        } else if !self_closing {
            depth += 1;
        }
    }
    Some(&html[start..])
}

/// Escape regex metacharacters in a literal.
fn regex_escape(literal: &str) -> String {
    let mut out = String::with_capacity(literal.len());
    for c in literal.chars() {
        if "\\.+*?()|[]{}^$".contains(c) {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_inline_text_strips_tags_and_entities() {
        assert_eq!(
            inline_text("<a href='/x'> Data &amp; <b>AI</b>&nbsp;minor </a>"),
            "Data & AI minor"
        );
    }

    #[test]
    fn test_to_text_keeps_blocks_on_lines() {
        let html = "<h2>Goals</h2><p>Learn <em>vision</em>.</p><script>var x = 1;</script><ul><li>One</li><li>Two</li></ul>";
        assert_eq!(to_text(html), "Goals\nLearn vision .\nOne\nTwo");
    }

    #[test]
    fn test_element_by_id_balances_nested_tags() {
        let html = r#"<body><div id="nav">menu</div><main id="content" class="x"><div>inner <div>deep</div></div> tail</main><footer>f</footer></body>"#;
        assert_eq!(
            element_by_id(html, "content"),
            Some("<div>inner <div>deep</div></div> tail")
        );

        let html = r#"<div id='content'><div>a</div>b</div><div>after</div>"#;
        assert_eq!(element_by_id(html, "content"), Some("<div>a</div>b"));
    }

    #[test]
    fn test_element_by_id_missing() {
        assert_eq!(element_by_id("<div id=\"other\">x</div>", "content"), None);
    }

    #[test]
    fn test_element_by_tag() {
        assert_eq!(
            element_by_tag("<html><BODY class=a>hello</BODY></html>", "body"),
            Some("hello")
        );
    }
}
