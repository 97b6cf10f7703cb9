// Text normalizer: strips markdown bold spans, collapses whitespace, lower-cases.
//
// Both trend phrases and course descriptions go through this before encoding,
// so the same phrase written "**Machine Learning**\n" or "machine   learning"
// lands on the same canonical form.

use std::sync::LazyLock;

use regex_lite::Regex;

/// `**...**` spans, shortest match, allowed to cross line breaks.
static BOLD_SPAN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)\*\*.*?\*\*").expect("valid bold-span pattern"));

/// Normalize a piece of text for scoring.
///
/// Bold spans are removed until none remain (removing one span can expose
/// another), then every whitespace run becomes a single space, the ends are
/// trimmed and the result is lower-cased. Never fails; `normalize(normalize(x))`
/// equals `normalize(x)`.
pub fn normalize(text: &str) -> String {
    let mut stripped = text.to_string();
    loop {
        let next = BOLD_SPAN.replace_all(&stripped, "").into_owned();
        if next == stripped {
            break;
        }
        stripped = next;
    }

    stripped
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// Normalize an optional field. Missing text is treated as the empty string.
pub fn normalize_opt(text: Option<&str>) -> String {
    text.map(normalize).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_removes_bold_span() {
        assert_eq!(normalize("**bold** text"), "text");
    }

    #[test]
    fn test_empty_string() {
        assert_eq!(normalize(""), "");
        assert_eq!(normalize_opt(None), "");
    }

    #[test]
    fn test_bold_is_non_greedy() {
        assert_eq!(
            normalize("**Goal:** learn python **Level:** beginner"),
            "learn python beginner"
        );
    }

    #[test]
    fn test_bold_spans_cross_newlines() {
        assert_eq!(normalize("**Learning\nobjectives** ethics"), "ethics");
    }

    #[test]
    fn test_collapses_whitespace_and_lowercases() {
        assert_eq!(
            normalize("  Computer\tVision \n\n Deep   Learning "),
            "computer vision deep learning"
        );
    }

    #[test]
    fn test_unmatched_markers_are_kept() {
        assert_eq!(normalize("a ** b"), "a ** b");
    }

    #[test]
    fn test_idempotent_on_nested_markers() {
        let once = normalize("***x*** and **y");
        assert_eq!(normalize(&once), once);
    }
}
