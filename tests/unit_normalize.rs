// Unit tests for the text normalizer and trend phrase handling.
//
// Property tests cover idempotence over arbitrary text, including stray and
// nested bold markers; the example tests pin down the canonical forms that
// trend ids depend on.

use proptest::prelude::*;

use trendcover::loader::parse_trends;
use trendcover::text::{normalize, normalize_opt};

// ============================================================
// normalize: properties
// ============================================================

proptest! {
    #[test]
    fn normalize_is_idempotent(text in "\\PC*") {
        let once = normalize(&text);
        prop_assert_eq!(normalize(&once), once);
    }

    #[test]
    fn normalize_is_idempotent_with_markdown_noise(
        text in "[a-zA-Z *\\n\\t]{0,60}"
    ) {
        let once = normalize(&text);
        prop_assert_eq!(normalize(&once), once);
    }

    #[test]
    fn normalized_text_has_no_outer_or_double_spaces(text in "[a-z \\t\\n]{0,40}") {
        let out = normalize(&text);
        prop_assert!(!out.starts_with(' ') && !out.ends_with(' '));
        prop_assert!(!out.contains("  "));
    }
}

// ============================================================
// normalize: examples
// ============================================================

#[test]
fn bold_heading_is_dropped() {
    assert_eq!(normalize("**bold** text"), "text");
    assert_eq!(
        normalize("**Learning goals:**\nStudents   apply **AI** Tools"),
        "students apply tools"
    );
}

#[test]
fn nested_markers_collapse_to_fixed_point() {
    // Removing the inner span exposes a new one
    assert_eq!(normalize("a *****x** ** b"), normalize(&normalize("a *****x** ** b")));
}

#[test]
fn missing_text_is_empty() {
    assert_eq!(normalize_opt(None), "");
    assert_eq!(normalize_opt(Some("  MiXeD  ")), "mixed");
}

// ============================================================
// Trend phrases: canonical ids
// ============================================================

#[test]
fn trend_spellings_share_an_id() {
    let trends = parse_trends("Computer Vision, computer   vision, **x** COMPUTER VISION");
    assert_eq!(trends.len(), 1);
    assert_eq!(trends.ids(), vec!["computer vision"]);
    assert_eq!(trends.display_name("computer vision"), "Computer Vision");
}
