// Input loading: course tables and trend lists.
//
// Course tables come from several sources (the summarize pipeline's CSV, the
// original Dutch program overview) with different column names. Rather than
// branching on names throughout the code, a `ColumnMapping` lists the
// candidate headers for each field and the loader resolves them once.

use std::collections::HashSet;
use std::io::Read;
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::records::{RawCourse, TrendSet};

/// Which CSV headers feed which course field.
///
/// Each field lists candidate headers in priority order; the first one
/// present in the file wins. Header matching ignores case and surrounding
/// whitespace.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnMapping {
    pub name: Vec<String>,
    pub text: Vec<String>,
    pub category: Vec<String>,
    /// Rows whose category is one of these are left out of the analysis
    pub excluded_categories: Vec<u8>,
}

impl Default for ColumnMapping {
    fn default() -> Self {
        Self {
            name: vec!["name".into(), "Naam opleiding".into()],
            text: vec![
                "summary".into(),
                "markdown".into(),
                "description".into(),
                "Toelichting".into(),
            ],
            category: vec![
                "Sleuteltechnologiecategorie (0-3)".into(),
                "Sleuteltechnologiecategorie (0–3)".into(),
                "category".into(),
            ],
            excluded_categories: vec![0],
        }
    }
}

impl ColumnMapping {
    /// Put explicit column names ahead of the default candidates.
    pub fn with_overrides(
        mut self,
        name: Option<&str>,
        text: Option<&str>,
        category: Option<&str>,
    ) -> Self {
        if let Some(col) = name {
            self.name.insert(0, col.to_string());
        }
        if let Some(col) = text {
            self.text.insert(0, col.to_string());
        }
        if let Some(col) = category {
            self.category.insert(0, col.to_string());
        }
        self
    }
}

/// Find the first candidate header present in the file.
fn resolve_column(headers: &csv::StringRecord, candidates: &[String]) -> Option<usize> {
    candidates.iter().find_map(|want| {
        headers
            .iter()
            .position(|h| h.trim().eq_ignore_ascii_case(want.trim()))
    })
}

/// Parse a category cell: "2", " 3 ", "1.0". Anything else is `None`.
fn parse_category(cell: &str) -> Option<u8> {
    let cell = cell.trim();
    if let Ok(v) = cell.parse::<u8>() {
        return Some(v);
    }
    cell.parse::<f64>()
        .ok()
        .filter(|v| v.fract() == 0.0 && (0.0..=255.0).contains(v))
        .map(|v| v as u8)
}

/// Load course rows from a CSV file.
pub fn load_courses(path: &Path, mapping: &ColumnMapping) -> Result<Vec<RawCourse>> {
    let file = std::fs::File::open(path)
        .with_context(|| format!("Failed to open course table: {}", path.display()))?;
    read_courses(file, mapping)
        .with_context(|| format!("Failed to read course table: {}", path.display()))
}

/// Read course rows from any CSV source.
///
/// Fails only when the name or text column cannot be found. Row-level
/// problems (missing values, duplicates) are left to record validation so
/// they are reported together.
pub fn read_courses<R: Read>(source: R, mapping: &ColumnMapping) -> Result<Vec<RawCourse>> {
    let mut reader = csv::ReaderBuilder::new().flexible(true).from_reader(source);
    let headers = reader.headers().context("Failed to read CSV header")?.clone();

    let name_col = resolve_column(&headers, &mapping.name).ok_or_else(|| {
        anyhow::anyhow!(
            "No course name column found (looked for: {})",
            mapping.name.join(", ")
        )
    })?;
    let text_col = resolve_column(&headers, &mapping.text).ok_or_else(|| {
        anyhow::anyhow!(
            "No description column found (looked for: {})",
            mapping.text.join(", ")
        )
    })?;
    let category_col = resolve_column(&headers, &mapping.category);

    debug!(
        name = &headers[name_col],
        text = &headers[text_col],
        category = ?category_col.map(|i| &headers[i]),
        "Resolved course columns"
    );

    let excluded: HashSet<u8> = mapping.excluded_categories.iter().copied().collect();
    let mut courses = Vec::new();
    let mut skipped = 0usize;

    for (idx, result) in reader.records().enumerate() {
        let row = result.with_context(|| format!("Failed to read row {}", idx + 1))?;

        let cell = |col: usize| {
            row.get(col)
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
        };

        let category = match category_col.and_then(|c| row.get(c)) {
            Some(raw) if !raw.trim().is_empty() => {
                let parsed = parse_category(raw);
                if parsed.is_none() {
                    warn!(row = idx + 1, value = raw, "Unreadable category, keeping row");
                }
                parsed
            }
            _ => None,
        };

        if category.is_some_and(|c| excluded.contains(&c)) {
            skipped += 1;
            continue;
        }

        courses.push(RawCourse {
            name: cell(name_col),
            raw_text: cell(text_col),
            category,
        });
    }

    info!(
        loaded = courses.len(),
        excluded_by_category = skipped,
        "Loaded course table"
    );

    Ok(courses)
}

/// Split a trend list written as comma- or line-separated phrases.
///
/// Surrounding whitespace and trailing sentence punctuation are dropped, as
/// are empty entries; duplicates collapse onto their first spelling.
pub fn parse_trends(text: &str) -> TrendSet {
    let phrases = text
        .split([',', '\n', ';'])
        .map(|p| p.trim().trim_end_matches(['.', ':']).trim())
        .filter(|p| !p.is_empty());
    TrendSet::from_phrases(phrases)
}

/// Load a trend list from a text file.
pub fn load_trends(path: &Path) -> Result<TrendSet> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read trend list: {}", path.display()))?;
    Ok(parse_trends(&text))
}
