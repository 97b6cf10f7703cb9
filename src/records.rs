// Course records and trend phrases: the two inputs the engine scores.
//
// Courses are row keys of the similarity matrix and trends are its columns,
// so both collections are order-preserving and unique by key. Validation
// collects problems in bulk instead of stopping at the first bad row.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::CoverageError;
use crate::text::normalize;

/// A course row as delivered by the loader, before validation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawCourse {
    pub name: Option<String>,
    pub raw_text: Option<String>,
    pub category: Option<u8>,
}

/// One course or program being scored.
///
/// `normalized_text`, `best_trend_score` and `covered_trends` are filled in
/// by the pipeline; everything else comes from the loader.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CourseRecord {
    /// Unique row key in the similarity matrix
    pub name: String,
    /// Free text the score is computed from
    pub raw_text: String,
    /// Key-technology category (0-3) when the source table has one
    pub category: Option<u8>,
    pub normalized_text: String,
    pub best_trend_score: Option<f64>,
    /// Canonical ids of the trends this course covers, in trend order
    pub covered_trends: Vec<String>,
}

impl CourseRecord {
    pub fn new(name: impl Into<String>, raw_text: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            raw_text: raw_text.into(),
            category: None,
            normalized_text: String::new(),
            best_trend_score: None,
            covered_trends: Vec::new(),
        }
    }

    pub fn with_category(mut self, category: u8) -> Self {
        self.category = Some(category);
        self
    }
}

/// A problem found while validating one input record.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordIssue {
    /// Zero-based position of the record in the loader output
    pub index: usize,
    pub error: CoverageError,
}

/// Validate loader output into scoreable course records.
///
/// Records missing a name or text are skipped. A repeated name is renamed
/// with a `#k` suffix (the first suffix not already taken) so the row keys
/// stay unique. Every problem is reported; none of them stop the others from
/// being processed.
pub fn validate_courses(raw: Vec<RawCourse>) -> (Vec<CourseRecord>, Vec<RecordIssue>) {
    let mut courses = Vec::with_capacity(raw.len());
    let mut issues = Vec::new();
    let mut seen: HashSet<String> = HashSet::new();

    for (index, row) in raw.into_iter().enumerate() {
        let name = row
            .name
            .as_deref()
            .map(str::trim)
            .filter(|n| !n.is_empty())
            .map(str::to_string);

        let Some(name) = name else {
            issues.push(RecordIssue {
                index,
                error: CoverageError::MalformedInput {
                    record: format!("row {}", index + 1),
                    reason: "missing name".to_string(),
                },
            });
            continue;
        };

        let Some(raw_text) = row.raw_text.filter(|t| !t.trim().is_empty()) else {
            issues.push(RecordIssue {
                index,
                error: CoverageError::MalformedInput {
                    record: name,
                    reason: "missing description text".to_string(),
                },
            });
            continue;
        };

        let key = if seen.contains(&name) {
            let mut k = 2;
            while seen.contains(&format!("{name} #{k}")) {
                k += 1;
            }
            let renamed = format!("{name} #{k}");
            issues.push(RecordIssue {
                index,
                error: CoverageError::MalformedInput {
                    record: name.clone(),
                    reason: format!("duplicate name, renamed to '{renamed}'"),
                },
            });
            renamed
        } else {
            name
        };

        seen.insert(key.clone());
        let mut course = CourseRecord::new(key, raw_text);
        course.category = row.category;
        courses.push(course);
    }

    for issue in &issues {
        warn!(index = issue.index, error = %issue.error, "Course record issue");
    }

    (courses, issues)
}

/// A trend phrase with its canonical identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Trend {
    /// Normalized phrase; coverage is keyed by this
    pub id: String,
    /// Phrase as written in the source list, for reports
    pub display: String,
}

/// Ordered, de-duplicated trend phrases. Index `j` is matrix column `j`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TrendSet {
    trends: Vec<Trend>,
}

impl TrendSet {
    /// Build a trend set from display phrases.
    ///
    /// Phrases that normalize to the empty string are dropped; later phrases
    /// with the same canonical id as an earlier one are dropped too, so the
    /// first spelling wins the display name.
    pub fn from_phrases<I, S>(phrases: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut seen = HashSet::new();
        let mut trends = Vec::new();
        for phrase in phrases {
            let display = phrase.as_ref().trim().to_string();
            let id = normalize(&display);
            if id.is_empty() || !seen.insert(id.clone()) {
                continue;
            }
            trends.push(Trend { id, display });
        }
        Self { trends }
    }

    pub fn len(&self) -> usize {
        self.trends.len()
    }

    pub fn is_empty(&self) -> bool {
        self.trends.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Trend> {
        self.trends.iter()
    }

    pub fn get(&self, index: usize) -> Option<&Trend> {
        self.trends.get(index)
    }

    /// Canonical ids in column order.
    pub fn ids(&self) -> Vec<String> {
        self.trends.iter().map(|t| t.id.clone()).collect()
    }

    /// Display phrase for a canonical id, falling back to the id itself.
    pub fn display_name<'a>(&'a self, id: &'a str) -> &'a str {
        self.trends
            .iter()
            .find(|t| t.id == id)
            .map(|t| t.display.as_str())
            .unwrap_or(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(name: Option<&str>, text: Option<&str>) -> RawCourse {
        RawCourse {
            name: name.map(str::to_string),
            raw_text: text.map(str::to_string),
            category: None,
        }
    }

    #[test]
    fn test_missing_fields_are_reported_and_skipped() {
        let (courses, issues) = validate_courses(vec![
            raw(None, Some("text")),
            raw(Some("Has name"), None),
            raw(Some("Good"), Some("fine text")),
        ]);
        assert_eq!(courses.len(), 1);
        assert_eq!(courses[0].name, "Good");
        assert_eq!(issues.len(), 2);
        assert_eq!(issues[0].index, 0);
        assert!(matches!(
            &issues[1].error,
            CoverageError::MalformedInput { record, .. } if record == "Has name"
        ));
    }

    #[test]
    fn test_duplicate_names_are_renamed() {
        let (courses, issues) = validate_courses(vec![
            raw(Some("Minor"), Some("a")),
            raw(Some("Minor #2"), Some("b")),
            raw(Some("Minor"), Some("c")),
        ]);
        let names: Vec<&str> = courses.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["Minor", "Minor #2", "Minor #3"]);
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].index, 2);
    }

    #[test]
    fn test_trend_set_dedups_by_canonical_id() {
        let trends = TrendSet::from_phrases(["Machine Learning", " ethics", "machine   learning", ""]);
        assert_eq!(trends.len(), 2);
        assert_eq!(trends.ids(), vec!["machine learning", "ethics"]);
        assert_eq!(trends.display_name("machine learning"), "Machine Learning");
    }
}
