// CSV exports: scored courses, similarity and coverage matrices, summaries.

use std::fs::File;
use std::io::Write;
use std::path::Path;

use anyhow::{Context, Result};
use serde::Serialize;

use crate::coverage::decision::CoverageDecision;
use crate::coverage::matrix::SimilarityMatrix;
use crate::crawl::checkpoint::CheckpointEntry;
use crate::records::{CourseRecord, TrendSet};

#[derive(Serialize)]
struct ScoredRow<'a> {
    name: &'a str,
    category: Option<u8>,
    best_trend_score: Option<f64>,
    covered_trends: String,
    raw_text: &'a str,
}

#[derive(Serialize)]
struct SummaryRow<'a> {
    name: &'a str,
    url: &'a str,
    markdown: &'a str,
    summary: &'a str,
}

fn create_file(path: &Path) -> Result<File> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }
    File::create(path).with_context(|| format!("Failed to create {}", path.display()))
}

/// Course table with the derived coverage fields. Covered trend ids are
/// joined with `;`.
pub fn write_scored_courses<W: Write>(out: W, courses: &[CourseRecord]) -> Result<()> {
    let mut writer = csv::Writer::from_writer(out);
    for course in courses {
        writer.serialize(ScoredRow {
            name: &course.name,
            category: course.category,
            best_trend_score: course.best_trend_score,
            covered_trends: course.covered_trends.join(";"),
            raw_text: &course.raw_text,
        })?;
    }
    writer.flush()?;
    Ok(())
}

/// Header row: `course` then the display phrase of every trend column.
fn header<'a>(matrix: &'a SimilarityMatrix, trends: &'a TrendSet) -> Vec<&'a str> {
    std::iter::once("course")
        .chain(matrix.columns().iter().map(|id| trends.display_name(id)))
        .collect()
}

/// Course × trend similarity values, one row per course.
pub fn write_similarity_matrix<W: Write>(
    out: W,
    matrix: &SimilarityMatrix,
    trends: &TrendSet,
) -> Result<()> {
    let mut writer = csv::Writer::from_writer(out);
    writer.write_record(header(matrix, trends))?;
    for (i, name) in matrix.rows().iter().enumerate() {
        let cells = matrix.row(i).iter().map(|v| format!("{v:.6}")).collect::<Vec<_>>();
        writer.write_record(std::iter::once(name.clone()).chain(cells))?;
    }
    writer.flush()?;
    Ok(())
}

/// Course × trend coverage as `true`/`false` cells, one row per course.
pub fn write_coverage_matrix<W: Write>(
    out: W,
    matrix: &SimilarityMatrix,
    trends: &TrendSet,
    decision: &CoverageDecision,
) -> Result<()> {
    let mut writer = csv::Writer::from_writer(out);
    writer.write_record(header(matrix, trends))?;
    for (i, name) in matrix.rows().iter().enumerate() {
        let cells = decision
            .covered_matrix
            .row(i)
            .iter()
            .map(|&hit| if hit { "true" } else { "false" })
            .collect::<Vec<_>>();
        writer.write_record(std::iter::once(name.as_str()).chain(cells))?;
    }
    writer.flush()?;
    Ok(())
}

/// Summaries as `name,url,markdown,summary`, the shape `score` reads back.
pub fn write_summaries<W: Write>(out: W, entries: &[CheckpointEntry]) -> Result<()> {
    let mut writer = csv::Writer::from_writer(out);
    for entry in entries {
        writer.serialize(SummaryRow {
            name: &entry.name,
            url: &entry.url,
            markdown: &entry.content,
            summary: &entry.summary,
        })?;
    }
    writer.flush()?;
    Ok(())
}

/// Write every coverage artifact into `dir`. Returns the files written.
pub fn write_coverage_files(
    dir: &Path,
    courses: &[CourseRecord],
    trends: &TrendSet,
    matrix: &SimilarityMatrix,
    decision: &CoverageDecision,
) -> Result<Vec<String>> {
    let scored = dir.join("scored_courses.csv");
    let similarity = dir.join("similarity_matrix.csv");
    let coverage = dir.join("coverage_matrix.csv");

    write_scored_courses(create_file(&scored)?, courses)?;
    write_similarity_matrix(create_file(&similarity)?, matrix, trends)?;
    write_coverage_matrix(create_file(&coverage)?, matrix, trends, decision)?;

    Ok([scored, similarity, coverage]
        .iter()
        .map(|p| p.display().to_string())
        .collect())
}

/// Write the summaries CSV to `path`.
pub fn write_summaries_file(path: &Path, entries: &[CheckpointEntry]) -> Result<()> {
    write_summaries(create_file(path)?, entries)
}
