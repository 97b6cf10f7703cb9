// Markdown coverage report.
//
// Renders the same figures as the terminal view into a shareable document:
// headline coverage, score statistics, top matches, per-trend breakdown,
// interpretation and methodology notes, and a text histogram.

use std::fmt::Write as _;
use std::path::Path;

use anyhow::{Context, Result};
use chrono::Utc;

use crate::coverage::report::CoverageReport;
use crate::records::TrendSet;

/// Run details printed in the report header.
#[derive(Debug, Clone, Default)]
pub struct ReportContext<'a> {
    /// Encoder description, e.g. "TF-IDF"
    pub encoder: &'a str,
    /// Where the course table came from
    pub source: Option<&'a str>,
}

/// Render the report as Markdown.
pub fn render_report(report: &CoverageReport, trends: &TrendSet, ctx: &ReportContext<'_>) -> String {
    let mut md = String::new();
    let pct = |rate: f64| format!("{:.0}%", rate * 100.0);
    let uncovered_courses = report.course_count - report.covered_course_count;

    // Writing into a String cannot fail
    let _ = writeln!(md, "# Trend Coverage Report");
    let _ = writeln!(md);
    let _ = writeln!(
        md,
        "Generated {} from {} courses and {} trends using {}.",
        Utc::now().format("%Y-%m-%d %H:%M UTC"),
        report.course_count,
        trends.len(),
        ctx.encoder
    );
    if let Some(source) = ctx.source {
        let _ = writeln!(md, "Course table: `{source}`.");
    }
    let _ = writeln!(md);

    let _ = writeln!(md, "## Overall coverage");
    let _ = writeln!(md);
    let _ = writeln!(
        md,
        "- Courses touching the trends (similarity >= {}): {} ({})",
        report.threshold,
        report.covered_course_count,
        pct(report.coverage_rate)
    );
    let _ = writeln!(
        md,
        "- Courses not aligned with the trends: {} ({})",
        uncovered_courses,
        pct(1.0 - report.coverage_rate)
    );
    let _ = writeln!(md);

    let _ = writeln!(md, "## Similarity statistics");
    let _ = writeln!(md);
    let _ = writeln!(md, "| Statistic | Best-match score |");
    let _ = writeln!(md, "|---|---|");
    let _ = writeln!(md, "| Average | {:.3} |", report.average_similarity);
    let _ = writeln!(md, "| Maximum | {:.3} |", report.max_similarity);
    let _ = writeln!(md, "| Minimum | {:.3} |", report.min_similarity);
    let _ = writeln!(md);

    if !report.top_matches.is_empty() {
        let _ = writeln!(md, "## Top {} matches", report.top_matches.len());
        let _ = writeln!(md);
        let _ = writeln!(md, "| Rank | Course | Score | Covered trends |");
        let _ = writeln!(md, "|---:|---|---:|---|");
        for entry in &report.top_matches {
            let covers: Vec<&str> = entry
                .covered_trends
                .iter()
                .map(|id| trends.display_name(id))
                .collect();
            let _ = writeln!(
                md,
                "| {} | {} | {:.3} | {} |",
                entry.rank,
                escape_cell(&entry.name),
                entry.score,
                escape_cell(&covers.join(", "))
            );
        }
        let _ = writeln!(md);
    }

    let _ = writeln!(md, "## Coverage per trend");
    let _ = writeln!(md);
    let _ = writeln!(md, "| Trend | Covering courses |");
    let _ = writeln!(md, "|---|---:|");
    for item in &report.per_trend {
        let _ = writeln!(md, "| {} | {} |", escape_cell(&item.trend.display), item.course_count);
    }
    let _ = writeln!(md);

    if report.uncovered_trends.is_empty() {
        let _ = writeln!(md, "Every trend is covered by at least one course.");
    } else {
        let _ = writeln!(md, "### Uncovered trends");
        let _ = writeln!(md);
        for trend in &report.uncovered_trends {
            let _ = writeln!(md, "- {}", trend.display);
        }
    }
    let _ = writeln!(md);

    let _ = writeln!(md, "## Interpretation");
    let _ = writeln!(md);
    let _ = writeln!(
        md,
        "- ~{} of the courses show at least some textual alignment with the trends.",
        pct(report.coverage_rate)
    );
    let _ = writeln!(
        md,
        "- The remaining ~{} do not explicitly address them in their descriptions.",
        pct(1.0 - report.coverage_rate)
    );
    let _ = writeln!(
        md,
        "- {} of {} trends are addressed by at least one course.",
        report.covered_trends.len(),
        trends.len()
    );
    let leaders: Vec<&str> = report.top_matches.iter().take(3).map(|r| r.name.as_str()).collect();
    if !leaders.is_empty() {
        let _ = writeln!(
            md,
            "- Strongest alignment: {}. These can serve as models for the others.",
            leaders.join(", ")
        );
    }
    let _ = writeln!(md);

    let _ = writeln!(md, "## Methodology");
    let _ = writeln!(md);
    let _ = writeln!(
        md,
        "Course texts and trend phrases are normalized (bold spans removed, whitespace \
         collapsed, lowercased) and encoded with {}. Each course is compared to each trend \
         by cosine similarity. A course covers a trend when their similarity is at least {}; \
         a course counts as covered when its best-matching trend reaches that threshold.",
        ctx.encoder, report.threshold
    );
    let _ = writeln!(md);

    let _ = writeln!(md, "## Score distribution");
    let _ = writeln!(md);
    let _ = writeln!(md, "```text");
    for line in super::terminal::histogram_lines(&report.histogram, 40, Some(report.threshold)) {
        let _ = writeln!(md, "{line}");
    }
    let _ = writeln!(md, "```");

    md
}

/// Render the report and write it to `path`, creating parent directories.
/// Returns the path written.
pub fn generate_report(
    report: &CoverageReport,
    trends: &TrendSet,
    ctx: &ReportContext<'_>,
    path: &str,
) -> Result<String> {
    let path_ref = Path::new(path);
    if let Some(parent) = path_ref.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }
    std::fs::write(path_ref, render_report(report, trends, ctx))
        .with_context(|| format!("Failed to write report to {path}"))?;
    Ok(path.to_string())
}

fn escape_cell(text: &str) -> String {
    text.replace('|', "\\|").replace('\n', " ")
}
