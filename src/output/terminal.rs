// Colored terminal output for coverage reports.
//
// This module handles all terminal-specific formatting: colors, tables and
// the text histogram. main.rs delegates here after a run.

use colored::Colorize;

use crate::coverage::report::{CoverageReport, ScoreHistogram};
use crate::pipeline::summarize::SummarizeStats;
use crate::records::{RecordIssue, TrendSet};

/// Display the full coverage report.
pub fn display_report(report: &CoverageReport, trends: &TrendSet) {
    println!(
        "\n{}",
        format!(
            "=== Trend Coverage ({} courses, {} trends) ===",
            report.course_count,
            trends.len()
        )
        .bold()
    );
    println!();

    let rate = format!("{:.1}%", report.coverage_rate * 100.0);
    println!(
        "  Coverage rate: {}  ({} of {} courses reach {:.2})",
        colorize_rate(report.coverage_rate, &rate),
        report.covered_course_count,
        report.course_count,
        report.threshold
    );
    println!(
        "  Best-match similarity: avg {:.3}  max {:.3}  min {:.3}",
        report.average_similarity, report.max_similarity, report.min_similarity
    );

    display_top_matches(report, trends);
    display_trend_coverage(report);

    println!("\n  {}", "Best-match score distribution:".bold());
    for line in histogram_lines(&report.histogram, 40, Some(report.threshold)) {
        println!("  {line}");
    }
    println!();
}

fn display_top_matches(report: &CoverageReport, trends: &TrendSet) {
    if report.top_matches.is_empty() {
        return;
    }

    println!(
        "\n  {}",
        format!("Top {} matches:", report.top_matches.len()).bold()
    );
    println!(
        "  {:>4}  {:<44} {:>6}  {}",
        "Rank".dimmed(),
        "Course".dimmed(),
        "Score".dimmed(),
        "Covers".dimmed(),
    );
    println!("  {}", "-".repeat(78).dimmed());

    for entry in &report.top_matches {
        let covers: Vec<&str> = entry
            .covered_trends
            .iter()
            .map(|id| trends.display_name(id))
            .collect();
        let score = format!("{:>6.3}", entry.score);
        let score = if entry.score >= report.threshold {
            score.green()
        } else {
            score.dimmed()
        };
        println!(
            "  {:>4}. {:<44} {}  {}",
            entry.rank,
            super::truncate_chars(&entry.name, 41),
            score,
            covers.join(", ").dimmed()
        );
    }
}

fn display_trend_coverage(report: &CoverageReport) {
    println!("\n  {}", "Trends:".bold());
    for item in &report.per_trend {
        let marker = if item.course_count > 0 {
            "+".green()
        } else {
            "-".red()
        };
        println!(
            "    {} {:<40} {} course(s)",
            marker, item.trend.display, item.course_count
        );
    }

    if !report.uncovered_trends.is_empty() {
        let names: Vec<&str> = report
            .uncovered_trends
            .iter()
            .map(|t| t.display.as_str())
            .collect();
        println!(
            "\n  {} {} uncovered: {}",
            "!".yellow().bold(),
            names.len(),
            names.join(", ")
        );
    }
}

/// Render a histogram as one text bar per bin, scaled to `width` characters
/// for the fullest bin. The bin holding `threshold`, if given, is marked.
pub fn histogram_lines(hist: &ScoreHistogram, width: usize, threshold: Option<f64>) -> Vec<String> {
    let peak = hist.counts.iter().copied().max().unwrap_or(0).max(1);
    let bin_width = hist.bin_width();
    let marked = threshold.map(|t| hist.bin_of(t));

    hist.counts
        .iter()
        .enumerate()
        .map(|(i, &count)| {
            let lo = hist.lower + bin_width * i as f64;
            let hi = lo + bin_width;
            let filled = (count * width).div_ceil(peak);
            let marker = if marked == Some(i) { "  <- threshold" } else { "" };
            format!("{lo:.2}-{hi:.2} |{:<width$}| {count}{marker}", "#".repeat(filled))
        })
        .collect()
}

/// Report records that were left out of the analysis.
pub fn display_issues(issues: &[RecordIssue]) {
    if issues.is_empty() {
        return;
    }
    println!(
        "\n  {} {} input record(s) had problems:",
        "!".yellow().bold(),
        issues.len()
    );
    for issue in issues {
        println!("    row {}: {}", issue.index + 1, issue.error.to_string().dimmed());
    }
}

/// One-line result of a summarize run.
pub fn display_summarize_stats(stats: &SummarizeStats) {
    println!(
        "\n  Summarized {} new, {} already done, {} failed ({} total)",
        stats.succeeded.to_string().green(),
        stats.skipped,
        if stats.failed > 0 {
            stats.failed.to_string().red()
        } else {
            stats.failed.to_string().normal()
        },
        stats.total
    );
}

fn colorize_rate(rate: f64, text: &str) -> colored::ColoredString {
    if rate >= 0.5 {
        text.green().bold()
    } else if rate >= 0.2 {
        text.yellow()
    } else {
        text.red()
    }
}
