// Corpus-level coverage statistics.
//
// Everything here is a pure function of the best-match scores, the covered
// trend sets and the threshold: the same inputs always give the same report,
// including the order of the top-N list (ties keep input order).

use std::collections::HashSet;

use serde::Serialize;

use crate::error::{CoverageError, CoverageResult};
use crate::records::{CourseRecord, Trend, TrendSet};

/// Default number of histogram bins over [0, 1].
pub const DEFAULT_HISTOGRAM_BINS: usize = 30;

/// One entry of the top-N list.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankedCourse {
    /// 1-based rank
    pub rank: usize,
    pub name: String,
    pub score: f64,
    /// Canonical ids of covered trends
    pub covered_trends: Vec<String>,
}

/// How many courses cover one trend.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrendCoverage {
    pub trend: Trend,
    pub course_count: usize,
}

/// Distribution of best-match scores.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoreHistogram {
    pub lower: f64,
    pub upper: f64,
    /// Course counts per equal-width bin, lowest bin first
    pub counts: Vec<usize>,
}

impl ScoreHistogram {
    pub fn bin_width(&self) -> f64 {
        (self.upper - self.lower) / self.counts.len().max(1) as f64
    }

    /// Index of the bin a value falls into (values outside the range go to the edge bins).
    pub fn bin_of(&self, value: f64) -> usize {
        let last = self.counts.len().saturating_sub(1);
        let width = self.bin_width();
        if width <= 0.0 || value <= self.lower {
            return 0;
        }
        (((value - self.lower) / width).floor() as usize).min(last)
    }
}

/// Aggregate view of one coverage run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CoverageReport {
    pub threshold: f64,
    pub course_count: usize,
    /// Courses whose best-match score reaches the threshold
    pub covered_course_count: usize,
    pub coverage_rate: f64,
    pub average_similarity: f64,
    pub max_similarity: f64,
    pub min_similarity: f64,
    pub top_matches: Vec<RankedCourse>,
    /// Trends covered by at least one course, in trend order
    pub covered_trends: Vec<Trend>,
    /// Trends no course covers, in trend order
    pub uncovered_trends: Vec<Trend>,
    /// Covering-course count for every trend, in trend order
    pub per_trend: Vec<TrendCoverage>,
    pub histogram: ScoreHistogram,
}

/// Derive the coverage report.
///
/// `best_scores[i]` and `covered[i]` belong to `courses[i]`; `covered` holds
/// canonical trend ids. An empty corpus is an error because the coverage rate
/// and the score statistics are undefined over zero courses.
pub fn aggregate(
    courses: &[CourseRecord],
    best_scores: &[f64],
    covered: &[Vec<String>],
    trends: &TrendSet,
    threshold: f64,
    top_n_count: usize,
) -> CoverageResult<CoverageReport> {
    if best_scores.len() != courses.len() || covered.len() != courses.len() {
        return Err(CoverageError::config(format!(
            "{} courses but {} scores and {} coverage sets",
            courses.len(),
            best_scores.len(),
            covered.len()
        )));
    }
    if courses.is_empty() {
        return Err(CoverageError::EmptyCorpus);
    }

    let n = courses.len() as f64;
    let covered_course_count = best_scores.iter().filter(|&&s| s >= threshold).count();
    let average_similarity = best_scores.iter().sum::<f64>() / n;
    let max_similarity = best_scores.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let min_similarity = best_scores.iter().copied().fold(f64::INFINITY, f64::min);

    let per_trend: Vec<TrendCoverage> = trends
        .iter()
        .map(|trend| TrendCoverage {
            trend: trend.clone(),
            course_count: covered
                .iter()
                .filter(|ids| ids.iter().any(|id| *id == trend.id))
                .count(),
        })
        .collect();

    let union: HashSet<&str> = covered.iter().flatten().map(String::as_str).collect();
    let (covered_trends, uncovered_trends): (Vec<Trend>, Vec<Trend>) = trends
        .iter()
        .cloned()
        .partition(|t| union.contains(t.id.as_str()));

    let names: Vec<&str> = courses.iter().map(|c| c.name.as_str()).collect();
    let top_matches = top_n(&names, best_scores, covered, top_n_count);

    Ok(CoverageReport {
        threshold,
        course_count: courses.len(),
        covered_course_count,
        coverage_rate: covered_course_count as f64 / n,
        average_similarity,
        max_similarity,
        min_similarity,
        top_matches,
        covered_trends,
        uncovered_trends,
        per_trend,
        histogram: histogram(best_scores, DEFAULT_HISTOGRAM_BINS),
    })
}

/// The `n` highest-scoring courses, best first.
///
/// The sort is stable, so equal scores keep their input order and repeated
/// runs return the same sequence.
pub fn top_n(
    names: &[&str],
    scores: &[f64],
    covered: &[Vec<String>],
    n: usize,
) -> Vec<RankedCourse> {
    let mut order: Vec<usize> = (0..names.len().min(scores.len())).collect();
    order.sort_by(|&a, &b| scores[b].total_cmp(&scores[a]));

    order
        .into_iter()
        .take(n)
        .enumerate()
        .map(|(rank, i)| RankedCourse {
            rank: rank + 1,
            name: names[i].to_string(),
            score: scores[i],
            covered_trends: covered.get(i).cloned().unwrap_or_default(),
        })
        .collect()
}

/// Bucket scores into `bins` equal-width bins over [0, 1].
///
/// Negative scores (possible with dense embeddings) land in the first bin.
pub fn histogram(scores: &[f64], bins: usize) -> ScoreHistogram {
    let mut hist = ScoreHistogram {
        lower: 0.0,
        upper: 1.0,
        counts: vec![0; bins.max(1)],
    };
    for &s in scores {
        let bin = hist.bin_of(s);
        hist.counts[bin] += 1;
    }
    hist
}
