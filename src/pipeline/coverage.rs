// Coverage pipeline: normalize → encode → similarity matrix → decide → aggregate.
//
// One parametrized run with the encoder as the only variation point. Each
// stage consumes the previous stage's output and returns a new value; the
// only in-place step is writing the derived fields back onto the course
// records at the end.

use std::time::Instant;

use tracing::{debug, info};

use crate::coverage::decision::{decide, validate_threshold, CoverageDecision};
use crate::coverage::matrix::{build_matrix, SimilarityMatrix};
use crate::coverage::report::{aggregate, CoverageReport};
use crate::encode::TextEncoder;
use crate::error::{CoverageError, CoverageResult};
use crate::records::{CourseRecord, TrendSet};
use crate::text::normalize;

/// Default coverage threshold.
pub const DEFAULT_THRESHOLD: f64 = 0.3;

/// Default length of the top-N list.
pub const DEFAULT_TOP_N: usize = 10;

/// Tunables for one coverage run.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CoverageSettings {
    /// Minimum cosine similarity for a course to cover a trend
    pub threshold: f64,
    /// How many courses the report ranks
    pub top_n: usize,
}

impl Default for CoverageSettings {
    fn default() -> Self {
        Self {
            threshold: DEFAULT_THRESHOLD,
            top_n: DEFAULT_TOP_N,
        }
    }
}

/// Everything a coverage run produces.
#[derive(Debug, Clone)]
pub struct CoverageOutcome {
    /// Input courses with `normalized_text`, `best_trend_score` and
    /// `covered_trends` filled in
    pub courses: Vec<CourseRecord>,
    pub trends: TrendSet,
    pub matrix: SimilarityMatrix,
    pub decision: CoverageDecision,
    pub report: CoverageReport,
}

/// Run the full coverage pipeline.
///
/// Configuration problems (empty trend list, threshold outside [0, 1]) are
/// reported before any text is encoded. The encoder is fitted on the trend
/// phrases plus the course texts of this run.
pub fn run<E: TextEncoder + ?Sized>(
    mut courses: Vec<CourseRecord>,
    trends: TrendSet,
    encoder: &mut E,
    settings: CoverageSettings,
) -> CoverageResult<CoverageOutcome> {
    validate_threshold(settings.threshold)?;
    if trends.is_empty() {
        return Err(CoverageError::config("trend list is empty"));
    }

    let started = Instant::now();

    for course in &mut courses {
        course.normalized_text = normalize(&course.raw_text);
    }
    let course_texts: Vec<String> = courses.iter().map(|c| c.normalized_text.clone()).collect();
    let trend_texts = trends.ids();

    let corpus: Vec<String> = trend_texts.iter().chain(&course_texts).cloned().collect();
    encoder.fit(&corpus)?;

    let trend_vectors = encoder.encode(&trend_texts)?;
    let course_vectors = encoder.encode(&course_texts)?;
    debug!(
        trends = trend_vectors.len(),
        courses = course_vectors.len(),
        dim = encoder.dimension(),
        elapsed_ms = started.elapsed().as_millis() as u64,
        "Encoded trends and courses"
    );

    let matrix = build_matrix(
        &course_vectors,
        &trend_vectors,
        courses.iter().map(|c| c.name.clone()).collect(),
        trend_texts,
    )?;

    let decision = decide(&matrix, settings.threshold)?;

    for (i, course) in courses.iter_mut().enumerate() {
        course.best_trend_score = Some(decision.best_scores[i]);
        course.covered_trends = decision
            .covered_ids(&matrix, i)
            .into_iter()
            .map(str::to_string)
            .collect();
    }

    let covered: Vec<Vec<String>> = courses.iter().map(|c| c.covered_trends.clone()).collect();
    let report = aggregate(
        &courses,
        &decision.best_scores,
        &covered,
        &trends,
        settings.threshold,
        settings.top_n,
    )?;

    info!(
        courses = report.course_count,
        trends = trends.len(),
        threshold = settings.threshold,
        coverage_rate = report.coverage_rate,
        elapsed_ms = started.elapsed().as_millis() as u64,
        "Coverage run complete"
    );

    Ok(CoverageOutcome {
        courses,
        trends,
        matrix,
        decision,
        report,
    })
}
