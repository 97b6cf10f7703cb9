// Coverage decision rule: which trends does each course cover?
//
// A course covers a trend when their similarity reaches the threshold. This
// is a per-trend comparison: one course can cover none, one or many trends.
// The best-match score is kept separately as the row maximum; it decides
// whether the course counts toward the coverage rate.

use ndarray::Array2;

use super::matrix::SimilarityMatrix;
use crate::error::{CoverageError, CoverageResult};

/// Per-course outcome of thresholding a similarity matrix.
#[derive(Debug, Clone, PartialEq)]
pub struct CoverageDecision {
    pub threshold: f64,
    /// Row maximum of the similarity matrix, one per course
    pub best_scores: Vec<f64>,
    /// Column indices of covered trends per course, ascending
    pub covered: Vec<Vec<usize>>,
    /// `similarity >= threshold`, same shape as the matrix
    pub covered_matrix: Array2<bool>,
}

impl CoverageDecision {
    /// Covered trend ids for course `row`, in trend order.
    pub fn covered_ids<'a>(&'a self, matrix: &'a SimilarityMatrix, row: usize) -> Vec<&'a str> {
        self.covered
            .get(row)
            .map(|cols| cols.iter().map(|&j| matrix.columns()[j].as_str()).collect())
            .unwrap_or_default()
    }
}

/// Check a coverage threshold: finite and within [0, 1].
pub fn validate_threshold(threshold: f64) -> CoverageResult<()> {
    if !threshold.is_finite() || !(0.0..=1.0).contains(&threshold) {
        return Err(CoverageError::config(format!(
            "coverage threshold must be within [0, 1], got {threshold}"
        )));
    }
    Ok(())
}

/// Apply the threshold to every cell of the matrix.
///
/// Fails with `InvalidConfiguration` when the threshold is out of range or the
/// matrix has no trend columns (a best-match score over zero trends is
/// undefined).
pub fn decide(matrix: &SimilarityMatrix, threshold: f64) -> CoverageResult<CoverageDecision> {
    validate_threshold(threshold)?;

    let (n_courses, n_trends) = matrix.shape();
    if n_trends == 0 {
        return Err(CoverageError::config(
            "trend list is empty; best-match scores are undefined",
        ));
    }

    let values = matrix.values();
    let covered_matrix = values.mapv(|v| v >= threshold);

    let best_scores = values
        .rows()
        .into_iter()
        .map(|row| row.iter().copied().fold(f64::NEG_INFINITY, f64::max))
        .collect();

    let covered = (0..n_courses)
        .map(|i| {
            covered_matrix
                .row(i)
                .iter()
                .enumerate()
                .filter(|&(_, &hit)| hit)
                .map(|(j, _)| j)
                .collect()
        })
        .collect();

    Ok(CoverageDecision {
        threshold,
        best_scores,
        covered,
        covered_matrix,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coverage::matrix::build_matrix;

    /// Build a matrix whose cells equal the given values, using unit vectors.
    fn matrix_from_cosines(rows: &[&[f64]]) -> SimilarityMatrix {
        // Trend j is basis vector e_j in (M + 1) dims; course row i is
        // sum_j v_ij e_j plus a filler component that makes it unit length.
        let m = rows.first().map_or(0, |r| r.len());
        let trends: Vec<Vec<f64>> = (0..m)
            .map(|j| {
                let mut v = vec![0.0; m + 1];
                v[j] = 1.0;
                v
            })
            .collect();
        let courses: Vec<Vec<f64>> = rows
            .iter()
            .map(|r| {
                let mut v: Vec<f64> = r.to_vec();
                let used: f64 = r.iter().map(|x| x * x).sum();
                v.push((1.0 - used).max(0.0).sqrt());
                v
            })
            .collect();
        build_matrix(
            &courses,
            &trends,
            (0..rows.len()).map(|i| format!("c{i}")).collect(),
            (0..m).map(|j| format!("t{j}")).collect(),
        )
        .unwrap()
    }

    #[test]
    fn test_multiple_trends_can_be_covered() {
        let m = matrix_from_cosines(&[&[0.7, 0.55, 0.1]]);
        let d = decide(&m, 0.5).unwrap();
        assert_eq!(d.covered[0], vec![0, 1]);
        assert!((d.best_scores[0] - 0.7).abs() < 1e-9);
        assert_eq!(d.covered_ids(&m, 0), vec!["t0", "t1"]);
    }

    #[test]
    fn test_boolean_matrix_has_matrix_shape() {
        let m = matrix_from_cosines(&[&[0.1, 0.2], &[0.3, 0.0], &[0.0, 0.0]]);
        let d = decide(&m, 0.15).unwrap();
        assert_eq!(d.covered_matrix.dim(), (3, 2));
        assert!(!d.covered_matrix[(0, 0)]);
        assert!(d.covered_matrix[(0, 1)]);
        assert!(d.covered_matrix[(1, 0)]);
        assert!(d.covered[2].is_empty());
    }

    #[test]
    fn test_threshold_zero_covers_all_nonnegative() {
        let m = matrix_from_cosines(&[&[0.0, 0.4]]);
        let d = decide(&m, 0.0).unwrap();
        assert_eq!(d.covered[0], vec![0, 1]);
    }

    #[test]
    fn test_threshold_one_needs_exact_match() {
        let m = matrix_from_cosines(&[&[0.99, 0.3]]);
        let d = decide(&m, 1.0).unwrap();
        assert!(d.covered[0].is_empty());
    }

    #[test]
    fn test_threshold_out_of_range_rejected() {
        let m = matrix_from_cosines(&[&[0.5]]);
        for bad in [-0.1, 1.1, f64::NAN, f64::INFINITY] {
            assert!(matches!(
                decide(&m, bad),
                Err(CoverageError::InvalidConfiguration(_))
            ));
        }
    }

    #[test]
    fn test_no_trends_is_invalid_configuration() {
        let m = build_matrix(&[vec![1.0]], &[], vec!["c".into()], vec![]).unwrap();
        assert!(matches!(
            decide(&m, 0.3),
            Err(CoverageError::InvalidConfiguration(_))
        ));
    }

    #[test]
    fn test_no_courses_is_fine_at_this_stage() {
        let m = build_matrix(&[], &[vec![1.0]], vec![], vec!["t".into()]).unwrap();
        let d = decide(&m, 0.3).unwrap();
        assert!(d.best_scores.is_empty());
        assert!(d.covered.is_empty());
    }
}
