// Course × trend cosine similarity matrix.
//
// Both vector sets are L2-normalized row by row, then a single matrix product
// gives every pairwise cosine at once:
//
//   S = normalize(C) · normalize(T)ᵀ        (N × D) · (D × M) = N × M
//
// A zero vector stays zero through normalization, so any pair involving one
// has similarity exactly 0.0 rather than NaN.

use std::collections::HashSet;

use ndarray::{Array2, ArrayView1};
use tracing::debug;

use crate::error::{CoverageError, CoverageResult};

/// Pairwise similarities, rows labeled by course name and columns by trend id.
#[derive(Debug, Clone, PartialEq)]
pub struct SimilarityMatrix {
    rows: Vec<String>,
    columns: Vec<String>,
    values: Array2<f64>,
}

impl SimilarityMatrix {
    /// Course names in row order.
    pub fn rows(&self) -> &[String] {
        &self.rows
    }

    /// Trend ids in column order.
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn values(&self) -> &Array2<f64> {
        &self.values
    }

    /// (courses, trends)
    pub fn shape(&self) -> (usize, usize) {
        self.values.dim()
    }

    pub fn get(&self, row: usize, col: usize) -> Option<f64> {
        self.values.get((row, col)).copied()
    }

    pub fn row(&self, row: usize) -> ArrayView1<'_, f64> {
        self.values.row(row)
    }
}

/// Build the similarity matrix for course and trend vectors.
///
/// `row_labels` and `column_labels` must line up with the vector sets, and
/// row labels must be unique. Every vector must have the same dimension.
/// Zero courses or zero trends give an empty N × M matrix, not an error.
pub fn build_matrix(
    course_vectors: &[Vec<f64>],
    trend_vectors: &[Vec<f64>],
    row_labels: Vec<String>,
    column_labels: Vec<String>,
) -> CoverageResult<SimilarityMatrix> {
    if row_labels.len() != course_vectors.len() {
        return Err(CoverageError::encoding(
            "similarity matrix",
            format!(
                "{} course vectors for {} course names",
                course_vectors.len(),
                row_labels.len()
            ),
        ));
    }
    if column_labels.len() != trend_vectors.len() {
        return Err(CoverageError::encoding(
            "similarity matrix",
            format!(
                "{} trend vectors for {} trends",
                trend_vectors.len(),
                column_labels.len()
            ),
        ));
    }

    let mut seen = HashSet::with_capacity(row_labels.len());
    if let Some(dup) = row_labels.iter().find(|name| !seen.insert(name.as_str())) {
        return Err(CoverageError::config(format!(
            "course name '{dup}' appears more than once; matrix rows need unique names"
        )));
    }

    let dim = course_vectors
        .first()
        .or(trend_vectors.first())
        .map_or(0, Vec::len);

    let courses = unit_rows(course_vectors, dim, "course")?;
    let trends = unit_rows(trend_vectors, dim, "trend")?;

    let mut values = courses.dot(&trends.t());
    values.mapv_inplace(snap_unit);

    debug!(
        courses = values.nrows(),
        trends = values.ncols(),
        dim = dim,
        "Built similarity matrix"
    );

    Ok(SimilarityMatrix {
        rows: row_labels,
        columns: column_labels,
        values,
    })
}

/// Stack vectors into an N × D array with every non-zero row scaled to unit length.
fn unit_rows(vectors: &[Vec<f64>], dim: usize, side: &str) -> CoverageResult<Array2<f64>> {
    let mut out = Array2::<f64>::zeros((vectors.len(), dim));

    for (i, v) in vectors.iter().enumerate() {
        if v.len() != dim {
            return Err(CoverageError::encoding(
                "similarity matrix",
                format!("{side} vector {i} has dimension {}, expected {dim}", v.len()),
            ));
        }
        let norm = v.iter().map(|x| x * x).sum::<f64>().sqrt();
        if norm > 0.0 {
            for (dst, &x) in out.row_mut(i).iter_mut().zip(v) {
                *dst = x / norm;
            }
        }
    }

    Ok(out)
}

/// Cosine similarity of two vectors, 0.0 when either has zero norm or the
/// lengths differ.
pub fn cosine_similarity(a: &[f64], b: &[f64]) -> f64 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let dot: f64 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let mag_a: f64 = a.iter().map(|x| x * x).sum::<f64>().sqrt();
    let mag_b: f64 = b.iter().map(|x| x * x).sum::<f64>().sqrt();

    let denom = mag_a * mag_b;
    if denom == 0.0 {
        0.0
    } else {
        snap_unit(dot / denom)
    }
}

/// Distance from ±1 under which a cosine counts as an exact match.
const UNIT_EPSILON: f64 = 1e-12;

/// Clamp to [-1, 1] and land identical directions exactly on ±1.
fn snap_unit(v: f64) -> f64 {
    if (1.0 - v).abs() <= UNIT_EPSILON || v > 1.0 {
        1.0
    } else if (v + 1.0).abs() <= UNIT_EPSILON || v < -1.0 {
        -1.0
    } else {
        v
    }
}
