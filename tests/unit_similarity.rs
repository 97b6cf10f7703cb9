// Unit tests for the similarity matrix and the encoders feeding it.
//
// Checks the numeric invariants (bounds, symmetry, zero norm) and the shape
// contract for any number of courses and trends, including zero.

use proptest::prelude::*;

use trendcover::coverage::matrix::{build_matrix, cosine_similarity};
use trendcover::encode::tfidf::TfIdfEncoder;
use trendcover::encode::TextEncoder;
use trendcover::error::CoverageError;

fn labels(prefix: &str, n: usize) -> Vec<String> {
    (0..n).map(|i| format!("{prefix}{i}")).collect()
}

fn vectors(dim: usize) -> impl Strategy<Value = Vec<Vec<f64>>> {
    prop::collection::vec(prop::collection::vec(-10.0f64..10.0, dim), 0..6)
}

// ============================================================
// build_matrix: properties
// ============================================================

proptest! {
    #[test]
    fn similarities_stay_within_bounds(
        (courses, trends) in (1usize..8).prop_flat_map(|d| (vectors(d), vectors(d)))
    ) {
        let m = build_matrix(
            &courses,
            &trends,
            labels("c", courses.len()),
            labels("t", trends.len()),
        ).unwrap();

        prop_assert_eq!(m.shape(), (courses.len(), trends.len()));
        for v in m.values().iter() {
            prop_assert!(v.is_finite());
            prop_assert!((-1.0..=1.0).contains(v));
        }
    }

    #[test]
    fn matrix_agrees_with_scalar_cosine(
        (courses, trends) in (1usize..6).prop_flat_map(|d| (vectors(d), vectors(d)))
    ) {
        let m = build_matrix(
            &courses,
            &trends,
            labels("c", courses.len()),
            labels("t", trends.len()),
        ).unwrap();
        for (i, c) in courses.iter().enumerate() {
            for (j, t) in trends.iter().enumerate() {
                let expected = cosine_similarity(c, t);
                prop_assert!((m.get(i, j).unwrap() - expected).abs() < 1e-9);
            }
        }
    }
}

// ============================================================
// build_matrix: edge cases
// ============================================================

#[test]
fn zero_norm_rows_score_zero() {
    let m = build_matrix(
        &[vec![0.0, 0.0, 0.0], vec![1.0, 0.0, 0.0]],
        &[vec![0.0, 0.0, 0.0], vec![3.0, 0.0, 0.0]],
        labels("c", 2),
        labels("t", 2),
    )
    .unwrap();
    assert_eq!(m.get(0, 0), Some(0.0));
    assert_eq!(m.get(0, 1), Some(0.0));
    assert_eq!(m.get(1, 0), Some(0.0));
    assert_eq!(m.get(1, 1), Some(1.0));
}

#[test]
fn labels_follow_input_order() {
    let m = build_matrix(
        &[vec![1.0], vec![1.0]],
        &[vec![1.0]],
        vec!["zeta".into(), "alpha".into()],
        vec!["ethics".into()],
    )
    .unwrap();
    assert_eq!(m.rows(), ["zeta".to_string(), "alpha".to_string()]);
    assert_eq!(m.columns(), ["ethics".to_string()]);
}

#[test]
fn scalar_cosine_is_symmetric() {
    let a = [0.3, -1.2, 4.0];
    let b = [2.0, 0.5, -0.7];
    assert!((cosine_similarity(&a, &b) - cosine_similarity(&b, &a)).abs() < 1e-15);
}

// ============================================================
// TF-IDF encoder: contract
// ============================================================

#[test]
fn tfidf_vectors_are_unit_length_or_zero() {
    let corpus: Vec<String> = ["machine learning", "ethics of ai", "", "!!!"]
        .iter()
        .map(|s| s.to_string())
        .collect();
    let mut encoder = TfIdfEncoder::new(false);
    encoder.fit(&corpus).unwrap();
    let vectors = encoder.encode(&corpus).unwrap();

    assert_eq!(vectors.len(), 4);
    for v in &vectors {
        assert_eq!(v.len(), encoder.dimension());
        let norm: f64 = v.iter().map(|x| x * x).sum::<f64>().sqrt();
        assert!(norm == 0.0 || (norm - 1.0).abs() < 1e-12);
    }
    // Empty and punctuation-only texts encode to the zero vector
    assert!(vectors[2].iter().all(|&x| x == 0.0));
    assert!(vectors[3].iter().all(|&x| x == 0.0));
}

#[test]
fn tfidf_vocabulary_is_sorted_and_deterministic() {
    let corpus = vec!["zebra apple".to_string(), "mango apple".to_string()];
    let mut a = TfIdfEncoder::new(false);
    let mut b = TfIdfEncoder::new(false);
    a.fit(&corpus).unwrap();
    b.fit(&corpus).unwrap();
    assert_eq!(a.vocabulary(), vec!["apple", "mango", "zebra"]);
    assert_eq!(a.encode(&corpus).unwrap(), b.encode(&corpus).unwrap());
    // Shared terms get the lower weight
    assert!(a.idf("apple").unwrap() < a.idf("zebra").unwrap());
}

#[test]
fn tfidf_encode_before_fit_fails() {
    let encoder = TfIdfEncoder::new(false);
    let err = encoder.encode(&["text".to_string()]).unwrap_err();
    assert!(matches!(err, CoverageError::EncodingFailure { .. }));
}
