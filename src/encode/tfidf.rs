// TF-IDF vectorizer: the frequency-weighted encoding strategy.
//
// The vocabulary is fitted once on the union of the trend phrases and the
// course texts, then both sides are encoded against that same vocabulary so
// their vectors share dimensions. Zero model downloads, fully deterministic:
// the vocabulary is sorted, so the same input always yields the same columns.
//
// Weighting follows the usual smoothed scheme:
//   weight(t, d) = count(t, d) * (ln((1 + n) / (1 + df(t))) + 1)
// and every vector is L2-normalized.

use std::collections::{BTreeSet, HashMap, HashSet};

use stop_words::{get, LANGUAGE};
use tracing::debug;

use super::TextEncoder;
use crate::error::{CoverageError, CoverageResult};

/// Frequency-weighted encoder. Call `fit` before `encode`.
pub struct TfIdfEncoder {
    /// Drop English stop words before counting
    pub remove_stop_words: bool,
    stop_words: HashSet<String>,
    /// term -> column index (columns follow sorted term order)
    vocabulary: HashMap<String, usize>,
    idf: Vec<f64>,
    fitted: bool,
}

impl Default for TfIdfEncoder {
    fn default() -> Self {
        Self::new(true)
    }
}

impl TfIdfEncoder {
    pub fn new(remove_stop_words: bool) -> Self {
        let stop_words = if remove_stop_words {
            get(LANGUAGE::English).into_iter().collect()
        } else {
            HashSet::new()
        };

        Self {
            remove_stop_words,
            stop_words,
            vocabulary: HashMap::new(),
            idf: Vec::new(),
            fitted: false,
        }
    }

    /// Split text into lower-cased alphanumeric tokens of two or more characters.
    pub fn tokenize(&self, text: &str) -> Vec<String> {
        text.split(|c: char| !c.is_alphanumeric())
            .filter(|t| t.chars().count() >= 2)
            .map(str::to_lowercase)
            .filter(|t| !self.stop_words.contains(t))
            .collect()
    }

    /// Fitted vocabulary in column order.
    pub fn vocabulary(&self) -> Vec<&str> {
        let mut terms: Vec<(&str, usize)> = self
            .vocabulary
            .iter()
            .map(|(t, &i)| (t.as_str(), i))
            .collect();
        terms.sort_by_key(|&(_, i)| i);
        terms.into_iter().map(|(t, _)| t).collect()
    }

    pub fn idf(&self, term: &str) -> Option<f64> {
        self.vocabulary.get(term).map(|&i| self.idf[i])
    }
}

impl TextEncoder for TfIdfEncoder {
    fn fit(&mut self, corpus: &[String]) -> CoverageResult<()> {
        let documents: Vec<HashSet<String>> = corpus
            .iter()
            .map(|doc| self.tokenize(doc).into_iter().collect())
            .collect();

        let terms: BTreeSet<&String> = documents.iter().flatten().collect();
        self.vocabulary = terms
            .into_iter()
            .enumerate()
            .map(|(i, t)| (t.clone(), i))
            .collect();

        let mut df = vec![0usize; self.vocabulary.len()];
        for doc in &documents {
            for term in doc {
                df[self.vocabulary[term]] += 1;
            }
        }

        let n = documents.len() as f64;
        self.idf = df
            .into_iter()
            .map(|d| ((1.0 + n) / (1.0 + d as f64)).ln() + 1.0)
            .collect();
        self.fitted = true;

        debug!(
            documents = documents.len(),
            vocabulary = self.vocabulary.len(),
            "Fitted TF-IDF vocabulary"
        );

        Ok(())
    }

    fn encode(&self, items: &[String]) -> CoverageResult<Vec<Vec<f64>>> {
        if !self.fitted {
            return Err(CoverageError::encoding(
                "tf-idf encoding",
                "encoder used before its vocabulary was fitted",
            ));
        }

        let dim = self.vocabulary.len();
        let vectors = items
            .iter()
            .map(|item| {
                let mut v = vec![0.0_f64; dim];
                // Tokens outside the fitted vocabulary carry no weight
                for token in self.tokenize(item) {
                    if let Some(&col) = self.vocabulary.get(&token) {
                        v[col] += self.idf[col];
                    }
                }
                let norm = v.iter().map(|x| x * x).sum::<f64>().sqrt();
                if norm > 0.0 {
                    for x in &mut v {
                        *x /= norm;
                    }
                }
                v
            })
            .collect();

        Ok(vectors)
    }

    fn dimension(&self) -> usize {
        self.vocabulary.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn docs(texts: &[&str]) -> Vec<String> {
        texts.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_encode_before_fit_fails() {
        let encoder = TfIdfEncoder::new(false);
        let result = encoder.encode(&docs(&["anything"]));
        assert!(matches!(
            result,
            Err(CoverageError::EncodingFailure { .. })
        ));
    }

    #[test]
    fn test_vocabulary_is_sorted_and_fixed_dimension() {
        let mut encoder = TfIdfEncoder::new(false);
        encoder.fit(&docs(&["vision computer", "ethics"])).unwrap();
        assert_eq!(encoder.vocabulary(), vec!["computer", "ethics", "vision"]);

        let vectors = encoder.encode(&docs(&["ethics", "", "unknown words"])).unwrap();
        assert_eq!(vectors.len(), 3);
        assert!(vectors.iter().all(|v| v.len() == 3));
    }

    #[test]
    fn test_empty_and_unknown_text_encode_to_zero() {
        let mut encoder = TfIdfEncoder::new(false);
        encoder.fit(&docs(&["machine learning"])).unwrap();
        let vectors = encoder.encode(&docs(&["", "nothing shared"])).unwrap();
        assert!(vectors.iter().flatten().all(|&x| x == 0.0));
    }

    #[test]
    fn test_vectors_are_unit_length() {
        let mut encoder = TfIdfEncoder::new(false);
        let corpus = docs(&["machine learning", "deep learning lab", "ethics"]);
        encoder.fit(&corpus).unwrap();
        for v in encoder.encode(&corpus).unwrap() {
            let norm = v.iter().map(|x| x * x).sum::<f64>().sqrt();
            assert!((norm - 1.0).abs() < 1e-12);
        }
    }

    #[test]
    fn test_rarer_terms_get_higher_idf() {
        let mut encoder = TfIdfEncoder::new(false);
        encoder
            .fit(&docs(&["learning ethics", "learning vision", "learning robotics"]))
            .unwrap();
        let common = encoder.idf("learning").unwrap();
        let rare = encoder.idf("ethics").unwrap();
        assert!((common - 1.0).abs() < 1e-12, "df = n gives idf 1.0");
        assert!(rare > common);
    }

    #[test]
    fn test_tokenize_splits_on_punctuation_and_drops_short_tokens() {
        let encoder = TfIdfEncoder::new(false);
        assert_eq!(
            encoder.tokenize("Hands-on AI: a lab (3D)"),
            vec!["hands", "on", "ai", "lab", "3d"]
        );
    }

    #[test]
    fn test_stop_words_removed_when_enabled() {
        let encoder = TfIdfEncoder::new(true);
        let tokens = encoder.tokenize("the ethics of the machine");
        assert!(!tokens.contains(&"the".to_string()));
        assert!(tokens.contains(&"ethics".to_string()));
    }
}
