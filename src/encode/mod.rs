// Text encoders: turn normalized text into fixed-size vectors.
//
// Two interchangeable strategies satisfy the same contract: TF-IDF weighting
// (deterministic, no model files) and dense sentence embeddings (semantic,
// needs the ONNX model). The pipeline only sees `Encoder`, so switching
// strategy is a configuration change, not a code path.

pub mod download;
pub mod embeddings;
pub mod tfidf;

use std::fmt;
use std::path::Path;
use std::str::FromStr;

use anyhow::Result;

use crate::error::{CoverageError, CoverageResult};
use embeddings::SentenceEmbedder;
use tfidf::TfIdfEncoder;

/// Contract shared by every encoding strategy.
///
/// `encode` returns one vector per item, in input order, all of length
/// `dimension()`. Empty strings produce a valid (possibly all-zero) vector.
pub trait TextEncoder {
    /// Prepare the encoder on the full corpus of the run (trends + courses).
    fn fit(&mut self, corpus: &[String]) -> CoverageResult<()>;

    /// Encode a sequence of texts.
    fn encode(&self, items: &[String]) -> CoverageResult<Vec<Vec<f64>>>;

    /// Vector length produced by this encoder instance.
    fn dimension(&self) -> usize;
}

/// Which encoding strategy to use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EncoderStrategy {
    /// TF-IDF over a vocabulary fitted per run (default)
    #[default]
    FrequencyWeighted,
    /// all-MiniLM-L6-v2 sentence embeddings
    DenseEmbedding,
}

impl FromStr for EncoderStrategy {
    type Err = CoverageError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "tfidf" | "tf-idf" | "frequency" | "frequency-weighted" => {
                Ok(Self::FrequencyWeighted)
            }
            "embedding" | "embeddings" | "dense" | "dense-embedding" => Ok(Self::DenseEmbedding),
            other => Err(CoverageError::config(format!(
                "unknown encoder strategy '{other}' (expected 'tfidf' or 'embedding')"
            ))),
        }
    }
}

impl fmt::Display for EncoderStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::FrequencyWeighted => write!(f, "tfidf"),
            Self::DenseEmbedding => write!(f, "embedding"),
        }
    }
}

/// The encoder for one run, constructed once and passed to the pipeline.
pub enum Encoder {
    Frequency(TfIdfEncoder),
    Dense(SentenceEmbedder),
}

impl Encoder {
    /// Build the encoder for a strategy. The dense strategy loads its model
    /// from `model_dir`; the frequency strategy needs nothing on disk.
    pub fn for_strategy(
        strategy: EncoderStrategy,
        model_dir: &Path,
        batch_size: usize,
    ) -> Result<Self> {
        Ok(match strategy {
            EncoderStrategy::FrequencyWeighted => Self::Frequency(TfIdfEncoder::default()),
            EncoderStrategy::DenseEmbedding => {
                let dir = download::embedding_model_dir(model_dir);
                Self::Dense(SentenceEmbedder::load(&dir, batch_size)?)
            }
        })
    }

    pub fn strategy(&self) -> EncoderStrategy {
        match self {
            Self::Frequency(_) => EncoderStrategy::FrequencyWeighted,
            Self::Dense(_) => EncoderStrategy::DenseEmbedding,
        }
    }

    /// Human-readable description for reports.
    pub fn describe(&self) -> &'static str {
        match self {
            Self::Frequency(_) => "TF-IDF term weighting (vocabulary fitted on trends + courses)",
            Self::Dense(_) => "contextual sentence embeddings (all-MiniLM-L6-v2)",
        }
    }
}

impl TextEncoder for Encoder {
    fn fit(&mut self, corpus: &[String]) -> CoverageResult<()> {
        match self {
            Self::Frequency(e) => e.fit(corpus),
            Self::Dense(e) => e.fit(corpus),
        }
    }

    fn encode(&self, items: &[String]) -> CoverageResult<Vec<Vec<f64>>> {
        match self {
            Self::Frequency(e) => e.encode(items),
            Self::Dense(e) => e.encode(items),
        }
    }

    fn dimension(&self) -> usize {
        match self {
            Self::Frequency(e) => e.dimension(),
            Self::Dense(e) => e.dimension(),
        }
    }
}
