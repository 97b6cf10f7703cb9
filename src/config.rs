use std::env;
use std::path::PathBuf;
use std::str::FromStr;

use anyhow::Result;

use crate::coverage::decision::validate_threshold;
use crate::encode::embeddings::DEFAULT_BATCH_SIZE;
use crate::encode::EncoderStrategy;
use crate::error::CoverageError;
use crate::pipeline::coverage::{CoverageSettings, DEFAULT_THRESHOLD, DEFAULT_TOP_N};

/// Default chat completions endpoint for the summarizer.
pub const DEFAULT_LLM_API_URL: &str = "https://chat.nolai.fyi/api/chat/completions";

/// Default summarizer model.
pub const DEFAULT_LLM_MODEL: &str = "gemma3:4b";

/// Central configuration loaded from environment variables.
///
/// Secrets come from env vars only. The .env file is loaded at startup via
/// dotenvy; CLI flags override individual values afterwards.
#[derive(Debug, Clone)]
pub struct Config {
    /// Minimum similarity for a course to cover a trend
    pub threshold: f64,
    pub encoder: EncoderStrategy,
    pub top_n: usize,
    /// Directory containing the ONNX model files
    pub model_dir: PathBuf,
    /// Texts per dense encoding batch
    pub batch_size: usize,
    /// Where reports and exports are written
    pub output_dir: PathBuf,
    /// Site prefix for relative links on the listing page
    pub base_url: String,
    pub llm_api_url: String,
    pub llm_api_key: String,
    pub llm_model: String,
}

impl Config {
    /// Load configuration from the process environment.
    pub fn load() -> Result<Self> {
        Ok(Self::from_lookup(|key| env::var(key).ok())?)
    }

    /// Build configuration from any key lookup. Unset and blank values fall
    /// back to defaults; present but unparsable values are errors.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, CoverageError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let threshold = parse_or(get("TRENDCOVER_THRESHOLD"), "TRENDCOVER_THRESHOLD", DEFAULT_THRESHOLD)?;
        validate_threshold(threshold)?;

        let encoder = match get("TRENDCOVER_ENCODER") {
            Some(name) => EncoderStrategy::from_str(&name)?,
            None => EncoderStrategy::default(),
        };

        let top_n = parse_or(get("TRENDCOVER_TOP_N"), "TRENDCOVER_TOP_N", DEFAULT_TOP_N)?;

        let batch_size = parse_or(get("TRENDCOVER_BATCH_SIZE"), "TRENDCOVER_BATCH_SIZE", DEFAULT_BATCH_SIZE)?;
        if batch_size == 0 {
            return Err(CoverageError::config("TRENDCOVER_BATCH_SIZE must be at least 1"));
        }

        let model_dir = get("TRENDCOVER_MODEL_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(crate::encode::download::default_model_dir);

        Ok(Self {
            threshold,
            encoder,
            top_n,
            model_dir,
            batch_size,
            output_dir: get("TRENDCOVER_OUTPUT_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("output")),
            base_url: get("TRENDCOVER_BASE_URL").unwrap_or_default(),
            llm_api_url: get("LLM_API_URL").unwrap_or_else(|| DEFAULT_LLM_API_URL.to_string()),
            llm_api_key: get("LLM_API_KEY").unwrap_or_default(),
            llm_model: get("LLM_MODEL").unwrap_or_else(|| DEFAULT_LLM_MODEL.to_string()),
        })
    }

    /// Coverage tunables for the pipeline.
    pub fn coverage_settings(&self) -> CoverageSettings {
        CoverageSettings {
            threshold: self.threshold,
            top_n: self.top_n,
        }
    }

    /// Check that the summarizer endpoint is usable.
    /// Call this before `summarize` unless the offline summarizer is used.
    pub fn require_llm(&self) -> Result<()> {
        if self.llm_api_key.is_empty() {
            anyhow::bail!(
                "LLM_API_KEY not set. Add it to your .env file,\n\
                 or pass --no-llm to keep an excerpt of each description instead."
            );
        }
        Ok(())
    }

    /// Validate that the chosen encoder has what it needs.
    /// For the dense encoder the model files must exist.
    pub fn require_encoder(&self) -> Result<()> {
        if self.encoder == EncoderStrategy::DenseEmbedding
            && !crate::encode::download::embedding_files_present(&self.model_dir)
        {
            anyhow::bail!(
                "Embedding model files not found in {}\n\
                 Run `trendcover download-model` to download them.\n\
                 Or set TRENDCOVER_ENCODER=tfidf to use the frequency-weighted encoder instead.",
                self.model_dir.display()
            );
        }
        Ok(())
    }
}

fn parse_or<T: FromStr>(value: Option<String>, key: &str, default: T) -> Result<T, CoverageError> {
    match value {
        None => Ok(default),
        Some(raw) => raw
            .parse()
            .map_err(|_| CoverageError::config(format!("{key} has an invalid value '{raw}'"))),
    }
}
