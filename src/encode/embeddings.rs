// Sentence embedding encoder using all-MiniLM-L6-v2 (dense strategy).
//
// TF-IDF only matches shared words: "chatbots" and "conversational agents"
// score zero against each other. This encoder maps each text to a 384-dim
// vector with a local sentence transformer, so cosine similarity reflects
// semantic proximity instead of vocabulary overlap.
//
// The model runs locally via ONNX. Mean pooling over the attention mask
// matches how the model was trained. Texts are encoded in fixed-size batches
// to amortize inference overhead; a batch never influences another batch's
// output, so results do not depend on the batch size.

use std::path::Path;
use std::sync::Mutex;

use anyhow::{Context, Result};
use ort::session::Session;
use ort::value::Tensor;
use tokenizers::Tokenizer;
use tracing::debug;

use super::TextEncoder;
use crate::error::{CoverageError, CoverageResult};

/// Embedding dimension for all-MiniLM-L6-v2.
pub const EMBEDDING_DIM: usize = 384;

/// Default number of texts per inference call.
pub const DEFAULT_BATCH_SIZE: usize = 32;

/// Sentence embedder backed by a local ONNX model.
///
/// The session sits behind a Mutex because `Session::run` needs `&mut`,
/// while encoders are shared by reference through the pipeline.
pub struct SentenceEmbedder {
    session: Mutex<Session>,
    tokenizer: Tokenizer,
    batch_size: usize,
}

impl SentenceEmbedder {
    /// Load the sentence embedding model and tokenizer from the given directory.
    ///
    /// Expects `model.onnx` and `tokenizer.json` in the directory.
    /// Run `trendcover download-model` first if they don't exist.
    pub fn load(model_dir: &Path, batch_size: usize) -> Result<Self> {
        let model_path = model_dir.join("model.onnx");
        let tokenizer_path = model_dir.join("tokenizer.json");

        if !model_path.exists() {
            anyhow::bail!(
                "Embedding model not found: {}\nRun `trendcover download-model` to download it.",
                model_path.display()
            );
        }
        if !tokenizer_path.exists() {
            anyhow::bail!(
                "Embedding tokenizer not found: {}\nRun `trendcover download-model` to download it.",
                tokenizer_path.display()
            );
        }

        let session = Session::builder()
            .context("Failed to create ONNX session builder")?
            .commit_from_file(&model_path)
            .with_context(|| {
                format!(
                    "Failed to load embedding model from {}",
                    model_path.display()
                )
            })?;

        let tokenizer = Tokenizer::from_file(&tokenizer_path)
            .map_err(|e| anyhow::anyhow!("Failed to load embedding tokenizer: {}", e))?;

        debug!(
            batch_size = batch_size,
            "Loaded sentence embedding model from {}",
            model_dir.display()
        );

        Ok(Self {
            session: Mutex::new(session),
            tokenizer,
            batch_size: batch_size.max(1),
        })
    }

    /// Embed texts batch by batch, preserving input order.
    pub fn embed_batches(&self, texts: &[String]) -> Result<Vec<Vec<f64>>> {
        in_batches(texts, self.batch_size, |chunk| {
            embed_sync(&self.session, &self.tokenizer, chunk)
        })
    }
}

/// Run `embed_batch` over consecutive chunks of at most `batch_size` texts
/// and concatenate the results in input order.
///
/// Each call must return exactly one vector per text in its chunk.
fn in_batches<F>(texts: &[String], batch_size: usize, mut embed_batch: F) -> Result<Vec<Vec<f64>>>
where
    F: FnMut(&[String]) -> Result<Vec<Vec<f64>>>,
{
    let mut embeddings = Vec::with_capacity(texts.len());
    for chunk in texts.chunks(batch_size.max(1)) {
        let vectors = embed_batch(chunk)?;
        if vectors.len() != chunk.len() {
            anyhow::bail!(
                "Batch of {} texts produced {} embeddings",
                chunk.len(),
                vectors.len()
            );
        }
        embeddings.extend(vectors);
    }
    Ok(embeddings)
}

impl TextEncoder for SentenceEmbedder {
    /// The model is pretrained; there is nothing to fit.
    fn fit(&mut self, _corpus: &[String]) -> CoverageResult<()> {
        Ok(())
    }

    fn encode(&self, items: &[String]) -> CoverageResult<Vec<Vec<f64>>> {
        let vectors = self
            .embed_batches(items)
            .map_err(|e| CoverageError::encoding("dense embedding", format!("{e:#}")))?;

        if vectors.len() != items.len() {
            return Err(CoverageError::encoding(
                "dense embedding",
                format!("{} vectors for {} items", vectors.len(), items.len()),
            ));
        }
        if let Some(bad) = vectors.iter().position(|v| v.len() != EMBEDDING_DIM) {
            return Err(CoverageError::encoding(
                "dense embedding",
                format!(
                    "item {bad} has dimension {}, expected {EMBEDDING_DIM}",
                    vectors[bad].len()
                ),
            ));
        }

        Ok(vectors)
    }

    fn dimension(&self) -> usize {
        EMBEDDING_DIM
    }
}

/// Synchronous embedding of one batch: tokenization, inference, mean pooling.
fn embed_sync(
    session: &Mutex<Session>,
    tokenizer: &Tokenizer,
    texts: &[String],
) -> Result<Vec<Vec<f64>>> {
    if texts.is_empty() {
        return Ok(Vec::new());
    }

    let encodings: Vec<_> = texts
        .iter()
        .map(|t| {
            tokenizer
                .encode(t.as_str(), true)
                .map_err(|e| anyhow::anyhow!("Tokenization failed: {}", e))
        })
        .collect::<Result<Vec<_>>>()?;

    let batch_size = encodings.len();
    let max_len = encodings
        .iter()
        .map(|e| e.get_ids().len())
        .max()
        .unwrap_or(0);

    if max_len == 0 {
        return Ok(vec![vec![0.0; EMBEDDING_DIM]; batch_size]);
    }

    // BERT inputs, padded to the longest sequence in the batch:
    //   input_ids: token IDs (pad with 0)
    //   attention_mask: 1 for real tokens, 0 for padding
    //   token_type_ids: all zeros for single-sentence input
    let mut input_ids_flat: Vec<i64> = Vec::with_capacity(batch_size * max_len);
    let mut attention_mask_flat: Vec<i64> = Vec::with_capacity(batch_size * max_len);
    let mut token_type_ids_flat: Vec<i64> = Vec::with_capacity(batch_size * max_len);

    for enc in &encodings {
        let ids = enc.get_ids();
        let mask = enc.get_attention_mask();
        let seq_len = ids.len();
        let pad_len = max_len - seq_len;

        input_ids_flat.extend(ids.iter().map(|&id| id as i64));
        attention_mask_flat.extend(mask.iter().map(|&m| m as i64));
        token_type_ids_flat.extend(std::iter::repeat_n(0i64, seq_len));

        input_ids_flat.extend(std::iter::repeat_n(0i64, pad_len));
        attention_mask_flat.extend(std::iter::repeat_n(0i64, pad_len));
        token_type_ids_flat.extend(std::iter::repeat_n(0i64, pad_len));
    }

    let shape = [batch_size as i64, max_len as i64];

    let input_ids_tensor =
        Tensor::from_array((shape, input_ids_flat)).context("Failed to create input_ids tensor")?;
    let attention_mask_tensor = Tensor::from_array((shape, attention_mask_flat.clone()))
        .context("Failed to create attention_mask tensor")?;
    let token_type_ids_tensor = Tensor::from_array((shape, token_type_ids_flat))
        .context("Failed to create token_type_ids tensor")?;

    // last_hidden_state: [batch, seq_len, 384]
    let hidden_states = {
        let mut session = session
            .lock()
            .map_err(|e| anyhow::anyhow!("Session lock poisoned: {}", e))?;

        let outputs = session
            .run(ort::inputs! {
                "input_ids" => input_ids_tensor,
                "attention_mask" => attention_mask_tensor,
                "token_type_ids" => token_type_ids_tensor
            })
            .context("Embedding ONNX inference failed")?;

        let (_shape, data) = outputs[0]
            .try_extract_tensor::<f32>()
            .context("Failed to extract embedding output tensor")?;

        data.to_vec()
    };

    let expected = batch_size * max_len * EMBEDDING_DIM;
    if hidden_states.len() != expected {
        anyhow::bail!(
            "Unexpected embedding output size {} (expected {})",
            hidden_states.len(),
            expected
        );
    }

    Ok(mean_pool(&hidden_states, &attention_mask_flat, batch_size, max_len))
}

/// Average token embeddings weighted by the attention mask.
///
/// A row whose mask is all zeros stays a zero vector.
fn mean_pool(
    hidden_states: &[f32],
    attention_mask: &[i64],
    batch_size: usize,
    max_len: usize,
) -> Vec<Vec<f64>> {
    let mut embeddings = Vec::with_capacity(batch_size);

    for i in 0..batch_size {
        let mut sum = vec![0.0_f64; EMBEDDING_DIM];
        let mut mask_sum = 0.0_f64;

        for j in 0..max_len {
            let mask_val = attention_mask[i * max_len + j] as f64;
            if mask_val > 0.0 {
                mask_sum += mask_val;
                let offset = (i * max_len + j) * EMBEDDING_DIM;
                for (k, s) in sum.iter_mut().enumerate() {
                    *s += hidden_states[offset + k] as f64 * mask_val;
                }
            }
        }

        if mask_sum > 0.0 {
            for val in &mut sum {
                *val /= mask_sum;
            }
        }

        embeddings.push(sum);
    }

    debug!(
        batch_size = batch_size,
        dim = EMBEDDING_DIM,
        "Computed sentence embeddings"
    );

    embeddings
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mean_pool_ignores_padding() {
        // One text, two positions: a real token of all 1.0 and a padded token of all 9.0
        let mut hidden = vec![1.0_f32; EMBEDDING_DIM];
        hidden.extend(vec![9.0_f32; EMBEDDING_DIM]);
        let pooled = mean_pool(&hidden, &[1, 0], 1, 2);
        assert_eq!(pooled.len(), 1);
        assert!(pooled[0].iter().all(|&v| (v - 1.0).abs() < 1e-12));
    }

    #[test]
    fn test_mean_pool_averages_real_tokens() {
        let mut hidden = vec![1.0_f32; EMBEDDING_DIM];
        hidden.extend(vec![3.0_f32; EMBEDDING_DIM]);
        let pooled = mean_pool(&hidden, &[1, 1], 1, 2);
        assert!(pooled[0].iter().all(|&v| (v - 2.0).abs() < 1e-12));
    }

    #[test]
    fn test_mean_pool_all_masked_is_zero() {
        let hidden = vec![5.0_f32; EMBEDDING_DIM];
        let pooled = mean_pool(&hidden, &[0], 1, 1);
        assert!(pooled[0].iter().all(|&v| v == 0.0));
    }

    #[test]
    fn test_mean_pool_keeps_rows_separate() {
        // Two texts of one token each
        let mut hidden = vec![2.0_f32; EMBEDDING_DIM];
        hidden.extend(vec![-1.0_f32; EMBEDDING_DIM]);
        let pooled = mean_pool(&hidden, &[1, 1], 2, 1);
        assert!((pooled[0][0] - 2.0).abs() < 1e-12);
        assert!((pooled[1][0] + 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_load_fails_without_model_files() {
        let dir = std::env::temp_dir().join("trendcover-embed-missing");
        let err = SentenceEmbedder::load(&dir, 8).err().unwrap();
        assert!(err.to_string().contains("download-model"));
    }

    fn fake_vector(text: &str) -> Vec<f64> {
        vec![text.len() as f64, text.bytes().map(f64::from).sum()]
    }

    #[test]
    fn test_batch_size_does_not_change_results() {
        let texts: Vec<String> = ["vision", "ethics", "ml", "robotics", "dutch"]
            .iter()
            .map(|t| t.to_string())
            .collect();
        let expected: Vec<Vec<f64>> = texts.iter().map(|t| fake_vector(t)).collect();

        for batch_size in [1, 2, texts.len(), texts.len() + 3] {
            let mut calls = 0;
            let out = in_batches(&texts, batch_size, |chunk| {
                calls += 1;
                Ok(chunk.iter().map(|t| fake_vector(t)).collect())
            })
            .unwrap();
            assert_eq!(out, expected, "batch size {batch_size}");
            assert_eq!(calls, texts.len().div_ceil(batch_size));
        }
    }

    #[test]
    fn test_short_batch_is_an_error() {
        let texts = vec!["a".to_string(), "b".to_string(), "c".to_string()];
        let result = in_batches(&texts, 2, |chunk| Ok(vec![vec![0.0]; chunk.len() - 1]));
        assert!(result.is_err());
    }

    #[test]
    fn test_no_texts_means_no_batches() {
        let out = in_batches(&[], 4, |_| panic!("no batch expected")).unwrap();
        assert!(out.is_empty());
    }
}
