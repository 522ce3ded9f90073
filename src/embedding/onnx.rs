//! Synchronous ONNX embedding provider.
//!
//! Runs a sentence-transformers model (default all-MiniLM-L6-v2, 384 dimensions)
//! with mean pooling over the attention mask. Output is left unnormalized; the store
//! normalizes every vector it keeps.

use std::path::Path;

use hf_hub::api::sync::ApiBuilder;
use ort::inputs;
use ort::session::Session;
use ort::session::builder::GraphOptimizationLevel;
use ort::value::Tensor;
use parking_lot::Mutex;
use tokenizers::{Tokenizer, TruncationParams};
use tracing::{debug, info};

use crate::embedding::EmbeddingProvider;
use crate::errors::Error;

/// Maximum tokens fed to the model; longer input is truncated.
const MAX_TOKENS: usize = 512;

/// ONNX Runtime embedding provider.
pub struct OnnxEmbedder {
    session: Mutex<Session>,
    tokenizer: Tokenizer,
    requires_token_type_ids: bool,
}

impl OnnxEmbedder {
    /// Load model from cache or download on first use.
    ///
    /// Uses the blocking `hf_hub` client; files land in `cache_dir` and are only
    /// downloaded once.
    ///
    /// # Errors
    ///
    /// Returns error if the model or tokenizer cannot be fetched or loaded.
    pub fn new(model_id: &str, cache_dir: &Path) -> Result<Self, Error> {
        info!(model = model_id, cache = %cache_dir.display(), "Loading embedding model");
        let api = ApiBuilder::new()
            .with_cache_dir(cache_dir.to_path_buf())
            .build()?;
        let repo = api.model(model_id.to_string());

        let model_path = repo
            .get("onnx/model.onnx")
            .or_else(|_| repo.get("model.onnx"))?;
        let tokenizer_path = repo.get("tokenizer.json")?;

        let mut tokenizer = Tokenizer::from_file(tokenizer_path)?;
        tokenizer
            .with_padding(None)
            .with_truncation(Some(TruncationParams {
                max_length: MAX_TOKENS,
                ..Default::default()
            }))?;

        let session = Session::builder()?
            .with_optimization_level(GraphOptimizationLevel::Level1)
            .map_err(ort::Error::from)?
            .commit_from_file(&model_path)?;

        let requires_token_type_ids = session
            .inputs()
            .iter()
            .any(|input| input.name() == "token_type_ids");

        Ok(OnnxEmbedder {
            session: Mutex::new(session),
            tokenizer,
            requires_token_type_ids,
        })
    }
}

impl EmbeddingProvider for OnnxEmbedder {
    fn encode(&self, text: &str) -> Result<Vec<f32>, Error> {
        let encoding = self.tokenizer.encode(text, true)?;
        let input_ids = encoding.get_ids();
        let attention_mask = encoding.get_attention_mask();

        if input_ids.is_empty() {
            return Err(Error::Embedding(
                "Tokenizer produced no tokens".to_string(),
            ));
        }

        let seq_len = input_ids.len();

        let input_ids_vec: Vec<i64> = input_ids.iter().map(|&id| id as i64).collect();
        let attention_mask_vec: Vec<i64> = attention_mask.iter().map(|&m| m as i64).collect();

        let input_ids_tensor = Tensor::from_array(([1usize, seq_len], input_ids_vec))?;
        let attention_mask_tensor = Tensor::from_array(([1usize, seq_len], attention_mask_vec))?;

        let mut session = self.session.lock();

        // Only include token_type_ids if the model requires it
        let outputs = if self.requires_token_type_ids {
            let token_type_ids_tensor =
                Tensor::from_array(([1usize, seq_len], vec![0i64; seq_len]))?;
            session.run(inputs![
                "input_ids" => input_ids_tensor,
                "attention_mask" => attention_mask_tensor,
                "token_type_ids" => token_type_ids_tensor
            ])?
        } else {
            session.run(inputs![
                "input_ids" => input_ids_tensor,
                "attention_mask" => attention_mask_tensor
            ])?
        };

        let (shape, data) = outputs
            .get("last_hidden_state")
            .or_else(|| outputs.get("token_embeddings"))
            .ok_or_else(|| {
                Error::Embedding(
                    "Output tensor 'last_hidden_state' or 'token_embeddings' not found".to_string(),
                )
            })?
            .try_extract_tensor::<f32>()?;

        if shape.len() != 3 || shape[0] != 1 {
            return Err(Error::Shape(format!(
                "Expected output (1, seq_len, hidden), got {:?}",
                shape
            )));
        }
        let hidden_dim = shape[2] as usize;

        let mut pooled = vec![0.0f32; hidden_dim];
        for (token_idx, chunk) in data.chunks(hidden_dim).take(seq_len).enumerate() {
            let mask_value = attention_mask.get(token_idx).copied().unwrap_or(0) as f32;
            for (pooled_value, &value) in pooled.iter_mut().zip(chunk) {
                *pooled_value += value * mask_value;
            }
        }

        let mask_sum: f32 = attention_mask
            .iter()
            .take(seq_len)
            .map(|&m| m as f32)
            .sum::<f32>()
            .max(1e-9);

        for value in pooled.iter_mut() {
            *value /= mask_sum;
        }

        debug!(dimension = hidden_dim, tokens = seq_len, "Generated embedding");
        Ok(pooled)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embedding::l2_normalize;

    fn load() -> OnnxEmbedder {
        let cache = dirs::cache_dir()
            .unwrap_or_else(std::env::temp_dir)
            .join("reverie-test-models");
        OnnxEmbedder::new("sentence-transformers/all-MiniLM-L6-v2", &cache).expect("load model")
    }

    #[ignore]
    #[test]
    fn test_integration_simple_text() {
        let embedder = load();
        let embedding = embedder.encode("hello world").expect("embed text");

        assert_eq!(embedding.len(), 384);
        assert!(embedding.iter().all(|&x| x.is_finite()));
    }

    #[ignore]
    #[test]
    fn test_integration_related_texts_closer() {
        let embedder = load();
        let query = l2_normalize(&embedder.encode("a magical forest").unwrap());
        let near = l2_normalize(&embedder.encode("an enchanted woodland").unwrap());
        let far = l2_normalize(&embedder.encode("quarterly tax filing").unwrap());

        let near_score: f32 = query.iter().zip(&near).map(|(a, b)| a * b).sum();
        let far_score: f32 = query.iter().zip(&far).map(|(a, b)| a * b).sum();
        assert!(near_score > far_score);
    }

    #[ignore]
    #[test]
    fn test_integration_long_text_truncation() {
        let embedder = load();
        let long_text = "This is a sentence. ".repeat(300);
        let embedding = embedder.encode(&long_text).expect("embed long text");
        assert_eq!(embedding.len(), 384);
    }
}
