//! Text embedding providers and the vector helpers the store relies on.
//!
//! The store treats a provider as a black box `text -> Vec<f32>`. Two providers ship
//! with the crate:
//! - [`OnnxEmbedder`]: a sentence-transformers model run through ONNX Runtime.
//! - [`HashingEmbedder`]: deterministic feature hashing, no model download.

mod hashing;
mod onnx;

pub use hashing::{DEFAULT_HASHING_DIMS, HashingEmbedder};
pub use onnx::OnnxEmbedder;

use crate::config::{Config, EmbeddingBackend};
use crate::errors::Error;

/// Maps text to a dense vector.
///
/// Implementations must return the same dimensionality for every call within a
/// process lifetime. They are shared across threads, so any internal mutable state
/// needs its own synchronization.
pub trait EmbeddingProvider: Send + Sync {
    /// Embed a single text.
    fn encode(&self, text: &str) -> Result<Vec<f32>, Error>;
}

impl<T: EmbeddingProvider + ?Sized> EmbeddingProvider for Box<T> {
    fn encode(&self, text: &str) -> Result<Vec<f32>, Error> {
        (**self).encode(text)
    }
}

impl<T: EmbeddingProvider + ?Sized> EmbeddingProvider for std::sync::Arc<T> {
    fn encode(&self, text: &str) -> Result<Vec<f32>, Error> {
        (**self).encode(text)
    }
}

/// Build the provider selected by `config.embedding_backend`.
///
/// # Errors
///
/// Returns error if the ONNX model cannot be loaded or the hashing dimension is invalid.
pub fn from_config(config: &Config) -> Result<Box<dyn EmbeddingProvider>, Error> {
    Ok(match config.embedding_backend {
        EmbeddingBackend::Onnx => Box::new(OnnxEmbedder::new(
            &config.embedding_model,
            &config.model_cache,
        )?),
        EmbeddingBackend::Hashing => Box::new(HashingEmbedder::new(config.hashing_dimensions)?),
    })
}

/// Scale a vector to unit length.
///
/// A zero vector is returned unchanged. The norm is accumulated in f64.
pub fn l2_normalize(vec: &[f32]) -> Vec<f32> {
    let norm = vec
        .iter()
        .map(|&x| (x as f64) * (x as f64))
        .sum::<f64>()
        .sqrt();
    if norm == 0.0 {
        return vec.to_vec();
    }
    vec.iter().map(|&x| ((x as f64) / norm) as f32).collect()
}

/// Dot product of two equal-length vectors.
pub fn dot(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b.iter()).map(|(x, y)| x * y).sum()
}

/// Reject provider output the store cannot index.
pub(crate) fn check_embedding(vec: &[f32]) -> Result<(), Error> {
    if vec.is_empty() {
        return Err(Error::Embedding(
            "Embedding provider returned an empty vector".to_string(),
        ));
    }
    if vec.iter().any(|x| !x.is_finite()) {
        return Err(Error::Embedding(
            "Embedding provider returned NaN or infinite values".to_string(),
        ));
    }
    Ok(())
}
