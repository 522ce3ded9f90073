//! Deterministic feature-hashing embedder.
//!
//! Tokens are lowercased alphanumeric runs, hashed with FNV-1a into a fixed number of
//! buckets. The top hash bit picks the sign so unrelated tokens that collide tend to
//! cancel. Texts that share words score high; nothing else is captured.

use crate::embedding::EmbeddingProvider;
use crate::errors::Error;

/// Default bucket count.
pub const DEFAULT_HASHING_DIMS: usize = 256;

const FNV_OFFSET_BASIS: u64 = 0xcbf2_9ce4_8422_2325;
const FNV_PRIME: u64 = 0x0000_0100_0000_01b3;

/// Bag-of-words embedder that needs no model files.
#[derive(Debug, Clone)]
pub struct HashingEmbedder {
    dimensions: usize,
}

impl HashingEmbedder {
    /// Create an embedder producing `dimensions`-length vectors.
    ///
    /// # Errors
    ///
    /// Returns `Error::Config` if `dimensions` is zero.
    pub fn new(dimensions: usize) -> Result<Self, Error> {
        if dimensions == 0 {
            return Err(Error::Config(
                "Hashing embedder needs at least one dimension".to_string(),
            ));
        }
        Ok(HashingEmbedder { dimensions })
    }

    pub fn dimensions(&self) -> usize {
        self.dimensions
    }
}

impl Default for HashingEmbedder {
    fn default() -> Self {
        HashingEmbedder {
            dimensions: DEFAULT_HASHING_DIMS,
        }
    }
}

fn fnv1a(bytes: &[u8]) -> u64 {
    bytes.iter().fold(FNV_OFFSET_BASIS, |hash, &byte| {
        (hash ^ byte as u64).wrapping_mul(FNV_PRIME)
    })
}

impl EmbeddingProvider for HashingEmbedder {
    /// Returns raw token counts; the store normalizes.
    fn encode(&self, text: &str) -> Result<Vec<f32>, Error> {
        let mut vector = vec![0.0f32; self.dimensions];
        for token in text
            .split(|c: char| !c.is_alphanumeric())
            .filter(|t| !t.is_empty())
        {
            let hash = fnv1a(token.to_lowercase().as_bytes());
            let bucket = (hash % self.dimensions as u64) as usize;
            let sign = if hash >> 63 == 0 { 1.0 } else { -1.0 };
            vector[bucket] += sign;
        }
        Ok(vector)
    }
}
