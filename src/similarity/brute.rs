//! Exhaustive dot-product scan.

use super::{Hit, SimilaritySearcher, rank};
use crate::embedding::dot;
use crate::errors::Error;

/// Scores every stored embedding against the query.
#[derive(Debug, Default, Clone, Copy)]
pub struct BruteForce;

impl BruteForce {
    /// Scan `embeddings`, skipping missing vectors and vectors of another dimension.
    pub fn scan(embeddings: &[Option<Vec<f32>>], query: &[f32], top_k: usize) -> Vec<Hit> {
        if top_k == 0 {
            return Vec::new();
        }
        let hits = embeddings
            .iter()
            .enumerate()
            .filter_map(|(position, embedding)| {
                let embedding = embedding.as_deref()?;
                (embedding.len() == query.len()).then(|| (position, dot(embedding, query)))
            })
            .collect();
        rank(hits, top_k)
    }
}

impl SimilaritySearcher for BruteForce {
    fn name(&self) -> &'static str {
        "brute-force"
    }

    fn add(&mut self, _category: &str, _position: usize, _embedding: &[f32]) -> Result<(), Error> {
        Ok(())
    }

    fn search(
        &self,
        _category: &str,
        embeddings: &[Option<Vec<f32>>],
        query: &[f32],
        top_k: usize,
    ) -> Vec<Hit> {
        Self::scan(embeddings, query, top_k)
    }

    fn clear(&mut self, _category: Option<&str>) {}
}
