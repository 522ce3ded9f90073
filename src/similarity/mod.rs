//! Nearest-neighbour search strategies over a category's normalized embeddings.
//!
//! The store picks one strategy at construction:
//! - [`BruteForce`]: scans every stored vector.
//! - [`IndexedSearcher`]: keeps a [`FlatIndex`] per category and falls back to a
//!   scan for categories whose index is empty or disabled.

mod brute;
mod flat;

pub use brute::BruteForce;
pub use flat::{FlatIndex, IndexedSearcher};

use std::cmp::Ordering;

use crate::errors::Error;

/// A ranked hit: position in the category's record sequence and its score.
pub type Hit = (usize, f32);

/// Strategy for top-k inner-product search within a category.
pub trait SimilaritySearcher: Send {
    /// Short name for logs.
    fn name(&self) -> &'static str;

    /// Register the embedding stored at `position` in `category`.
    fn add(&mut self, category: &str, position: usize, embedding: &[f32]) -> Result<(), Error>;

    /// Return at most `top_k` hits ordered by descending score.
    ///
    /// `embeddings` is the category's full embedding sequence, positionally aligned
    /// with its records; `None` entries never match.
    fn search(
        &self,
        category: &str,
        embeddings: &[Option<Vec<f32>>],
        query: &[f32],
        top_k: usize,
    ) -> Vec<Hit>;

    /// Drop state for one category, or for all when `category` is `None`.
    fn clear(&mut self, category: Option<&str>);

    /// Rebuild `category` from its embedding sequence, in order.
    fn rebuild(&mut self, category: &str, embeddings: &[Option<Vec<f32>>]) -> Result<(), Error> {
        self.clear(Some(category));
        for (position, embedding) in embeddings.iter().enumerate() {
            if let Some(embedding) = embedding {
                self.add(category, position, embedding)?;
            }
        }
        Ok(())
    }
}

/// Order hits by descending score; equal scores keep their incoming (insertion) order.
pub(crate) fn rank(mut hits: Vec<Hit>, top_k: usize) -> Vec<Hit> {
    hits.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(Ordering::Equal));
    hits.truncate(top_k);
    hits
}

/// Choose the search strategy for a store.
pub fn select(use_index: bool) -> Box<dyn SimilaritySearcher> {
    if use_index {
        Box::new(IndexedSearcher::default())
    } else {
        Box::new(BruteForce)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rank_descending_and_stable() {
        let hits = vec![(0, 0.5), (1, 0.9), (2, 0.5), (3, 0.9), (4, -0.2)];
        assert_eq!(rank(hits, 4), vec![(1, 0.9), (3, 0.9), (0, 0.5), (2, 0.5)]);
    }

    #[test]
    fn test_rank_truncates() {
        let hits = vec![(0, 0.1), (1, 0.2)];
        assert!(rank(hits.clone(), 0).is_empty());
        assert_eq!(rank(hits, 10).len(), 2);
    }

    #[test]
    fn test_select_strategy() {
        assert_eq!(select(false).name(), "brute-force");
        assert_eq!(select(true).name(), "flat-index");
    }
}
