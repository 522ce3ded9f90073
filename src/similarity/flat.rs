//! Flat inner-product index.
//!
//! Each category gets a contiguous row-major matrix of unit vectors plus a map from
//! matrix row to record position. Rows are appended in lockstep with the record
//! sequence, so the map is the identity unless some records have no embedding.

use std::collections::HashMap;

use ndarray::{ArrayView1, ArrayView2};
use tracing::{debug, warn};

use super::{BruteForce, Hit, SimilaritySearcher, rank};
use crate::errors::Error;

/// Append-only matrix of vectors with a fixed dimension.
#[derive(Debug, Clone)]
pub struct FlatIndex {
    dimension: usize,
    data: Vec<f32>,
    positions: Vec<usize>,
}

impl FlatIndex {
    /// Create an empty index for `dimension`-length vectors.
    pub fn new(dimension: usize) -> Self {
        FlatIndex {
            dimension,
            data: Vec::new(),
            positions: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    /// Append a vector belonging to the record at `position`.
    ///
    /// # Errors
    ///
    /// Returns `Error::DimensionMismatch` if the vector length differs from the index dimension.
    pub fn add(&mut self, position: usize, embedding: &[f32]) -> Result<(), Error> {
        if embedding.len() != self.dimension {
            return Err(Error::DimensionMismatch {
                expected: self.dimension,
                actual: embedding.len(),
            });
        }
        self.data.extend_from_slice(embedding);
        self.positions.push(position);
        Ok(())
    }

    /// Top-k record positions by inner product with `query`.
    ///
    /// # Errors
    ///
    /// Returns `Error::DimensionMismatch` if the query has the wrong length.
    pub fn search(&self, query: &[f32], top_k: usize) -> Result<Vec<Hit>, Error> {
        if query.len() != self.dimension {
            return Err(Error::DimensionMismatch {
                expected: self.dimension,
                actual: query.len(),
            });
        }
        if self.is_empty() || top_k == 0 {
            return Ok(Vec::new());
        }
        let matrix = ArrayView2::from_shape((self.len(), self.dimension), self.data.as_slice())?;
        let scores = matrix.dot(&ArrayView1::from(query));
        let hits = scores
            .iter()
            .zip(&self.positions)
            .map(|(&score, &position)| (position, score))
            .collect();
        Ok(rank(hits, top_k))
    }
}

/// Per-category slot: a live index, or a marker that indexing failed for the category.
#[derive(Debug)]
enum Slot {
    Live(FlatIndex),
    Disabled,
}

/// Strategy that answers from per-category flat indexes.
///
/// Categories without entries, or whose index was disabled by a dimension
/// mismatch, are answered by a brute-force scan instead.
#[derive(Debug, Default)]
pub struct IndexedSearcher {
    slots: HashMap<String, Slot>,
}

impl IndexedSearcher {
    /// Number of indexed vectors for `category` (0 if none or disabled).
    pub fn indexed_len(&self, category: &str) -> usize {
        match self.slots.get(category) {
            Some(Slot::Live(index)) => index.len(),
            _ => 0,
        }
    }

    /// Whether indexing has been disabled for `category`.
    pub fn is_disabled(&self, category: &str) -> bool {
        matches!(self.slots.get(category), Some(Slot::Disabled))
    }
}

impl SimilaritySearcher for IndexedSearcher {
    fn name(&self) -> &'static str {
        "flat-index"
    }

    fn add(&mut self, category: &str, position: usize, embedding: &[f32]) -> Result<(), Error> {
        let slot = self
            .slots
            .entry(category.to_string())
            .or_insert_with(|| Slot::Live(FlatIndex::new(embedding.len())));

        let Slot::Live(index) = &mut *slot else {
            return Ok(());
        };

        if let Err(e) = index.add(position, embedding) {
            warn!(category, error = %e, "Disabling index for category");
            *slot = Slot::Disabled;
            return Err(e);
        }
        Ok(())
    }

    fn search(
        &self,
        category: &str,
        embeddings: &[Option<Vec<f32>>],
        query: &[f32],
        top_k: usize,
    ) -> Vec<Hit> {
        if let Some(Slot::Live(index)) = self.slots.get(category) {
            if !index.is_empty() {
                match index.search(query, top_k) {
                    Ok(hits) => return hits,
                    Err(e) => {
                        debug!(category, error = %e, "Index search failed, scanning instead");
                    }
                }
            }
        }
        BruteForce::scan(embeddings, query, top_k)
    }

    fn clear(&mut self, category: Option<&str>) {
        match category {
            Some(category) => {
                self.slots.remove(category);
            }
            None => self.slots.clear(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flat_index_search() {
        let mut index = FlatIndex::new(2);
        index.add(0, &[1.0, 0.0]).unwrap();
        index.add(1, &[0.0, 1.0]).unwrap();
        index.add(2, &[0.6, 0.8]).unwrap();

        let hits = index.search(&[0.0, 1.0], 2).unwrap();
        assert_eq!(hits.iter().map(|h| h.0).collect::<Vec<_>>(), vec![1, 2]);
        assert_eq!(index.search(&[0.0, 1.0], 10).unwrap().len(), 3);
    }

    #[test]
    fn test_flat_index_maps_rows_to_positions() {
        let mut index = FlatIndex::new(2);
        index.add(0, &[1.0, 0.0]).unwrap();
        index.add(3, &[0.0, 1.0]).unwrap();

        let hits = index.search(&[0.0, 1.0], 1).unwrap();
        assert_eq!(hits[0].0, 3);
    }

    #[test]
    fn test_flat_index_dimension_mismatch() {
        let mut index = FlatIndex::new(3);
        assert!(matches!(
            index.add(0, &[1.0, 0.0]),
            Err(Error::DimensionMismatch {
                expected: 3,
                actual: 2
            })
        ));
        assert!(index.is_empty());
        assert!(index.search(&[1.0], 1).is_err());
    }

    #[test]
    fn test_indexed_matches_brute_force() {
        let embeddings: Vec<Option<Vec<f32>>> = vec![
            Some(vec![1.0, 0.0]),
            Some(vec![0.6, 0.8]),
            None,
            Some(vec![0.0, 1.0]),
            Some(vec![0.6, 0.8]),
        ];
        let mut searcher = IndexedSearcher::default();
        searcher.rebuild("scene_settings", &embeddings).unwrap();
        assert_eq!(searcher.indexed_len("scene_settings"), 4);

        let query = [0.8, 0.6];
        let positions = |hits: Vec<Hit>| hits.into_iter().map(|h| h.0).collect::<Vec<_>>();
        assert_eq!(
            positions(searcher.search("scene_settings", &embeddings, &query, 3)),
            positions(BruteForce::scan(&embeddings, &query, 3))
        );
    }

    #[test]
    fn test_mismatch_disables_only_that_category() {
        let mut searcher = IndexedSearcher::default();
        searcher.add("a", 0, &[1.0, 0.0]).unwrap();
        searcher.add("b", 0, &[1.0, 0.0]).unwrap();
        assert!(searcher.add("a", 1, &[1.0, 0.0, 0.0]).is_err());

        assert!(searcher.is_disabled("a"));
        assert!(!searcher.is_disabled("b"));
        assert_eq!(searcher.indexed_len("b"), 1);

        // Disabled category still answers through the scan.
        let embeddings = vec![Some(vec![1.0, 0.0])];
        let hits = searcher.search("a", &embeddings, &[1.0, 0.0], 1);
        assert_eq!(hits.len(), 1);
    }

    #[test]
    fn test_unindexed_category_falls_back() {
        let searcher = IndexedSearcher::default();
        let embeddings = vec![Some(vec![0.0, 1.0]), Some(vec![1.0, 0.0])];
        let hits = searcher.search("music_metadata", &embeddings, &[1.0, 0.0], 1);
        assert_eq!(hits, vec![(1, 1.0)]);
    }

    #[test]
    fn test_clear_resets_category() {
        let mut searcher = IndexedSearcher::default();
        searcher.add("a", 0, &[1.0, 0.0]).unwrap();
        searcher.add("b", 0, &[1.0, 0.0]).unwrap();

        searcher.clear(Some("a"));
        assert_eq!(searcher.indexed_len("a"), 0);
        assert_eq!(searcher.indexed_len("b"), 1);

        searcher.clear(None);
        assert_eq!(searcher.indexed_len("b"), 0);
    }
}
