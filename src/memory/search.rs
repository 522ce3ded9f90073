//! Recall (semantic search) for the memory store.

use std::sync::Arc;

use tracing::debug;

use crate::errors::Error;
use crate::memory_types::Recalled;

use super::store::MemoryStore;

impl MemoryStore {
    #[must_use = "handle the error or results may be lost"]
    /// Recall the records of `category` most similar to `query`.
    ///
    /// Returns at most `top_k` hits ordered by descending similarity; equal scores
    /// keep insertion order. An unseen or empty category yields an empty list, as
    /// does `top_k == 0`.
    ///
    /// # Errors
    ///
    /// Returns error if:
    /// - Query exceeds 100,000 bytes
    /// - The embedding provider fails or returns an unusable vector
    /// - The query embedding's dimension differs from the store's
    pub fn recall(&self, category: &str, query: &str, top_k: usize) -> Result<Vec<Recalled>, Error> {
        Self::validate_input_length(query)?;
        if top_k == 0 || !self.is_searchable(category) {
            return Ok(Vec::new());
        }

        let query_embedding = self.embed(query)?;

        let state = self.state.lock();
        let Some(entry) = state.categories.get(category) else {
            return Ok(Vec::new());
        };
        if !entry.has_searchable() {
            return Ok(Vec::new());
        }
        state.check_dimension(&query_embedding)?;

        let hits = state
            .searcher
            .search(category, &entry.embeddings, &query_embedding, top_k);
        debug!(category, top_k, hits = hits.len(), "Recalled memories");

        Ok(hits
            .into_iter()
            .filter_map(|(position, similarity)| {
                entry.records.get(position).map(|record| Recalled {
                    record: Arc::clone(record),
                    similarity,
                })
            })
            .collect())
    }

    fn is_searchable(&self, category: &str) -> bool {
        self.state
            .lock()
            .categories
            .get(category)
            .is_some_and(|c| c.has_searchable())
    }
}
