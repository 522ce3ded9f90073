//! Write, clear and summary operations for the memory store.

use std::collections::BTreeMap;
use std::sync::Arc;

use tracing::debug;

use crate::errors::Error;
use crate::memory_types::{FeedbackEntry, MemoryRecord, Metadata, PatternStats};

use super::store::{FEEDBACK_CATEGORY, MemoryStore};

impl MemoryStore {
    #[must_use = "handle the error or the memory may be lost"]
    /// Store `content` in `category`.
    ///
    /// The category is created on first use. The content is embedded before the lock
    /// is taken; if embedding fails nothing is committed.
    ///
    /// # Errors
    ///
    /// Returns error if:
    /// - Category name is empty
    /// - Content exceeds 100,000 bytes
    /// - The embedding provider fails or returns an unusable vector
    /// - The embedding's dimension differs from the store's
    pub fn store(
        &self,
        category: &str,
        content: &str,
        metadata: Option<Metadata>,
    ) -> Result<Arc<MemoryRecord>, Error> {
        Self::validate_category(category)?;
        Self::validate_input_length(content)?;

        let embedding = self.embed(content)?;

        let mut state = self.state.lock();
        let record = MemoryRecord::new(content, metadata.unwrap_or_default());
        let record = state.append(category, record, embedding)?;
        debug!(category, "Stored memory");
        Ok(record)
    }

    #[must_use = "handle the error or the feedback may be lost"]
    /// Record feedback about an agent's output in the `feedback_history` category.
    ///
    /// The entry is embedded as `"{agent}: {text}"`.
    ///
    /// # Errors
    ///
    /// Returns error if the score is not a finite value in `[0, 1]`, the text is too
    /// long, or embedding fails.
    pub fn record_feedback(
        &self,
        agent: &str,
        score: f64,
        text: &str,
    ) -> Result<Arc<MemoryRecord>, Error> {
        if !(0.0..=1.0).contains(&score) {
            return Err(Error::InvalidInput(format!(
                "Feedback score {} must be between 0.0 and 1.0",
                score
            )));
        }
        Self::validate_input_length(text)?;

        let entry = FeedbackEntry {
            agent: agent.to_string(),
            score,
            text: text.to_string(),
        };
        let embedding = self.embed(&entry.embedding_text())?;

        let mut state = self.state.lock();
        let record = state.append(FEEDBACK_CATEGORY, entry.to_record(), embedding)?;
        debug!(agent, score, "Recorded feedback");
        Ok(record)
    }

    /// Feedback entries in insertion order.
    pub fn feedback(&self) -> Vec<FeedbackEntry> {
        let state = self.state.lock();
        state
            .categories
            .get(FEEDBACK_CATEGORY)
            .map(|c| {
                c.records
                    .iter()
                    .filter_map(|r| FeedbackEntry::from_record(r))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Truncate one category, or every category when `category` is `None`.
    ///
    /// Cleared categories keep existing with zero records. Persisted rows are
    /// deleted too (best-effort).
    pub fn clear(&self, category: Option<&str>) {
        self.state.lock().clear(category);
    }

    /// Number of records per category, including empty categories.
    pub fn summary(&self) -> BTreeMap<String, usize> {
        let state = self.state.lock();
        state
            .categories
            .iter()
            .map(|(name, c)| (name.clone(), c.len()))
            .collect()
    }

    /// The newest `limit` records of `category`, newest first.
    pub fn recent(&self, category: &str, limit: usize) -> Vec<Arc<MemoryRecord>> {
        let state = self.state.lock();
        state
            .categories
            .get(category)
            .map(|c| c.records.iter().rev().take(limit).cloned().collect())
            .unwrap_or_default()
    }

    /// Append `value` to a declared learning pattern.
    ///
    /// Returns `false` if `name` is not a declared pattern; nothing is recorded then.
    pub fn update_learning_pattern(&self, name: &str, value: f64) -> bool {
        self.state.lock().patterns.update(name, value)
    }

    /// Summary statistics for every declared learning pattern.
    pub fn learning_stats(&self) -> BTreeMap<String, PatternStats> {
        self.state.lock().patterns.stats()
    }
}
