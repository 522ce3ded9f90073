//! Core memory store struct: category state, durable log and the lock around them.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::embedding::{EmbeddingProvider, check_embedding, l2_normalize};
use crate::errors::Error;
use crate::memory_types::{MemoryRecord, Metadata};
use crate::patterns::PatternTracker;
use crate::similarity::{self, SimilaritySearcher};
use crate::sqlite::{DurableLog, LoggedMemory};

/// Maximum allowed input length (100,000 bytes).
pub const MAX_INPUT_LENGTH: usize = 100_000;

/// Category that feedback entries are stored in.
pub const FEEDBACK_CATEGORY: &str = "feedback_history";

/// Categories that exist (empty) in every new store.
pub const DEFAULT_CATEGORIES: [&str; 5] = [
    "story_context",
    "character_descriptions",
    "scene_settings",
    "music_metadata",
    FEEDBACK_CATEGORY,
];

/// Records of one category and their positionally aligned embeddings.
///
/// An embedding slot is `None` only for replayed rows whose stored vector was
/// unusable; such records are counted but never recalled.
#[derive(Debug, Default)]
pub(crate) struct Category {
    pub(crate) records: Vec<Arc<MemoryRecord>>,
    pub(crate) embeddings: Vec<Option<Vec<f32>>>,
}

impl Category {
    pub(crate) fn len(&self) -> usize {
        self.records.len()
    }

    pub(crate) fn has_searchable(&self) -> bool {
        self.embeddings.iter().any(Option::is_some)
    }

    fn truncate(&mut self) {
        self.records.clear();
        self.embeddings.clear();
    }
}

/// Everything the store guard protects.
pub(crate) struct MemoryState {
    pub(crate) categories: HashMap<String, Category>,
    /// Embedding dimension, fixed by the first embedding stored or replayed.
    pub(crate) dimension: Option<usize>,
    pub(crate) searcher: Box<dyn SimilaritySearcher>,
    pub(crate) log: Option<DurableLog>,
    pub(crate) patterns: PatternTracker,
    pub(crate) persistence_failures: u64,
}

impl MemoryState {
    fn new(searcher: Box<dyn SimilaritySearcher>, log: Option<DurableLog>) -> Self {
        let categories = DEFAULT_CATEGORIES
            .iter()
            .map(|name| (name.to_string(), Category::default()))
            .collect();
        MemoryState {
            categories,
            dimension: None,
            searcher,
            log,
            patterns: PatternTracker::default(),
            persistence_failures: 0,
        }
    }

    /// Check a normalized embedding against the established dimension.
    pub(crate) fn check_dimension(&self, embedding: &[f32]) -> Result<(), Error> {
        match self.dimension {
            Some(expected) if expected != embedding.len() => Err(Error::DimensionMismatch {
                expected,
                actual: embedding.len(),
            }),
            _ => Ok(()),
        }
    }

    /// Append a record and its embedding to `category`, creating the category if needed.
    ///
    /// The in-memory append is the commit point. The durable log write and the index
    /// update that follow are best-effort: their failures are logged, never returned.
    pub(crate) fn append(
        &mut self,
        category: &str,
        record: MemoryRecord,
        embedding: Vec<f32>,
    ) -> Result<Arc<MemoryRecord>, Error> {
        self.check_dimension(&embedding)?;
        self.dimension.get_or_insert(embedding.len());

        let record = Arc::new(record);
        let entry = self.categories.entry(category.to_string()).or_default();
        entry.records.push(Arc::clone(&record));
        entry.embeddings.push(Some(embedding));
        let position = entry.len() - 1;
        let embedding = entry.embeddings[position].as_deref().unwrap_or_default();

        if let Some(log) = &self.log {
            match log.append(category, &record, embedding) {
                Ok(id) => {
                    self.persistence_failures = 0;
                    debug!(category, id, "Persisted memory");
                }
                Err(e) => {
                    // Availability over durability: the in-memory write stands.
                    self.persistence_failures += 1;
                    warn!(
                        category,
                        error = %e,
                        consecutive_failures = self.persistence_failures,
                        "Failed to persist memory"
                    );
                }
            }
        }

        if let Err(e) = self.searcher.add(category, position, embedding) {
            warn!(category, error = %e, "Failed to index memory, category will be scanned");
        }

        Ok(record)
    }

    /// Truncate one category, or every category when `category` is `None`.
    pub(crate) fn clear(&mut self, category: Option<&str>) {
        match category {
            Some(name) => {
                if let Some(entry) = self.categories.get_mut(name) {
                    entry.truncate();
                }
            }
            None => self.categories.values_mut().for_each(Category::truncate),
        }
        self.searcher.clear(category);

        if let Some(log) = &self.log {
            match log.truncate(category) {
                Ok(rows) => {
                    self.persistence_failures = 0;
                    debug!(category = ?category, rows, "Truncated durable log");
                }
                Err(e) => {
                    self.persistence_failures += 1;
                    warn!(category = ?category, error = %e, "Failed to truncate durable log");
                }
            }
        }
    }

    /// Rebuild in-memory state from durable log rows, in id order.
    fn replay(&mut self, rows: Vec<LoggedMemory>) {
        let total = rows.len();
        let mut without_embedding = 0usize;

        for row in rows {
            let embedding = row.embedding.map(|raw| l2_normalize(&raw)).and_then(|vec| {
                match self.check_dimension(&vec) {
                    Ok(()) => {
                        self.dimension.get_or_insert(vec.len());
                        Some(vec)
                    }
                    Err(e) => {
                        warn!(id = row.id, error = %e, "Dropping replayed embedding");
                        None
                    }
                }
            });
            if embedding.is_none() {
                without_embedding += 1;
            }

            let entry = self.categories.entry(row.category).or_default();
            entry.records.push(Arc::new(row.record));
            entry.embeddings.push(embedding);
        }

        for (name, entry) in &self.categories {
            if let Err(e) = self.searcher.rebuild(name, &entry.embeddings) {
                warn!(category = %name, error = %e, "Failed to rebuild index, category will be scanned");
            }
        }

        info!(
            rows = total,
            without_embedding,
            searcher = self.searcher.name(),
            "Replayed durable log"
        );
    }
}

/// Core memory store combining embedding generation, category state and persistence.
///
/// All state sits behind a single mutex; every public operation holds it for the
/// whole of its state access. Embeddings are computed before the lock is taken, so
/// a slow provider does not stall other callers.
///
/// The store is `Send + Sync`; share it between request handlers as `Arc<MemoryStore>`.
pub struct MemoryStore {
    pub(crate) embedder: Box<dyn EmbeddingProvider>,
    pub(crate) state: Mutex<MemoryState>,
}

impl MemoryStore {
    /// Create a store from configuration with an injected embedding provider.
    ///
    /// With `config.persist` set, the durable log at `config.database_path` is opened
    /// (or created) and replayed before the store is returned.
    ///
    /// # Errors
    ///
    /// Returns error if:
    /// - Database path contains path traversal sequences (e.g., "../")
    /// - Parent directory cannot be canonicalized
    /// - The durable log cannot be opened or read
    pub fn new(config: &Config, embedder: Box<dyn EmbeddingProvider>) -> Result<Self, Error> {
        let searcher = similarity::select(config.use_index);

        let log = if config.persist {
            validate_db_path(&config.database_path)?;
            Some(DurableLog::open(&config.database_path)?)
        } else {
            None
        };

        let mut state = MemoryState::new(searcher, log);
        let rows = match &state.log {
            Some(log) => log.load_all()?,
            None => Vec::new(),
        };
        state.replay(rows);

        info!(
            persist = config.persist,
            searcher = state.searcher.name(),
            "Memory store ready"
        );

        Ok(MemoryStore {
            embedder,
            state: Mutex::new(state),
        })
    }

    /// Create a non-persistent store using brute-force search.
    pub fn in_memory(embedder: Box<dyn EmbeddingProvider>) -> Self {
        MemoryStore {
            embedder,
            state: Mutex::new(MemoryState::new(similarity::select(false), None)),
        }
    }

    /// Embed and normalize text. Runs without the store lock.
    pub(crate) fn embed(&self, text: &str) -> Result<Vec<f32>, Error> {
        let raw = self.embedder.encode(text)?;
        check_embedding(&raw)?;
        Ok(l2_normalize(&raw))
    }

    /// Validate input length.
    pub(crate) fn validate_input_length(text: &str) -> Result<(), Error> {
        if text.len() > MAX_INPUT_LENGTH {
            return Err(Error::InputTooLong {
                max_length: MAX_INPUT_LENGTH,
                actual_length: text.len(),
            });
        }
        Ok(())
    }

    pub(crate) fn validate_category(category: &str) -> Result<(), Error> {
        if category.trim().is_empty() {
            return Err(Error::InvalidInput(
                "Category name cannot be empty".to_string(),
            ));
        }
        Ok(())
    }

    /// Whether writes currently reach a durable log.
    pub fn is_persistent(&self) -> bool {
        self.state
            .lock()
            .log
            .as_ref()
            .is_some_and(|log| !log.is_closed())
    }

    /// Name of the search strategy in use (`brute-force` or `flat-index`).
    pub fn searcher_name(&self) -> &'static str {
        self.state.lock().searcher.name()
    }

    /// Embedding dimension established so far, if any.
    pub fn dimension(&self) -> Option<usize> {
        self.state.lock().dimension
    }

    /// Number of consecutive durable log writes (appends or truncates) that have failed.
    ///
    /// Resets to zero on the next successful write. Callers that need durability can
    /// alert on this; the store itself keeps serving from memory.
    pub fn persistence_failures(&self) -> u64 {
        self.state.lock().persistence_failures
    }

    /// Close the durable log. Idempotent; later writes stay in memory only.
    pub fn close(&self) {
        let mut state = self.state.lock();
        if let Some(log) = state.log.as_mut() {
            log.close();
            debug!("Closed durable log");
        }
    }
}

/// Reject database paths that could escape their directory or whose parent is missing.
fn validate_db_path(db_path: &Path) -> Result<(), Error> {
    use std::path::Component;

    // Path traversal guard: reject parent directory components (works on all platforms)
    for component in db_path.components() {
        if matches!(component, Component::ParentDir) {
            return Err(Error::Config(
                "Invalid database path: contains '..' which may escape the intended directory"
                    .to_string(),
            ));
        }
    }

    if let Some(parent) = db_path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::canonicalize(parent).map_err(|e| {
                Error::Config(format!(
                    "Invalid database path: parent directory not accessible: {}",
                    e
                ))
            })?;
        }
    }

    Ok(())
}

/// Parse a JSON object string into record metadata.
pub fn parse_metadata(json: &str) -> Result<Metadata, Error> {
    match serde_json::from_str::<serde_json::Value>(json)? {
        serde_json::Value::Object(map) => Ok(map),
        other => Err(Error::InvalidInput(format!(
            "Metadata must be a JSON object, got {}",
            other
        ))),
    }
}
