//! reverie - persistent, semantically searchable memory for content-generation pipelines.
//!
//! Text records are kept per category (story context, character descriptions, scene
//! settings, ...) together with unit-length embeddings, recalled by cosine similarity,
//! optionally written to a SQLite durable log and replayed on restart. Learning
//! patterns track named numeric series with summary statistics.
//!
//! All operations are synchronous. A [`MemoryStore`] is `Send + Sync` and is meant to
//! be shared between request handlers behind an `Arc`.
//!
//! # Example
//!
//! ```no_run
//! use reverie::{Config, HashingEmbedder, MemoryStore};
//!
//! let config = Config {
//!     persist: false,
//!     ..Config::default()
//! };
//! let store = MemoryStore::new(&config, Box::new(HashingEmbedder::default()))
//!     .expect("Failed to initialize store");
//!
//! store
//!     .store("story_context", "Once upon a time, in a magical forest...", None)
//!     .expect("Failed to store memory");
//!
//! for hit in store.recall("story_context", "a magical forest", 3).unwrap() {
//!     println!("{:.2}: {}", hit.similarity, hit.record.content);
//! }
//!
//! store.update_learning_pattern("user_satisfaction", 0.8);
//! println!("{:?}", store.learning_stats()["user_satisfaction"]);
//! ```

pub mod config;
pub mod embedding;
pub mod errors;
pub mod memory;
pub mod memory_types;
pub mod patterns;
pub mod similarity;
pub mod sqlite;

// Re-export public API
pub use config::{Config, EmbeddingBackend};
pub use embedding::{EmbeddingProvider, HashingEmbedder, OnnxEmbedder};
pub use errors::Error;
pub use memory::{
    DEFAULT_CATEGORIES, FEEDBACK_CATEGORY, MAX_INPUT_LENGTH, MemoryStore, parse_metadata,
};
pub use memory_types::{FeedbackEntry, MemoryRecord, Metadata, PatternStats, Recalled};
pub use patterns::DEFAULT_PATTERNS;
