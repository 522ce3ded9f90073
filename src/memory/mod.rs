//! Core memory store orchestrating embedding, category state and persistence.
//!
//! Provides a high-level API for storing and recalling memories by category, with
//! embeddings generated through an injected provider.

mod crud;
mod search;

// pub(crate): module internals hidden; public items re-exported explicitly via lib.rs
pub(crate) mod store;

pub use store::{
    DEFAULT_CATEGORIES, FEEDBACK_CATEGORY, MAX_INPUT_LENGTH, MemoryStore, parse_metadata,
};
