//! Integration tests exercising the reverie library API from an external crate.

use std::sync::Arc;

use tempfile::TempDir;

use reverie::errors::Error;
use reverie::{
    Config, DEFAULT_CATEGORIES, DEFAULT_PATTERNS, FEEDBACK_CATEGORY, HashingEmbedder,
    MAX_INPUT_LENGTH, MemoryStore, parse_metadata,
};

fn in_memory_store() -> MemoryStore {
    let config = Config {
        persist: false,
        ..Config::default()
    };
    MemoryStore::new(&config, Box::new(HashingEmbedder::default()))
        .expect("Failed to create store")
}

/// A generation session: story, scenes, feedback and learning patterns.
#[test]
fn test_generation_session_scenario() {
    let store = in_memory_store();

    store
        .store(
            "story_context",
            "Once upon a time, in a magical forest...",
            Some(parse_metadata(r#"{"agent":"StoryDirector"}"#).unwrap()),
        )
        .unwrap();
    store
        .store("story_context", "The dragon slept beneath the mountain", None)
        .unwrap();
    store
        .store("scene_settings", "A moonlit clearing between old oaks", None)
        .unwrap();

    let hits = store.recall("story_context", "a magical forest", 3).unwrap();
    assert_eq!(hits.len(), 2);
    assert_eq!(
        hits[0].record.content,
        "Once upon a time, in a magical forest..."
    );
    assert_eq!(hits[0].record.metadata["agent"], "StoryDirector");

    store
        .record_feedback("StoryDirector", 0.85, "vivid opening")
        .unwrap();
    assert!(store.update_learning_pattern("story_coherence", 0.8));
    assert!(store.update_learning_pattern("story_coherence", 0.6));

    let summary = store.summary();
    assert_eq!(summary["story_context"], 2);
    assert_eq!(summary["scene_settings"], 1);
    assert_eq!(summary[FEEDBACK_CATEGORY], 1);
    assert_eq!(summary["character_descriptions"], 0);

    let stats = store.learning_stats();
    assert!((stats["story_coherence"].mean - 0.7).abs() < 1e-9);
    assert_eq!(stats["story_coherence"].count, 2);
}

/// Memories written by one store are visible to the next one on the same log.
#[test]
fn test_persistent_store_survives_restart() {
    let dir = TempDir::new().unwrap();
    let config = Config {
        database_path: dir.path().join("memory.db"),
        persist: true,
        ..Config::default()
    };

    {
        let store = MemoryStore::new(&config, Box::new(HashingEmbedder::default())).unwrap();
        store
            .store("character_descriptions", "Mira, a cartographer with a limp", None)
            .unwrap();
        store
            .store("music_metadata", "solo cello in D minor", None)
            .unwrap();
        store.close();
    }

    let store = MemoryStore::new(&config, Box::new(HashingEmbedder::default())).unwrap();
    let summary = store.summary();
    assert_eq!(summary["character_descriptions"], 1);
    assert_eq!(summary["music_metadata"], 1);

    let hits = store
        .recall("character_descriptions", "who is the cartographer", 1)
        .unwrap();
    assert_eq!(hits[0].record.content, "Mira, a cartographer with a limp");
}

/// Test that path traversal strings are rejected by MemoryStore::new().
#[test]
fn test_memory_store_new_with_path_traversal_returns_error() {
    let config = Config {
        database_path: "../../etc/reverie.db".into(),
        persist: true,
        ..Config::default()
    };
    let result = MemoryStore::new(&config, Box::new(HashingEmbedder::default()));
    assert!(matches!(result, Err(Error::Config(_))));
}

#[test]
fn test_every_category_and_pattern_declared() {
    let store = in_memory_store();
    let summary = store.summary();
    for category in DEFAULT_CATEGORIES {
        assert_eq!(summary[category], 0);
    }

    let stats = store.learning_stats();
    for pattern in DEFAULT_PATTERNS {
        let empty = &stats[pattern];
        assert_eq!(empty.count, 0);
        assert_eq!(empty.mean, 0.0);
    }
}

#[test]
fn test_input_too_long_rejected() {
    let store = in_memory_store();
    let content = "x".repeat(MAX_INPUT_LENGTH + 1);
    let result = store.store("story_context", &content, None);
    match result {
        Err(Error::InputTooLong {
            max_length,
            actual_length,
        }) => {
            assert_eq!(max_length, MAX_INPUT_LENGTH);
            assert_eq!(actual_length, MAX_INPUT_LENGTH + 1);
        }
        other => panic!("Expected InputTooLong, got {:?}", other.map(|_| ())),
    }
}

#[test]
fn test_invalid_metadata_rejected() {
    assert!(parse_metadata("\"just a string\"").is_err());
    assert!(parse_metadata("{broken").is_err());
    assert!(parse_metadata("{}").unwrap().is_empty());
}

#[test]
fn test_store_shared_across_threads() {
    let store = Arc::new(in_memory_store());
    let handles: Vec<_> = (0..4)
        .map(|i| {
            let store = Arc::clone(&store);
            std::thread::spawn(move || {
                store
                    .record_feedback(&format!("agent-{}", i), 0.5, "fine")
                    .unwrap();
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }
    assert_eq!(store.feedback().len(), 4);
}
