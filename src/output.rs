//! JSON response types and formatting for CLI output.

use std::collections::BTreeMap;

use serde::Serialize;

use reverie::Metadata;

/// Response for a stored memory or feedback entry.
#[derive(Serialize)]
pub struct StoreResponse {
    pub status: String,
    pub category: String,
    pub timestamp: String,
}

/// Response for recall results.
#[derive(Serialize)]
pub struct RecallResponse {
    pub results: Vec<RecallItem>,
}

/// Individual recall hit.
#[derive(Serialize)]
pub struct RecallItem {
    pub content: String,
    pub similarity: f32,
    pub timestamp: String,
    pub metadata: Metadata,
}

/// Response for listing memories.
#[derive(Serialize)]
pub struct ListResponse {
    pub memories: Vec<ListItem>,
}

/// Individual list item.
#[derive(Serialize)]
pub struct ListItem {
    pub content: String,
    pub timestamp: String,
}

/// Response for the store summary.
#[derive(Serialize)]
pub struct SummaryResponse {
    pub categories: BTreeMap<String, usize>,
    pub persistent: bool,
    pub searcher: String,
}

/// Response for clear operations.
#[derive(Serialize)]
pub struct ClearResponse {
    pub status: String,
    /// `None` when every category was cleared.
    pub category: Option<String>,
}

/// Response for errors.
#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

/// Print a value as formatted JSON to stdout.
pub fn print_json<T: Serialize>(value: &T) {
    match serde_json::to_string_pretty(value) {
        Ok(json) => println!("{}", json),
        Err(e) => {
            eprintln!("Failed to serialize JSON: {}", e);
            std::process::exit(1);
        }
    }
}
