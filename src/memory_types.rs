//! Memory store data types.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Free-form metadata attached to a record.
pub type Metadata = Map<String, Value>;

/// A single stored memory.
///
/// Records are immutable once created. The store hands them out as
/// `Arc<MemoryRecord>` so recall results share the stored allocation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemoryRecord {
    /// Text content the embedding was computed from.
    pub content: String,
    /// Creation time, RFC 3339.
    pub timestamp: String,
    /// Caller-supplied metadata.
    #[serde(default)]
    pub metadata: Metadata,
}

impl MemoryRecord {
    /// Create a record stamped with the current UTC time.
    pub fn new(content: impl Into<String>, metadata: Metadata) -> Self {
        MemoryRecord {
            content: content.into(),
            timestamp: chrono::Utc::now().to_rfc3339(),
            metadata,
        }
    }
}

/// A recall hit: the stored record and its dot-product similarity to the query.
#[derive(Debug, Clone)]
pub struct Recalled {
    pub record: Arc<MemoryRecord>,
    /// Dot product of unit vectors, in `[-1, 1]`.
    pub similarity: f32,
}

/// Feedback about an agent's output, stored in the `feedback_history` category.
#[derive(Debug, Clone, PartialEq)]
pub struct FeedbackEntry {
    pub agent: String,
    /// Quality score in `[0, 1]`.
    pub score: f64,
    pub text: String,
}

impl FeedbackEntry {
    /// Text that gets embedded for this entry.
    pub fn embedding_text(&self) -> String {
        format!("{}: {}", self.agent, self.text)
    }

    /// Build the record persisted for this entry.
    pub fn to_record(&self) -> MemoryRecord {
        let mut metadata = Metadata::new();
        metadata.insert("agent".to_string(), Value::from(self.agent.clone()));
        metadata.insert("score".to_string(), Value::from(self.score));
        MemoryRecord::new(self.text.clone(), metadata)
    }

    /// Read a feedback entry back out of a `feedback_history` record.
    ///
    /// Returns `None` if the record lacks the agent or score tags.
    pub fn from_record(record: &MemoryRecord) -> Option<Self> {
        let agent = record.metadata.get("agent")?.as_str()?.to_string();
        let score = record.metadata.get("score")?.as_f64()?;
        Some(FeedbackEntry {
            agent,
            score,
            text: record.content.clone(),
        })
    }
}

/// Summary statistics for one learning pattern.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct PatternStats {
    pub mean: f64,
    /// Population standard deviation.
    pub std: f64,
    pub max: f64,
    pub min: f64,
    pub count: usize,
}
