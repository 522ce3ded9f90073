//! SQLite-backed durable log for reverie.
//!
//! This module provides:
//! - `DurableLog`: append-only table of stored memories, replayed on startup
//! - `embedding`: BLOB conversion for raw embedding vectors

pub mod embedding;

use rusqlite::types::ValueRef;
use rusqlite::{Connection, params};
use std::path::Path;
use tracing::{debug, warn};

use crate::memory_types::{MemoryRecord, Metadata};

pub use self::embedding::{blob_to_vec, vec_to_blob};

/// Error types for durable log operations.
#[derive(Debug)]
pub enum Error {
    Sqlite(String),
    InvalidBlobSize { actual: usize },
    EmptyVector,
    InvalidEmbedding(String),
    Closed,
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::Sqlite(msg) => write!(f, "Database error: {}", msg),
            Error::InvalidBlobSize { actual } => {
                write!(
                    f,
                    "Invalid BLOB size: {} bytes is not a non-empty sequence of f32 values",
                    actual
                )
            }
            Error::EmptyVector => write!(f, "Cannot persist an empty embedding"),
            Error::InvalidEmbedding(msg) => write!(f, "Invalid embedding: {}", msg),
            Error::Closed => write!(f, "Durable log is closed"),
        }
    }
}

impl std::error::Error for Error {}

impl From<rusqlite::Error> for Error {
    fn from(err: rusqlite::Error) -> Self {
        Error::Sqlite(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, Error>;

/// One replayed row of the durable log.
#[derive(Debug, Clone)]
pub struct LoggedMemory {
    pub id: i64,
    pub category: String,
    pub record: MemoryRecord,
    /// `None` when the stored BLOB was missing or malformed.
    pub embedding: Option<Vec<f32>>,
}

/// Append-only SQLite table of memories.
pub struct DurableLog {
    conn: Option<Connection>,
}

/// Initialize database schema.
fn create_schema(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS memories (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            category TEXT NOT NULL,
            content TEXT NOT NULL,
            metadata TEXT,
            timestamp TEXT,
            embedding BLOB
        );

        CREATE INDEX IF NOT EXISTS idx_memories_category ON memories(category);
        "#,
    )?;
    Ok(())
}

impl DurableLog {
    /// Open or create a durable log at the given path.
    ///
    /// # Errors
    ///
    /// Returns error if the database cannot be opened or schema initialization fails.
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)?;
        create_schema(&conn)?;
        debug!(path = %path.display(), "Opened durable log");
        Ok(Self { conn: Some(conn) })
    }

    fn conn(&self) -> Result<&Connection> {
        self.conn.as_ref().ok_or(Error::Closed)
    }

    /// Append a memory and its normalized embedding.
    ///
    /// Returns the row id assigned by SQLite.
    ///
    /// # Errors
    ///
    /// Returns error if the log is closed, the embedding is unusable, or the write fails.
    pub fn append(&self, category: &str, record: &MemoryRecord, embedding: &[f32]) -> Result<i64> {
        let conn = self.conn()?;
        let blob = vec_to_blob(embedding)?;
        let metadata = serde_json::to_string(&record.metadata)
            .map_err(|e| Error::Sqlite(format!("Failed to serialize metadata: {}", e)))?;

        conn.execute(
            r#"
            INSERT INTO memories (category, content, metadata, timestamp, embedding)
            VALUES (?1, ?2, ?3, ?4, ?5)
            "#,
            params![category, &record.content, &metadata, &record.timestamp, &blob],
        )?;

        Ok(conn.last_insert_rowid())
    }

    /// Replay every row in insertion order.
    ///
    /// Row-level damage degrades the row instead of failing the load: malformed or
    /// non-text metadata becomes an empty mapping, a missing or malformed embedding
    /// becomes `None`, and non-UTF-8 text is decoded lossily.
    ///
    /// # Errors
    ///
    /// Returns error if the log is closed or the query itself fails.
    pub fn load_all(&self) -> Result<Vec<LoggedMemory>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT id, category, content, metadata, timestamp, embedding
            FROM memories
            ORDER BY id ASC
            "#,
        )?;

        let rows = stmt.query_map([], |row| {
            let id: i64 = row.get(0)?;
            Ok(decode_row(
                id,
                row.get_ref(1)?,
                row.get_ref(2)?,
                row.get_ref(3)?,
                row.get_ref(4)?,
                row.get_ref(5)?,
            ))
        })?;

        let mut memories = Vec::new();
        for row_result in rows {
            if let Some(memory) = row_result? {
                memories.push(memory);
            }
        }

        Ok(memories)
    }

    /// Delete persisted rows for one category, or every row when `category` is `None`.
    ///
    /// Returns the number of rows deleted.
    pub fn truncate(&self, category: Option<&str>) -> Result<usize> {
        let conn = self.conn()?;
        let rows = match category {
            Some(category) => conn.execute("DELETE FROM memories WHERE category = ?1", [category])?,
            None => conn.execute("DELETE FROM memories", [])?,
        };
        Ok(rows)
    }

    /// Number of persisted rows.
    pub fn count(&self) -> Result<usize> {
        let conn = self.conn()?;
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM memories", [], |row| row.get(0))?;
        Ok(count as usize)
    }

    /// Whether `close` has been called.
    pub fn is_closed(&self) -> bool {
        self.conn.is_none()
    }

    /// Release the connection. Idempotent; never fails.
    pub fn close(&mut self) {
        if let Some(conn) = self.conn.take() {
            if let Err((_, e)) = conn.close() {
                warn!(error = %e, "Error while closing durable log");
            }
        }
    }

    /// Get internal connection (for tests that corrupt rows directly).
    #[cfg(test)]
    pub(crate) fn raw_conn(&self) -> &Connection {
        self.conn.as_ref().expect("durable log is open")
    }
}

/// Text of a cell whatever its storage class. `None` only for NULL.
fn text_cell(value: ValueRef<'_>) -> Option<String> {
    match value {
        ValueRef::Null => None,
        ValueRef::Integer(i) => Some(i.to_string()),
        ValueRef::Real(r) => Some(r.to_string()),
        ValueRef::Text(bytes) | ValueRef::Blob(bytes) => {
            Some(String::from_utf8_lossy(bytes).into_owned())
        }
    }
}

fn decode_row(
    id: i64,
    category: ValueRef<'_>,
    content: ValueRef<'_>,
    metadata: ValueRef<'_>,
    timestamp: ValueRef<'_>,
    embedding: ValueRef<'_>,
) -> Option<LoggedMemory> {
    let (Some(category), Some(content)) = (text_cell(category), text_cell(content)) else {
        warn!(id, "Row without category or content in durable log, skipping it");
        return None;
    };

    let metadata = match metadata {
        ValueRef::Null => Metadata::new(),
        ValueRef::Text(bytes) if bytes.is_empty() => Metadata::new(),
        ValueRef::Text(bytes) => serde_json::from_slice::<Metadata>(bytes).unwrap_or_else(|e| {
            warn!(id, error = %e, "Malformed metadata in durable log, using empty map");
            Metadata::new()
        }),
        other => {
            warn!(id, column_type = %other.data_type(), "Non-text metadata in durable log, using empty map");
            Metadata::new()
        }
    };

    let embedding = match embedding {
        ValueRef::Blob(bytes) => match blob_to_vec(bytes) {
            Ok(vec) => Some(vec),
            Err(e) => {
                warn!(id, error = %e, "Malformed embedding in durable log, skipping it");
                None
            }
        },
        ValueRef::Null => {
            warn!(id, "Missing embedding in durable log");
            None
        }
        other => {
            warn!(id, column_type = %other.data_type(), "Non-blob embedding in durable log, skipping it");
            None
        }
    };

    Some(LoggedMemory {
        id,
        category,
        record: MemoryRecord {
            content,
            timestamp: text_cell(timestamp).unwrap_or_default(),
            metadata,
        },
        embedding,
    })
}

impl Drop for DurableLog {
    fn drop(&mut self) {
        self.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    fn create_test_log() -> (TempDir, DurableLog) {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("test.db");
        let log = DurableLog::open(&path).unwrap();
        (dir, log)
    }

    fn record(content: &str) -> MemoryRecord {
        MemoryRecord::new(content, Metadata::new())
    }

    #[test]
    fn test_append_and_load_in_order() {
        let (_dir, log) = create_test_log();
        let first = log.append("story_context", &record("first"), &[1.0, 0.0]).unwrap();
        let second = log.append("scene_settings", &record("second"), &[0.0, 1.0]).unwrap();
        assert!(second > first);

        let rows = log.load_all().unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].category, "story_context");
        assert_eq!(rows[0].record.content, "first");
        assert_eq!(rows[0].embedding.as_deref(), Some(&[1.0f32, 0.0][..]));
        assert_eq!(rows[1].category, "scene_settings");
    }

    #[test]
    fn test_metadata_and_timestamp_preserved() {
        let (_dir, log) = create_test_log();
        let mut metadata = Metadata::new();
        metadata.insert("agent".to_string(), json!("Character"));
        metadata.insert("turn".to_string(), json!(3));
        let original = MemoryRecord {
            content: "a knight".to_string(),
            timestamp: "2024-01-01T00:00:00+00:00".to_string(),
            metadata,
        };
        log.append("character_descriptions", &original, &[0.5, 0.5])
            .unwrap();

        let rows = log.load_all().unwrap();
        assert_eq!(rows[0].record, original);
    }

    #[test]
    fn test_malformed_metadata_becomes_empty() {
        let (_dir, log) = create_test_log();
        log.raw_conn()
            .execute(
                "INSERT INTO memories (category, content, metadata, timestamp, embedding) VALUES (?1, ?2, ?3, ?4, ?5)",
                params!["story_context", "broken", "{not json", "2024-01-01T00:00:00Z", vec_to_blob(&[1.0]).unwrap()],
            )
            .unwrap();

        let rows = log.load_all().unwrap();
        assert_eq!(rows.len(), 1);
        assert!(rows[0].record.metadata.is_empty());
        assert!(rows[0].embedding.is_some());
    }

    #[test]
    fn test_malformed_embedding_skipped_record_kept() {
        let (_dir, log) = create_test_log();
        log.raw_conn()
            .execute(
                "INSERT INTO memories (category, content, metadata, timestamp, embedding) VALUES (?1, ?2, ?3, ?4, ?5)",
                params!["story_context", "ragged", "{}", "2024-01-01T00:00:00Z", vec![1u8, 2, 3]],
            )
            .unwrap();
        log.raw_conn()
            .execute(
                "INSERT INTO memories (category, content, metadata, timestamp, embedding) VALUES (?1, ?2, NULL, NULL, NULL)",
                params!["story_context", "missing"],
            )
            .unwrap();

        let rows = log.load_all().unwrap();
        assert_eq!(rows.len(), 2);
        assert!(rows[0].embedding.is_none());
        assert!(rows[1].embedding.is_none());
        assert_eq!(rows[1].record.timestamp, "");
    }

    #[test]
    fn test_wrongly_typed_cells_degrade_row() {
        let (_dir, log) = create_test_log();
        log.append("story_context", &record("healthy"), &[1.0, 0.0])
            .unwrap();
        log.raw_conn()
            .execute(
                "INSERT INTO memories (category, content, metadata, timestamp, embedding) \
                 VALUES ('story_context', CAST(x'ff6f6464' AS TEXT), 42, '2024-01-01T00:00:00Z', 'not a blob')",
                [],
            )
            .unwrap();

        let rows = log.load_all().unwrap();
        assert_eq!(rows.len(), 2);
        assert!(rows[0].embedding.is_some());
        let odd = &rows[1];
        assert_eq!(odd.category, "story_context");
        assert_eq!(odd.record.content, "\u{FFFD}odd");
        assert!(odd.record.metadata.is_empty());
        assert!(odd.embedding.is_none());
        assert_eq!(odd.record.timestamp, "2024-01-01T00:00:00Z");
    }

    #[test]
    fn test_truncate_category_and_all() {
        let (_dir, log) = create_test_log();
        log.append("a", &record("1"), &[1.0]).unwrap();
        log.append("b", &record("2"), &[1.0]).unwrap();
        log.append("a", &record("3"), &[1.0]).unwrap();

        assert_eq!(log.truncate(Some("a")).unwrap(), 2);
        assert_eq!(log.count().unwrap(), 1);
        assert_eq!(log.truncate(None).unwrap(), 1);
        assert_eq!(log.count().unwrap(), 0);
    }

    #[test]
    fn test_append_rejects_empty_embedding() {
        let (_dir, log) = create_test_log();
        assert!(matches!(
            log.append("a", &record("x"), &[]),
            Err(Error::EmptyVector)
        ));
        assert_eq!(log.count().unwrap(), 0);
    }

    #[test]
    fn test_close_is_idempotent() {
        let (_dir, mut log) = create_test_log();
        log.close();
        log.close();
        assert!(log.is_closed());
        assert!(matches!(
            log.append("a", &record("x"), &[1.0]),
            Err(Error::Closed)
        ));
    }

    #[test]
    fn test_reopen_sees_rows() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("reopen.db");
        {
            let log = DurableLog::open(&path).unwrap();
            log.append("music_metadata", &record("calm strings"), &[0.0, 1.0])
                .unwrap();
        }
        let log = DurableLog::open(&path).unwrap();
        assert_eq!(log.count().unwrap(), 1);
    }
}
