//! Vector store trait and chunk record types

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::Result;

/// Free-form metadata attached to every stored chunk
pub type Metadata = serde_json::Map<String, serde_json::Value>;

/// A chunk ready to be written into a collection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChunkRecord {
    pub id: String,
    pub text: String,
    pub embedding: Vec<f32>,
    pub metadata: Metadata,
}

/// A chunk as returned by listing or lookup (embedding omitted)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredChunk {
    pub id: String,
    pub text: String,
    pub metadata: Metadata,
}

impl StoredChunk {
    /// Read a string-valued metadata field
    pub fn metadata_str(&self, key: &str) -> Option<&str> {
        self.metadata.get(key).and_then(|v| v.as_str())
    }
}

impl From<ChunkRecord> for StoredChunk {
    fn from(record: ChunkRecord) -> Self {
        Self {
            id: record.id,
            text: record.text,
            metadata: record.metadata,
        }
    }
}

/// One ranked result of a similarity query.
///
/// `distance` is the store's dissimilarity score: lower means nearer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetrievalHit {
    pub id: String,
    pub text: String,
    pub metadata: Metadata,
    #[serde(default)]
    pub distance: f32,
}

impl RetrievalHit {
    /// Read a string-valued metadata field, falling back to `"unknown"`
    pub fn metadata_or_unknown(&self, key: &str) -> String {
        match self.metadata.get(key) {
            Some(serde_json::Value::String(s)) => s.clone(),
            Some(other) if !other.is_null() => other.to_string(),
            _ => "unknown".to_string(),
        }
    }
}

/// Trait for vector stores owning a single named collection
///
/// Implementations persist the collection across restarts and enforce one
/// embedding dimension per collection: the first `add` into an empty
/// collection fixes it, `clear` resets it.
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Open (or create) the collection
    async fn connect(&mut self) -> Result<()>;

    /// Append records; ids are expected to be fresh
    async fn add(&self, records: Vec<ChunkRecord>) -> Result<()>;

    /// Return at most `k` hits ordered by ascending distance
    async fn query(&self, vector: &[f32], k: usize) -> Result<Vec<RetrievalHit>>;

    /// Full scan of every record in the collection
    async fn list(&self) -> Result<Vec<StoredChunk>>;

    /// Get a record by ID
    async fn get(&self, id: &str) -> Result<Option<StoredChunk>>;

    /// Delete a record by ID, reporting whether it existed
    async fn delete(&self, id: &str) -> Result<bool>;

    /// Destroy and recreate the collection under the same name
    async fn clear(&self) -> Result<()>;

    /// Number of records in the collection
    async fn count(&self) -> Result<usize>;

    /// The collection's fixed embedding dimension, if any record was ever written
    async fn dimension(&self) -> Result<Option<usize>>;

    /// Name of the collection
    fn collection_name(&self) -> &str;

    /// Check if the vector store is connected
    fn is_connected(&self) -> bool;
}
