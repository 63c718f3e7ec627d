//! Result types of the pipeline-facing operations

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::vector_store::{Metadata, StoredChunk};

/// Outcome of ingesting one document or text
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IngestResult {
    pub chunks_created: usize,
    pub filename: String,
    /// Extracted text length in characters
    pub file_size: usize,
}

/// A retrieved chunk as cited in an answer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Source {
    pub filename: String,
    pub chunk_id: String,
    pub text: String,
    pub distance: f32,
}

/// Answer to one `ask`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AskResponse {
    pub answer: String,
    pub sources: Vec<Source>,
    pub model: String,
    pub timestamp: DateTime<Utc>,
}

/// One record of the knowledge base as shown to users
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemoryItem {
    pub id: String,
    pub text: String,
    pub metadata: Metadata,
    pub filename: Option<String>,
    pub chunk_id: Option<String>,
}

impl From<StoredChunk> for MemoryItem {
    fn from(chunk: StoredChunk) -> Self {
        let filename = chunk.metadata_str("filename").map(str::to_string);
        let chunk_id = chunk.metadata_str("chunk_id").map(str::to_string);
        Self {
            id: chunk.id,
            text: chunk.text,
            metadata: chunk.metadata,
            filename,
            chunk_id,
        }
    }
}

/// Overall service status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Healthy,
    Degraded,
    Unhealthy,
}

impl HealthStatus {
    /// Combine the two probe results
    pub fn from_probes(generation_connected: bool, store_connected: bool) -> Self {
        match (generation_connected, store_connected) {
            (true, true) => HealthStatus::Healthy,
            (false, false) => HealthStatus::Unhealthy,
            _ => HealthStatus::Degraded,
        }
    }
}

impl std::fmt::Display for HealthStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            HealthStatus::Healthy => "healthy",
            HealthStatus::Degraded => "degraded",
            HealthStatus::Unhealthy => "unhealthy",
        };
        write!(f, "{}", s)
    }
}

/// Result of probing the generation backend and the vector store
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthReport {
    pub status: HealthStatus,
    pub generation_connected: bool,
    pub store_connected: bool,
    pub timestamp: DateTime<Utc>,
}
