//! Write-back of completed exchanges into the knowledge base

use chrono::Utc;
use serde_json::json;
use std::sync::Arc;
use tracing::{debug, warn};
use uuid::Uuid;

use pagent_core::{ChunkRecord, EmbeddingProvider, Error, Metadata, Result, VectorStore};

use crate::chunker::TextChunker;

/// Chunks, embeds and stores each answered exchange as conversational memory
#[derive(Clone)]
pub struct ConversationMemoryWriter {
    embedder: Arc<dyn EmbeddingProvider>,
    store: Arc<dyn VectorStore>,
    chunker: TextChunker,
}

impl ConversationMemoryWriter {
    pub fn new(embedder: Arc<dyn EmbeddingProvider>, store: Arc<dyn VectorStore>, chunker: TextChunker) -> Self {
        Self {
            embedder,
            store,
            chunker,
        }
    }

    /// Store one exchange, returning the number of chunks written
    pub async fn remember(&self, agent_id: &str, user_input: &str, answer: &str) -> Result<usize> {
        let exchange = format!("User: {}\nAssistant: {}", user_input, answer);
        let chunks = self.chunker.split(&exchange);
        if chunks.is_empty() {
            return Ok(0);
        }

        let embeddings = self.embedder.embed(&chunks).await?;
        if embeddings.len() != chunks.len() {
            return Err(Error::Embedding(format!(
                "Provider returned {} vectors for {} chunks",
                embeddings.len(),
                chunks.len()
            )));
        }
        let timestamp = Utc::now().to_rfc3339();
        let total = chunks.len();

        let records: Vec<ChunkRecord> = chunks
            .into_iter()
            .zip(embeddings)
            .enumerate()
            .map(|(i, (text, embedding))| {
                let mut metadata = Metadata::new();
                metadata.insert("type".into(), json!("conversation"));
                metadata.insert("agent_id".into(), json!(agent_id));
                metadata.insert("timestamp".into(), json!(timestamp));
                metadata.insert("filename".into(), json!("conversation"));
                metadata.insert("chunk_id".into(), json!(format!("conv_{}", i)));
                metadata.insert("chunk_index".into(), json!(i));
                metadata.insert("total_chunks".into(), json!(total));
                ChunkRecord {
                    id: Uuid::new_v4().to_string(),
                    text,
                    embedding,
                    metadata,
                }
            })
            .collect();

        self.store.add(records).await?;
        debug!(agent_id, chunks = total, "Stored conversation memory");
        Ok(total)
    }

    /// Store one exchange; a failure is logged and never returned
    pub async fn remember_best_effort(&self, agent_id: &str, user_input: &str, answer: &str) {
        if let Err(e) = self.remember(agent_id, user_input, answer).await {
            warn!(agent_id, "Failed to store conversation memory: {}", e);
        }
    }
}
