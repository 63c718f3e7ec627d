//! Query embedding and nearest-chunk lookup

use std::sync::Arc;
use tracing::debug;

use pagent_core::{EmbeddingProvider, Result, RetrievalHit, VectorStore};

/// Embeds a query and asks the store for its nearest chunks
#[derive(Clone)]
pub struct Retriever {
    embedder: Arc<dyn EmbeddingProvider>,
    store: Arc<dyn VectorStore>,
    top_k: usize,
}

impl Retriever {
    pub fn new(embedder: Arc<dyn EmbeddingProvider>, store: Arc<dyn VectorStore>, top_k: usize) -> Self {
        Self { embedder, store, top_k }
    }

    /// The `top_k` hits nearest to `query`, nearest first; either step failing
    /// fails the call
    pub async fn retrieve(&self, query: &str) -> Result<Vec<RetrievalHit>> {
        let vector = self.embedder.embed_one(query).await?;
        let hits = self.store.query(&vector, self.top_k).await?;
        debug!(k = self.top_k, found = hits.len(), "Retrieved chunks");
        Ok(hits)
    }
}
