//! Embedding provider trait

use async_trait::async_trait;

use crate::{Error, Result};

/// Text used to discover a provider's vector length
pub const DIMENSION_PROBE: &str = "dimension probe";

/// Trait for embedding providers
///
/// `embed` returns exactly one vector per input text, in input order, and
/// never touches the backend for an empty batch.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Embed a batch of texts
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;

    /// Name of the configured embedding model
    fn model_name(&self) -> &str;

    /// Vector length produced by this provider, found by embedding a probe text
    async fn dimension(&self) -> Result<usize> {
        let vectors = self.embed(&[DIMENSION_PROBE.to_string()]).await?;
        vectors
            .first()
            .map(|v| v.len())
            .ok_or_else(|| Error::Embedding("Provider returned no vector for probe text".to_string()))
    }

    /// Embed a single text
    async fn embed_one(&self, text: &str) -> Result<Vec<f32>> {
        self.embed(&[text.to_string()])
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| Error::Embedding("Provider returned no vector".to_string()))
    }
}
