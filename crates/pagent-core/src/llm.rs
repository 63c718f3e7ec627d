//! LLM provider trait and types

use async_trait::async_trait;
use futures::stream::BoxStream;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::Result;

/// Lazy, forward-only sequence of generated text fragments.
///
/// The stream ends when the backend reports completion; an `Err` item is
/// terminal.
pub type TextStream = BoxStream<'static, Result<String>>;

/// Configuration for text generation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationConfig {
    pub model_id: String,
    pub max_tokens: u32,
    pub temperature: f32,
    pub top_p: f32,
    pub system_prompt: Option<String>,
    pub stop_sequences: Vec<String>,
    pub timeout: Duration,
}

impl GenerationConfig {
    /// Configuration for a given model with the default sampling options
    pub fn for_model(model_id: impl Into<String>) -> Self {
        Self {
            model_id: model_id.into(),
            ..Default::default()
        }
    }

    /// Attach a system prompt
    pub fn with_system_prompt(mut self, system_prompt: impl Into<String>) -> Self {
        self.system_prompt = Some(system_prompt.into());
        self
    }

    /// Set the generation budget
    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            model_id: "llama-3.2-70b".to_string(),
            max_tokens: 512,
            temperature: 0.7,
            top_p: 0.9,
            system_prompt: None,
            stop_sequences: Vec::new(),
            timeout: Duration::from_secs(600),
        }
    }
}

/// Trait for LLM providers (e.g., a local Ollama server)
///
/// Generation against a large local model is slow, so `generate` is bounded
/// by the long `GenerationConfig::timeout`; `health` is a separate cheap
/// probe with its own short bound.
#[async_trait]
pub trait LLMProvider: Send + Sync {
    /// Generate the full completion for a prompt
    async fn generate(&self, prompt: &str, config: &GenerationConfig) -> Result<String>;

    /// Generate a completion as a stream of fragments
    async fn generate_stream(&self, prompt: &str, config: &GenerationConfig) -> Result<TextStream>;

    /// Whether the backend is reachable
    async fn health(&self) -> bool;

    /// Model used when no override is given
    fn default_model(&self) -> &str;
}
