//! Embedding backends: an in-process encoder model and an HTTP endpoint

use async_trait::async_trait;
use fastembed::{EmbeddingModel, InitOptions, TextEmbedding};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, info, warn};
use url::Url;

use pagent_core::{EmbeddingBackend, EmbeddingProvider, Error, Result, Settings};

/// Embedding provider selected from settings
pub enum Embedder {
    Local(LocalEmbedder),
    Remote(RemoteEmbedder),
}

impl Embedder {
    /// Build the backend named by `EMBEDDING_BACKEND`
    pub fn from_settings(settings: &Settings) -> Result<Self> {
        match settings.embedding_backend {
            EmbeddingBackend::Local => {
                let mut embedder = LocalEmbedder::new(&settings.embedding_model);
                if let Some(dir) = &settings.embedding_cache_dir {
                    embedder = embedder.with_cache_dir(dir.clone());
                }
                Ok(Embedder::Local(embedder))
            }
            EmbeddingBackend::Remote => Ok(Embedder::Remote(RemoteEmbedder::new(
                &settings.embedding_url,
                &settings.embedding_model,
                settings.generation_timeout,
            )?)),
        }
    }
}

#[async_trait]
impl EmbeddingProvider for Embedder {
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        match self {
            Embedder::Local(e) => e.embed(texts).await,
            Embedder::Remote(e) => e.embed(texts).await,
        }
    }

    fn model_name(&self) -> &str {
        match self {
            Embedder::Local(e) => e.model_name(),
            Embedder::Remote(e) => e.model_name(),
        }
    }
}

enum ModelState {
    Unloaded,
    Loaded(Arc<std::sync::Mutex<TextEmbedding>>),
    Failed(String),
}

/// Encoder model run in-process.
///
/// The model is loaded on first use, at most once per embedder. A failed load
/// is remembered and every later call reports the same failure.
pub struct LocalEmbedder {
    model_name: String,
    cache_dir: Option<PathBuf>,
    state: tokio::sync::Mutex<ModelState>,
}

impl LocalEmbedder {
    pub fn new(model_name: impl Into<String>) -> Self {
        Self {
            model_name: model_name.into(),
            cache_dir: None,
            state: tokio::sync::Mutex::new(ModelState::Unloaded),
        }
    }

    /// Directory where downloaded model files are kept
    pub fn with_cache_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.cache_dir = Some(dir.into());
        self
    }

    /// Whether the model has been loaded successfully
    pub async fn is_loaded(&self) -> bool {
        matches!(*self.state.lock().await, ModelState::Loaded(_))
    }

    /// The remembered load failure, if loading was attempted and failed
    pub async fn load_failure(&self) -> Option<String> {
        match &*self.state.lock().await {
            ModelState::Failed(msg) => Some(msg.clone()),
            _ => None,
        }
    }

    async fn model(&self) -> Result<Arc<std::sync::Mutex<TextEmbedding>>> {
        let mut state = self.state.lock().await;
        match &*state {
            ModelState::Loaded(model) => return Ok(model.clone()),
            ModelState::Failed(msg) => return Err(Error::Embedding(msg.clone())),
            ModelState::Unloaded => {}
        }

        let name = self.model_name.clone();
        let cache_dir = self.cache_dir.clone();
        info!(model = %name, "Loading embedding model");

        let loaded = tokio::task::spawn_blocking(move || load_model(&name, cache_dir))
            .await
            .unwrap_or_else(|e| Err(format!("Model loading task failed: {}", e)));

        match loaded {
            Ok(model) => {
                let model = Arc::new(std::sync::Mutex::new(model));
                *state = ModelState::Loaded(model.clone());
                info!(model = %self.model_name, "Embedding model loaded");
                Ok(model)
            }
            Err(msg) => {
                warn!(model = %self.model_name, "Embedding model failed to load: {}", msg);
                *state = ModelState::Failed(msg.clone());
                Err(Error::Embedding(msg))
            }
        }
    }

    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let model = self.model().await?;
        let batch = texts.to_vec();
        let expected = batch.len();

        let vectors = tokio::task::spawn_blocking(move || {
            let mut encoder = model
                .lock()
                .map_err(|e| Error::Embedding(format!("Lock error: {}", e)))?;
            encoder
                .embed(batch, None)
                .map_err(|e| Error::Embedding(format!("Failed to embed texts: {}", e)))
        })
        .await
        .map_err(|e| Error::Embedding(format!("Embedding task failed: {}", e)))??;

        if vectors.len() != expected {
            return Err(Error::Embedding(format!(
                "Model returned {} vectors for {} texts",
                vectors.len(),
                expected
            )));
        }

        debug!(count = expected, "Embedded texts locally");
        Ok(vectors)
    }

    fn model_name(&self) -> &str {
        &self.model_name
    }
}

/// Map a configured model name onto one of the encoder models fastembed ships.
///
/// An exact model code wins; otherwise the part after the last `/` is compared,
/// ignoring case and an `-onnx` suffix, so `sentence-transformers/all-MiniLM-L6-v2`
/// finds the ONNX export of the same model.
pub fn resolve_model(name: &str) -> Option<EmbeddingModel> {
    let wanted = name.trim().to_lowercase();
    let tail = |code: &str| -> String {
        let code = code.to_lowercase();
        let last = code.rsplit('/').next().unwrap_or(&code).to_string();
        last.trim_end_matches("-onnx").to_string()
    };

    let models = TextEmbedding::list_supported_models();
    models
        .iter()
        .find(|info| info.model_code.to_lowercase() == wanted)
        .or_else(|| {
            let wanted_tail = tail(&wanted);
            models.iter().find(|info| tail(&info.model_code) == wanted_tail)
        })
        .map(|info| info.model.clone())
}

fn load_model(name: &str, cache_dir: Option<PathBuf>) -> std::result::Result<TextEmbedding, String> {
    let model = resolve_model(name).ok_or_else(|| format!("Unsupported embedding model '{}'", name))?;

    let mut options = InitOptions::new(model).with_show_download_progress(false);
    if let Some(dir) = cache_dir {
        options = options.with_cache_dir(dir);
    }

    TextEmbedding::try_new(options).map_err(|e| format!("Failed to load embedding model '{}': {}", name, e))
}

#[derive(Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    prompt: &'a str,
}

#[derive(Deserialize)]
struct EmbeddingResponse {
    embedding: Vec<f32>,
}

/// Embeddings computed by an Ollama-compatible HTTP endpoint, one request per text
pub struct RemoteEmbedder {
    endpoint: Url,
    model_name: String,
    client: Client,
}

impl RemoteEmbedder {
    pub fn new(base_url: &str, model_name: impl Into<String>, timeout: std::time::Duration) -> Result<Self> {
        let base = if base_url.ends_with('/') {
            base_url.to_string()
        } else {
            format!("{}/", base_url)
        };
        let endpoint = Url::parse(&base)
            .and_then(|url| url.join("api/embeddings"))
            .map_err(|e| Error::Configuration(format!("Invalid embedding URL '{}': {}", base_url, e)))?;

        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| Error::Network(e.to_string()))?;

        Ok(Self {
            endpoint,
            model_name: model_name.into(),
            client,
        })
    }

    async fn embed_text(&self, text: &str) -> Result<Vec<f32>> {
        let response = self
            .client
            .post(self.endpoint.clone())
            .json(&EmbeddingRequest {
                model: &self.model_name,
                prompt: text,
            })
            .send()
            .await
            .map_err(|e| Error::Embedding(format!("Failed to reach embedding endpoint: {}", e)))?;

        if !response.status().is_success() {
            return Err(Error::Embedding(format!(
                "Embedding endpoint returned {}",
                response.status().as_u16()
            )));
        }

        let data: EmbeddingResponse = response
            .json()
            .await
            .map_err(|e| Error::Embedding(format!("Invalid embedding response: {}", e)))?;
        Ok(data.embedding)
    }

    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let mut vectors = Vec::with_capacity(texts.len());
        for text in texts {
            vectors.push(self.embed_text(text).await?);
        }
        debug!(count = vectors.len(), "Embedded texts remotely");
        Ok(vectors)
    }

    fn model_name(&self) -> &str {
        &self.model_name
    }
}
