//! Application settings loaded from the environment

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::{Error, Result};

/// Which embedding backend computes vectors
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EmbeddingBackend {
    /// Encoder model loaded in-process
    Local,
    /// HTTP embedding endpoint
    Remote,
}

impl FromStr for EmbeddingBackend {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "local" => Ok(EmbeddingBackend::Local),
            "remote" | "ollama" => Ok(EmbeddingBackend::Remote),
            other => Err(Error::Configuration(format!(
                "Unknown EMBEDDING_BACKEND '{}' (expected 'local' or 'remote')",
                other
            ))),
        }
    }
}

/// Which engine holds the collection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VectorStoreBackend {
    /// Collection file under `vector_store_dir`
    Local,
    /// Qdrant server
    Qdrant,
}

impl FromStr for VectorStoreBackend {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "local" => Ok(VectorStoreBackend::Local),
            "qdrant" => Ok(VectorStoreBackend::Qdrant),
            other => Err(Error::Configuration(format!(
                "Unknown VECTOR_STORE_BACKEND '{}' (expected 'local' or 'qdrant')",
                other
            ))),
        }
    }
}

/// Settings for the whole pipeline
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    pub ollama_url: String,
    pub ollama_model: String,
    pub generation_timeout: Duration,
    pub health_timeout: Duration,
    pub embedding_backend: EmbeddingBackend,
    pub embedding_model: String,
    pub embedding_url: String,
    pub embedding_cache_dir: Option<PathBuf>,
    pub vector_store_backend: VectorStoreBackend,
    pub vector_store_dir: PathBuf,
    pub qdrant_url: String,
    pub collection_name: String,
    pub max_context_tokens: u32,
    pub chunk_size: usize,
    pub chunk_overlap: usize,
    pub top_k: usize,
    pub max_file_size: u64,
    pub log_level: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            ollama_url: "http://localhost:11434".to_string(),
            ollama_model: "llama-3.2-70b".to_string(),
            generation_timeout: Duration::from_secs(600),
            health_timeout: Duration::from_secs(10),
            embedding_backend: EmbeddingBackend::Local,
            embedding_model: "sentence-transformers/all-MiniLM-L6-v2".to_string(),
            embedding_url: "http://localhost:11434".to_string(),
            embedding_cache_dir: None,
            vector_store_backend: VectorStoreBackend::Local,
            vector_store_dir: PathBuf::from("./vector_store"),
            qdrant_url: "http://localhost:6334".to_string(),
            collection_name: "private_agent".to_string(),
            max_context_tokens: 4000,
            chunk_size: 500,
            chunk_overlap: 50,
            top_k: 5,
            max_file_size: 10 * 1024 * 1024,
            log_level: "info".to_string(),
        }
    }
}

impl Settings {
    /// Load settings from `.env` and the process environment
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load settings from an arbitrary key lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let ollama_url = get("OLLAMA_URL").unwrap_or(defaults.ollama_url);
        let embedding_url = get("EMBEDDING_URL").unwrap_or_else(|| ollama_url.clone());

        let settings = Self {
            ollama_model: get("OLLAMA_MODEL").unwrap_or(defaults.ollama_model),
            generation_timeout: parse_secs(&get, "GENERATION_TIMEOUT_SECS", defaults.generation_timeout)?,
            health_timeout: parse_secs(&get, "HEALTH_TIMEOUT_SECS", defaults.health_timeout)?,
            embedding_backend: match get("EMBEDDING_BACKEND") {
                Some(v) => v.parse()?,
                None => defaults.embedding_backend,
            },
            embedding_model: get("EMBEDDING_MODEL").unwrap_or(defaults.embedding_model),
            embedding_url,
            embedding_cache_dir: get("EMBEDDING_CACHE_DIR").map(PathBuf::from),
            vector_store_backend: match get("VECTOR_STORE_BACKEND") {
                Some(v) => v.parse()?,
                None => defaults.vector_store_backend,
            },
            vector_store_dir: get("VECTOR_STORE_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.vector_store_dir),
            qdrant_url: get("QDRANT_URL").unwrap_or(defaults.qdrant_url),
            collection_name: get("COLLECTION_NAME").unwrap_or(defaults.collection_name),
            max_context_tokens: parse_num(&get, "MAX_CONTEXT_TOKENS", defaults.max_context_tokens)?,
            chunk_size: parse_num(&get, "CHUNK_SIZE", defaults.chunk_size)?,
            chunk_overlap: parse_num(&get, "CHUNK_OVERLAP", defaults.chunk_overlap)?,
            top_k: parse_num(&get, "TOP_K", defaults.top_k)?,
            max_file_size: parse_num(&get, "MAX_FILE_SIZE", defaults.max_file_size)?,
            log_level: get("LOG_LEVEL").unwrap_or(defaults.log_level),
            ollama_url,
        };

        settings.validate()?;
        Ok(settings)
    }

    /// Check cross-field constraints
    pub fn validate(&self) -> Result<()> {
        if self.chunk_size == 0 {
            return Err(Error::Configuration("CHUNK_SIZE must be greater than 0".to_string()));
        }
        if self.chunk_overlap >= self.chunk_size {
            return Err(Error::Configuration(format!(
                "CHUNK_OVERLAP ({}) must be smaller than CHUNK_SIZE ({})",
                self.chunk_overlap, self.chunk_size
            )));
        }
        if self.top_k == 0 {
            return Err(Error::Configuration("TOP_K must be greater than 0".to_string()));
        }
        if self.collection_name.trim().is_empty() {
            return Err(Error::Configuration("COLLECTION_NAME must not be empty".to_string()));
        }
        Ok(())
    }
}

fn parse_num<T, G>(get: &G, key: &str, default: T) -> Result<T>
where
    T: FromStr,
    G: Fn(&str) -> Option<String>,
{
    match get(key) {
        Some(raw) => raw.trim().parse().map_err(|_| {
            Error::Configuration(format!("{} must be a non-negative integer, got '{}'", key, raw))
        }),
        None => Ok(default),
    }
}

fn parse_secs<G>(get: &G, key: &str, default: Duration) -> Result<Duration>
where
    G: Fn(&str) -> Option<String>,
{
    parse_num(get, key, default.as_secs()).map(Duration::from_secs)
}
