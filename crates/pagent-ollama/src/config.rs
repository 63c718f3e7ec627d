//! Ollama client configuration

use serde::{Deserialize, Serialize};
use std::time::Duration;
use url::Url;

use pagent_core::{Error, Result, Settings};

/// Configuration for the Ollama client
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OllamaConfig {
    pub base_url: String,
    pub model: String,
    /// Upper bound for generation requests
    pub request_timeout: Duration,
    /// Upper bound for the availability probe
    pub health_timeout: Duration,
}

impl OllamaConfig {
    /// Create configuration with explicit values
    pub fn new(base_url: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            model: model.into(),
            request_timeout: Duration::from_secs(600),
            health_timeout: Duration::from_secs(10),
        }
    }

    /// Take the generation-related fields of the application settings
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            base_url: settings.ollama_url.clone(),
            model: settings.ollama_model.clone(),
            request_timeout: settings.generation_timeout,
            health_timeout: settings.health_timeout,
        }
    }

    /// Resolve an API path against the base URL
    pub fn endpoint(&self, path: &str) -> Result<Url> {
        let mut base = Url::parse(&self.base_url).map_err(|e| {
            Error::Configuration(format!("Invalid Ollama URL '{}': {}", self.base_url, e))
        })?;
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }
        base.join(path.trim_start_matches('/'))
            .map_err(|e| Error::Configuration(format!("Invalid Ollama endpoint '{}': {}", path, e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint_join() {
        let config = OllamaConfig::new("http://localhost:11434", "llama3");
        assert_eq!(
            config.endpoint("/api/generate").unwrap().as_str(),
            "http://localhost:11434/api/generate"
        );

        let proxied = OllamaConfig::new("http://gateway/ollama", "llama3");
        assert_eq!(
            proxied.endpoint("api/tags").unwrap().as_str(),
            "http://gateway/ollama/api/tags"
        );
    }

    #[test]
    fn test_invalid_base_url() {
        let config = OllamaConfig::new("not a url", "llama3");
        assert!(matches!(config.endpoint("api/tags"), Err(Error::Configuration(_))));
    }

    #[test]
    fn test_from_settings() {
        let settings = Settings::default();
        let config = OllamaConfig::from_settings(&settings);
        assert_eq!(config.request_timeout, Duration::from_secs(600));
        assert_eq!(config.health_timeout, Duration::from_secs(10));
        assert_eq!(config.model, settings.ollama_model);
    }
}
