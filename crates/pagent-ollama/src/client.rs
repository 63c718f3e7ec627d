//! Ollama client implementation

use async_trait::async_trait;
use reqwest::{Client, Response};
use serde::{Deserialize, Serialize};
use tokio::time::timeout;
use tracing::{debug, error, info};

use pagent_core::{Error, GenerationConfig, LLMProvider, Result, TextStream};

use crate::config::OllamaConfig;
use crate::stream::decode_fragments;

/// Ollama client
pub struct OllamaClient {
    config: OllamaConfig,
    client: Client,
    health_client: Client,
}

#[derive(Debug, Serialize)]
pub(crate) struct GenerationOptions {
    pub num_predict: u32,
    pub temperature: f32,
    pub top_p: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stop: Option<Vec<String>>,
}

#[derive(Debug, Serialize)]
pub(crate) struct GenerationRequest<'a> {
    pub model: &'a str,
    pub prompt: &'a str,
    pub stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system: Option<&'a str>,
    pub options: GenerationOptions,
}

impl<'a> GenerationRequest<'a> {
    pub(crate) fn new(prompt: &'a str, config: &'a GenerationConfig, stream: bool) -> Self {
        Self {
            model: &config.model_id,
            prompt,
            stream,
            system: config.system_prompt.as_deref().filter(|s| !s.is_empty()),
            options: GenerationOptions {
                num_predict: config.max_tokens,
                temperature: config.temperature,
                top_p: config.top_p,
                stop: if config.stop_sequences.is_empty() {
                    None
                } else {
                    Some(config.stop_sequences.clone())
                },
            },
        }
    }
}

#[derive(Deserialize)]
struct GenerationResponse {
    #[serde(default)]
    response: Option<String>,
}

impl OllamaClient {
    /// Create a new Ollama client from configuration
    pub fn new(config: OllamaConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| Error::Network(e.to_string()))?;

        let health_client = Client::builder()
            .timeout(config.health_timeout)
            .build()
            .map_err(|e| Error::Network(e.to_string()))?;

        Ok(Self {
            config,
            client,
            health_client,
        })
    }

    /// Set the default model
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.config.model = model.into();
        self
    }

    /// Send a generation request and check the status
    async fn send_generation(
        &self,
        prompt: &str,
        config: &GenerationConfig,
        stream: bool,
    ) -> Result<Response> {
        let url = self.config.endpoint("api/generate")?;
        let request_body = GenerationRequest::new(prompt, config, stream);
        debug!(model = %config.model_id, stream, "Sending generation request");

        let response = self
            .client
            .post(url)
            .json(&request_body)
            .send()
            .await
            .map_err(map_request_error)?;

        if !response.status().is_success() {
            let status = response.status();
            error!("Ollama HTTP error: {}", status);
            return Err(Error::LLMProvider(format!("Ollama API error: {}", status.as_u16())));
        }

        Ok(response)
    }

    /// Perform the actual non-streaming generation request
    async fn perform_generation(&self, prompt: &str, config: &GenerationConfig) -> Result<String> {
        let response = self.send_generation(prompt, config, false).await?;

        let data: GenerationResponse = response.json().await.map_err(|e| {
            if e.is_timeout() {
                map_request_error(e)
            } else {
                Error::Serialization(format!("Invalid Ollama response: {}", e))
            }
        })?;

        Ok(data.response.unwrap_or_default())
    }
}

/// Map a transport failure to the pipeline's error taxonomy
fn map_request_error(e: reqwest::Error) -> Error {
    if e.is_timeout() {
        error!("Ollama request timed out");
        Error::Timeout("Request timed out - model may be too large for available resources".to_string())
    } else {
        error!("Ollama request failed: {}", e);
        Error::Network(format!("Failed to reach Ollama: {}", e))
    }
}

#[async_trait]
impl LLMProvider for OllamaClient {
    async fn generate(&self, prompt: &str, config: &GenerationConfig) -> Result<String> {
        let generation_future = self.perform_generation(prompt, config);

        match timeout(config.timeout, generation_future).await {
            Ok(result) => result,
            Err(_) => {
                error!("Ollama request timed out after {:?}", config.timeout);
                Err(Error::Timeout(
                    "Request timed out - model may be too large for available resources".to_string(),
                ))
            }
        }
    }

    async fn generate_stream(&self, prompt: &str, config: &GenerationConfig) -> Result<TextStream> {
        let response = match timeout(config.timeout, self.send_generation(prompt, config, true)).await {
            Ok(result) => result?,
            Err(_) => {
                return Err(Error::Timeout(
                    "Request timed out - model may be too large for available resources".to_string(),
                ));
            }
        };

        Ok(decode_fragments(response.bytes_stream()))
    }

    async fn health(&self) -> bool {
        let url = match self.config.endpoint("api/tags") {
            Ok(url) => url,
            Err(e) => {
                error!("Ollama health check failed: {}", e);
                return false;
            }
        };

        match self.health_client.get(url).send().await {
            Ok(response) if response.status().is_success() => true,
            Ok(response) => {
                info!("Ollama health check returned {}", response.status());
                false
            }
            Err(e) => {
                error!("Ollama health check failed: {}", e);
                false
            }
        }
    }

    fn default_model(&self) -> &str {
        &self.config.model
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use insta::assert_snapshot;

    #[test]
    fn test_request_body() {
        let config = GenerationConfig::for_model("llama3")
            .with_system_prompt("Be brief.")
            .with_max_tokens(4000);
        let body = GenerationRequest::new("Hi", &config, false);
        assert_snapshot!(
            serde_json::to_string(&body).unwrap(),
            @r#"{"model":"llama3","prompt":"Hi","stream":false,"system":"Be brief.","options":{"num_predict":4000,"temperature":0.7,"top_p":0.9}}"#
        );
    }

    #[test]
    fn test_request_body_with_stop_and_no_system() {
        let mut config = GenerationConfig::for_model("llama3");
        config.stop_sequences = vec!["User:".to_string()];
        let body = GenerationRequest::new("Hi", &config, true);
        let value = serde_json::to_value(&body).unwrap();
        assert!(value.get("system").is_none());
        assert_eq!(value["stream"], true);
        assert_eq!(value["options"]["stop"][0], "User:");
    }

    #[test]
    fn test_default_model() {
        let client = OllamaClient::new(OllamaConfig::new("http://localhost:11434", "llama3"))
            .unwrap()
            .with_model("mistral");
        assert_eq!(client.default_model(), "mistral");
    }
}
