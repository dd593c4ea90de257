//! Embedding API clients for various providers

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde::Serialize;
use tracing::debug;

use super::Embedder;
use super::EmbeddingConfig;
use crate::config::AppConfig;
use crate::errors::RagDeskError;
use crate::errors::Result;

/// Supported embedding providers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmbeddingProvider {
    /// `OpenAI` embeddings API
    OpenAI,
    /// Ollama local embeddings
    Ollama,
}

/// Client for generating embeddings from various providers
pub struct EmbeddingClient {
    config: EmbeddingConfig,
    client: Client,
}

impl EmbeddingClient {
    /// Create a new embedding client
    ///
    /// # Errors
    /// - HTTP client build errors (invalid configuration)
    pub fn new(config: EmbeddingConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(60))
            .pool_idle_timeout(std::time::Duration::from_secs(30))
            .build()
            .map_err(|e| RagDeskError::HttpError(e.to_string()))?;

        Ok(Self { config, client })
    }

    pub fn from_config(config: &AppConfig) -> Result<Self> {
        Self::new(EmbeddingConfig::from_app_config(config))
    }

    pub fn provider(&self) -> EmbeddingProvider {
        self.config.provider
    }

    /// Generate embedding for a single text
    ///
    /// # Errors
    /// - API request failures (network errors, timeouts, authentication failures)
    /// - Invalid API responses (malformed JSON, wrong embedding dimensions)
    pub async fn generate(&self, text: &str) -> Result<Vec<f32>> {
        let embedding = match self.config.provider {
            EmbeddingProvider::OpenAI => self.generate_openai(text).await?,
            EmbeddingProvider::Ollama => self.generate_ollama(text).await?,
        };

        if embedding.len() != self.config.dimension {
            return Err(RagDeskError::EmbeddingFailure(format!(
                "expected {} dimensions from {}, got {}",
                self.config.dimension,
                self.config.model,
                embedding.len()
            )));
        }
        Ok(embedding)
    }

    /// Generate embedding using `OpenAI` API
    async fn generate_openai(&self, text: &str) -> Result<Vec<f32>> {
        let api_key = self.config.api_key.as_ref().ok_or_else(|| {
            RagDeskError::ConfigError("OpenAI API key not provided".to_string())
        })?;

        #[derive(Serialize)]
        struct OpenAIRequest<'a> {
            input: &'a str,
            model: &'a str,
        }

        #[derive(Deserialize)]
        struct OpenAIResponse {
            data: Vec<EmbeddingData>,
        }

        #[derive(Deserialize)]
        struct EmbeddingData {
            embedding: Vec<f32>,
        }

        let url = format!("{}/embeddings", self.config.endpoint);
        debug!("Calling OpenAI embeddings API: {}", url);

        let request = OpenAIRequest {
            input: text,
            model: &self.config.model,
        };

        let response = self
            .client
            .post(&url)
            .bearer_auth(api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| RagDeskError::EmbeddingFailure(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(RagDeskError::EmbeddingFailure(format!(
                "OpenAI API error ({status}): {error_text}"
            )));
        }

        let result: OpenAIResponse = response.json().await.map_err(|e| {
            RagDeskError::EmbeddingFailure(format!("Failed to parse response: {e}"))
        })?;

        result
            .data
            .into_iter()
            .next()
            .map(|d| d.embedding)
            .ok_or_else(|| RagDeskError::EmbeddingFailure("No embedding in response".to_string()))
    }

    /// Generate embedding using Ollama API
    async fn generate_ollama(&self, text: &str) -> Result<Vec<f32>> {
        #[derive(Serialize)]
        struct OllamaRequest<'a> {
            model: &'a str,
            prompt: &'a str,
        }

        #[derive(Deserialize)]
        struct OllamaResponse {
            embedding: Vec<f32>,
        }

        let url = format!("{}/api/embeddings", self.config.endpoint);
        debug!("Calling Ollama embeddings API: {}", url);

        let request = OllamaRequest {
            model: &self.config.model,
            prompt: text,
        };

        let response = self
            .client
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| RagDeskError::EmbeddingFailure(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(RagDeskError::EmbeddingFailure(format!(
                "Ollama API error ({status}): {error_text}"
            )));
        }

        let result: OllamaResponse = response.json().await.map_err(|e| {
            RagDeskError::EmbeddingFailure(format!("Failed to parse response: {e}"))
        })?;

        Ok(result.embedding)
    }
}

#[async_trait]
impl Embedder for EmbeddingClient {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        self.generate(text).await
    }
}
