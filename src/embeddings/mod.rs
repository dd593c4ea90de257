//! Embeddings generation module
//!
//! Converts the user question into the vector the index is searched with.
//! Two providers are supported:
//! - OpenAI-compatible `/embeddings` endpoints (text-embedding-3-small, ...)
//! - Ollama `/api/embeddings` for local models
//!
//! # Examples
//!
//! ```rust,no_run
//! use ragdesk::config::AppConfig;
//! use ragdesk::embeddings::{Embedder, EmbeddingClient};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = AppConfig::load()?;
//!     let client = EmbeddingClient::from_config(&config)?;
//!
//!     let embedding = client.embed("What is the vacation policy?").await?;
//!     println!("Generated embedding with {} dimensions", embedding.len());
//!
//!     Ok(())
//! }
//! ```

pub mod client;

use async_trait::async_trait;

pub use client::EmbeddingClient;
pub use client::EmbeddingProvider;

use crate::errors::Result;

/// Converts free text into a fixed-dimension vector
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Fails with `EmbeddingFailure`
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;
}

/// Configuration for embedding generation
#[derive(Debug, Clone)]
pub struct EmbeddingConfig {
    pub provider: EmbeddingProvider,
    pub model: String,
    pub dimension: usize,
    pub endpoint: String,
    pub api_key: Option<String>,
}

impl EmbeddingConfig {
    pub fn from_app_config(config: &crate::config::AppConfig) -> Self {
        // An "ollama" key is the marker for a local Ollama daemon
        let provider = if config.llm_key() == "ollama" {
            EmbeddingProvider::Ollama
        } else {
            EmbeddingProvider::OpenAI
        };

        Self {
            provider,
            model: config.embedding_model().to_string(),
            dimension: config.embedding_dimension(),
            endpoint: config.embedding_endpoint().trim_end_matches('/').to_string(),
            api_key: if provider == EmbeddingProvider::OpenAI {
                Some(config.llm_key().to_string())
            } else {
                None
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AppConfig;

    #[test]
    fn test_provider_selection_from_key() {
        let mut config = AppConfig::default();
        config.llm.llm_key = "sk-live".to_string();
        let embedding = EmbeddingConfig::from_app_config(&config);
        assert_eq!(embedding.provider, EmbeddingProvider::OpenAI);
        assert_eq!(embedding.api_key.as_deref(), Some("sk-live"));

        config.llm.llm_key = "ollama".to_string();
        config.embeddings.endpoint = Some("http://localhost:11434/".to_string());
        let embedding = EmbeddingConfig::from_app_config(&config);
        assert_eq!(embedding.provider, EmbeddingProvider::Ollama);
        assert_eq!(embedding.api_key, None);
        assert_eq!(embedding.endpoint, "http://localhost:11434");
    }
}
