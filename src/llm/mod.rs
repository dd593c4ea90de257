//! Language model access: streamed chat completions grounded in retrieved context

pub mod prompts;
pub mod streaming;

use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use tracing::debug;

pub use prompts::ChatMessage;
pub use streaming::StreamingResponse;

use crate::config::AppConfig;
use crate::errors::RagDeskError;
use crate::errors::Result;

/// Produces a token-incremental answer for a question and its context
#[async_trait]
pub trait CompletionStreamer: Send + Sync {
    /// Open the generation stream
    ///
    /// Fails with `GenerationFailure`, either here or as an item of the
    /// returned stream after partial output.
    async fn stream_completion(&self, question: &str, context: &str) -> Result<StreamingResponse>;
}

/// Supported chat providers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LlmProvider {
    /// OpenAI-compatible `/chat/completions` with SSE streaming
    OpenAI,
    /// Ollama `/api/chat` with NDJSON streaming
    Ollama,
}

/// Chat completion client
#[derive(Clone)]
pub struct LlmService {
    provider: LlmProvider,
    endpoint: String,
    api_key: String,
    model: String,
    temperature: f32,
    client: Client,
}

impl LlmService {
    pub fn new(config: &AppConfig) -> Result<Self> {
        let provider = if config.llm_key() == "ollama" {
            LlmProvider::Ollama
        } else {
            LlmProvider::OpenAI
        };

        // No overall timeout: a long answer legitimately streams for minutes
        let client = Client::builder()
            .connect_timeout(std::time::Duration::from_secs(10))
            .build()
            .map_err(|e| RagDeskError::HttpError(e.to_string()))?;

        Ok(Self {
            provider,
            endpoint: config.llm_endpoint().trim_end_matches('/').to_string(),
            api_key: config.llm_key().to_string(),
            model: config.llm_model().to_string(),
            temperature: config.llm.temperature,
            client,
        })
    }

    pub const fn provider(&self) -> LlmProvider {
        self.provider
    }

    async fn stream_openai(&self, messages: Vec<ChatMessage>) -> Result<StreamingResponse> {
        #[derive(Serialize)]
        struct ChatRequest<'a> {
            model: &'a str,
            messages: Vec<ChatMessage>,
            temperature: f32,
            stream: bool,
        }

        let url = format!("{}/chat/completions", self.endpoint);
        debug!("Calling OpenAI chat completions API: {}", url);

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&ChatRequest {
                model: &self.model,
                messages,
                temperature: self.temperature,
                stream: true,
            })
            .send()
            .await
            .map_err(|e| RagDeskError::GenerationFailure(e.to_string()))?;

        let response = check_status(response, "OpenAI").await?;
        let lines = streaming::split_lines(response.bytes_stream());
        Ok(StreamingResponse::new(streaming::tokens_from_lines(
            lines,
            streaming::parse_openai_line,
        )))
    }

    async fn stream_ollama(&self, messages: Vec<ChatMessage>) -> Result<StreamingResponse> {
        #[derive(Serialize)]
        struct ChatRequest<'a> {
            model: &'a str,
            messages: Vec<ChatMessage>,
            stream: bool,
            options: Options,
        }

        #[derive(Serialize)]
        struct Options {
            temperature: f32,
        }

        let url = format!("{}/api/chat", self.endpoint);
        debug!("Calling Ollama chat API: {}", url);

        let response = self
            .client
            .post(&url)
            .json(&ChatRequest {
                model: &self.model,
                messages,
                stream: true,
                options: Options {
                    temperature: self.temperature,
                },
            })
            .send()
            .await
            .map_err(|e| RagDeskError::GenerationFailure(e.to_string()))?;

        let response = check_status(response, "Ollama").await?;
        let lines = streaming::split_lines(response.bytes_stream());
        Ok(StreamingResponse::new(streaming::tokens_from_lines(
            lines,
            streaming::parse_ollama_line,
        )))
    }
}

async fn check_status(response: reqwest::Response, provider: &str) -> Result<reqwest::Response> {
    if response.status().is_success() {
        return Ok(response);
    }
    let status = response.status();
    let error_text = response
        .text()
        .await
        .unwrap_or_else(|_| "Unknown error".to_string());
    Err(RagDeskError::GenerationFailure(format!(
        "{provider} API error ({status}): {error_text}"
    )))
}

#[async_trait]
impl CompletionStreamer for LlmService {
    async fn stream_completion(&self, question: &str, context: &str) -> Result<StreamingResponse> {
        let messages = prompts::build_messages(question, context);
        match self.provider {
            LlmProvider::OpenAI => self.stream_openai(messages).await,
            LlmProvider::Ollama => self.stream_ollama(messages).await,
        }
    }
}
