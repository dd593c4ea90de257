//! Pinecone index over its REST data plane

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde::Serialize;
use tracing::debug;

use super::VectorRetriever;
use crate::config::AppConfig;
use crate::errors::RagDeskError;
use crate::errors::Result;
use crate::models::RetrievedChunk;

/// Client for one Pinecone index host
pub struct PineconeRetriever {
    host: String,
    api_key: String,
    client: Client,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct QueryRequest<'a> {
    vector: &'a [f32],
    top_k: usize,
    include_metadata: bool,
}

#[derive(Deserialize)]
struct QueryResponse {
    #[serde(default)]
    matches: Vec<Match>,
}

#[derive(Deserialize)]
struct Match {
    #[serde(default)]
    score: f32,
    #[serde(default)]
    metadata: Option<ChunkMetadata>,
}

/// Metadata keys written by the indexing job
#[derive(Deserialize)]
struct ChunkMetadata {
    #[serde(default)]
    chunk: Option<String>,
    #[serde(default)]
    filename: Option<String>,
    #[serde(default)]
    fileurl: Option<String>,
}

impl PineconeRetriever {
    pub fn new(host: &str, api_key: &str) -> Result<Self> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()
            .map_err(|e| RagDeskError::HttpError(e.to_string()))?;

        Ok(Self {
            host: host.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            client,
        })
    }

    pub fn from_config(config: &AppConfig) -> Result<Self> {
        let host = config.retrieval.pinecone_host.as_deref().ok_or_else(|| {
            RagDeskError::ConfigError("retrieval.pinecone_host is not set".to_string())
        })?;
        let api_key = config.retrieval.pinecone_api_key.as_deref().ok_or_else(|| {
            RagDeskError::ConfigError("retrieval.pinecone_api_key is not set".to_string())
        })?;
        Self::new(host, api_key)
    }
}

fn into_chunks(response: QueryResponse) -> Vec<RetrievedChunk> {
    response
        .matches
        .into_iter()
        .filter_map(|m| {
            let metadata = m.metadata?;
            Some(RetrievedChunk {
                text: metadata.chunk?,
                source_name: metadata.filename,
                source_url: metadata.fileurl,
                similarity_score: m.score,
            })
        })
        .collect()
}

#[async_trait]
impl VectorRetriever for PineconeRetriever {
    async fn retrieve_top_k(&self, vector: &[f32], k: usize) -> Result<Vec<RetrievedChunk>> {
        let url = format!("{}/query", self.host);
        debug!("Querying Pinecone index: {} (topK {})", url, k);

        let response = self
            .client
            .post(&url)
            .header("Api-Key", &self.api_key)
            .json(&QueryRequest {
                vector,
                top_k: k,
                include_metadata: true,
            })
            .send()
            .await
            .map_err(|e| RagDeskError::RetrievalFailure(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(RagDeskError::RetrievalFailure(format!(
                "Pinecone API error ({status}): {error_text}"
            )));
        }

        let result: QueryResponse = response.json().await.map_err(|e| {
            RagDeskError::RetrievalFailure(format!("Failed to parse response: {e}"))
        })?;
        Ok(into_chunks(result))
    }
}
