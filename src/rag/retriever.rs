//! Retrieval module for nearest-neighbour search over document chunks

use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;

use crate::database::Database;
use crate::errors::RagDeskError;
use crate::errors::Result;
use crate::models::RetrievedChunk;

/// Nearest-neighbour search over embedded chunks
#[async_trait]
pub trait VectorRetriever: Send + Sync {
    /// Up to `k` chunks, most similar first; fails with `RetrievalFailure`
    async fn retrieve_top_k(&self, vector: &[f32], k: usize) -> Result<Vec<RetrievedChunk>>;
}

/// Cosine search in PostgreSQL through pgvector
pub struct PgVectorRetriever {
    database: Arc<Database>,
    agent_id: i32,
}

impl PgVectorRetriever {
    /// Create a new retriever scoped to one agent's documents
    pub fn new(database: Arc<Database>, agent_id: i32) -> Self {
        Self { database, agent_id }
    }
}

#[async_trait]
impl VectorRetriever for PgVectorRetriever {
    async fn retrieve_top_k(&self, vector: &[f32], k: usize) -> Result<Vec<RetrievedChunk>> {
        debug!("Performing pgvector search: top {} for agent {}", k, self.agent_id);

        self.database
            .search_chunks(vector, self.agent_id, k as i64)
            .await
            .map_err(|e| RagDeskError::RetrievalFailure(e.to_string()))
    }
}
