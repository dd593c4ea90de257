/// API request handlers
use std::sync::Arc;

use axum::Json;
use tracing::info;

use crate::api::types::HealthResponse;
use crate::auth::IdentityVerifier;
use crate::config::AppConfig;
use crate::config::RetrievalBackend;
use crate::config::WireFormat;
use crate::database::Database;
use crate::embeddings::EmbeddingClient;
use crate::ledger::FileCatalog;
use crate::ledger::InteractionLedger;
use crate::ledger::MemoryStore;
use crate::llm::LlmService;
use crate::rag::OrchestratorOptions;
use crate::rag::PgVectorRetriever;
use crate::rag::PineconeRetriever;
use crate::rag::QueryOrchestrator;
use crate::rag::VectorRetriever;
use crate::Result;

pub mod feedback;
pub mod files;
pub mod history;
pub mod query;

pub use feedback::*;
pub use files::*;
pub use history::*;
pub use query::*;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub orchestrator: Arc<QueryOrchestrator>,
    pub ledger: Arc<dyn InteractionLedger>,
    pub catalog: Arc<dyn FileCatalog>,
    /// `None` when authentication is disabled
    pub verifier: Option<Arc<dyn IdentityVerifier>>,
    pub agent_id: i32,
    pub wire_format: WireFormat,
    pub channel_capacity: usize,
}

impl AppState {
    /// Wire every collaborator from configuration
    ///
    /// With `memory` set, ledger, file catalog and vector index all live in
    /// one [`MemoryStore`] and no database is contacted.
    pub async fn build(config: &AppConfig, memory: bool) -> Result<Self> {
        let ledger: Arc<dyn InteractionLedger>;
        let catalog: Arc<dyn FileCatalog>;
        let retriever: Arc<dyn VectorRetriever>;

        if memory {
            info!("Using in-memory ledger and index");
            let store = Arc::new(MemoryStore::new());
            ledger = store.clone();
            catalog = store.clone();
            retriever = store;
        } else {
            let database = Arc::new(Database::from_config(config).await?);
            if config.database.auto_init_schema {
                database.init_schema(config.embedding_dimension()).await?;
            }
            retriever = match config.retrieval.backend {
                RetrievalBackend::Pgvector => {
                    Arc::new(PgVectorRetriever::new(database.clone(), config.agent_id()))
                }
                RetrievalBackend::Pinecone => Arc::new(PineconeRetriever::from_config(config)?),
            };
            info!("Retrieval backend: {:?}", config.retrieval.backend);
            ledger = database.clone();
            catalog = database;
        }

        let embedder = EmbeddingClient::from_config(config)?;
        let streamer = LlmService::new(config)?;
        info!(
            "Embeddings via {:?}, completions via {:?}",
            embedder.provider(),
            streamer.provider()
        );

        let orchestrator = QueryOrchestrator::new(
            Arc::new(embedder),
            retriever,
            Arc::new(streamer),
            ledger.clone(),
            OrchestratorOptions::from_config(config),
        );

        Ok(Self {
            orchestrator: Arc::new(orchestrator),
            ledger,
            catalog,
            verifier: crate::auth::verifier_from_config(config)?,
            agent_id: config.agent_id(),
            wire_format: config.protocol.format,
            channel_capacity: config.protocol.channel_capacity,
        })
    }
}

/// Health check handler
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}
