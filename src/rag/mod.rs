//! RAG (Retrieval-Augmented Generation) module
//!
//! Everything between an accepted question and a streamed answer:
//! - Vector retrieval over pgvector, Pinecone or the in-memory index
//! - Context assembly with source attribution
//! - The per-request orchestrator that streams the answer and records it
//!
//! # Examples
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use ragdesk::embeddings::EmbeddingClient;
//! use ragdesk::ledger::MemoryStore;
//! use ragdesk::llm::LlmService;
//! use ragdesk::rag::OrchestratorOptions;
//! use ragdesk::rag::QueryOrchestrator;
//! use ragdesk::AppConfig;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = AppConfig::load()?;
//!     let store = Arc::new(MemoryStore::new());
//!     let orchestrator = Arc::new(QueryOrchestrator::new(
//!         Arc::new(EmbeddingClient::from_config(&config)?),
//!         store.clone(),
//!         Arc::new(LlmService::new(&config)?),
//!         store,
//!         OrchestratorOptions::from_config(&config),
//!     ));
//!
//!     let (mut events, _task) = orchestrator.handle("How many PTO days?", None, 16).await?;
//!     while let Some(event) = events.recv().await {
//!         println!("{event:?}");
//!     }
//!     Ok(())
//! }
//! ```

pub mod context;
pub mod pinecone;
pub mod pipeline;
pub mod retriever;

pub use context::ContextAssembler;
pub use pinecone::PineconeRetriever;
pub use pipeline::OrchestratorOptions;
pub use pipeline::PreparedQuery;
pub use pipeline::QueryOrchestrator;
pub use pipeline::QueryOutcome;
pub use pipeline::QueryTimings;
pub use retriever::PgVectorRetriever;
pub use retriever::VectorRetriever;
