//! Stub collaborators with call counters

#![allow(dead_code)]

use std::sync::atomic::AtomicUsize;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use ragdesk::embeddings::Embedder;
use ragdesk::ledger::InteractionLedger;
use ragdesk::ledger::MemoryStore;
use ragdesk::llm::CompletionStreamer;
use ragdesk::llm::StreamingResponse;
use ragdesk::models::InteractionRecord;
use ragdesk::models::NewInteraction;
use ragdesk::models::RetrievedChunk;
use ragdesk::rag::OrchestratorOptions;
use ragdesk::rag::QueryOrchestrator;
use ragdesk::rag::VectorRetriever;
use ragdesk::RagDeskError;
use ragdesk::Result;

#[derive(Default)]
pub struct StubEmbedder {
    pub calls: AtomicUsize,
    pub fail: bool,
    pub delay: Option<Duration>,
}

#[async_trait]
impl Embedder for StubEmbedder {
    async fn embed(&self, _text: &str) -> Result<Vec<f32>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if self.fail {
            return Err(RagDeskError::EmbeddingFailure("embedding service down".into()));
        }
        Ok(vec![1.0, 0.0])
    }
}

#[derive(Default)]
pub struct StubRetriever {
    pub calls: AtomicUsize,
    pub chunks: Vec<RetrievedChunk>,
    pub fail: bool,
}

#[async_trait]
impl VectorRetriever for StubRetriever {
    async fn retrieve_top_k(&self, _vector: &[f32], k: usize) -> Result<Vec<RetrievedChunk>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(RagDeskError::RetrievalFailure("index unavailable".into()));
        }
        Ok(self.chunks.iter().take(k).cloned().collect())
    }
}

/// Emits `tokens`, then fails with `fail_with` if set
#[derive(Default)]
pub struct StubStreamer {
    pub calls: AtomicUsize,
    pub tokens: Vec<String>,
    pub fail_with: Option<String>,
    pub seen_context: Mutex<Option<String>>,
}

impl StubStreamer {
    pub fn with_tokens(tokens: &[&str]) -> Self {
        Self {
            tokens: tokens.iter().map(|t| (*t).to_string()).collect(),
            ..Self::default()
        }
    }

    pub fn context(&self) -> Option<String> {
        self.seen_context.lock().unwrap().clone()
    }
}

#[async_trait]
impl CompletionStreamer for StubStreamer {
    async fn stream_completion(&self, _question: &str, context: &str) -> Result<StreamingResponse> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        *self.seen_context.lock().unwrap() = Some(context.to_string());

        let mut items: Vec<Result<String>> = self.tokens.iter().cloned().map(Ok).collect();
        if let Some(message) = &self.fail_with {
            items.push(Err(RagDeskError::GenerationFailure(message.clone())));
        }
        Ok(StreamingResponse::from_stream(futures::stream::iter(items)))
    }
}

/// Ledger whose writes always fail
#[derive(Default)]
pub struct FailingLedger {
    pub calls: AtomicUsize,
}

#[async_trait]
impl InteractionLedger for FailingLedger {
    async fn record(&self, _interaction: NewInteraction) -> Result<i64> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(RagDeskError::PersistenceFailure("connection refused".into()))
    }

    async fn set_feedback(&self, id: i64, _thumbs_up: bool) -> Result<()> {
        Err(RagDeskError::NotFound(format!("interaction {id}")))
    }

    async fn list(&self, _agent_id: i32) -> Result<Vec<InteractionRecord>> {
        Ok(Vec::new())
    }
}

/// Ledger whose driver panics on write
#[derive(Default)]
pub struct PanickingLedger;

#[async_trait]
impl InteractionLedger for PanickingLedger {
    async fn record(&self, _interaction: NewInteraction) -> Result<i64> {
        panic!("ledger driver crashed");
    }

    async fn set_feedback(&self, id: i64, _thumbs_up: bool) -> Result<()> {
        Err(RagDeskError::NotFound(format!("interaction {id}")))
    }

    async fn list(&self, _agent_id: i32) -> Result<Vec<InteractionRecord>> {
        Ok(Vec::new())
    }
}

pub fn hr_chunk() -> RetrievedChunk {
    RetrievedChunk::new("Employees get 15 days...")
        .with_source("HR.pdf", "https://x/HR.pdf")
        .with_score(0.92)
}

pub struct Harness {
    pub embedder: Arc<StubEmbedder>,
    pub retriever: Arc<StubRetriever>,
    pub streamer: Arc<StubStreamer>,
    pub store: Arc<MemoryStore>,
}

impl Harness {
    pub fn new(embedder: StubEmbedder, retriever: StubRetriever, streamer: StubStreamer) -> Self {
        Self {
            embedder: Arc::new(embedder),
            retriever: Arc::new(retriever),
            streamer: Arc::new(streamer),
            store: Arc::new(MemoryStore::new()),
        }
    }

    pub fn orchestrator(&self) -> Arc<QueryOrchestrator> {
        self.orchestrator_with(self.store.clone(), OrchestratorOptions::default())
    }

    pub fn orchestrator_with(
        &self,
        ledger: Arc<dyn InteractionLedger>,
        options: OrchestratorOptions,
    ) -> Arc<QueryOrchestrator> {
        Arc::new(QueryOrchestrator::new(
            self.embedder.clone(),
            self.retriever.clone(),
            self.streamer.clone(),
            ledger,
            options,
        ))
    }

    pub fn collaborator_calls(&self) -> (usize, usize, usize) {
        (
            self.embedder.calls.load(Ordering::SeqCst),
            self.retriever.calls.load(Ordering::SeqCst),
            self.streamer.calls.load(Ordering::SeqCst),
        )
    }
}
