//! Query lifecycle: Embed -> Retrieve -> Generate (streamed) -> Record
//!
//! Split in two so the HTTP layer can still pick a status code for failures
//! that happen before any byte is streamed:
//! - [`QueryOrchestrator::prepare`] validates, embeds, retrieves and builds
//!   the context. Its errors are ordinary responses.
//! - [`QueryOrchestrator::run`] streams the answer into a bounded channel,
//!   records the interaction and emits the control events. Its failures are
//!   reported in-band.

use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;
use std::time::Instant;

use futures::FutureExt;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::debug;
use tracing::error;
use tracing::info;
use tracing::warn;
use tracing::Instrument;

use crate::config::AppConfig;
use crate::embeddings::Embedder;
use crate::errors::RagDeskError;
use crate::errors::Result;
use crate::ledger::InteractionLedger;
use crate::llm::CompletionStreamer;
use crate::models::CallerIdentity;
use crate::models::NewInteraction;
use crate::protocol::StreamEvent;
use crate::rag::ContextAssembler;
use crate::rag::VectorRetriever;

/// Fan-out of the nearest-neighbour search
pub const DEFAULT_TOP_K: usize = 5;

/// In-band message sent when the streaming task panics
pub const INTERNAL_ERROR: &str = "internal error";

/// Tunables fixed at startup
#[derive(Debug, Clone)]
pub struct OrchestratorOptions {
    pub agent_id: i32,
    pub top_k: usize,
    /// Joint deadline for embed + retrieve
    pub upstream_timeout: Option<Duration>,
}

impl Default for OrchestratorOptions {
    fn default() -> Self {
        Self {
            agent_id: 1,
            top_k: DEFAULT_TOP_K,
            upstream_timeout: None,
        }
    }
}

impl OrchestratorOptions {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            agent_id: config.agent_id(),
            top_k: config.retrieval.top_k,
            upstream_timeout: config.retrieval.upstream_timeout_secs.map(Duration::from_secs),
        }
    }
}

/// Wall-clock duration of each phase, in milliseconds
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct QueryTimings {
    pub embed_ms: u64,
    pub retrieve_ms: u64,
    pub generate_ms: u64,
    pub record_ms: u64,
    pub total_ms: u64,
}

fn elapsed_ms(since: Instant) -> u64 {
    since.elapsed().as_millis() as u64
}

/// A question that passed every pre-stream phase
#[derive(Debug)]
pub struct PreparedQuery {
    pub question: String,
    pub caller: Option<CallerIdentity>,
    pub context: String,
    pub chunk_count: usize,
    started: Instant,
    timings: QueryTimings,
}

/// What happened once the stream was open
#[derive(Debug)]
pub struct QueryOutcome {
    /// Accumulated answer, partial when generation failed or the client left
    pub answer: String,
    pub record_id: Option<i64>,
    pub total_ms: u64,
    /// In-band error message, when generation failed
    pub error: Option<String>,
    pub disconnected: bool,
    pub timings: QueryTimings,
}

impl QueryOutcome {
    fn aborted(started: Instant, message: &str) -> Self {
        let total_ms = elapsed_ms(started);
        Self {
            answer: String::new(),
            record_id: None,
            total_ms,
            error: Some(message.to_string()),
            disconnected: false,
            timings: QueryTimings {
                total_ms,
                ..QueryTimings::default()
            },
        }
    }
}

/// Forwards events to the client and remembers whether it is still there
struct EventSink {
    tx: mpsc::Sender<StreamEvent>,
    disconnected: bool,
    terminated: bool,
}

impl EventSink {
    const fn new(tx: mpsc::Sender<StreamEvent>) -> Self {
        Self {
            tx,
            disconnected: false,
            terminated: false,
        }
    }

    /// Returns false once the client is gone; never errors
    async fn send(&mut self, event: StreamEvent) -> bool {
        if self.disconnected || self.terminated {
            return false;
        }
        self.terminated = event.is_terminal();
        if self.tx.send(event).await.is_err() {
            debug!("Client disconnected; dropping further events");
            self.disconnected = true;
            return false;
        }
        true
    }
}

/// Stateless per-request coordinator
pub struct QueryOrchestrator {
    embedder: Arc<dyn Embedder>,
    retriever: Arc<dyn VectorRetriever>,
    streamer: Arc<dyn CompletionStreamer>,
    ledger: Arc<dyn InteractionLedger>,
    context_assembler: ContextAssembler,
    options: OrchestratorOptions,
}

impl QueryOrchestrator {
    pub fn new(
        embedder: Arc<dyn Embedder>,
        retriever: Arc<dyn VectorRetriever>,
        streamer: Arc<dyn CompletionStreamer>,
        ledger: Arc<dyn InteractionLedger>,
        options: OrchestratorOptions,
    ) -> Self {
        Self {
            embedder,
            retriever,
            streamer,
            ledger,
            context_assembler: ContextAssembler,
            options,
        }
    }

    /// Prepare the query and, on success, stream it from a spawned task
    ///
    /// The task outlives a disconnected client so the interaction is still
    /// recorded. A panic inside the task still ends the stream with a single
    /// `Error` event.
    pub async fn handle(
        self: &Arc<Self>,
        question: &str,
        caller: Option<CallerIdentity>,
        capacity: usize,
    ) -> Result<(mpsc::Receiver<StreamEvent>, JoinHandle<QueryOutcome>)> {
        let span = tracing::info_span!("query", request_id = %uuid::Uuid::new_v4());

        let prepared = self
            .prepare(question, caller)
            .instrument(span.clone())
            .await?;

        let (tx, rx) = mpsc::channel(capacity.max(1));
        let orchestrator = Arc::clone(self);
        let handle = tokio::spawn(
            async move {
                let started = prepared.started;
                let fallback = tx.clone();
                match AssertUnwindSafe(orchestrator.run(prepared, tx))
                    .catch_unwind()
                    .await
                {
                    Ok(outcome) => outcome,
                    Err(_) => {
                        // Every collaborator call precedes the terminal event
                        error!("Query task panicked before finishing the stream");
                        let _ = fallback.send(StreamEvent::error(INTERNAL_ERROR)).await;
                        QueryOutcome::aborted(started, INTERNAL_ERROR)
                    }
                }
            }
            .instrument(span),
        );
        Ok((rx, handle))
    }

    /// Validate, embed, retrieve and assemble the context
    ///
    /// # Errors
    /// - `MissingInput` for a blank question, before any collaborator call
    /// - `UpstreamFailure` when embedding or retrieval fails or times out
    pub async fn prepare(
        &self,
        question: &str,
        caller: Option<CallerIdentity>,
    ) -> Result<PreparedQuery> {
        let started = Instant::now();
        if question.trim().is_empty() {
            return Err(RagDeskError::MissingInput);
        }
        info!(
            "Processing query from {}: {}",
            CallerIdentity::created_by(caller.as_ref()),
            question
        );

        let lookup = self.lookup(question);
        let (chunks, embed_ms, retrieve_ms) = match self.options.upstream_timeout {
            Some(limit) => tokio::time::timeout(limit, lookup).await.map_err(|_| {
                RagDeskError::UpstreamFailure {
                    phase: "embed+retrieve",
                    message: format!("no response within {}s", limit.as_secs()),
                }
            })??,
            None => lookup.await?,
        };

        let context = self.context_assembler.assemble(&chunks);
        debug!(
            "Assembled context from {} chunks ({} bytes)",
            chunks.len(),
            context.len()
        );

        Ok(PreparedQuery {
            question: question.to_string(),
            caller,
            context,
            chunk_count: chunks.len(),
            started,
            timings: QueryTimings {
                embed_ms,
                retrieve_ms,
                ..QueryTimings::default()
            },
        })
    }

    async fn lookup(
        &self,
        question: &str,
    ) -> Result<(Vec<crate::models::RetrievedChunk>, u64, u64)> {
        let embed_start = Instant::now();
        let embedding = self
            .embedder
            .embed(question)
            .await
            .map_err(|e| RagDeskError::upstream("embed", &e))?;
        let embed_ms = elapsed_ms(embed_start);

        let retrieve_start = Instant::now();
        let chunks = self
            .retriever
            .retrieve_top_k(&embedding, self.options.top_k)
            .await
            .map_err(|e| RagDeskError::upstream("retrieve", &e))?;
        let retrieve_ms = elapsed_ms(retrieve_start);

        Ok((chunks, embed_ms, retrieve_ms))
    }

    /// Stream the answer, record it, then emit the control events
    ///
    /// Exactly one terminal event is sent: `Done` on success, `Error` when
    /// generation fails. Send failures mean the client left; they stop
    /// forwarding but never skip the ledger write.
    pub async fn run(
        &self,
        prepared: PreparedQuery,
        events: mpsc::Sender<StreamEvent>,
    ) -> QueryOutcome {
        let mut sink = EventSink::new(events);
        let mut timings = prepared.timings;
        let mut answer = String::new();

        let generate_start = Instant::now();
        let generation = self.generate(&prepared, &mut answer, &mut sink).await;
        timings.generate_ms = elapsed_ms(generate_start);

        let total_ms = elapsed_ms(prepared.started);
        timings.total_ms = total_ms;

        let record_start = Instant::now();
        let record_id = self.record(&prepared, &answer, total_ms).await;
        timings.record_ms = elapsed_ms(record_start);

        let error = match generation {
            Ok(()) => {
                sink.send(StreamEvent::QueryId { id: record_id }).await;
                sink.send(StreamEvent::Latency { ms: total_ms }).await;
                sink.send(StreamEvent::Done).await;
                None
            }
            Err(e) => {
                error!("Generation failed after {} bytes: {}", answer.len(), e);
                let message = e.to_string();
                sink.send(StreamEvent::error(message.clone())).await;
                Some(message)
            }
        };

        info!(
            "Query finished: embed {}ms, retrieve {}ms, generate {}ms, record {}ms, total {}ms ({} chunks)",
            timings.embed_ms,
            timings.retrieve_ms,
            timings.generate_ms,
            timings.record_ms,
            timings.total_ms,
            prepared.chunk_count
        );

        QueryOutcome {
            answer,
            record_id,
            total_ms,
            error,
            disconnected: sink.disconnected,
            timings,
        }
    }

    async fn generate(
        &self,
        prepared: &PreparedQuery,
        answer: &mut String,
        sink: &mut EventSink,
    ) -> Result<()> {
        let mut response = self
            .streamer
            .stream_completion(&prepared.question, &prepared.context)
            .await?;

        while let Some(chunk) = response.next_chunk().await {
            let token = chunk?;
            if token.is_empty() {
                continue;
            }
            answer.push_str(&token);
            if !sink.send(StreamEvent::token(token)).await {
                warn!("Client went away mid-answer; keeping {} bytes for the ledger", answer.len());
                break;
            }
        }
        Ok(())
    }

    /// Persist the interaction; failures are logged and absorbed
    async fn record(&self, prepared: &PreparedQuery, answer: &str, total_ms: u64) -> Option<i64> {
        let interaction = NewInteraction {
            agent_id: self.options.agent_id,
            query: prepared.question.clone(),
            response: answer.to_string(),
            time_to_result_ms: total_ms,
            created_by: CallerIdentity::created_by(prepared.caller.as_ref()),
        };

        match self.ledger.record(interaction).await {
            Ok(id) => Some(id),
            Err(e) => {
                warn!("Failed to record interaction; feedback unavailable: {}", e);
                None
            }
        }
    }
}
