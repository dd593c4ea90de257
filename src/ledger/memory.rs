//! In-process ledger, file catalog and vector index
//!
//! Backs `ragdesk serve --memory` and the test suites. Vector search is
//! brute-force cosine similarity over every stored chunk whose file is not
//! ignored.

use std::sync::RwLock;
use std::sync::RwLockReadGuard;
use std::sync::RwLockWriteGuard;

use async_trait::async_trait;
use chrono::Utc;

use super::FileCatalog;
use super::InteractionLedger;
use crate::errors::RagDeskError;
use crate::errors::Result;
use crate::models::FileIgnoreState;
use crate::models::FileSyncEntry;
use crate::models::InteractionRecord;
use crate::models::NewInteraction;
use crate::models::RetrievedChunk;
use crate::rag::VectorRetriever;

struct StoredChunk {
    file_id: i64,
    text: String,
    vector: Vec<f32>,
}

#[derive(Default)]
struct Tables {
    interactions: Vec<InteractionRecord>,
    files: Vec<FileSyncEntry>,
    chunks: Vec<StoredChunk>,
}

/// In-memory store for development and tests
#[derive(Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, Tables>> {
        self.tables
            .read()
            .map_err(|_| RagDeskError::PersistenceFailure("memory store lock poisoned".into()))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, Tables>> {
        self.tables
            .write()
            .map_err(|_| RagDeskError::PersistenceFailure("memory store lock poisoned".into()))
    }

    /// Register a source document and return its id
    pub fn add_file(&self, agent_id: i32, file_name: &str, file_url: Option<&str>) -> Result<i64> {
        let mut tables = self.write()?;
        let id = tables.files.len() as i64 + 1;
        tables.files.push(FileSyncEntry {
            id,
            agent_id,
            file_name: file_name.to_string(),
            file_url: file_url.map(str::to_string),
            ignore_file: false,
            created_at: Utc::now(),
        });
        Ok(id)
    }

    /// Index one chunk of a registered file
    pub fn add_chunk(&self, file_id: i64, text: &str, vector: Vec<f32>) -> Result<()> {
        let mut tables = self.write()?;
        if !tables.files.iter().any(|f| f.id == file_id) {
            return Err(RagDeskError::NotFound(format!("file {file_id}")));
        }
        tables.chunks.push(StoredChunk {
            file_id,
            text: text.to_string(),
            vector,
        });
        Ok(())
    }

    /// Stored record by id
    pub fn get(&self, id: i64) -> Result<Option<InteractionRecord>> {
        Ok(self.read()?.interactions.iter().find(|r| r.id == id).cloned())
    }
}

fn cosine_sim(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }
    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let mag_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let mag_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if mag_a < f32::EPSILON || mag_b < f32::EPSILON {
        0.0
    } else {
        dot / (mag_a * mag_b)
    }
}

#[async_trait]
impl InteractionLedger for MemoryStore {
    async fn record(&self, interaction: NewInteraction) -> Result<i64> {
        let mut tables = self.write()?;
        let id = tables.interactions.len() as i64 + 1;
        tables.interactions.push(InteractionRecord {
            id,
            agent_id: interaction.agent_id,
            query: interaction.query,
            response: interaction.response,
            time_to_result_ms: interaction.time_to_result_ms as i64,
            created_at: Utc::now(),
            created_by: interaction.created_by,
            thumbs_up: None,
        });
        Ok(id)
    }

    async fn set_feedback(&self, id: i64, thumbs_up: bool) -> Result<()> {
        let mut tables = self.write()?;
        let record = tables
            .interactions
            .iter_mut()
            .find(|r| r.id == id)
            .ok_or_else(|| RagDeskError::NotFound(format!("interaction {id}")))?;
        record.thumbs_up = Some(thumbs_up);
        Ok(())
    }

    async fn list(&self, agent_id: i32) -> Result<Vec<InteractionRecord>> {
        let mut records: Vec<InteractionRecord> = self
            .read()?
            .interactions
            .iter()
            .filter(|r| r.agent_id == agent_id)
            .cloned()
            .collect();
        records.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        Ok(records)
    }
}

#[async_trait]
impl FileCatalog for MemoryStore {
    async fn list_files(&self, agent_id: i32) -> Result<Vec<FileSyncEntry>> {
        let mut files: Vec<FileSyncEntry> = self
            .read()?
            .files
            .iter()
            .filter(|f| f.agent_id == agent_id)
            .cloned()
            .collect();
        files.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        Ok(files)
    }

    async fn set_ignored(&self, ids: &[i64], ignore: bool) -> Result<Vec<FileIgnoreState>> {
        let mut tables = self.write()?;
        let mut updated = Vec::new();
        for file in tables.files.iter_mut().filter(|f| ids.contains(&f.id)) {
            file.ignore_file = ignore;
            updated.push(FileIgnoreState {
                id: file.id,
                ignore_file: file.ignore_file,
            });
        }
        Ok(updated)
    }
}

#[async_trait]
impl VectorRetriever for MemoryStore {
    async fn retrieve_top_k(&self, vector: &[f32], k: usize) -> Result<Vec<RetrievedChunk>> {
        let tables = self
            .tables
            .read()
            .map_err(|_| RagDeskError::RetrievalFailure("memory store lock poisoned".into()))?;

        let mut scored: Vec<RetrievedChunk> = tables
            .chunks
            .iter()
            .filter_map(|chunk| {
                let file = tables
                    .files
                    .iter()
                    .find(|f| f.id == chunk.file_id && !f.ignore_file)?;
                Some(RetrievedChunk {
                    text: chunk.text.clone(),
                    source_name: Some(file.file_name.clone()),
                    source_url: file.file_url.clone(),
                    similarity_score: cosine_sim(vector, &chunk.vector),
                })
            })
            .collect();

        scored.sort_by(|a, b| b.similarity_score.total_cmp(&a.similarity_score));
        scored.truncate(k);
        Ok(scored)
    }
}
