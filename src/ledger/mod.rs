//! Interaction ledger and file catalog interfaces
//!
//! The ledger is the only writer of [`InteractionRecord`]s. The gateway logs
//! one record per answered question and later attaches thumbs-up/down
//! feedback to it. [`Database`](crate::database::Database) is the PostgreSQL
//! implementation; [`MemoryStore`] keeps everything in process.

pub mod memory;

use async_trait::async_trait;

pub use memory::MemoryStore;

use crate::errors::Result;
use crate::models::FileIgnoreState;
use crate::models::FileSyncEntry;
use crate::models::InteractionRecord;
use crate::models::NewInteraction;

#[async_trait]
pub trait InteractionLedger: Send + Sync {
    /// Store one interaction and return its id; fails with `PersistenceFailure`
    async fn record(&self, interaction: NewInteraction) -> Result<i64>;

    /// Set the feedback flag; `NotFound` for an unknown id
    async fn set_feedback(&self, id: i64, thumbs_up: bool) -> Result<()>;

    /// Interactions of one agent, newest first
    async fn list(&self, agent_id: i32) -> Result<Vec<InteractionRecord>>;
}

/// Indexed source documents and their ignore flags
#[async_trait]
pub trait FileCatalog: Send + Sync {
    /// Files of one agent, newest first
    async fn list_files(&self, agent_id: i32) -> Result<Vec<FileSyncEntry>>;

    /// Set `ignore_file` on every listed id and return the resulting rows
    async fn set_ignored(&self, ids: &[i64], ignore: bool) -> Result<Vec<FileIgnoreState>>;
}
