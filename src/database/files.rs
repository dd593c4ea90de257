use async_trait::async_trait;

use super::Database;
use crate::errors::RagDeskError;
use crate::ledger::FileCatalog;
use crate::models::FileIgnoreState;
use crate::models::FileSyncEntry;
use crate::Result;

#[async_trait]
impl FileCatalog for Database {
    async fn list_files(&self, agent_id: i32) -> Result<Vec<FileSyncEntry>> {
        let files = sqlx::query_as::<_, FileSyncEntry>(
            r"
            SELECT id, agent_id, file_name, file_url, ignore_file, created_at
            FROM file_sync
            WHERE agent_id = $1
            ORDER BY created_at DESC, id DESC
            ",
        )
        .bind(agent_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| RagDeskError::PersistenceFailure(e.to_string()))?;

        Ok(files)
    }

    async fn set_ignored(&self, ids: &[i64], ignore: bool) -> Result<Vec<FileIgnoreState>> {
        let updated = sqlx::query_as::<_, (i64, bool)>(
            r"
            UPDATE file_sync
            SET ignore_file = $1
            WHERE id = ANY($2)
            RETURNING id, ignore_file
            ",
        )
        .bind(ignore)
        .bind(ids)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| RagDeskError::PersistenceFailure(e.to_string()))?;

        tracing::info!("Set ignore_file={} on {} of {} files", ignore, updated.len(), ids.len());
        Ok(updated
            .into_iter()
            .map(|(id, ignore_file)| FileIgnoreState { id, ignore_file })
            .collect())
    }
}
