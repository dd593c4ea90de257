use super::Database;
use crate::Result;

impl Database {
    /// Create the tables the gateway reads and writes, if missing
    ///
    /// `dimension` sizes the `document_chunks.embedding` column and must match
    /// the embedding model.
    pub async fn init_schema(&self, dimension: usize) -> Result<()> {
        sqlx::query("CREATE EXTENSION IF NOT EXISTS vector")
            .execute(&self.pool)
            .await?;

        sqlx::query(
            r"
            CREATE TABLE IF NOT EXISTS query_history (
                id BIGSERIAL PRIMARY KEY,
                agent_id INTEGER NOT NULL,
                query TEXT NOT NULL,
                response TEXT NOT NULL,
                time_to_result_ms BIGINT NOT NULL,
                created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
                created_by TEXT NOT NULL,
                thumbs_up BOOLEAN
            )
            ",
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r"
            CREATE TABLE IF NOT EXISTS file_sync (
                id BIGSERIAL PRIMARY KEY,
                agent_id INTEGER NOT NULL,
                file_name TEXT NOT NULL,
                file_url TEXT,
                ignore_file BOOLEAN NOT NULL DEFAULT FALSE,
                created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
            )
            ",
        )
        .execute(&self.pool)
        .await?;

        // Dimension is a type modifier, it cannot be bound
        sqlx::query(&format!(
            r"
            CREATE TABLE IF NOT EXISTS document_chunks (
                id BIGSERIAL PRIMARY KEY,
                file_id BIGINT NOT NULL REFERENCES file_sync(id) ON DELETE CASCADE,
                chunk TEXT NOT NULL,
                embedding VECTOR({dimension}) NOT NULL
            )
            "
        ))
        .execute(&self.pool)
        .await?;

        self.create_indexes().await?;
        tracing::info!("Database schema ready (embedding dimension {})", dimension);
        Ok(())
    }

    async fn create_indexes(&self) -> Result<()> {
        sqlx::query("CREATE INDEX IF NOT EXISTS idx_query_history_agent_created ON query_history(agent_id, created_at DESC, id DESC)")
            .execute(&self.pool)
            .await?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_file_sync_agent ON file_sync(agent_id)")
            .execute(&self.pool)
            .await?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_document_chunks_file ON document_chunks(file_id)")
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    /// Check that the tables exist without touching them
    pub async fn is_schema_initialized(&self) -> Result<bool> {
        for table_name in ["query_history", "file_sync", "document_chunks"] {
            let exists = sqlx::query_scalar::<_, bool>(
                r"
                SELECT EXISTS (
                    SELECT FROM information_schema.tables
                    WHERE table_schema = 'public'
                    AND table_name = $1
                )
                ",
            )
            .bind(table_name)
            .fetch_one(&self.pool)
            .await?;

            if !exists {
                tracing::debug!("Missing required table: {}", table_name);
                return Ok(false);
            }
        }
        Ok(true)
    }
}
