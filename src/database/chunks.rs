use pgvector::Vector;

use super::Database;
use crate::models::RetrievedChunk;
use crate::Result;

#[derive(sqlx::FromRow)]
struct ChunkRow {
    chunk: String,
    file_name: String,
    file_url: Option<String>,
    similarity: f32,
}

impl Database {
    /// Nearest chunks by cosine distance, skipping ignored files
    pub async fn search_chunks(
        &self,
        query_embedding: &[f32],
        agent_id: i32,
        limit: i64,
    ) -> Result<Vec<RetrievedChunk>> {
        let rows = sqlx::query_as::<_, ChunkRow>(
            r"
            SELECT
                dc.chunk,
                fs.file_name,
                fs.file_url,
                (1 - (dc.embedding <=> $1))::REAL AS similarity
            FROM document_chunks dc
            INNER JOIN file_sync fs ON dc.file_id = fs.id
            WHERE fs.agent_id = $2 AND NOT fs.ignore_file
            ORDER BY dc.embedding <=> $1
            LIMIT $3
            ",
        )
        .bind(Vector::from(query_embedding.to_vec()))
        .bind(agent_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|r| RetrievedChunk {
                text: r.chunk,
                source_name: Some(r.file_name),
                source_url: r.file_url,
                similarity_score: r.similarity,
            })
            .collect())
    }

    /// Register a source document; returns its id
    pub async fn insert_file(
        &self,
        agent_id: i32,
        file_name: &str,
        file_url: Option<&str>,
    ) -> Result<i64> {
        let id = sqlx::query_scalar::<_, i64>(
            "INSERT INTO file_sync (agent_id, file_name, file_url) VALUES ($1, $2, $3) RETURNING id",
        )
        .bind(agent_id)
        .bind(file_name)
        .bind(file_url)
        .fetch_one(&self.pool)
        .await?;
        Ok(id)
    }

    /// Store one embedded chunk of a registered file
    pub async fn insert_chunk(&self, file_id: i64, text: &str, embedding: Vec<f32>) -> Result<()> {
        sqlx::query("INSERT INTO document_chunks (file_id, chunk, embedding) VALUES ($1, $2, $3)")
            .bind(file_id)
            .bind(text)
            .bind(Vector::from(embedding))
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}
