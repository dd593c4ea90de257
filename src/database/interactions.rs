use async_trait::async_trait;

use super::Database;
use crate::errors::RagDeskError;
use crate::ledger::InteractionLedger;
use crate::models::InteractionRecord;
use crate::models::NewInteraction;
use crate::Result;

#[async_trait]
impl InteractionLedger for Database {
    async fn record(&self, interaction: NewInteraction) -> Result<i64> {
        let id = sqlx::query_scalar::<_, i64>(
            r"
            INSERT INTO query_history (agent_id, query, response, time_to_result_ms, created_by)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id
            ",
        )
        .bind(interaction.agent_id)
        .bind(&interaction.query)
        .bind(&interaction.response)
        .bind(interaction.time_to_result_ms as i64)
        .bind(&interaction.created_by)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| RagDeskError::PersistenceFailure(e.to_string()))?;

        tracing::debug!("Recorded interaction {} for agent {}", id, interaction.agent_id);
        Ok(id)
    }

    async fn set_feedback(&self, id: i64, thumbs_up: bool) -> Result<()> {
        let result = sqlx::query("UPDATE query_history SET thumbs_up = $1 WHERE id = $2")
            .bind(thumbs_up)
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| RagDeskError::PersistenceFailure(e.to_string()))?;

        if result.rows_affected() == 0 {
            return Err(RagDeskError::NotFound(format!("interaction {id}")));
        }
        Ok(())
    }

    async fn list(&self, agent_id: i32) -> Result<Vec<InteractionRecord>> {
        let records = sqlx::query_as::<_, InteractionRecord>(
            r"
            SELECT id, agent_id, query, response, time_to_result_ms, created_at, created_by, thumbs_up
            FROM query_history
            WHERE agent_id = $1
            ORDER BY created_at DESC, id DESC
            ",
        )
        .bind(agent_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| RagDeskError::PersistenceFailure(e.to_string()))?;

        Ok(records)
    }
}
