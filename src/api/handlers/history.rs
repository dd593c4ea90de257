use axum::extract::State;
use axum::Json;

use super::AppState;
use crate::api::types::ApiError;
use crate::api::types::HistoryResponse;

/// `GET /query-history`, newest first
pub async fn query_history(
    State(state): State<AppState>,
) -> Result<Json<HistoryResponse>, ApiError> {
    let history = state.ledger.list(state.agent_id).await?;
    Ok(Json(HistoryResponse { history }))
}
