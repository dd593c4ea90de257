/// Thumbs-up/down on a recorded interaction
use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::Json;
use tracing::info;

use super::AppState;
use crate::api::types::ApiError;
use crate::api::types::FeedbackRequest;
use crate::api::types::SuccessResponse;
use crate::errors::RagDeskError;

/// `POST /feedback`
pub async fn feedback(
    State(state): State<AppState>,
    payload: Result<Json<FeedbackRequest>, JsonRejection>,
) -> Result<Json<SuccessResponse>, ApiError> {
    let Json(request) =
        payload.map_err(|e| RagDeskError::InvalidRequest(e.body_text()))?;
    let thumbs_up = request.thumbs_up.as_bool("thumbsUp")?;

    info!("POST /feedback: query {} thumbs_up={}", request.query_id, thumbs_up);
    state.ledger.set_feedback(request.query_id, thumbs_up).await?;

    Ok(Json(SuccessResponse { success: true }))
}
