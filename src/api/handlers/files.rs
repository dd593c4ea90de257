/// Source document listing and ignore toggles
use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::Json;
use tracing::info;

use super::AppState;
use crate::api::types::ApiError;
use crate::api::types::FilesResponse;
use crate::api::types::IgnoreRequest;
use crate::api::types::IgnoreResponse;
use crate::errors::RagDeskError;

/// `GET /file-sync`
pub async fn list_files(State(state): State<AppState>) -> Result<Json<FilesResponse>, ApiError> {
    let files = state.catalog.list_files(state.agent_id).await?;
    Ok(Json(FilesResponse { files }))
}

/// `POST /file-sync/ignore`
pub async fn set_ignored(
    State(state): State<AppState>,
    payload: Result<Json<IgnoreRequest>, JsonRejection>,
) -> Result<Json<IgnoreResponse>, ApiError> {
    let Json(request) =
        payload.map_err(|e| RagDeskError::InvalidRequest(e.body_text()))?;
    let ignore = request.ignore_file.as_bool("ignoreFile")?;

    info!("POST /file-sync/ignore: {} files, ignore={}", request.ids.len(), ignore);
    let updated = state.catalog.set_ignored(&request.ids, ignore).await?;

    Ok(Json(IgnoreResponse {
        success: true,
        updated,
    }))
}
