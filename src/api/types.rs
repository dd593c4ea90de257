//! API request and response types

use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::response::Response;
use axum::Json;
use serde::Deserialize;
use serde::Serialize;

use crate::errors::RagDeskError;
use crate::models::FileIgnoreState;
use crate::models::FileSyncEntry;
use crate::models::InteractionRecord;

/// `POST /query` body
#[derive(Debug, Default, Deserialize)]
pub struct QueryRequest {
    #[serde(default)]
    pub query: Option<String>,
}

/// A `0`/`1` flag; `true`/`false` are accepted too
#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(untagged)]
pub enum BinaryFlag {
    Int(i64),
    Bool(bool),
}

impl BinaryFlag {
    pub fn as_bool(self, field: &str) -> Result<bool, RagDeskError> {
        match self {
            Self::Int(0) | Self::Bool(false) => Ok(false),
            Self::Int(1) | Self::Bool(true) => Ok(true),
            Self::Int(other) => Err(RagDeskError::InvalidRequest(format!(
                "{field} must be 0 or 1, got {other}"
            ))),
        }
    }
}

/// `POST /feedback` body
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedbackRequest {
    pub query_id: i64,
    pub thumbs_up: BinaryFlag,
}

/// `POST /file-sync/ignore` body
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IgnoreRequest {
    pub ids: Vec<i64>,
    pub ignore_file: BinaryFlag,
}

#[derive(Debug, Serialize)]
pub struct SuccessResponse {
    pub success: bool,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HistoryResponse {
    pub history: Vec<InteractionRecord>,
}

#[derive(Debug, Serialize)]
pub struct FilesResponse {
    pub files: Vec<FileSyncEntry>,
}

#[derive(Debug, Serialize)]
pub struct IgnoreResponse {
    pub success: bool,
    pub updated: Vec<FileIgnoreState>,
}

/// Health check response
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

/// Error returned by a handler before any body was streamed
#[derive(Debug)]
pub struct ApiError(pub RagDeskError);

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match &self.0 {
            RagDeskError::MissingInput | RagDeskError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            RagDeskError::AuthFailure(_) => StatusCode::UNAUTHORIZED,
            RagDeskError::NotFound(_) => StatusCode::NOT_FOUND,
            RagDeskError::UpstreamFailure { .. } => StatusCode::BAD_GATEWAY,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<RagDeskError> for ApiError {
    fn from(e: RagDeskError) -> Self {
        Self(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!("Request failed ({}): {}", status, self.0);
        } else {
            tracing::debug!("Request rejected ({}): {}", status, self.0);
        }
        (
            status,
            Json(ErrorResponse {
                error: self.0.to_string(),
            }),
        )
            .into_response()
    }
}
