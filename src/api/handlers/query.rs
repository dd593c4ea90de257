/// Streamed question answering
use axum::body::Body;
use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::header;
use axum::response::Response;
use axum::Extension;
use axum::Json;
use futures::StreamExt;
use tokio_stream::wrappers::ReceiverStream;

use super::AppState;
use crate::api::types::ApiError;
use crate::api::types::QueryRequest;
use crate::errors::RagDeskError;
use crate::models::CallerIdentity;
use crate::protocol;
use crate::protocol::EVENT_STREAM_CONTENT_TYPE;

/// `POST /query`
///
/// Failures up to and including retrieval are plain JSON errors. Once the
/// event stream is open, failures arrive in-band.
pub async fn query(
    State(state): State<AppState>,
    caller: Option<Extension<CallerIdentity>>,
    payload: Result<Json<QueryRequest>, JsonRejection>,
) -> Result<Response, ApiError> {
    let Json(request) =
        payload.map_err(|e| RagDeskError::InvalidRequest(e.body_text()))?;
    let question = request.query.unwrap_or_default();
    let caller = caller.map(|Extension(identity)| identity);

    let (events, _task) = state
        .orchestrator
        .handle(&question, caller, state.channel_capacity)
        .await?;

    let format = state.wire_format;
    let body = ReceiverStream::new(events).map(move |event| protocol::encode(format, &event));

    Response::builder()
        .header(header::CONTENT_TYPE, EVENT_STREAM_CONTENT_TYPE)
        .header(header::CACHE_CONTROL, "no-cache")
        .header(header::CONNECTION, "keep-alive")
        .body(Body::from_stream(body))
        .map_err(|e| ApiError(RagDeskError::HttpError(e.to_string())))
}
