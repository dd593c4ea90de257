use axum::body::Body;
use axum::extract::State;
use axum::http::header::AUTHORIZATION;
use axum::http::Request;
use axum::middleware::Next;
use axum::response::Response;

use crate::api::handlers::AppState;
use crate::api::types::ApiError;
use crate::auth::bearer_token;
use crate::errors::RagDeskError;

/// Bearer credential check
///
/// On success the verified [`CallerIdentity`](crate::models::CallerIdentity)
/// is added to the request extensions. With auth disabled the request passes
/// through without one.
pub async fn bearer_auth_middleware(
    State(state): State<AppState>,
    mut request: Request<Body>,
    next: Next,
) -> Result<Response, ApiError> {
    let Some(verifier) = state.verifier.as_ref() else {
        return Ok(next.run(request).await);
    };

    let token = request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(bearer_token)
        .ok_or_else(|| RagDeskError::AuthFailure("missing bearer token".to_string()))?;

    let identity = verifier.verify(token).await?;
    tracing::debug!("Authenticated caller {}", identity.subject);
    request.extensions_mut().insert(identity);
    Ok(next.run(request).await)
}
