//! API route definitions

use axum::middleware;
use axum::routing::get;
use axum::routing::post;
use axum::Router;

use super::handlers::AppState;
use super::handlers::{
    self,
};
use super::middleware::bearer_auth_middleware;

/// Create the gateway router; only `/query` requires a bearer token
pub fn api_routes(state: AppState) -> Router {
    let protected = Router::new()
        .route("/query", post(handlers::query))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            bearer_auth_middleware,
        ));

    Router::new()
        .merge(protected)
        .route("/feedback", post(handlers::feedback))
        .route("/query-history", get(handlers::query_history))
        .route("/file-sync", get(handlers::list_files))
        .route("/file-sync/ignore", post(handlers::set_ignored))
        .route("/health", get(handlers::health))
        .with_state(state)
}
