//! HTTP server implementation

use axum::Router;
use tower::limit::ConcurrencyLimitLayer;
use tower_http::cors::Any;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::api::handlers::AppState;
use crate::api::routes;
use crate::config::AppConfig;
use crate::Result;

/// Options resolved from CLI flags over configuration
#[derive(Debug, Clone)]
pub struct ServeOptions {
    pub host: String,
    pub port: u16,
    pub enable_cors: bool,
    pub memory: bool,
}

impl ServeOptions {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            host: config.server.host.clone(),
            port: config.server.port,
            enable_cors: config.server.enable_cors,
            memory: false,
        }
    }
}

/// Router with the middleware stack applied
///
/// Responses are never compressed: a compressing layer would buffer the
/// event stream.
pub fn build_app(state: AppState, enable_cors: bool, max_concurrent_requests: usize) -> Router {
    let mut app = routes::api_routes(state)
        .layer(ConcurrencyLimitLayer::new(max_concurrent_requests.max(1)))
        .layer(TraceLayer::new_for_http());

    if enable_cors {
        info!("CORS enabled");
        let cors = CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any);
        app = app.layer(cors);
    }
    app
}

/// Start the API server
pub async fn serve_api(config: &AppConfig, options: ServeOptions) -> Result<()> {
    info!("Starting ragdesk gateway...");

    let state = AppState::build(config, options.memory).await?;
    let app = build_app(
        state,
        options.enable_cors,
        config.server.max_concurrent_requests,
    );

    let addr = format!("{}:{}", options.host, options.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    info!("Gateway listening on http://{}", addr);
    info!("Available endpoints:");
    info!("  POST /query             - Streamed answer (bearer token)");
    info!("  POST /feedback          - Thumbs up/down");
    info!("  GET  /query-history     - Recorded interactions");
    info!("  GET  /file-sync         - Indexed source files");
    info!("  POST /file-sync/ignore  - Exclude files from retrieval");
    info!("  GET  /health            - Health check");

    axum::serve(listener, app).await?;

    Ok(())
}
