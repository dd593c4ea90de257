//! HTTP surface of the gateway

pub mod handlers;
pub mod middleware;
pub mod routes;
pub mod server;
pub mod types;

pub use handlers::AppState;
pub use server::build_app;
pub use server::serve_api;
pub use server::ServeOptions;
