//! API server handler

use crate::api::serve_api;
use crate::api::ServeOptions;
use crate::AppConfig;
use crate::Result;

pub async fn handle_serve(
    config: &AppConfig,
    host: Option<String>,
    port: Option<u16>,
    cors: bool,
    memory: bool,
) -> Result<()> {
    // CLI flags take priority over config
    let mut options = ServeOptions::from_config(config);
    if let Some(host) = host {
        options.host = host;
    }
    if let Some(port) = port {
        options.port = port;
    }
    options.enable_cors |= cors;
    options.memory = memory;

    println!("Starting ragdesk gateway");
    println!("  Host: {}", options.host);
    println!("  Port: {}", options.port);
    println!("  CORS: {}", if options.enable_cors { "Enabled" } else { "Disabled" });
    println!(
        "  Storage: {}",
        if options.memory { "in-memory" } else { "PostgreSQL" }
    );

    serve_api(config, options).await
}
