//! History and configuration display

use std::path::Path;

use crate::cli::client::GatewayClient;
use crate::cli::output::*;
use crate::AppConfig;
use crate::Result;

pub async fn handle_history(server: &str, limit: usize) -> Result<()> {
    let client = GatewayClient::new(server, None)?;
    let records = client.history().await?;
    print_history(&records, limit);
    Ok(())
}

/// Load, validate and print the configuration
pub fn handle_check_config(path: Option<&Path>) -> Result<()> {
    println!("Checking configuration...");

    let loaded = match path {
        Some(path) => AppConfig::from_file(path),
        None => AppConfig::load(),
    };

    match loaded {
        Ok(config) => {
            println!("Configuration loaded successfully.\n");
            print_config_summary(&config);
            Ok(())
        }
        Err(e) => {
            println!("Configuration error: {e}");
            println!("\nTo fix this:");
            println!("  1. Copy config.example.toml to config.toml");
            println!("  2. Fill in the database, LLM and auth settings");
            println!("  3. Run `ragdesk check-config` again");
            Err(e)
        }
    }
}
