//! Logging configuration for ragdesk

use std::path::Path;

use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::fmt::{self};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::Registry;

use crate::config::AppConfig;
use crate::Result;

const LOG_FILE_NAME: &str = "ragdesk.log";

/// Initialize logging from configuration, with `verbose` forcing debug level
pub fn init_logging_with_config(config: Option<&AppConfig>, verbose: bool) -> Result<()> {
    let directory = config.map_or("logs", |c| c.logging.directory.as_str());

    // Set up environment filter - use config if available, otherwise default
    let env_filter = if verbose {
        EnvFilter::new("info,ragdesk=debug,tower_http=debug")
    } else if let Some(config) = config {
        let level = &config.logging.level;
        EnvFilter::new(format!("{level},ragdesk={level}"))
    } else {
        // Fallback to environment variable or default
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info,ragdesk=info"))
    };

    install(env_filter, directory)?;

    tracing::info!(
        "Logging initialized - console and file output enabled, files under {}/{}.YYYY-MM-DD",
        directory,
        LOG_FILE_NAME
    );
    Ok(())
}

fn install(env_filter: EnvFilter, directory: &str) -> Result<()> {
    // Create logs directory if it doesn't exist
    let logs_dir = Path::new(directory);
    if !logs_dir.exists() {
        std::fs::create_dir_all(logs_dir)?;
    }

    let file_appender = tracing_appender::rolling::daily(logs_dir, LOG_FILE_NAME);
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let console_layer = fmt::layer()
        .with_target(true)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true)
        .with_span_events(FmtSpan::CLOSE)
        .with_writer(std::io::stderr);

    let file_layer = fmt::layer()
        .with_target(true)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true)
        .with_span_events(FmtSpan::CLOSE)
        .with_writer(non_blocking)
        .with_ansi(false); // No colors in file

    Registry::default()
        .with(env_filter)
        .with(console_layer)
        .with(file_layer)
        .init();

    // The writer thread must outlive every log call in the process
    std::mem::forget(guard);

    Ok(())
}

/// Initialize console-only logging for client commands and tests
pub fn init_simple_logging() {
    let _ = tracing_subscriber::fmt()
        .with_target(true)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_simple_logging_can_be_called_twice() {
        init_simple_logging();
        init_simple_logging();
    }
}
