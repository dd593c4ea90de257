use clap::Parser;
use ragdesk::cli::handle_ask;
use ragdesk::cli::handle_check_config;
use ragdesk::cli::handle_history;
use ragdesk::cli::handle_serve;
use ragdesk::cli::Cli;
use ragdesk::cli::Commands;
use ragdesk::config::AppConfig;
use ragdesk::Result;
use tracing::info;

fn load_config(cli: &Cli) -> Result<AppConfig> {
    match &cli.config {
        Some(path) => AppConfig::from_file(path),
        None => AppConfig::load(),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    if let Commands::CheckConfig = cli.command {
        ragdesk::logging::init_simple_logging();
        return handle_check_config(cli.config.as_deref());
    }

    let config = load_config(&cli)?;

    match &cli.command {
        Commands::Serve {
            host,
            port,
            cors,
            memory,
        } => {
            ragdesk::logging::init_logging_with_config(Some(&config), cli.verbose)?;
            info!("Configuration loaded successfully");
            handle_serve(&config, host.clone(), *port, *cors, *memory).await?;
        }
        Commands::Ask {
            question,
            server,
            token,
        } => {
            ragdesk::logging::init_simple_logging();
            handle_ask(&config, server, question, token.clone()).await?;
        }
        Commands::History { server, limit } => {
            ragdesk::logging::init_simple_logging();
            handle_history(server, *limit).await?;
        }
        Commands::CheckConfig => {}
    }

    Ok(())
}
