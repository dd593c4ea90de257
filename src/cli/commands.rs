//! CLI command definitions and argument parsing

use std::path::PathBuf;

use clap::Parser;
use clap::Subcommand;

/// Default address of a locally running gateway
pub const DEFAULT_SERVER: &str = "http://127.0.0.1:5173";

#[derive(Parser)]
#[command(name = "ragdesk")]
#[command(about = "Retrieval-augmented chat gateway with streamed answers")]
#[command(version)]
pub struct Cli {
    /// Enable verbose debug logging (default: info level)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Configuration file (default: config.toml, then config.example.toml)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start the HTTP gateway
    Serve {
        /// Host to bind to (overrides server.host)
        #[arg(long)]
        host: Option<String>,
        /// Port to bind to (overrides server.port)
        #[arg(short, long)]
        port: Option<u16>,
        /// Enable permissive CORS
        #[arg(long)]
        cors: bool,
        /// Keep ledger and index in memory instead of PostgreSQL
        #[arg(long)]
        memory: bool,
    },
    /// Ask a running gateway a question and stream the answer
    Ask {
        /// The question
        question: String,
        /// Gateway base URL
        #[arg(short, long, default_value = DEFAULT_SERVER)]
        server: String,
        /// Bearer token sent with the query
        #[arg(short, long)]
        token: Option<String>,
    },
    /// Show recorded interactions, newest first
    History {
        /// Gateway base URL
        #[arg(short, long, default_value = DEFAULT_SERVER)]
        server: String,
        /// Maximum number of records to show
        #[arg(short, long, default_value = "20")]
        limit: usize,
    },
    /// Load and validate the configuration
    CheckConfig,
}
