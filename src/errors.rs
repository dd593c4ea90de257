use thiserror::Error;

#[derive(Error, Debug)]
pub enum RagDeskError {
    #[error("Missing \"query\" in request body")]
    MissingInput,

    #[error("Authentication failed: {0}")]
    AuthFailure(String),

    #[error("Upstream {phase} failed: {message}")]
    UpstreamFailure { phase: &'static str, message: String },

    #[error("Embedding error: {0}")]
    EmbeddingFailure(String),

    #[error("Retrieval error: {0}")]
    RetrievalFailure(String),

    #[error("Generation error: {0}")]
    GenerationFailure(String),

    #[error("Persistence error: {0}")]
    PersistenceFailure(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("HTTP error: {0}")]
    HttpError(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("TOML parsing error: {0}")]
    TomlParsing(#[from] toml::de::Error),

    #[error("Config loading error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl RagDeskError {
    /// Wrap a collaborator failure that happened before the response stream opened.
    pub fn upstream(phase: &'static str, source: &Self) -> Self {
        Self::UpstreamFailure {
            phase,
            message: source.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, RagDeskError>;
