use chrono::DateTime;
use chrono::Utc;
use serde::Deserialize;
use serde::Serialize;
use sqlx::FromRow;

/// Attribution used when a request carries no verified identity
pub const SYSTEM_AUTHOR: &str = "system";

/// One completed question/answer exchange
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct InteractionRecord {
    pub id: i64,
    pub agent_id: i32,
    pub query: String,
    pub response: String,
    pub time_to_result_ms: i64,
    pub created_at: DateTime<Utc>,
    pub created_by: String,
    pub thumbs_up: Option<bool>,
}

/// Insert payload for the interaction ledger
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewInteraction {
    pub agent_id: i32,
    pub query: String,
    pub response: String,
    pub time_to_result_ms: u64,
    pub created_by: String,
}

/// A document fragment returned by the vector index
#[derive(Debug, Clone, PartialEq)]
pub struct RetrievedChunk {
    pub text: String,
    pub source_name: Option<String>,
    pub source_url: Option<String>,
    pub similarity_score: f32,
}

impl RetrievedChunk {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            source_name: None,
            source_url: None,
            similarity_score: 0.0,
        }
    }

    #[must_use]
    pub fn with_source(mut self, name: impl Into<String>, url: impl Into<String>) -> Self {
        self.source_name = Some(name.into());
        self.source_url = Some(url.into());
        self
    }

    #[must_use]
    pub const fn with_score(mut self, score: f32) -> Self {
        self.similarity_score = score;
        self
    }
}

/// An indexed source document
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct FileSyncEntry {
    pub id: i64,
    pub agent_id: i32,
    pub file_name: String,
    pub file_url: Option<String>,
    pub ignore_file: bool,
    pub created_at: DateTime<Utc>,
}

/// Result row of a batch ignore toggle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct FileIgnoreState {
    pub id: i64,
    pub ignore_file: bool,
}

/// Verified subject of a bearer credential
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallerIdentity {
    pub subject: String,
    pub display_name: Option<String>,
}

impl CallerIdentity {
    pub fn new(subject: impl Into<String>, display_name: Option<String>) -> Self {
        Self {
            subject: subject.into(),
            display_name,
        }
    }

    /// Name recorded as `createdBy`
    pub fn created_by(caller: Option<&Self>) -> String {
        caller
            .and_then(|c| c.display_name.as_deref())
            .filter(|name| !name.is_empty())
            .unwrap_or(SYSTEM_AUTHOR)
            .to_string()
    }
}
