pub mod api;
pub mod auth;
pub mod cli;
pub mod config;
pub mod database;
pub mod embeddings;
pub mod errors;
pub mod ledger;
pub mod llm;
pub mod logging;
pub mod models;
pub mod protocol;
pub mod rag;

#[cfg(test)]
mod errors_tests;

pub use config::AppConfig;
pub use errors::*;
