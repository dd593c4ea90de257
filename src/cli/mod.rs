//! CLI module for the `ragdesk` binary
//!
//! - Command line argument parsing
//! - Command handlers (handlers/ subdirectory)
//! - A client for a running gateway
//! - Output formatting

pub mod client;
pub mod commands;
pub mod handlers;
pub mod output;

pub use client::*;
pub use commands::*;
pub use handlers::*;
pub use output::*;
