//! CLI command handlers
//!
//! - serve: the HTTP gateway
//! - ask: stream one answer from a running gateway
//! - info: history and configuration display

pub mod ask;
pub mod info;
pub mod serve;

pub use ask::*;
pub use info::*;
pub use serve::*;
