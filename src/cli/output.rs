//! CLI output formatting utilities

use crate::models::InteractionRecord;
use crate::AppConfig;

/// Truncate at a character boundary, appending `...` when shortened
#[must_use]
pub fn truncate_str(s: &str, max_chars: usize) -> String {
    if s.chars().count() > max_chars {
        let truncated: String = s.chars().take(max_chars).collect();
        format!("{truncated}...")
    } else {
        s.to_string()
    }
}

/// Hide credentials in a connection URL
#[must_use]
pub fn mask_database_url(url: &str) -> String {
    match url::Url::parse(url) {
        Ok(mut parsed) if parsed.password().is_some() => {
            let _ = parsed.set_password(Some("***"));
            parsed.to_string()
        }
        Ok(parsed) => parsed.to_string(),
        Err(_) => "<invalid url>".to_string(),
    }
}

fn feedback_mark(thumbs_up: Option<bool>) -> &'static str {
    match thumbs_up {
        Some(true) => "+1",
        Some(false) => "-1",
        None => "-",
    }
}

/// Print interaction history as a table
pub fn print_history(records: &[InteractionRecord], limit: usize) {
    if records.is_empty() {
        println!("No interactions recorded yet.");
        return;
    }

    println!(
        "{:<8} {:<17} {:<16} {:>8} {:<4} {:<40}",
        "ID", "Created", "By", "ms", "Fb", "Query"
    );
    println!("{:-<8} {:-<17} {:-<16} {:->8} {:-<4} {:-<40}", "", "", "", "", "", "");
    for record in records.iter().take(limit) {
        println!(
            "{:<8} {:<17} {:<16} {:>8} {:<4} {:<40}",
            record.id,
            record.created_at.format("%Y-%m-%d %H:%M"),
            truncate_str(&record.created_by, 16),
            record.time_to_result_ms,
            feedback_mark(record.thumbs_up),
            truncate_str(&record.query, 40)
        );
    }
    if records.len() > limit {
        println!("... {} more", records.len() - limit);
    }
}

/// Print the effective configuration with secrets masked
pub fn print_config_summary(config: &AppConfig) {
    println!("Server:");
    println!("  Listen: {}:{}", config.server.host, config.server.port);
    println!("  CORS: {}", config.server.enable_cors);
    println!("  Max concurrent requests: {}", config.server.max_concurrent_requests);
    println!("Database:");
    println!("  URL: {}", mask_database_url(config.database_url()));
    println!("  Connections: {}-{}", config.min_connections(), config.max_connections());
    println!("  Connection timeout: {}s", config.connection_timeout());
    println!("  Auto-init schema: {}", config.database.auto_init_schema);
    println!("Embeddings:");
    println!("  Model: {} ({} dims)", config.embedding_model(), config.embedding_dimension());
    println!("  Endpoint: {}", config.embedding_endpoint());
    println!("LLM:");
    println!("  Model: {} (temperature {})", config.llm_model(), config.llm.temperature);
    println!("  Endpoint: {}", config.llm_endpoint());
    println!("Retrieval:");
    println!("  Backend: {:?}, top_k {}", config.retrieval.backend, config.retrieval.top_k);
    if let Some(secs) = config.retrieval.upstream_timeout_secs {
        println!("  Upstream timeout: {secs}s");
    }
    println!("Auth: {:?}", config.auth.mode);
    println!("Ledger agent id: {}", config.agent_id());
    println!(
        "Protocol: {:?} framing, channel capacity {}",
        config.protocol.format, config.protocol.channel_capacity
    );
}
