//! Ask command handler

use std::io::Write;

use crate::cli::client::GatewayClient;
use crate::AppConfig;
use crate::Result;

pub async fn handle_ask(
    config: &AppConfig,
    server: &str,
    question: &str,
    token: Option<String>,
) -> Result<()> {
    let client = GatewayClient::new(server, token)?;

    let summary = client
        .ask(question, config.protocol.format, |token| {
            print!("{token}");
            std::io::stdout().flush().ok();
        })
        .await?;

    println!();
    println!();
    match summary.query_id {
        Some(id) => println!("Query id: {id}"),
        None => println!("Query id: (not recorded)"),
    }
    if let Some(ms) = summary.latency_ms {
        println!("Time to result: {ms} ms");
    }
    Ok(())
}
