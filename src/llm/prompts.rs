//! Prompt templates for grounded answers

use serde::Serialize;

/// System instruction sent with every question
pub const SYSTEM_PROMPT: &str = "You are a helpful assistant. Answer using only the provided context. \
Format the answer neatly in Markdown, and when a source has a file name and link, \
cite it as a Markdown link to that file.";

/// Chat message in the provider request
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChatMessage {
    pub role: &'static str,
    pub content: String,
}

/// User turn carrying the assembled context and the question
pub fn user_prompt(question: &str, context: &str) -> String {
    format!("Context:\n{context}\n\nQuestion:\n{question}")
}

/// Messages for a single-turn grounded question
pub fn build_messages(question: &str, context: &str) -> Vec<ChatMessage> {
    vec![
        ChatMessage {
            role: "system",
            content: SYSTEM_PROMPT.to_string(),
        },
        ChatMessage {
            role: "user",
            content: user_prompt(question, context),
        },
    ]
}
