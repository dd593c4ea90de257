//! Context assembly from retrieved chunks
//!
//! The block layout is what the completion prompt expects; changing it
//! changes how the model cites sources.

use crate::models::RetrievedChunk;

/// Separator between two attributed blocks
pub const BLOCK_SEPARATOR: &str = "\n\n";

/// Assembler for creating context from retrieved chunks
#[derive(Debug, Clone, Copy, Default)]
pub struct ContextAssembler;

impl ContextAssembler {
    /// Join chunks in retriever order, one attributed block each
    #[must_use]
    pub fn assemble(&self, chunks: &[RetrievedChunk]) -> String {
        chunks
            .iter()
            .map(|chunk| self.format_chunk(chunk))
            .collect::<Vec<_>>()
            .join(BLOCK_SEPARATOR)
    }

    /// Format a single chunk for context
    #[must_use]
    pub fn format_chunk(&self, chunk: &RetrievedChunk) -> String {
        let name = chunk.source_name.as_deref().filter(|s| !s.is_empty());
        let url = chunk.source_url.as_deref().filter(|s| !s.is_empty());

        match (name, url) {
            (Some(name), Some(url)) => format!("Source: [{name}]({url})\n{}", chunk.text),
            (Some(source), None) | (None, Some(source)) => {
                format!("Source: {source}\n{}", chunk.text)
            }
            (None, None) => chunk.text.clone(),
        }
    }
}
