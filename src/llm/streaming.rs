//! Streaming response handling

use std::fmt::Display;
use std::pin::Pin;

use futures::Stream;
use futures::StreamExt;
use serde::Deserialize;

use crate::errors::RagDeskError;
use crate::errors::Result;

/// Boxed stream of generated text fragments
pub type TokenStream = Pin<Box<dyn Stream<Item = Result<String>> + Send>>;

/// Streaming response from LLM
///
/// Single consumption pass; not restartable.
pub struct StreamingResponse {
    stream: TokenStream,
}

impl StreamingResponse {
    pub fn new(stream: TokenStream) -> Self {
        Self { stream }
    }

    pub fn from_stream<S>(stream: S) -> Self
    where
        S: Stream<Item = Result<String>> + Send + 'static,
    {
        Self::new(Box::pin(stream))
    }

    /// Next fragment, or `None` once the model signalled the end
    pub async fn next_chunk(&mut self) -> Option<Result<String>> {
        self.stream.next().await
    }

    /// Collect all chunks into a single string
    pub async fn collect_all(mut self) -> Result<String> {
        let mut result = String::new();
        while let Some(chunk) = self.stream.next().await {
            result.push_str(&chunk?);
        }
        Ok(result)
    }
}

/// What one line of a provider's streaming body means
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChunkLine {
    Token(String),
    Skip,
    Done,
}

/// Split a byte stream into newline-terminated lines
///
/// A transport error ends the stream after yielding one `GenerationFailure`.
pub fn split_lines<S, B, E>(inner: S) -> impl Stream<Item = Result<String>> + Send
where
    S: Stream<Item = std::result::Result<B, E>> + Send + 'static,
    B: AsRef<[u8]> + Send + 'static,
    E: Display + Send + 'static,
{
    struct LineState<S> {
        inner: Pin<Box<S>>,
        buffer: Vec<u8>,
        done: bool,
    }

    let state = LineState {
        inner: Box::pin(inner),
        buffer: Vec::new(),
        done: false,
    };

    futures::stream::unfold(state, |mut st| async move {
        loop {
            if let Some(pos) = st.buffer.iter().position(|b| *b == b'\n') {
                let line: Vec<u8> = st.buffer.drain(..=pos).collect();
                let text = String::from_utf8_lossy(&line)
                    .trim_end_matches(|c| c == '\r' || c == '\n')
                    .to_string();
                return Some((Ok(text), st));
            }
            if st.done {
                if st.buffer.is_empty() {
                    return None;
                }
                let rest = std::mem::take(&mut st.buffer);
                return Some((Ok(String::from_utf8_lossy(&rest).into_owned()), st));
            }
            match st.inner.next().await {
                Some(Ok(chunk)) => st.buffer.extend_from_slice(chunk.as_ref()),
                Some(Err(e)) => {
                    st.done = true;
                    st.buffer.clear();
                    return Some((Err(RagDeskError::GenerationFailure(e.to_string())), st));
                }
                None => st.done = true,
            }
        }
    })
}

/// Turn parsed lines into a token stream that ends at the first `Done`
pub fn tokens_from_lines<S>(lines: S, parse: fn(&str) -> Result<ChunkLine>) -> TokenStream
where
    S: Stream<Item = Result<String>> + Send + 'static,
{
    let tokens = lines
        .map(move |line| line.and_then(|l| parse(&l)))
        .take_while(|item| futures::future::ready(!matches!(item, Ok(ChunkLine::Done))))
        .filter_map(|item| {
            futures::future::ready(match item {
                Ok(ChunkLine::Token(text)) => Some(Ok(text)),
                Ok(ChunkLine::Skip | ChunkLine::Done) => None,
                Err(e) => Some(Err(e)),
            })
        });
    Box::pin(tokens)
}

#[derive(Deserialize)]
struct ProviderError {
    message: String,
}

/// Parse one line of an OpenAI-compatible chat completion SSE body
pub fn parse_openai_line(line: &str) -> Result<ChunkLine> {
    #[derive(Deserialize)]
    struct Chunk {
        #[serde(default)]
        choices: Vec<Choice>,
        #[serde(default)]
        error: Option<ProviderError>,
    }

    #[derive(Deserialize)]
    struct Choice {
        #[serde(default)]
        delta: Delta,
    }

    #[derive(Deserialize, Default)]
    struct Delta {
        #[serde(default)]
        content: Option<String>,
    }

    let Some(payload) = line.trim().strip_prefix("data:") else {
        // Blank separators, comments and `event:` lines carry no text
        return Ok(ChunkLine::Skip);
    };
    let payload = payload.trim();
    if payload == "[DONE]" {
        return Ok(ChunkLine::Done);
    }

    let chunk: Chunk = serde_json::from_str(payload)
        .map_err(|e| RagDeskError::GenerationFailure(format!("Malformed stream chunk: {e}")))?;
    if let Some(error) = chunk.error {
        return Err(RagDeskError::GenerationFailure(error.message));
    }

    Ok(chunk
        .choices
        .into_iter()
        .next()
        .and_then(|c| c.delta.content)
        .filter(|content| !content.is_empty())
        .map_or(ChunkLine::Skip, ChunkLine::Token))
}

/// Parse one line of an Ollama `/api/chat` NDJSON body
pub fn parse_ollama_line(line: &str) -> Result<ChunkLine> {
    #[derive(Deserialize)]
    struct Chunk {
        #[serde(default)]
        message: Option<Message>,
        #[serde(default)]
        done: bool,
        #[serde(default)]
        error: Option<String>,
    }

    #[derive(Deserialize)]
    struct Message {
        #[serde(default)]
        content: String,
    }

    let line = line.trim();
    if line.is_empty() {
        return Ok(ChunkLine::Skip);
    }

    let chunk: Chunk = serde_json::from_str(line)
        .map_err(|e| RagDeskError::GenerationFailure(format!("Malformed stream chunk: {e}")))?;
    if let Some(error) = chunk.error {
        return Err(RagDeskError::GenerationFailure(error));
    }

    match chunk.message.map(|m| m.content) {
        Some(content) if !content.is_empty() => Ok(ChunkLine::Token(content)),
        _ if chunk.done => Ok(ChunkLine::Done),
        _ => Ok(ChunkLine::Skip),
    }
}
