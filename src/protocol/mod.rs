//! In-band event protocol for streamed answers
//!
//! A query response is a `text/event-stream` body carrying a sequence of
//! [`StreamEvent`]s: answer tokens in generation order, then the ledger id and
//! the measured latency, then exactly one terminal event ([`StreamEvent::Done`]
//! on success, [`StreamEvent::Error`] on failure).
//!
//! Two framings are supported:
//! - [`WireFormat::Json`]: one SSE frame per event, the `data:` line holding a
//!   JSON object tagged by `type`.
//! - [`WireFormat::Legacy`]: bracketed text markers with no frame separators,
//!   kept for the first browser client.
//!
//! Server and client must agree on the framing; there is no negotiation.

pub mod json;
pub mod legacy;

use serde::Deserialize;
use serde::Serialize;

pub use crate::config::WireFormat;
use crate::errors::Result;

/// Content type of every streamed query response
pub const EVENT_STREAM_CONTENT_TYPE: &str = "text/event-stream";

/// One unit of the streamed response
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StreamEvent {
    /// Raw answer text, appended verbatim by the client
    Token { text: String },
    /// Ledger id of the interaction; `None` when logging failed
    QueryId { id: Option<i64> },
    /// Milliseconds from request receipt to completion
    Latency { ms: u64 },
    /// Human-readable failure; terminal
    Error { message: String },
    /// End of meaningful content; terminal
    Done,
}

impl StreamEvent {
    pub fn token(text: impl Into<String>) -> Self {
        Self::Token { text: text.into() }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::Error {
            message: message.into(),
        }
    }

    /// Whether nothing may follow this event
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::Done | Self::Error { .. })
    }
}

/// Encode one event in the given framing
pub fn encode(format: WireFormat, event: &StreamEvent) -> Result<String> {
    match format {
        WireFormat::Json => json::encode(event),
        WireFormat::Legacy => Ok(legacy::encode(event)),
    }
}

/// Incremental client-side decoder
///
/// Feed raw body chunks as they arrive; chunk boundaries may fall anywhere,
/// including inside a multi-byte character. Everything after the first
/// terminal event is discarded.
pub struct StreamDecoder {
    inner: DecoderKind,
    finished: bool,
}

enum DecoderKind {
    Json(json::JsonDecoder),
    Legacy(legacy::LegacyDecoder),
}

impl StreamDecoder {
    pub fn new(format: WireFormat) -> Self {
        let inner = match format {
            WireFormat::Json => DecoderKind::Json(json::JsonDecoder::default()),
            WireFormat::Legacy => DecoderKind::Legacy(legacy::LegacyDecoder::default()),
        };
        Self {
            inner,
            finished: false,
        }
    }

    /// Decode every event completed by `chunk`
    pub fn feed(&mut self, chunk: &[u8]) -> Result<Vec<StreamEvent>> {
        if self.finished {
            return Ok(Vec::new());
        }
        let events = match &mut self.inner {
            DecoderKind::Json(decoder) => decoder.feed(chunk)?,
            DecoderKind::Legacy(decoder) => decoder.feed(chunk),
        };
        Ok(self.cut_at_terminal(events))
    }

    /// Flush whatever is buffered once the body has ended
    pub fn finish(&mut self) -> Result<Vec<StreamEvent>> {
        if self.finished {
            return Ok(Vec::new());
        }
        let events = match &mut self.inner {
            DecoderKind::Json(decoder) => decoder.finish()?,
            DecoderKind::Legacy(decoder) => decoder.finish(),
        };
        Ok(self.cut_at_terminal(events))
    }

    /// Whether a terminal event has been decoded
    pub const fn is_finished(&self) -> bool {
        self.finished
    }

    fn cut_at_terminal(&mut self, mut events: Vec<StreamEvent>) -> Vec<StreamEvent> {
        if let Some(pos) = events.iter().position(StreamEvent::is_terminal) {
            events.truncate(pos + 1);
            self.finished = true;
        }
        events
    }
}

/// Split off the longest valid UTF-8 prefix of `pending`, keeping an
/// incomplete trailing character for the next chunk.
pub(crate) fn take_utf8(pending: &mut Vec<u8>) -> String {
    let valid_up_to = match std::str::from_utf8(pending) {
        Ok(_) => pending.len(),
        Err(e) if e.error_len().is_none() => e.valid_up_to(),
        // Invalid bytes in the middle: decode lossily rather than stall
        Err(_) => pending.len(),
    };
    let rest = pending.split_off(valid_up_to);
    let text = String::from_utf8_lossy(pending).into_owned();
    *pending = rest;
    text
}
