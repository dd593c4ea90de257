//! Bracket-marker framing used by the first browser client
//!
//! Every unit is `data: ` followed by a payload, with no separator between
//! units. Payloads are either answer text or one of the markers below. Answer
//! text that itself contains `data: ` cannot be represented; the JSON framing
//! exists for that reason.

use super::take_utf8;
use super::StreamEvent;

pub const MARKER: &str = "data: ";
pub const DONE_TAG: &str = "[DONE]";
pub const QUERY_ID_TAG: &str = "[QUERYID]";
pub const LATENCY_TAG: &str = "[TTR]";
pub const ERROR_TAG: &str = "[ERROR]";
pub const SEPARATOR: &str = " - ";

/// Encode one event as a legacy unit
pub fn encode(event: &StreamEvent) -> String {
    match event {
        StreamEvent::Token { text } => format!("{MARKER}{text}"),
        StreamEvent::QueryId { id: Some(id) } => format!("{MARKER}{QUERY_ID_TAG}{SEPARATOR}{id}"),
        StreamEvent::QueryId { id: None } => format!("{MARKER}{QUERY_ID_TAG}{SEPARATOR}"),
        StreamEvent::Latency { ms } => format!("{MARKER}{LATENCY_TAG}{SEPARATOR}{ms}"),
        StreamEvent::Error { message } => format!("{MARKER}{ERROR_TAG} {message}\n\n"),
        StreamEvent::Done => format!("{MARKER}{DONE_TAG}"),
    }
}

/// Classify one payload found between two markers
pub fn decode_payload(payload: &str) -> Option<StreamEvent> {
    if payload.is_empty() {
        return None;
    }
    if payload == DONE_TAG {
        return Some(StreamEvent::Done);
    }
    if let Some(rest) = payload.strip_prefix(QUERY_ID_TAG) {
        let id = tag_value(rest).and_then(|v| v.parse::<i64>().ok());
        return Some(StreamEvent::QueryId { id });
    }
    if let Some(rest) = payload.strip_prefix(LATENCY_TAG) {
        return tag_value(rest)
            .and_then(|v| v.parse::<u64>().ok())
            .map(|ms| StreamEvent::Latency { ms });
    }
    if let Some(rest) = payload.strip_prefix(ERROR_TAG) {
        return Some(StreamEvent::error(rest.trim()));
    }
    // The model sometimes opens with a lone `[` right at a chunk boundary
    if payload == "[" {
        return Some(StreamEvent::token("\n["));
    }
    Some(StreamEvent::token(payload))
}

fn tag_value(rest: &str) -> Option<&str> {
    rest.strip_prefix(SEPARATOR.trim_end())
        .map(str::trim)
        .filter(|v| !v.is_empty())
}

/// Incremental legacy decoder
///
/// A payload is only known to be complete once the next marker arrives, so
/// the final payload is released by [`LegacyDecoder::finish`].
#[derive(Default)]
pub struct LegacyDecoder {
    pending: Vec<u8>,
    buffer: String,
    started: bool,
}

impl LegacyDecoder {
    pub fn feed(&mut self, chunk: &[u8]) -> Vec<StreamEvent> {
        self.pending.extend_from_slice(chunk);
        let text = take_utf8(&mut self.pending);
        self.buffer.push_str(&text);

        let mut events = Vec::new();
        while let Some(pos) = self.buffer.find(MARKER) {
            let payload = self.buffer[..pos].to_string();
            self.buffer.drain(..pos + MARKER.len());
            if self.started {
                events.extend(decode_payload(&payload));
            }
            self.started = true;
        }
        events
    }

    pub fn finish(&mut self) -> Vec<StreamEvent> {
        let payload = std::mem::take(&mut self.buffer);
        if !self.started {
            return Vec::new();
        }
        decode_payload(&payload).into_iter().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_markers() {
        assert_eq!(encode(&StreamEvent::token("Hi ")), "data: Hi ");
        assert_eq!(
            encode(&StreamEvent::QueryId { id: Some(12) }),
            "data: [QUERYID] - 12"
        );
        assert_eq!(encode(&StreamEvent::QueryId { id: None }), "data: [QUERYID] - ");
        assert_eq!(encode(&StreamEvent::Latency { ms: 950 }), "data: [TTR] - 950");
        assert_eq!(encode(&StreamEvent::error("boom")), "data: [ERROR] boom\n\n");
        assert_eq!(encode(&StreamEvent::Done), "data: [DONE]");
    }

    #[test]
    fn test_decode_payloads() {
        assert_eq!(decode_payload("[DONE]"), Some(StreamEvent::Done));
        assert_eq!(
            decode_payload("[QUERYID] - 12"),
            Some(StreamEvent::QueryId { id: Some(12) })
        );
        assert_eq!(
            decode_payload("[QUERYID] - "),
            Some(StreamEvent::QueryId { id: None })
        );
        assert_eq!(
            decode_payload("[TTR] - 950"),
            Some(StreamEvent::Latency { ms: 950 })
        );
        assert_eq!(
            decode_payload("[ERROR] upstream closed\n\n"),
            Some(StreamEvent::error("upstream closed"))
        );
        assert_eq!(decode_payload(""), None);
    }

    #[test]
    fn test_lone_bracket_gets_newline_shim() {
        assert_eq!(decode_payload("["), Some(StreamEvent::token("\n[")));
        assert_eq!(decode_payload("[1, 2]"), Some(StreamEvent::token("[1, 2]")));
    }

    #[test]
    fn test_decoder_holds_last_payload_until_finish() {
        let mut decoder = LegacyDecoder::default();
        let events = decoder.feed(b"data: Hello data: world");
        assert_eq!(events, vec![StreamEvent::token("Hello ")]);

        assert_eq!(decoder.finish(), vec![StreamEvent::token("world")]);
    }

    #[test]
    fn test_decoder_reassembles_split_marker() {
        let mut decoder = LegacyDecoder::default();
        assert!(decoder.feed(b"data: one da").is_empty());
        let events = decoder.feed(b"ta: [DONE]");
        assert_eq!(events, vec![StreamEvent::token("one ")]);
        assert_eq!(decoder.finish(), vec![StreamEvent::Done]);
    }
}
