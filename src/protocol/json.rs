//! JSON-tagged SSE framing: `data: {"type":"token","text":"..."}\n\n`

use super::take_utf8;
use super::StreamEvent;
use crate::errors::Result;

/// Encode one event as a complete SSE frame
pub fn encode(event: &StreamEvent) -> Result<String> {
    Ok(format!("data: {}\n\n", serde_json::to_string(event)?))
}

/// Incremental SSE frame decoder
#[derive(Default)]
pub struct JsonDecoder {
    pending: Vec<u8>,
}

impl JsonDecoder {
    pub fn feed(&mut self, chunk: &[u8]) -> Result<Vec<StreamEvent>> {
        self.pending.extend_from_slice(chunk);

        let mut events = Vec::new();
        while let Some((end, delimiter_len)) = find_frame_end(&self.pending) {
            let mut frame: Vec<u8> = self.pending.drain(..end + delimiter_len).collect();
            frame.truncate(end);
            let text = take_utf8(&mut frame);
            if let Some(event) = parse_frame(&text)? {
                events.push(event);
            }
        }
        Ok(events)
    }

    /// Parse a final frame that arrived without its blank-line terminator
    pub fn finish(&mut self) -> Result<Vec<StreamEvent>> {
        let text = take_utf8(&mut self.pending);
        self.pending.clear();
        if text.trim().is_empty() {
            return Ok(Vec::new());
        }
        Ok(parse_frame(&text)?.into_iter().collect())
    }
}

fn find_frame_end(buf: &[u8]) -> Option<(usize, usize)> {
    let lf = buf.windows(2).position(|w| w == b"\n\n").map(|p| (p, 2));
    let crlf = buf.windows(4).position(|w| w == b"\r\n\r\n").map(|p| (p, 4));
    match (lf, crlf) {
        (Some(a), Some(b)) => Some(if a.0 <= b.0 { a } else { b }),
        (a, b) => a.or(b),
    }
}

fn parse_frame(frame: &str) -> Result<Option<StreamEvent>> {
    let data: Vec<&str> = frame
        .lines()
        .filter_map(|line| line.strip_prefix("data:"))
        .map(|rest| rest.strip_prefix(' ').unwrap_or(rest))
        .collect();

    // Comment-only frames are keep-alives
    if data.is_empty() {
        return Ok(None);
    }
    Ok(Some(serde_json::from_str(&data.join("\n"))?))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_token_frame() {
        let frame = encode(&StreamEvent::token("Hello\nworld")).unwrap();
        assert_eq!(frame, "data: {\"type\":\"token\",\"text\":\"Hello\\nworld\"}\n\n");
    }

    #[test]
    fn test_open_bracket_token_needs_no_shim() {
        let mut decoder = JsonDecoder::default();
        let events = decoder
            .feed(encode(&StreamEvent::token("[")).unwrap().as_bytes())
            .unwrap();
        assert_eq!(events, vec![StreamEvent::token("[")]);
    }

    #[test]
    fn test_decoder_skips_comments_and_accepts_crlf() {
        let mut decoder = JsonDecoder::default();
        let body = ": keep-alive\n\ndata: {\"type\":\"latency\",\"ms\":5}\r\n\r\n";
        let events = decoder.feed(body.as_bytes()).unwrap();
        assert_eq!(events, vec![StreamEvent::Latency { ms: 5 }]);
    }

    #[test]
    fn test_missing_query_id_decodes_as_none() {
        let mut decoder = JsonDecoder::default();
        let events = decoder.feed(b"data: {\"type\":\"query_id\"}\n\n").unwrap();
        assert_eq!(events, vec![StreamEvent::QueryId { id: None }]);
    }

    #[test]
    fn test_finish_parses_unterminated_frame() {
        let mut decoder = JsonDecoder::default();
        assert!(decoder.feed(b"data: {\"type\":\"done\"}").unwrap().is_empty());
        assert_eq!(decoder.finish().unwrap(), vec![StreamEvent::Done]);
    }

    #[test]
    fn test_malformed_frame_is_an_error() {
        let mut decoder = JsonDecoder::default();
        assert!(decoder.feed(b"data: not-json\n\n").is_err());
    }
}
