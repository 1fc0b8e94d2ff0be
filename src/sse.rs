//! Server-Sent Events, both directions.
//!
//! [`SseParser`] reads the provider's `text/event-stream` body:
//! - Partial frames across TCP chunks
//! - Multi-line data fields
//! - CRLF and LF line endings
//!
//! [`message_event`] frames outbound fragments for the caller's sink.

use bytes::{Buf, BytesMut};
use memchr::memchr;

/// Payload that terminates an OpenAI-style stream.
pub const DONE: &str = "[DONE]";

/// Frame `fragment` as a single `message` event.
///
/// The fragment is written verbatim; embedded newlines are not escaped.
pub fn message_event(fragment: &str) -> String {
    format!("event: message\ndata: {fragment}\n\n")
}

/// A parsed inbound SSE event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SseEvent {
    pub data: String,
}

impl SseEvent {
    /// Whether the data marks end of stream.
    #[inline]
    pub fn is_done(&self) -> bool {
        self.data == DONE
    }
}

/// Line-based SSE parser over a growing byte buffer.
#[derive(Debug)]
pub struct SseParser {
    buffer: BytesMut,
}

impl SseParser {
    pub fn new() -> Self {
        Self::with_capacity(8192)
    }

    pub fn with_capacity(cap: usize) -> Self {
        Self {
            buffer: BytesMut::with_capacity(cap),
        }
    }

    /// Feed bytes into the parser.
    #[inline]
    pub fn feed(&mut self, data: &[u8]) {
        self.buffer.extend_from_slice(data);
    }

    /// Try to parse the next complete event.
    /// Returns `None` if more data is needed.
    pub fn next_event(&mut self) -> Option<SseEvent> {
        loop {
            let mut data: Option<String> = None;
            let mut pos = 0;
            let mut event_end = None;

            while let Some(i) = memchr(b'\n', &self.buffer[pos..]) {
                let line_end = pos + i;
                let line = &self.buffer[pos..line_end];
                let line = line.strip_suffix(b"\r").unwrap_or(line);
                pos = line_end + 1;

                if line.is_empty() {
                    event_end = Some(pos);
                    break;
                }

                // Lines starting with ':' are comments
                let Some(colon) = memchr(b':', line) else {
                    continue;
                };
                let field = &line[..colon];
                let value = &line[colon + 1..];
                let value = value.strip_prefix(b" ").unwrap_or(value);
                let Ok(value) = std::str::from_utf8(value) else {
                    continue;
                };

                // Only data matters; event names and ids are ignored
                if field == b"data" {
                    let data = data.get_or_insert_with(String::new);
                    if !data.is_empty() {
                        data.push('\n');
                    }
                    data.push_str(value);
                }
            }

            let end = event_end?;
            self.buffer.advance(end);

            // Events without data carry nothing for us
            if let Some(data) = data {
                return Some(SseEvent { data });
            }
        }
    }

    /// Bytes buffered but not yet consumed.
    pub fn buffer_len(&self) -> usize {
        self.buffer.len()
    }
}

impl Default for SseParser {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_event_framing() {
        assert_eq!(message_event("Hi"), "event: message\ndata: Hi\n\n");
        assert_eq!(message_event(""), "event: message\ndata: \n\n");
        // verbatim, multi-line fragments are not re-framed
        assert_eq!(message_event("a\nb"), "event: message\ndata: a\nb\n\n");
    }

    #[test]
    fn test_simple_event() {
        let mut parser = SseParser::new();
        parser.feed(b"data: hello world\n\n");

        let event = parser.next_event().unwrap();
        assert_eq!(event.data, "hello world");
        assert_eq!(parser.buffer_len(), 0);
    }

    #[test]
    fn test_multiline_data() {
        let mut parser = SseParser::new();
        parser.feed(b"data: line1\ndata: line2\ndata: line3\n\n");

        assert_eq!(parser.next_event().unwrap().data, "line1\nline2\nline3");
    }

    #[test]
    fn test_event_name_ignored() {
        let mut parser = SseParser::new();
        parser.feed(b"event: message\nid: 7\ndata: payload\n\n");

        assert_eq!(parser.next_event().unwrap().data, "payload");
    }

    #[test]
    fn test_crlf() {
        let mut parser = SseParser::new();
        parser.feed(b"data: hello\r\n\r\n");

        assert_eq!(parser.next_event().unwrap().data, "hello");
    }

    #[test]
    fn test_partial_event() {
        let mut parser = SseParser::new();
        parser.feed(b"data: hel");
        assert!(parser.next_event().is_none());

        parser.feed(b"lo\n\n");
        assert_eq!(parser.next_event().unwrap().data, "hello");
    }

    #[test]
    fn test_comments_and_empty_events_skipped() {
        let mut parser = SseParser::new();
        parser.feed(b": keep-alive\n\nevent: ping\n\ndata: a\n\ndata: [DONE]\n\n");

        assert_eq!(parser.next_event().unwrap().data, "a");
        assert!(parser.next_event().unwrap().is_done());
        assert!(parser.next_event().is_none());
    }

    #[test]
    fn test_empty_data_field() {
        let mut parser = SseParser::new();
        parser.feed(b"data:\n\n");

        assert_eq!(parser.next_event().unwrap().data, "");
    }
}
