//! Streaming chat-completion response over SSE.

use crate::error::{Error, StreamError};
use crate::sse::SseParser;
use crate::transport::ChunkSource;
use crate::types::StreamChunk;
use bytes::Bytes;
use futures::{Stream, StreamExt};
use serde::Deserialize;

/// A streaming chat-completion response.
///
/// Turns the raw `text/event-stream` body into one [`StreamChunk`] per
/// event that carries a choice.
pub struct CompletionStream<S> {
    /// `None` once closed; dropping the body releases the connection.
    inner: Option<S>,
    parser: SseParser,
    done: bool,
}

impl<S> CompletionStream<S>
where
    S: Stream<Item = Result<Bytes, reqwest::Error>> + Unpin + Send,
{
    pub fn new(inner: S) -> Self {
        Self {
            inner: Some(inner),
            parser: SseParser::new(),
            done: false,
        }
    }

    /// Get the next chunk from the stream.
    pub async fn next(&mut self) -> Option<Result<StreamChunk, Error>> {
        if self.done {
            return None;
        }

        loop {
            // First, drain events already buffered
            while let Some(event) = self.parser.next_event() {
                if event.is_done() {
                    self.done = true;
                    return None;
                }
                match parse_chunk(&event.data) {
                    Ok(Some(chunk)) => return Some(Ok(chunk)),
                    Ok(None) => {}
                    Err(e) => {
                        self.done = true;
                        return Some(Err(e.into()));
                    }
                }
            }

            let Some(inner) = self.inner.as_mut() else {
                self.done = true;
                return None;
            };

            match inner.next().await {
                Some(Ok(bytes)) => self.parser.feed(&bytes),
                Some(Err(e)) => {
                    self.done = true;
                    return Some(Err(Error::from(e)));
                }
                None => {
                    // Body ended without [DONE]; a trailing event may lack its blank line
                    self.parser.feed(b"\n\n");
                    self.inner = None;
                }
            }
        }
    }
}

impl<S> ChunkSource for CompletionStream<S>
where
    S: Stream<Item = Result<Bytes, reqwest::Error>> + Unpin + Send,
{
    async fn next_chunk(&mut self) -> Option<Result<StreamChunk, Error>> {
        self.next().await
    }

    fn close(&mut self) {
        self.inner = None;
        self.done = true;
    }
}

/// Parse one SSE data payload of a chat-completion stream.
///
/// Events without choices (e.g. trailing usage) yield `None`. A choice with
/// no content yields an empty fragment.
fn parse_chunk(data: &str) -> Result<Option<StreamChunk>, StreamError> {
    #[cfg(feature = "simd-json")]
    let chunk: ChatChunk = {
        let mut data_bytes = data.as_bytes().to_vec();
        simd_json::from_slice(&mut data_bytes).map_err(|e| StreamError::parse(e.to_string()))?
    };

    #[cfg(not(feature = "simd-json"))]
    let chunk: ChatChunk =
        serde_json::from_str(data).map_err(|e| StreamError::parse(e.to_string()))?;

    if let Some(error) = chunk.error {
        return Err(StreamError::api(0, error.message));
    }

    let Some(choice) = chunk.choices.into_iter().next() else {
        return Ok(None);
    };

    let text = choice
        .delta
        .and_then(|d| d.content)
        .or_else(|| choice.message.and_then(|m| m.content))
        .unwrap_or_default();

    Ok(Some(StreamChunk::new(text)))
}

// --- Serde types for chat-completion chunks ---

#[derive(Debug, Deserialize)]
struct ChatChunk {
    #[serde(default)]
    choices: Vec<ChunkChoice>,
    error: Option<ChunkError>,
}

#[derive(Debug, Deserialize)]
struct ChunkChoice {
    delta: Option<ChunkContent>,
    message: Option<ChunkContent>,
}

#[derive(Debug, Deserialize)]
struct ChunkContent {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChunkError {
    message: String,
}
