//! Relays stream fragments to the caller's sink as server-push events.

use crate::error::{Error, StreamError};
use crate::sse::message_event;
use crate::transport::ChunkSource;
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio_util::sync::CancellationToken;

/// A writer that can push each event to its consumer as soon as it is flushed.
///
/// Sinks that only deliver output at the end (e.g. a buffered HTTP body)
/// report `false` from [`supports_push`](EventSink::supports_push) and are
/// rejected before any request is made.
pub trait EventSink: AsyncWrite + Unpin + Send {
    fn supports_push(&self) -> bool {
        true
    }
}

impl EventSink for Vec<u8> {}
impl EventSink for tokio::io::DuplexStream {}
impl EventSink for tokio::io::Stdout {}
impl EventSink for tokio::io::Sink {}

/// Drops the run of newline-only fragments a model may emit before content.
///
/// While leading, a non-empty fragment made only of `\n` is dropped. Any
/// other fragment ends leading mode, including the empty fragment, which is
/// forwarded as an empty event.
#[derive(Debug, Clone, Copy)]
pub struct LeadingBlankFilter {
    leading: bool,
}

impl LeadingBlankFilter {
    pub fn new() -> Self {
        Self { leading: true }
    }

    /// Whether `fragment` should be forwarded.
    pub fn admit(&mut self, fragment: &str) -> bool {
        if self.leading && !fragment.is_empty() && fragment.bytes().all(|b| b == b'\n') {
            return false;
        }
        self.leading = false;
        true
    }
}

impl Default for LeadingBlankFilter {
    fn default() -> Self {
        Self::new()
    }
}

/// Forward every admitted fragment of `stream` to `sink` and return their concatenation.
///
/// Each fragment is written as one `message` event and flushed immediately.
/// Output already flushed stays visible if the stream later fails.
pub async fn relay<S, W>(
    stream: &mut S,
    sink: &mut W,
    cancel: &CancellationToken,
) -> Result<String, Error>
where
    S: ChunkSource,
    W: EventSink,
{
    let mut filter = LeadingBlankFilter::new();
    let mut answer = String::new();

    loop {
        let next = tokio::select! {
            biased;
            () = cancel.cancelled() => return Err(StreamError::Cancelled.into()),
            next = stream.next_chunk() => next,
        };

        let chunk = match next {
            None => break,
            Some(chunk) => chunk?,
        };

        let fragment = chunk.text();
        if !filter.admit(fragment) {
            continue;
        }

        sink.write_all(message_event(fragment).as_bytes())
            .await
            .map_err(Error::Write)?;
        answer.push_str(fragment);
        sink.flush().await.map_err(Error::Write)?;
    }

    Ok(answer)
}
