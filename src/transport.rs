//! Chat-completion transport capabilities.

use crate::error::Error;
use crate::types::{ChatRequest, StreamChunk};
use std::future::Future;
use std::ops::{Deref, DerefMut};

/// An open stream of incremental chunks.
pub trait ChunkSource: Send {
    /// Receive the next chunk. `None` is a normal end of stream.
    fn next_chunk(&mut self) -> impl Future<Output = Option<Result<StreamChunk, Error>>> + Send;

    /// Release transport resources. Called once, on every exit path.
    fn close(&mut self) {}
}

/// Something that can open a chat-completion stream.
pub trait ChatTransport: Send + Sync {
    type Stream: ChunkSource;

    fn open(&self, request: &ChatRequest)
        -> impl Future<Output = Result<Self::Stream, Error>> + Send;
}

/// Owns an open [`ChunkSource`] and closes it when dropped.
#[derive(Debug)]
pub struct StreamGuard<S: ChunkSource> {
    inner: S,
}

impl<S: ChunkSource> StreamGuard<S> {
    pub fn new(inner: S) -> Self {
        Self { inner }
    }
}

impl<S: ChunkSource> Deref for StreamGuard<S> {
    type Target = S;

    fn deref(&self) -> &S {
        &self.inner
    }
}

impl<S: ChunkSource> DerefMut for StreamGuard<S> {
    fn deref_mut(&mut self) -> &mut S {
        &mut self.inner
    }
}

impl<S: ChunkSource> Drop for StreamGuard<S> {
    fn drop(&mut self) {
        self.inner.close();
    }
}
