use std::io;
use std::time::Duration;
use thiserror::Error;

/// Errors surfaced by [`AimlProvider::answer`](crate::AimlProvider::answer).
#[derive(Error, Debug)]
pub enum Error {
    /// The token counter could not score the text for this model.
    #[error("cannot count tokens for model {model}: {reason}")]
    TokenCount { model: String, reason: String },

    /// The prompt alone does not fit the model's context window.
    #[error("token count [{prompt_tokens}] exceeds model [{model}] max context [{context_length}]")]
    ExceedsContext {
        prompt_tokens: u32,
        model: String,
        context_length: u32,
    },

    /// The sink cannot flush events to its consumer incrementally.
    #[error("sink does not support incremental flushing")]
    UnsupportedSink,

    /// Transport failure while opening or reading the completion stream.
    #[error("stream: {0}")]
    Stream(#[from] StreamError),

    /// Failure delivering a fragment to the sink.
    #[error("write: {0}")]
    Write(#[source] io::Error),

    /// Invalid configuration.
    #[error("config: {0}")]
    Config(String),
}

impl Error {
    /// Returns true if the caller may reasonably retry the call.
    ///
    /// Nothing is retried internally.
    #[inline]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Error::Stream(e) if e.is_retryable())
    }

    /// Create a token count error.
    pub fn token_count(model: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::TokenCount {
            model: model.into(),
            reason: reason.into(),
        }
    }
}

/// Transport-level failures of the chat-completion stream.
#[derive(Error, Debug)]
pub enum StreamError {
    /// Rate limited by the provider. Check `retry_after` for suggested wait time.
    #[error("rate limited")]
    RateLimited { retry_after: Option<Duration> },

    /// Invalid or missing API key.
    #[error("unauthorized")]
    Unauthorized,

    /// Server error (5xx status codes).
    #[error("server error ({0})")]
    Server(u16),

    /// API error with provider-specific message.
    #[error("{message}")]
    Api { status: u16, message: String },

    /// Request or connection timeout.
    #[error("timeout")]
    Timeout,

    /// JSON or SSE parsing error.
    #[error("parse: {0}")]
    Parse(String),

    /// HTTP/network error.
    #[error("http: {0}")]
    Http(reqwest::Error),

    /// The caller cancelled the call while the stream was open.
    #[error("cancelled")]
    Cancelled,
}

impl StreamError {
    #[inline]
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            StreamError::RateLimited { .. } | StreamError::Server(_) | StreamError::Timeout
        )
    }

    /// Create an API error from status and message.
    pub fn api(status: u16, message: impl Into<String>) -> Self {
        Self::Api {
            status,
            message: message.into(),
        }
    }

    /// Create a parse error.
    pub fn parse(msg: impl Into<String>) -> Self {
        Self::Parse(msg.into())
    }
}

impl From<reqwest::Error> for StreamError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            StreamError::Timeout
        } else {
            StreamError::Http(e)
        }
    }
}

impl From<reqwest::Error> for Error {
    fn from(e: reqwest::Error) -> Self {
        Error::Stream(e.into())
    }
}
