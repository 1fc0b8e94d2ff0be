//! HTTP transport for the AI/ML API chat-completions endpoint.

use crate::config::ProviderConfig;
use crate::error::{Error, StreamError};
use crate::stream::CompletionStream;
use crate::transport::ChatTransport;
use crate::types::ChatRequest;
use bytes::Bytes;
use futures::stream::BoxStream;
use futures::StreamExt;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, AUTHORIZATION, CONTENT_TYPE, RETRY_AFTER};
use serde_json::Value;
use std::time::Duration;

/// Streaming response of [`Client`].
pub type HttpCompletionStream = CompletionStream<BoxStream<'static, Result<Bytes, reqwest::Error>>>;

/// HTTP client for the chat-completions endpoint.
#[derive(Clone, Debug)]
pub struct Client {
    http: reqwest::Client,
    url: String,
    headers: HeaderMap,
}

impl Client {
    /// Create a client from provider settings.
    pub fn new(config: &ProviderConfig) -> Result<Self, Error> {
        let http = reqwest::Client::builder()
            .pool_max_idle_per_host(10)
            .pool_idle_timeout(Duration::from_secs(90))
            .tcp_nodelay(true)
            .timeout(config.timeout)
            .build()
            .map_err(|e| Error::Config(e.to_string()))?;
        Self::with_http(config, http)
    }

    /// Create a client over a preconfigured `reqwest::Client` (proxies, custom TLS).
    pub fn with_http(config: &ProviderConfig, http: reqwest::Client) -> Result<Self, Error> {
        Ok(Self {
            http,
            url: format!("{}/chat/completions", config.base_url.trim_end_matches('/')),
            headers: headers(config)?,
        })
    }

    /// Endpoint requests are posted to.
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Convert error response to Error type.
    async fn handle_error_response(&self, resp: reqwest::Response) -> StreamError {
        let status = resp.status().as_u16();
        let headers = resp.headers().clone();

        let body = resp.text().await.unwrap_or_default();

        match status {
            401 => StreamError::Unauthorized,
            429 => StreamError::RateLimited {
                retry_after: parse_retry_after(&headers),
            },
            500..=599 => StreamError::Server(status),
            _ => {
                // Try to extract error message from JSON
                let message = serde_json::from_str::<Value>(&body)
                    .ok()
                    .and_then(|v| v["error"]["message"].as_str().map(ToString::to_string))
                    .unwrap_or(body);
                StreamError::api(status, message)
            }
        }
    }
}

impl ChatTransport for Client {
    type Stream = HttpCompletionStream;

    async fn open(&self, request: &ChatRequest) -> Result<HttpCompletionStream, Error> {
        let body = stream_body(request);
        tracing::debug!("Request Body: {}", body);

        let resp = self
            .http
            .post(&self.url)
            .headers(self.headers.clone())
            .json(&body)
            .send()
            .await?;

        if !resp.status().is_success() {
            let error = self.handle_error_response(resp).await;
            tracing::warn!(model = %request.model, %error, "chat completion rejected");
            return Err(error.into());
        }

        Ok(CompletionStream::new(resp.bytes_stream().boxed()))
    }
}

/// JSON body for a streamed chat completion.
///
/// The request's own `stream` flag stays false; the wire request always streams.
pub fn stream_body(request: &ChatRequest) -> Value {
    serde_json::json!({
        "model": request.model,
        "messages": request.messages.as_slice(),
        "temperature": request.temperature,
        "top_p": request.top_p,
        "max_tokens": request.max_tokens,
        "stream": true,
    })
}

/// Build request headers including auth and site attribution.
fn headers(config: &ProviderConfig) -> Result<HeaderMap, Error> {
    let mut headers = HeaderMap::new();
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

    let auth = HeaderValue::from_str(&format!("Bearer {}", config.secret_key))
        .map_err(|_| Error::Config("secret key is not a valid header value".into()))?;
    headers.insert(AUTHORIZATION, auth);

    let (name, url) = config.site();
    let referer = HeaderValue::from_str(url)
        .map_err(|_| Error::Config(format!("invalid site url: {url}")))?;
    headers.insert(HeaderName::from_static("http-referer"), referer);
    let title = HeaderValue::from_str(name)
        .map_err(|_| Error::Config(format!("invalid site name: {name}")))?;
    headers.insert(HeaderName::from_static("x-title"), title);
    Ok(headers)
}

/// Parse Retry-After header (seconds form only).
fn parse_retry_after(headers: &HeaderMap) -> Option<Duration> {
    headers
        .get(RETRY_AFTER)
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.parse::<u64>().ok())
        .map(Duration::from_secs)
}
