//! Streaming relay for the AI/ML API chat-completions endpoint.
//!
//! A question is checked against the model's context window, answered over a
//! streaming chat completion whose fragments are pushed to the caller as
//! `event: message` server-sent events, and priced from a per-model table.
//!
//! # Example
//! ```no_run
//! use aimlapi_relay::{AimlProvider, ProviderConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), aimlapi_relay::Error> {
//!     let config = ProviderConfig::builder()
//!         .from_env()
//!         .model("gpt-4o-mini")
//!         .temperature(0.7)
//!         .build()?;
//!     let provider = AimlProvider::new(config)?;
//!
//!     let mut out = tokio::io::stdout();
//!     let usage = provider.answer("Hello!", &mut out).await?;
//!     println!(
//!         "\nTokens: {} in, {} out, {} {}",
//!         usage.prompt_token_count(),
//!         usage.response_token_count(),
//!         usage.total_price(),
//!         usage.currency()
//!     );
//!     Ok(())
//! }
//! ```

pub mod client;
pub mod config;
pub mod cost;
pub mod error;
pub mod provider;
pub mod relay;
pub mod sse;
pub mod stream;
pub mod tokens;
pub mod transport;
pub mod types;

pub use client::Client;
pub use config::{ProviderConfig, ProviderConfigBuilder};
pub use cost::{Cost, ModelPricing, PriceTable};
pub use error::{Error, StreamError};
pub use provider::{AimlProvider, AnswerOptions, Plan, DEFAULT_MODEL, DRY_RUN_PREFIX};
pub use relay::{EventSink, LeadingBlankFilter};
pub use stream::CompletionStream;
pub use tokens::{ApproxTokenCounter, BpeTokenCounter, ContextWindows, TokenCounter};
pub use transport::{ChatTransport, ChunkSource};
pub use types::*;

/// Result type alias for this crate.
pub type Result<T> = std::result::Result<T, Error>;
