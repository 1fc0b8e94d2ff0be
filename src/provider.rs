//! The AI/ML API model provider: plans, streams and prices one answer.

use crate::client::Client;
use crate::config::ProviderConfig;
use crate::cost::{PriceTable, PRICING_DESCRIPTION};
use crate::error::{Error, StreamError};
use crate::relay::{relay, EventSink};
use crate::tokens::{default_usage, BpeTokenCounter, ContextWindows, TokenCounter};
use crate::transport::{ChatTransport, StreamGuard};
use crate::types::{ChatRequest, UsageResult};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Model used when neither the call nor the config names one.
pub const DEFAULT_MODEL: &str = "openai/gpt-4o";

/// Questions starting with this prefix are only checked against the context window.
pub const DRY_RUN_PREFIX: &str = "$CasibaseDryRun$";

/// Per-call overrides for [`AimlProvider::answer_with`].
#[derive(Debug, Clone, Default)]
pub struct AnswerOptions {
    /// Model for this call; `None` or empty uses the configured model.
    pub model: Option<String>,
    /// Aborts the call while it waits on the transport.
    pub cancel: CancellationToken,
}

impl AnswerOptions {
    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    pub fn cancel(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }
}

/// Outcome of planning a question.
#[derive(Debug, Clone, PartialEq)]
pub enum Plan {
    /// The question fits; nothing will be sent.
    DryRun(UsageResult),
    /// A bounded request ready to be sent.
    Live(ChatRequest),
}

/// Answers questions through a chat transport and prices the exchange.
pub struct AimlProvider<T = Client, C = BpeTokenCounter> {
    config: ProviderConfig,
    transport: T,
    counter: C,
    context_windows: Arc<ContextWindows>,
    prices: Arc<PriceTable>,
}

impl AimlProvider {
    /// Provider over HTTP, counting with the model's tiktoken encoding.
    pub fn new(config: ProviderConfig) -> Result<Self, Error> {
        let transport = Client::new(&config)?;
        Ok(Self::with_transport(config, transport, BpeTokenCounter))
    }
}

impl<T, C> AimlProvider<T, C>
where
    T: ChatTransport,
    C: TokenCounter,
{
    pub fn with_transport(config: ProviderConfig, transport: T, counter: C) -> Self {
        Self {
            config,
            transport,
            counter,
            context_windows: ContextWindows::shared(),
            prices: PriceTable::shared(),
        }
    }

    /// Replace the builtin context-window table.
    pub fn context_windows(mut self, windows: ContextWindows) -> Self {
        self.context_windows = Arc::new(windows);
        self
    }

    /// Replace the builtin price table.
    pub fn prices(mut self, prices: PriceTable) -> Self {
        self.prices = Arc::new(prices);
        self
    }

    pub fn config(&self) -> &ProviderConfig {
        &self.config
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Pricing notes for this provider.
    pub fn pricing(&self) -> &'static str {
        PRICING_DESCRIPTION
    }

    /// Effective model: the override, else the configured model, else [`DEFAULT_MODEL`].
    pub fn resolve_model(&self, model: Option<&str>) -> String {
        model
            .filter(|m| !m.is_empty())
            .or_else(|| Some(self.config.model()).filter(|m| !m.is_empty()))
            .unwrap_or(DEFAULT_MODEL)
            .to_string()
    }

    /// Check `question` against the context window of `model` and bound the request.
    pub fn plan(&self, question: &str, model: &str) -> Result<Plan, Error> {
        let prompt_tokens = self.counter.count(model, question)?;
        let context_length = self.context_windows.get(model);
        let exceeds = || Error::ExceedsContext {
            prompt_tokens,
            model: model.to_string(),
            context_length,
        };

        if question.starts_with(DRY_RUN_PREFIX) {
            tracing::debug!(model, prompt_tokens, context_length, "dry run");
            return if prompt_tokens < context_length {
                Ok(Plan::DryRun(UsageResult::new(prompt_tokens, 0)))
            } else {
                Err(exceeds())
            };
        }

        let max_tokens = context_length.checked_sub(prompt_tokens).ok_or_else(exceeds)?;
        tracing::debug!(model, prompt_tokens, context_length, max_tokens, "planned request");

        Ok(Plan::Live(ChatRequest::new(
            model,
            question,
            self.config.temperature(),
            self.config.top_p(),
            max_tokens,
        )))
    }

    /// Priced usage record for a finished exchange.
    pub fn account(&self, model: &str, question: &str, answer: &str) -> Result<UsageResult, Error> {
        let usage = default_usage(&self.counter, model, question, answer)?;
        if self.prices.get(model).is_none() {
            tracing::warn!(model, "no price entry, using zero cost");
        }
        Ok(self.prices.price(model, usage))
    }

    /// Answer `question`, streaming fragments to `sink`.
    pub async fn answer<W: EventSink>(&self, question: &str, sink: &mut W) -> Result<UsageResult, Error> {
        self.answer_with(question, sink, AnswerOptions::default()).await
    }

    /// Answer `question` with per-call overrides.
    pub async fn answer_with<W: EventSink>(
        &self,
        question: &str,
        sink: &mut W,
        options: AnswerOptions,
    ) -> Result<UsageResult, Error> {
        if !sink.supports_push() {
            return Err(Error::UnsupportedSink);
        }

        let model = self.resolve_model(options.model.as_deref());
        let request = match self.plan(question, &model)? {
            Plan::DryRun(usage) => return Ok(usage),
            Plan::Live(request) => request,
        };

        let stream = tokio::select! {
            biased;
            () = options.cancel.cancelled() => return Err(StreamError::Cancelled.into()),
            stream = self.transport.open(&request) => stream?,
        };
        let mut stream = StreamGuard::new(stream);

        let answer = match relay(&mut *stream, sink, &options.cancel).await {
            Ok(answer) => answer,
            Err(e) => {
                tracing::warn!(model = %model, error = %e, "answer aborted");
                return Err(e);
            }
        };
        drop(stream);

        let usage = self.account(&model, question, &answer)?;
        tracing::info!(
            model = %model,
            prompt_tokens = usage.prompt_token_count(),
            response_tokens = usage.response_token_count(),
            total_price = usage.total_price(),
            "answer complete"
        );
        Ok(usage)
    }
}
