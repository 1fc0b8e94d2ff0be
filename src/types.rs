use serde::{Deserialize, Serialize};
use smallvec::{smallvec, SmallVec};

/// System preamble sent ahead of every question.
pub const SYSTEM_PROMPT: &str = "You are a helpful assistant.";

/// Currency code of every priced usage record.
pub const CURRENCY: &str = "USD";

/// Message role in conversation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
}

/// A role-tagged chat message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    /// Create a user message.
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    /// Create a system message.
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }
}

/// A bounded chat request, built fresh for every live call.
#[derive(Debug, Clone, PartialEq)]
pub struct ChatRequest {
    pub model: String,
    /// System preamble followed by the user's question.
    pub messages: SmallVec<[Message; 2]>,
    pub temperature: f64,
    pub top_p: f64,
    /// Remaining context budget after the prompt.
    pub max_tokens: u32,
    /// Request-level streaming flag. Always false; the transport streams on its own.
    pub stream: bool,
}

impl ChatRequest {
    /// Build a request answering `question` with the fixed system preamble.
    pub fn new(
        model: impl Into<String>,
        question: impl Into<String>,
        temperature: f64,
        top_p: f64,
        max_tokens: u32,
    ) -> Self {
        Self {
            model: model.into(),
            messages: smallvec![Message::system(SYSTEM_PROMPT), Message::user(question)],
            temperature,
            top_p,
            max_tokens,
            stream: false,
        }
    }
}

/// One incremental text fragment from the completion stream.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StreamChunk {
    text: String,
}

impl StreamChunk {
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }

    /// Fragment text, possibly empty.
    #[inline]
    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn into_text(self) -> String {
        self.text
    }
}

/// Token usage and cost of one answered (or dry-run) question.
///
/// `total_token_count` is always `prompt_token_count + response_token_count`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UsageResult {
    prompt_token_count: u32,
    response_token_count: u32,
    total_token_count: u32,
    total_price: f64,
    currency: &'static str,
}

impl UsageResult {
    /// Unpriced record for the given token counts.
    pub fn new(prompt_token_count: u32, response_token_count: u32) -> Self {
        Self {
            prompt_token_count,
            response_token_count,
            total_token_count: prompt_token_count.saturating_add(response_token_count),
            total_price: 0.0,
            currency: CURRENCY,
        }
    }

    pub fn with_price(mut self, total_price: f64) -> Self {
        self.total_price = total_price;
        self
    }

    pub fn prompt_token_count(&self) -> u32 {
        self.prompt_token_count
    }

    pub fn response_token_count(&self) -> u32 {
        self.response_token_count
    }

    pub fn total_token_count(&self) -> u32 {
        self.total_token_count
    }

    pub fn total_price(&self) -> f64 {
        self.total_price
    }

    pub fn currency(&self) -> &'static str {
        self.currency
    }
}
