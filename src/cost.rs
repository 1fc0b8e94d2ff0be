//! Usage pricing for the AI/ML API models.
//!
//! Prices are per 1K tokens in USD. Models missing from the table are priced
//! at zero, so a zero cost does not imply a matched entry and a nonzero cost
//! is never produced for an unknown model.

use crate::types::UsageResult;
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::{Arc, LazyLock};

/// Human-readable pricing notes.
pub const PRICING_DESCRIPTION: &str = "URL:
https://aimlapi.com/pricing

Notes:
- Pricing varies per model (OpenAI, Anthropic, Google, Meta, etc.)
- Always use the official page as the source of truth
";

/// Cost in USD for token usage.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Cost {
    /// Cost for prompt tokens in USD.
    pub input_cost: f64,
    /// Cost for response tokens in USD.
    pub output_cost: f64,
}

impl Cost {
    /// Total cost in USD.
    pub fn total(&self) -> f64 {
        add_prices(self.input_cost, self.output_cost)
    }
}

/// Sum two prices, rounded to 1e-10 USD so totals do not drift across platforms.
pub fn add_prices(a: f64, b: f64) -> f64 {
    ((a + b) * 1e10).round() / 1e10
}

/// Cost of `tokens` at `per_thousand` USD per 1K tokens.
#[inline]
pub fn price_of(tokens: u32, per_thousand: f64) -> f64 {
    f64::from(tokens) / 1000.0 * per_thousand
}

/// Pricing per 1K tokens for a model.
#[derive(Debug, Clone, Copy, Default, PartialEq, Deserialize)]
pub struct ModelPricing {
    /// Cost per 1K prompt tokens.
    pub input_per_thousand: f64,
    /// Cost per 1K response tokens.
    pub output_per_thousand: f64,
}

impl ModelPricing {
    pub const FREE: ModelPricing = ModelPricing::new(0.0, 0.0);

    pub const fn new(input: f64, output: f64) -> Self {
        Self {
            input_per_thousand: input,
            output_per_thousand: output,
        }
    }

    /// Calculate cost for given usage.
    pub fn calculate(&self, usage: &UsageResult) -> Cost {
        Cost {
            input_cost: price_of(usage.prompt_token_count(), self.input_per_thousand),
            output_cost: price_of(usage.response_token_count(), self.output_per_thousand),
        }
    }
}

// Example price table (incomplete, extend as needed).
static BUILTIN_PRICES: &[(&str, ModelPricing)] = &[
    // OpenAI
    ("openai/gpt-4o", ModelPricing::new(0.005, 0.015)),
    ("gpt-4o-2024-05-13", ModelPricing::new(0.005, 0.015)),
    ("gpt-4o-mini", ModelPricing::new(0.003, 0.006)),
    ("gpt-3.5-turbo", ModelPricing::new(0.001, 0.002)),
    // Anthropic
    ("claude-3-5-sonnet-20240620", ModelPricing::new(0.003, 0.015)),
    ("claude-3-haiku-20240307", ModelPricing::new(0.0008, 0.0024)),
    // Google
    ("google/gemini-2.5-pro", ModelPricing::new(0.0025, 0.0075)),
    ("google/gemma-3-4b-it", ModelPricing::new(0.0004, 0.0008)),
    // Meta
    ("meta-llama/Meta-Llama-3.1-8B-Instruct-Turbo", ModelPricing::new(0.0002, 0.0006)),
    ("meta-llama/Llama-3-8b-chat-hf", ModelPricing::new(0.0002, 0.0006)),
    // DeepSeek
    ("deepseek-chat", ModelPricing::new(0.0006, 0.0012)),
    ("deepseek-reasoner", ModelPricing::new(0.0015, 0.0030)),
];

static SHARED_PRICES: LazyLock<Arc<PriceTable>> = LazyLock::new(|| Arc::new(PriceTable::new()));

/// Model to pricing table. A miss resolves to [`ModelPricing::FREE`].
#[derive(Debug, Clone)]
pub struct PriceTable {
    prices: HashMap<String, ModelPricing>,
}

impl PriceTable {
    /// Table seeded with the builtin prices.
    pub fn new() -> Self {
        let prices = BUILTIN_PRICES
            .iter()
            .map(|&(model, pricing)| (model.to_string(), pricing))
            .collect();
        Self { prices }
    }

    /// Table without any entries; every model is free.
    pub fn empty() -> Self {
        Self {
            prices: HashMap::new(),
        }
    }

    /// Load a table from JSON of the form `{"model": {"input_per_thousand": .., "output_per_thousand": ..}}`.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        Ok(Self {
            prices: serde_json::from_str(json)?,
        })
    }

    /// Process-wide builtin table.
    pub fn shared() -> Arc<Self> {
        Arc::clone(&SHARED_PRICES)
    }

    /// Get pricing for a model.
    pub fn get(&self, model: &str) -> Option<&ModelPricing> {
        self.prices.get(model)
    }

    /// Pricing for a model, zero when unknown.
    pub fn get_or_zero(&self, model: &str) -> ModelPricing {
        self.get(model).copied().unwrap_or(ModelPricing::FREE)
    }

    /// Add or update pricing for a model.
    pub fn set(&mut self, model: impl Into<String>, pricing: ModelPricing) {
        self.prices.insert(model.into(), pricing);
    }

    /// Copy of `usage` with its total price filled in.
    pub fn price(&self, model: &str, usage: UsageResult) -> UsageResult {
        let cost = self.get_or_zero(model).calculate(&usage);
        usage.with_price(cost.total())
    }
}

impl Default for PriceTable {
    fn default() -> Self {
        Self::new()
    }
}
