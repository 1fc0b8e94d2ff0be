//! Token counting and context-window lookup.

use crate::error::Error;
use crate::types::UsageResult;
use std::collections::HashMap;
use std::sync::{Arc, LazyLock, Mutex, PoisonError};
use tiktoken_rs::tokenizer::{get_tokenizer, Tokenizer};
use tiktoken_rs::CoreBPE;

/// Context length assumed for models missing from the table.
pub const DEFAULT_CONTEXT_LENGTH: u32 = 4097;

/// Scores text in tokens for a given model.
pub trait TokenCounter: Send + Sync {
    fn count(&self, model: &str, text: &str) -> Result<u32, Error>;
}

impl<F> TokenCounter for F
where
    F: Fn(&str, &str) -> Result<u32, Error> + Send + Sync,
{
    fn count(&self, model: &str, text: &str) -> Result<u32, Error> {
        self(model, text)
    }
}

static ENCODINGS: Mutex<Vec<(Tokenizer, Arc<CoreBPE>)>> = Mutex::new(Vec::new());

/// Load (once per process) the BPE ranks of `tokenizer`.
fn encoding(tokenizer: Tokenizer) -> Result<Arc<CoreBPE>, String> {
    let mut cache = ENCODINGS.lock().unwrap_or_else(PoisonError::into_inner);
    if let Some((_, bpe)) = cache.iter().find(|(t, _)| *t == tokenizer) {
        return Ok(Arc::clone(bpe));
    }

    let bpe = Arc::new(tiktoken_rs::get_bpe_from_tokenizer(tokenizer).map_err(|e| e.to_string())?);
    cache.push((tokenizer, Arc::clone(&bpe)));
    Ok(bpe)
}

/// Counts with the model's tiktoken encoding.
///
/// Provider-prefixed names (`openai/gpt-4o`) are matched on the part after
/// the last `/`. Models tiktoken does not know are scored with `cl100k_base`.
#[derive(Debug, Clone, Copy, Default)]
pub struct BpeTokenCounter;

impl BpeTokenCounter {
    /// Encoding used to score `model`.
    pub fn tokenizer_for(model: &str) -> Tokenizer {
        let name = model.rsplit('/').next().unwrap_or(model);
        get_tokenizer(name).unwrap_or(Tokenizer::Cl100kBase)
    }
}

impl TokenCounter for BpeTokenCounter {
    fn count(&self, model: &str, text: &str) -> Result<u32, Error> {
        let bpe = encoding(Self::tokenizer_for(model)).map_err(|e| Error::token_count(model, e))?;
        let tokens = bpe.encode_with_special_tokens(text).len();
        u32::try_from(tokens)
            .map_err(|_| Error::token_count(model, format!("text too long ({tokens} tokens)")))
    }
}

/// Rough counter: one token per four characters, rounded up.
///
/// Undercounts non-Latin text; only for callers that cannot load BPE ranks.
#[derive(Debug, Clone, Copy, Default)]
pub struct ApproxTokenCounter;

impl TokenCounter for ApproxTokenCounter {
    fn count(&self, model: &str, text: &str) -> Result<u32, Error> {
        let chars = text.chars().count();
        u32::try_from(chars.div_ceil(4))
            .map_err(|_| Error::token_count(model, format!("text too long ({chars} chars)")))
    }
}

static BUILTIN_WINDOWS: &[(&str, u32)] = &[
    // OpenAI
    ("openai/gpt-4o", 128_000),
    ("gpt-4o-2024-05-13", 128_000),
    ("gpt-4o-mini", 128_000),
    ("gpt-3.5-turbo", 16_385),
    // Anthropic
    ("claude-3-5-sonnet-20240620", 200_000),
    ("claude-3-haiku-20240307", 200_000),
    // Google
    ("google/gemini-2.5-pro", 1_048_576),
    ("google/gemma-3-4b-it", 131_072),
    // Meta
    ("meta-llama/Meta-Llama-3.1-8B-Instruct-Turbo", 131_072),
    ("meta-llama/Llama-3-8b-chat-hf", 8_192),
    // DeepSeek
    ("deepseek-chat", 65_536),
    ("deepseek-reasoner", 65_536),
];

static SHARED_WINDOWS: LazyLock<Arc<ContextWindows>> =
    LazyLock::new(|| Arc::new(ContextWindows::new()));

/// Model to context-window table.
#[derive(Debug, Clone)]
pub struct ContextWindows {
    windows: HashMap<String, u32>,
}

impl ContextWindows {
    /// Table seeded with the builtin models.
    pub fn new() -> Self {
        let windows = BUILTIN_WINDOWS
            .iter()
            .map(|&(model, len)| (model.to_string(), len))
            .collect();
        Self { windows }
    }

    /// Process-wide builtin table.
    pub fn shared() -> Arc<Self> {
        Arc::clone(&SHARED_WINDOWS)
    }

    /// Context length for `model`, or [`DEFAULT_CONTEXT_LENGTH`] for unknown models.
    pub fn get(&self, model: &str) -> u32 {
        self.windows.get(model).copied().unwrap_or(DEFAULT_CONTEXT_LENGTH)
    }

    /// Add or update the window of a model.
    pub fn set(&mut self, model: impl Into<String>, context_length: u32) {
        self.windows.insert(model.into(), context_length);
    }
}

impl Default for ContextWindows {
    fn default() -> Self {
        Self::new()
    }
}

/// Unpriced usage record for an exchange, scored by `counter`.
pub fn default_usage(
    counter: &dyn TokenCounter,
    model: &str,
    question: &str,
    answer: &str,
) -> Result<UsageResult, Error> {
    let prompt = counter.count(model, question)?;
    let response = if answer.is_empty() {
        0
    } else {
        counter.count(model, answer)?
    };
    Ok(UsageResult::new(prompt, response))
}
