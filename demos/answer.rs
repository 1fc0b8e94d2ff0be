//! Stream an answer to stdout as server-sent events.
//!
//! Run with: AIMLAPI_API_KEY=... RUST_LOG=aimlapi_relay=debug cargo run --example answer -- "question"

use aimlapi_relay::{AimlProvider, AnswerOptions, ProviderConfig};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let question = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "Write a haiku about Rust programming.".to_string());

    let config = ProviderConfig::builder()
        .from_env()
        .temperature(0.7)
        .build()?;
    let provider = AimlProvider::new(config)?;

    // Ctrl-C cancels the in-flight stream
    let cancel = CancellationToken::new();
    let on_ctrl_c = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            on_ctrl_c.cancel();
        }
    });

    let mut out = tokio::io::stdout();
    let usage = provider
        .answer_with(&question, &mut out, AnswerOptions::default().cancel(cancel))
        .await?;

    eprintln!("\n--- Usage ---");
    eprintln!("Prompt tokens: {}", usage.prompt_token_count());
    eprintln!("Response tokens: {}", usage.response_token_count());
    eprintln!("Total price: {} {}", usage.total_price(), usage.currency());

    Ok(())
}
