//! End-to-end tests of the HTTP transport against a wiremock server.

use aimlapi_relay::{
    AimlProvider, Client, ContextWindows, Error, ModelPricing, PriceTable, ProviderConfig,
    StreamError, DRY_RUN_PREFIX,
};
use serde_json::Value;
use std::time::Duration;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

type ByteCounter = fn(&str, &str) -> Result<u32, Error>;

/// One token per byte keeps expected numbers obvious.
fn byte_counter(_: &str, text: &str) -> Result<u32, Error> {
    Ok(u32::try_from(text.len()).unwrap())
}

fn sse(events: &[&str]) -> String {
    events.iter().map(|e| format!("data: {e}\n\n")).collect()
}

fn delta(content: &str) -> String {
    serde_json::json!({
        "id": "chatcmpl-1",
        "object": "chat.completion.chunk",
        "choices": [{"index": 0, "delta": {"content": content}, "finish_reason": null}]
    })
    .to_string()
}

/// Create a provider configured to use the mock server.
fn create_provider(server: &MockServer) -> AimlProvider<Client, ByteCounter> {
    let config = ProviderConfig::builder()
        .secret_key("test-key")
        .model("mini")
        .site("Relay Tests", "https://relay.test")
        .temperature(0.5)
        .base_url(format!("{}/v1", server.uri()))
        .timeout(Duration::from_secs(5))
        .build()
        .unwrap();

    let mut windows = ContextWindows::new();
    windows.set("mini", 1000);
    let mut prices = PriceTable::empty();
    prices.set("mini", ModelPricing::new(0.5, 1.0));

    let client = Client::new(&config).unwrap();
    AimlProvider::with_transport(config, client, byte_counter as ByteCounter)
        .context_windows(windows)
        .prices(prices)
}

async fn mount_stream(server: &MockServer, body: String) {
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .and(header("authorization", "Bearer test-key"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(body, "text/event-stream"))
        .expect(1)
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_streams_answer_and_prices_usage() {
    let server = MockServer::start().await;
    let usage_only = r#"{"choices":[],"usage":{"prompt_tokens":9,"completion_tokens":3}}"#;
    mount_stream(
        &server,
        sse(&[&delta("\n\n"), &delta("Hello"), &delta(" world"), usage_only, "[DONE]"]),
    )
    .await;
    let provider = create_provider(&server);

    let mut sink: Vec<u8> = Vec::new();
    let usage = provider.answer("What is Rust?", &mut sink).await.unwrap();

    assert_eq!(
        String::from_utf8(sink).unwrap(),
        "event: message\ndata: Hello\n\nevent: message\ndata:  world\n\n"
    );
    assert_eq!(usage.prompt_token_count(), 13);
    assert_eq!(usage.response_token_count(), 11);
    assert_eq!(usage.total_token_count(), 24);
    // 13/1000 * 0.5 + 11/1000 * 1.0
    assert_eq!(usage.total_price(), 0.0175);
    assert_eq!(usage.currency(), "USD");
}

#[tokio::test]
async fn test_request_body_and_headers() {
    let server = MockServer::start().await;
    mount_stream(&server, sse(&[&delta("ok"), "[DONE]"])).await;
    let provider = create_provider(&server);

    let mut sink: Vec<u8> = Vec::new();
    provider.answer("0123456789", &mut sink).await.unwrap();

    let requests = server.received_requests().await.unwrap();
    assert_eq!(requests.len(), 1);
    let request = &requests[0];
    assert_eq!(request.headers.get("x-title").unwrap(), "Relay Tests");
    assert_eq!(request.headers.get("http-referer").unwrap(), "https://relay.test");

    let body: Value = request.body_json().unwrap();
    assert_eq!(body["model"], "mini");
    assert_eq!(body["max_tokens"], 990);
    assert_eq!(body["stream"], true);
    assert_eq!(body["temperature"], 0.5);
    assert_eq!(body["messages"][0]["content"], "You are a helpful assistant.");
    assert_eq!(body["messages"][1]["content"], "0123456789");
}

#[tokio::test]
async fn test_role_chunk_is_forwarded_as_empty_event() {
    let server = MockServer::start().await;
    let role = r#"{"choices":[{"index":0,"delta":{"role":"assistant"}}]}"#;
    mount_stream(&server, sse(&[role, &delta("\n"), &delta("x"), "[DONE]"])).await;
    let provider = create_provider(&server);

    let mut sink: Vec<u8> = Vec::new();
    let usage = provider.answer("q", &mut sink).await.unwrap();

    assert_eq!(
        String::from_utf8(sink).unwrap(),
        "event: message\ndata: \n\nevent: message\ndata: \n\n\nevent: message\ndata: x\n\n"
    );
    assert_eq!(usage.response_token_count(), 2);
}

#[tokio::test]
async fn test_context_overflow_sends_nothing() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;
    let provider = create_provider(&server);

    let mut sink: Vec<u8> = Vec::new();
    let err = provider.answer(&"x".repeat(1001), &mut sink).await.unwrap_err();

    assert!(matches!(
        err,
        Error::ExceedsContext { prompt_tokens: 1001, context_length: 1000, .. }
    ));
    assert!(sink.is_empty());
}

#[tokio::test]
async fn test_dry_run_sends_nothing() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;
    let provider = create_provider(&server);

    let mut sink: Vec<u8> = Vec::new();
    let question = format!("{DRY_RUN_PREFIX}is this ok?");
    let usage = provider.answer(&question, &mut sink).await.unwrap();

    assert_eq!(usage.prompt_token_count() as usize, question.len());
    assert_eq!(usage.response_token_count(), 0);
    assert_eq!(usage.total_price(), 0.0);
    assert!(sink.is_empty());
}

#[tokio::test]
async fn test_unauthorized() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(401).set_body_string("bad key"))
        .mount(&server)
        .await;
    let provider = create_provider(&server);

    let mut sink: Vec<u8> = Vec::new();
    let err = provider.answer("hi", &mut sink).await.unwrap_err();

    assert!(matches!(err, Error::Stream(StreamError::Unauthorized)));
    assert!(!err.is_retryable());
    assert!(sink.is_empty());
}

#[tokio::test]
async fn test_rate_limited_is_not_retried() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(429).insert_header("retry-after", "3"))
        .expect(1)
        .mount(&server)
        .await;
    let provider = create_provider(&server);

    let mut sink: Vec<u8> = Vec::new();
    let err = provider.answer("hi", &mut sink).await.unwrap_err();

    assert!(matches!(
        err,
        Error::Stream(StreamError::RateLimited { retry_after: Some(d) }) if d == Duration::from_secs(3)
    ));
    assert!(err.is_retryable());
}

#[tokio::test]
async fn test_api_error_message_extracted() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(400).set_body_json(serde_json::json!({
            "error": {"message": "unknown model mini"}
        })))
        .mount(&server)
        .await;
    let provider = create_provider(&server);

    let mut sink: Vec<u8> = Vec::new();
    let err = provider.answer("hi", &mut sink).await.unwrap_err();

    assert!(matches!(
        err,
        Error::Stream(StreamError::Api { status: 400, ref message }) if message == "unknown model mini"
    ));
}

#[tokio::test]
async fn test_error_event_mid_stream_keeps_partial_output() {
    let server = MockServer::start().await;
    let failure = r#"{"error":{"message":"upstream reset"}}"#;
    mount_stream(&server, sse(&[&delta("par"), failure, &delta("never")])).await;
    let provider = create_provider(&server);

    let mut sink: Vec<u8> = Vec::new();
    let err = provider.answer("hi", &mut sink).await.unwrap_err();

    assert!(matches!(
        err,
        Error::Stream(StreamError::Api { status: 0, ref message }) if message == "upstream reset"
    ));
    assert_eq!(String::from_utf8(sink).unwrap(), "event: message\ndata: par\n\n");
}
