/*!
 * Tests for backend client implementations
 *
 * HTTP clients are exercised against a one-shot local server that answers
 * with a canned response.
 */

use serde_json::json;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

use transgate::errors::ProviderError;
use transgate::providers::anthropic::Anthropic;
use transgate::providers::google::GoogleTranslate;
use transgate::providers::mock::MockBackend;
use transgate::providers::openai::OpenAI;
use transgate::providers::{BackendRequest, ModelOptions, TranslationBackend};

/// Serve one HTTP response, returning the base URL and the captured request
async fn serve_once(
    status: &'static str,
    body: String,
) -> (String, tokio::task::JoinHandle<String>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let address = listener.local_addr().unwrap();

    let handle = tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();
        let mut received = Vec::new();
        let mut buffer = [0u8; 4096];

        // Read headers, then as much body as Content-Length announces
        loop {
            let n = socket.read(&mut buffer).await.unwrap();
            if n == 0 {
                break;
            }
            received.extend_from_slice(&buffer[..n]);
            let text = String::from_utf8_lossy(&received).to_string();
            if let Some(end) = text.find("\r\n\r\n") {
                let content_length = text[..end]
                    .lines()
                    .find_map(|line| {
                        let lower = line.to_ascii_lowercase();
                        lower
                            .strip_prefix("content-length:")
                            .map(|v| v.trim().parse::<usize>().unwrap_or(0))
                    })
                    .unwrap_or(0);
                if received.len() >= end + 4 + content_length {
                    break;
                }
            }
        }

        let response = format!(
            "HTTP/1.1 {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
            status,
            body.len(),
            body
        );
        socket.write_all(response.as_bytes()).await.unwrap();
        socket.shutdown().await.ok();

        String::from_utf8_lossy(&received).to_string()
    });

    (format!("http://{}", address), handle)
}

fn model_options() -> ModelOptions {
    ModelOptions {
        model: "test-model".to_string(),
        temperature: 0.3,
        system_prompt: "Translate from {source_language} to {target_language}. {instruction}"
            .to_string(),
        timeout_secs: 5,
    }
}

#[tokio::test]
async fn test_googleTranslate_withSegmentedBody_shouldJoinSegments() {
    let body = json!([[["Bonjour ", "Hello ", null], ["le monde", "world", null]], null, "en"]);
    let (endpoint, server) = serve_once("200 OK", body.to_string()).await;
    let backend = GoogleTranslate::new(endpoint, 5);

    let response = backend
        .translate(BackendRequest::new("Hello world", "en", "fr"))
        .await
        .unwrap();

    assert_eq!(response.text, "Bonjour le monde");
    assert!(response.usage.is_none());

    let request = server.await.unwrap();
    assert!(request.starts_with("GET /translate_a/single?"));
    assert!(request.contains("client=gtx"));
    assert!(request.contains("tl=fr"));
    assert!(request.contains("q=Hello+world"));
}

#[tokio::test]
async fn test_googleTranslate_withChineseTarget_shouldSendRegionalCode() {
    let body = json!([[["你好", "hello", null]]]);
    let (endpoint, server) = serve_once("200 OK", body.to_string()).await;
    let backend = GoogleTranslate::new(endpoint, 5);

    backend
        .translate(BackendRequest::new("hello", "en", "zh"))
        .await
        .unwrap();

    assert!(server.await.unwrap().contains("tl=zh-CN"));
}

#[tokio::test]
async fn test_googleTranslate_withBadRequest_shouldReportUnsupportedLanguage() {
    let (endpoint, _server) = serve_once("400 Bad Request", "{}".to_string()).await;
    let backend = GoogleTranslate::new(endpoint, 5);

    let err = backend
        .translate(BackendRequest::new("hello", "en", "xx"))
        .await
        .unwrap_err();

    assert!(matches!(err, ProviderError::UnsupportedLanguage { .. }));
}

#[tokio::test]
async fn test_openAI_withSuccessfulResponse_shouldReturnTextAndUsage() {
    let body = json!({
        "choices": [{"message": {"role": "assistant", "content": "Bonjour"}}],
        "usage": {"prompt_tokens": 12, "completion_tokens": 3}
    });
    let (endpoint, server) = serve_once("200 OK", body.to_string()).await;
    let backend = OpenAI::new("sk-test", endpoint, model_options());

    let response = backend
        .translate(BackendRequest::new("Hello", "en", "fr").with_instruction("Keep it warm."))
        .await
        .unwrap();

    assert_eq!(response.text, "Bonjour");
    assert_eq!(response.usage.map(|u| u.total()), Some(15));

    let request = server.await.unwrap();
    assert!(request.starts_with("POST /v1/chat/completions"));
    assert!(request.to_ascii_lowercase().contains("authorization: bearer sk-test"));
    assert!(request.contains("Translate from English to French. Keep it warm."));
}

#[tokio::test]
async fn test_openAI_withRateLimit_shouldMapStatus() {
    let (endpoint, _server) = serve_once("429 Too Many Requests", "{\"error\":\"slow\"}".to_string()).await;
    let backend = OpenAI::new("sk-test", endpoint, model_options());

    let err = backend
        .translate(BackendRequest::new("Hello", "en", "fr"))
        .await
        .unwrap_err();

    assert!(matches!(err, ProviderError::RateLimitExceeded(_)));
}

#[tokio::test]
async fn test_openAI_withoutApiKey_shouldFailBeforeRequest() {
    let backend = OpenAI::new("", "http://127.0.0.1:9", model_options());

    let err = backend
        .translate(BackendRequest::new("Hello", "en", "fr"))
        .await
        .unwrap_err();

    assert!(matches!(err, ProviderError::AuthenticationError(_)));
}

#[tokio::test]
async fn test_anthropic_withSuccessfulResponse_shouldReturnTextAndUsage() {
    let body = json!({
        "content": [{"type": "text", "text": "Hallo"}],
        "usage": {"input_tokens": 20, "output_tokens": 4}
    });
    let (endpoint, server) = serve_once("200 OK", body.to_string()).await;
    let backend = Anthropic::new("ak-test", endpoint, model_options());

    let response = backend
        .translate(BackendRequest::new("Hello", "en", "de"))
        .await
        .unwrap();

    assert_eq!(response.text, "Hallo");
    assert_eq!(response.usage.map(|u| u.total()), Some(24));

    let request = server.await.unwrap().to_ascii_lowercase();
    assert!(request.starts_with("post /v1/messages"));
    assert!(request.contains("x-api-key: ak-test"));
}

#[tokio::test]
async fn test_anthropic_withEmptyContent_shouldReportEmptyResponse() {
    let body = json!({"content": [], "usage": {"input_tokens": 5, "output_tokens": 0}});
    let (endpoint, _server) = serve_once("200 OK", body.to_string()).await;
    let backend = Anthropic::new("ak-test", endpoint, model_options());

    let err = backend
        .translate(BackendRequest::new("Hello", "en", "de"))
        .await
        .unwrap_err();

    assert!(matches!(err, ProviderError::EmptyResponse));
}

#[tokio::test]
async fn test_mockBackend_clones_shouldShareCounters() {
    let backend = MockBackend::working().with_usage(3, 4);
    let observer = backend.clone();

    backend.translate(BackendRequest::new("a", "en", "fr")).await.unwrap();
    backend.translate(BackendRequest::new("b", "en", "fr")).await.unwrap();

    assert_eq!(observer.call_count(), 2);
    assert_eq!(observer.requests()[1].text, "b");
}

#[tokio::test]
async fn test_mockBackend_intermittent_shouldFailEveryNth() {
    let backend = MockBackend::intermittent(3);
    let mut failures = 0;
    for _ in 0..6 {
        if backend.translate(BackendRequest::new("x", "en", "fr")).await.is_err() {
            failures += 1;
        }
    }
    assert_eq!(failures, 2);
}
