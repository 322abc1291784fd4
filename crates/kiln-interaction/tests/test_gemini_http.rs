use std::sync::Arc;
use std::time::Duration;

use kiln_core::GenerationError;
use kiln_core::task_mode::TaskMode;
use kiln_interaction::{
    CompletionRequest, GeminiApiClient, GenerationClient, GenerationOptions, TextGenerator,
};
use serde_json::json;
use wiremock::matchers::{body_partial_json, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const MODEL: &str = "gemini-test";

async fn client_for(server: &MockServer) -> GeminiApiClient {
    GeminiApiClient::new("test-key", MODEL).with_base_url(server.uri())
}

fn request(prompt: &str) -> CompletionRequest {
    CompletionRequest::new(prompt, TaskMode::Coding.sampling())
}

#[tokio::test]
async fn test_successful_completion() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(format!("/{MODEL}:generateContent")))
        .and(query_param("key", "test-key"))
        .and(body_partial_json(json!({
            "contents": [{"parts": [{"text": "hello"}]}],
            "generationConfig": {"topK": 40, "candidateCount": 1}
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "candidates": [{"content": {"parts": [{"text": "Hi there"}]}, "finishReason": "STOP"}]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let text = client_for(&server).await.complete(request("hello")).await.unwrap();
    assert_eq!(text, "Hi there");
}

#[tokio::test]
async fn test_http_error_status_is_reported() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(429).set_body_json(json!({
            "error": {"code": 429, "message": "Quota exceeded", "status": "RESOURCE_EXHAUSTED"}
        })))
        .mount(&server)
        .await;

    let err = client_for(&server)
        .await
        .complete(request("hello"))
        .await
        .unwrap_err();
    assert_eq!(
        err,
        GenerationError::Http {
            status: 429,
            message: "RESOURCE_EXHAUSTED: Quota exceeded".into()
        }
    );
}

#[tokio::test]
async fn test_server_error_degrades_to_message() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(500).set_body_string("internal"))
        .mount(&server)
        .await;

    let client = GenerationClient::new(Arc::new(client_for(&server).await));
    let result = client
        .generate("Build a todo app", &[], &GenerationOptions::default())
        .await;

    assert!(result.files.is_empty());
    assert!(result.message.starts_with("I encountered an error:"));
    assert!(result.message.contains("500"));
}

#[tokio::test]
async fn test_safety_block_is_distinct() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "candidates": [{"finishReason": "SAFETY"}]
        })))
        .mount(&server)
        .await;

    let err = client_for(&server)
        .await
        .complete(request("hello"))
        .await
        .unwrap_err();
    assert!(err.is_safety_blocked());
}

#[tokio::test]
async fn test_malformed_body_is_decode_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
        .mount(&server)
        .await;

    let err = client_for(&server)
        .await
        .complete(request("hello"))
        .await
        .unwrap_err();
    assert!(matches!(err, GenerationError::Decode(_)));
    assert!(!err.to_string().contains("test-key"));
}

#[tokio::test]
async fn test_cancellation_interrupts_slow_call() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_delay(Duration::from_secs(30))
                .set_body_json(json!({"candidates": [{"content": {"parts": [{"text": "late"}]}}]})),
        )
        .mount(&server)
        .await;

    let client = GenerationClient::new(Arc::new(client_for(&server).await));
    let options = GenerationOptions::default();
    let cancel = options.cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(50)).await;
        cancel.cancel();
    });

    let err = client
        .try_generate("Build a todo app", &[], &options)
        .await
        .unwrap_err();
    assert_eq!(err, GenerationError::Cancelled);
}
