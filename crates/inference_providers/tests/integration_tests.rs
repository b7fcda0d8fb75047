//! Integration tests for the HTTP inference providers
//!
//! Each test runs the real provider against a local `httpmock` server, so the
//! full request/response path (headers, body, status handling) is exercised
//! without reaching a real upstream.
//! Run with: `cargo test --test integration_tests -- --nocapture`

use httpmock::prelude::*;
use inference_providers::{
    ChatCompletionParams, ChatMessage, CompletionError, CompletionOutput, ContentPart,
    ConversationMessage, DashScopeConfig, DashScopeProvider, GenerationParams, InferenceProvider,
    OpenAiCompatibleConfig, OpenAiCompatibleProvider, TokenUsage,
};
use serde_json::json;
use std::time::Duration;

fn vision_params() -> ChatCompletionParams {
    ChatCompletionParams {
        model: "qwen-vl-plus".to_string(),
        messages: vec![ChatMessage::user(vec![
            ContentPart::text("What is in this picture?"),
            ContentPart::image_url("http://x/y.png"),
        ])
        .into()],
        generation: GenerationParams {
            max_tokens: 128,
            temperature: 0.5,
            top_p: 0.5,
            do_sample: true,
        },
    }
}

fn openai_provider(base_url: String, timeout_seconds: u64) -> OpenAiCompatibleProvider {
    OpenAiCompatibleProvider::new(OpenAiCompatibleConfig::new(
        base_url,
        Some("sk-test".to_string()),
        Some(timeout_seconds),
    ))
    .expect("Failed to create provider")
}

#[tokio::test]
async fn test_openai_compatible_chat_completion() {
    let server = MockServer::start_async().await;
    let mock = server
        .mock_async(|when, then| {
            when.method(POST)
                .path("/v1/chat/completions")
                .header("authorization", "Bearer sk-test")
                .json_body(json!({
                    "model": "qwen-vl-plus",
                    "messages": [{
                        "role": "user",
                        "content": [
                            {"type": "text", "text": "What is in this picture?"},
                            {"type": "image_url", "image_url": {"url": "http://x/y.png"}}
                        ]
                    }],
                    "max_tokens": 128,
                    "temperature": 0.5,
                    "top_p": 0.5,
                    "stream": false
                }));
            then.status(200).json_body(json!({
                "id": "chatcmpl-1",
                "object": "chat.completion",
                "created": 1760402549,
                "model": "qwen-vl-plus",
                "choices": [{
                    "index": 0,
                    "message": {"role": "assistant", "content": "A cat."},
                    "finish_reason": "stop"
                }],
                "usage": {"prompt_tokens": 20, "completion_tokens": 3, "total_tokens": 23}
            }));
        })
        .await;

    let provider = openai_provider(server.url("/v1"), 5);
    let completion = provider.chat_completion(vision_params()).await.unwrap();

    mock.assert_async().await;
    assert_eq!(completion.id.as_deref(), Some("chatcmpl-1"));
    assert_eq!(completion.output.text(), Some("A cat."));
    assert_eq!(completion.usage, Some(TokenUsage::new(20, 3)));
}

#[tokio::test]
async fn test_openai_compatible_error_status_and_body_propagate() {
    let server = MockServer::start_async().await;
    let error_body = r#"{"error":{"message":"Rate limit reached","type":"rate_limit"}}"#;
    server
        .mock_async(|when, then| {
            when.method(POST).path("/v1/chat/completions");
            then.status(429).body(error_body);
        })
        .await;

    let provider = openai_provider(server.url("/v1"), 5);
    let err = provider.chat_completion(vision_params()).await.unwrap_err();

    assert_eq!(err.status_code(), Some(429));
    assert_eq!(err.details(), error_body);
}

#[tokio::test]
async fn test_openai_compatible_malformed_success_body() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(POST).path("/v1/chat/completions");
            then.status(200).body("not json at all");
        })
        .await;

    let provider = openai_provider(server.url("/v1"), 5);
    let err = provider.chat_completion(vision_params()).await.unwrap_err();

    assert!(matches!(err, CompletionError::InvalidResponse(_)));
    assert_eq!(err.status_code(), None);
}

#[tokio::test]
async fn test_openai_compatible_timeout_is_transport_error() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(POST).path("/v1/chat/completions");
            then.status(200)
                .delay(Duration::from_secs(3))
                .json_body(json!({"choices": []}));
        })
        .await;

    let provider = openai_provider(server.url("/v1"), 1);
    let err = provider.chat_completion(vision_params()).await.unwrap_err();

    assert!(matches!(err, CompletionError::CompletionError(_)));
}

#[tokio::test]
async fn test_unreachable_upstream_is_transport_error() {
    // Port 9 (discard) is not expected to accept HTTP connections
    let provider = openai_provider("http://127.0.0.1:9/v1".to_string(), 2);
    let err = provider.chat_completion(vision_params()).await.unwrap_err();

    assert!(matches!(err, CompletionError::CompletionError(_)));
    assert_eq!(err.status_code(), None);
}

#[tokio::test]
async fn test_dashscope_generation() {
    let server = MockServer::start_async().await;
    let mock = server
        .mock_async(|when, then| {
            when.method(POST)
                .path("/api/v1/services/aigc/text-generation/generation")
                .header("authorization", "Bearer sk-dash")
                .json_body(json!({
                    "model": "qwen-plus",
                    "input": {"messages": [
                        {"role": "user", "content": "hello"},
                        {"role": "assistant", "content": "hi!"},
                        {"role": "user", "content": "how are you?"}
                    ]},
                    "parameters": {
                        "result_format": "text",
                        "max_tokens": 128,
                        "temperature": 0.5,
                        "top_p": 0.5
                    }
                }));
            then.status(200).json_body(json!({
                "output": {"text": "Doing well.", "finish_reason": "stop"},
                "usage": {"input_tokens": 9, "output_tokens": 2, "total_tokens": 11},
                "request_id": "req-42"
            }));
        })
        .await;

    let provider = DashScopeProvider::new(DashScopeConfig::new(
        server.url("/api/v1"),
        Some("sk-dash".to_string()),
        Some(5),
    ))
    .unwrap();

    let mut params = vision_params();
    params.model = "qwen-plus".to_string();
    params.messages = vec![
        ConversationMessage::Raw(json!({"role": "user", "content": "hello"})),
        ConversationMessage::Raw(json!({"role": "assistant", "content": "hi!"})),
        ConversationMessage::Raw(json!({"role": "user", "content": "how are you?"})),
    ];

    let completion = provider.chat_completion(params).await.unwrap();

    mock.assert_async().await;
    assert_eq!(completion.id.as_deref(), Some("req-42"));
    assert_eq!(
        completion.output,
        CompletionOutput::Generation {
            text: "Doing well.".to_string(),
            finish_reason: Some("stop".to_string()),
        }
    );
}

#[tokio::test]
async fn test_dashscope_vision_request_uses_multimodal_api() {
    let server = MockServer::start_async().await;
    let mock = server
        .mock_async(|when, then| {
            when.method(POST)
                .path("/api/v1/services/aigc/multimodal-generation/generation")
                .header("authorization", "Bearer sk-dash")
                .json_body(json!({
                    "model": "qwen-vl-plus",
                    "input": {"messages": [{
                        "role": "user",
                        "content": [
                            {"text": "What is in this picture?"},
                            {"image": "http://x/y.png"}
                        ]
                    }]},
                    "parameters": {
                        "max_tokens": 128,
                        "temperature": 0.5,
                        "top_p": 0.5
                    }
                }));
            then.status(200).json_body(json!({
                "output": {"choices": [{
                    "finish_reason": "stop",
                    "message": {"role": "assistant", "content": [{"text": "A cat."}]}
                }]},
                "usage": {"input_tokens": 1250, "output_tokens": 3},
                "request_id": "req-mm"
            }));
        })
        .await;

    let provider = DashScopeProvider::new(DashScopeConfig::new(
        server.url("/api/v1"),
        Some("sk-dash".to_string()),
        Some(5),
    ))
    .unwrap();

    let completion = provider.chat_completion(vision_params()).await.unwrap();

    mock.assert_async().await;
    assert_eq!(completion.id.as_deref(), Some("req-mm"));
    assert_eq!(completion.output.text(), Some("A cat."));
    assert_eq!(completion.usage, Some(TokenUsage::new(1250, 3)));
}

#[tokio::test]
async fn test_dashscope_error_body_is_unmodified() {
    let server = MockServer::start_async().await;
    let error_body =
        r#"{"code":"InvalidApiKey","message":"Invalid API-key provided.","request_id":"r-1"}"#;
    server
        .mock_async(|when, then| {
            when.method(POST)
                .path("/api/v1/services/aigc/multimodal-generation/generation");
            then.status(401).body(error_body);
        })
        .await;

    let provider = DashScopeProvider::new(DashScopeConfig::new(
        server.url("/api/v1"),
        None,
        Some(5),
    ))
    .unwrap();
    let err = provider.chat_completion(vision_params()).await.unwrap_err();

    assert_eq!(
        err,
        CompletionError::HttpError {
            status_code: 401,
            message: error_body.to_string(),
        }
    );
}
