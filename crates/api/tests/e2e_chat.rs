mod common;

use axum::http::StatusCode;
use common::*;
use inference_providers::{
    mock::ResponseTemplate, CompletionError, ContentPart, ConversationMessage, MockProvider,
};
use serde_json::{json, Value};
use std::sync::Arc;

fn only_user_parts(message: &ConversationMessage) -> Vec<ContentPart> {
    match message {
        ConversationMessage::Structured(message) => message.content.clone(),
        other => panic!("expected structured message, got {other:?}"),
    }
}

// ============================================
// Health
// ============================================

#[tokio::test]
async fn test_health_returns_ok_without_upstream_call() {
    let (server, provider) = setup_test_server().await;

    let response = server.get("/health").await;

    assert_eq!(response.status_code(), StatusCode::OK);
    let body: Value = response.json();
    assert_eq!(body["status"], "ok");
    assert_timestamp(&body["timestamp"]);
    assert_eq!(provider.call_count().await, 0);
}

// ============================================
// POST /api/chat
// ============================================

#[tokio::test]
async fn test_chat_text_only() {
    let (server, provider) = setup_test_server().await;

    let response = server
        .post("/api/chat")
        .json(&json!({"message": "hello"}))
        .await;

    assert_eq!(response.status_code(), StatusCode::OK);
    let body: Value = response.json();
    assert_eq!(body["response"]["message"], "1. 2. 3.");
    assert_eq!(body["response"]["model"], TEST_MODEL);
    assert_eq!(body["response"]["finish_reason"], "stop");
    assert_timestamp(&body["timestamp"]);

    let calls = provider.calls().await;
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].model, TEST_MODEL);
    assert_eq!(calls[0].messages.len(), 1);
    assert_eq!(
        only_user_parts(&calls[0].messages[0]),
        vec![ContentPart::text("hello")]
    );
}

#[tokio::test]
async fn test_chat_with_image_sends_text_then_image() {
    let (server, provider) = setup_test_server().await;

    let response = server
        .post("/api/chat")
        .json(&json!({"message": "hello", "image_url": "http://x/y.png"}))
        .await;

    assert_eq!(response.status_code(), StatusCode::OK);

    let calls = provider.calls().await;
    assert_eq!(
        only_user_parts(&calls[0].messages[0]),
        vec![
            ContentPart::text("hello"),
            ContentPart::image_url("http://x/y.png")
        ]
    );
}

#[tokio::test]
async fn test_chat_rejects_invalid_message_without_upstream_call() {
    let (server, provider) = setup_test_server().await;

    for body in [
        json!({}),
        json!({"image_url": "http://x/y.png"}),
        json!({"message": ""}),
        json!({"message": 12}),
        json!({"message": null}),
        json!({"message": ["hello"]}),
    ] {
        let response = server.post("/api/chat").json(&body).await;

        assert_eq!(
            response.status_code(),
            StatusCode::BAD_REQUEST,
            "body: {body}"
        );
        let error: Value = response.json();
        assert_eq!(error["error"], "Message is required");
        assert!(error["details"].is_string());
        assert_timestamp(&error["timestamp"]);
    }

    assert_eq!(provider.call_count().await, 0);
}

#[tokio::test]
async fn test_chat_unparseable_json_is_unhandled_error() {
    let (server, provider) = setup_test_server().await;

    for path in ["/api/chat", "/api/chat/history"] {
        let response = server
            .post(path)
            .text("{\"message\": ")
            .content_type("application/json")
            .await;

        assert_eq!(
            response.status_code(),
            StatusCode::INTERNAL_SERVER_ERROR,
            "path: {path}"
        );
        let error: Value = response.json();
        assert_eq!(error["error"], "Something went wrong!");
        let details = error["details"].as_str().unwrap();
        assert!(!details.is_empty());
        assert!(!details.contains("field is missing"));
    }

    assert_eq!(provider.call_count().await, 0);
}

#[tokio::test]
async fn test_chat_without_json_content_type_has_no_fields() {
    let (server, provider) = setup_test_server().await;

    let response = server
        .post("/api/chat")
        .text(r#"{"message": "hello"}"#)
        .await;

    assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);
    let error: Value = response.json();
    assert_eq!(error["error"], "Message is required");
    assert_eq!(error["details"], "`message` field is missing");
    assert_eq!(provider.call_count().await, 0);
}

#[tokio::test]
async fn test_chat_upstream_status_is_propagated() {
    let (server, provider) = setup_test_server().await;
    let upstream_body = r#"{"error":{"message":"Rate limit reached"}}"#;
    provider
        .set_error_override(Some(CompletionError::HttpError {
            status_code: 429,
            message: upstream_body.to_string(),
        }))
        .await;

    let response = server
        .post("/api/chat")
        .json(&json!({"message": "hello"}))
        .await;

    assert_eq!(response.status_code(), StatusCode::TOO_MANY_REQUESTS);
    let error: Value = response.json();
    assert_eq!(error["error"], "Error processing request");
    assert_eq!(error["details"], upstream_body);
    assert_timestamp(&error["timestamp"]);
}

#[tokio::test]
async fn test_chat_upstream_failure_without_status_is_500() {
    let (server, provider) = setup_test_server().await;
    provider
        .set_error_override(Some(CompletionError::CompletionError(
            "Request failed: connection refused".to_string(),
        )))
        .await;

    let response = server
        .post("/api/chat")
        .json(&json!({"message": "hello"}))
        .await;

    assert_eq!(response.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
    let error: Value = response.json();
    assert_eq!(error["error"], "Error processing request");
    assert_eq!(error["details"], "Request failed: connection refused");
}

#[tokio::test]
async fn test_identical_chat_requests_both_reach_upstream() {
    let (server, provider) = setup_test_server().await;

    for _ in 0..2 {
        let response = server
            .post("/api/chat")
            .json(&json!({"message": "hello"}))
            .await;
        assert_eq!(response.status_code(), StatusCode::OK);
    }

    assert_eq!(provider.call_count().await, 2);
}

#[tokio::test]
async fn test_chat_generation_shaped_reply_is_normalized() {
    let provider = Arc::new(MockProvider::with_response(
        ResponseTemplate::new("A cat on a mat.").as_generation(),
    ));
    let server = setup_test_server_with(provider, test_config()).await;

    let response = server
        .post("/api/chat")
        .json(&json!({"message": "What is in this picture?", "image_url": "http://x/y.png"}))
        .await;

    assert_eq!(response.status_code(), StatusCode::OK);
    let body: Value = response.json();
    assert_eq!(body["response"]["message"], "A cat on a mat.");
    assert!(body["response"]["usage"]["total_tokens"].is_number());
}

// ============================================
// POST /api/chat/history
// ============================================

#[tokio::test]
async fn test_history_forwards_messages_unchanged() {
    let (server, provider) = setup_test_server().await;
    let messages = json!([
        {"role": "user", "content": "hello"},
        {"role": "assistant", "content": "hi!"},
        {"role": "user", "content": "how are you?"}
    ]);

    let response = server
        .post("/api/chat/history")
        .json(&json!({"messages": messages}))
        .await;

    assert_eq!(response.status_code(), StatusCode::OK);
    let body: Value = response.json();
    assert_eq!(body["response"]["message"], "1. 2. 3.");
    assert_timestamp(&body["timestamp"]);

    let calls = provider.calls().await;
    assert_eq!(calls.len(), 1);
    assert_eq!(serde_json::to_value(&calls[0].messages).unwrap(), messages);
}

#[tokio::test]
async fn test_history_rejects_non_array_messages() {
    let (server, provider) = setup_test_server().await;

    for body in [
        json!({}),
        json!({"messages": "hello"}),
        json!({"messages": {"role": "user", "content": "hello"}}),
        json!({"messages": 3}),
    ] {
        let response = server.post("/api/chat/history").json(&body).await;

        assert_eq!(
            response.status_code(),
            StatusCode::BAD_REQUEST,
            "body: {body}"
        );
        let error: Value = response.json();
        assert_eq!(error["error"], "Messages must be an array");
    }

    assert_eq!(provider.call_count().await, 0);
}

#[tokio::test]
async fn test_history_upstream_error_uses_history_message() {
    let (server, provider) = setup_test_server().await;
    provider
        .set_error_override(Some(CompletionError::HttpError {
            status_code: 401,
            message: "Invalid API-key provided.".to_string(),
        }))
        .await;

    let response = server
        .post("/api/chat/history")
        .json(&json!({"messages": [{"role": "user", "content": "hello"}]}))
        .await;

    assert_eq!(response.status_code(), StatusCode::UNAUTHORIZED);
    let error: Value = response.json();
    assert_eq!(error["error"], "Error processing chat history");
    assert_eq!(error["details"], "Invalid API-key provided.");
}

#[tokio::test]
async fn test_openapi_document_is_served() {
    let (server, _) = setup_test_server().await;

    let response = server.get("/api-docs/openapi.json").await;

    assert_eq!(response.status_code(), StatusCode::OK);
    let doc: Value = response.json();
    assert!(doc["paths"]["/api/chat"].is_object());
    assert!(doc["paths"]["/api/chat/history"].is_object());
    assert!(doc["paths"]["/health"].is_object());
}
