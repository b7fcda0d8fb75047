use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[cfg(any(test, feature = "test-mocks"))]
use mockall::automock;

/// Client-facing validation message for `/api/chat`
pub const MESSAGE_REQUIRED: &str = "Message is required";
/// Client-facing validation message for `/api/chat/history`
pub const MESSAGES_MUST_BE_ARRAY: &str = "Messages must be an array";

// Error types
#[derive(Debug, thiserror::Error)]
pub enum ChatError {
    /// The client input failed a precondition; nothing was sent upstream
    #[error("{message}: {details}")]
    Validation {
        message: &'static str,
        details: String,
    },

    /// The upstream call failed or produced no usable completion
    #[error("Upstream inference failed: {details}")]
    Upstream {
        /// Upstream HTTP status, when the failure came from an HTTP response
        status: Option<u16>,
        /// Upstream error body or failure message, unmodified
        details: String,
    },
}

impl From<inference_providers::CompletionError> for ChatError {
    fn from(error: inference_providers::CompletionError) -> Self {
        Self::Upstream {
            status: error.status_code(),
            details: error.details().to_string(),
        }
    }
}

/// A single chat submission.
///
/// Fields are kept as raw JSON so that missing and mistyped values are both
/// reported through [`ChatError::Validation`] rather than a deserializer error.
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct ChatRequest {
    /// The user's message; must be a non-empty string
    #[serde(default)]
    #[schema(value_type = String, example = "What is in this picture?")]
    pub message: Option<serde_json::Value>,
    /// Optional image reference forwarded alongside the message
    #[serde(default)]
    #[schema(value_type = Option<String>, example = "https://example.com/cat.png")]
    pub image_url: Option<serde_json::Value>,
}

/// A full conversation submitted by the client
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct ChatHistoryRequest {
    /// Ordered role/content pairs, forwarded to the model unchanged
    #[serde(default)]
    #[schema(value_type = Vec<Object>)]
    pub messages: Option<serde_json::Value>,
}

/// Token accounting reported by the upstream
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ChatUsage {
    pub prompt_tokens: i32,
    pub completion_tokens: i32,
    pub total_tokens: i32,
}

impl From<inference_providers::TokenUsage> for ChatUsage {
    fn from(usage: inference_providers::TokenUsage) -> Self {
        Self {
            prompt_tokens: usage.prompt_tokens,
            completion_tokens: usage.completion_tokens,
            total_tokens: usage.total_tokens,
        }
    }
}

/// Normalized model output, independent of the upstream API shape
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ChatReply {
    /// Generated text
    pub message: String,
    /// Model that produced the reply
    pub model: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub finish_reason: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub usage: Option<ChatUsage>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ChatResponse {
    pub reply: ChatReply,
    pub created_at: DateTime<Utc>,
}

// Port/Trait definitions

#[cfg_attr(any(test, feature = "test-mocks"), automock)]
#[async_trait]
pub trait ChatServiceTrait: Send + Sync {
    /// Validate a single message, send it upstream, and normalize the reply
    async fn chat(&self, request: ChatRequest) -> Result<ChatResponse, ChatError>;

    /// Send a client-supplied conversation upstream unchanged
    async fn chat_history(&self, request: ChatHistoryRequest) -> Result<ChatResponse, ChatError>;
}
