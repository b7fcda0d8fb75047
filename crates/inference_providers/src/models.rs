use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    System,
    User,
    Assistant,
}

/// A single part of a multi-part message content (matches the OpenAI vision format)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentPart {
    Text { text: String },
    ImageUrl { image_url: ImageUrl },
}

impl ContentPart {
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text { text: text.into() }
    }

    pub fn image_url(url: impl Into<String>) -> Self {
        Self::ImageUrl {
            image_url: ImageUrl { url: url.into() },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageUrl {
    pub url: String,
}

/// Upstream message with structured multi-part content
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: MessageRole,
    pub content: Vec<ContentPart>,
}

impl ChatMessage {
    pub fn user(content: Vec<ContentPart>) -> Self {
        Self {
            role: MessageRole::User,
            content,
        }
    }
}

/// A conversation entry sent upstream.
///
/// `Raw` entries come straight from a client-supplied history and are
/// serialized exactly as received.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ConversationMessage {
    Structured(ChatMessage),
    Raw(serde_json::Value),
}

impl From<ChatMessage> for ConversationMessage {
    fn from(message: ChatMessage) -> Self {
        Self::Structured(message)
    }
}

/// Fixed generation settings applied to every upstream call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationParams {
    /// Maximum number of output tokens
    pub max_tokens: i64,
    /// Sampling temperature
    pub temperature: f64,
    /// Nucleus sampling parameter (0-1)
    pub top_p: f64,
    /// When false, backends request greedy decoding
    pub do_sample: bool,
}

impl Default for GenerationParams {
    fn default() -> Self {
        Self {
            max_tokens: 1024,
            temperature: 0.7,
            top_p: 0.8,
            do_sample: true,
        }
    }
}

/// Parameters for a (non-streaming) chat completion request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatCompletionParams {
    /// Model ID to use for the completion
    pub model: String,

    /// Conversation sent to the model, in order
    pub messages: Vec<ConversationMessage>,

    pub generation: GenerationParams,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TokenUsage {
    pub prompt_tokens: i32,
    pub completion_tokens: i32,
    pub total_tokens: i32,
}

impl TokenUsage {
    pub fn new(prompt_tokens: i32, completion_tokens: i32) -> Self {
        Self {
            prompt_tokens,
            completion_tokens,
            total_tokens: prompt_tokens.saturating_add(completion_tokens),
        }
    }
}

/// Message in a complete chat completion response
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatResponseMessage {
    /// Role of the message sender
    pub role: MessageRole,

    /// Text content of the message
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
}

/// The model output, in whichever shape the upstream API produced it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CompletionOutput {
    /// Raw generated-text field (DashScope `output.text`)
    Generation {
        text: String,
        finish_reason: Option<String>,
    },
    /// Completion-choice message object (OpenAI-compatible `choices[0].message`)
    Choice {
        message: ChatResponseMessage,
        finish_reason: Option<String>,
    },
}

impl CompletionOutput {
    /// Generated text, if the upstream produced any
    pub fn text(&self) -> Option<&str> {
        match self {
            Self::Generation { text, .. } => Some(text.as_str()),
            Self::Choice { message, .. } => message.content.as_deref(),
        }
    }

    pub fn finish_reason(&self) -> Option<&str> {
        match self {
            Self::Generation { finish_reason, .. } | Self::Choice { finish_reason, .. } => {
                finish_reason.as_deref()
            }
        }
    }
}

/// Result of a successful upstream call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatCompletion {
    /// Upstream request/completion identifier, when provided
    pub id: Option<String>,
    /// Model that answered
    pub model: String,
    pub output: CompletionOutput,
    pub usage: Option<TokenUsage>,
}

#[derive(Debug, Error, Clone, PartialEq, Serialize, Deserialize)]
pub enum CompletionError {
    /// Transport-level failure (connect, timeout, body read)
    #[error("Failed to perform completion: {0}")]
    CompletionError(String),
    /// Upstream answered with a non-success status; `message` is the raw body
    #[error("HTTP {status_code}: {message}")]
    HttpError { status_code: u16, message: String },
    /// Upstream answered 2xx but the body was not a usable completion
    #[error("Invalid response format: {0}")]
    InvalidResponse(String),
}

impl CompletionError {
    /// Upstream HTTP status, if the failure came from an HTTP response
    pub fn status_code(&self) -> Option<u16> {
        match self {
            Self::HttpError { status_code, .. } => Some(*status_code),
            _ => None,
        }
    }

    /// Opaque details: the upstream error body or the failure message
    pub fn details(&self) -> &str {
        match self {
            Self::CompletionError(message)
            | Self::InvalidResponse(message)
            | Self::HttpError { message, .. } => message,
        }
    }
}
