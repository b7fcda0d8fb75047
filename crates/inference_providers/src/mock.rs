//! Mock implementation of InferenceProvider for testing
//!
//! This module provides a mock provider that generates realistic responses
//! without requiring a reachable upstream. Every call is recorded so tests can
//! assert how many upstream requests were made and what they contained.

use crate::{
    ChatCompletion, ChatCompletionParams, ChatResponseMessage, CompletionError, CompletionOutput,
    ConversationMessage, ContentPart, MessageRole, TokenUsage,
};
use async_trait::async_trait;
use std::sync::{
    atomic::{AtomicU64, Ordering},
    Arc,
};
use tokio::sync::Mutex;

/// Which upstream response shape the mock imitates
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ResponseShape {
    /// Completion-choice message object
    Choice,
    /// Raw generated-text field
    Generation,
}

/// Template for generating responses
#[derive(Clone, Debug)]
pub struct ResponseTemplate {
    content: String,
    shape: ResponseShape,
}

impl ResponseTemplate {
    /// Create a new response template with the given content
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            shape: ResponseShape::Choice,
        }
    }

    /// Answer with a raw generated-text field instead of a choice object
    pub fn as_generation(mut self) -> Self {
        self.shape = ResponseShape::Generation;
        self
    }

    fn generate(&self, id: String, model: String, input_tokens: i32) -> ChatCompletion {
        // Calculate output tokens as word count of content
        let output_tokens = self.content.split_whitespace().count() as i32;
        let finish_reason = Some("stop".to_string());

        let output = match self.shape {
            ResponseShape::Choice => CompletionOutput::Choice {
                message: ChatResponseMessage {
                    role: MessageRole::Assistant,
                    content: Some(self.content.clone()),
                },
                finish_reason,
            },
            ResponseShape::Generation => CompletionOutput::Generation {
                text: self.content.clone(),
                finish_reason,
            },
        };

        ChatCompletion {
            id: Some(id),
            model,
            output,
            usage: Some(TokenUsage::new(input_tokens, output_tokens)),
        }
    }
}

/// Configuration for the mock provider
struct MockConfig {
    default_response: ResponseTemplate,
    error_override: Option<CompletionError>,
}

/// Mock provider that implements InferenceProvider for testing
pub struct MockProvider {
    config: Arc<Mutex<MockConfig>>,
    /// Every request received, in arrival order
    calls: Arc<Mutex<Vec<ChatCompletionParams>>>,
    next_id: AtomicU64,
}

impl MockProvider {
    /// Create a new mock provider answering "1. 2. 3." to everything
    pub fn new() -> Self {
        Self::with_response(ResponseTemplate::new("1. 2. 3."))
    }

    pub fn with_response(response: ResponseTemplate) -> Self {
        Self {
            config: Arc::new(Mutex::new(MockConfig {
                default_response: response,
                error_override: None,
            })),
            calls: Arc::new(Mutex::new(Vec::new())),
            next_id: AtomicU64::new(1),
        }
    }

    /// Make every subsequent request fail with `error` (or succeed again with `None`)
    pub async fn set_error_override(&self, error: Option<CompletionError>) {
        let mut config = self.config.lock().await;
        config.error_override = error;
    }

    /// Requests received so far
    pub async fn calls(&self) -> Vec<ChatCompletionParams> {
        self.calls.lock().await.clone()
    }

    pub async fn call_count(&self) -> usize {
        self.calls.lock().await.len()
    }

    /// Generate a chat completion ID
    fn generate_chat_id(&self) -> String {
        let n = self.next_id.fetch_add(1, Ordering::Relaxed);
        format!("chatcmpl-mock-{n}")
    }

    /// Rough input token estimate: one token per whitespace-separated word
    fn count_input_tokens(messages: &[ConversationMessage]) -> i32 {
        let words: usize = messages
            .iter()
            .map(|message| match message {
                ConversationMessage::Structured(message) => message
                    .content
                    .iter()
                    .map(|part| match part {
                        ContentPart::Text { text } => text.split_whitespace().count(),
                        ContentPart::ImageUrl { .. } => 1,
                    })
                    .sum(),
                ConversationMessage::Raw(value) => value
                    .get("content")
                    .and_then(|c| c.as_str())
                    .map(|c| c.split_whitespace().count())
                    .unwrap_or(0),
            })
            .sum();
        words as i32
    }
}

impl Default for MockProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl crate::InferenceProvider for MockProvider {
    async fn chat_completion(
        &self,
        params: ChatCompletionParams,
    ) -> Result<ChatCompletion, CompletionError> {
        self.calls.lock().await.push(params.clone());

        let response_template = {
            let config = self.config.lock().await;
            if let Some(error) = &config.error_override {
                return Err(error.clone());
            }
            config.default_response.clone()
        };

        let input_tokens = Self::count_input_tokens(&params.messages);
        let id = self.generate_chat_id();

        Ok(response_template.generate(id, params.model, input_tokens))
    }
}
