//! Inference providers crate for talking to Qwen inference backends
//!
//! This crate defines a single-method trait, [`InferenceProvider`], that turns a
//! [`ChatCompletionParams`] into a [`ChatCompletion`] or a [`CompletionError`].
//! Two HTTP backends implement it:
//!
//! - [`OpenAiCompatibleProvider`] posts to `{base_url}/chat/completions` and
//!   answers with a completion-choice message object.
//! - [`DashScopeProvider`] posts to the DashScope text-generation API and
//!   answers with a raw generated-text field.
//!
//! Both shapes are folded into the tagged [`CompletionOutput`] so callers never
//! depend on which backend answered. [`MockProvider`] implements the same trait
//! for tests.
//!
//! # Usage
//!
//! ```rust,ignore
//! use inference_providers::{
//!     ChatCompletionParams, ChatMessage, ContentPart, GenerationParams, InferenceProvider,
//! };
//!
//! async fn example<P: InferenceProvider>(provider: P) {
//!     let params = ChatCompletionParams {
//!         model: "qwen-vl-plus".to_string(),
//!         messages: vec![ChatMessage::user(vec![ContentPart::text("Hello")]).into()],
//!         generation: GenerationParams::default(),
//!     };
//!
//!     match provider.chat_completion(params).await {
//!         Ok(completion) => println!("{:?}", completion.output.text()),
//!         Err(e) => eprintln!("upstream failed: {e}"),
//!     }
//! }
//! ```

pub mod dashscope;
mod http;
pub mod mock;
pub mod models;
pub mod openai_compatible;

use async_trait::async_trait;

// Re-export commonly used types for convenience
pub use dashscope::{DashScopeConfig, DashScopeProvider};
pub use mock::MockProvider;
pub use models::{
    ChatCompletion, ChatCompletionParams, ChatMessage, ChatResponseMessage, CompletionError,
    CompletionOutput, ContentPart, ConversationMessage, GenerationParams, ImageUrl, MessageRole,
    TokenUsage,
};
pub use openai_compatible::{OpenAiCompatibleConfig, OpenAiCompatibleProvider};

#[async_trait]
pub trait InferenceProvider: Send + Sync {
    /// Performs a single, non-streaming chat completion request
    ///
    /// Implementations must not retry; every failure is returned to the caller
    /// as soon as it is observed.
    async fn chat_completion(
        &self,
        params: ChatCompletionParams,
    ) -> Result<ChatCompletion, CompletionError>;
}
