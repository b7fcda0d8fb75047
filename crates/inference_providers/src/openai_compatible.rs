use crate::{http, models::*, InferenceProvider};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

/// Configuration for an OpenAI-compatible chat completions endpoint
#[derive(Debug, Clone)]
pub struct OpenAiCompatibleConfig {
    /// Base URL including the API version prefix, e.g. `https://host/compatible-mode/v1`
    pub base_url: String,
    pub api_key: Option<String>,
    pub timeout_seconds: u64,
}

impl OpenAiCompatibleConfig {
    pub fn new(base_url: String, api_key: Option<String>, timeout_seconds: Option<u64>) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
            timeout_seconds: timeout_seconds.unwrap_or(60),
        }
    }
}

#[derive(Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: &'a [ConversationMessage],
    max_tokens: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    top_p: Option<f64>,
    stream: bool,
}

impl<'a> From<&'a ChatCompletionParams> for ChatCompletionRequest<'a> {
    fn from(params: &'a ChatCompletionParams) -> Self {
        let generation = &params.generation;
        // Greedy decoding: pin temperature to zero and leave nucleus sampling unset
        let (temperature, top_p) = if generation.do_sample {
            (Some(generation.temperature), Some(generation.top_p))
        } else {
            (Some(0.0), None)
        };

        Self {
            model: &params.model,
            messages: &params.messages,
            max_tokens: generation.max_tokens,
            temperature,
            top_p,
            stream: false,
        }
    }
}

/// Complete (non-streaming) chat completion response (matches OpenAI format)
#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    model: Option<String>,
    #[serde(default)]
    choices: Vec<ChatCompletionResponseChoice>,
    #[serde(default)]
    usage: Option<TokenUsage>,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponseChoice {
    message: ChatResponseMessage,
    #[serde(default)]
    finish_reason: Option<String>,
}

/// OpenAI-compatible provider implementation
///
/// Provides inference through the `/chat/completions` endpoint that Qwen's
/// compatible mode (and vLLM, and most hosted gateways) expose.
pub struct OpenAiCompatibleProvider {
    config: OpenAiCompatibleConfig,
    client: Client,
}

impl OpenAiCompatibleProvider {
    /// Create a new provider with the given configuration
    pub fn new(config: OpenAiCompatibleConfig) -> Result<Self, CompletionError> {
        let client = http::build_client(config.timeout_seconds)?;
        Ok(Self { config, client })
    }

    fn parse_response(
        raw_bytes: &[u8],
        requested_model: &str,
    ) -> Result<ChatCompletion, CompletionError> {
        let response: ChatCompletionResponse = serde_json::from_slice(raw_bytes)
            .map_err(|e| CompletionError::InvalidResponse(format!("Failed to parse response: {e}")))?;

        let choice = response.choices.into_iter().next().ok_or_else(|| {
            CompletionError::InvalidResponse("Response contained no choices".to_string())
        })?;

        Ok(ChatCompletion {
            id: response.id,
            model: response
                .model
                .unwrap_or_else(|| requested_model.to_string()),
            output: CompletionOutput::Choice {
                message: choice.message,
                finish_reason: choice.finish_reason,
            },
            usage: response.usage,
        })
    }
}

#[async_trait]
impl InferenceProvider for OpenAiCompatibleProvider {
    async fn chat_completion(
        &self,
        params: ChatCompletionParams,
    ) -> Result<ChatCompletion, CompletionError> {
        let url = format!("{}/chat/completions", self.config.base_url);
        tracing::debug!(url = %url, model = %params.model, "Sending chat completion request");

        let body = ChatCompletionRequest::from(&params);
        let raw_bytes =
            http::post_json(&self.client, &url, self.config.api_key.as_deref(), &body).await?;

        Self::parse_response(&raw_bytes, &params.model)
    }
}
