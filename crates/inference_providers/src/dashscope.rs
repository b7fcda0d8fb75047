use crate::{http, models::*, InferenceProvider};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;

const TEXT_GENERATION_PATH: &str = "/services/aigc/text-generation/generation";
const MULTIMODAL_GENERATION_PATH: &str = "/services/aigc/multimodal-generation/generation";

/// Configuration for the hosted DashScope API
#[derive(Debug, Clone)]
pub struct DashScopeConfig {
    /// API root, e.g. `https://dashscope-intl.aliyuncs.com/api/v1`
    pub base_url: String,
    pub api_key: Option<String>,
    pub timeout_seconds: u64,
}

impl DashScopeConfig {
    pub fn new(base_url: String, api_key: Option<String>, timeout_seconds: Option<u64>) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
            timeout_seconds: timeout_seconds.unwrap_or(60),
        }
    }
}

/// The DashScope generation API a request is sent to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum GenerationApi {
    Text,
    Multimodal,
}

impl GenerationApi {
    /// Vision models and any request carrying an image go to the multimodal API
    fn for_params(params: &ChatCompletionParams) -> Self {
        let has_image = params.messages.iter().any(|message| match message {
            ConversationMessage::Structured(message) => message
                .content
                .iter()
                .any(|part| matches!(part, ContentPart::ImageUrl { .. })),
            ConversationMessage::Raw(_) => false,
        });

        if has_image || is_vision_model(&params.model) {
            Self::Multimodal
        } else {
            Self::Text
        }
    }

    fn path(self) -> &'static str {
        match self {
            Self::Text => TEXT_GENERATION_PATH,
            Self::Multimodal => MULTIMODAL_GENERATION_PATH,
        }
    }
}

fn is_vision_model(model: &str) -> bool {
    let model = model.to_ascii_lowercase();
    model.contains("-vl") || model.starts_with("qvq")
}

/// Native content part: `{"text": ..}` or `{"image": ..}`
#[derive(Debug, Serialize)]
#[serde(rename_all = "snake_case")]
enum NativePart<'a> {
    Text(&'a str),
    Image(&'a str),
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
enum NativeContent<'a> {
    Text(String),
    Parts(Vec<NativePart<'a>>),
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
enum NativeMessage<'a> {
    Structured {
        role: MessageRole,
        content: NativeContent<'a>,
    },
    /// Client-supplied history entries go out exactly as received
    Raw(&'a Value),
}

impl<'a> NativeMessage<'a> {
    fn new(message: &'a ConversationMessage, api: GenerationApi) -> Self {
        let message = match message {
            ConversationMessage::Structured(message) => message,
            ConversationMessage::Raw(value) => return Self::Raw(value),
        };

        let content = match api {
            GenerationApi::Text => NativeContent::Text(
                message
                    .content
                    .iter()
                    .filter_map(|part| match part {
                        ContentPart::Text { text } => Some(text.as_str()),
                        ContentPart::ImageUrl { .. } => None,
                    })
                    .collect::<Vec<_>>()
                    .join("\n"),
            ),
            GenerationApi::Multimodal => NativeContent::Parts(
                message
                    .content
                    .iter()
                    .map(|part| match part {
                        ContentPart::Text { text } => NativePart::Text(text),
                        ContentPart::ImageUrl { image_url } => NativePart::Image(&image_url.url),
                    })
                    .collect(),
            ),
        };

        Self::Structured {
            role: message.role,
            content,
        }
    }
}

#[derive(Serialize)]
struct GenerationRequest<'a> {
    model: &'a str,
    input: GenerationInput<'a>,
    parameters: GenerationParameters,
}

#[derive(Serialize)]
struct GenerationInput<'a> {
    messages: Vec<NativeMessage<'a>>,
}

#[derive(Serialize)]
struct GenerationParameters {
    /// Only the text API accepts `result_format: "text"`
    #[serde(skip_serializing_if = "Option::is_none")]
    result_format: Option<&'static str>,
    max_tokens: i64,
    temperature: f64,
    top_p: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    top_k: Option<u32>,
}

impl<'a> GenerationRequest<'a> {
    fn new(params: &'a ChatCompletionParams, api: GenerationApi) -> Self {
        let generation = &params.generation;
        Self {
            model: &params.model,
            input: GenerationInput {
                messages: params
                    .messages
                    .iter()
                    .map(|message| NativeMessage::new(message, api))
                    .collect(),
            },
            parameters: GenerationParameters {
                result_format: (api == GenerationApi::Text).then_some("text"),
                max_tokens: generation.max_tokens,
                temperature: generation.temperature,
                top_p: generation.top_p,
                // top_k = 1 makes DashScope decode greedily
                top_k: (!generation.do_sample).then_some(1),
            },
        }
    }
}

#[derive(Debug, Deserialize)]
struct GenerationResponse {
    #[serde(default)]
    request_id: Option<String>,
    #[serde(default)]
    output: Option<GenerationOutput>,
    #[serde(default)]
    usage: Option<GenerationUsage>,
}

#[derive(Debug, Deserialize)]
struct GenerationOutput {
    /// Text API answer
    #[serde(default)]
    text: Option<String>,
    #[serde(default)]
    finish_reason: Option<String>,
    /// Multimodal API answer
    #[serde(default)]
    choices: Vec<GenerationChoice>,
}

#[derive(Debug, Deserialize)]
struct GenerationChoice {
    #[serde(default)]
    finish_reason: Option<String>,
    message: GenerationChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct GenerationChoiceMessage {
    /// Either a string or a list of `{"text": ..}` parts
    #[serde(default)]
    content: Value,
}

impl GenerationChoiceMessage {
    fn text(&self) -> Option<String> {
        match &self.content {
            Value::String(text) => Some(text.clone()),
            Value::Array(parts) => Some(
                parts
                    .iter()
                    .filter_map(|part| part.get("text").and_then(Value::as_str))
                    .collect(),
            ),
            _ => None,
        }
    }
}

#[derive(Debug, Deserialize)]
struct GenerationUsage {
    #[serde(default)]
    input_tokens: i32,
    #[serde(default)]
    output_tokens: i32,
}

/// DashScope provider implementation
///
/// Text-only requests use the text-generation API with `result_format: "text"`,
/// which answers under `output.text`. Vision models and requests with images use
/// the multimodal-generation API, which answers with `output.choices`.
pub struct DashScopeProvider {
    config: DashScopeConfig,
    client: Client,
}

impl DashScopeProvider {
    pub fn new(config: DashScopeConfig) -> Result<Self, CompletionError> {
        let client = http::build_client(config.timeout_seconds)?;
        Ok(Self { config, client })
    }

    fn parse_response(raw_bytes: &[u8], model: &str) -> Result<ChatCompletion, CompletionError> {
        let response: GenerationResponse = serde_json::from_slice(raw_bytes)
            .map_err(|e| CompletionError::InvalidResponse(format!("Failed to parse response: {e}")))?;

        let output = response.output.ok_or_else(|| {
            CompletionError::InvalidResponse("Response contained no output".to_string())
        })?;

        let output = match (output.text, output.choices.into_iter().next()) {
            (Some(text), _) => CompletionOutput::Generation {
                text,
                finish_reason: output.finish_reason,
            },
            (None, Some(choice)) => CompletionOutput::Choice {
                message: ChatResponseMessage {
                    role: MessageRole::Assistant,
                    content: choice.message.text(),
                },
                finish_reason: choice.finish_reason,
            },
            (None, None) => {
                return Err(CompletionError::InvalidResponse(
                    "Response output contained no text".to_string(),
                ))
            }
        };

        Ok(ChatCompletion {
            id: response.request_id,
            model: model.to_string(),
            output,
            usage: response
                .usage
                .map(|u| TokenUsage::new(u.input_tokens, u.output_tokens)),
        })
    }
}

#[async_trait]
impl InferenceProvider for DashScopeProvider {
    async fn chat_completion(
        &self,
        params: ChatCompletionParams,
    ) -> Result<ChatCompletion, CompletionError> {
        let api = GenerationApi::for_params(&params);
        let url = format!("{}{}", self.config.base_url, api.path());
        tracing::debug!(url = %url, model = %params.model, api = ?api, "Sending DashScope generation request");

        let body = GenerationRequest::new(&params, api);
        let raw_bytes =
            http::post_json(&self.client, &url, self.config.api_key.as_deref(), &body).await?;

        Self::parse_response(&raw_bytes, &params.model)
    }
}
