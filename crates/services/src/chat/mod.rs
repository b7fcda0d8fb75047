pub mod ports;

use chrono::Utc;
use inference_providers::{
    ChatCompletion, ChatCompletionParams, ChatMessage, ContentPart, ConversationMessage,
    GenerationParams, InferenceProvider,
};
use ports::{
    ChatError, ChatHistoryRequest, ChatReply, ChatRequest, ChatResponse, MESSAGES_MUST_BE_ARRAY,
    MESSAGE_REQUIRED,
};
use serde_json::Value;
use std::sync::Arc;

/// Fixed model and generation parameters used for every upstream call
#[derive(Debug, Clone, PartialEq)]
pub struct ChatSettings {
    pub model: String,
    pub generation: GenerationParams,
}

impl From<&config::UpstreamConfig> for ChatSettings {
    fn from(config: &config::UpstreamConfig) -> Self {
        Self {
            model: config.model.clone(),
            generation: GenerationParams {
                max_tokens: config.max_tokens,
                temperature: config.temperature,
                top_p: config.top_p,
                do_sample: config.do_sample,
            },
        }
    }
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Check the submission and borrow its message and optional image reference.
///
/// A present `image_url` that is not a string is ignored rather than rejected.
pub fn validate_chat_request(request: &ChatRequest) -> Result<(&str, Option<&str>), ChatError> {
    let details = match &request.message {
        Some(Value::String(message)) if !message.is_empty() => {
            let image_url = request.image_url.as_ref().and_then(Value::as_str);
            return Ok((message.as_str(), image_url));
        }
        Some(Value::String(_)) => "`message` must not be empty".to_string(),
        None => "`message` field is missing".to_string(),
        Some(other) => format!("`message` must be a string, got {}", json_type_name(other)),
    };

    Err(ChatError::Validation {
        message: MESSAGE_REQUIRED,
        details,
    })
}

/// Build the upstream user message: text first, then the image if one was given
pub fn build_user_message(message: &str, image_url: Option<&str>) -> ChatMessage {
    let mut content = vec![ContentPart::text(message)];
    if let Some(url) = image_url {
        content.push(ContentPart::image_url(url));
    }
    ChatMessage::user(content)
}

/// Take the client's conversation as-is; only its array-ness is checked
pub fn extract_history(request: ChatHistoryRequest) -> Result<Vec<ConversationMessage>, ChatError> {
    match request.messages {
        Some(Value::Array(messages)) => Ok(messages.into_iter().map(ConversationMessage::Raw).collect()),
        other => Err(ChatError::Validation {
            message: MESSAGES_MUST_BE_ARRAY,
            details: match other {
                None => "`messages` field is missing".to_string(),
                Some(value) => format!(
                    "`messages` must be an array, got {}",
                    json_type_name(&value)
                ),
            },
        }),
    }
}

/// Fold whichever upstream shape answered into a `ChatReply`
fn normalize_completion(completion: ChatCompletion) -> Result<ChatReply, ChatError> {
    let message = match completion.output.text() {
        Some(text) if !text.is_empty() => text.to_string(),
        _ => {
            return Err(ChatError::Upstream {
                status: None,
                details: "Upstream returned an empty completion".to_string(),
            })
        }
    };

    Ok(ChatReply {
        message,
        model: completion.model,
        finish_reason: completion.output.finish_reason().map(str::to_string),
        usage: completion.usage.map(Into::into),
    })
}

pub struct ChatServiceImpl {
    pub inference_provider: Arc<dyn InferenceProvider>,
    pub settings: ChatSettings,
}

impl ChatServiceImpl {
    pub fn new(inference_provider: Arc<dyn InferenceProvider>, settings: ChatSettings) -> Self {
        Self {
            inference_provider,
            settings,
        }
    }

    async fn complete(
        &self,
        messages: Vec<ConversationMessage>,
        operation: &'static str,
    ) -> Result<ChatResponse, ChatError> {
        let params = ChatCompletionParams {
            model: self.settings.model.clone(),
            messages,
            generation: self.settings.generation.clone(),
        };

        let result = self
            .inference_provider
            .chat_completion(params)
            .await
            .map_err(ChatError::from)
            .and_then(normalize_completion);

        match result {
            Ok(reply) => {
                tracing::debug!(
                    operation,
                    model = %reply.model,
                    finish_reason = ?reply.finish_reason,
                    "Upstream completion succeeded"
                );
                Ok(ChatResponse {
                    reply,
                    created_at: Utc::now(),
                })
            }
            Err(error) => {
                if let ChatError::Upstream { status, details } = &error {
                    tracing::error!(
                        operation,
                        model = %self.settings.model,
                        status = ?status,
                        details = %details,
                        "Upstream completion failed"
                    );
                }
                Err(error)
            }
        }
    }
}

#[async_trait::async_trait]
impl ports::ChatServiceTrait for ChatServiceImpl {
    async fn chat(&self, request: ChatRequest) -> Result<ChatResponse, ChatError> {
        let (message, image_url) = validate_chat_request(&request).inspect_err(|e| {
            tracing::debug!(error = %e, "Rejected chat request");
        })?;

        let user_message = build_user_message(message, image_url);
        self.complete(vec![user_message.into()], "chat").await
    }

    async fn chat_history(&self, request: ChatHistoryRequest) -> Result<ChatResponse, ChatError> {
        let messages = extract_history(request).inspect_err(|e| {
            tracing::debug!(error = %e, "Rejected chat history request");
        })?;

        tracing::debug!(messages = messages.len(), "Forwarding chat history");
        self.complete(messages, "chat_history").await
    }
}
