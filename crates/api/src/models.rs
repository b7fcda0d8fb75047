use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use services::chat::ports::{ChatReply, ChatResponse};
use utoipa::ToSchema;

/// Render a timestamp the way every response body carries it
pub fn format_timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Error body shared by every failure path
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ErrorResponse {
    /// Short, stable error message
    #[schema(example = "Message is required")]
    pub error: String,
    /// Human-readable explanation; for upstream failures the upstream body
    pub details: String,
    #[schema(example = "2026-10-19T12:00:00.000Z")]
    pub timestamp: String,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>, details: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            details: details.into(),
            timestamp: format_timestamp(Utc::now()),
        }
    }
}

/// Successful chat reply body
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ChatApiResponse {
    pub response: ChatReply,
    #[schema(example = "2026-10-19T12:00:00.000Z")]
    pub timestamp: String,
}

impl From<ChatResponse> for ChatApiResponse {
    fn from(chat: ChatResponse) -> Self {
        Self {
            response: chat.reply,
            timestamp: format_timestamp(chat.created_at),
        }
    }
}
