use crate::{
    middleware::UNHANDLED_ERROR,
    models::{ChatApiResponse, ErrorResponse},
};
use axum::{
    extract::{rejection::JsonRejection, Json, State},
    http::StatusCode,
    response::Json as ResponseJson,
};
use services::chat::ports::{ChatError, ChatHistoryRequest, ChatRequest, ChatServiceTrait};
use std::sync::Arc;

pub const CHAT_UPSTREAM_ERROR: &str = "Error processing request";
pub const HISTORY_UPSTREAM_ERROR: &str = "Error processing chat history";

#[derive(Clone)]
pub struct ChatState {
    pub chat_service: Arc<dyn ChatServiceTrait>,
}

/// Map a `ChatError` to its HTTP status and body.
///
/// Upstream statuses are passed through when they are client or server errors;
/// anything else (including no status at all) becomes 500.
pub fn map_chat_error(
    error: ChatError,
    upstream_error: &'static str,
) -> (StatusCode, ResponseJson<ErrorResponse>) {
    match error {
        ChatError::Validation { message, details } => (
            StatusCode::BAD_REQUEST,
            ResponseJson(ErrorResponse::new(message, details)),
        ),
        ChatError::Upstream { status, details } => {
            let status = status
                .and_then(|code| StatusCode::from_u16(code).ok())
                .filter(|code| code.is_client_error() || code.is_server_error())
                .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
            (status, ResponseJson(ErrorResponse::new(upstream_error, details)))
        }
    }
}

/// Read the JSON body.
///
/// A missing or non-JSON content type and a body that is not an object are
/// handled like a body with no fields. A body that cannot be parsed at all is an
/// unhandled failure and answers 500.
fn read_body<T: Default>(
    payload: Result<Json<T>, JsonRejection>,
) -> Result<T, (StatusCode, ResponseJson<ErrorResponse>)> {
    match payload {
        Ok(Json(body)) => Ok(body),
        Err(rejection @ (JsonRejection::JsonSyntaxError(_) | JsonRejection::BytesRejection(_))) => {
            let details = rejection.body_text();
            tracing::warn!(details = %details, "Failed to parse request body");
            Err((
                StatusCode::INTERNAL_SERVER_ERROR,
                ResponseJson(ErrorResponse::new(UNHANDLED_ERROR, details)),
            ))
        }
        Err(rejection) => {
            tracing::debug!(error = %rejection, "No usable JSON body, treating fields as missing");
            Ok(T::default())
        }
    }
}

/// Send a single message
///
/// Sends the message, plus an optional image reference, to the fixed Qwen model.
#[utoipa::path(
    post,
    path = "/api/chat",
    request_body = ChatRequest,
    responses(
        (status = 200, description = "Model reply", body = ChatApiResponse),
        (status = 400, description = "Missing, empty or non-string message", body = ErrorResponse),
        (status = 429, description = "Rate limit exceeded", body = ErrorResponse),
        (status = 500, description = "Unparseable body or upstream failure without a status", body = ErrorResponse)
    ),
    tag = "Chat"
)]
pub async fn chat(
    State(state): State<ChatState>,
    payload: Result<Json<ChatRequest>, JsonRejection>,
) -> Result<ResponseJson<ChatApiResponse>, (StatusCode, ResponseJson<ErrorResponse>)> {
    let request = read_body(payload)?;

    state
        .chat_service
        .chat(request)
        .await
        .map(|response| ResponseJson(response.into()))
        .map_err(|e| map_chat_error(e, CHAT_UPSTREAM_ERROR))
}

/// Continue a conversation
///
/// Forwards the client's full message list to the fixed Qwen model unchanged.
#[utoipa::path(
    post,
    path = "/api/chat/history",
    request_body = ChatHistoryRequest,
    responses(
        (status = 200, description = "Model reply", body = ChatApiResponse),
        (status = 400, description = "`messages` is not an array", body = ErrorResponse),
        (status = 429, description = "Rate limit exceeded", body = ErrorResponse),
        (status = 500, description = "Unparseable body or upstream failure without a status", body = ErrorResponse)
    ),
    tag = "Chat"
)]
pub async fn chat_history(
    State(state): State<ChatState>,
    payload: Result<Json<ChatHistoryRequest>, JsonRejection>,
) -> Result<ResponseJson<ChatApiResponse>, (StatusCode, ResponseJson<ErrorResponse>)> {
    let request = read_body(payload)?;

    state
        .chat_service
        .chat_history(request)
        .await
        .map(|response| ResponseJson(response.into()))
        .map_err(|e| map_chat_error(e, HISTORY_UPSTREAM_ERROR))
}
