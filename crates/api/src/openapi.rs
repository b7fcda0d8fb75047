use crate::models::*;
use services::chat::ports::{ChatHistoryRequest, ChatReply, ChatRequest, ChatUsage};
use utoipa::OpenApi;

/// OpenAPI documentation configuration
#[derive(OpenApi)]
#[openapi(
    info(
        title = "Qwen Chat Gateway",
        description = "Thin HTTP gateway that forwards chat messages, optionally with an image reference, to a fixed Qwen model and returns its reply.",
        version = "0.1.0",
        license(
            name = "MIT",
        )
    ),
    paths(
        crate::routes::health::health_check,
        crate::routes::chat::chat,
        crate::routes::chat::chat_history,
    ),
    components(
        schemas(
            crate::routes::health::HealthResponse,
            ChatRequest, ChatHistoryRequest, ChatApiResponse, ChatReply, ChatUsage,
            ErrorResponse,
        ),
    ),
    tags(
        (name = "Health", description = "Liveness check"),
        (name = "Chat", description = "Single-message and conversation chat"),
    )
)]
pub struct ApiDoc;
