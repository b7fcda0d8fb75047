pub mod middleware;
pub mod models;
pub mod openapi;
pub mod routes;

use crate::{
    middleware::{client_rate_limit_middleware, cors_layer, handle_panic, RateLimitState},
    openapi::ApiDoc,
    routes::{chat, chat_history, health_check, ChatState},
};
use axum::{
    middleware::from_fn_with_state,
    routing::{get, post},
    Router,
};
use config::{ApiConfig, UpstreamBackend, UpstreamConfig};
use inference_providers::{
    CompletionError, DashScopeConfig, DashScopeProvider, InferenceProvider,
    OpenAiCompatibleConfig, OpenAiCompatibleProvider,
};
use services::chat::{ports::ChatServiceTrait, ChatServiceImpl, ChatSettings};
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::catch_panic::CatchPanicLayer;
use utoipa::OpenApi;

/// Build the upstream client selected by `config.backend`
pub fn init_inference_provider(
    config: &UpstreamConfig,
) -> Result<Arc<dyn InferenceProvider>, CompletionError> {
    if config.api_key.is_none() {
        tracing::warn!("QWEN_API_KEY is not set; upstream calls will be unauthenticated");
    }

    let base_url = config.base_url();
    let provider: Arc<dyn InferenceProvider> = match config.backend {
        UpstreamBackend::OpenAiCompatible => Arc::new(OpenAiCompatibleProvider::new(
            OpenAiCompatibleConfig::new(
                base_url.clone(),
                config.api_key.clone(),
                Some(config.timeout_seconds),
            ),
        )?),
        UpstreamBackend::DashScope => Arc::new(DashScopeProvider::new(DashScopeConfig::new(
            base_url.clone(),
            config.api_key.clone(),
            Some(config.timeout_seconds),
        ))?),
    };

    tracing::info!(
        backend = ?config.backend,
        base_url = %base_url,
        model = %config.model,
        "Initialized inference provider"
    );

    Ok(provider)
}

pub fn init_chat_service(
    provider: Arc<dyn InferenceProvider>,
    config: &UpstreamConfig,
) -> Arc<dyn ChatServiceTrait> {
    Arc::new(ChatServiceImpl::new(provider, ChatSettings::from(config)))
}

/// Build the complete application router
pub fn build_app(chat_service: Arc<dyn ChatServiceTrait>, config: &ApiConfig) -> Router {
    let rate_limit_state = RateLimitState::from_config(&config.rate_limit);

    Router::new()
        .route("/health", get(health_check))
        .merge(build_chat_routes(chat_service))
        .merge(build_openapi_routes())
        .layer(
            ServiceBuilder::new()
                .layer(cors_layer(&config.cors.allowed_origins))
                .layer(from_fn_with_state(
                    rate_limit_state,
                    client_rate_limit_middleware,
                ))
                .layer(CatchPanicLayer::custom(handle_panic)),
        )
}

pub fn build_chat_routes(chat_service: Arc<dyn ChatServiceTrait>) -> Router {
    Router::new()
        .route("/api/chat", post(chat))
        .route("/api/chat/history", post(chat_history))
        .with_state(ChatState { chat_service })
}

/// Build OpenAPI documentation routes
pub fn build_openapi_routes() -> Router {
    Router::new().route(
        "/api-docs/openapi.json",
        get(|| async { axum::Json(ApiDoc::openapi()) }),
    )
}
