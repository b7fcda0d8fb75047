#![allow(dead_code)]

use api::{build_app, init_chat_service};
use axum::http::{HeaderName, HeaderValue};
use config::ApiConfig;
use inference_providers::MockProvider;
use services::chat::ports::ChatServiceTrait;
use std::sync::Arc;

pub const TEST_MODEL: &str = "qwen-vl-plus";

/// Helper function to create a test configuration
pub fn test_config() -> ApiConfig {
    ApiConfig {
        server: config::ServerConfig {
            host: "127.0.0.1".to_string(),
            port: 0, // Use port 0 to get a random available port
        },
        upstream: config::UpstreamConfig {
            base_url: Some("http://localhost:9/v1".to_string()),
            api_key: Some("sk-test".to_string()),
            model: TEST_MODEL.to_string(),
            timeout_seconds: 5,
            ..Default::default()
        },
        rate_limit: config::RateLimitConfig {
            window_secs: 900,
            max_requests: 1_000,
        },
        cors: config::CorsConfig::default(),
        logging: config::LoggingConfig {
            level: "debug".to_string(),
            format: "compact".to_string(),
            modules: std::collections::HashMap::new(),
        },
    }
}

fn init_test_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_max_level(tracing::level_filters::LevelFilter::DEBUG)
        .try_init();
}

/// Setup a test server backed by a fresh `MockProvider`
/// Returns the server and the provider so tests can inspect upstream calls
pub async fn setup_test_server() -> (axum_test::TestServer, Arc<MockProvider>) {
    let provider = Arc::new(MockProvider::new());
    let server = setup_test_server_with(provider.clone(), test_config()).await;
    (server, provider)
}

pub async fn setup_test_server_with(
    provider: Arc<MockProvider>,
    config: ApiConfig,
) -> axum_test::TestServer {
    init_test_tracing();

    let chat_service = init_chat_service(provider, &config.upstream);
    let app = build_app(chat_service, &config);
    axum_test::TestServer::new(app).unwrap()
}

/// Test server over an arbitrary chat service, e.g. a mockall mock
pub fn setup_test_server_with_service(
    chat_service: Arc<dyn ChatServiceTrait>,
    config: ApiConfig,
) -> axum_test::TestServer {
    init_test_tracing();

    let app = build_app(chat_service, &config);
    axum_test::TestServer::new(app).unwrap()
}

pub fn forwarded_for(ip: &'static str) -> (HeaderName, HeaderValue) {
    (
        HeaderName::from_static("x-forwarded-for"),
        HeaderValue::from_static(ip),
    )
}

/// Asserts the value is an RFC 3339 timestamp
pub fn assert_timestamp(value: &serde_json::Value) {
    let raw = value.as_str().expect("timestamp should be a string");
    assert!(
        chrono::DateTime::parse_from_rfc3339(raw).is_ok(),
        "invalid timestamp: {raw}"
    );
}
