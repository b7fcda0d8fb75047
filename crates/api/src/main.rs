use api::{build_app, init_chat_service, init_inference_provider};
use config::{ApiConfig, LoggingConfig};
use std::net::SocketAddr;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // A missing .env file is fine; real environment variables still apply
    let _ = dotenvy::dotenv();

    // Load configuration first to get logging settings
    let config = ApiConfig::load_or_env().unwrap_or_else(|e| {
        eprintln!("Failed to load configuration: {e}");
        eprintln!("Application cannot start without a valid configuration.");
        std::process::exit(1);
    });

    init_tracing(&config.logging);

    let provider = init_inference_provider(&config.upstream).unwrap_or_else(|e| {
        tracing::error!(error = %e, "Failed to create inference provider");
        std::process::exit(1);
    });
    let chat_service = init_chat_service(provider, &config.upstream);

    let app = build_app(chat_service, &config);

    let bind_address = config.server.bind_address();
    let listener = tokio::net::TcpListener::bind(&bind_address).await?;

    tracing::info!(address = %bind_address, "Server started successfully");
    tracing::info!("API Endpoints:");
    tracing::info!("  - GET /health (Health check)");
    tracing::info!("  - POST /api/chat (Single message, optional image)");
    tracing::info!("  - POST /api/chat/history (Full conversation)");
    tracing::info!("  - GET /api-docs/openapi.json (OpenAPI document)");

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}

fn init_tracing(logging_config: &LoggingConfig) {
    let filter = logging_config.filter_directives();

    // Initialize tracing based on the configured format
    match logging_config.format.as_str() {
        "json" => {
            tracing_subscriber::fmt()
                .json()
                .with_env_filter(filter)
                .init();
        }
        "compact" => {
            tracing_subscriber::fmt()
                .compact()
                .with_env_filter(filter)
                .init();
        }
        _ => {
            tracing_subscriber::fmt()
                .pretty()
                .with_env_filter(filter)
                .init();
        }
    }
}
