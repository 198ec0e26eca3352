// API Server Binary Entry Point
//
// Purpose: Start the Axum crop recommendation server
// Usage: cargo run --bin api_server

use crop_advisor::{create_router, AppState, ServiceConfig};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing (structured logging)
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| {
                    // Default log level: info for our crate, warn for others
                    "crop_advisor=info,tower_http=debug,axum=debug,warn".into()
                }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting API server...");

    let config = ServiceConfig::from_env();

    tracing::info!("Configuration:");
    tracing::info!("  MODEL_DIR: {:?}", config.model_dir);
    tracing::info!("  USERS_FILE: {:?}", config.users_file);
    tracing::info!("  DATASET_PATH: {:?}", config.dataset_path);
    tracing::info!("  REQUEST_TIMEOUT: {:?}", config.request_timeout);

    // Load artifacts; failures are logged and reported per request
    tracing::info!("Initializing application state...");
    let state = AppState::load(&config);
    if state.classifier.is_none() {
        tracing::warn!("Serving without a crop model: /predict will answer 'Model not loaded'");
    }

    let app = create_router(state);

    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Server listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
