use std::time::Duration;

use lead_sync_api::app::{build_router, build_state, connect_store};
use lead_sync_api::config::Config;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Main entry point for the application.
///
/// This function initializes the application, including:
/// - Logging and tracing.
/// - Configuration loading.
/// - Lead store (PostgreSQL or in-memory).
/// - Provider adapters, orchestrator and auto-sync scheduler.
/// - HTTP routes and middleware (CORS, rate limiting).
///
/// It then starts the Axum server.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "lead_sync_api=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config = Config::from_env()?;

    let store = connect_store(&config).await?;
    let state = build_state(config.clone(), store)?;

    if config.auto_sync_enabled {
        state
            .scheduler
            .start(Duration::from_secs(config.auto_sync_interval_secs))
            .await;
    }

    let app = build_router(state.clone())?;

    // Start server
    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Server listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            tokio::signal::ctrl_c().await.ok();
            tracing::info!("Shutdown signal received");
        })
        .await?;

    state.scheduler.stop().await;

    Ok(())
}
