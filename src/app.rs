//! Wiring: builds the store, adapters, orchestrator and router from config.

use std::sync::Arc;
use std::time::Duration;

use axum::{
    http::HeaderValue,
    routing::{get, post},
    Router,
};
use tower::ServiceBuilder;
use tower_governor::{
    governor::GovernorConfigBuilder, key_extractor::GlobalKeyExtractor, GovernorLayer,
};
use tower_http::{
    cors::{AllowOrigin, Any, CorsLayer},
    limit::RequestBodyLimitLayer,
    trace::TraceLayer,
};

use crate::config::{Config, StoreBackend};
use crate::db::Database;
use crate::db_storage::PgLeadStore;
use crate::handlers::{self, AppState};
use crate::memory_store::InMemoryLeadStore;
use crate::mock_providers;
use crate::models::Platform;
use crate::orchestrator::SyncOrchestrator;
use crate::providers::ProviderAdapter;
use crate::scheduler::AutoSyncScheduler;
use crate::store::LeadStore;

/// Connects the configured store backend.
pub async fn connect_store(config: &Config) -> anyhow::Result<Arc<dyn LeadStore>> {
    match config.store_backend {
        StoreBackend::Postgres => {
            let database_url = config
                .database_url
                .as_deref()
                .ok_or_else(|| anyhow::anyhow!("DB_URL or DATABASE_URL required for postgres"))?;
            let db = Database::new(database_url).await?;
            tracing::info!("Database connection pool established");
            Ok(Arc::new(PgLeadStore::new(db.pool)))
        }
        StoreBackend::Memory => {
            tracing::warn!("Using in-memory store; leads are lost on restart");
            Ok(Arc::new(InMemoryLeadStore::new()))
        }
    }
}

/// One adapter per platform, sharing a single HTTP client.
pub fn build_adapters(config: &Config) -> anyhow::Result<Vec<ProviderAdapter>> {
    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(config.fetch_timeout_secs))
        .build()?;

    Ok(Platform::ALL
        .iter()
        .map(|&platform| {
            ProviderAdapter::with_client(
                platform,
                config.leads_url(platform).to_string(),
                client.clone(),
            )
        })
        .collect())
}

pub fn build_state(config: Config, store: Arc<dyn LeadStore>) -> anyhow::Result<Arc<AppState>> {
    let orchestrator = Arc::new(
        SyncOrchestrator::new(build_adapters(&config)?, store.clone())
            .with_concurrency(config.sync_concurrency),
    );
    let scheduler = Arc::new(AutoSyncScheduler::new(orchestrator.clone()));

    Ok(Arc::new(AppState {
        store,
        orchestrator,
        scheduler,
        config,
    }))
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    if origins.is_empty() {
        return CorsLayer::permissive();
    }

    let allowed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!("Ignoring invalid CORS origin: {}", origin);
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(allowed))
        .allow_methods(Any)
        .allow_headers(Any)
}

pub fn build_router(state: Arc<AppState>) -> anyhow::Result<Router> {
    // Sync triggers hit external providers: 2 req/sec overall, burst of 10
    let governor_conf = Arc::new(
        GovernorConfigBuilder::default()
            .per_second(2)
            .burst_size(10)
            .key_extractor(GlobalKeyExtractor)
            .finish()
            .ok_or_else(|| anyhow::anyhow!("invalid rate limiter configuration"))?,
    );

    let sync_routes = Router::new()
        .route("/api/sync/:selector", post(handlers::trigger_sync))
        .route(
            "/api/auto-sync",
            get(handlers::auto_sync_status).post(handlers::toggle_auto_sync),
        )
        .layer(
            ServiceBuilder::new()
                // Toggle bodies are tiny
                .layer(RequestBodyLimitLayer::new(64 * 1024))
                .layer(GovernorLayer {
                    config: governor_conf,
                }),
        );

    let mut app = Router::new()
        .route("/health", get(handlers::health))
        .route("/api/leads", get(handlers::list_leads))
        .route("/api/logs", get(handlers::list_sync_runs))
        .merge(sync_routes);

    if state.config.mock_providers_enabled {
        app = app.merge(mock_providers::routes());
    }

    Ok(app
        .with_state(state.clone())
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer(&state.config.cors_origins)))
}
