use crate::config::Config;
use crate::errors::{AppError, ResultExt};
use crate::models::*;
use crate::orchestrator::SyncOrchestrator;
use crate::scheduler::{AutoSyncScheduler, AutoSyncStatus};
use crate::store::LeadStore;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;

/// Shared application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    /// Lead and sync-run persistence.
    pub store: Arc<dyn LeadStore>,
    /// Runs syncs and owns the run guard.
    pub orchestrator: Arc<SyncOrchestrator>,
    /// Periodic trigger toggled through `/api/auto-sync`.
    pub scheduler: Arc<AutoSyncScheduler>,
    /// Application configuration.
    pub config: Config,
}

/// Health check endpoint.
pub async fn health() -> (StatusCode, Json<serde_json::Value>) {
    (
        StatusCode::OK,
        Json(json!({
            "status": "healthy",
            "service": "lead-sync-api",
            "version": env!("CARGO_PKG_VERSION"),
            "time": chrono::Utc::now().to_rfc3339(),
        })),
    )
}

/// Reads an optional `platform` query value; blank or `ALL` means no filter.
fn parse_platform_filter(raw: Option<&str>) -> Result<Option<Platform>, AppError> {
    match raw.map(str::trim) {
        None | Some("") => Ok(None),
        Some(value) if value.eq_ignore_ascii_case("ALL") => Ok(None),
        Some(value) => value
            .parse::<Platform>()
            .map(Some)
            .map_err(|e| AppError::BadRequest(e.to_string())),
    }
}

#[derive(Debug, Deserialize)]
pub struct LeadListParams {
    pub page: Option<u32>,
    pub limit: Option<u32>,
    pub platform: Option<String>,
}

/// GET /api/leads?page=1&limit=20&platform=META
///
/// Most recently created leads first. `limit` is capped at 100.
pub async fn list_leads(
    State(state): State<Arc<AppState>>,
    Query(params): Query<LeadListParams>,
) -> Result<Json<LeadPage>, AppError> {
    let query = LeadQuery {
        page: params.page,
        limit: params.limit,
        platform: parse_platform_filter(params.platform.as_deref())?,
    };
    tracing::debug!("GET /api/leads - {:?}", query);

    let page = state
        .store
        .list_leads(&query)
        .await
        .context("Failed to list leads")?;

    Ok(Json(page))
}

#[derive(Debug, Deserialize)]
pub struct SyncLogParams {
    pub limit: Option<u32>,
    pub platform: Option<String>,
}

/// GET /api/logs?limit=50&platform=GOOGLE
///
/// Most recent sync runs first.
pub async fn list_sync_runs(
    State(state): State<Arc<AppState>>,
    Query(params): Query<SyncLogParams>,
) -> Result<Json<Vec<SyncRun>>, AppError> {
    let platform = parse_platform_filter(params.platform.as_deref())?;
    let limit = clamp_log_limit(params.limit);

    let runs = state
        .store
        .recent_sync_runs(limit, platform)
        .await
        .context("Failed to read sync runs")?;

    Ok(Json(runs))
}

/// POST /api/sync/:selector (meta, google or all)
///
/// 200 with the summary when the run completed (even if a platform failed),
/// 409 when another sync was already in flight.
pub async fn trigger_sync(
    State(state): State<Arc<AppState>>,
    Path(selector): Path<String>,
) -> Result<Json<SyncSummary>, AppError> {
    let selector = selector
        .parse::<PlatformSelector>()
        .map_err(|e| AppError::BadRequest(e.to_string()))?;

    tracing::info!("POST /api/sync/{:?}", selector);

    match state.orchestrator.run_sync(selector).await {
        SyncOutcome::Completed(summary) => Ok(Json(summary)),
        SyncOutcome::Skipped => Err(AppError::SyncInProgress),
    }
}

#[derive(Debug, Deserialize)]
pub struct AutoSyncToggle {
    pub enabled: bool,
    pub interval_secs: Option<u64>,
}

/// GET /api/auto-sync
pub async fn auto_sync_status(State(state): State<Arc<AppState>>) -> Json<AutoSyncStatus> {
    Json(state.scheduler.status().await)
}

/// POST /api/auto-sync  `{"enabled": true, "interval_secs": 60}`
pub async fn toggle_auto_sync(
    State(state): State<Arc<AppState>>,
    Json(toggle): Json<AutoSyncToggle>,
) -> Result<Json<AutoSyncStatus>, AppError> {
    if toggle.enabled {
        let secs = toggle
            .interval_secs
            .unwrap_or(state.config.auto_sync_interval_secs);
        if secs == 0 {
            return Err(AppError::BadRequest(
                "interval_secs must be greater than zero".to_string(),
            ));
        }
        state.scheduler.start(Duration::from_secs(secs)).await;
    } else {
        state.scheduler.stop().await;
    }

    Ok(Json(state.scheduler.status().await))
}
