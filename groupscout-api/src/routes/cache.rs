//! Cache status and manual refresh

use axum::{
    extract::State,
    routing::{get, post},
    Json, Router,
};
use groupscout_cache::CacheStatus;

use crate::{error::ApiResult, state::AppState};

/// GET /cache/status - Snapshot age, size and build counters
pub async fn status(State(state): State<AppState>) -> ApiResult<Json<CacheStatus>> {
    Ok(Json(state.gateway.status()?))
}

/// POST /cache/refresh - Rebuild the snapshot now
///
/// On failure the previous snapshot keeps being served and the error is
/// returned.
pub async fn refresh(State(state): State<AppState>) -> ApiResult<Json<CacheStatus>> {
    let snapshot = state.gateway.scheduler().refresh_now().await?;
    tracing::info!(
        owners = snapshot.owner_count(),
        groups = snapshot.group_count(),
        "Manual refresh published new snapshot"
    );
    Ok(Json(state.gateway.status()?))
}

pub fn create_router() -> Router<AppState> {
    Router::new()
        .route("/status", get(status))
        .route("/refresh", post(refresh))
}
