//! Health Check Endpoints
//!
//! - /health/ping - Simple liveness check
//! - /health/live - Process alive check
//! - /health/ready - Ready once a snapshot has been published
//!
//! Readiness does not trigger a build; it reports 503 until the first lookup
//! or scheduled refresh has populated the cache.

use axum::{extract::State, http::StatusCode, response::IntoResponse, routing::get, Json, Router};
use groupscout_cache::{CacheStatus, SchedulerState};
use serde::{Deserialize, Serialize};

use crate::state::AppState;

// ============================================================================
// TYPES
// ============================================================================

#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    pub status: HealthStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<HealthDetails>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Healthy,
    Unhealthy,
}

#[derive(Debug, Clone, Serialize)]
pub struct HealthDetails {
    pub cache: CacheStatus,
    pub version: String,
    pub uptime_seconds: u64,
}

// ============================================================================
// HANDLERS
// ============================================================================

/// GET /health/ping - Simple pong response
pub async fn ping() -> impl IntoResponse {
    (StatusCode::OK, "pong")
}

/// GET /health/live - Process liveness check
pub async fn liveness() -> impl IntoResponse {
    let response = HealthResponse {
        status: HealthStatus::Healthy,
        message: Some("Process is alive".to_string()),
        details: None,
    };
    (StatusCode::OK, Json(response))
}

/// GET /health/ready - Readiness check (snapshot published)
pub async fn readiness(State(state): State<AppState>) -> impl IntoResponse {
    let (status, message, details) = match state.gateway.status() {
        Ok(cache) => {
            let status = if cache.state == SchedulerState::Populated {
                HealthStatus::Healthy
            } else {
                HealthStatus::Unhealthy
            };
            let message = (status == HealthStatus::Unhealthy)
                .then(|| "No snapshot has been built yet".to_string());
            let details = HealthDetails {
                cache,
                version: env!("CARGO_PKG_VERSION").to_string(),
                uptime_seconds: state.start_time.elapsed().as_secs(),
            };
            (status, message, Some(details))
        }
        Err(e) => (HealthStatus::Unhealthy, Some(e.to_string()), None),
    };

    let status_code = if status == HealthStatus::Healthy {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (
        status_code,
        Json(HealthResponse {
            status,
            message,
            details,
        }),
    )
}

// ============================================================================
// ROUTER
// ============================================================================

pub fn create_router() -> Router<AppState> {
    Router::new()
        .route("/ping", get(ping))
        .route("/live", get(liveness))
        .route("/ready", get(readiness))
}
