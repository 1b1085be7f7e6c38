//! REST API Routes Module
//!
//! - `/lookup` - entity search against the cached snapshot
//! - `/health` - liveness and readiness probes
//! - `/cache` - snapshot status and manual refresh
//! - `/config` - runtime search configuration

pub mod cache;
pub mod config;
pub mod health;
pub mod lookup;

use axum::Router;
use tower_http::trace::TraceLayer;

use crate::state::AppState;

/// Build the full application router.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .nest("/lookup", lookup::create_router())
        .nest("/health", health::create_router())
        .nest("/cache", cache::create_router())
        .nest("/config", config::create_router())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
