//! groupscout API Server Entry Point
//!
//! Loads configuration, wires the upstream client into the snapshot cache,
//! and starts the Axum HTTP server. The cache is populated lazily by the
//! first lookup.

use std::sync::Arc;

use axum::Router;
use groupscout_api::{
    create_router, init_tracing, ApiError, ApiResult, AppState, ServerConfig, TelemetryConfig,
};
use groupscout_cache::{CacheConfig, LookupGateway, RefreshScheduler, SnapshotBuilder};
use groupscout_core::SearchConfig;
use groupscout_upstream::{ClientConfig, UpstreamClient};

#[tokio::main]
async fn main() -> ApiResult<()> {
    let telemetry_config = TelemetryConfig::from_env();
    init_tracing(&telemetry_config)?;

    let search_config = SearchConfig::from_env();
    search_config.validate()?;
    search_config.warn_on_ambiguity();

    let cache_config = CacheConfig::from_env();
    cache_config.validate()?;

    let client_config = ClientConfig::from_env()?;
    tracing::info!(base_url = %client_config.base_url, "Upstream client configured");
    let client = UpstreamClient::new(client_config)?;

    let builder = SnapshotBuilder::new(Arc::new(client), &cache_config);
    let scheduler = RefreshScheduler::new(builder, &cache_config, search_config);
    let gateway = LookupGateway::new(scheduler.clone());

    let server_config = ServerConfig::from_env();
    let app: Router = create_router(AppState::new(gateway, &server_config));

    let addr = server_config.bind_addr()?;
    tracing::info!(%addr, "Starting groupscout API server");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| ApiError::internal_error(format!("Failed to bind {}: {}", addr, e)))?;

    let server = axum::serve(listener, app);
    tokio::select! {
        result = server => {
            result.map_err(|e| ApiError::internal_error(format!("Server error: {}", e)))?;
        }
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("Shutdown signal received");
        }
    }

    scheduler.shutdown();
    Ok(())
}
