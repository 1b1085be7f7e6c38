//! Search configuration routes
//!
//! The new configuration applies to the next search and the next build. The
//! published snapshot is not rebuilt, so a newly allowed owner only shows up
//! after the next refresh.

use axum::{
    extract::{rejection::JsonRejection, State},
    routing::get,
    Json, Router,
};
use groupscout_core::SearchConfig;

use crate::{error::ApiResult, state::AppState};

/// GET /config/search
pub async fn get_search_config(State(state): State<AppState>) -> ApiResult<Json<SearchConfig>> {
    let config = state.gateway.search_config()?;
    Ok(Json(SearchConfig::clone(&config)))
}

/// PUT /config/search
pub async fn put_search_config(
    State(state): State<AppState>,
    config: Result<Json<SearchConfig>, JsonRejection>,
) -> ApiResult<Json<SearchConfig>> {
    let Json(config) = config?;
    state.gateway.set_search_config(config.clone())?;
    tracing::info!(
        result_limit = config.result_limit,
        max_lookback_days = config.max_lookback_days,
        "Search configuration replaced"
    );
    Ok(Json(config))
}

pub fn create_router() -> Router<AppState> {
    Router::new().route("/search", get(get_search_config).put(put_search_config))
}
