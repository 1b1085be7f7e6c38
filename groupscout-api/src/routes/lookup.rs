//! Lookup REST API Routes

use axum::{
    extract::{rejection::JsonRejection, State},
    routing::post,
    Json, Router,
};
use groupscout_core::{Entity, LookupResult};
use serde::{Deserialize, Serialize};

use crate::{
    error::{ApiError, ApiResult},
    state::AppState,
};

// ============================================================================
// TYPES
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LookupRequest {
    pub entities: Vec<Entity>,
}

#[derive(Debug, Clone, Serialize)]
pub struct LookupResponse {
    pub results: Vec<LookupResult>,
}

// ============================================================================
// ROUTE HANDLERS
// ============================================================================

/// POST /lookup - Search cached groups for each entity
///
/// The first lookup after startup waits for the initial snapshot build; an
/// upstream failure during that build is returned as 502.
pub async fn lookup(
    State(state): State<AppState>,
    req: Result<Json<LookupRequest>, JsonRejection>,
) -> ApiResult<Json<LookupResponse>> {
    let Json(req) = req?;
    if req.entities.is_empty() {
        return Err(ApiError::missing_field("entities"));
    }
    if req.entities.len() > state.max_lookup_entities {
        return Err(ApiError::invalid_range(
            "entities",
            1,
            state.max_lookup_entities,
        ));
    }

    let results = state.gateway.lookup(req.entities).await?;
    Ok(Json(LookupResponse { results }))
}

// ============================================================================
// ROUTER SETUP
// ============================================================================

pub fn create_router() -> Router<AppState> {
    Router::new().route("/", post(lookup))
}
