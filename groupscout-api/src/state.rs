//! Shared application state for Axum routers.

use groupscout_cache::LookupGateway;
use std::time::Instant;

use crate::config::ServerConfig;

#[derive(Debug, Clone)]
pub struct AppState {
    pub gateway: LookupGateway,
    pub max_lookup_entities: usize,
    pub start_time: Instant,
}

impl AppState {
    pub fn new(gateway: LookupGateway, config: &ServerConfig) -> Self {
        Self {
            gateway,
            max_lookup_entities: config.max_lookup_entities,
            start_time: Instant::now(),
        }
    }
}
