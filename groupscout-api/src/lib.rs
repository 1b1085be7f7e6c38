//! groupscout API - HTTP Lookup Surface
//!
//! Axum router over a [`groupscout_cache::LookupGateway`]: entity lookups,
//! health probes, cache status, manual refresh and runtime search
//! configuration.

pub mod config;
pub mod error;
pub mod routes;
pub mod state;
pub mod telemetry;

pub use config::ServerConfig;
pub use error::{ApiError, ApiResult, ErrorCode};
pub use routes::create_router;
pub use state::AppState;
pub use telemetry::{init_tracing, TelemetryConfig};
