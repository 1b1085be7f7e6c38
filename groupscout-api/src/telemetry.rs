//! Tracing subscriber setup

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::error::{ApiError, ApiResult};

pub const DEFAULT_LOG_FILTER: &str = "groupscout=debug,tower_http=debug,info";

/// Logging configuration from environment variables.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    /// Used when `RUST_LOG` is unset
    pub default_filter: String,
    /// Emit JSON lines instead of human-readable output
    pub json: bool,
    pub service_name: String,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            default_filter: DEFAULT_LOG_FILTER.to_string(),
            json: false,
            service_name: "groupscout-api".to_string(),
        }
    }
}

impl TelemetryConfig {
    /// - `GROUPSCOUT_LOG_JSON`: "true" or "1" for JSON output (default: false)
    /// - `GROUPSCOUT_SERVICE_NAME`: Name logged at startup (default: groupscout-api)
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            json: std::env::var("GROUPSCOUT_LOG_JSON")
                .map(|s| s == "true" || s == "1")
                .unwrap_or(false),
            service_name: std::env::var("GROUPSCOUT_SERVICE_NAME")
                .unwrap_or(defaults.service_name),
            default_filter: defaults.default_filter,
        }
    }
}

/// Install the global tracing subscriber. Call once at startup.
pub fn init_tracing(config: &TelemetryConfig) -> ApiResult<()> {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.default_filter));

    let registry = tracing_subscriber::registry().with(env_filter);
    let result = if config.json {
        registry.with(tracing_subscriber::fmt::layer().json()).try_init()
    } else {
        registry.with(tracing_subscriber::fmt::layer()).try_init()
    };
    result.map_err(|e| ApiError::internal_error(format!("Failed to init subscriber: {}", e)))?;

    tracing::info!(
        service_name = %config.service_name,
        json = config.json,
        version = env!("CARGO_PKG_VERSION"),
        "Telemetry initialized"
    );

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_telemetry_config_default() {
        let config = TelemetryConfig::default();
        assert_eq!(config.service_name, "groupscout-api");
        assert_eq!(config.default_filter, DEFAULT_LOG_FILTER);
        assert!(!config.json);
    }
}
