//! Server Configuration
//!
//! Bind address and request limits for the HTTP surface, loaded from
//! environment variables with development-friendly defaults.

use std::net::SocketAddr;

use crate::error::{ApiError, ApiResult};

pub const DEFAULT_BIND_HOST: &str = "0.0.0.0";
pub const DEFAULT_PORT: &str = "3000";
pub const DEFAULT_MAX_LOOKUP_ENTITIES: usize = 1000;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    /// Interface to bind (default: 0.0.0.0)
    pub bind_host: String,

    /// Port, kept as text until [`ServerConfig::bind_addr`] validates it
    pub port: String,

    /// Maximum entities accepted in one lookup request
    pub max_lookup_entities: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_host: DEFAULT_BIND_HOST.to_string(),
            port: DEFAULT_PORT.to_string(),
            max_lookup_entities: DEFAULT_MAX_LOOKUP_ENTITIES,
        }
    }
}

impl ServerConfig {
    /// Create ServerConfig from environment variables.
    ///
    /// Environment variables:
    /// - `GROUPSCOUT_API_BIND`: Bind host (default: 0.0.0.0)
    /// - `PORT` or `GROUPSCOUT_API_PORT`: Listen port (default: 3000)
    /// - `GROUPSCOUT_MAX_LOOKUP_ENTITIES`: Entities per lookup request (default: 1000)
    pub fn from_env() -> Self {
        let bind_host =
            std::env::var("GROUPSCOUT_API_BIND").unwrap_or_else(|_| DEFAULT_BIND_HOST.to_string());
        let port = std::env::var("PORT")
            .ok()
            .or_else(|| std::env::var("GROUPSCOUT_API_PORT").ok())
            .unwrap_or_else(|| DEFAULT_PORT.to_string());
        let max_lookup_entities = std::env::var("GROUPSCOUT_MAX_LOOKUP_ENTITIES")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(DEFAULT_MAX_LOOKUP_ENTITIES);

        Self {
            bind_host,
            port,
            max_lookup_entities,
        }
    }

    pub fn bind_addr(&self) -> ApiResult<SocketAddr> {
        let port = self
            .port
            .parse::<u16>()
            .map_err(|_| ApiError::invalid_input(format!("Invalid port value: {}", self.port)))?;

        let addr = format!("{}:{}", self.bind_host, port);
        addr.parse::<SocketAddr>()
            .map_err(|e| ApiError::invalid_input(format!("Invalid bind address {}: {}", addr, e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_bind_addr() {
        let addr = ServerConfig::default().bind_addr().unwrap();
        assert_eq!(addr.to_string(), "0.0.0.0:3000");
    }

    #[test]
    fn test_invalid_port_rejected() {
        let config = ServerConfig {
            port: "http".to_string(),
            ..ServerConfig::default()
        };
        assert!(config.bind_addr().is_err());
    }

    #[test]
    fn test_invalid_host_rejected() {
        let config = ServerConfig {
            bind_host: "not a host".to_string(),
            ..ServerConfig::default()
        };
        assert!(config.bind_addr().is_err());
    }
}
