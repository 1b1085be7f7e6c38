//! Cache configuration

use groupscout_core::{ConfigError, GroupscoutResult};
use groupscout_upstream::DEFAULT_PAGE_LIMIT;
use std::time::Duration;

pub const DEFAULT_REFRESH_INTERVAL_SECS: u64 = 3600;
pub const DEFAULT_FETCH_CONCURRENCY: usize = 8;

/// Configuration for snapshot building and refresh scheduling.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheConfig {
    /// How often the background timer rebuilds the snapshot (default: 1 hour)
    pub refresh_interval: Duration,

    /// Maximum owners fetched concurrently during a build (default: 8)
    pub fetch_concurrency: usize,

    /// Maximum groups requested per owner (default: 10000)
    pub page_limit: u32,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            refresh_interval: Duration::from_secs(DEFAULT_REFRESH_INTERVAL_SECS),
            fetch_concurrency: DEFAULT_FETCH_CONCURRENCY,
            page_limit: DEFAULT_PAGE_LIMIT,
        }
    }
}

impl CacheConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create CacheConfig from environment variables.
    ///
    /// # Environment Variables
    /// - `GROUPSCOUT_REFRESH_INTERVAL_SECS`: Rebuild period (default: 3600)
    /// - `GROUPSCOUT_FETCH_CONCURRENCY`: Concurrent owner fetches (default: 8)
    /// - `GROUPSCOUT_PAGE_LIMIT`: Groups requested per owner (default: 10000)
    pub fn from_env() -> Self {
        let refresh_interval = Duration::from_secs(
            std::env::var("GROUPSCOUT_REFRESH_INTERVAL_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(DEFAULT_REFRESH_INTERVAL_SECS),
        );

        let fetch_concurrency = std::env::var("GROUPSCOUT_FETCH_CONCURRENCY")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(DEFAULT_FETCH_CONCURRENCY);

        let page_limit = std::env::var("GROUPSCOUT_PAGE_LIMIT")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(DEFAULT_PAGE_LIMIT);

        Self {
            refresh_interval,
            fetch_concurrency,
            page_limit,
        }
    }

    pub fn with_refresh_interval(mut self, interval: Duration) -> Self {
        self.refresh_interval = interval;
        self
    }

    pub fn with_fetch_concurrency(mut self, concurrency: usize) -> Self {
        self.fetch_concurrency = concurrency;
        self
    }

    pub fn with_page_limit(mut self, page_limit: u32) -> Self {
        self.page_limit = page_limit;
        self
    }

    pub fn validate(&self) -> GroupscoutResult<()> {
        if self.refresh_interval.is_zero() {
            return Err(ConfigError::InvalidValue {
                field: "refresh_interval".to_string(),
                value: "0".to_string(),
                reason: "must be positive".to_string(),
            }
            .into());
        }
        if self.fetch_concurrency == 0 {
            return Err(ConfigError::InvalidValue {
                field: "fetch_concurrency".to_string(),
                value: "0".to_string(),
                reason: "must be at least 1".to_string(),
            }
            .into());
        }
        if self.page_limit == 0 || self.page_limit > DEFAULT_PAGE_LIMIT {
            return Err(ConfigError::InvalidValue {
                field: "page_limit".to_string(),
                value: self.page_limit.to_string(),
                reason: format!("must be between 1 and {}", DEFAULT_PAGE_LIMIT),
            }
            .into());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = CacheConfig::default();
        assert_eq!(config.refresh_interval, Duration::from_secs(3600));
        assert_eq!(config.fetch_concurrency, 8);
        assert_eq!(config.page_limit, 10_000);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        assert!(CacheConfig::new()
            .with_refresh_interval(Duration::ZERO)
            .validate()
            .is_err());
        assert!(CacheConfig::new().with_fetch_concurrency(0).validate().is_err());
        assert!(CacheConfig::new().with_page_limit(0).validate().is_err());
        assert!(CacheConfig::new().with_page_limit(10_001).validate().is_err());
    }
}
