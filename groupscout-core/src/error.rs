//! Error types for groupscout operations

use thiserror::Error;

/// Failures talking to the upstream threat-intelligence API.
///
/// Every variant is fatal to the cache build that observed it. The build is
/// retried at the next trigger (lookup or scheduled tick).
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum UpstreamError {
    #[error("Request to {endpoint} failed with status {status}: {body}")]
    Status {
        endpoint: String,
        status: u16,
        body: String,
    },

    #[error("Transport failure calling {endpoint}: {reason}")]
    Transport { endpoint: String, reason: String },

    #[error("Request to {endpoint} timed out")]
    Timeout { endpoint: String },

    #[error("Invalid response from {endpoint}: {reason}")]
    InvalidResponse { endpoint: String, reason: String },
}

impl UpstreamError {
    /// HTTP status carried by the error, if the upstream answered at all.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Status { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// Configuration errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Missing required configuration field: {field}")]
    MissingRequired { field: String },

    #[error("Invalid value for {field}: {value} - {reason}")]
    InvalidValue {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Incompatible options: {option_a} and {option_b}")]
    IncompatibleOptions { option_a: String, option_b: String },
}

/// Snapshot cache errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CacheError {
    #[error("Snapshot lock poisoned")]
    LockPoisoned,

    #[error("Fetch task for owner {owner} failed: {reason}")]
    FetchTaskFailed { owner: String, reason: String },

    #[error("Search task failed: {reason}")]
    SearchTaskFailed { reason: String },

    #[error("Scheduler is shut down")]
    ShutDown,
}

/// Master error type for all groupscout errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum GroupscoutError {
    #[error("Upstream error: {0}")]
    Upstream(#[from] UpstreamError),

    #[error("Config error: {0}")]
    Config(#[from] ConfigError),

    #[error("Cache error: {0}")]
    Cache(#[from] CacheError),
}

/// Result type alias for groupscout operations.
pub type GroupscoutResult<T> = Result<T, GroupscoutError>;

// =============================================================================
// TESTS
// =============================================================================
