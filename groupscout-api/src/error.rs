//! Error Types for the groupscout API
//!
//! - `ErrorCode` categorizes failures and maps each to an HTTP status
//! - `ApiError` is the JSON body every failing handler returns
//! - `From<GroupscoutError>` folds domain errors into API errors

use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use groupscout_core::{CacheError, GroupscoutError, UpstreamError};
use serde::{Deserialize, Serialize};
use std::fmt;

// ============================================================================
// ERROR CODE ENUM
// ============================================================================

/// Error codes for API responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    // ========================================================================
    // Validation Errors (400)
    // ========================================================================
    /// Request validation failed
    ValidationFailed,

    /// Request contains invalid input data
    InvalidInput,

    /// Required field is missing from request
    MissingField,

    /// Field value is out of valid range
    InvalidRange,

    // ========================================================================
    // Upstream Errors (502, 504)
    // ========================================================================
    /// The threat-intelligence API failed or answered with an error
    UpstreamUnavailable,

    /// The threat-intelligence API did not answer in time
    UpstreamTimeout,

    // ========================================================================
    // Server Errors (500, 503)
    // ========================================================================
    /// Internal server error
    InternalError,

    /// Service is temporarily unavailable
    ServiceUnavailable,
}

impl ErrorCode {
    /// Get the HTTP status code for this error code.
    pub fn status_code(&self) -> StatusCode {
        match self {
            ErrorCode::ValidationFailed
            | ErrorCode::InvalidInput
            | ErrorCode::MissingField
            | ErrorCode::InvalidRange => StatusCode::BAD_REQUEST,

            ErrorCode::UpstreamUnavailable => StatusCode::BAD_GATEWAY,
            ErrorCode::UpstreamTimeout => StatusCode::GATEWAY_TIMEOUT,

            ErrorCode::ServiceUnavailable => StatusCode::SERVICE_UNAVAILABLE,
            ErrorCode::InternalError => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

// ============================================================================
// API ERROR STRUCT
// ============================================================================

/// Structured error response for API operations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiError {
    /// Error code categorizing the error
    pub code: ErrorCode,

    /// Human-readable error message
    pub message: String,

    /// Optional additional details
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl ApiError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            details: None,
        }
    }

    pub fn with_details(mut self, details: serde_json::Value) -> Self {
        self.details = Some(details);
        self
    }

    pub fn status_code(&self) -> StatusCode {
        self.code.status_code()
    }

    // ========================================================================
    // Convenience constructors for common errors
    // ========================================================================

    pub fn validation_failed(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::ValidationFailed, message)
    }

    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InvalidInput, message)
    }

    pub fn missing_field(field: &str) -> Self {
        Self::new(
            ErrorCode::MissingField,
            format!("Required field '{}' is missing", field),
        )
    }

    pub fn invalid_range(field: &str, min: impl fmt::Display, max: impl fmt::Display) -> Self {
        Self::new(
            ErrorCode::InvalidRange,
            format!("Field '{}' must be between {} and {}", field, min, max),
        )
    }

    pub fn internal_error(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InternalError, message)
    }

    pub fn service_unavailable(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::ServiceUnavailable, message)
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code, self.message)
    }
}

impl std::error::Error for ApiError {}

// ============================================================================
// AXUM INTEGRATION
// ============================================================================

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = Json(self);
        (status, body).into_response()
    }
}

// ============================================================================
// CONVERSIONS FROM DOMAIN ERRORS
// ============================================================================

impl From<GroupscoutError> for ApiError {
    fn from(err: GroupscoutError) -> Self {
        match err {
            GroupscoutError::Upstream(e) => {
                tracing::warn!(error = %e, "Upstream failure surfaced to caller");
                let code = match e {
                    UpstreamError::Timeout { .. } => ErrorCode::UpstreamTimeout,
                    _ => ErrorCode::UpstreamUnavailable,
                };
                let mut api_error = Self::new(code, e.to_string());
                if let Some(status) = e.status() {
                    api_error = api_error.with_details(serde_json::json!({ "upstreamStatus": status }));
                }
                api_error
            }
            GroupscoutError::Config(e) => Self::validation_failed(e.to_string()),
            GroupscoutError::Cache(CacheError::ShutDown) => {
                Self::service_unavailable(CacheError::ShutDown.to_string())
            }
            GroupscoutError::Cache(e) => {
                tracing::error!(error = %e, "Cache failure");
                Self::internal_error(e.to_string())
            }
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::invalid_input(rejection.body_text())
    }
}

/// Result type alias for API operations.
pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;
    use groupscout_core::ConfigError;

    #[test]
    fn test_error_code_status_mapping() {
        assert_eq!(ErrorCode::MissingField.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(ErrorCode::UpstreamUnavailable.status_code(), StatusCode::BAD_GATEWAY);
        assert_eq!(ErrorCode::UpstreamTimeout.status_code(), StatusCode::GATEWAY_TIMEOUT);
        assert_eq!(ErrorCode::ServiceUnavailable.status_code(), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(ErrorCode::InternalError.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_upstream_status_maps_to_bad_gateway() {
        let err = ApiError::from(GroupscoutError::Upstream(UpstreamError::Status {
            endpoint: "/v2/owners".to_string(),
            status: 500,
            body: "boom".to_string(),
        }));
        assert_eq!(err.code, ErrorCode::UpstreamUnavailable);
        assert_eq!(err.status_code(), StatusCode::BAD_GATEWAY);
        assert_eq!(err.details, Some(serde_json::json!({ "upstreamStatus": 500 })));
    }

    #[test]
    fn test_upstream_timeout_maps_to_gateway_timeout() {
        let err = ApiError::from(GroupscoutError::Upstream(UpstreamError::Timeout {
            endpoint: "/v2/groups".to_string(),
        }));
        assert_eq!(err.status_code(), StatusCode::GATEWAY_TIMEOUT);
        assert!(err.details.is_none());
    }

    #[test]
    fn test_config_and_cache_mapping() {
        let err = ApiError::from(GroupscoutError::Config(ConfigError::MissingRequired {
            field: "access_id".to_string(),
        }));
        assert_eq!(err.code, ErrorCode::ValidationFailed);

        let err = ApiError::from(GroupscoutError::Cache(CacheError::ShutDown));
        assert_eq!(err.code, ErrorCode::ServiceUnavailable);

        let err = ApiError::from(GroupscoutError::Cache(CacheError::LockPoisoned));
        assert_eq!(err.code, ErrorCode::InternalError);
    }

    #[test]
    fn test_error_serialization() -> Result<(), serde_json::Error> {
        let err = ApiError::missing_field("entities");
        let json = serde_json::to_string(&err)?;
        assert!(json.contains("MISSING_FIELD"));
        assert!(json.contains("entities"));

        let deserialized: ApiError = serde_json::from_str(&json)?;
        assert_eq!(deserialized, err);
        Ok(())
    }
}
