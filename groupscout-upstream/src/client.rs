//! Signed HTTP client with rate limiting

use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use groupscout_core::{ConfigError, Group, GroupscoutResult, Owner, UpstreamError};
use reqwest::{Client, Url};
use serde::de::DeserializeOwned;
use governor::{clock::DefaultClock, Quota, RateLimiter};
use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;

use crate::signing::sign_request;
use crate::types::{ApiEnvelope, GroupsData, OwnersData, STATUS_SUCCESS};
use crate::{GroupSource, UpstreamResult};

pub const OWNERS_ENDPOINT: &str = "/v2/owners";
pub const GROUPS_ENDPOINT: &str = "/v2/groups";

const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;
const DEFAULT_REQUESTS_PER_MINUTE: u32 = 600;
const DEFAULT_MAX_IN_FLIGHT: usize = 16;

// ============================================================================
// CONFIGURATION
// ============================================================================

/// Connection settings for the upstream API.
#[derive(Clone)]
pub struct ClientConfig {
    /// Base URL, e.g. `https://api.threatconnect.com`.
    pub base_url: String,
    pub access_id: String,
    pub secret_key: String,
    /// Per-request network timeout. Timeouts surface as `UpstreamError::Timeout`.
    pub request_timeout: Duration,
    pub requests_per_minute: u32,
    /// Maximum concurrent requests held open by this client.
    pub max_in_flight: usize,
}

impl ClientConfig {
    pub fn new(
        base_url: impl Into<String>,
        access_id: impl Into<String>,
        secret_key: impl Into<String>,
    ) -> Self {
        Self {
            base_url: base_url.into(),
            access_id: access_id.into(),
            secret_key: secret_key.into(),
            request_timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
            requests_per_minute: DEFAULT_REQUESTS_PER_MINUTE,
            max_in_flight: DEFAULT_MAX_IN_FLIGHT,
        }
    }

    /// Create ClientConfig from environment variables.
    ///
    /// Environment variables:
    /// - `GROUPSCOUT_API_URL`: Upstream base URL (required)
    /// - `GROUPSCOUT_ACCESS_ID`: API access id (required)
    /// - `GROUPSCOUT_SECRET_KEY`: API secret key (required)
    /// - `GROUPSCOUT_REQUEST_TIMEOUT_SECS`: Per-request timeout (default: 30)
    /// - `GROUPSCOUT_REQUESTS_PER_MINUTE`: Client-side rate limit (default: 600)
    /// - `GROUPSCOUT_MAX_IN_FLIGHT`: Concurrent request cap (default: 16)
    pub fn from_env() -> GroupscoutResult<Self> {
        let required = |field: &str| {
            std::env::var(field)
                .ok()
                .filter(|v| !v.trim().is_empty())
                .ok_or_else(|| ConfigError::MissingRequired {
                    field: field.to_string(),
                })
        };

        let mut config = Self::new(
            required("GROUPSCOUT_API_URL")?,
            required("GROUPSCOUT_ACCESS_ID")?,
            required("GROUPSCOUT_SECRET_KEY")?,
        );

        if let Some(secs) = std::env::var("GROUPSCOUT_REQUEST_TIMEOUT_SECS")
            .ok()
            .and_then(|s| s.parse().ok())
        {
            config.request_timeout = Duration::from_secs(secs);
        }
        if let Some(rpm) = std::env::var("GROUPSCOUT_REQUESTS_PER_MINUTE")
            .ok()
            .and_then(|s| s.parse().ok())
        {
            config.requests_per_minute = rpm;
        }
        if let Some(max) = std::env::var("GROUPSCOUT_MAX_IN_FLIGHT")
            .ok()
            .and_then(|s| s.parse().ok())
        {
            config.max_in_flight = max;
        }

        config.validate()?;
        Ok(config)
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub fn with_requests_per_minute(mut self, rpm: u32) -> Self {
        self.requests_per_minute = rpm;
        self
    }

    pub fn with_max_in_flight(mut self, max: usize) -> Self {
        self.max_in_flight = max;
        self
    }

    /// Validate the configuration.
    pub fn validate(&self) -> GroupscoutResult<()> {
        Url::parse(&self.base_url).map_err(|e| ConfigError::InvalidValue {
            field: "base_url".to_string(),
            value: self.base_url.clone(),
            reason: e.to_string(),
        })?;

        if self.access_id.trim().is_empty() {
            return Err(ConfigError::MissingRequired {
                field: "access_id".to_string(),
            }
            .into());
        }

        if self.secret_key.is_empty() {
            return Err(ConfigError::MissingRequired {
                field: "secret_key".to_string(),
            }
            .into());
        }

        if self.request_timeout.is_zero() {
            return Err(ConfigError::InvalidValue {
                field: "request_timeout".to_string(),
                value: "0".to_string(),
                reason: "must be positive".to_string(),
            }
            .into());
        }

        Ok(())
    }
}

impl std::fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientConfig")
            .field("base_url", &self.base_url)
            .field("access_id", &self.access_id)
            .field("secret_key", &"[REDACTED]")
            .field("request_timeout", &self.request_timeout)
            .field("requests_per_minute", &self.requests_per_minute)
            .field("max_in_flight", &self.max_in_flight)
            .finish()
    }
}

// ============================================================================
// CLIENT
// ============================================================================

type DirectRateLimiter = RateLimiter<
    governor::state::NotKeyed,
    governor::state::InMemoryState,
    DefaultClock,
>;

/// Upstream API client with request signing and rate limiting.
pub struct UpstreamClient {
    client: Client,
    config: ClientConfig,
    in_flight: Arc<Semaphore>,
    rate_limiter: Arc<DirectRateLimiter>,
}

impl UpstreamClient {
    pub fn new(config: ClientConfig) -> GroupscoutResult<Self> {
        config.validate()?;

        let client = Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| ConfigError::InvalidValue {
                field: "http_client".to_string(),
                value: format!("{:?}", config.request_timeout),
                reason: e.to_string(),
            })?;

        // Burst of one spaces requests evenly across the minute.
        let quota = Quota::per_minute(
            NonZeroU32::new(config.requests_per_minute).unwrap_or(NonZeroU32::MIN),
        )
        .allow_burst(NonZeroU32::MIN);

        Ok(Self {
            client,
            in_flight: Arc::new(Semaphore::new(config.max_in_flight.max(1))),
            rate_limiter: Arc::new(RateLimiter::direct(quota)),
            config,
        })
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Issue a signed GET and unwrap the response envelope.
    pub async fn get<Res: DeserializeOwned>(
        &self,
        endpoint: &str,
        query: &[(&str, String)],
    ) -> UpstreamResult<Res> {
        let _permit = self
            .in_flight
            .acquire()
            .await
            .map_err(|e| UpstreamError::Transport {
                endpoint: endpoint.to_string(),
                reason: format!("In-flight limiter error: {}", e),
            })?;

        self.rate_limiter.until_ready().await;

        let url = self.build_url(endpoint, query)?;
        let path_and_query = match url.query() {
            Some(q) => format!("{}?{}", url.path(), q),
            None => url.path().to_string(),
        };
        let signed = sign_request(
            &self.config.access_id,
            &self.config.secret_key,
            &path_and_query,
            "GET",
            Utc::now().timestamp(),
        );

        tracing::trace!(endpoint, %path_and_query, "Issuing upstream request");

        let response = self
            .client
            .get(url)
            .header("Authorization", signed.authorization)
            .header("Timestamp", signed.timestamp)
            .header("Accept", "application/json")
            .send()
            .await
            .map_err(|e| transport_error(endpoint, e))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| transport_error(endpoint, e))?;

        if !status.is_success() {
            return Err(UpstreamError::Status {
                endpoint: endpoint.to_string(),
                status: status.as_u16(),
                body,
            });
        }

        let envelope: ApiEnvelope<Res> =
            serde_json::from_str(&body).map_err(|e| UpstreamError::InvalidResponse {
                endpoint: endpoint.to_string(),
                reason: format!("Failed to parse response: {}", e),
            })?;

        if envelope.status != STATUS_SUCCESS {
            return Err(UpstreamError::InvalidResponse {
                endpoint: endpoint.to_string(),
                reason: envelope
                    .message
                    .unwrap_or_else(|| format!("status {}", envelope.status)),
            });
        }

        envelope.data.ok_or_else(|| UpstreamError::InvalidResponse {
            endpoint: endpoint.to_string(),
            reason: "Response has no data".to_string(),
        })
    }

    fn build_url(&self, endpoint: &str, query: &[(&str, String)]) -> UpstreamResult<Url> {
        let base = self.config.base_url.trim_end_matches('/');
        let mut url = Url::parse(&format!("{}{}", base, endpoint)).map_err(|e| {
            UpstreamError::Transport {
                endpoint: endpoint.to_string(),
                reason: format!("Invalid URL: {}", e),
            }
        })?;
        if !query.is_empty() {
            url.query_pairs_mut()
                .extend_pairs(query.iter().map(|(k, v)| (*k, v.as_str())));
        }
        Ok(url)
    }
}

fn transport_error(endpoint: &str, e: reqwest::Error) -> UpstreamError {
    if e.is_timeout() {
        UpstreamError::Timeout {
            endpoint: endpoint.to_string(),
        }
    } else {
        UpstreamError::Transport {
            endpoint: endpoint.to_string(),
            reason: e.to_string(),
        }
    }
}

#[async_trait]
impl GroupSource for UpstreamClient {
    async fn list_owners(&self) -> UpstreamResult<Vec<Owner>> {
        let data: OwnersData = self.get(OWNERS_ENDPOINT, &[]).await?;
        Ok(data.owner)
    }

    async fn list_groups(
        &self,
        owner: &str,
        since: NaiveDate,
        page_limit: u32,
    ) -> UpstreamResult<Vec<Group>> {
        let query = [
            ("owner", owner.to_string()),
            ("resultStart", "0".to_string()),
            ("resultLimit", page_limit.to_string()),
            ("filters", format!("dateAdded>{}", since.format("%Y-%m-%d"))),
        ];
        let data: GroupsData = self.get(GROUPS_ENDPOINT, &query).await?;

        if let Some(count) = data.result_count {
            if count > page_limit as u64 {
                tracing::debug!(
                    owner,
                    result_count = count,
                    page_limit,
                    "Owner has more groups than one page; keeping the first page"
                );
            }
        }

        let fetched = data.group.len();
        let groups: Vec<Group> = data.group.into_iter().filter_map(Group::from_record).collect();
        if groups.len() < fetched {
            tracing::debug!(
                owner,
                skipped = fetched - groups.len(),
                "Skipped group records without a name or type"
            );
        }

        Ok(groups)
    }
}

impl std::fmt::Debug for UpstreamClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UpstreamClient")
            .field("base_url", &self.config.base_url)
            .field("access_id", &self.config.access_id)
            .field("secret_key", &"[REDACTED]")
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{header_exists, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client_for(server: &MockServer) -> UpstreamClient {
        let config = ClientConfig::new(server.uri(), "12345", "secret")
            .with_timeout(Duration::from_millis(500))
            .with_requests_per_minute(60_000);
        UpstreamClient::new(config).unwrap()
    }

    #[test]
    fn test_config_validate() {
        assert!(ClientConfig::new("https://api.example.test", "id", "key")
            .validate()
            .is_ok());
        assert!(ClientConfig::new("not a url", "id", "key").validate().is_err());
        assert!(ClientConfig::new("https://api.example.test", " ", "key")
            .validate()
            .is_err());
        assert!(ClientConfig::new("https://api.example.test", "id", "")
            .validate()
            .is_err());
    }

    #[test]
    fn test_config_debug_redacts_secret() {
        let config = ClientConfig::new("https://api.example.test", "id", "topsecret");
        let debug = format!("{:?}", config);
        assert!(!debug.contains("topsecret"));
        assert!(debug.contains("[REDACTED]"));
    }

    #[tokio::test]
    async fn test_list_owners_signed() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v2/owners"))
            .and(header_exists("Authorization"))
            .and(header_exists("Timestamp"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "status": "Success",
                "data": {
                    "resultCount": 2,
                    "owner": [
                        {"id": 1, "name": "Alpha", "type": "Organization"},
                        {"id": 2, "name": "Beta", "type": "Community"}
                    ]
                }
            })))
            .expect(1)
            .mount(&server)
            .await;

        let owners = client_for(&server).list_owners().await.unwrap();
        assert_eq!(owners, vec![Owner::new("Alpha"), Owner::new("Beta")]);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_requests_are_spaced_by_rate_limit() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v2/owners"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "status": "Success",
                "data": {"owner": []}
            })))
            .expect(5)
            .mount(&server)
            .await;

        // 600 rpm is one request every 100ms.
        let config = ClientConfig::new(server.uri(), "12345", "secret")
            .with_requests_per_minute(600)
            .with_max_in_flight(8);
        let client = Arc::new(UpstreamClient::new(config).unwrap());

        let started = std::time::Instant::now();
        let mut tasks = tokio::task::JoinSet::new();
        for _ in 0..5 {
            let client = Arc::clone(&client);
            tasks.spawn(async move { client.list_owners().await });
        }
        while let Some(joined) = tasks.join_next().await {
            joined.unwrap().unwrap();
        }

        // First request goes out immediately, the other four wait their turn.
        assert!(
            started.elapsed() >= Duration::from_millis(380),
            "five requests finished in {:?}",
            started.elapsed()
        );
    }

    #[tokio::test]
    async fn test_list_groups_redacts_and_filters_by_date() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v2/groups"))
            .and(query_param("owner", "Alpha"))
            .and(query_param("resultLimit", "10000"))
            .and(query_param("filters", "dateAdded>2024-01-01"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "status": "Success",
                "data": {
                    "resultCount": 3,
                    "group": [
                        {"id": 10, "ownerName": "Alpha", "name": "Project X Report", "type": "Report"},
                        {"id": 11, "ownerName": "Alpha", "name": "Op Nightfall", "type": "Campaign",
                         "dateAdded": "2024-02-01T00:00:00Z"},
                        {"id": 12, "ownerName": "Alpha", "type": "Report"}
                    ]
                }
            })))
            .mount(&server)
            .await;

        let since = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let groups = client_for(&server)
            .list_groups("Alpha", since, 10_000)
            .await
            .unwrap();

        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].name(), "Project X Report");
        for group in &groups {
            assert!(!group.attributes().contains_key("id"));
            assert!(!group.attributes().contains_key("ownerName"));
        }
        assert!(groups[1].attributes().contains_key("dateAdded"));
    }

    #[tokio::test]
    async fn test_non_success_status_is_upstream_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v2/owners"))
            .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
            .mount(&server)
            .await;

        let err = client_for(&server).list_owners().await.unwrap_err();
        assert_eq!(
            err,
            UpstreamError::Status {
                endpoint: OWNERS_ENDPOINT.to_string(),
                status: 500,
                body: "boom".to_string(),
            }
        );
    }

    #[tokio::test]
    async fn test_failure_envelope_is_invalid_response() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v2/owners"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "status": "Failure",
                "message": "Signature invalid"
            })))
            .mount(&server)
            .await;

        let err = client_for(&server).list_owners().await.unwrap_err();
        match err {
            UpstreamError::InvalidResponse { reason, .. } => {
                assert!(reason.contains("Signature invalid"))
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_malformed_body_is_invalid_response() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v2/owners"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>"))
            .mount(&server)
            .await;

        let err = client_for(&server).list_owners().await.unwrap_err();
        assert!(matches!(err, UpstreamError::InvalidResponse { .. }));
    }

    #[tokio::test]
    async fn test_slow_response_times_out() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v2/owners"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_delay(Duration::from_secs(3))
                    .set_body_json(json!({"status": "Success", "data": {"owner": []}})),
            )
            .mount(&server)
            .await;

        let err = client_for(&server).list_owners().await.unwrap_err();
        assert_eq!(
            err,
            UpstreamError::Timeout {
                endpoint: OWNERS_ENDPOINT.to_string()
            }
        );
    }
}
