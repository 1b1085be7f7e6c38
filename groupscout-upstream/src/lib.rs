//! groupscout Upstream - Threat-Intelligence API Access
//!
//! The [`GroupSource`] trait is the seam the cache builds against. The
//! production implementation is [`UpstreamClient`], a signed reqwest client;
//! tests substitute the scriptable mock from `groupscout-test-utils`.

pub mod client;
pub mod signing;
pub mod types;

use async_trait::async_trait;
use chrono::{DateTime, Duration, NaiveDate, Utc};
use groupscout_core::{Group, Owner, UpstreamError};

pub use client::{ClientConfig, UpstreamClient, GROUPS_ENDPOINT, OWNERS_ENDPOINT};
pub use signing::{sign_request, SignedHeaders};

/// Result type for upstream calls.
pub type UpstreamResult<T> = Result<T, UpstreamError>;

/// Maximum groups requested per owner in one call.
pub const DEFAULT_PAGE_LIMIT: u32 = 10_000;

/// Source of owners and their groups.
#[async_trait]
pub trait GroupSource: Send + Sync {
    /// List every owner visible to the configured credentials.
    async fn list_owners(&self) -> UpstreamResult<Vec<Owner>>;

    /// List one owner's groups added after `since`, at most `page_limit`.
    ///
    /// Returned groups are already redacted.
    async fn list_groups(
        &self,
        owner: &str,
        since: NaiveDate,
        page_limit: u32,
    ) -> UpstreamResult<Vec<Group>>;
}

/// First day of a lookback window of `days` ending at `now`.
pub fn lookback_start(now: DateTime<Utc>, days: u32) -> NaiveDate {
    (now - Duration::days(i64::from(days))).date_naive()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_lookback_start() {
        let now = Utc.with_ymd_and_hms(2024, 3, 31, 12, 0, 0).unwrap();
        assert_eq!(
            lookback_start(now, 90),
            NaiveDate::from_ymd_opt(2024, 1, 1).unwrap()
        );
        assert_eq!(lookback_start(now, 0), now.date_naive());
    }
}
