//! groupscout Test Utilities
//!
//! Shared test infrastructure for the groupscout workspace:
//! - A scriptable [`MockGroupSource`] standing in for the upstream API
//! - Proptest generators for groups, snapshots and search terms
//! - Fixtures for common scenarios
//! - Assertions for groupscout-specific invariants

pub use groupscout_core::{
    Entity, Group, GroupscoutError, GroupscoutResult, LookupResult, Owner, SearchConfig,
    SearchHit, SearchOutcome, Snapshot, UpstreamError, REDACTED_FIELDS,
};
pub use groupscout_upstream::{GroupSource, UpstreamResult};

use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

// ============================================================================
// MOCK GROUP SOURCE
// ============================================================================

#[derive(Debug, Default)]
struct MockState {
    owners: Vec<String>,
    groups: HashMap<String, Vec<Group>>,
    owners_error: Option<UpstreamError>,
    group_errors: HashMap<String, UpstreamError>,
    owner_calls: usize,
    group_calls: Vec<String>,
    last_since: Option<NaiveDate>,
    last_page_limit: Option<u32>,
}

/// In-memory [`GroupSource`] with failure injection and call recording.
///
/// Data and failures can be changed between calls, so the same mock can
/// drive a scheduler through successful and failing refreshes.
#[derive(Debug, Default)]
pub struct MockGroupSource {
    state: Mutex<MockState>,
    delay: Option<Duration>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl MockGroupSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an owner and its groups (in upstream order).
    pub fn with_owner(self, name: impl Into<String>, groups: Vec<Group>) -> Self {
        self.set_owner(name, groups);
        self
    }

    /// Make every upstream call sleep first. Use with paused tokio time.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Add or replace an owner's groups.
    pub fn set_owner(&self, name: impl Into<String>, groups: Vec<Group>) {
        let name = name.into();
        let mut state = self.lock();
        if !state.owners.contains(&name) {
            state.owners.push(name.clone());
        }
        state.groups.insert(name, groups);
    }

    /// Fail (or stop failing) the owner listing.
    pub fn fail_owners(&self, error: Option<UpstreamError>) {
        self.lock().owners_error = error;
    }

    /// Fail (or stop failing) group fetches for one owner.
    pub fn fail_groups_for(&self, owner: &str, error: Option<UpstreamError>) {
        let mut state = self.lock();
        match error {
            Some(error) => {
                state.group_errors.insert(owner.to_string(), error);
            }
            None => {
                state.group_errors.remove(owner);
            }
        }
    }

    pub fn owner_calls(&self) -> usize {
        self.lock().owner_calls
    }

    /// Owners whose groups were requested, in call order.
    pub fn group_calls(&self) -> Vec<String> {
        self.lock().group_calls.clone()
    }

    pub fn last_since(&self) -> Option<NaiveDate> {
        self.lock().last_since
    }

    pub fn last_page_limit(&self) -> Option<u32> {
        self.lock().last_page_limit
    }

    /// Highest number of group fetches observed running at once.
    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    fn lock(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[async_trait]
impl GroupSource for MockGroupSource {
    async fn list_owners(&self) -> UpstreamResult<Vec<Owner>> {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        let mut state = self.lock();
        state.owner_calls += 1;
        if let Some(error) = &state.owners_error {
            return Err(error.clone());
        }
        Ok(state.owners.iter().map(Owner::new).collect())
    }

    async fn list_groups(
        &self,
        owner: &str,
        since: NaiveDate,
        page_limit: u32,
    ) -> UpstreamResult<Vec<Group>> {
        {
            let mut state = self.lock();
            state.group_calls.push(owner.to_string());
            state.last_since = Some(since);
            state.last_page_limit = Some(page_limit);
        }

        let current = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(current, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        let state = self.lock();
        if let Some(error) = state.group_errors.get(owner) {
            return Err(error.clone());
        }
        let groups = state.groups.get(owner).cloned().unwrap_or_default();
        Ok(groups.into_iter().take(page_limit as usize).collect())
    }
}

// ============================================================================
// PROPTEST GENERATORS
// ============================================================================

pub mod generators {
    //! Proptest strategies for groupscout types.

    use super::*;
    use proptest::prelude::*;

    /// Generate an owner name.
    pub fn arb_owner_name() -> impl Strategy<Value = String> {
        "[A-Z][a-z]{2,8}( [A-Z][a-z]{2,6})?"
    }

    /// Generate a group type from the standard set plus one unknown type.
    pub fn arb_group_type() -> impl Strategy<Value = String> {
        prop_oneof![
            Just("Report".to_string()),
            Just("Incident".to_string()),
            Just("Campaign".to_string()),
            Just("Adversary".to_string()),
            Just("Email".to_string()),
            Just("Custom Type".to_string()),
        ]
    }

    /// Generate a group name of mixed-case words.
    pub fn arb_group_name() -> impl Strategy<Value = String> {
        "[A-Za-z]{1,8}( [A-Za-z0-9]{1,8}){0,3}"
    }

    /// Generate a group, sometimes carrying an extra attribute.
    pub fn arb_group() -> impl Strategy<Value = Group> {
        (arb_group_name(), arb_group_type(), any::<bool>()).prop_map(|(name, group_type, extra)| {
            let group = Group::new(name, group_type);
            if extra {
                group.with_attribute("dateAdded", serde_json::json!("2024-01-01T00:00:00Z"))
            } else {
                group
            }
        })
    }

    /// Generate a raw upstream group record, including fields that must be redacted.
    pub fn arb_group_record() -> impl Strategy<Value = serde_json::Map<String, serde_json::Value>>
    {
        (any::<u32>(), arb_owner_name(), arb_group_name(), arb_group_type()).prop_map(
            |(id, owner, name, group_type)| {
                let mut record = serde_json::Map::new();
                record.insert("id".to_string(), serde_json::json!(id));
                record.insert("ownerName".to_string(), serde_json::json!(owner));
                record.insert("name".to_string(), serde_json::json!(name));
                record.insert("type".to_string(), serde_json::json!(group_type));
                record
            },
        )
    }

    /// Generate a snapshot with up to five owners.
    pub fn arb_snapshot() -> impl Strategy<Value = Snapshot> {
        prop::collection::btree_map(
            arb_owner_name(),
            prop::collection::vec(arb_group(), 0..12),
            0..5,
        )
        .prop_map(|owners| Snapshot::assemble(owners, Utc::now()))
    }

    /// Generate a short search term.
    pub fn arb_term() -> impl Strategy<Value = String> {
        "[A-Za-z0-9]{1,4}"
    }

    /// Generate a comma-separated owner list with irregular spacing and case.
    pub fn arb_name_list() -> impl Strategy<Value = String> {
        prop::collection::vec(arb_owner_name(), 0..4).prop_map(|names| {
            names
                .iter()
                .enumerate()
                .map(|(i, n)| if i % 2 == 0 { n.to_lowercase() } else { format!(" {} ", n) })
                .collect::<Vec<_>>()
                .join(",")
        })
    }

    /// Generate a valid search configuration.
    pub fn arb_search_config() -> impl Strategy<Value = SearchConfig> {
        (1usize..20, 0usize..10, arb_name_list(), arb_name_list()).prop_map(
            |(result_limit, max_len, blocklist, allowlist)| SearchConfig {
                result_limit,
                max_search_term_length: max_len,
                search_blocklist: blocklist,
                search_allowlist: allowlist,
                ..SearchConfig::default()
            },
        )
    }
}

// ============================================================================
// TEST FIXTURES
// ============================================================================

pub mod fixtures {
    //! Pre-built fixtures for common scenarios.

    use super::*;

    pub fn report(name: &str) -> Group {
        Group::new(name, "Report")
    }

    pub fn incident(name: &str) -> Group {
        Group::new(name, "Incident")
    }

    /// Two owners, Alpha and Beta, with a few reports and incidents each.
    pub fn two_owner_source() -> MockGroupSource {
        MockGroupSource::new()
            .with_owner(
                "Alpha",
                vec![
                    report("Project X Report"),
                    incident("Phishing wave"),
                    report("Quarterly summary"),
                ],
            )
            .with_owner(
                "Beta",
                vec![report("Project Y Report"), incident("Project Z breach")],
            )
    }

    /// Snapshot matching [`two_owner_source`].
    pub fn two_owner_snapshot() -> Snapshot {
        Snapshot::assemble(
            vec![
                (
                    "Alpha".to_string(),
                    vec![
                        report("Project X Report"),
                        incident("Phishing wave"),
                        report("Quarterly summary"),
                    ],
                ),
                (
                    "Beta".to_string(),
                    vec![report("Project Y Report"), incident("Project Z breach")],
                ),
            ],
            Utc::now(),
        )
    }

    pub fn search_config() -> SearchConfig {
        SearchConfig::default()
    }

    pub fn server_error() -> UpstreamError {
        UpstreamError::Status {
            endpoint: "/v2/owners".to_string(),
            status: 500,
            body: "Internal Server Error".to_string(),
        }
    }

    pub fn entities(values: &[&str]) -> Vec<Entity> {
        values.iter().map(|v| Entity::new(*v)).collect()
    }
}

// ============================================================================
// CUSTOM ASSERTIONS
// ============================================================================

pub mod assertions {
    //! Assertions for groupscout-specific validation.

    use super::*;

    /// Assert that no redacted field is present on the group.
    #[track_caller]
    pub fn assert_redacted(group: &Group) {
        for field in REDACTED_FIELDS {
            assert!(
                !group.attributes().contains_key(field),
                "Group {:?} exposes redacted field {}",
                group.name(),
                field
            );
        }
    }

    /// Assert that every group in every hit contains `term` case-insensitively.
    #[track_caller]
    pub fn assert_hit_matches(hit: &SearchHit, term: &str) {
        let needle = term.to_lowercase();
        for (owner, matches) in &hit.search_results {
            for (group_type, type_matches) in &matches.group_types {
                for group in &type_matches.groups {
                    assert!(
                        group.name().to_lowercase().contains(&needle),
                        "{}/{}: {:?} does not contain {:?}",
                        owner,
                        group_type,
                        group.name(),
                        term
                    );
                }
            }
        }
    }

    /// Assert that a result is an upstream error.
    #[track_caller]
    pub fn assert_upstream_error<T: std::fmt::Debug>(result: &GroupscoutResult<T>) {
        match result {
            Err(GroupscoutError::Upstream(_)) => {}
            other => panic!("Expected Upstream error, got: {:?}", other),
        }
    }

    /// Assert that a result is a cache error.
    #[track_caller]
    pub fn assert_cache_error<T: std::fmt::Debug>(result: &GroupscoutResult<T>) {
        match result {
            Err(GroupscoutError::Cache(_)) => {}
            other => panic!("Expected Cache error, got: {:?}", other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_records_calls() {
        let source = fixtures::two_owner_source();
        let owners = source.list_owners().await.unwrap();
        assert_eq!(owners, vec![Owner::new("Alpha"), Owner::new("Beta")]);

        let since = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let groups = source.list_groups("Beta", since, 1).await.unwrap();
        assert_eq!(groups.len(), 1);
        assert_eq!(source.owner_calls(), 1);
        assert_eq!(source.group_calls(), vec!["Beta".to_string()]);
        assert_eq!(source.last_since(), Some(since));
        assert_eq!(source.last_page_limit(), Some(1));
    }

    #[test]
    fn test_fixture_snapshot_matches_fixture_source() {
        let snapshot = fixtures::two_owner_snapshot();
        assert_eq!(snapshot.owner_count(), 2);
        assert_eq!(snapshot.group_count(), 5);

        let hit = groupscout_core::search_term("project", &snapshot, &fixtures::search_config())
            .into_hit()
            .unwrap();
        assertions::assert_hit_matches(&hit, "project");
        assert_eq!(hit.total_groups, 3);
    }

    #[tokio::test]
    async fn test_mock_failure_injection() {
        let source = fixtures::two_owner_source();
        source.fail_owners(Some(fixtures::server_error()));
        assert!(source.list_owners().await.is_err());
        source.fail_owners(None);
        assert!(source.list_owners().await.is_ok());

        let since = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        source.fail_groups_for("Alpha", Some(fixtures::server_error()));
        assert!(source.list_groups("Alpha", since, 10).await.is_err());
        assert!(source.list_groups("Beta", since, 10).await.is_ok());
    }
}
