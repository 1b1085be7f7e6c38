//! Snapshot builder
//!
//! A build lists owners, drops the ones the owner filter rejects, fetches
//! the remaining owners' groups concurrently and assembles one [`Snapshot`].
//! The build is all-or-nothing: the first failed fetch aborts the rest.

use chrono::Utc;
use groupscout_core::{CacheError, Group, GroupscoutResult, OwnerFilter, SearchConfig, Snapshot};
use groupscout_upstream::{lookback_start, GroupSource, UpstreamResult};
use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

use crate::config::CacheConfig;

/// Builds snapshots from a [`GroupSource`].
#[derive(Clone)]
pub struct SnapshotBuilder {
    source: Arc<dyn GroupSource>,
    fetch_concurrency: usize,
    page_limit: u32,
}

impl SnapshotBuilder {
    pub fn new(source: Arc<dyn GroupSource>, config: &CacheConfig) -> Self {
        Self {
            source,
            fetch_concurrency: config.fetch_concurrency.max(1),
            page_limit: config.page_limit,
        }
    }

    /// Fetch every filtered owner's groups and assemble a snapshot.
    ///
    /// # Arguments
    ///
    /// * `config` - Supplies the lookback window and the owner lists
    ///
    /// # Errors
    ///
    /// Any upstream failure, either listing owners or fetching one owner's
    /// groups, fails the whole build. Nothing is returned for a partial build.
    pub async fn build(&self, config: &SearchConfig) -> GroupscoutResult<Snapshot> {
        let started = Instant::now();

        let owners = self.source.list_owners().await?;
        let listed = owners.len();

        let filter = OwnerFilter::from_config(config);
        let names = filter.filter_owners(owners.into_iter().map(|o| o.name).collect());

        tracing::info!(
            owners_listed = listed,
            owners_selected = names.len(),
            lookback_days = config.max_lookback_days,
            "Snapshot build started"
        );

        let since = lookback_start(Utc::now(), config.max_lookback_days);
        let fetched = self.fetch_all(names, since).await?;

        let snapshot = Snapshot::assemble(fetched, Utc::now());

        tracing::info!(
            owners = snapshot.owner_count(),
            groups = snapshot.group_count(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Snapshot build finished"
        );

        Ok(snapshot)
    }

    async fn fetch_all(
        &self,
        names: Vec<String>,
        since: chrono::NaiveDate,
    ) -> GroupscoutResult<Vec<(String, Vec<Group>)>> {
        let semaphore = Arc::new(Semaphore::new(self.fetch_concurrency));
        let mut pending: BTreeSet<String> = names.iter().cloned().collect();
        let mut tasks: JoinSet<(String, UpstreamResult<Vec<Group>>)> = JoinSet::new();

        for name in names {
            let source = Arc::clone(&self.source);
            let semaphore = Arc::clone(&semaphore);
            let page_limit = self.page_limit;

            tasks.spawn(async move {
                // The semaphore is never closed.
                let _permit = semaphore.acquire_owned().await.ok();
                tracing::debug!(owner = %name, %since, page_limit, "Fetching owner groups");
                let result = source.list_groups(&name, since, page_limit).await;
                (name, result)
            });
        }

        let mut fetched = Vec::with_capacity(pending.len());
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((name, Ok(groups))) => {
                    tracing::debug!(owner = %name, groups = groups.len(), "Fetched owner groups");
                    pending.remove(&name);
                    fetched.push((name, groups));
                }
                Ok((name, Err(e))) => {
                    tasks.abort_all();
                    tracing::warn!(owner = %name, error = %e, "Owner fetch failed; aborting build");
                    return Err(e.into());
                }
                Err(e) => {
                    tasks.abort_all();
                    let owner = if pending.len() == 1 {
                        pending.iter().next().cloned().unwrap_or_default()
                    } else {
                        "unknown".to_string()
                    };
                    tracing::error!(owner = %owner, error = %e, "Owner fetch task failed");
                    return Err(CacheError::FetchTaskFailed {
                        owner,
                        reason: e.to_string(),
                    }
                    .into());
                }
            }
        }

        Ok(fetched)
    }
}

impl std::fmt::Debug for SnapshotBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SnapshotBuilder")
            .field("fetch_concurrency", &self.fetch_concurrency)
            .field("page_limit", &self.page_limit)
            .finish()
    }
}
