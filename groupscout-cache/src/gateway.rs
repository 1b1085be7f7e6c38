//! Lookup gateway
//!
//! Entry point for lookups: makes sure a snapshot exists, then searches
//! every entity concurrently against that one snapshot.

use groupscout_core::{
    is_searchable, search_term, CacheError, Entity, GroupscoutResult, LookupData, LookupResult,
    SearchConfig,
};
use std::sync::Arc;
use tokio::task::JoinSet;

use crate::scheduler::{CacheStatus, RefreshScheduler};

#[derive(Debug, Clone)]
pub struct LookupGateway {
    scheduler: RefreshScheduler,
}

impl LookupGateway {
    pub fn new(scheduler: RefreshScheduler) -> Self {
        Self { scheduler }
    }

    pub fn scheduler(&self) -> &RefreshScheduler {
        &self.scheduler
    }

    /// Search every entity. Results come back in input order.
    ///
    /// Blank terms and terms over the length guard get `data: None` without
    /// any upstream or search work. When every entity is skipped no snapshot
    /// is built. Otherwise this fails only when no snapshot exists and
    /// building one fails.
    pub async fn lookup(&self, entities: Vec<Entity>) -> GroupscoutResult<Vec<LookupResult>> {
        let config = self.scheduler.search_config()?;
        let count = entities.len();

        let mut results: Vec<Option<LookupResult>> = vec![None; count];
        let mut searchable = Vec::with_capacity(count);
        for (index, entity) in entities.into_iter().enumerate() {
            if is_searchable(&entity.value, &config) {
                searchable.push((index, entity));
            } else {
                tracing::debug!(entity = %entity.value, "Entity skipped by search guard");
                results[index] = Some(LookupResult { entity, data: None });
            }
        }

        if !searchable.is_empty() {
            let snapshot = self.scheduler.ensure_snapshot().await?;

            let mut tasks = JoinSet::new();
            for (index, entity) in searchable {
                let snapshot = Arc::clone(&snapshot);
                let config = Arc::clone(&config);
                tasks.spawn(async move {
                    let data = search_term(&entity.value, &snapshot, &config)
                        .into_hit()
                        .map(LookupData::from);
                    (index, LookupResult { entity, data })
                });
            }

            while let Some(joined) = tasks.join_next().await {
                let (index, result) = joined.map_err(|e| CacheError::SearchTaskFailed {
                    reason: e.to_string(),
                })?;
                results[index] = Some(result);
            }
        }

        let results: Vec<LookupResult> = results.into_iter().flatten().collect();
        tracing::debug!(
            entities = count,
            with_results = results.iter().filter(|r| r.data.is_some()).count(),
            "Lookup completed"
        );
        Ok(results)
    }

    /// Validate and install a new search configuration.
    ///
    /// An owner-list conflict is logged, not rejected.
    pub fn set_search_config(&self, config: SearchConfig) -> GroupscoutResult<()> {
        config.validate()?;
        config.warn_on_ambiguity();
        self.scheduler.set_search_config(config)
    }

    pub fn search_config(&self) -> GroupscoutResult<Arc<SearchConfig>> {
        self.scheduler.search_config()
    }

    pub fn status(&self) -> GroupscoutResult<CacheStatus> {
        self.scheduler.status()
    }
}
