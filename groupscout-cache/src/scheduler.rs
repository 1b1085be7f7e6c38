//! Refresh Scheduler
//!
//! Owns the published snapshot and decides when it is rebuilt:
//!
//! - On first use, when no snapshot exists yet. The caller waits for the build.
//! - Every `refresh_interval` on a background timer. Readers keep seeing the
//!   previous snapshot until the new one is published.
//! - On demand via [`RefreshScheduler::refresh_now`].
//!
//! The timer is armed lazily, exactly once, the first time the scheduler is
//! used. Builds are serialized; concurrent first lookups wait on the same
//! build lock and share the outcome of the build they queued behind: its
//! snapshot on success, its error on failure.
//!
//! A failed scheduled refresh is logged and the previous snapshot stays in
//! place. A failed first build is returned to every caller waiting on it and
//! the scheduler stays [`SchedulerState::Empty`] until a later attempt
//! succeeds.

use chrono::{DateTime, Utc};
use groupscout_core::{CacheError, GroupscoutError, GroupscoutResult, SearchConfig, Snapshot};
use serde::Serialize;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, RwLock, Weak};
use std::time::{Duration, Instant};
use tokio::sync::{watch, Mutex};
use tokio::time::{interval_at, MissedTickBehavior};

use crate::builder::SnapshotBuilder;
use crate::config::CacheConfig;
use crate::store::SnapshotStore;

// ============================================================================
// STATE AND STATUS
// ============================================================================

/// Whether a snapshot has been published yet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SchedulerState {
    Empty,
    Populated,
}

/// Point-in-time view of the cache for status endpoints.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheStatus {
    pub state: SchedulerState,
    pub built_at: Option<DateTime<Utc>>,
    pub staleness_secs: Option<u64>,
    pub owners: usize,
    pub groups: usize,
    pub timer_armed: bool,
    pub refresh_interval_secs: u64,
    pub metrics: RefreshMetricsSnapshot,
}

// ============================================================================
// METRICS
// ============================================================================

/// Counters for build activity since startup.
#[derive(Debug, Default)]
pub struct RefreshMetrics {
    /// Builds that produced and published a snapshot
    pub builds_succeeded: AtomicU64,

    /// Builds that failed (first builds, scheduled and manual refreshes)
    pub builds_failed: AtomicU64,

    /// Owner count of the last published snapshot
    pub last_owner_count: AtomicU64,

    /// Group count of the last published snapshot
    pub last_group_count: AtomicU64,

    /// Wall-clock duration of the last successful build
    pub last_build_millis: AtomicU64,
}

impl RefreshMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get current snapshot of all metrics.
    pub fn snapshot(&self) -> RefreshMetricsSnapshot {
        RefreshMetricsSnapshot {
            builds_succeeded: self.builds_succeeded.load(Ordering::Relaxed),
            builds_failed: self.builds_failed.load(Ordering::Relaxed),
            last_owner_count: self.last_owner_count.load(Ordering::Relaxed),
            last_group_count: self.last_group_count.load(Ordering::Relaxed),
            last_build_millis: self.last_build_millis.load(Ordering::Relaxed),
        }
    }

    fn record_success(&self, snapshot: &Snapshot, elapsed: Duration) {
        self.builds_succeeded.fetch_add(1, Ordering::Relaxed);
        self.last_owner_count
            .store(snapshot.owner_count() as u64, Ordering::Relaxed);
        self.last_group_count
            .store(snapshot.group_count() as u64, Ordering::Relaxed);
        self.last_build_millis
            .store(elapsed.as_millis() as u64, Ordering::Relaxed);
    }

    fn record_failure(&self) {
        self.builds_failed.fetch_add(1, Ordering::Relaxed);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshMetricsSnapshot {
    pub builds_succeeded: u64,
    pub builds_failed: u64,
    pub last_owner_count: u64,
    pub last_group_count: u64,
    pub last_build_millis: u64,
}

// ============================================================================
// SCHEDULER
// ============================================================================

/// Outcome of the last finished build. Guarded by the build lock.
#[derive(Debug, Default)]
struct BuildRecord {
    last_error: Option<GroupscoutError>,
}

struct SchedulerInner {
    builder: SnapshotBuilder,
    store: SnapshotStore,
    search_config: RwLock<Arc<SearchConfig>>,
    refresh_interval: Duration,
    armed: AtomicBool,
    build_lock: Mutex<BuildRecord>,
    /// Incremented under the build lock each time a build finishes.
    build_generation: AtomicU64,
    shutdown_tx: watch::Sender<bool>,
    metrics: RefreshMetrics,
}

/// Cheaply cloneable handle to the snapshot cache.
#[derive(Clone)]
pub struct RefreshScheduler {
    inner: Arc<SchedulerInner>,
}

impl RefreshScheduler {
    pub fn new(builder: SnapshotBuilder, cache: &CacheConfig, search: SearchConfig) -> Self {
        let (shutdown_tx, _) = watch::channel(false);
        Self {
            inner: Arc::new(SchedulerInner {
                builder,
                store: SnapshotStore::new(),
                search_config: RwLock::new(Arc::new(search)),
                // interval_at panics on a zero period
                refresh_interval: cache.refresh_interval.max(Duration::from_millis(1)),
                armed: AtomicBool::new(false),
                build_lock: Mutex::new(BuildRecord::default()),
                build_generation: AtomicU64::new(0),
                shutdown_tx,
                metrics: RefreshMetrics::new(),
            }),
        }
    }

    /// Return the current snapshot, building it first if none exists.
    ///
    /// Arms the refresh timer on the first call.
    pub async fn ensure_snapshot(&self) -> GroupscoutResult<Arc<Snapshot>> {
        self.arm();

        if let Some(snapshot) = self.inner.store.current()? {
            return Ok(snapshot);
        }

        let observed = self.inner.build_generation.load(Ordering::Acquire);
        let mut record = self.inner.build_lock.lock().await;

        // Another caller may have published while we waited for the lock.
        if let Some(snapshot) = self.inner.store.current()? {
            return Ok(snapshot);
        }

        // A build finished while we waited and published nothing.
        if self.inner.build_generation.load(Ordering::Acquire) != observed {
            if let Some(error) = &record.last_error {
                tracing::debug!(error = %error, "Sharing failed build outcome with waiting lookup");
                return Err(error.clone());
            }
        }

        tracing::info!("No snapshot yet; building before serving lookup");
        self.inner.build_and_publish(&mut record).await
    }

    /// Rebuild and publish now, returning any build error to the caller.
    ///
    /// The previous snapshot stays published when the build fails.
    pub async fn refresh_now(&self) -> GroupscoutResult<Arc<Snapshot>> {
        self.arm();
        let mut record = self.inner.build_lock.lock().await;
        self.inner.build_and_publish(&mut record).await
    }

    /// Spawn the refresh timer if it has not been spawned yet.
    fn arm(&self) {
        if self.inner.armed.swap(true, Ordering::SeqCst) {
            return;
        }
        if *self.inner.shutdown_tx.borrow() {
            return;
        }

        let weak = Arc::downgrade(&self.inner);
        let shutdown_rx = self.inner.shutdown_tx.subscribe();
        let period = self.inner.refresh_interval;
        tokio::spawn(refresh_loop(weak, period, shutdown_rx));

        tracing::info!(
            refresh_interval_secs = period.as_secs(),
            "Snapshot refresh timer armed"
        );
    }

    /// Stop the refresh timer. Later builds fail with [`CacheError::ShutDown`].
    pub fn shutdown(&self) {
        let _ = self.inner.shutdown_tx.send_replace(true);
    }

    pub fn is_armed(&self) -> bool {
        self.inner.armed.load(Ordering::SeqCst)
    }

    pub fn state(&self) -> GroupscoutResult<SchedulerState> {
        Ok(if self.inner.store.is_populated()? {
            SchedulerState::Populated
        } else {
            SchedulerState::Empty
        })
    }

    /// The current snapshot without triggering a build.
    pub fn current(&self) -> GroupscoutResult<Option<Arc<Snapshot>>> {
        self.inner.store.current()
    }

    pub fn status(&self) -> GroupscoutResult<CacheStatus> {
        let current = self.inner.store.current()?;
        Ok(CacheStatus {
            state: if current.is_some() {
                SchedulerState::Populated
            } else {
                SchedulerState::Empty
            },
            built_at: current.as_ref().map(|s| s.built_at()),
            staleness_secs: current.as_ref().map(|s| s.staleness().as_secs()),
            owners: current.as_ref().map_or(0, |s| s.owner_count()),
            groups: current.as_ref().map_or(0, |s| s.group_count()),
            timer_armed: self.is_armed(),
            refresh_interval_secs: self.inner.refresh_interval.as_secs(),
            metrics: self.inner.metrics.snapshot(),
        })
    }

    pub fn metrics(&self) -> RefreshMetricsSnapshot {
        self.inner.metrics.snapshot()
    }

    pub fn search_config(&self) -> GroupscoutResult<Arc<SearchConfig>> {
        let guard = self
            .inner
            .search_config
            .read()
            .map_err(|_| CacheError::LockPoisoned)?;
        Ok(Arc::clone(&guard))
    }

    /// Replace the search configuration. Takes effect for the next search
    /// and the next build; the published snapshot is not rebuilt.
    pub fn set_search_config(&self, config: SearchConfig) -> GroupscoutResult<()> {
        let mut guard = self
            .inner
            .search_config
            .write()
            .map_err(|_| CacheError::LockPoisoned)?;
        *guard = Arc::new(config);
        Ok(())
    }
}

impl std::fmt::Debug for RefreshScheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RefreshScheduler")
            .field("refresh_interval", &self.inner.refresh_interval)
            .field("armed", &self.is_armed())
            .finish()
    }
}

impl SchedulerInner {
    /// Build, publish and record the outcome. `record` is the guard of
    /// `build_lock`.
    async fn build_and_publish(&self, record: &mut BuildRecord) -> GroupscoutResult<Arc<Snapshot>> {
        let result = self.try_build_and_publish().await;
        record.last_error = result.as_ref().err().cloned();
        self.build_generation.fetch_add(1, Ordering::AcqRel);
        result
    }

    async fn try_build_and_publish(&self) -> GroupscoutResult<Arc<Snapshot>> {
        if *self.shutdown_tx.borrow() {
            return Err(CacheError::ShutDown.into());
        }

        let config = {
            let guard = self
                .search_config
                .read()
                .map_err(|_| CacheError::LockPoisoned)?;
            Arc::clone(&guard)
        };

        let started = Instant::now();
        match self.builder.build(&config).await {
            Ok(snapshot) => {
                self.metrics.record_success(&snapshot, started.elapsed());
                self.store.publish(snapshot)
            }
            Err(e) => {
                self.metrics.record_failure();
                Err(e)
            }
        }
    }

    async fn scheduled_refresh(&self) {
        let mut record = self.build_lock.lock().await;
        match self.build_and_publish(&mut record).await {
            Ok(snapshot) => {
                tracing::info!(
                    owners = snapshot.owner_count(),
                    groups = snapshot.group_count(),
                    "Scheduled refresh published new snapshot"
                );
            }
            Err(e) => {
                let had_snapshot = matches!(self.store.current(), Ok(Some(_)));
                tracing::warn!(
                    error = %e,
                    serving_previous = had_snapshot,
                    "Scheduled refresh failed; will retry next tick"
                );
            }
        }
    }
}

async fn refresh_loop(
    inner: Weak<SchedulerInner>,
    period: Duration,
    mut shutdown_rx: watch::Receiver<bool>,
) {
    let mut ticker = interval_at(tokio::time::Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            changed = shutdown_rx.changed() => {
                if changed.is_err() || *shutdown_rx.borrow() {
                    tracing::info!("Snapshot refresh timer shutting down");
                    break;
                }
            }

            _ = ticker.tick() => {
                let Some(scheduler) = inner.upgrade() else {
                    break;
                };
                scheduler.scheduled_refresh().await;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use groupscout_test_utils::assertions::assert_cache_error;
    use groupscout_test_utils::fixtures::{report, server_error, two_owner_source};
    use groupscout_test_utils::MockGroupSource;

    fn scheduler(source: Arc<MockGroupSource>) -> RefreshScheduler {
        let cache = CacheConfig::default();
        RefreshScheduler::new(
            SnapshotBuilder::new(source, &cache),
            &cache,
            SearchConfig::default(),
        )
    }

    #[tokio::test]
    async fn test_not_armed_at_construction() {
        let source = Arc::new(two_owner_source());
        let scheduler = scheduler(source.clone());
        assert!(!scheduler.is_armed());
        assert_eq!(scheduler.state().unwrap(), SchedulerState::Empty);
        assert_eq!(source.owner_calls(), 0);
    }

    #[tokio::test]
    async fn test_first_use_builds_and_arms() {
        let source = Arc::new(two_owner_source());
        let scheduler = scheduler(source.clone());

        let snapshot = scheduler.ensure_snapshot().await.unwrap();
        assert_eq!(snapshot.owner_count(), 2);
        assert!(scheduler.is_armed());
        assert_eq!(scheduler.state().unwrap(), SchedulerState::Populated);

        // Second use serves the published snapshot without another build.
        scheduler.ensure_snapshot().await.unwrap();
        assert_eq!(source.owner_calls(), 1);
        assert_eq!(scheduler.metrics().builds_succeeded, 1);
    }

    #[tokio::test]
    async fn test_failed_first_build_surfaces_and_stays_empty() {
        let source = Arc::new(two_owner_source());
        source.fail_owners(Some(server_error()));
        let scheduler = scheduler(source.clone());

        assert!(scheduler.ensure_snapshot().await.is_err());
        assert_eq!(scheduler.state().unwrap(), SchedulerState::Empty);
        assert_eq!(scheduler.metrics().builds_failed, 1);

        source.fail_owners(None);
        assert!(scheduler.ensure_snapshot().await.is_ok());
        assert_eq!(scheduler.state().unwrap(), SchedulerState::Populated);
    }

    #[tokio::test]
    async fn test_refresh_now_keeps_previous_on_failure() {
        let source = Arc::new(two_owner_source());
        let scheduler = scheduler(source.clone());
        let first = scheduler.ensure_snapshot().await.unwrap();

        source.fail_owners(Some(server_error()));
        assert!(scheduler.refresh_now().await.is_err());

        let current = scheduler.current().unwrap().unwrap();
        assert!(Arc::ptr_eq(&first, &current));
    }

    #[tokio::test]
    async fn test_refresh_now_publishes_new_data() {
        let source = Arc::new(two_owner_source());
        let scheduler = scheduler(source.clone());
        scheduler.ensure_snapshot().await.unwrap();

        source.set_owner("Gamma", vec![report("Fresh report")]);
        let refreshed = scheduler.refresh_now().await.unwrap();
        assert_eq!(refreshed.owner_count(), 3);
    }

    #[tokio::test]
    async fn test_shutdown_rejects_builds() {
        let source = Arc::new(two_owner_source());
        let scheduler = scheduler(source);
        scheduler.shutdown();

        let err = scheduler.ensure_snapshot().await.unwrap_err();
        assert_eq!(err, GroupscoutError::from(CacheError::ShutDown));
        assert_cache_error(&scheduler.refresh_now().await);
    }

    #[tokio::test]
    async fn test_set_search_config_applies_to_next_build() {
        let source = Arc::new(two_owner_source());
        let scheduler = scheduler(source.clone());
        scheduler
            .set_search_config(SearchConfig {
                search_allowlist: "alpha".to_string(),
                ..SearchConfig::default()
            })
            .unwrap();

        let snapshot = scheduler.ensure_snapshot().await.unwrap();
        assert_eq!(snapshot.owner_names().collect::<Vec<_>>(), vec!["Alpha"]);
    }

    #[test]
    fn test_status_serializes_lowercase_state() {
        let source = Arc::new(MockGroupSource::new());
        let status = scheduler(source).status().unwrap();
        let json = serde_json::to_value(&status).unwrap();
        assert_eq!(json["state"], "empty");
        assert_eq!(json["owners"], 0);
        assert_eq!(json["timerArmed"], false);
        assert_eq!(json["refreshIntervalSecs"], 3600);
    }
}
