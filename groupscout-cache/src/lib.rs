//! groupscout Cache - Snapshot Cache Engine
//!
//! Builds per-owner, type-partitioned snapshots from a
//! [`groupscout_upstream::GroupSource`], keeps the latest one published in a
//! [`SnapshotStore`], refreshes it on a timer, and serves lookups through the
//! [`LookupGateway`].
//!
//! ```ignore
//! let cache = CacheConfig::from_env();
//! let builder = SnapshotBuilder::new(Arc::new(client), &cache);
//! let gateway = LookupGateway::new(RefreshScheduler::new(builder, &cache, SearchConfig::from_env()));
//! let results = gateway.lookup(vec![Entity::new("project")]).await?;
//! ```

pub mod builder;
pub mod config;
pub mod gateway;
pub mod scheduler;
pub mod store;

pub use builder::SnapshotBuilder;
pub use config::{CacheConfig, DEFAULT_FETCH_CONCURRENCY, DEFAULT_REFRESH_INTERVAL_SECS};
pub use gateway::LookupGateway;
pub use scheduler::{
    CacheStatus, RefreshMetrics, RefreshMetricsSnapshot, RefreshScheduler, SchedulerState,
};
pub use store::SnapshotStore;
