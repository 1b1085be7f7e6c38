//! Published snapshot handle

use groupscout_core::{CacheError, GroupscoutResult, Snapshot};
use std::sync::{Arc, RwLock};

/// Single-writer, multi-reader handle to the current [`Snapshot`].
///
/// Readers clone the `Arc` and release the lock immediately, so a reader
/// keeps a consistent snapshot for as long as it needs while a writer
/// replaces the handle.
#[derive(Debug, Default)]
pub struct SnapshotStore {
    current: RwLock<Option<Arc<Snapshot>>>,
}

impl SnapshotStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// The latest published snapshot, if any build has succeeded.
    pub fn current(&self) -> GroupscoutResult<Option<Arc<Snapshot>>> {
        let guard = self.current.read().map_err(|_| CacheError::LockPoisoned)?;
        Ok(guard.clone())
    }

    /// Replace the published snapshot. Returns the handle now being served.
    pub fn publish(&self, snapshot: Snapshot) -> GroupscoutResult<Arc<Snapshot>> {
        let snapshot = Arc::new(snapshot);
        let mut guard = self.current.write().map_err(|_| CacheError::LockPoisoned)?;
        *guard = Some(Arc::clone(&snapshot));
        Ok(snapshot)
    }

    pub fn is_populated(&self) -> GroupscoutResult<bool> {
        Ok(self.current()?.is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use groupscout_core::Group;

    fn snapshot(owner: &str) -> Snapshot {
        Snapshot::assemble(
            vec![(owner.to_string(), vec![Group::new("Project X", "Report")])],
            Utc::now(),
        )
    }

    #[test]
    fn test_empty_store() {
        let store = SnapshotStore::new();
        assert!(store.current().unwrap().is_none());
        assert!(!store.is_populated().unwrap());
    }

    #[test]
    fn test_publish_replaces_and_old_readers_keep_their_view() {
        let store = SnapshotStore::new();
        store.publish(snapshot("Alpha")).unwrap();
        let held = store.current().unwrap().unwrap();

        store.publish(snapshot("Beta")).unwrap();
        let latest = store.current().unwrap().unwrap();

        assert!(held.owner("Alpha").is_some());
        assert!(latest.owner("Alpha").is_none());
        assert!(latest.owner("Beta").is_some());
    }
}
