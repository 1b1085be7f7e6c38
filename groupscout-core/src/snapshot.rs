//! Immutable, type-partitioned view of every owner's groups.

use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use std::time::Duration;

use crate::entities::{partition_by_type, Group, GroupTypeBucket};

/// Group type name to bucket, for a single owner.
pub type OwnerGroups = BTreeMap<String, GroupTypeBucket>;

/// The full cache content.
///
/// A snapshot is assembled in one step from fetched owner data and exposes
/// only shared accessors. Publishing a newer snapshot replaces it wholesale.
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    owners: BTreeMap<String, OwnerGroups>,
    built_at: DateTime<Utc>,
}

impl Snapshot {
    /// Assemble a snapshot from `(owner name, groups)` pairs.
    ///
    /// Each owner's groups are partitioned by type. Owners with no groups are
    /// kept so that the owner set of the snapshot matches what was fetched.
    pub fn assemble<I>(owners: I, built_at: DateTime<Utc>) -> Self
    where
        I: IntoIterator<Item = (String, Vec<Group>)>,
    {
        let owners = owners
            .into_iter()
            .map(|(name, groups)| (name, partition_by_type(groups)))
            .collect();
        Self { owners, built_at }
    }

    /// Iterate owners in name order.
    pub fn owners(&self) -> impl Iterator<Item = (&str, &OwnerGroups)> {
        self.owners.iter().map(|(name, groups)| (name.as_str(), groups))
    }

    pub fn owner_names(&self) -> impl Iterator<Item = &str> {
        self.owners.keys().map(String::as_str)
    }

    pub fn owner(&self, name: &str) -> Option<&OwnerGroups> {
        self.owners.get(name)
    }

    pub fn owner_count(&self) -> usize {
        self.owners.len()
    }

    /// Total number of groups across all owners and types.
    pub fn group_count(&self) -> usize {
        self.owners
            .values()
            .flat_map(|types| types.values())
            .map(GroupTypeBucket::len)
            .sum()
    }

    pub fn built_at(&self) -> DateTime<Utc> {
        self.built_at
    }

    /// How long ago this snapshot was built.
    pub fn staleness(&self) -> Duration {
        (Utc::now() - self.built_at)
            .to_std()
            .unwrap_or(Duration::ZERO)
    }
}
