//! Owner and group-type filters
//!
//! Both filters compare names case-insensitively. The owner filter runs
//! before any upstream fetch and again on every search; the group-type
//! filter only applies at search time.

use std::collections::HashSet;

use crate::config::SearchConfig;

/// Parse a comma-separated list into a trimmed, lower-cased set.
pub fn parse_name_list(list: &str) -> HashSet<String> {
    list.split(',')
        .map(|name| name.trim().to_lowercase())
        .filter(|name| !name.is_empty())
        .collect()
}

/// Owner allow/block filter.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum OwnerFilter {
    /// No list configured; every owner passes.
    #[default]
    PassThrough,
    /// Owners in the set are excluded.
    Block(HashSet<String>),
    /// Only owners in the set are included.
    Allow(HashSet<String>),
}

impl OwnerFilter {
    /// Build a filter from the raw comma-separated lists.
    ///
    /// A non-empty blocklist wins over the allowlist.
    pub fn from_lists(blocklist: &str, allowlist: &str) -> Self {
        let blocked = parse_name_list(blocklist);
        if !blocked.is_empty() {
            return Self::Block(blocked);
        }

        let allowed = parse_name_list(allowlist);
        if !allowed.is_empty() {
            return Self::Allow(allowed);
        }

        Self::PassThrough
    }

    pub fn from_config(config: &SearchConfig) -> Self {
        Self::from_lists(&config.search_blocklist, &config.search_allowlist)
    }

    /// Whether an owner with this name passes the filter.
    pub fn allows(&self, owner_name: &str) -> bool {
        match self {
            Self::PassThrough => true,
            Self::Block(blocked) => !blocked.contains(&owner_name.to_lowercase()),
            Self::Allow(allowed) => allowed.contains(&owner_name.to_lowercase()),
        }
    }

    /// Keep the owners that pass, preserving input order.
    pub fn filter_owners<T: AsRef<str>>(&self, owners: Vec<T>) -> Vec<T> {
        if matches!(self, Self::PassThrough) {
            return owners;
        }
        owners
            .into_iter()
            .filter(|owner| self.allows(owner.as_ref()))
            .collect()
    }

    pub fn is_pass_through(&self) -> bool {
        matches!(self, Self::PassThrough)
    }
}

/// Allow-list of searchable group types.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupTypeFilter {
    allowed: HashSet<String>,
}

impl GroupTypeFilter {
    pub fn new<S: AsRef<str>>(types: &[S]) -> Self {
        Self {
            allowed: types
                .iter()
                .map(|t| t.as_ref().trim().to_lowercase())
                .filter(|t| !t.is_empty())
                .collect(),
        }
    }

    pub fn allows(&self, group_type: &str) -> bool {
        self.allowed.contains(&group_type.to_lowercase())
    }
}


// ============================================================================
// PROPERTY-BASED TESTS
// ============================================================================
