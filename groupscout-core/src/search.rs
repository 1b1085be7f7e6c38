//! Substring search over a snapshot
//!
//! Search is pure: it reads a published [`Snapshot`] and the current
//! [`SearchConfig`], never suspends and never fails.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::config::SearchConfig;
use crate::entities::Group;
use crate::snapshot::Snapshot;

/// Matches for one group type of one owner.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TypeMatches {
    /// Matching groups, truncated to the result limit.
    pub groups: Vec<Group>,
    /// Number of matches before truncation.
    pub total_groups: usize,
}

/// Matches for one owner, keyed by group type.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OwnerMatches {
    pub group_types: BTreeMap<String, TypeMatches>,
    pub total_groups: usize,
}

/// Owner name to matches.
pub type SearchResults = BTreeMap<String, OwnerMatches>;

/// A successful search for one term.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchHit {
    /// Sum of `total_groups` across every included owner.
    pub total_groups: usize,
    pub result_limit: usize,
    pub search_results: SearchResults,
}

/// What happened to one search term.
#[derive(Debug, Clone, PartialEq)]
pub enum SearchOutcome {
    /// The term was rejected by the length guard (or was blank); no search ran.
    Skipped,
    /// The search ran and nothing matched.
    NoMatches,
    Hits(SearchHit),
}

impl SearchOutcome {
    pub fn into_hit(self) -> Option<SearchHit> {
        match self {
            Self::Hits(hit) => Some(hit),
            Self::Skipped | Self::NoMatches => None,
        }
    }

    pub fn is_skipped(&self) -> bool {
        matches!(self, Self::Skipped)
    }
}

/// Whether the length guard rejects this term.
pub fn exceeds_term_limit(term: &str, config: &SearchConfig) -> bool {
    config.max_search_term_length > 0 && term.chars().count() > config.max_search_term_length
}

/// Whether `term` passes the blank and length guards. Terms that fail are
/// answered with no data and never touch the snapshot.
pub fn is_searchable(term: &str, config: &SearchConfig) -> bool {
    !term.trim().is_empty() && !exceeds_term_limit(term, config)
}

/// Search every filtered owner's groups for `term`.
pub fn search_term(term: &str, snapshot: &Snapshot, config: &SearchConfig) -> SearchOutcome {
    if !is_searchable(term, config) {
        tracing::trace!(term_len = term.chars().count(), "Search term skipped by guard");
        return SearchOutcome::Skipped;
    }

    let needle = term.to_lowercase();
    let owner_filter = config.owner_filter();
    let type_filter = config.group_type_filter();

    let mut search_results = SearchResults::new();
    let mut total_groups = 0;

    for (owner_name, types) in snapshot.owners() {
        if !owner_filter.allows(owner_name) {
            continue;
        }

        let mut group_types = BTreeMap::new();
        let mut owner_total = 0;

        for (group_type, bucket) in types {
            if !type_filter.allows(group_type) {
                continue;
            }

            let mut matched = bucket.groups().iter().filter(|g| g.name_contains(&needle));
            let groups: Vec<Group> = matched.by_ref().take(config.result_limit).cloned().collect();
            if groups.is_empty() {
                continue;
            }
            let type_total = groups.len() + matched.count();

            owner_total += type_total;
            group_types.insert(
                group_type.clone(),
                TypeMatches {
                    groups,
                    total_groups: type_total,
                },
            );
        }

        if !group_types.is_empty() {
            total_groups += owner_total;
            search_results.insert(
                owner_name.to_string(),
                OwnerMatches {
                    group_types,
                    total_groups: owner_total,
                },
            );
        }
    }

    if search_results.is_empty() {
        return SearchOutcome::NoMatches;
    }

    SearchOutcome::Hits(SearchHit {
        total_groups,
        result_limit: config.result_limit,
        search_results,
    })
}

// ============================================================================
// LOOKUP SHAPES
// ============================================================================

/// One user-submitted search term.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Entity {
    pub value: String,
}

impl Entity {
    pub fn new(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LookupDetails {
    pub result_limit: usize,
    pub search_results: SearchResults,
}

/// Display payload for an entity with matches.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LookupData {
    pub summary: Vec<String>,
    pub details: LookupDetails,
}

impl From<SearchHit> for LookupData {
    fn from(hit: SearchHit) -> Self {
        Self {
            summary: vec![format!("Groups: {}", hit.total_groups)],
            details: LookupDetails {
                result_limit: hit.result_limit,
                search_results: hit.search_results,
            },
        }
    }
}

/// Per-entity lookup answer. `data` is `None` when nothing matched or the
/// term was skipped.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LookupResult {
    pub entity: Entity,
    pub data: Option<LookupData>,
}


// ============================================================================
// PROPERTY-BASED TESTS
// ============================================================================
