//! groupscout Core - Data Model and Search
//!
//! Owners, groups and the immutable [`Snapshot`] the cache publishes, plus
//! the pure pieces that operate on them: owner/group-type filtering and
//! case-insensitive substring search with per-type result limiting.
//!
//! Nothing in this crate performs I/O. Fetching lives in
//! `groupscout-upstream`, scheduling and publication in `groupscout-cache`.

pub mod config;
pub mod entities;
pub mod error;
pub mod filter;
pub mod search;
pub mod snapshot;

pub use config::{
    SearchConfig, DEFAULT_MAX_LOOKBACK_DAYS, DEFAULT_MAX_SEARCH_TERM_LENGTH, DEFAULT_RESULT_LIMIT,
    STANDARD_GROUP_TYPES,
};
pub use entities::{partition_by_type, Group, GroupTypeBucket, Owner, REDACTED_FIELDS};
pub use error::{CacheError, ConfigError, GroupscoutError, GroupscoutResult, UpstreamError};
pub use filter::{parse_name_list, GroupTypeFilter, OwnerFilter};
pub use search::{
    exceeds_term_limit, is_searchable, search_term, Entity, LookupData, LookupDetails, LookupResult,
    OwnerMatches, SearchHit, SearchOutcome, SearchResults, TypeMatches,
};
pub use snapshot::{OwnerGroups, Snapshot};
