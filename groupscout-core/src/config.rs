//! Search configuration
//!
//! Options that shape both cache population (lookback window, owner lists)
//! and search (result limit, term guard, searchable group types).

use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, GroupscoutResult};
use crate::filter::{GroupTypeFilter, OwnerFilter};

pub const DEFAULT_MAX_LOOKBACK_DAYS: u32 = 90;
pub const DEFAULT_RESULT_LIMIT: usize = 10;
pub const DEFAULT_MAX_SEARCH_TERM_LENGTH: usize = 0;

/// Group types the upstream platform knows about.
pub const STANDARD_GROUP_TYPES: [&str; 11] = [
    "Adversary",
    "Campaign",
    "Document",
    "Email",
    "Event",
    "Incident",
    "Intrusion Set",
    "Report",
    "Signature",
    "Task",
    "Threat",
];

/// Options consumed by the cache builder and the search engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SearchConfig {
    /// Only groups added within this many days are fetched.
    pub max_lookback_days: u32,

    /// Per-type display cap for search results.
    pub result_limit: usize,

    /// Terms longer than this (in chars) are skipped. 0 = unlimited.
    pub max_search_term_length: usize,

    /// Group type display names that may appear in results.
    pub valid_group_types: Vec<String>,

    /// Comma-separated owner names to exclude.
    /// Takes precedence over `search_allowlist` when both are set.
    pub search_blocklist: String,

    /// Comma-separated owner names to include exclusively.
    pub search_allowlist: String,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            max_lookback_days: DEFAULT_MAX_LOOKBACK_DAYS,
            result_limit: DEFAULT_RESULT_LIMIT,
            max_search_term_length: DEFAULT_MAX_SEARCH_TERM_LENGTH,
            valid_group_types: STANDARD_GROUP_TYPES.iter().map(|t| t.to_string()).collect(),
            search_blocklist: String::new(),
            search_allowlist: String::new(),
        }
    }
}

impl SearchConfig {
    /// Create SearchConfig from environment variables.
    ///
    /// Environment variables:
    /// - `GROUPSCOUT_MAX_LOOKBACK_DAYS`: Lookback window in days (default: 90)
    /// - `GROUPSCOUT_RESULT_LIMIT`: Groups shown per type (default: 10)
    /// - `GROUPSCOUT_MAX_SEARCH_TERM_LENGTH`: Term length guard, 0 = off (default: 0)
    /// - `GROUPSCOUT_VALID_GROUP_TYPES`: Comma-separated searchable types (default: all)
    /// - `GROUPSCOUT_SEARCH_BLOCKLIST`: Comma-separated owners to exclude
    /// - `GROUPSCOUT_SEARCH_ALLOWLIST`: Comma-separated owners to include
    pub fn from_env() -> Self {
        Self::from_vars(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary variable source. Unparseable values fall back
    /// to their defaults.
    pub fn from_vars<F>(var: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let max_lookback_days = var("GROUPSCOUT_MAX_LOOKBACK_DAYS")
            .and_then(|s| s.trim().parse().ok())
            .unwrap_or(defaults.max_lookback_days);

        let result_limit = var("GROUPSCOUT_RESULT_LIMIT")
            .and_then(|s| s.trim().parse().ok())
            .unwrap_or(defaults.result_limit);

        let max_search_term_length = var("GROUPSCOUT_MAX_SEARCH_TERM_LENGTH")
            .and_then(|s| s.trim().parse().ok())
            .unwrap_or(defaults.max_search_term_length);

        let valid_group_types = var("GROUPSCOUT_VALID_GROUP_TYPES")
            .map(|s| {
                s.split(',')
                    .map(|t| t.trim().to_string())
                    .filter(|t| !t.is_empty())
                    .collect::<Vec<_>>()
            })
            .filter(|types| !types.is_empty())
            .unwrap_or(defaults.valid_group_types);

        Self {
            max_lookback_days,
            result_limit,
            max_search_term_length,
            valid_group_types,
            search_blocklist: var("GROUPSCOUT_SEARCH_BLOCKLIST").unwrap_or_default(),
            search_allowlist: var("GROUPSCOUT_SEARCH_ALLOWLIST").unwrap_or_default(),
        }
    }

    /// Validate the configuration.
    ///
    /// Validates:
    /// - max_lookback_days > 0
    /// - result_limit > 0
    /// - at least one valid group type
    ///
    /// Having both owner lists set is not a validation failure; see
    /// [`SearchConfig::owner_list_conflict`].
    pub fn validate(&self) -> GroupscoutResult<()> {
        if self.max_lookback_days == 0 {
            return Err(ConfigError::InvalidValue {
                field: "max_lookback_days".to_string(),
                value: self.max_lookback_days.to_string(),
                reason: "must be greater than 0".to_string(),
            }
            .into());
        }

        if self.result_limit == 0 {
            return Err(ConfigError::InvalidValue {
                field: "result_limit".to_string(),
                value: self.result_limit.to_string(),
                reason: "must be greater than 0".to_string(),
            }
            .into());
        }

        if self.valid_group_types.iter().all(|t| t.trim().is_empty()) {
            return Err(ConfigError::MissingRequired {
                field: "valid_group_types".to_string(),
            }
            .into());
        }

        Ok(())
    }

    /// Report the blocklist/allowlist ambiguity, if present.
    ///
    /// When both lists are non-empty the blocklist wins and the allowlist is
    /// ignored. Loaders log the returned error as a warning.
    pub fn owner_list_conflict(&self) -> Option<ConfigError> {
        if !self.search_blocklist.trim().is_empty() && !self.search_allowlist.trim().is_empty() {
            Some(ConfigError::IncompatibleOptions {
                option_a: "search_blocklist".to_string(),
                option_b: "search_allowlist".to_string(),
            })
        } else {
            None
        }
    }

    /// Log configuration ambiguities that do not fail validation.
    pub fn warn_on_ambiguity(&self) {
        if let Some(conflict) = self.owner_list_conflict() {
            tracing::warn!(error = %conflict, "Both owner lists configured; blocklist takes precedence");
        }
    }

    pub fn owner_filter(&self) -> OwnerFilter {
        OwnerFilter::from_config(self)
    }

    pub fn group_type_filter(&self) -> GroupTypeFilter {
        GroupTypeFilter::new(&self.valid_group_types)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn vars(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn test_default_config_is_valid() {
        let config = SearchConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.result_limit, 10);
        assert_eq!(config.max_search_term_length, 0);
        assert_eq!(config.valid_group_types.len(), STANDARD_GROUP_TYPES.len());
        assert!(config.owner_list_conflict().is_none());
    }

    #[test]
    fn test_from_vars_parses_values() {
        let config = SearchConfig::from_vars(vars(&[
            ("GROUPSCOUT_MAX_LOOKBACK_DAYS", "30"),
            ("GROUPSCOUT_RESULT_LIMIT", "25"),
            ("GROUPSCOUT_MAX_SEARCH_TERM_LENGTH", "64"),
            ("GROUPSCOUT_VALID_GROUP_TYPES", "Report, Incident ,,"),
            ("GROUPSCOUT_SEARCH_BLOCKLIST", "Beta"),
        ]));
        assert_eq!(config.max_lookback_days, 30);
        assert_eq!(config.result_limit, 25);
        assert_eq!(config.max_search_term_length, 64);
        assert_eq!(config.valid_group_types, vec!["Report", "Incident"]);
        assert_eq!(config.search_blocklist, "Beta");
        assert!(config.search_allowlist.is_empty());
    }

    #[test]
    fn test_from_vars_falls_back_on_garbage() {
        let config = SearchConfig::from_vars(vars(&[
            ("GROUPSCOUT_RESULT_LIMIT", "many"),
            ("GROUPSCOUT_VALID_GROUP_TYPES", " , "),
        ]));
        assert_eq!(config.result_limit, DEFAULT_RESULT_LIMIT);
        assert_eq!(config.valid_group_types.len(), STANDARD_GROUP_TYPES.len());
    }

    #[test]
    fn test_validate_rejects_zero_result_limit() {
        let config = SearchConfig {
            result_limit: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_zero_lookback() {
        let config = SearchConfig {
            max_lookback_days: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_empty_group_types() {
        let config = SearchConfig {
            valid_group_types: vec![" ".to_string()],
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_owner_list_conflict_detected() {
        let config = SearchConfig {
            search_blocklist: "Beta".to_string(),
            search_allowlist: "Alpha".to_string(),
            ..Default::default()
        };
        assert!(config.validate().is_ok());
        assert!(matches!(
            config.owner_list_conflict(),
            Some(ConfigError::IncompatibleOptions { .. })
        ));
    }

    #[test]
    fn test_serde_uses_camel_case() {
        let json = serde_json::to_value(SearchConfig::default()).unwrap();
        assert!(json.get("resultLimit").is_some());
        assert!(json.get("maxSearchTermLength").is_some());
        assert!(json.get("validGroupTypes").is_some());
    }
}
