//! Upstream API response envelopes

use groupscout_core::Owner;
use serde::Deserialize;
use serde_json::{Map, Value};

/// Status string the API reports on success.
pub const STATUS_SUCCESS: &str = "Success";

/// Every response is wrapped as `{ "status": ..., "data": ... }`.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiEnvelope<T> {
    pub status: String,
    #[serde(default)]
    pub message: Option<String>,
    pub data: Option<T>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OwnersData {
    #[serde(default)]
    pub result_count: Option<u64>,
    #[serde(default)]
    pub owner: Vec<Owner>,
}

/// Groups stay as raw JSON objects here; redaction happens when they are
/// turned into [`groupscout_core::Group`].
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupsData {
    #[serde(default)]
    pub result_count: Option<u64>,
    #[serde(default)]
    pub group: Vec<Map<String, Value>>,
}
