//! Owner and group records as held by the cache.

use serde::{Deserialize, Serialize, Serializer};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// Upstream-internal fields that never leave the cache layer.
pub const REDACTED_FIELDS: [&str; 2] = ["id", "ownerName"];

/// An organizational tenant in the upstream platform.
///
/// The name is the storage key (case-sensitive). Filters compare it
/// case-insensitively.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Owner {
    pub name: String,
}

impl Owner {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

/// A named intelligence object (report, incident, campaign, ...).
///
/// Construction always goes through [`Group::new`] or [`Group::from_record`],
/// both of which drop [`REDACTED_FIELDS`], so a `Group` can never carry them.
#[derive(Debug, Clone, PartialEq)]
pub struct Group {
    name: String,
    group_type: String,
    attributes: Map<String, Value>,
}

impl Group {
    /// Create a group with no extra attributes.
    pub fn new(name: impl Into<String>, group_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            group_type: group_type.into(),
            attributes: Map::new(),
        }
    }

    /// Build a group from a raw upstream JSON object.
    ///
    /// Returns `None` when `name` or `type` is missing or not a string.
    pub fn from_record(mut record: Map<String, Value>) -> Option<Self> {
        let name = match record.remove("name") {
            Some(Value::String(name)) => name,
            _ => return None,
        };
        let group_type = match record.remove("type") {
            Some(Value::String(group_type)) => group_type,
            _ => return None,
        };
        for field in REDACTED_FIELDS {
            record.remove(field);
        }

        Some(Self {
            name,
            group_type,
            attributes: record,
        })
    }

    /// Attach an extra attribute. Redacted keys and the reserved
    /// `name`/`type` keys are ignored.
    pub fn with_attribute(mut self, key: impl Into<String>, value: Value) -> Self {
        let key = key.into();
        if !REDACTED_FIELDS.contains(&key.as_str()) && key != "name" && key != "type" {
            self.attributes.insert(key, value);
        }
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn group_type(&self) -> &str {
        &self.group_type
    }

    pub fn attributes(&self) -> &Map<String, Value> {
        &self.attributes
    }

    /// Case-insensitive substring test against the group name.
    ///
    /// `needle_lower` must already be lower-cased.
    pub fn name_contains(&self, needle_lower: &str) -> bool {
        self.name.to_lowercase().contains(needle_lower)
    }
}

impl Serialize for Group {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut object = self.attributes.clone();
        object.insert("name".to_string(), Value::String(self.name.clone()));
        object.insert("type".to_string(), Value::String(self.group_type.clone()));
        object.serialize(serializer)
    }
}

/// Groups of one type belonging to one owner, in upstream order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroupTypeBucket {
    group_type: String,
    groups: Vec<Group>,
}

impl GroupTypeBucket {
    pub fn group_type(&self) -> &str {
        &self.group_type
    }

    pub fn groups(&self) -> &[Group] {
        &self.groups
    }

    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }
}

/// Partition groups by their `type`, preserving input order inside each bucket.
pub fn partition_by_type(groups: Vec<Group>) -> BTreeMap<String, GroupTypeBucket> {
    let mut buckets: BTreeMap<String, GroupTypeBucket> = BTreeMap::new();
    for group in groups {
        buckets
            .entry(group.group_type.clone())
            .or_insert_with(|| GroupTypeBucket {
                group_type: group.group_type.clone(),
                groups: Vec::new(),
            })
            .groups
            .push(group);
    }
    buckets
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            _ => panic!("expected object"),
        }
    }

    #[test]
    fn test_from_record_strips_redacted_fields() {
        let group = Group::from_record(record(json!({
            "id": 42,
            "ownerName": "Alpha",
            "name": "Project X Report",
            "type": "Report",
            "dateAdded": "2024-01-02T00:00:00Z",
            "webLink": "https://example.test/report/42"
        })))
        .unwrap();

        assert_eq!(group.name(), "Project X Report");
        assert_eq!(group.group_type(), "Report");
        assert!(!group.attributes().contains_key("id"));
        assert!(!group.attributes().contains_key("ownerName"));
        assert!(group.attributes().contains_key("webLink"));

        let serialized = serde_json::to_value(&group).unwrap();
        assert!(serialized.get("id").is_none());
        assert!(serialized.get("ownerName").is_none());
        assert_eq!(serialized["name"], "Project X Report");
        assert_eq!(serialized["type"], "Report");
    }

    #[test]
    fn test_from_record_rejects_missing_name_or_type() {
        assert!(Group::from_record(record(json!({"type": "Report"}))).is_none());
        assert!(Group::from_record(record(json!({"name": "x"}))).is_none());
        assert!(Group::from_record(record(json!({"name": 5, "type": "Report"}))).is_none());
    }

    #[test]
    fn test_with_attribute_ignores_redacted_keys() {
        let group = Group::new("a", "Incident")
            .with_attribute("id", json!(1))
            .with_attribute("ownerName", json!("Alpha"))
            .with_attribute("type", json!("Report"))
            .with_attribute("eventDate", json!("2024-01-01"));
        assert_eq!(group.group_type(), "Incident");
        assert_eq!(group.attributes().len(), 1);
    }

    #[test]
    fn test_name_contains_is_case_insensitive() {
        let group = Group::new("Project X Report", "Report");
        assert!(group.name_contains("project"));
        assert!(group.name_contains("x rep"));
        assert!(!group.name_contains("campaign"));
    }

    #[test]
    fn test_partition_by_type_is_stable() {
        let buckets = partition_by_type(vec![
            Group::new("r1", "Report"),
            Group::new("i1", "Incident"),
            Group::new("r2", "Report"),
            Group::new("r3", "Report"),
        ]);

        assert_eq!(buckets.len(), 2);
        let reports: Vec<&str> = buckets["Report"].groups().iter().map(Group::name).collect();
        assert_eq!(reports, vec!["r1", "r2", "r3"]);
        assert_eq!(buckets["Incident"].len(), 1);
        assert_eq!(buckets["Incident"].group_type(), "Incident");
    }
}
