//! Fuzz test for upstream group envelopes
//!
//! Feeds arbitrary bytes through envelope parsing and group intake. Parsing
//! may fail; it must never panic, and any group that comes out must be
//! redacted.
//!
//! Run with: cargo +nightly fuzz run envelope_fuzz -- -max_total_time=60

#![no_main]

use groupscout_core::{Group, REDACTED_FIELDS};
use groupscout_upstream::types::{ApiEnvelope, GroupsData};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let Ok(envelope) = serde_json::from_slice::<ApiEnvelope<GroupsData>>(data) else {
        return;
    };
    let Some(groups) = envelope.data else {
        return;
    };

    for record in groups.group {
        if let Some(group) = Group::from_record(record) {
            for field in REDACTED_FIELDS {
                assert!(!group.attributes().contains_key(field));
            }
            // Serialized form always carries name and type.
            let value = serde_json::to_value(&group).expect("group serializes");
            assert!(value.get("name").is_some());
            assert!(value.get("type").is_some());
        }
    }
});
