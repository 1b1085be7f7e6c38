//! Fuzz test for search terms
//!
//! Arbitrary UTF-8 terms against a fixed snapshot. Search must not panic,
//! must honor the term length guard, and must only return groups whose name
//! contains the term.
//!
//! Run with: cargo +nightly fuzz run search_fuzz -- -max_total_time=60

#![no_main]

use chrono::Utc;
use groupscout_core::{search_term, Group, SearchConfig, SearchOutcome, Snapshot};
use libfuzzer_sys::fuzz_target;

fn snapshot() -> Snapshot {
    Snapshot::assemble(
        vec![
            (
                "Alpha".to_string(),
                vec![
                    Group::new("Project X Report", "Report"),
                    Group::new("İstanbul phishing wave", "Incident"),
                ],
            ),
            (
                "Beta".to_string(),
                vec![Group::new("ΣΊΣΥΦΟΣ campaign", "Campaign")],
            ),
        ],
        Utc::now(),
    )
}

fuzz_target!(|data: &[u8]| {
    let Ok(term) = std::str::from_utf8(data) else {
        return;
    };

    let config = SearchConfig {
        max_search_term_length: 16,
        result_limit: 1,
        ..SearchConfig::default()
    };

    match search_term(term, &snapshot(), &config) {
        SearchOutcome::Skipped => {
            assert!(term.trim().is_empty() || term.chars().count() > 16);
        }
        SearchOutcome::NoMatches => {}
        SearchOutcome::Hits(hit) => {
            let needle = term.to_lowercase();
            for owner in hit.search_results.values() {
                for matches in owner.group_types.values() {
                    assert!(matches.groups.len() <= 1);
                    assert!(matches.total_groups >= matches.groups.len());
                    for group in &matches.groups {
                        assert!(group.name().to_lowercase().contains(&needle));
                    }
                }
            }
        }
    }
});
