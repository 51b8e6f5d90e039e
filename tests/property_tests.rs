//! Property-based tests for the registry
//!
//! Uses proptest for testing search and persistence invariants
//!
//! These tests verify:
//! - Every search result matches, every match appears exactly once
//! - Results obey the recency ordering
//! - Repeated searches agree
//! - Persist then reload is the identity

use chrono::{DateTime, TimeZone, Utc};
use proptest::prelude::*;
use tempfile::TempDir;
use tracing::Span;
use xscript::registry::recency_order;
use xscript::{CatalogStore, Registry, ScriptEntry};

// =============================================================================
// Strategies
// =============================================================================

fn timestamp_strategy() -> impl Strategy<Value = Option<DateTime<Utc>>> {
    prop_oneof![
        Just(None),
        // Whole seconds between 2000 and 2033
        (946_684_800i64..2_000_000_000i64)
            .prop_map(|secs| Utc.timestamp_opt(secs, 0).single()),
    ]
}

fn entry_strategy() -> impl Strategy<Value = ScriptEntry> {
    (
        "[A-Za-z ]{1,10}",
        "[a-z]{1,8}\\.py",
        "[A-Za-z ]{0,12}",
        "[A-Za-z ]{0,12}",
        timestamp_strategy(),
    )
        .prop_map(|(name, path, description, keywords, last_run_time)| ScriptEntry {
            name,
            path,
            description,
            keywords,
            last_run_time,
        })
}

fn catalog_strategy() -> impl Strategy<Value = Vec<ScriptEntry>> {
    prop::collection::vec(entry_strategy(), 0..12)
}

fn loaded(entries: &[ScriptEntry]) -> (TempDir, Registry) {
    let dir = TempDir::new().unwrap();
    let store = CatalogStore::in_dir(dir.path());
    store.write(entries).unwrap();
    let registry = Registry::new(store, Span::none());
    registry.load().unwrap();
    (dir, registry)
}

fn matches(entry: &ScriptEntry, keyword: &str) -> bool {
    let needle = keyword.to_lowercase();
    entry.name.to_lowercase().contains(&needle) || entry.keywords.to_lowercase().contains(&needle)
}

// =============================================================================
// Search properties
// =============================================================================

proptest! {
    /// search: results are exactly the matching entries
    #[test]
    fn search_returns_exactly_the_matches(entries in catalog_strategy(), keyword in "[A-Za-z ]{0,3}") {
        let (_dir, registry) = loaded(&entries);

        let results = registry.search(&keyword);

        let expected = entries.iter().filter(|e| keyword.is_empty() || matches(e, &keyword)).count();
        prop_assert_eq!(results.len(), expected);
        for result in &results {
            prop_assert!(keyword.is_empty() || matches(result, &keyword));
        }
        for entry in entries.iter().filter(|e| keyword.is_empty() || matches(e, &keyword)) {
            let wanted = entries.iter().filter(|e| *e == entry).count();
            let found = results.iter().filter(|r| *r == entry).count();
            prop_assert_eq!(wanted, found);
        }
    }

    /// search: adjacent results never violate the recency ordering
    #[test]
    fn search_results_are_ordered(entries in catalog_strategy(), keyword in "[a-z]{0,2}") {
        let (_dir, registry) = loaded(&entries);

        let results = registry.search(&keyword);

        for pair in results.windows(2) {
            prop_assert_ne!(recency_order(&pair[0], &pair[1]), std::cmp::Ordering::Greater);
            if pair[0].last_run_time.is_none() {
                prop_assert!(pair[1].last_run_time.is_none());
                prop_assert!(pair[0].name <= pair[1].name);
            }
        }
    }

    /// search: two calls without mutation in between agree
    #[test]
    fn search_is_idempotent(entries in catalog_strategy(), keyword in "[a-z]{0,2}") {
        let (_dir, registry) = loaded(&entries);
        prop_assert_eq!(registry.search(&keyword), registry.search(&keyword));
    }
}

// =============================================================================
// Persistence properties
// =============================================================================

proptest! {
    /// write → read is the identity, file order included
    #[test]
    fn persist_round_trip(entries in catalog_strategy()) {
        let dir = TempDir::new().unwrap();
        let store = CatalogStore::in_dir(dir.path());

        store.write(&entries).unwrap();

        prop_assert_eq!(store.read().unwrap(), entries);
    }

    /// record_run → reload keeps the timestamp and moves the entry to the front
    #[test]
    fn record_run_then_reload(entries in prop::collection::vec(entry_strategy(), 1..8), pick in any::<prop::sample::Index>()) {
        let (dir, registry) = loaded(&entries);
        let name = entries[pick.index(entries.len())].name.clone();
        // Later than anything the strategy generates
        let when = Utc.with_ymd_and_hms(2040, 1, 1, 0, 0, 0).unwrap();

        registry.record_run(&name, when).unwrap();

        let reloaded = Registry::new(CatalogStore::in_dir(dir.path()), Span::none());
        reloaded.load().unwrap();
        let first = reloaded.search("").into_iter().next().unwrap();
        prop_assert_eq!(first.last_run_time, Some(when));
        prop_assert_eq!(reloaded.get_scripts(), registry.get_scripts());
    }
}
