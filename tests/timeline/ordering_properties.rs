//! Property tests for timeline ordering.

use crate::common::*;
use proptest::prelude::*;

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn sorted_events_are_ordered(timestamps in prop::collection::vec(-1_000i64..1_000, 0..40)) {
        let test_store = TestStore::new();
        let mut store = test_store.open(false);
        for timestamp in &timestamps {
            add_event(&mut store, *timestamp);
        }

        let keys = sorted_keys(&store);
        prop_assert_eq!(keys.len(), timestamps.len());
        for pair in keys.windows(2) {
            // Ties keep insertion order
            prop_assert!(pair[0] < pair[1], "{:?} before {:?}", pair[0], pair[1]);
        }

        let mut expected = timestamps.clone();
        expected.sort();
        let actual: Vec<i64> = keys.iter().map(|(timestamp, _)| *timestamp).collect();
        prop_assert_eq!(actual, expected);
    }

    #[test]
    fn range_selects_contained_events(
        timestamps in prop::collection::vec(0i64..100, 1..30),
        start in 0i64..100,
        length in 0i64..50,
    ) {
        let test_store = TestStore::new();
        let mut store = test_store.open(false);
        for timestamp in &timestamps {
            add_event(&mut store, *timestamp);
        }

        let range = TimeRange::new(start, start + length).unwrap();
        let mut expected: Vec<i64> = timestamps
            .iter()
            .copied()
            .filter(|t| range.contains(*t))
            .collect();
        expected.sort();
        prop_assert_eq!(sorted_timestamps(&store, Some(range)), expected);
    }
}
