//! Timeline integration tests
//!
//! Sorted event streams reconstructed from events written in arbitrary
//! order, across reopen, time ranges and both backends.

#[path = "../common/mod.rs"]
mod common;

mod ordering_properties;

use common::*;

// ============================================================================
// Reopen scenario
// ============================================================================

#[test]
fn events_sorted_after_reopen() {
    let test_store = TestStore::new();
    {
        let mut store = test_store.open(false);
        let stream_id = store
            .add_attribute_container(&mut EventDataStream::new("/var/log/messages").into())
            .unwrap();
        let mut data = EventData::new("syslog:line");
        data.set_event_data_stream_identifier(stream_id);
        let data_id = store.add_attribute_container(&mut data.into()).unwrap();

        let mut event_a = Event::new(100, "A");
        event_a.set_event_data_identifier(data_id);
        store.add_attribute_container(&mut event_a.into()).unwrap();

        let mut event_b = Event::new(50, "B");
        event_b.set_event_data_identifier(data_id);
        store.add_attribute_container(&mut event_b.into()).unwrap();
        store.close().unwrap();
    }

    let store = test_store.open(true);
    let events: Vec<Event> = store
        .get_sorted_events(None)
        .unwrap()
        .map(|e| e.unwrap())
        .collect();
    let described: Vec<(&str, i64)> = events
        .iter()
        .map(|e| (e.timestamp_desc.as_str(), e.timestamp))
        .collect();
    assert_eq!(described, vec![("B", 50), ("A", 100)]);
    assert_eq!(events[0].identifier(), Some(Identifier::new(ContainerType::Event, 2)));
}

#[test]
fn equal_timestamps_keep_insertion_order() {
    let test_store = TestStore::new();
    let mut store = test_store.open(false);
    for timestamp in [5, 3, 5, 3, 5] {
        add_event(&mut store, timestamp);
    }

    assert_eq!(sorted_keys(&store), vec![(3, 2), (3, 4), (5, 1), (5, 3), (5, 5)]);
}

#[test]
fn empty_store_has_empty_timeline() {
    let test_store = TestStore::new();
    let store = test_store.open(false);
    assert!(sorted_timestamps(&store, None).is_empty());
}

// ============================================================================
// Time ranges
// ============================================================================

#[test]
fn time_range_is_inclusive() {
    let test_store = TestStore::new();
    let mut store = test_store.open(false);
    for timestamp in [40, 10, 30, 20, 50] {
        add_event(&mut store, timestamp);
    }

    let range = TimeRange::new(20, 40).unwrap();
    assert_eq!(sorted_timestamps(&store, Some(range)), vec![20, 30, 40]);

    let point = TimeRange::new(30, 30).unwrap();
    assert_eq!(sorted_timestamps(&store, Some(point)), vec![30]);

    let outside = TimeRange::new(60, 70).unwrap();
    assert!(sorted_timestamps(&store, Some(outside)).is_empty());
}

#[test]
fn inverted_range_is_rejected() {
    assert!(TimeRange::new(10, 5).is_none());
}

#[test]
fn negative_timestamps_sort_first() {
    let test_store = TestStore::new();
    let mut store = test_store.open(false);
    for timestamp in [0, -1_000_000, 1_000_000, i64::MIN, i64::MAX] {
        add_event(&mut store, timestamp);
    }
    assert_eq!(
        sorted_timestamps(&store, None),
        vec![i64::MIN, -1_000_000, 0, 1_000_000, i64::MAX]
    );
}

// ============================================================================
// Backends agree
// ============================================================================

#[test]
fn transient_and_durable_timelines_match() {
    let timestamps = [17, 3, 99, 3, 42, 0, 17];

    let test_store = TestStore::new();
    let mut durable = test_store.open(false);
    let space = TransientSpace::new();
    let mut transient = TransientStore::new(space, "task", StoreConfig::for_testing());
    transient.open(false).unwrap();

    for timestamp in timestamps {
        add_event(&mut durable, timestamp);
        add_event(&mut transient, timestamp);
    }

    assert_eq!(sorted_keys(&durable), sorted_keys(&transient));
    let range = TimeRange::new(3, 17);
    assert_eq!(
        sorted_timestamps(&durable, range),
        sorted_timestamps(&transient, range)
    );
}

// ============================================================================
// Merge determinism
// ============================================================================

fn merged_timeline(space: &TransientSpace, tasks: &[Task]) -> Vec<(i64, u64)> {
    let test_store = TestStore::new();
    let mut target = test_store.open(false);
    let mut merger = TaskMerger::new();
    for task in tasks {
        merger.add_transient_task(task.clone(), space, StoreConfig::task());
    }
    merger.merge_into(&mut target).unwrap();
    sorted_keys(&target)
}

#[test]
fn merged_timeline_independent_of_task_order() {
    let space = TransientSpace::new();
    let mut tasks = Vec::new();
    for (start_time, timestamps) in [(300, vec![5, 1]), (100, vec![5, 2]), (200, vec![1, 9])] {
        let mut task = Task::new("session");
        task.start_time = start_time;
        let mut store = TransientStore::new(space.clone(), task.identifier.clone(), StoreConfig::task());
        store.open(false).unwrap();
        for timestamp in timestamps {
            add_event(&mut store, timestamp);
        }
        store.close().unwrap();
        tasks.push(task);
    }

    let forward = merged_timeline(&space, &tasks);
    tasks.reverse();
    let backward = merged_timeline(&space, &tasks);
    tasks.swap(0, 1);
    let shuffled = merged_timeline(&space, &tasks);

    assert_eq!(forward, backward);
    assert_eq!(forward, shuffled);
    // Merged by start time: task 100 (events 1-2), 200 (3-4), 300 (5-6)
    assert_eq!(forward, vec![(1, 3), (1, 6), (2, 2), (5, 1), (5, 5), (9, 4)]);
}
