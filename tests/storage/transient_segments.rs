//! Transient Segment Tests
//!
//! Per-task in-memory segments shared between worker threads.

use crate::common::*;
use std::thread;

fn task_store(space: &TransientSpace, task: &Task) -> TransientStore {
    TransientStore::new(space.clone(), task.identifier.clone(), StoreConfig::task())
}

// ============================================================================
// Capability boundary
// ============================================================================

#[test]
fn session_writes_are_refused() {
    let space = TransientSpace::new();
    let task = Task::new("session");
    let mut store = task_store(&space, &task);
    store.open(false).unwrap();

    let session = Session::new();
    let result = store.write_session_start(&session.create_session_start());
    assert!(matches!(
        result,
        Err(Error::BackendUnsupportedOperation {
            backend: "transient",
            ..
        })
    ));
    assert!(matches!(
        store.write_preprocessing_information(&SystemConfiguration::default()),
        Err(Error::BackendUnsupportedOperation { .. })
    ));

    // The refusal does not disturb task writes
    store.write_task_start(&task.create_task_start()).unwrap();
    add_event(&mut store, 1);
    assert_eq!(sorted_timestamps(&store, None), vec![1]);
}

#[test]
fn session_containers_are_unsupported() {
    let space = TransientSpace::new();
    let mut store = task_store(&space, &Task::new("session"));
    store.open(false).unwrap();

    let mut start: AttributeContainer = Session::new().create_session_start().into();
    assert!(matches!(
        store.add_attribute_container(&mut start),
        Err(Error::UnsupportedContainerType {
            container_type: ContainerType::SessionStart,
            backend: "transient",
        })
    ));
    assert!(matches!(
        store.get_number_of_attribute_containers(ContainerType::SessionConfiguration),
        Err(Error::UnsupportedContainerType { .. })
    ));
}

// ============================================================================
// Concurrent workers
// ============================================================================

#[test]
fn workers_write_independent_segments() {
    let space = TransientSpace::new();
    let tasks: Vec<Task> = (0..4).map(|_| Task::new("session")).collect();

    let handles: Vec<_> = tasks
        .iter()
        .cloned()
        .enumerate()
        .map(|(worker, task)| {
            let space = space.clone();
            thread::spawn(move || {
                let mut store = task_store(&space, &task);
                store.open(false).unwrap();
                store.write_task_start(&task.create_task_start()).unwrap();
                for offset in 0..25 {
                    add_event_chain(&mut store, (offset * 4 + worker) as i64);
                }
                store.write_task_completion(&task.create_task_completion()).unwrap();
                store.close().unwrap();
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    assert_eq!(space.len(), 4);
    for task in &tasks {
        let mut store = task_store(&space, task);
        store.open(true).unwrap();
        assert_eq!(store.get_number_of_attribute_containers(ContainerType::Event).unwrap(), 25);
        let timestamps = sorted_timestamps(&store, None);
        assert!(timestamps.windows(2).all(|w| w[0] <= w[1]));
        // Identifiers are local to each segment
        let first = store
            .get_attribute_container_by_index(ContainerType::EventDataStream, 0)
            .unwrap()
            .unwrap();
        assert_eq!(first.identifier(), Some(Identifier::new(ContainerType::EventDataStream, 1)));
    }
}

#[test]
fn segment_outlives_store_handle() {
    let space = TransientSpace::new();
    let task = Task::new("session");
    {
        let mut store = task_store(&space, &task);
        store.open(false).unwrap();
        add_event(&mut store, 5);
    }

    assert_eq!(space.len(), 1);
    let mut reader = task_store(&space, &task);
    reader.open(true).unwrap();
    assert_eq!(sorted_timestamps(&reader, None), vec![5]);
    reader.close().unwrap();

    assert!(space.remove_segment(&task.identifier));
    let mut gone = task_store(&space, &task);
    assert!(matches!(gone.open(true), Err(Error::Io(_))));
}
