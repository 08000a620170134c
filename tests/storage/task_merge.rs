//! Task Merge Tests
//!
//! End-to-end session: workers fill transient segments, the merger folds
//! them into the session store.

use crate::common::*;

fn run_task(space: &TransientSpace, task: &Task, timestamps: &[i64]) {
    let store = TransientStore::new(space.clone(), task.identifier.clone(), StoreConfig::task());
    let mut writer = StorageWriter::new(Box::new(store));
    writer.open().unwrap();
    writer.write_task_start(&task.create_task_start()).unwrap();

    let mut source: AttributeContainer = EventSource::new(format!("/evidence/{}", task.identifier)).into();
    writer.add_attribute_container(&mut source).unwrap();
    for timestamp in timestamps {
        let mut stream: AttributeContainer = EventDataStream::new("/evidence/file.log").into();
        let stream_id = writer.add_attribute_container(&mut stream).unwrap();
        let mut data = EventData::new("text:line");
        data.set_event_data_stream_identifier(stream_id);
        let data_id = writer.add_attribute_container(&mut data.into()).unwrap();
        let mut event = Event::new(*timestamp, "Modification Time");
        event.set_event_data_identifier(data_id);
        let event_id = writer.add_attribute_container(&mut event.into()).unwrap();

        if timestamp % 2 == 0 {
            let mut tag = EventTag::for_event(event_id);
            tag.add_label("even").unwrap();
            writer.add_attribute_container(&mut tag.into()).unwrap();
        }
    }
    writer.write_task_completion(&task.create_task_completion()).unwrap();
    writer.close().unwrap();
}

#[test]
fn merged_session_has_consistent_references() {
    let test_store = TestStore::new();
    let space = TransientSpace::new();
    let session = Session::new();

    let mut first = Task::new(session.identifier.clone());
    first.start_time = 100;
    let mut second = Task::new(session.identifier.clone());
    second.start_time = 200;
    run_task(&space, &second, &[4, 9]);
    run_task(&space, &first, &[2, 7, 8]);

    let mut target = test_store.open(false);
    target.write_session_start(&session.create_session_start()).unwrap();
    let mut merger = TaskMerger::new();
    merger.add_transient_task(second.clone(), &space, StoreConfig::task());
    merger.add_transient_task(first.clone(), &space, StoreConfig::task());
    let summary = merger.merge_into(&mut target).unwrap();
    target.close().unwrap();

    assert_eq!(summary.tasks[0].task_identifier, first.identifier);
    assert_eq!(summary.number_of_containers(ContainerType::Event), 5);
    assert_eq!(summary.number_of_containers(ContainerType::EventTag), 3);
    assert_eq!(summary.number_of_containers(ContainerType::EventSource), 2);

    let store = test_store.open(true);
    assert_eq!(sorted_timestamps(&store, None), vec![2, 4, 7, 8, 9]);
    assert_eq!(store.get_number_of_attribute_containers(ContainerType::TaskStart).unwrap(), 0);

    for event in store.get_sorted_events(None).unwrap() {
        let event = event.unwrap();
        let data_id = event.event_data_identifier.unwrap();
        let data: EventData = store
            .get_attribute_container_by_identifier(ContainerType::EventData, &data_id)
            .unwrap()
            .unwrap()
            .downcast()
            .unwrap();
        let stream_id = data.event_data_stream_identifier.unwrap();
        assert!(store
            .get_attribute_container_by_identifier(ContainerType::EventDataStream, &stream_id)
            .unwrap()
            .is_some());

        let event_id = event.identifier().unwrap();
        let tag = store.get_event_tag_by_event_identifier(&event_id).unwrap();
        assert_eq!(tag.is_some(), event.timestamp % 2 == 0, "timestamp {}", event.timestamp);
    }
}

#[test]
fn merge_into_task_store_is_allowed() {
    let space = TransientSpace::new();
    let task = Task::new("session");
    run_task(&space, &task, &[1]);

    let test_store = TestStore::new();
    let mut target = test_store.open_with(false, StoreConfig::task());
    let mut merger = TaskMerger::new();
    merger.add_transient_task(task, &space, StoreConfig::task());
    merger.merge_into(&mut target).unwrap();
    assert_eq!(sorted_timestamps(&target, None), vec![1]);
}

#[test]
fn failing_task_stops_merge() {
    let test_store = TestStore::new();
    let space = TransientSpace::new();
    let mut present = Task::new("session");
    present.start_time = 1;
    let mut missing = Task::new("session");
    missing.start_time = 2;
    run_task(&space, &present, &[10]);

    let mut target = test_store.open(false);
    let mut merger = TaskMerger::new();
    merger.add_transient_task(missing, &space, StoreConfig::task());
    merger.add_transient_task(present, &space, StoreConfig::task());
    assert!(matches!(merger.merge_into(&mut target), Err(Error::Io(_))));

    // The earlier task is already in the session store
    assert_eq!(sorted_timestamps(&target, None), vec![10]);
}
