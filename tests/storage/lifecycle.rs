//! Store Lifecycle Tests
//!
//! Open/close state machine, read-only access, commit on close and the
//! writer façade over a durable store.

use crate::common::*;

// ============================================================================
// State machine
// ============================================================================

#[test]
fn operations_before_open_fail() {
    let test_store = TestStore::new();
    let mut store = DurableStore::new(&test_store.path, StoreConfig::for_testing());

    assert!(matches!(store.close(), Err(Error::NotOpen)));
    assert!(matches!(
        store.add_attribute_container(&mut Event::new(1, "x").into()),
        Err(Error::NotOpen)
    ));
    assert!(matches!(
        store.get_number_of_attribute_containers(ContainerType::Event),
        Err(Error::NotOpen)
    ));
    assert!(!test_store.path.exists());
}

#[test]
fn closed_is_terminal() {
    let test_store = TestStore::new();
    let mut store = test_store.open(false);
    store.close().unwrap();

    assert!(matches!(store.open(false), Err(Error::Closed)));
    assert!(matches!(store.close(), Err(Error::Closed)));
    assert!(matches!(store.get_sorted_events(None), Err(Error::Closed)));
}

#[test]
fn double_open_fails() {
    let test_store = TestStore::new();
    let mut store = test_store.open(false);
    assert!(matches!(store.open(false), Err(Error::AlreadyOpen)));
}

// ============================================================================
// Read-only access
// ============================================================================

#[test]
fn read_only_missing_file_fails() {
    let test_store = TestStore::new();
    let result = test_store.try_open(true, StoreConfig::for_testing());
    assert!(matches!(result, Err(Error::Io(e)) if e.kind() == std::io::ErrorKind::NotFound));
}

#[test]
fn read_only_rejects_writes() {
    let test_store = TestStore::new();
    {
        let mut store = test_store.open(false);
        add_event(&mut store, 1);
        store.close().unwrap();
    }

    let mut store = test_store.open(true);
    assert!(store.is_read_only());
    assert!(matches!(
        store.add_attribute_container(&mut Event::new(2, "x").into()),
        Err(Error::ReadOnly)
    ));
    assert!(matches!(
        store.write_session_start(&Session::new().create_session_start()),
        Err(Error::ReadOnly)
    ));
    assert_eq!(store.get_number_of_attribute_containers(ContainerType::Event).unwrap(), 1);
}

// ============================================================================
// Commit semantics
// ============================================================================

#[test]
fn close_commits_writes() {
    let test_store = TestStore::new();
    {
        let mut store = test_store.open(false);
        for timestamp in 0..4 {
            add_event(&mut store, timestamp);
        }
        store.close().unwrap();
    }

    let store = test_store.open(true);
    assert_eq!(store.get_number_of_attribute_containers(ContainerType::Event).unwrap(), 4);
}

#[test]
fn drop_commits_writes() {
    let test_store = TestStore::new();
    {
        let mut store = test_store.open(false);
        add_event_chain(&mut store, 10);
    }

    let store = test_store.open(true);
    assert!(store.has_attribute_containers(ContainerType::EventData).unwrap());
    assert_eq!(sorted_timestamps(&store, None), vec![10]);
}

#[test]
fn reopened_store_appends_after_existing_rows() {
    let test_store = TestStore::new();
    {
        let mut store = test_store.open(false);
        add_event(&mut store, 1);
        add_event(&mut store, 2);
    }

    let mut store = test_store.open(false);
    let identifier = add_event(&mut store, 3);
    assert_eq!(identifier, Identifier::new(ContainerType::Event, 3));
}

// ============================================================================
// Updates
// ============================================================================

#[test]
fn update_of_never_added_container_fails() {
    let test_store = TestStore::new();
    let mut store = test_store.open(false);
    add_event(&mut store, 1);

    let never_added: AttributeContainer = Event::new(2, "x").into();
    assert!(matches!(
        store.update_attribute_container(&never_added),
        Err(Error::MissingIdentifier(ContainerType::Event))
    ));

    let mut unknown: AttributeContainer = Event::new(3, "x").into();
    unknown.set_identifier(Identifier::new(ContainerType::Event, 99));
    assert!(matches!(
        store.update_attribute_container(&unknown),
        Err(Error::UnknownIdentifier(_))
    ));

    // The store is still usable
    add_event(&mut store, 4);
    assert_eq!(sorted_timestamps(&store, None), vec![1, 4]);
}

#[test]
fn update_changes_timeline_position() {
    let test_store = TestStore::new();
    let mut store = test_store.open(false);
    let first = add_event(&mut store, 10);
    add_event(&mut store, 20);

    let mut event = store
        .get_attribute_container_by_identifier(ContainerType::Event, &first)
        .unwrap()
        .unwrap();
    if let AttributeContainer::Event(inner) = &mut event {
        inner.timestamp = 30;
    }
    store.update_attribute_container(&event).unwrap();

    assert_eq!(sorted_timestamps(&store, None), vec![20, 30]);
}

// ============================================================================
// Session records
// ============================================================================

#[test]
fn sessions_are_rebuilt_from_records() {
    let test_store = TestStore::new();
    let mut session = Session::new();
    session.command_line = Some("chronicle --parsers winevtx".to_string());
    {
        let mut store = test_store.open(false);
        store.write_session_start(&session.create_session_start()).unwrap();
        store
            .write_session_configuration(&session.create_session_configuration())
            .unwrap();
        session.complete(false);
        store
            .write_session_completion(&session.create_session_completion())
            .unwrap();
        assert!(matches!(
            store.write_session_start(&session.create_session_start()),
            Err(Error::DuplicateWrite { .. })
        ));
        store.close().unwrap();
    }

    let store = test_store.open(true);
    let sessions = store.get_sessions().unwrap();
    assert_eq!(sessions.len(), 1);
    assert_eq!(sessions[0].identifier, session.identifier);
    assert_eq!(sessions[0].command_line, session.command_line);
    assert_eq!(sessions[0].completion_time, session.completion_time);
}

#[test]
fn task_records_need_task_store() {
    let test_store = TestStore::new();
    let mut store = test_store.open(false);
    let task = Task::new("session");
    assert!(matches!(
        store.write_task_start(&task.create_task_start()),
        Err(Error::StorageTypeMismatch { .. })
    ));
}

// ============================================================================
// Writer façade
// ============================================================================

#[test]
fn writer_drives_durable_store() {
    let test_store = TestStore::new();
    let store = DurableStore::new(&test_store.path, StoreConfig::for_testing());
    let mut writer = StorageWriter::new(Box::new(store));
    assert!(matches!(
        writer.add_attribute_container(&mut Event::new(1, "x").into()),
        Err(Error::NotOpen)
    ));

    writer.open().unwrap();
    let session = Session::new();
    writer.write_session_start(&session.create_session_start()).unwrap();
    let mut source: AttributeContainer = EventSource::new("/evidence/disk.E01").into();
    writer.add_attribute_container(&mut source).unwrap();
    let first = writer.get_first_written_event_source().unwrap().unwrap();
    assert_eq!(first.path_spec.as_deref(), Some("/evidence/disk.E01"));
    assert!(writer.get_next_written_event_source().unwrap().is_none());
    writer.close().unwrap();

    assert_eq!(writer.number_of_written_containers(ContainerType::SessionStart), 1);
    assert_eq!(writer.number_of_written_containers(ContainerType::EventSource), 1);
    assert!(matches!(writer.close(), Err(Error::Closed)));

    let store = test_store.open(true);
    assert!(store.has_attribute_containers(ContainerType::EventSource).unwrap());
}
