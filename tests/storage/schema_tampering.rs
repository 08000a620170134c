//! Schema Tampering Tests
//!
//! Stores modified behind the store's back through a raw SQLite connection.

use crate::common::*;

fn store_with_events(test_store: &TestStore, timestamps: &[i64]) {
    let mut store = test_store.open(false);
    for timestamp in timestamps {
        add_event_chain(&mut store, *timestamp);
    }
    store.close().unwrap();
}

// ============================================================================
// Missing tables
// ============================================================================

#[test]
fn dropped_table_counts_as_empty() {
    let test_store = TestStore::new();
    store_with_events(&test_store, &[1, 2, 3]);

    test_store
        .raw_connection()
        .execute_batch("DROP TABLE event")
        .unwrap();

    let store = test_store.open(true);
    assert_eq!(store.get_number_of_attribute_containers(ContainerType::Event).unwrap(), 0);
    assert!(!store.has_attribute_containers(ContainerType::Event).unwrap());
    assert!(sorted_timestamps(&store, None).is_empty());
    assert!(store
        .get_attribute_container_by_index(ContainerType::Event, 0)
        .unwrap()
        .is_none());
    // Other tables are untouched
    assert_eq!(store.get_number_of_attribute_containers(ContainerType::EventData).unwrap(), 3);
}

#[test]
fn dropped_table_is_recreated_on_add() {
    let test_store = TestStore::new();
    store_with_events(&test_store, &[1]);

    test_store
        .raw_connection()
        .execute_batch("DROP TABLE event_tag")
        .unwrap();

    let mut store = test_store.open(false);
    let event_id = Identifier::new(ContainerType::Event, 1);
    assert!(store.get_event_tag_by_event_identifier(&event_id).unwrap().is_none());

    let mut tag = EventTag::for_event(event_id);
    tag.add_label("recovered").unwrap();
    store.add_attribute_container(&mut tag.into()).unwrap();
    let tag = store.get_event_tag_by_event_identifier(&event_id).unwrap().unwrap();
    assert_eq!(tag.labels, vec!["recovered".to_string()]);
}

#[test]
fn cached_row_dropped_with_table() {
    let test_store = TestStore::new();
    store_with_events(&test_store, &[1, 2]);

    let store = test_store.open(true);
    let event = store
        .get_attribute_container_by_index(ContainerType::Event, 0)
        .unwrap();
    assert!(event.is_some());

    test_store
        .raw_connection()
        .execute_batch("DROP TABLE event")
        .unwrap();

    assert_eq!(store.get_number_of_attribute_containers(ContainerType::Event).unwrap(), 0);
    assert!(store
        .get_attribute_container_by_index(ContainerType::Event, 0)
        .unwrap()
        .is_none());
}

#[test]
fn unknown_type_name_is_rejected() {
    assert_eq!(ContainerType::from_name("event"), Some(ContainerType::Event));
    assert_eq!(ContainerType::from_name("extraction_warning"), None);
    assert!(matches!(
        "extraction_warning".parse::<ContainerType>(),
        Err(Error::UnknownContainerType(name)) if name == "extraction_warning"
    ));
    for container_type in ContainerType::all() {
        assert_eq!(ContainerType::from_name(container_type.name()), Some(*container_type));
    }
}

// ============================================================================
// Damaged metadata
// ============================================================================

#[test]
fn missing_metadata_table_is_incompatible() {
    let test_store = TestStore::new();
    store_with_events(&test_store, &[1]);

    test_store
        .raw_connection()
        .execute_batch("DROP TABLE metadata")
        .unwrap();

    let result = test_store.try_open(true, StoreConfig::for_testing());
    assert!(matches!(result, Err(Error::IncompatibleFormat(_))));
}

#[test]
fn unknown_compression_is_incompatible() {
    let test_store = TestStore::new();
    store_with_events(&test_store, &[1]);

    test_store
        .raw_connection()
        .execute(
            "UPDATE metadata SET value = ?1 WHERE key = 'compression_format'",
            ["lzma"],
        )
        .unwrap();

    for read_only in [true, false] {
        let result = test_store.try_open(read_only, StoreConfig::for_testing());
        assert!(
            matches!(&result, Err(Error::IncompatibleFormat(message)) if message.contains("lzma")),
            "read_only={}",
            read_only
        );
    }
}

#[test]
fn null_compression_is_incompatible() {
    let test_store = TestStore::new();
    store_with_events(&test_store, &[1]);

    test_store
        .raw_connection()
        .execute(
            "UPDATE metadata SET value = NULL WHERE key = 'compression_format'",
            (),
        )
        .unwrap();

    for read_only in [true, false] {
        let result = test_store.try_open(read_only, StoreConfig::for_testing());
        assert!(
            matches!(&result, Err(Error::IncompatibleFormat(message)) if message.contains("compression_format")),
            "read_only={}",
            read_only
        );
    }
}

#[test]
fn null_value_does_not_mask_old_format_version() {
    let test_store = TestStore::new();
    store_with_events(&test_store, &[1]);

    let connection = test_store.raw_connection();
    connection
        .execute("UPDATE metadata SET value = NULL WHERE key = 'storage_type'", ())
        .unwrap();
    connection
        .execute("UPDATE metadata SET value = '1' WHERE key = 'format_version'", ())
        .unwrap();
    drop(connection);

    for read_only in [true, false] {
        let result = test_store.try_open(read_only, StoreConfig::for_testing());
        assert!(
            matches!(&result, Err(Error::IncompatibleFormat(message)) if message.contains("too old")),
            "read_only={}",
            read_only
        );
    }
}

#[test]
fn unparsable_format_version_is_incompatible() {
    let test_store = TestStore::new();
    store_with_events(&test_store, &[1]);

    test_store
        .raw_connection()
        .execute(
            "UPDATE metadata SET value = 'twenty' WHERE key = 'format_version'",
            (),
        )
        .unwrap();

    let result = test_store.try_open(true, StoreConfig::for_testing());
    assert!(matches!(result, Err(Error::IncompatibleFormat(_))));
}

#[test]
fn corrupt_row_body_surfaces_serialization_error() {
    let test_store = TestStore::new();
    store_with_events(&test_store, &[1]);

    test_store
        .raw_connection()
        .execute(
            "UPDATE event SET _data = ?1 WHERE _identifier = 1",
            [vec![0xffu8, 0x00, 0x13]],
        )
        .unwrap();

    let store = test_store.open(true);
    let result = store.get_attribute_container_by_index(ContainerType::Event, 0);
    assert!(matches!(result, Err(Error::Serialization(_))));

    let mut events = store.get_sorted_events(None).unwrap();
    assert!(matches!(events.next(), Some(Err(Error::Serialization(_)))));
    assert!(events.next().is_none());
}
