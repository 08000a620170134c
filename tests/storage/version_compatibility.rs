//! Version Compatibility Tests
//!
//! Stores written by older and newer builds, simulated with explicit
//! format policies, against the open-time format gate.

use crate::common::*;

/// Build writing version 1, oldest supported everywhere
const V1: FormatPolicy = FormatPolicy::new(1, 1, 1);

/// Build writing version 2 that still appends to version 1 stores
const V2: FormatPolicy = FormatPolicy::new(2, 1, 1);

/// Build writing version 3 that appends to version 2 and reads version 1
const V3: FormatPolicy = FormatPolicy::new(3, 2, 1);

/// Build writing version 4 that no longer reads version 1
const V4: FormatPolicy = FormatPolicy::new(4, 3, 2);

fn config(policy: FormatPolicy) -> StoreConfig {
    StoreConfig::for_testing().with_format_policy(policy)
}

fn write_store(test_store: &TestStore, policy: FormatPolicy) {
    let mut store = test_store.open_with(false, config(policy));
    add_event(&mut store, 42);
    store.close().unwrap();
}

fn assert_incompatible(result: chronicle::Result<DurableStore>) {
    assert!(
        matches!(result, Err(Error::IncompatibleFormat(_))),
        "expected IncompatibleFormat, got {:?}",
        result.map(|_| ())
    );
}

// ============================================================================
// Older stores
// ============================================================================

#[test]
fn newer_build_appends_to_append_compatible_store() {
    let test_store = TestStore::new();
    write_store(&test_store, V1);

    let mut store = test_store.open_with(false, config(V2));
    add_event(&mut store, 43);
    assert_eq!(store.metadata().unwrap().format_version, 1);
    assert_eq!(sorted_timestamps(&store, None), vec![42, 43]);
}

#[test]
fn store_between_floors_opens_read_only() {
    let test_store = TestStore::new();
    write_store(&test_store, V1);

    assert_incompatible(test_store.try_open(false, config(V3)));

    let store = test_store.open_with(true, config(V3));
    assert_eq!(sorted_timestamps(&store, None), vec![42]);
}

#[test]
fn store_below_read_floor_is_unusable() {
    let test_store = TestStore::new();
    write_store(&test_store, V1);

    assert_incompatible(test_store.try_open(false, config(V4)));
    assert_incompatible(test_store.try_open(true, config(V4)));
}

// ============================================================================
// Newer stores
// ============================================================================

#[test]
fn older_build_reads_newer_store_within_read_floor() {
    let test_store = TestStore::new();
    write_store(&test_store, V3);

    assert_incompatible(test_store.try_open(false, config(V1)));

    let store = test_store.open_with(true, config(V1));
    assert_eq!(store.metadata().unwrap().format_version, 3);
    assert_eq!(sorted_timestamps(&store, None), vec![42]);
}

#[test]
fn older_build_rejects_newer_store_above_read_floor() {
    let test_store = TestStore::new();
    write_store(&test_store, V4);

    assert_incompatible(test_store.try_open(true, config(V1)));
}

// ============================================================================
// Formats recorded at creation
// ============================================================================

#[test]
fn reopen_keeps_recorded_formats() {
    let test_store = TestStore::new();
    {
        let creation = StoreConfig::for_testing()
            .with_compression(CompressionFormat::Zstd)
            .with_serialization(SerializationFormat::MessagePack);
        let mut store = test_store.open_with(false, creation);
        add_event(&mut store, 7);
        store.close().unwrap();
    }

    // A differently configured reopen adopts the recorded formats
    let reopen = StoreConfig::for_testing()
        .with_compression(CompressionFormat::None)
        .with_serialization(SerializationFormat::Json);
    let mut store = test_store.open_with(false, reopen);
    add_event(&mut store, 8);
    let metadata = store.metadata().unwrap().clone();
    assert_eq!(metadata.compression_format, CompressionFormat::Zstd);
    assert_eq!(metadata.serialization_format, SerializationFormat::MessagePack);
    assert_eq!(sorted_timestamps(&store, None), vec![7, 8]);
}

#[test]
fn default_policy_is_consistent() {
    let policy = FormatPolicy::default();
    assert!(policy.validate().is_ok());
    assert!(policy.read_compatible_format_version <= policy.append_compatible_format_version);
    assert!(policy.append_compatible_format_version <= policy.format_version);

    let inverted = FormatPolicy::new(1, 2, 1);
    assert!(matches!(inverted.validate(), Err(Error::Config(_))));
}
