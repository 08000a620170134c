//! SQLite schema and row access
//!
//! ```text
//! metadata(key TEXT, value TEXT)
//! <type>(_identifier INTEGER PRIMARY KEY AUTOINCREMENT, _data BLOB)
//! event(_identifier .., _timestamp INTEGER, _data BLOB)          + index on _timestamp
//! event_tag(_identifier .., _event_identifier INTEGER, _data BLOB) + index on _event_identifier
//! ```
//!
//! Table names are [`ContainerType::name`] values and never come from user
//! input, so they are formatted into statements directly.

use crate::format::StorageMetadata;
use chronicle_core::{AttributeContainer, ContainerType, Error, Result};
use rusqlite::{params, Connection, OptionalExtension};
use std::collections::BTreeMap;

/// Row body with its `_identifier`
pub(crate) type Row = (i64, Vec<u8>);

/// Event row body with its `_timestamp` and `_identifier`
pub(crate) type EventRow = (i64, i64, Vec<u8>);

/// Extra indexed column of a container table
pub(crate) fn key_column(container_type: ContainerType) -> Option<&'static str> {
    match container_type {
        ContainerType::Event => Some("_timestamp"),
        ContainerType::EventTag => Some("_event_identifier"),
        _ => None,
    }
}

/// Value of the extra indexed column for a container
pub(crate) fn key_value(container: &AttributeContainer) -> Option<i64> {
    match container {
        AttributeContainer::Event(event) => Some(event.timestamp),
        AttributeContainer::EventTag(tag) => tag
            .event_identifier
            .and_then(|id| i64::try_from(id.sequence_number).ok()),
        _ => None,
    }
}

/// Row id for a sequence number, `None` when it cannot be a row
pub(crate) fn row_id(sequence_number: u64) -> Option<i64> {
    i64::try_from(sequence_number).ok().filter(|id| *id > 0)
}

fn table_exists_by_name(connection: &Connection, name: &str) -> Result<bool> {
    connection
        .prepare_cached("SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = ?1")
        .and_then(|mut stmt| stmt.exists(params![name]))
        .map_err(Error::backend)
}

/// Whether the table of a container type exists
pub(crate) fn table_exists(connection: &Connection, container_type: ContainerType) -> Result<bool> {
    table_exists_by_name(connection, container_type.name())
}

/// Create the table of a container type
///
/// Fails with `TableExists` when the table is already present.
pub(crate) fn create_table(connection: &Connection, container_type: ContainerType) -> Result<()> {
    if table_exists(connection, container_type)? {
        return Err(Error::TableExists(container_type));
    }

    let table = container_type.name();
    let sql = match key_column(container_type) {
        Some(column) => format!(
            "CREATE TABLE {table} (_identifier INTEGER PRIMARY KEY AUTOINCREMENT, \
             {column} INTEGER, _data BLOB);\n\
             CREATE INDEX {table}{column}_idx ON {table} ({column});"
        ),
        None => format!(
            "CREATE TABLE {table} (_identifier INTEGER PRIMARY KEY AUTOINCREMENT, _data BLOB);"
        ),
    };
    connection.execute_batch(&sql).map_err(Error::backend)
}

/// Create the metadata table and write the metadata record
pub(crate) fn write_metadata(connection: &Connection, metadata: &StorageMetadata) -> Result<()> {
    connection
        .execute_batch("CREATE TABLE metadata (key TEXT, value TEXT);")
        .map_err(Error::backend)?;

    let mut stmt = connection
        .prepare("INSERT INTO metadata (key, value) VALUES (?1, ?2)")
        .map_err(Error::backend)?;
    for (key, value) in metadata.to_values() {
        stmt.execute(params![key, value]).map_err(Error::backend)?;
    }
    Ok(())
}

/// Read the metadata record as raw key/value pairs
///
/// NULL values are left out, so the format gate reports them as missing.
pub(crate) fn read_metadata(connection: &Connection) -> Result<BTreeMap<String, String>> {
    if !table_exists_by_name(connection, "metadata")? {
        return Err(Error::incompatible("Missing metadata table"));
    }

    let mut stmt = connection
        .prepare("SELECT key, value FROM metadata")
        .map_err(Error::backend)?;
    let rows = stmt
        .query_map([], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, Option<String>>(1)?))
        })
        .map_err(Error::backend)?;

    let mut values = BTreeMap::new();
    for row in rows {
        if let (key, Some(value)) = row.map_err(Error::backend)? {
            values.insert(key, value);
        }
    }
    Ok(values)
}

/// Insert a row, returning its `_identifier`
pub(crate) fn insert_row(
    connection: &Connection,
    container_type: ContainerType,
    key: Option<i64>,
    data: &[u8],
) -> Result<i64> {
    let table = container_type.name();
    match key_column(container_type) {
        Some(column) => connection
            .prepare_cached(&format!(
                "INSERT INTO {table} ({column}, _data) VALUES (?1, ?2)"
            ))
            .and_then(|mut stmt| stmt.execute(params![key, data])),
        None => connection
            .prepare_cached(&format!("INSERT INTO {table} (_data) VALUES (?1)"))
            .and_then(|mut stmt| stmt.execute(params![data])),
    }
    .map_err(Error::backend)?;
    Ok(connection.last_insert_rowid())
}

/// Overwrite a row, returning whether it existed
pub(crate) fn update_row(
    connection: &Connection,
    container_type: ContainerType,
    row_id: i64,
    key: Option<i64>,
    data: &[u8],
) -> Result<bool> {
    let table = container_type.name();
    let changed = match key_column(container_type) {
        Some(column) => connection
            .prepare_cached(&format!(
                "UPDATE {table} SET {column} = ?1, _data = ?2 WHERE _identifier = ?3"
            ))
            .and_then(|mut stmt| stmt.execute(params![key, data, row_id])),
        None => connection
            .prepare_cached(&format!(
                "UPDATE {table} SET _data = ?1 WHERE _identifier = ?2"
            ))
            .and_then(|mut stmt| stmt.execute(params![data, row_id])),
    }
    .map_err(Error::backend)?;
    Ok(changed > 0)
}

/// Read one row body
pub(crate) fn read_row(
    connection: &Connection,
    container_type: ContainerType,
    row_id: i64,
) -> Result<Option<Vec<u8>>> {
    let table = container_type.name();
    connection
        .prepare_cached(&format!("SELECT _data FROM {table} WHERE _identifier = ?1"))
        .and_then(|mut stmt| stmt.query_row(params![row_id], |row| row.get(0)).optional())
        .map_err(Error::backend)
}

/// Whether a row exists
pub(crate) fn row_exists(
    connection: &Connection,
    container_type: ContainerType,
    row_id: i64,
) -> Result<bool> {
    let table = container_type.name();
    connection
        .prepare_cached(&format!("SELECT 1 FROM {table} WHERE _identifier = ?1"))
        .and_then(|mut stmt| stmt.exists(params![row_id]))
        .map_err(Error::backend)
}

/// Number of rows in a table
pub(crate) fn count_rows(connection: &Connection, container_type: ContainerType) -> Result<u64> {
    let table = container_type.name();
    let count: i64 = connection
        .prepare_cached(&format!("SELECT COUNT(*) FROM {table}"))
        .and_then(|mut stmt| stmt.query_row([], |row| row.get(0)))
        .map_err(Error::backend)?;
    Ok(u64::try_from(count).unwrap_or(0))
}

/// Latest event tag row referring to an event row
pub(crate) fn latest_event_tag_row(
    connection: &Connection,
    event_row_id: i64,
) -> Result<Option<Row>> {
    connection
        .prepare_cached(
            "SELECT _identifier, _data FROM event_tag WHERE _event_identifier = ?1 \
             ORDER BY _identifier DESC LIMIT 1",
        )
        .and_then(|mut stmt| {
            stmt.query_row(params![event_row_id], |row| Ok((row.get(0)?, row.get(1)?)))
                .optional()
        })
        .map_err(Error::backend)
}

/// Up to `limit` rows with `_identifier > after`, in identifier order
pub(crate) fn read_rows_after(
    connection: &Connection,
    container_type: ContainerType,
    after: i64,
    limit: usize,
) -> Result<Vec<Row>> {
    let table = container_type.name();
    let limit = i64::try_from(limit).unwrap_or(i64::MAX);
    let mut stmt = connection
        .prepare_cached(&format!(
            "SELECT _identifier, _data FROM {table} WHERE _identifier > ?1 \
             ORDER BY _identifier LIMIT ?2"
        ))
        .map_err(Error::backend)?;
    let rows = stmt
        .query_map(params![after, limit], |row| Ok((row.get(0)?, row.get(1)?)))
        .map_err(Error::backend)?;
    rows.collect::<std::result::Result<Vec<_>, _>>()
        .map_err(Error::backend)
}

/// Up to `limit` event rows after the `(timestamp, identifier)` cursor and
/// at or before `end`, ordered by timestamp then identifier
pub(crate) fn read_events_after(
    connection: &Connection,
    cursor: (i64, i64),
    end: i64,
    limit: usize,
) -> Result<Vec<EventRow>> {
    let limit = i64::try_from(limit).unwrap_or(i64::MAX);
    let mut stmt = connection
        .prepare_cached(
            "SELECT _timestamp, _identifier, _data FROM event \
             WHERE (_timestamp > ?1 OR (_timestamp = ?1 AND _identifier > ?2)) \
             AND _timestamp <= ?3 \
             ORDER BY _timestamp, _identifier LIMIT ?4",
        )
        .map_err(Error::backend)?;
    let rows = stmt
        .query_map(params![cursor.0, cursor.1, end, limit], |row| {
            Ok((row.get(0)?, row.get(1)?, row.get(2)?))
        })
        .map_err(Error::backend)?;
    rows.collect::<std::result::Result<Vec<_>, _>>()
        .map_err(Error::backend)
}
