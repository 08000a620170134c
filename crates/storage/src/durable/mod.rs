//! Durable store
//!
//! SQLite-backed authoritative store of a session (or of a task when task
//! segments are written to files). One file holds the metadata record and
//! one table per container type; the `schema` module documents the layout.
//!
//! # Transactions
//!
//! A writable store runs inside one transaction from `open` to `close`.
//! Dropping an open store commits as well; a process crash loses writes
//! since open.
//!
//! # Caching
//!
//! Containers added, updated or read by identifier/index are cached per
//! type. Iterators and timeline reads bypass the cache.

mod iter;
mod schema;

use crate::cache::ContainerCache;
use crate::config::StoreConfig;
use crate::format::{check_storage_metadata, StorageMetadata, StorageType};
use crate::serializer::ContainerSerializer;
use crate::traits::{check_duplicate_record, ContainerIter, ContainerStore, EventIter, StoreState};
use chronicle_core::{
    AttributeContainer, ContainerType, Error, EventSource, EventTag, Identifier, Result, Session,
    SessionCompletion, SessionConfiguration, SessionStart, SystemConfiguration, TaskCompletion,
    TaskStart, TimeRange,
};
use iter::{ContainerPages, SortedEventPages};
use parking_lot::Mutex;
use rusqlite::{Connection, OpenFlags};
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

const BACKEND: &str = "durable";

/// Connection and serializer of an open store
struct Handle<'a> {
    connection: &'a Connection,
    serializer: &'a ContainerSerializer,
}

impl Handle<'_> {
    fn exists(&self, identifier: &Identifier) -> Result<bool> {
        let Some(row_id) = schema::row_id(identifier.sequence_number) else {
            return Ok(false);
        };
        if !schema::table_exists(self.connection, identifier.container_type)? {
            return Ok(false);
        }
        schema::row_exists(self.connection, identifier.container_type, row_id)
    }

    fn read(&self, container_type: ContainerType, row_id: i64) -> Result<Option<AttributeContainer>> {
        if !schema::table_exists(self.connection, container_type)? {
            return Ok(None);
        }
        let Some(data) = schema::read_row(self.connection, container_type, row_id)? else {
            return Ok(None);
        };
        let mut container = self.serializer.deserialize(container_type, &data)?;
        container.set_identifier(Identifier::new(container_type, row_id as u64));
        Ok(Some(container))
    }
}

/// SQLite-backed attribute container store
pub struct DurableStore {
    path: PathBuf,
    config: StoreConfig,
    state: StoreState,
    read_only: bool,
    connection: Option<Connection>,
    serializer: Option<ContainerSerializer>,
    metadata: Option<StorageMetadata>,
    cache: Mutex<ContainerCache>,
    written_event_sources: Vec<Identifier>,
    event_source_cursor: usize,
}

impl std::fmt::Debug for DurableStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DurableStore")
            .field("path", &self.path)
            .field("state", &self.state)
            .field("read_only", &self.read_only)
            .field("metadata", &self.metadata)
            .finish()
    }
}

impl DurableStore {
    /// Create a handle for the store file at `path`
    ///
    /// Nothing is touched on disk until [`ContainerStore::open`].
    pub fn new(path: impl AsRef<Path>, config: StoreConfig) -> Self {
        DurableStore {
            path: path.as_ref().to_path_buf(),
            cache: Mutex::new(ContainerCache::new(config.cache_size)),
            config,
            state: StoreState::Unopened,
            read_only: false,
            connection: None,
            serializer: None,
            metadata: None,
            written_event_sources: Vec::new(),
            event_source_cursor: 0,
        }
    }

    /// Create a handle and open it
    pub fn open_file(path: impl AsRef<Path>, read_only: bool, config: StoreConfig) -> Result<Self> {
        let mut store = Self::new(path, config);
        store.open(read_only)?;
        Ok(store)
    }

    /// Path of the store file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Whether the store was opened read-only
    pub fn is_read_only(&self) -> bool {
        self.read_only
    }

    /// Metadata record of the open store
    pub fn metadata(&self) -> Option<&StorageMetadata> {
        self.metadata.as_ref()
    }

    /// Reassemble the sessions recorded in this store
    ///
    /// Sessions are ordered by their start records; completion and
    /// configuration records are matched on session identifier.
    pub fn get_sessions(&self) -> Result<Vec<Session>> {
        let mut sessions = Vec::new();
        for container in self.get_attribute_containers(ContainerType::SessionStart)? {
            let start: SessionStart = container?.downcast()?;
            sessions.push(Session::from_session_start(&start));
        }

        for container in self.get_attribute_containers(ContainerType::SessionCompletion)? {
            let completion: SessionCompletion = container?.downcast()?;
            if let Some(session) = sessions
                .iter_mut()
                .find(|s| s.identifier == completion.session_identifier)
            {
                session.copy_from_session_completion(&completion);
            }
        }

        for container in self.get_attribute_containers(ContainerType::SessionConfiguration)? {
            let configuration: SessionConfiguration = container?.downcast()?;
            if let Some(session) = sessions
                .iter_mut()
                .find(|s| s.identifier == configuration.session_identifier)
            {
                session.copy_from_session_configuration(&configuration);
            }
        }

        Ok(sessions)
    }

    fn handle(&self) -> Result<Handle<'_>> {
        self.state.ensure_open()?;
        match (&self.connection, &self.serializer) {
            (Some(connection), Some(serializer)) => Ok(Handle {
                connection,
                serializer,
            }),
            _ => Err(Error::NotOpen),
        }
    }

    fn ensure_writable(&self) -> Result<()> {
        self.state.ensure_open()?;
        if self.read_only {
            return Err(Error::ReadOnly);
        }
        Ok(())
    }

    fn write_record(
        &mut self,
        mut container: AttributeContainer,
        required: StorageType,
    ) -> Result<()> {
        self.ensure_writable()?;
        let storage_type = self
            .metadata
            .as_ref()
            .map_or(StorageType::default(), |m| m.storage_type);
        if storage_type != required {
            return Err(Error::StorageTypeMismatch {
                container_type: container.container_type(),
                storage_type: storage_type.name(),
            });
        }

        check_duplicate_record(
            &container,
            self.get_attribute_containers(container.container_type())?,
        )?;
        self.add_attribute_container(&mut container)?;
        Ok(())
    }

    fn create_schema(connection: &Connection, metadata: &StorageMetadata) -> Result<()> {
        schema::write_metadata(connection, metadata)?;
        for container_type in ContainerType::all() {
            schema::create_table(connection, *container_type)?;
        }
        Ok(())
    }

    fn commit(&mut self) -> Result<()> {
        if let (false, Some(connection)) = (self.read_only, &self.connection) {
            connection.execute_batch("COMMIT").map_err(Error::backend)?;
        }
        Ok(())
    }
}

impl ContainerStore for DurableStore {
    fn backend_name(&self) -> &'static str {
        BACKEND
    }

    fn state(&self) -> StoreState {
        self.state
    }

    fn open(&mut self, read_only: bool) -> Result<()> {
        self.state.ensure_openable()?;
        self.config.validate()?;

        let exists = self.path.exists();
        if read_only && !exists {
            return Err(Error::Io(io::Error::new(
                io::ErrorKind::NotFound,
                format!("no such store: {}", self.path.display()),
            )));
        }

        let connection = if read_only {
            Connection::open_with_flags(&self.path, OpenFlags::SQLITE_OPEN_READ_ONLY)
        } else {
            Connection::open(&self.path)
        }
        .map_err(Error::backend)?;

        let metadata = if exists {
            let values = schema::read_metadata(&connection)?;
            let metadata = check_storage_metadata(&values, &self.config.format_policy, read_only)?;
            if !read_only {
                connection.execute_batch("BEGIN").map_err(Error::backend)?;
            }
            metadata
        } else {
            let metadata = StorageMetadata::new(
                &self.config.format_policy,
                self.config.compression_format,
                self.config.serialization_format,
                self.config.storage_type,
            );
            connection.execute_batch("BEGIN").map_err(Error::backend)?;
            Self::create_schema(&connection, &metadata)?;
            info!(path = %self.path.display(), storage_type = %metadata.storage_type, "created durable store");
            metadata
        };

        self.serializer = Some(ContainerSerializer::new(
            metadata.serialization_format,
            metadata.compression_format,
        ));
        info!(
            path = %self.path.display(),
            read_only,
            format_version = metadata.format_version,
            "opened durable store"
        );
        self.metadata = Some(metadata);
        self.connection = Some(connection);
        self.read_only = read_only;
        self.state = StoreState::Opened;
        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        self.state.ensure_open()?;
        self.commit()?;
        self.state = StoreState::Closed;
        self.serializer = None;
        self.cache.lock().clear();
        self.written_event_sources.clear();

        if let Some(connection) = self.connection.take() {
            connection
                .close()
                .map_err(|(_, e)| Error::backend(e))?;
        }
        info!(path = %self.path.display(), "closed durable store");
        Ok(())
    }

    fn add_attribute_container(
        &mut self,
        container: &mut AttributeContainer,
    ) -> Result<Identifier> {
        self.ensure_writable()?;
        let handle = self.handle()?;
        container.check_parent_reference(|reference| handle.exists(reference))?;

        let container_type = container.container_type();
        if !schema::table_exists(handle.connection, container_type)? {
            debug!(%container_type, "creating missing table");
            schema::create_table(handle.connection, container_type)?;
        }

        let data = handle.serializer.serialize(container)?;
        let row_id = schema::insert_row(
            handle.connection,
            container_type,
            schema::key_value(container),
            &data,
        )?;

        let identifier = Identifier::new(container_type, row_id as u64);
        container.set_identifier(identifier);
        if let Some(index) = identifier.index() {
            self.cache.lock().cache_container(container.clone(), index);
        }
        if container_type == ContainerType::EventSource {
            self.written_event_sources.push(identifier);
        }
        Ok(identifier)
    }

    fn update_attribute_container(&mut self, container: &AttributeContainer) -> Result<()> {
        self.ensure_writable()?;
        let container_type = container.container_type();
        let identifier = container
            .identifier()
            .ok_or(Error::MissingIdentifier(container_type))?;
        let row_id = match schema::row_id(identifier.sequence_number) {
            Some(row_id) if identifier.container_type == container_type => row_id,
            _ => return Err(Error::UnknownIdentifier(identifier)),
        };

        let handle = self.handle()?;
        container.check_parent_reference(|reference| handle.exists(reference))?;
        if !schema::table_exists(handle.connection, container_type)? {
            return Err(Error::UnknownIdentifier(identifier));
        }

        let data = handle.serializer.serialize(container)?;
        let updated = schema::update_row(
            handle.connection,
            container_type,
            row_id,
            schema::key_value(container),
            &data,
        )?;
        if !updated {
            if let Some(index) = identifier.index() {
                self.cache.lock().invalidate(container_type, index);
            }
            return Err(Error::UnknownIdentifier(identifier));
        }

        if let Some(index) = identifier.index() {
            self.cache.lock().cache_container(container.clone(), index);
        }
        Ok(())
    }

    fn get_attribute_container_by_identifier(
        &self,
        container_type: ContainerType,
        identifier: &Identifier,
    ) -> Result<Option<AttributeContainer>> {
        self.state.ensure_open()?;
        match identifier.index() {
            Some(index) if identifier.container_type == container_type => {
                self.get_attribute_container_by_index(container_type, index)
            }
            _ => Ok(None),
        }
    }

    fn get_attribute_container_by_index(
        &self,
        container_type: ContainerType,
        index: u64,
    ) -> Result<Option<AttributeContainer>> {
        let handle = self.handle()?;
        // A table dropped behind the store's back takes its cached rows with it
        if !schema::table_exists(handle.connection, container_type)? {
            self.cache.lock().invalidate(container_type, index);
            return Ok(None);
        }
        if let Some(container) = self.cache.lock().get_cached_container(container_type, index) {
            return Ok(Some(container));
        }

        let Some(row_id) = index.checked_add(1).and_then(schema::row_id) else {
            return Ok(None);
        };
        let container = handle.read(container_type, row_id)?;
        if let Some(container) = &container {
            self.cache.lock().cache_container(container.clone(), index);
        }
        Ok(container)
    }

    fn get_attribute_containers(&self, container_type: ContainerType) -> Result<ContainerIter<'_>> {
        let handle = self.handle()?;
        if !schema::table_exists(handle.connection, container_type)? {
            return Ok(Box::new(std::iter::empty()));
        }
        Ok(Box::new(ContainerPages::new(
            handle.connection,
            handle.serializer,
            container_type,
            self.config.read_batch_size,
        )))
    }

    fn get_number_of_attribute_containers(&self, container_type: ContainerType) -> Result<u64> {
        let handle = self.handle()?;
        if !schema::table_exists(handle.connection, container_type)? {
            return Ok(0);
        }
        schema::count_rows(handle.connection, container_type)
    }

    fn get_event_tag_by_event_identifier(
        &self,
        event_identifier: &Identifier,
    ) -> Result<Option<EventTag>> {
        let handle = self.handle()?;
        let Some(event_row_id) = schema::row_id(event_identifier.sequence_number) else {
            return Ok(None);
        };
        if event_identifier.container_type != ContainerType::Event
            || !schema::table_exists(handle.connection, ContainerType::EventTag)?
        {
            return Ok(None);
        }

        let Some((row_id, data)) = schema::latest_event_tag_row(handle.connection, event_row_id)?
        else {
            return Ok(None);
        };
        let mut container = handle.serializer.deserialize(ContainerType::EventTag, &data)?;
        container.set_identifier(Identifier::new(ContainerType::EventTag, row_id as u64));
        container.downcast().map(Some)
    }

    fn get_sorted_events(&self, time_range: Option<TimeRange>) -> Result<EventIter<'_>> {
        let handle = self.handle()?;
        if !schema::table_exists(handle.connection, ContainerType::Event)? {
            return Ok(Box::new(std::iter::empty()));
        }
        Ok(Box::new(SortedEventPages::new(
            handle.connection,
            handle.serializer,
            time_range,
            self.config.read_batch_size,
        )))
    }

    fn write_session_start(&mut self, session_start: &SessionStart) -> Result<()> {
        self.write_record(session_start.clone().into(), StorageType::Session)
    }

    fn write_session_completion(&mut self, session_completion: &SessionCompletion) -> Result<()> {
        self.write_record(session_completion.clone().into(), StorageType::Session)
    }

    fn write_session_configuration(
        &mut self,
        session_configuration: &SessionConfiguration,
    ) -> Result<()> {
        self.write_record(session_configuration.clone().into(), StorageType::Session)
    }

    fn write_preprocessing_information(
        &mut self,
        system_configuration: &SystemConfiguration,
    ) -> Result<()> {
        self.write_record(system_configuration.clone().into(), StorageType::Session)
    }

    fn write_task_start(&mut self, task_start: &TaskStart) -> Result<()> {
        self.write_record(task_start.clone().into(), StorageType::Task)
    }

    fn write_task_completion(&mut self, task_completion: &TaskCompletion) -> Result<()> {
        self.write_record(task_completion.clone().into(), StorageType::Task)
    }

    fn get_first_written_event_source(&mut self) -> Result<Option<EventSource>> {
        self.state.ensure_open()?;
        self.event_source_cursor = 0;
        self.get_next_written_event_source()
    }

    fn get_next_written_event_source(&mut self) -> Result<Option<EventSource>> {
        self.state.ensure_open()?;
        let Some(identifier) = self.written_event_sources.get(self.event_source_cursor).copied()
        else {
            return Ok(None);
        };
        self.event_source_cursor += 1;

        match self.get_attribute_container_by_identifier(ContainerType::EventSource, &identifier)? {
            Some(container) => container.downcast().map(Some),
            None => Err(Error::UnknownIdentifier(identifier)),
        }
    }
}

impl Drop for DurableStore {
    fn drop(&mut self) {
        if self.state == StoreState::Opened {
            if let Err(e) = self.close() {
                warn!(path = %self.path.display(), error = %e, "failed to close durable store on drop");
            }
        }
    }
}
