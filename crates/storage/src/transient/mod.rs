//! Transient store
//!
//! In-memory store for the containers produced by one task. Rows live in a
//! segment of a shared [`TransientSpace`], so after the task's writer closes
//! the store the task merger can reopen the segment read-only and fold it
//! into the session store.
//!
//! Only task-scoped container types are held here. Session-level records
//! and preprocessing information belong to the session store and are always
//! refused.

mod space;

pub use space::TransientSpace;

use crate::cache::ContainerCache;
use crate::config::StoreConfig;
use crate::format::{check_storage_metadata, StorageMetadata, StorageType};
use crate::serializer::ContainerSerializer;
use crate::traits::{check_duplicate_record, ContainerIter, ContainerStore, EventIter, StoreState};
use chronicle_core::{
    AttributeContainer, Container, ContainerType, Error, Event, EventSource, EventTag, Identifier,
    Result, SessionCompletion, SessionConfiguration, SessionStart, SystemConfiguration,
    TaskCompletion, TaskStart, TimeRange,
};
use parking_lot::Mutex;
use space::{Segment, SegmentRow, SharedSegment};
use std::io;
use tracing::{debug, info};

const BACKEND: &str = "transient";

fn unsupported_operation(operation: &'static str) -> Error {
    Error::BackendUnsupportedOperation {
        operation,
        backend: BACKEND,
    }
}

fn ensure_supported(container_type: ContainerType) -> Result<()> {
    if container_type.is_task_scoped() {
        Ok(())
    } else {
        Err(Error::UnsupportedContainerType {
            container_type,
            backend: BACKEND,
        })
    }
}

fn segment_row(container: &AttributeContainer, data: Vec<u8>) -> SegmentRow {
    SegmentRow {
        data,
        timestamp: container.timestamp(),
        event_sequence_number: match container {
            AttributeContainer::EventTag(tag) => tag.event_identifier.map(|id| id.sequence_number),
            _ => None,
        },
    }
}

fn reference_exists(segment: &Segment, reference: &Identifier) -> bool {
    reference
        .index()
        .and_then(|index| segment.row(reference.container_type, index))
        .is_some()
}

/// In-memory attribute container store of one task
pub struct TransientStore {
    space: TransientSpace,
    task_identifier: String,
    config: StoreConfig,
    state: StoreState,
    read_only: bool,
    segment: Option<SharedSegment>,
    serializer: Option<ContainerSerializer>,
    metadata: Option<StorageMetadata>,
    cache: Mutex<ContainerCache>,
}

impl std::fmt::Debug for TransientStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransientStore")
            .field("task_identifier", &self.task_identifier)
            .field("state", &self.state)
            .field("read_only", &self.read_only)
            .field("metadata", &self.metadata)
            .finish()
    }
}

impl TransientStore {
    /// Create a handle for the segment of `task_identifier` in `space`
    ///
    /// The storage type of `config` is ignored; segments are task stores.
    pub fn new(space: TransientSpace, task_identifier: impl Into<String>, config: StoreConfig) -> Self {
        TransientStore {
            space,
            task_identifier: task_identifier.into(),
            cache: Mutex::new(ContainerCache::new(config.cache_size)),
            config,
            state: StoreState::Unopened,
            read_only: false,
            segment: None,
            serializer: None,
            metadata: None,
        }
    }

    /// Identifier of the task whose segment this store holds
    pub fn task_identifier(&self) -> &str {
        &self.task_identifier
    }

    /// Metadata record of the open segment
    pub fn metadata(&self) -> Option<&StorageMetadata> {
        self.metadata.as_ref()
    }

    fn open_segment(&self) -> Result<(&SharedSegment, &ContainerSerializer)> {
        self.state.ensure_open()?;
        match (&self.segment, &self.serializer) {
            (Some(segment), Some(serializer)) => Ok((segment, serializer)),
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

    fn write_record(&mut self, mut container: AttributeContainer) -> Result<()> {
        self.ensure_writable()?;
        check_duplicate_record(
            &container,
            self.get_attribute_containers(container.container_type())?,
        )?;
        self.add_attribute_container(&mut container)?;
        Ok(())
    }
}

impl ContainerStore for TransientStore {
    fn backend_name(&self) -> &'static str {
        BACKEND
    }

    fn state(&self) -> StoreState {
        self.state
    }

    fn open(&mut self, read_only: bool) -> Result<()> {
        self.state.ensure_openable()?;
        self.config.validate()?;

        let (segment, metadata) = match self.space.segment(&self.task_identifier) {
            Some(segment) => {
                let metadata = check_storage_metadata(
                    &segment.read().metadata,
                    &self.config.format_policy,
                    read_only,
                )?;
                (segment, metadata)
            }
            None if read_only => {
                return Err(Error::Io(io::Error::new(
                    io::ErrorKind::NotFound,
                    format!("no segment for task: {}", self.task_identifier),
                )));
            }
            None => {
                let metadata = StorageMetadata::new(
                    &self.config.format_policy,
                    self.config.compression_format,
                    self.config.serialization_format,
                    StorageType::Task,
                );
                let segment = self.space.create_segment(&self.task_identifier, &metadata);
                (segment, metadata)
            }
        };

        self.serializer = Some(ContainerSerializer::new(
            metadata.serialization_format,
            metadata.compression_format,
        ));
        debug!(
            task_identifier = %self.task_identifier,
            read_only,
            "opened transient store"
        );
        self.metadata = Some(metadata);
        self.segment = Some(segment);
        self.read_only = read_only;
        self.state = StoreState::Opened;
        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        self.state.ensure_open()?;
        self.state = StoreState::Closed;
        self.segment = None;
        self.serializer = None;
        self.cache.lock().clear();
        debug!(task_identifier = %self.task_identifier, "closed transient store");
        Ok(())
    }

    fn add_attribute_container(
        &mut self,
        container: &mut AttributeContainer,
    ) -> Result<Identifier> {
        self.ensure_writable()?;
        let container_type = container.container_type();
        ensure_supported(container_type)?;

        let (segment, serializer) = self.open_segment()?;
        let data = serializer.serialize(container)?;
        let sequence_number = {
            let mut segment = segment.write();
            container.check_parent_reference(|reference| Ok(reference_exists(&segment, reference)))?;
            segment.push(container_type, segment_row(container, data))
        };

        let identifier = Identifier::new(container_type, sequence_number);
        container.set_identifier(identifier);
        self.cache
            .lock()
            .cache_container(container.clone(), sequence_number - 1);
        Ok(identifier)
    }

    fn update_attribute_container(&mut self, container: &AttributeContainer) -> Result<()> {
        self.ensure_writable()?;
        let container_type = container.container_type();
        ensure_supported(container_type)?;
        let identifier = container
            .identifier()
            .ok_or(Error::MissingIdentifier(container_type))?;
        let index = match identifier.index() {
            Some(index) if identifier.container_type == container_type => index,
            _ => return Err(Error::UnknownIdentifier(identifier)),
        };

        let (segment, serializer) = self.open_segment()?;
        let data = serializer.serialize(container)?;
        {
            let mut segment = segment.write();
            if segment.row(container_type, index).is_none() {
                return Err(Error::UnknownIdentifier(identifier));
            }
            container.check_parent_reference(|reference| Ok(reference_exists(&segment, reference)))?;
            segment.replace(container_type, index, segment_row(container, data));
        }

        self.cache.lock().cache_container(container.clone(), index);
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
        let (segment, serializer) = self.open_segment()?;
        ensure_supported(container_type)?;
        if let Some(container) = self.cache.lock().get_cached_container(container_type, index) {
            return Ok(Some(container));
        }

        let Some(data) = segment
            .read()
            .row(container_type, index)
            .map(|row| row.data.clone())
        else {
            return Ok(None);
        };
        let mut container = serializer.deserialize(container_type, &data)?;
        container.set_identifier(Identifier::from_index(container_type, index));
        self.cache.lock().cache_container(container.clone(), index);
        Ok(Some(container))
    }

    fn get_attribute_containers(&self, container_type: ContainerType) -> Result<ContainerIter<'_>> {
        let (segment, serializer) = self.open_segment()?;
        ensure_supported(container_type)?;
        Ok(Box::new(SegmentRows {
            segment: segment.clone(),
            serializer,
            container_type,
            next_index: 0,
        }))
    }

    fn get_number_of_attribute_containers(&self, container_type: ContainerType) -> Result<u64> {
        let (segment, _) = self.open_segment()?;
        ensure_supported(container_type)?;
        let count = segment.read().rows(container_type).len();
        Ok(count as u64)
    }

    fn get_event_tag_by_event_identifier(
        &self,
        event_identifier: &Identifier,
    ) -> Result<Option<EventTag>> {
        let (segment, serializer) = self.open_segment()?;
        if event_identifier.container_type != ContainerType::Event {
            return Ok(None);
        }

        let latest = {
            let segment = segment.read();
            segment
                .rows(ContainerType::EventTag)
                .iter()
                .enumerate()
                .rev()
                .find(|(_, row)| row.event_sequence_number == Some(event_identifier.sequence_number))
                .map(|(index, row)| (index as u64, row.data.clone()))
        };
        let Some((index, data)) = latest else {
            return Ok(None);
        };

        let mut tag: EventTag = serializer
            .deserialize(ContainerType::EventTag, &data)?
            .downcast()?;
        tag.set_identifier(Identifier::from_index(ContainerType::EventTag, index));
        Ok(Some(tag))
    }

    fn get_sorted_events(&self, time_range: Option<TimeRange>) -> Result<EventIter<'_>> {
        let (segment, serializer) = self.open_segment()?;

        // Sort keys only; bodies are deserialized lazily
        let mut order: Vec<(i64, u64)> = segment
            .read()
            .rows(ContainerType::Event)
            .iter()
            .enumerate()
            .filter_map(|(index, row)| Some((row.timestamp?, index as u64)))
            .filter(|(timestamp, _)| time_range.map_or(true, |r| r.contains(*timestamp)))
            .collect();
        order.sort_unstable();

        Ok(Box::new(SortedSegmentEvents {
            segment: segment.clone(),
            serializer,
            order: order.into_iter(),
        }))
    }

    fn write_session_start(&mut self, _session_start: &SessionStart) -> Result<()> {
        Err(unsupported_operation("Session start"))
    }

    fn write_session_completion(&mut self, _session_completion: &SessionCompletion) -> Result<()> {
        Err(unsupported_operation("Session completion"))
    }

    fn write_session_configuration(
        &mut self,
        _session_configuration: &SessionConfiguration,
    ) -> Result<()> {
        Err(unsupported_operation("Session configuration"))
    }

    fn write_preprocessing_information(
        &mut self,
        _system_configuration: &SystemConfiguration,
    ) -> Result<()> {
        Err(unsupported_operation("Preprocessing information"))
    }

    fn write_task_start(&mut self, task_start: &TaskStart) -> Result<()> {
        self.write_record(task_start.clone().into())
    }

    fn write_task_completion(&mut self, task_completion: &TaskCompletion) -> Result<()> {
        self.write_record(task_completion.clone().into())?;
        info!(task_identifier = %self.task_identifier, "task segment completed");
        Ok(())
    }

    fn get_first_written_event_source(&mut self) -> Result<Option<EventSource>> {
        self.state.ensure_open()?;
        Ok(None)
    }

    fn get_next_written_event_source(&mut self) -> Result<Option<EventSource>> {
        self.state.ensure_open()?;
        Ok(None)
    }
}

/// Containers of one type in a segment, read one row per step
struct SegmentRows<'a> {
    segment: SharedSegment,
    serializer: &'a ContainerSerializer,
    container_type: ContainerType,
    next_index: u64,
}

impl Iterator for SegmentRows<'_> {
    type Item = Result<AttributeContainer>;

    fn next(&mut self) -> Option<Self::Item> {
        let data = self
            .segment
            .read()
            .row(self.container_type, self.next_index)?
            .data
            .clone();
        let index = self.next_index;
        self.next_index += 1;

        let result = self
            .serializer
            .deserialize(self.container_type, &data)
            .map(|mut container| {
                container.set_identifier(Identifier::from_index(self.container_type, index));
                container
            });
        Some(result)
    }
}

/// Events of a segment in a precomputed `(timestamp, index)` order
struct SortedSegmentEvents<'a> {
    segment: SharedSegment,
    serializer: &'a ContainerSerializer,
    order: std::vec::IntoIter<(i64, u64)>,
}

impl Iterator for SortedSegmentEvents<'_> {
    type Item = Result<Event>;

    fn next(&mut self) -> Option<Self::Item> {
        let (_, index) = self.order.next()?;
        let data = self
            .segment
            .read()
            .row(ContainerType::Event, index)?
            .data
            .clone();

        let result = self
            .serializer
            .deserialize(ContainerType::Event, &data)
            .and_then(|container| container.downcast::<Event>())
            .map(|mut event| {
                event.set_identifier(Identifier::from_index(ContainerType::Event, index));
                event
            });
        Some(result)
    }
}
