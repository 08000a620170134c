//! Container store abstraction
//!
//! [`ContainerStore`] is the capability set shared by the durable and the
//! transient store, so the writer façade and the task merger can work with
//! either backend.
//!
//! Each store is bound to its location (file path or task segment) when it
//! is constructed; `open` only chooses the access mode.

use chronicle_core::{
    AttributeContainer, ContainerType, Event, EventSource, EventTag, Identifier, Result,
    SessionCompletion, SessionConfiguration, SessionStart, SystemConfiguration, TaskCompletion,
    TaskStart, TimeRange,
};

/// Lazy iterator over stored containers
pub type ContainerIter<'a> = Box<dyn Iterator<Item = Result<AttributeContainer>> + 'a>;

/// Lazy iterator over events in timestamp order
pub type EventIter<'a> = Box<dyn Iterator<Item = Result<Event>> + 'a>;

/// Lifecycle of a store handle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreState {
    /// Constructed, never opened
    Unopened,
    /// Open for reading, and for writing unless read-only
    Opened,
    /// Closed, terminal
    Closed,
}

impl StoreState {
    /// Fail unless the store is open
    pub fn ensure_open(self) -> Result<()> {
        match self {
            StoreState::Opened => Ok(()),
            StoreState::Unopened => Err(chronicle_core::Error::NotOpen),
            StoreState::Closed => Err(chronicle_core::Error::Closed),
        }
    }

    /// Fail unless the store can be opened
    pub fn ensure_openable(self) -> Result<()> {
        match self {
            StoreState::Unopened => Ok(()),
            StoreState::Opened => Err(chronicle_core::Error::AlreadyOpen),
            StoreState::Closed => Err(chronicle_core::Error::Closed),
        }
    }
}

/// Attribute container store
///
/// Single writer per store instance. Readers take `&self`; the returned
/// iterators borrow the store and fetch rows lazily.
///
/// # Errors
///
/// Every method fails with `NotOpen` before `open` and `Closed` after
/// `close`, except where a backend refuses an operation outright.
pub trait ContainerStore: Send {
    /// Backend name used in error messages
    fn backend_name(&self) -> &'static str;

    /// Current lifecycle state
    fn state(&self) -> StoreState;

    /// Open the store
    ///
    /// Creates the store when it does not exist and `read_only` is false.
    fn open(&mut self, read_only: bool) -> Result<()>;

    /// Close the store, committing pending writes
    fn close(&mut self) -> Result<()>;

    /// Add a container, back-filling and returning its new identifier
    fn add_attribute_container(&mut self, container: &mut AttributeContainer)
        -> Result<Identifier>;

    /// Overwrite a previously added container
    fn update_attribute_container(&mut self, container: &AttributeContainer) -> Result<()>;

    /// Look up a container by identifier
    fn get_attribute_container_by_identifier(
        &self,
        container_type: ContainerType,
        identifier: &Identifier,
    ) -> Result<Option<AttributeContainer>>;

    /// Look up a container by zero-based index
    fn get_attribute_container_by_index(
        &self,
        container_type: ContainerType,
        index: u64,
    ) -> Result<Option<AttributeContainer>>;

    /// Iterate over all containers of a type in identifier order
    fn get_attribute_containers(&self, container_type: ContainerType) -> Result<ContainerIter<'_>>;

    /// Number of containers of a type
    fn get_number_of_attribute_containers(&self, container_type: ContainerType) -> Result<u64>;

    /// Whether the store holds containers of a type
    fn has_attribute_containers(&self, container_type: ContainerType) -> Result<bool> {
        Ok(self.get_number_of_attribute_containers(container_type)? > 0)
    }

    /// Latest event tag referring to an event
    fn get_event_tag_by_event_identifier(
        &self,
        event_identifier: &Identifier,
    ) -> Result<Option<EventTag>>;

    /// Iterate over events by ascending timestamp, ties by identifier
    fn get_sorted_events(&self, time_range: Option<TimeRange>) -> Result<EventIter<'_>>;

    /// Write the session start record
    fn write_session_start(&mut self, session_start: &SessionStart) -> Result<()>;

    /// Write the session completion record
    fn write_session_completion(&mut self, session_completion: &SessionCompletion) -> Result<()>;

    /// Write the session configuration record
    fn write_session_configuration(
        &mut self,
        session_configuration: &SessionConfiguration,
    ) -> Result<()>;

    /// Write preprocessing information
    fn write_preprocessing_information(
        &mut self,
        system_configuration: &SystemConfiguration,
    ) -> Result<()>;

    /// Write the task start record
    fn write_task_start(&mut self, task_start: &TaskStart) -> Result<()>;

    /// Write the task completion record
    fn write_task_completion(&mut self, task_completion: &TaskCompletion) -> Result<()>;

    /// First event source written since open
    fn get_first_written_event_source(&mut self) -> Result<Option<EventSource>>;

    /// Next event source written since open
    fn get_next_written_event_source(&mut self) -> Result<Option<EventSource>>;
}

/// Fail when a single-row record was already written for the same key
///
/// `existing` yields the stored records of the same container type.
pub(crate) fn check_duplicate_record<'a>(
    container: &AttributeContainer,
    existing: impl Iterator<Item = Result<AttributeContainer>> + 'a,
) -> Result<()> {
    let Some(key) = container.record_key() else {
        return Ok(());
    };
    for stored in existing {
        if stored?.record_key() == Some(key) {
            return Err(chronicle_core::Error::DuplicateWrite {
                container_type: container.container_type(),
                identifier: key.to_string(),
            });
        }
    }
    Ok(())
}
