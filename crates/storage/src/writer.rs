//! Storage writer
//!
//! Lifecycle façade producers write through, over any [`ContainerStore`].
//!
//! ```text
//! Unopened --open--> Opened --close--> Closed
//! ```
//!
//! `Closed` is terminal. Every operation outside `Opened` fails with
//! `NotOpen` or `Closed` before reaching the store.

use crate::traits::{ContainerIter, ContainerStore, EventIter, StoreState};
use chronicle_core::{
    AttributeContainer, ContainerType, EventSource, EventTag, Identifier, Result,
    SessionCompletion, SessionConfiguration, SessionStart, SystemConfiguration, TaskCompletion,
    TaskStart, TimeRange,
};
use rustc_hash::FxHashMap;
use tracing::debug;

/// Lifecycle state of a writer
pub type WriterState = StoreState;

/// Writes attribute containers to a store
pub struct StorageWriter {
    store: Box<dyn ContainerStore>,
    state: WriterState,
    written: FxHashMap<ContainerType, u64>,
}

impl std::fmt::Debug for StorageWriter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StorageWriter")
            .field("backend", &self.store.backend_name())
            .field("state", &self.state)
            .field("written", &self.written)
            .finish()
    }
}

impl StorageWriter {
    /// Create a writer over an unopened store
    pub fn new(store: Box<dyn ContainerStore>) -> Self {
        StorageWriter {
            store,
            state: WriterState::Unopened,
            written: FxHashMap::default(),
        }
    }

    /// Current lifecycle state
    pub fn state(&self) -> WriterState {
        self.state
    }

    /// Open the underlying store for writing
    pub fn open(&mut self) -> Result<()> {
        self.state.ensure_openable()?;
        self.store.open(false)?;
        self.state = WriterState::Opened;
        debug!(backend = self.store.backend_name(), "opened storage writer");
        Ok(())
    }

    /// Close the underlying store
    pub fn close(&mut self) -> Result<()> {
        self.state.ensure_open()?;
        // Terminal even when the store fails to close
        self.state = WriterState::Closed;
        self.store.close()?;
        debug!(
            backend = self.store.backend_name(),
            written = self.written.values().sum::<u64>(),
            "closed storage writer"
        );
        Ok(())
    }

    /// Number of containers of a type added through this writer
    pub fn number_of_written_containers(&self, container_type: ContainerType) -> u64 {
        self.written.get(&container_type).copied().unwrap_or(0)
    }

    fn count(&mut self, container_type: ContainerType) {
        *self.written.entry(container_type).or_insert(0) += 1;
    }

    /// Add a container, back-filling its identifier
    pub fn add_attribute_container(
        &mut self,
        container: &mut AttributeContainer,
    ) -> Result<Identifier> {
        self.state.ensure_open()?;
        let identifier = self.store.add_attribute_container(container)?;
        self.count(identifier.container_type);
        Ok(identifier)
    }

    /// Overwrite a previously added container
    pub fn update_attribute_container(&mut self, container: &AttributeContainer) -> Result<()> {
        self.state.ensure_open()?;
        self.store.update_attribute_container(container)
    }

    /// Look up a container by identifier
    pub fn get_attribute_container_by_identifier(
        &self,
        container_type: ContainerType,
        identifier: &Identifier,
    ) -> Result<Option<AttributeContainer>> {
        self.state.ensure_open()?;
        self.store
            .get_attribute_container_by_identifier(container_type, identifier)
    }

    /// Look up a container by zero-based index
    pub fn get_attribute_container_by_index(
        &self,
        container_type: ContainerType,
        index: u64,
    ) -> Result<Option<AttributeContainer>> {
        self.state.ensure_open()?;
        self.store.get_attribute_container_by_index(container_type, index)
    }

    /// Iterate over containers of a type
    pub fn get_attribute_containers(
        &self,
        container_type: ContainerType,
    ) -> Result<ContainerIter<'_>> {
        self.state.ensure_open()?;
        self.store.get_attribute_containers(container_type)
    }

    /// Number of containers of a type in the store
    pub fn get_number_of_attribute_containers(&self, container_type: ContainerType) -> Result<u64> {
        self.state.ensure_open()?;
        self.store.get_number_of_attribute_containers(container_type)
    }

    /// Whether the store holds containers of a type
    pub fn has_attribute_containers(&self, container_type: ContainerType) -> Result<bool> {
        self.state.ensure_open()?;
        self.store.has_attribute_containers(container_type)
    }

    /// Latest event tag referring to an event
    pub fn get_event_tag_by_event_identifier(
        &self,
        event_identifier: &Identifier,
    ) -> Result<Option<EventTag>> {
        self.state.ensure_open()?;
        self.store.get_event_tag_by_event_identifier(event_identifier)
    }

    /// Iterate over events in timestamp order
    pub fn get_sorted_events(&self, time_range: Option<TimeRange>) -> Result<EventIter<'_>> {
        self.state.ensure_open()?;
        self.store.get_sorted_events(time_range)
    }

    /// Write the session start record
    pub fn write_session_start(&mut self, session_start: &SessionStart) -> Result<()> {
        self.state.ensure_open()?;
        self.store.write_session_start(session_start)?;
        self.count(ContainerType::SessionStart);
        Ok(())
    }

    /// Write the session completion record
    pub fn write_session_completion(&mut self, session_completion: &SessionCompletion) -> Result<()> {
        self.state.ensure_open()?;
        self.store.write_session_completion(session_completion)?;
        self.count(ContainerType::SessionCompletion);
        Ok(())
    }

    /// Write the session configuration record
    pub fn write_session_configuration(
        &mut self,
        session_configuration: &SessionConfiguration,
    ) -> Result<()> {
        self.state.ensure_open()?;
        self.store.write_session_configuration(session_configuration)?;
        self.count(ContainerType::SessionConfiguration);
        Ok(())
    }

    /// Write preprocessing information
    pub fn write_preprocessing_information(
        &mut self,
        system_configuration: &SystemConfiguration,
    ) -> Result<()> {
        self.state.ensure_open()?;
        self.store
            .write_preprocessing_information(system_configuration)?;
        self.count(ContainerType::SystemConfiguration);
        Ok(())
    }

    /// Write the task start record
    pub fn write_task_start(&mut self, task_start: &TaskStart) -> Result<()> {
        self.state.ensure_open()?;
        self.store.write_task_start(task_start)?;
        self.count(ContainerType::TaskStart);
        Ok(())
    }

    /// Write the task completion record
    pub fn write_task_completion(&mut self, task_completion: &TaskCompletion) -> Result<()> {
        self.state.ensure_open()?;
        self.store.write_task_completion(task_completion)?;
        self.count(ContainerType::TaskCompletion);
        Ok(())
    }

    /// First event source written since open
    pub fn get_first_written_event_source(&mut self) -> Result<Option<EventSource>> {
        self.state.ensure_open()?;
        self.store.get_first_written_event_source()
    }

    /// Next event source written since open
    pub fn get_next_written_event_source(&mut self) -> Result<Option<EventSource>> {
        self.state.ensure_open()?;
        self.store.get_next_written_event_source()
    }
}

impl Drop for StorageWriter {
    fn drop(&mut self) {
        if self.state == WriterState::Opened {
            if let Err(e) = self.close() {
                tracing::warn!(error = %e, "failed to close storage writer on drop");
            }
        }
    }
}
