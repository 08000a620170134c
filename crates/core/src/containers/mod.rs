//! Attribute containers
//!
//! Attribute containers are the typed records persisted by a store. Each
//! concrete container type implements [`Container`]; the closed
//! [`AttributeContainer`] enum is what stores accept and return.
//!
//! # Identifiers
//!
//! A container's own [`Identifier`] is assigned by the store on write and is
//! never part of the serialized body. References to other containers are
//! plain identifiers held in named fields:
//!
//! | Container | Parent reference |
//! |-----------|------------------|
//! | Event | `event_data_identifier` |
//! | EventData | `event_data_stream_identifier` |
//! | EventTag | `event_identifier` |
//!
//! A container never owns or points at another container directly.

/// Implements identifier accessors for a container with an
/// `identifier: Option<Identifier>` field.
macro_rules! container_identifier {
    () => {
        fn identifier(&self) -> Option<$crate::identifier::Identifier> {
            self.identifier
        }

        fn set_identifier(&mut self, identifier: $crate::identifier::Identifier) {
            self.identifier = Some(identifier);
        }
    };
}
pub(crate) use container_identifier;

pub mod events;
pub mod sessions;
pub mod tasks;

pub use events::{Event, EventData, EventDataStream, EventSource, EventTag};
pub use sessions::{
    Session, SessionCompletion, SessionConfiguration, SessionStart, SystemConfiguration,
};
pub use tasks::{Task, TaskCompletion, TaskStart};

use crate::error::Error;
use crate::identifier::{ContainerType, Identifier};
use serde::de::DeserializeOwned;
use serde::Serialize;

/// Behavior shared by all concrete attribute container types
pub trait Container: Serialize + DeserializeOwned + Clone + PartialEq + Send + Sync {
    /// Type tag of this container
    const CONTAINER_TYPE: ContainerType;

    /// Identifier assigned by the store, if the container was written
    fn identifier(&self) -> Option<Identifier>;

    /// Back-fill the store-assigned identifier
    fn set_identifier(&mut self, identifier: Identifier);

    /// Identifier of the container this one depends on
    fn parent_identifier(&self) -> Option<Identifier> {
        None
    }

    /// Replace the parent reference
    ///
    /// Used when containers are copied between stores and their references
    /// need to be remapped. No-op for containers without a parent.
    fn set_parent_identifier(&mut self, _identifier: Identifier) {}

    /// Container type the parent reference must point at
    fn parent_container_type() -> Option<ContainerType> {
        Self::CONTAINER_TYPE.parent_container_type()
    }
}

/// Any persisted attribute container
#[derive(Debug, Clone, PartialEq)]
pub enum AttributeContainer {
    /// [`Event`]
    Event(Event),
    /// [`EventData`]
    EventData(EventData),
    /// [`EventDataStream`]
    EventDataStream(EventDataStream),
    /// [`EventSource`]
    EventSource(EventSource),
    /// [`EventTag`]
    EventTag(EventTag),
    /// [`SessionStart`]
    SessionStart(SessionStart),
    /// [`SessionCompletion`]
    SessionCompletion(SessionCompletion),
    /// [`SessionConfiguration`]
    SessionConfiguration(SessionConfiguration),
    /// [`SystemConfiguration`]
    SystemConfiguration(SystemConfiguration),
    /// [`TaskStart`]
    TaskStart(TaskStart),
    /// [`TaskCompletion`]
    TaskCompletion(TaskCompletion),
}

/// Apply an expression to the concrete container inside an
/// [`AttributeContainer`], whatever its variant.
#[macro_export]
macro_rules! with_container {
    ($container:expr, $inner:ident => $body:expr) => {
        match $container {
            $crate::AttributeContainer::Event($inner) => $body,
            $crate::AttributeContainer::EventData($inner) => $body,
            $crate::AttributeContainer::EventDataStream($inner) => $body,
            $crate::AttributeContainer::EventSource($inner) => $body,
            $crate::AttributeContainer::EventTag($inner) => $body,
            $crate::AttributeContainer::SessionStart($inner) => $body,
            $crate::AttributeContainer::SessionCompletion($inner) => $body,
            $crate::AttributeContainer::SessionConfiguration($inner) => $body,
            $crate::AttributeContainer::SystemConfiguration($inner) => $body,
            $crate::AttributeContainer::TaskStart($inner) => $body,
            $crate::AttributeContainer::TaskCompletion($inner) => $body,
        }
    };
}

impl AttributeContainer {
    /// Type tag of the wrapped container
    pub fn container_type(&self) -> ContainerType {
        fn tag<C: Container>(_: &C) -> ContainerType {
            C::CONTAINER_TYPE
        }
        with_container!(self, c => tag(c))
    }

    /// Identifier assigned by the store
    pub fn identifier(&self) -> Option<Identifier> {
        with_container!(self, c => c.identifier())
    }

    /// Back-fill the store-assigned identifier
    pub fn set_identifier(&mut self, identifier: Identifier) {
        with_container!(self, c => c.set_identifier(identifier))
    }

    /// Identifier of the container this one depends on
    pub fn parent_identifier(&self) -> Option<Identifier> {
        with_container!(self, c => c.parent_identifier())
    }

    /// Replace the parent reference
    pub fn set_parent_identifier(&mut self, identifier: Identifier) {
        with_container!(self, c => c.set_parent_identifier(identifier))
    }

    /// Verify the parent reference against a lookup of existing containers
    ///
    /// Fails with `UnresolvedReference` when the reference points at the
    /// wrong container type or `exists` does not find it. Containers without
    /// a parent reference always pass.
    pub fn check_parent_reference(
        &self,
        exists: impl FnOnce(&Identifier) -> Result<bool, Error>,
    ) -> Result<(), Error> {
        let Some(reference) = self.parent_identifier() else {
            return Ok(());
        };
        let container_type = self.container_type();
        let expected = container_type.parent_container_type();
        if expected != Some(reference.container_type)
            || reference.sequence_number == 0
            || !exists(&reference)?
        {
            return Err(Error::UnresolvedReference {
                container_type,
                reference,
            });
        }
        Ok(())
    }

    /// Key of a record that may be written only once per session or task
    ///
    /// Returns the session identifier for session records and the task
    /// identifier for task records, `None` for everything else.
    pub fn record_key(&self) -> Option<&str> {
        match self {
            AttributeContainer::SessionStart(c) => Some(&c.session_identifier),
            AttributeContainer::SessionCompletion(c) => Some(&c.session_identifier),
            AttributeContainer::SessionConfiguration(c) => Some(&c.session_identifier),
            AttributeContainer::TaskStart(c) => Some(&c.task_identifier),
            AttributeContainer::TaskCompletion(c) => Some(&c.task_identifier),
            _ => None,
        }
    }

    /// Event timestamp, for event containers
    pub fn timestamp(&self) -> Option<i64> {
        match self {
            AttributeContainer::Event(e) => Some(e.timestamp),
            _ => None,
        }
    }

    /// Unwrap into a concrete container type
    pub fn downcast<C>(self) -> Result<C, Error>
    where
        C: TryFrom<AttributeContainer, Error = Error>,
    {
        C::try_from(self)
    }
}

/// Implements `From<C> for AttributeContainer` and the reverse `TryFrom`.
macro_rules! container_conversions {
    ($($variant:ident),* $(,)?) => {
        $(
            impl From<$variant> for AttributeContainer {
                fn from(container: $variant) -> Self {
                    AttributeContainer::$variant(container)
                }
            }

            impl TryFrom<AttributeContainer> for $variant {
                type Error = Error;

                fn try_from(container: AttributeContainer) -> Result<Self, Error> {
                    match container {
                        AttributeContainer::$variant(inner) => Ok(inner),
                        other => Err(Error::UnsupportedContainerType {
                            container_type: other.container_type(),
                            backend: "conversion",
                        }),
                    }
                }
            }
        )*
    };
}

container_conversions!(
    Event,
    EventData,
    EventDataStream,
    EventSource,
    EventTag,
    SessionStart,
    SessionCompletion,
    SessionConfiguration,
    SystemConfiguration,
    TaskStart,
    TaskCompletion,
);
