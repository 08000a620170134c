//! Container types and identifiers
//!
//! An [`Identifier`] is the only valid way for one attribute container to
//! refer to another. Identifiers are assigned by a store when a container is
//! written and never change afterwards.
//!
//! ## Container Types
//!
//! | Type | Table name | Task-scoped |
//! |------|------------|-------------|
//! | Event | `event` | yes |
//! | EventData | `event_data` | yes |
//! | EventDataStream | `event_data_stream` | yes |
//! | EventSource | `event_source` | yes |
//! | EventTag | `event_tag` | yes |
//! | SessionStart | `session_start` | no |
//! | SessionCompletion | `session_completion` | no |
//! | SessionConfiguration | `session_configuration` | no |
//! | SystemConfiguration | `system_configuration` | no |
//! | TaskStart | `task_start` | yes |
//! | TaskCompletion | `task_completion` | yes |

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Kind of a persisted attribute container
///
/// The name returned by [`ContainerType::name`] doubles as the table name in
/// the durable store, so it MUST stay stable across releases.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContainerType {
    /// A single timestamped occurrence
    Event,
    /// Parsed fields of one record
    EventData,
    /// Metadata about the source of raw data
    EventDataStream,
    /// A discovered source that still needs to be processed
    EventSource,
    /// Labels attached to an event
    EventTag,
    /// Start of a processing session
    SessionStart,
    /// Completion of a processing session
    SessionCompletion,
    /// Configuration of a processing session
    SessionConfiguration,
    /// Preprocessing information about the analyzed system
    SystemConfiguration,
    /// Start of a task
    TaskStart,
    /// Completion of a task
    TaskCompletion,
}

impl ContainerType {
    /// All container types (for iteration)
    pub const ALL: [ContainerType; 11] = [
        ContainerType::Event,
        ContainerType::EventData,
        ContainerType::EventDataStream,
        ContainerType::EventSource,
        ContainerType::EventTag,
        ContainerType::SessionStart,
        ContainerType::SessionCompletion,
        ContainerType::SessionConfiguration,
        ContainerType::SystemConfiguration,
        ContainerType::TaskStart,
        ContainerType::TaskCompletion,
    ];

    /// Get all container types as a slice
    pub fn all() -> &'static [ContainerType] {
        &Self::ALL
    }

    /// Stable name, also used as table name
    pub const fn name(&self) -> &'static str {
        match self {
            ContainerType::Event => "event",
            ContainerType::EventData => "event_data",
            ContainerType::EventDataStream => "event_data_stream",
            ContainerType::EventSource => "event_source",
            ContainerType::EventTag => "event_tag",
            ContainerType::SessionStart => "session_start",
            ContainerType::SessionCompletion => "session_completion",
            ContainerType::SessionConfiguration => "session_configuration",
            ContainerType::SystemConfiguration => "system_configuration",
            ContainerType::TaskStart => "task_start",
            ContainerType::TaskCompletion => "task_completion",
        }
    }

    /// Parse from the stable name
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|t| t.name() == name)
    }

    /// Whether containers of this type are produced by a single task
    ///
    /// Only task-scoped types can be written to a transient store.
    pub const fn is_task_scoped(&self) -> bool {
        matches!(
            self,
            ContainerType::Event
                | ContainerType::EventData
                | ContainerType::EventDataStream
                | ContainerType::EventSource
                | ContainerType::EventTag
                | ContainerType::TaskStart
                | ContainerType::TaskCompletion
        )
    }

    /// Container type a parent reference of this type must point at
    pub const fn parent_container_type(&self) -> Option<ContainerType> {
        match self {
            ContainerType::Event => Some(ContainerType::EventData),
            ContainerType::EventData => Some(ContainerType::EventDataStream),
            ContainerType::EventTag => Some(ContainerType::Event),
            _ => None,
        }
    }
}

impl fmt::Display for ContainerType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ContainerType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::from_name(s).ok_or_else(|| Error::UnknownContainerType(s.to_string()))
    }
}

/// Reference to one container instance within one store
///
/// Sequence numbers start at 1 and are assigned per container type. The
/// optional sub-sequence number addresses a streamed sub-record of the
/// container.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Identifier {
    /// Type of the referenced container
    pub container_type: ContainerType,
    /// Store-assigned sequence number (1-based)
    pub sequence_number: u64,
    /// Index of a streamed sub-record, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sub_sequence_number: Option<u64>,
}

impl Identifier {
    /// Create an identifier for a whole container
    pub const fn new(container_type: ContainerType, sequence_number: u64) -> Self {
        Identifier {
            container_type,
            sequence_number,
            sub_sequence_number: None,
        }
    }

    /// Identifier addressing a streamed sub-record of this container
    pub const fn with_sub_sequence(self, sub_sequence_number: u64) -> Self {
        Identifier {
            sub_sequence_number: Some(sub_sequence_number),
            ..self
        }
    }

    /// Zero-based row index corresponding to the sequence number
    ///
    /// Returns `None` for the invalid sequence number 0.
    pub fn index(&self) -> Option<u64> {
        self.sequence_number.checked_sub(1)
    }

    /// Identifier of the container stored at a zero-based index
    pub const fn from_index(container_type: ContainerType, index: u64) -> Self {
        Identifier::new(container_type, index + 1)
    }
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.container_type, self.sequence_number)?;
        if let Some(sub) = self.sub_sequence_number {
            write!(f, ".{}", sub)?;
        }
        Ok(())
    }
}

impl FromStr for Identifier {
    type Err = Error;

    /// Parse `"<type>.<seq>"` or `"<type>.<seq>.<sub>"`
    fn from_str(s: &str) -> Result<Self> {
        let invalid = || Error::Serialization(format!("invalid identifier string: {:?}", s));

        let mut parts = s.split('.');
        let container_type: ContainerType = parts.next().ok_or_else(invalid)?.parse()?;
        let sequence_number = parts
            .next()
            .and_then(|p| p.parse::<u64>().ok())
            .ok_or_else(invalid)?;
        let sub_sequence_number = match parts.next() {
            Some(p) => Some(p.parse::<u64>().map_err(|_| invalid())?),
            None => None,
        };
        if parts.next().is_some() {
            return Err(invalid());
        }

        Ok(Identifier {
            container_type,
            sequence_number,
            sub_sequence_number,
        })
    }
}
