//! Core types for Chronicle
//!
//! This crate defines the foundational types used throughout the system:
//! - ContainerType: Discriminates between attribute container kinds
//! - Identifier: Store-assigned reference to one container
//! - AttributeContainer: Closed set of persisted records (events, event data,
//!   event data streams, event sources, event tags, session and task records)
//! - Session / Task: In-memory lifecycle records producing session and task containers
//! - TimeRange: Inclusive timestamp filter for timeline reads
//! - Error: Error type hierarchy

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod containers;
pub mod error;
pub mod identifier;
pub mod timeline;

pub use containers::{
    AttributeContainer, Container, Event, EventData, EventDataStream, EventSource, EventTag,
    Session, SessionCompletion, SessionConfiguration, SessionStart, SystemConfiguration, Task,
    TaskCompletion, TaskStart,
};
pub use error::{Error, Result};
pub use identifier::{ContainerType, Identifier};
pub use timeline::{now_micros, TimeRange};
