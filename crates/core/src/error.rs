//! Error types for the attribute container store
//!
//! This module defines all error types used throughout the system.
//! We use `thiserror` for automatic `Display` and `Error` trait implementations.
//!
//! Count and enumeration APIs do not raise for a recognized container type
//! whose table is absent; they return zero or nothing. Every other failure is
//! surfaced as one of the variants below.

use crate::identifier::{ContainerType, Identifier};
use std::io;
use thiserror::Error;

/// Result type alias for store operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for the attribute container store
#[derive(Debug, Error)]
pub enum Error {
    /// Store or writer opened twice
    #[error("Store already opened")]
    AlreadyOpen,

    /// Operation on a store or writer that was never opened
    #[error("Store not opened")]
    NotOpen,

    /// Operation on a store or writer after close
    #[error("Store is closed")]
    Closed,

    /// Write attempted on a store opened read-only
    #[error("Store is opened read-only")]
    ReadOnly,

    /// Container type name not recognized by this build
    #[error("Unknown container type: {0}")]
    UnknownContainerType(String),

    /// Container type recognized but not held by this backend
    #[error("Container type {container_type} not supported by the {backend} store")]
    UnsupportedContainerType {
        /// Rejected container type
        container_type: ContainerType,
        /// Backend name
        backend: &'static str,
    },

    /// Format version, compression, serialization or storage type mismatch
    #[error("Incompatible storage format: {0}")]
    IncompatibleFormat(String),

    /// Container refers to an identifier not present in this store
    #[error("Unresolved reference from {container_type} to {reference}")]
    UnresolvedReference {
        /// Type of the container holding the reference
        container_type: ContainerType,
        /// Identifier that did not resolve
        reference: Identifier,
    },

    /// Update of a container that was never written to this store
    #[error("Unknown identifier: {0}")]
    UnknownIdentifier(Identifier),

    /// Container passed to update has no identifier at all
    #[error("Container of type {0} has no identifier")]
    MissingIdentifier(ContainerType),

    /// Operation refused by this backend
    #[error("{operation} is not supported by the {backend} store")]
    BackendUnsupportedOperation {
        /// Refused operation
        operation: &'static str,
        /// Backend name
        backend: &'static str,
    },

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Attempt to create a table that already exists
    #[error("Table for container type {0} already exists")]
    TableExists(ContainerType),

    /// Single-row record written twice
    #[error("{container_type} for {identifier} already written")]
    DuplicateWrite {
        /// Record kind
        container_type: ContainerType,
        /// Session or task identifier
        identifier: String,
    },

    /// Session record on a task store or task record on a session store
    #[error("{container_type} cannot be written to a {storage_type} store")]
    StorageTypeMismatch {
        /// Record kind
        container_type: ContainerType,
        /// Storage type of the store
        storage_type: &'static str,
    },

    /// Event tag label with unsupported characters
    #[error("Invalid event tag label: {0:?}")]
    InvalidLabel(String),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    Config(String),

    /// I/O error (file operations)
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Storage backend error
    #[error("Backend error: {0}")]
    Backend(String),
}

impl Error {
    /// Shorthand for an `IncompatibleFormat` error
    pub fn incompatible(message: impl Into<String>) -> Self {
        Error::IncompatibleFormat(message.into())
    }

    /// Shorthand for a `Backend` error from any displayable source
    pub fn backend(err: impl std::fmt::Display) -> Self {
        Error::Backend(err.to_string())
    }

    /// Shorthand for a `Serialization` error from any displayable source
    pub fn serialization(err: impl std::fmt::Display) -> Self {
        Error::Serialization(err.to_string())
    }

    /// Whether the error means the store or writer is not usable
    pub fn is_lifecycle(&self) -> bool {
        matches!(self, Error::NotOpen | Error::Closed | Error::AlreadyOpen)
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Serialization(e.to_string())
    }
}
