//! Storage metadata and format compatibility.
//!
//! Every store records a small metadata table describing how its rows were
//! written. On open the metadata is checked against what this build can read
//! and append to (the format/version gate) before any container is touched.
//!
//! # Module Structure
//!
//! - `metadata`: metadata record, format policy and the version gate

pub mod metadata;

pub use metadata::{
    check_storage_metadata, FormatPolicy, StorageMetadata, APPEND_COMPATIBLE_FORMAT_VERSION,
    FORMAT_VERSION, READ_COMPATIBLE_FORMAT_VERSION,
};

use serde::{Deserialize, Serialize};
use std::fmt;

/// Compression applied to serialized container bodies
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CompressionFormat {
    /// Bodies stored as serialized
    None,
    /// Zlib (deflate) compression
    #[default]
    Zlib,
    /// Zstandard compression
    Zstd,
}

impl CompressionFormat {
    /// All compression formats
    pub const ALL: [CompressionFormat; 3] = [
        CompressionFormat::None,
        CompressionFormat::Zlib,
        CompressionFormat::Zstd,
    ];

    /// Name recorded in the metadata table
    pub const fn name(&self) -> &'static str {
        match self {
            CompressionFormat::None => "none",
            CompressionFormat::Zlib => "zlib",
            CompressionFormat::Zstd => "zstd",
        }
    }

    /// Parse from the metadata name
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|f| f.name() == name)
    }
}

/// Serialization of container bodies
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SerializationFormat {
    /// JSON objects
    #[default]
    Json,
    /// MessagePack maps with named fields
    #[serde(rename = "msgpack")]
    MessagePack,
}

impl SerializationFormat {
    /// All serialization formats
    pub const ALL: [SerializationFormat; 2] =
        [SerializationFormat::Json, SerializationFormat::MessagePack];

    /// Name recorded in the metadata table
    pub const fn name(&self) -> &'static str {
        match self {
            SerializationFormat::Json => "json",
            SerializationFormat::MessagePack => "msgpack",
        }
    }

    /// Parse from the metadata name
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|f| f.name() == name)
    }
}

/// Role of a store within a processing run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageType {
    /// Authoritative store of a whole session
    #[default]
    Session,
    /// Store of a single task, merged into the session store later
    Task,
}

impl StorageType {
    /// All storage types
    pub const ALL: [StorageType; 2] = [StorageType::Session, StorageType::Task];

    /// Name recorded in the metadata table
    pub const fn name(&self) -> &'static str {
        match self {
            StorageType::Session => "session",
            StorageType::Task => "task",
        }
    }

    /// Parse from the metadata name
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|t| t.name() == name)
    }
}

macro_rules! display_by_name {
    ($($ty:ty),*) => {
        $(
            impl fmt::Display for $ty {
                fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                    f.write_str(self.name())
                }
            }
        )*
    };
}

display_by_name!(CompressionFormat, SerializationFormat, StorageType);
