//! Storage layer for Chronicle
//!
//! This crate implements the attribute container stores:
//! - DurableStore: SQLite-backed authoritative session store
//! - TransientStore: in-memory per-task segments in a shared TransientSpace
//! - StorageWriter: lifecycle façade over either store
//! - TaskMerger: folds finished task segments into the session store
//! - ContainerCache: bounded per-type cache of materialized containers
//! - Format/version gate, codecs and container serialization
//!
//! # Row bodies
//!
//! Every container is serialized (JSON or MessagePack) and then compressed
//! (none, zlib or zstd). A store records both choices in its metadata and
//! keeps them for its lifetime.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod cache;
pub mod codec;
pub mod config;
pub mod durable;
pub mod format;
pub mod merge;
pub mod serializer;
pub mod traits;
pub mod transient;
pub mod writer;

pub use cache::{ContainerCache, DEFAULT_CACHE_SIZE};
pub use codec::{get_codec, CodecError, StorageCodec};
pub use config::{StoreConfig, DEFAULT_READ_BATCH_SIZE};
pub use durable::DurableStore;
pub use format::{
    check_storage_metadata, CompressionFormat, FormatPolicy, SerializationFormat, StorageMetadata,
    StorageType, APPEND_COMPATIBLE_FORMAT_VERSION, FORMAT_VERSION, READ_COMPATIBLE_FORMAT_VERSION,
};
pub use merge::{MergeSummary, MergedTask, TaskMerger, MERGE_ORDER};
pub use serializer::ContainerSerializer;
pub use traits::{ContainerIter, ContainerStore, EventIter, StoreState};
pub use transient::{TransientSpace, TransientStore};
pub use writer::{StorageWriter, WriterState};
