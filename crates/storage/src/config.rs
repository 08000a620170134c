//! Store configuration
//!
//! Controls how new stores are written (compression, serialization, storage
//! type) and how open stores behave (cache size, read batch size).
//! Existing stores always keep the formats recorded in their metadata.
//!
//! Configuration can be built in code or loaded from a TOML file:
//!
//! ```toml
//! # Compression of container bodies: "none", "zlib" (default) or "zstd"
//! compression_format = "zlib"
//!
//! # Serialization of container bodies: "json" (default) or "msgpack"
//! serialization_format = "json"
//!
//! # "session" (default) or "task"
//! storage_type = "session"
//!
//! # Cached containers per container type, 0 disables the cache
//! cache_size = 32768
//!
//! # Rows fetched per query by lazy container and timeline iterators
//! read_batch_size = 1024
//! ```

use crate::cache::DEFAULT_CACHE_SIZE;
use crate::format::{CompressionFormat, FormatPolicy, SerializationFormat, StorageType};
use chronicle_core::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Default number of rows fetched per query by lazy iterators
pub const DEFAULT_READ_BATCH_SIZE: usize = 1024;

/// Store configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StoreConfig {
    /// Compression of container bodies in new stores
    pub compression_format: CompressionFormat,
    /// Serialization of container bodies in new stores
    pub serialization_format: SerializationFormat,
    /// Role of the store
    pub storage_type: StorageType,
    /// Cached containers per container type
    pub cache_size: usize,
    /// Rows fetched per query by lazy iterators
    pub read_batch_size: usize,
    /// Format versions written and accepted
    #[serde(skip)]
    pub format_policy: FormatPolicy,
}

impl Default for StoreConfig {
    fn default() -> Self {
        StoreConfig {
            compression_format: CompressionFormat::default(),
            serialization_format: SerializationFormat::default(),
            storage_type: StorageType::default(),
            cache_size: DEFAULT_CACHE_SIZE,
            read_batch_size: DEFAULT_READ_BATCH_SIZE,
            format_policy: FormatPolicy::default(),
        }
    }
}

impl StoreConfig {
    /// Create config for a session store
    pub fn session() -> Self {
        StoreConfig::default()
    }

    /// Create config for a task store
    pub fn task() -> Self {
        StoreConfig {
            storage_type: StorageType::Task,
            ..Default::default()
        }
    }

    /// Create config for testing
    ///
    /// Uses a small cache and batch size so eviction and paging are
    /// exercised by small data sets.
    pub fn for_testing() -> Self {
        StoreConfig {
            cache_size: 8,
            read_batch_size: 3,
            ..Default::default()
        }
    }

    /// Set compression format
    pub fn with_compression(mut self, format: CompressionFormat) -> Self {
        self.compression_format = format;
        self
    }

    /// Set serialization format
    pub fn with_serialization(mut self, format: SerializationFormat) -> Self {
        self.serialization_format = format;
        self
    }

    /// Set storage type
    pub fn with_storage_type(mut self, storage_type: StorageType) -> Self {
        self.storage_type = storage_type;
        self
    }

    /// Set per-type cache size
    pub fn with_cache_size(mut self, cache_size: usize) -> Self {
        self.cache_size = cache_size;
        self
    }

    /// Set read batch size
    pub fn with_read_batch_size(mut self, read_batch_size: usize) -> Self {
        self.read_batch_size = read_batch_size;
        self
    }

    /// Set format policy
    pub fn with_format_policy(mut self, policy: FormatPolicy) -> Self {
        self.format_policy = policy;
        self
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.read_batch_size == 0 {
            return Err(Error::Config("read_batch_size must be at least 1".to_string()));
        }
        self.format_policy.validate()
    }

    /// Parse configuration from TOML text
    pub fn from_toml_str(text: &str) -> Result<Self> {
        let config: StoreConfig =
            toml::from_str(text).map_err(|e| Error::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a TOML file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path.as_ref())?;
        Self::from_toml_str(&text)
    }

    /// Render configuration as TOML text
    pub fn to_toml_string(&self) -> Result<String> {
        toml::to_string(self).map_err(|e| Error::Config(e.to_string()))
    }
}
