//! Storage metadata record and the format/version gate
//!
//! # Metadata
//!
//! | Key | Value |
//! |-----|-------|
//! | `format_version` | decimal integer, increases with every release that changes the layout |
//! | `append_compatible_format_version` | oldest build version that may append to the store |
//! | `read_compatible_format_version` | oldest build version that may read the store |
//! | `compression_format` | `none`, `zlib` or `zstd` |
//! | `serialization_format` | `json` or `msgpack` |
//! | `storage_type` | `session` or `task` |
//!
//! # Gate
//!
//! [`check_storage_metadata`] runs these checks in order and stops at the
//! first failure:
//!
//! 1. `format_version` parses as an unsigned integer
//! 2. writable opens: `format_version` is within
//!    `[policy.append_compatible_format_version, policy.format_version]`
//! 3. read-only opens: `format_version >= policy.read_compatible_format_version`,
//!    and a store from a newer build must declare it readable by this one
//! 4. compression, serialization and storage type are present and known

use super::{CompressionFormat, SerializationFormat, StorageType};
use chronicle_core::{Error, Result};
use std::collections::BTreeMap;
use tracing::warn;

/// Format version written by this build
pub const FORMAT_VERSION: u64 = 20230327;

/// Oldest format version this build can append to
pub const APPEND_COMPATIBLE_FORMAT_VERSION: u64 = 20230226;

/// Oldest format version this build can read
pub const READ_COMPATIBLE_FORMAT_VERSION: u64 = 20211121;

/// Format versions a build writes and accepts
///
/// The default is this build's constants; tests construct other policies to
/// act like older or newer builds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FormatPolicy {
    /// Version written to new stores
    pub format_version: u64,
    /// Minimum version that can be opened for writing
    pub append_compatible_format_version: u64,
    /// Minimum version that can be opened read-only
    pub read_compatible_format_version: u64,
}

impl Default for FormatPolicy {
    fn default() -> Self {
        FormatPolicy {
            format_version: FORMAT_VERSION,
            append_compatible_format_version: APPEND_COMPATIBLE_FORMAT_VERSION,
            read_compatible_format_version: READ_COMPATIBLE_FORMAT_VERSION,
        }
    }
}

impl FormatPolicy {
    /// Create a policy from explicit versions
    pub const fn new(
        format_version: u64,
        append_compatible_format_version: u64,
        read_compatible_format_version: u64,
    ) -> Self {
        FormatPolicy {
            format_version,
            append_compatible_format_version,
            read_compatible_format_version,
        }
    }

    /// Validate that `read <= append <= current`
    pub fn validate(&self) -> Result<()> {
        if self.read_compatible_format_version > self.append_compatible_format_version
            || self.append_compatible_format_version > self.format_version
        {
            return Err(Error::Config(format!(
                "format policy must satisfy read ({}) <= append ({}) <= current ({})",
                self.read_compatible_format_version,
                self.append_compatible_format_version,
                self.format_version
            )));
        }
        Ok(())
    }
}

/// Parsed metadata record of a store
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageMetadata {
    /// Format version the store was written with
    pub format_version: u64,
    /// Oldest build version that may append to the store
    pub append_compatible_format_version: Option<u64>,
    /// Oldest build version that may read the store
    pub read_compatible_format_version: Option<u64>,
    /// Compression of container bodies
    pub compression_format: CompressionFormat,
    /// Serialization of container bodies
    pub serialization_format: SerializationFormat,
    /// Role of the store
    pub storage_type: StorageType,
}

impl StorageMetadata {
    /// Metadata for a store created by a build with `policy`
    pub fn new(
        policy: &FormatPolicy,
        compression_format: CompressionFormat,
        serialization_format: SerializationFormat,
        storage_type: StorageType,
    ) -> Self {
        StorageMetadata {
            format_version: policy.format_version,
            append_compatible_format_version: Some(policy.append_compatible_format_version),
            read_compatible_format_version: Some(policy.read_compatible_format_version),
            compression_format,
            serialization_format,
            storage_type,
        }
    }

    /// Key/value pairs as stored in the metadata table
    pub fn to_values(&self) -> Vec<(&'static str, String)> {
        let mut values = vec![("format_version", self.format_version.to_string())];
        if let Some(version) = self.append_compatible_format_version {
            values.push(("append_compatible_format_version", version.to_string()));
        }
        if let Some(version) = self.read_compatible_format_version {
            values.push(("read_compatible_format_version", version.to_string()));
        }
        values.push(("compression_format", self.compression_format.name().to_string()));
        values.push((
            "serialization_format",
            self.serialization_format.name().to_string(),
        ));
        values.push(("storage_type", self.storage_type.name().to_string()));
        values
    }
}

/// Look up a required enum value in the metadata record
fn parse_required<T>(
    values: &BTreeMap<String, String>,
    key: &str,
    parse: impl Fn(&str) -> Option<T>,
) -> Result<T> {
    let value = values
        .get(key)
        .ok_or_else(|| Error::incompatible(format!("Missing {}", key)))?;
    parse(value).ok_or_else(|| Error::incompatible(format!("Unsupported {}: {}", key, value)))
}

/// Run the format/version gate on a store's metadata record
///
/// Returns the parsed metadata when the store may be opened with the given
/// access mode by a build with `policy`.
pub fn check_storage_metadata(
    values: &BTreeMap<String, String>,
    policy: &FormatPolicy,
    read_only: bool,
) -> Result<StorageMetadata> {
    let raw_version = values
        .get("format_version")
        .ok_or_else(|| Error::incompatible("Missing format version"))?;
    let format_version: u64 = raw_version
        .trim()
        .parse()
        .map_err(|_| Error::incompatible(format!("Invalid format version: {}", raw_version)))?;

    let append_compatible_format_version = values
        .get("append_compatible_format_version")
        .and_then(|v| v.trim().parse::<u64>().ok());
    let read_compatible_format_version = values
        .get("read_compatible_format_version")
        .and_then(|v| v.trim().parse::<u64>().ok());

    if !read_only {
        if format_version < policy.append_compatible_format_version {
            warn!(
                format_version,
                minimum = policy.append_compatible_format_version,
                "store too old to append to"
            );
            return Err(Error::incompatible(format!(
                "Format version: {} is too old and can no longer be written, minimum supported version: {}",
                format_version, policy.append_compatible_format_version
            )));
        }
        if format_version > policy.format_version {
            warn!(
                format_version,
                supported = policy.format_version,
                "store too new to append to"
            );
            return Err(Error::incompatible(format!(
                "Format version: {} is too new and can not be written, maximum supported version: {}",
                format_version, policy.format_version
            )));
        }
    } else {
        if format_version < policy.read_compatible_format_version {
            warn!(
                format_version,
                minimum = policy.read_compatible_format_version,
                "store too old to read"
            );
            return Err(Error::incompatible(format!(
                "Format version: {} is too old and can no longer be read, minimum supported version: {}",
                format_version, policy.read_compatible_format_version
            )));
        }
        if format_version > policy.format_version {
            if let Some(read_floor) = read_compatible_format_version {
                if read_floor > policy.format_version {
                    return Err(Error::incompatible(format!(
                        "Format version: {} requires a reader supporting version {} or later, this build supports: {}",
                        format_version, read_floor, policy.format_version
                    )));
                }
            }
        }
    }

    let compression_format =
        parse_required(values, "compression_format", CompressionFormat::from_name)?;
    let serialization_format =
        parse_required(values, "serialization_format", SerializationFormat::from_name)?;
    let storage_type = parse_required(values, "storage_type", StorageType::from_name)?;

    Ok(StorageMetadata {
        format_version,
        append_compatible_format_version,
        read_compatible_format_version,
        compression_format,
        serialization_format,
        storage_type,
    })
}
