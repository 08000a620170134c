//! Event-related attribute containers
//!
//! The dependency chain of a single log record is:
//!
//! ```text
//! EventDataStream  <-  EventData  <-  Event  <-  EventTag
//! ```
//!
//! Each arrow is an [`Identifier`] held by the dependent container.

use super::{container_identifier, Container};
use crate::error::{Error, Result};
use crate::identifier::{ContainerType, Identifier};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Metadata about the source of raw data (a file, a stream in a file, ...)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EventDataStream {
    /// Path specification of the data stream
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path_spec: Option<String>,
    /// MD5 hash of the data stream
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub md5_hash: Option<String>,
    /// SHA-1 hash of the data stream
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sha1_hash: Option<String>,
    /// SHA-256 hash of the data stream
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sha256_hash: Option<String>,
    /// Byte entropy of the data stream
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_entropy: Option<String>,
    /// Names of matching yara rules
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub yara_match: Vec<String>,
    #[serde(skip)]
    identifier: Option<Identifier>,
}

impl EventDataStream {
    /// Create an event data stream for a path specification
    pub fn new(path_spec: impl Into<String>) -> Self {
        EventDataStream {
            path_spec: Some(path_spec.into()),
            ..Default::default()
        }
    }
}

impl Container for EventDataStream {
    const CONTAINER_TYPE: ContainerType = ContainerType::EventDataStream;

    container_identifier!();
}

/// Parsed fields of one log record
///
/// Parser-specific attributes are kept as an ordered map of JSON values so
/// the store does not need to know individual parser schemas.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EventData {
    /// Data type indicator, e.g. `syslog:line`
    pub data_type: String,
    /// Parser chain that produced the data
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parser: Option<String>,
    /// Parser-specific attributes
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub attributes: BTreeMap<String, serde_json::Value>,
    /// Event data stream the data was extracted from
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub event_data_stream_identifier: Option<Identifier>,
    #[serde(skip)]
    identifier: Option<Identifier>,
}

impl EventData {
    /// Create event data of a data type
    pub fn new(data_type: impl Into<String>) -> Self {
        EventData {
            data_type: data_type.into(),
            ..Default::default()
        }
    }

    /// Set a parser-specific attribute
    pub fn set_attribute(&mut self, name: impl Into<String>, value: impl Into<serde_json::Value>) {
        self.attributes.insert(name.into(), value.into());
    }

    /// Get a parser-specific attribute
    pub fn attribute(&self, name: &str) -> Option<&serde_json::Value> {
        self.attributes.get(name)
    }

    /// Set the event data stream reference
    pub fn set_event_data_stream_identifier(&mut self, identifier: Identifier) {
        self.event_data_stream_identifier = Some(identifier);
    }
}

impl Container for EventData {
    const CONTAINER_TYPE: ContainerType = ContainerType::EventData;

    container_identifier!();

    fn parent_identifier(&self) -> Option<Identifier> {
        self.event_data_stream_identifier
    }

    fn set_parent_identifier(&mut self, identifier: Identifier) {
        self.event_data_stream_identifier = Some(identifier);
    }
}

/// A discovered source that needs processing
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EventSource {
    /// Data type indicator
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_type: Option<String>,
    /// Type of the file entry, e.g. `file` or `directory`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_entry_type: Option<String>,
    /// Path specification of the source
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path_spec: Option<String>,
    #[serde(skip)]
    identifier: Option<Identifier>,
}

impl EventSource {
    /// Create an event source for a path specification
    pub fn new(path_spec: impl Into<String>) -> Self {
        EventSource {
            path_spec: Some(path_spec.into()),
            ..Default::default()
        }
    }
}

impl Container for EventSource {
    const CONTAINER_TYPE: ContainerType = ContainerType::EventSource;

    container_identifier!();
}

/// A single timestamped occurrence
///
/// Timestamps are microseconds since 1970-01-01 00:00:00 UTC.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Event {
    /// Microseconds since epoch
    pub timestamp: i64,
    /// Meaning of the timestamp, e.g. `Creation Time`
    pub timestamp_desc: String,
    /// Event data describing this event
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub event_data_identifier: Option<Identifier>,
    #[serde(skip)]
    identifier: Option<Identifier>,
}

impl Event {
    /// Create an event
    pub fn new(timestamp: i64, timestamp_desc: impl Into<String>) -> Self {
        Event {
            timestamp,
            timestamp_desc: timestamp_desc.into(),
            ..Default::default()
        }
    }

    /// Set the event data reference
    pub fn set_event_data_identifier(&mut self, identifier: Identifier) {
        self.event_data_identifier = Some(identifier);
    }
}

impl Container for Event {
    const CONTAINER_TYPE: ContainerType = ContainerType::Event;

    container_identifier!();

    fn parent_identifier(&self) -> Option<Identifier> {
        self.event_data_identifier
    }

    fn set_parent_identifier(&mut self, identifier: Identifier) {
        self.event_data_identifier = Some(identifier);
    }
}

/// Labels attached to an event
///
/// Labels may only contain ASCII letters, digits and underscores.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EventTag {
    /// Labels in the order they were added
    #[serde(default)]
    pub labels: Vec<String>,
    /// Event this tag belongs to
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub event_identifier: Option<Identifier>,
    #[serde(skip)]
    identifier: Option<Identifier>,
}

impl EventTag {
    /// Create an empty tag for an event
    pub fn for_event(event_identifier: Identifier) -> Self {
        EventTag {
            event_identifier: Some(event_identifier),
            ..Default::default()
        }
    }

    /// Whether a label contains only supported characters
    pub fn is_valid_label(label: &str) -> bool {
        !label.is_empty()
            && label
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_')
    }

    /// Convert free text into a valid label
    ///
    /// Unsupported characters are replaced by underscores.
    pub fn copy_text_to_label(text: &str, prefix: &str) -> String {
        format!("{}{}", prefix, text)
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() || c == '_' {
                    c
                } else {
                    '_'
                }
            })
            .collect()
    }

    /// Add a label; adding an existing label is a no-op
    pub fn add_label(&mut self, label: &str) -> Result<()> {
        if !Self::is_valid_label(label) {
            return Err(Error::InvalidLabel(label.to_string()));
        }
        if !self.labels.iter().any(|l| l == label) {
            self.labels.push(label.to_string());
        }
        Ok(())
    }

    /// Add several labels
    ///
    /// Labels are validated up front, so on error no label is added.
    pub fn add_labels<S: AsRef<str>>(&mut self, labels: &[S]) -> Result<()> {
        if let Some(bad) = labels.iter().find(|l| !Self::is_valid_label(l.as_ref())) {
            return Err(Error::InvalidLabel(bad.as_ref().to_string()));
        }
        for label in labels {
            self.add_label(label.as_ref())?;
        }
        Ok(())
    }

    /// Set the event reference
    pub fn set_event_identifier(&mut self, identifier: Identifier) {
        self.event_identifier = Some(identifier);
    }
}

impl Container for EventTag {
    const CONTAINER_TYPE: ContainerType = ContainerType::EventTag;

    container_identifier!();

    fn parent_identifier(&self) -> Option<Identifier> {
        self.event_identifier
    }

    fn set_parent_identifier(&mut self, identifier: Identifier) {
        self.event_identifier = Some(identifier);
    }
}
