//! Session attribute containers
//!
//! A [`Session`] is the in-memory record of one top-level processing run. It
//! is persisted as up to three single-row containers, each keyed by the
//! session identifier:
//!
//! - [`SessionStart`] when the run begins
//! - [`SessionConfiguration`] once options are known
//! - [`SessionCompletion`] when the run ends
//!
//! [`SystemConfiguration`] carries preprocessing information about the
//! analyzed system and is written alongside the session records.

use super::{container_identifier, Container};
use crate::identifier::{ContainerType, Identifier};
use crate::timeline::now_micros;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Default preferred encoding for new sessions
pub const DEFAULT_PREFERRED_ENCODING: &str = "utf-8";

/// Default preferred time zone for new sessions
pub const DEFAULT_PREFERRED_TIME_ZONE: &str = "UTC";

/// One top-level processing run
#[derive(Debug, Clone, PartialEq)]
pub struct Session {
    /// Unique session identifier (UUID v4, hex)
    pub identifier: String,
    /// Start time in microseconds since epoch
    pub start_time: i64,
    /// Completion time in microseconds since epoch
    pub completion_time: Option<i64>,
    /// Whether the session was aborted
    pub aborted: bool,
    /// Name of the product that created the session
    pub product_name: String,
    /// Version of the product that created the session
    pub product_version: String,
    /// Command line used to start the session
    pub command_line: Option<String>,
    /// Whether debug mode was enabled
    pub debug_mode: bool,
    /// Preferred encoding of text sources
    pub preferred_encoding: String,
    /// Year assumed for timestamps without one
    pub preferred_year: Option<i32>,
    /// Time zone assumed for timestamps without one
    pub preferred_time_zone: String,
    /// Parser filter expression
    pub parser_filter_expression: Option<String>,
    /// Names of the artifact filters
    pub artifact_filters: Vec<String>,
    /// Names of the enabled parsers
    pub enabled_parser_names: Vec<String>,
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

impl Session {
    /// Start a new session now
    pub fn new() -> Self {
        Session {
            identifier: Uuid::new_v4().simple().to_string(),
            start_time: now_micros(),
            completion_time: None,
            aborted: false,
            product_name: env!("CARGO_PKG_NAME").to_string(),
            product_version: env!("CARGO_PKG_VERSION").to_string(),
            command_line: None,
            debug_mode: false,
            preferred_encoding: DEFAULT_PREFERRED_ENCODING.to_string(),
            preferred_year: None,
            preferred_time_zone: DEFAULT_PREFERRED_TIME_ZONE.to_string(),
            parser_filter_expression: None,
            artifact_filters: Vec::new(),
            enabled_parser_names: Vec::new(),
        }
    }

    /// Mark the session as completed now
    pub fn complete(&mut self, aborted: bool) {
        self.completion_time = Some(now_micros());
        self.aborted = aborted;
    }

    /// Create the start record
    pub fn create_session_start(&self) -> SessionStart {
        SessionStart {
            session_identifier: self.identifier.clone(),
            timestamp: self.start_time,
            product_name: self.product_name.clone(),
            product_version: self.product_version.clone(),
            identifier: None,
        }
    }

    /// Create the completion record
    ///
    /// Uses the current time if the session was not marked completed.
    pub fn create_session_completion(&self) -> SessionCompletion {
        SessionCompletion {
            session_identifier: self.identifier.clone(),
            timestamp: self.completion_time.unwrap_or_else(now_micros),
            aborted: self.aborted,
            identifier: None,
        }
    }

    /// Create the configuration record
    pub fn create_session_configuration(&self) -> SessionConfiguration {
        SessionConfiguration {
            session_identifier: self.identifier.clone(),
            command_line: self.command_line.clone(),
            debug_mode: self.debug_mode,
            preferred_encoding: self.preferred_encoding.clone(),
            preferred_year: self.preferred_year,
            preferred_time_zone: self.preferred_time_zone.clone(),
            parser_filter_expression: self.parser_filter_expression.clone(),
            artifact_filters: self.artifact_filters.clone(),
            enabled_parser_names: self.enabled_parser_names.clone(),
            identifier: None,
        }
    }

    /// Rebuild a session from its start record
    pub fn from_session_start(start: &SessionStart) -> Self {
        Session {
            identifier: start.session_identifier.clone(),
            start_time: start.timestamp,
            product_name: start.product_name.clone(),
            product_version: start.product_version.clone(),
            ..Session::new()
        }
    }

    /// Copy values from a completion record
    pub fn copy_from_session_completion(&mut self, completion: &SessionCompletion) {
        self.completion_time = Some(completion.timestamp);
        self.aborted = completion.aborted;
    }

    /// Copy values from a configuration record
    pub fn copy_from_session_configuration(&mut self, configuration: &SessionConfiguration) {
        self.command_line = configuration.command_line.clone();
        self.debug_mode = configuration.debug_mode;
        self.preferred_encoding = configuration.preferred_encoding.clone();
        self.preferred_year = configuration.preferred_year;
        self.preferred_time_zone = configuration.preferred_time_zone.clone();
        self.parser_filter_expression = configuration.parser_filter_expression.clone();
        self.artifact_filters = configuration.artifact_filters.clone();
        self.enabled_parser_names = configuration.enabled_parser_names.clone();
    }
}

/// Start of a processing session
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionStart {
    /// Identifier of the session
    pub session_identifier: String,
    /// Start time in microseconds since epoch
    pub timestamp: i64,
    /// Name of the product that created the session
    pub product_name: String,
    /// Version of the product that created the session
    pub product_version: String,
    #[serde(skip)]
    identifier: Option<Identifier>,
}

impl Container for SessionStart {
    const CONTAINER_TYPE: ContainerType = ContainerType::SessionStart;

    container_identifier!();
}

/// Completion of a processing session
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionCompletion {
    /// Identifier of the session
    pub session_identifier: String,
    /// Completion time in microseconds since epoch
    pub timestamp: i64,
    /// Whether the session was aborted
    pub aborted: bool,
    #[serde(skip)]
    identifier: Option<Identifier>,
}

impl Container for SessionCompletion {
    const CONTAINER_TYPE: ContainerType = ContainerType::SessionCompletion;

    container_identifier!();
}

/// Configuration of a processing session
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionConfiguration {
    /// Identifier of the session
    pub session_identifier: String,
    /// Command line used to start the session
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub command_line: Option<String>,
    /// Whether debug mode was enabled
    #[serde(default)]
    pub debug_mode: bool,
    /// Preferred encoding of text sources
    pub preferred_encoding: String,
    /// Year assumed for timestamps without one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preferred_year: Option<i32>,
    /// Time zone assumed for timestamps without one
    pub preferred_time_zone: String,
    /// Parser filter expression
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parser_filter_expression: Option<String>,
    /// Names of the artifact filters
    #[serde(default)]
    pub artifact_filters: Vec<String>,
    /// Names of the enabled parsers
    #[serde(default)]
    pub enabled_parser_names: Vec<String>,
    #[serde(skip)]
    identifier: Option<Identifier>,
}

impl Container for SessionConfiguration {
    const CONTAINER_TYPE: ContainerType = ContainerType::SessionConfiguration;

    container_identifier!();
}

/// Preprocessing information about the analyzed system
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SystemConfiguration {
    /// Host name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hostname: Option<String>,
    /// Operating system family
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub operating_system: Option<String>,
    /// Operating system product name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub operating_system_product: Option<String>,
    /// Operating system version
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub operating_system_version: Option<String>,
    /// Time zone of the system
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_zone: Option<String>,
    /// Code page of the system
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code_page: Option<String>,
    /// Number of user accounts found
    #[serde(default)]
    pub number_of_user_accounts: u32,
    #[serde(skip)]
    identifier: Option<Identifier>,
}

impl Container for SystemConfiguration {
    const CONTAINER_TYPE: ContainerType = ContainerType::SystemConfiguration;

    container_identifier!();
}
