//! Task attribute containers
//!
//! A [`Task`] is one unit of parallel work inside a session. Its records,
//! [`TaskStart`] and [`TaskCompletion`], are written to the task's own store
//! and folded into the session store on merge.

use super::{container_identifier, Container};
use crate::identifier::{ContainerType, Identifier};
use crate::timeline::now_micros;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One unit of parallel work
#[derive(Debug, Clone, PartialEq)]
pub struct Task {
    /// Unique task identifier (UUID v4, hex)
    pub identifier: String,
    /// Identifier of the parent session
    pub session_identifier: String,
    /// Start time in microseconds since epoch
    pub start_time: i64,
    /// Completion time in microseconds since epoch
    pub completion_time: Option<i64>,
    /// Whether the task was aborted
    pub aborted: bool,
    /// Path specification of the source the task processes
    pub path_spec: Option<String>,
    /// Merge priority, lower merges first when set
    pub merge_priority: Option<u32>,
    /// Size of the task storage in bytes
    pub storage_file_size: Option<u64>,
    /// Last time the task reported progress
    pub last_processing_time: Option<i64>,
    /// Identifier of the task this one retries
    pub original_task_identifier: Option<String>,
}

impl Task {
    /// Start a new task for a session now
    pub fn new(session_identifier: impl Into<String>) -> Self {
        Task {
            identifier: Uuid::new_v4().simple().to_string(),
            session_identifier: session_identifier.into(),
            start_time: now_micros(),
            completion_time: None,
            aborted: false,
            path_spec: None,
            merge_priority: None,
            storage_file_size: None,
            last_processing_time: None,
            original_task_identifier: None,
        }
    }

    /// Mark the task as completed now
    pub fn complete(&mut self, aborted: bool) {
        self.completion_time = Some(now_micros());
        self.aborted = aborted;
    }

    /// Record that the task made progress now
    pub fn update_processing_time(&mut self) {
        self.last_processing_time = Some(now_micros());
    }

    /// Create a new task that retries this one
    pub fn create_retry_task(&self) -> Task {
        Task {
            path_spec: self.path_spec.clone(),
            original_task_identifier: Some(self.identifier.clone()),
            ..Task::new(self.session_identifier.clone())
        }
    }

    /// Create the start record
    pub fn create_task_start(&self) -> TaskStart {
        TaskStart {
            task_identifier: self.identifier.clone(),
            session_identifier: self.session_identifier.clone(),
            timestamp: self.start_time,
            identifier: None,
        }
    }

    /// Create the completion record
    ///
    /// Uses the current time if the task was not marked completed.
    pub fn create_task_completion(&self) -> TaskCompletion {
        TaskCompletion {
            task_identifier: self.identifier.clone(),
            session_identifier: self.session_identifier.clone(),
            timestamp: self.completion_time.unwrap_or_else(now_micros),
            aborted: self.aborted,
            identifier: None,
        }
    }
}

/// Start of a task
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TaskStart {
    /// Identifier of the task
    pub task_identifier: String,
    /// Identifier of the parent session
    pub session_identifier: String,
    /// Start time in microseconds since epoch
    pub timestamp: i64,
    #[serde(skip)]
    identifier: Option<Identifier>,
}

impl Container for TaskStart {
    const CONTAINER_TYPE: ContainerType = ContainerType::TaskStart;

    container_identifier!();
}

/// Completion of a task
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TaskCompletion {
    /// Identifier of the task
    pub task_identifier: String,
    /// Identifier of the parent session
    pub session_identifier: String,
    /// Completion time in microseconds since epoch
    pub timestamp: i64,
    /// Whether the task was aborted
    pub aborted: bool,
    #[serde(skip)]
    identifier: Option<Identifier>,
}

impl Container for TaskCompletion {
    const CONTAINER_TYPE: ContainerType = ContainerType::TaskCompletion;

    container_identifier!();
}
