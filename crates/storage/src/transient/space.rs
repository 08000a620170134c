//! Shared in-memory segment space
//!
//! # Design
//!
//! - One segment per task identifier, created by the task's writer
//! - `Arc<RwLock<FxHashMap>>` for the segment map; the map lock is only held
//!   to look up, insert or remove a segment
//! - Each segment has its own `RwLock`, so tasks never contend with each other
//! - Segments outlive the store handles that wrote them until removed

use crate::format::StorageMetadata;
use chronicle_core::ContainerType;
use parking_lot::RwLock;
use rustc_hash::FxHashMap;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::debug;

/// Segment shared between a space and its store handles
pub(crate) type SharedSegment = Arc<RwLock<Segment>>;

/// One stored container body
#[derive(Debug, Clone)]
pub(crate) struct SegmentRow {
    /// Serialized body
    pub data: Vec<u8>,
    /// Event timestamp, for event rows
    pub timestamp: Option<i64>,
    /// Sequence number of the tagged event, for event tag rows
    pub event_sequence_number: Option<u64>,
}

/// Rows of one task, per container type
#[derive(Debug, Default)]
pub(crate) struct Segment {
    pub metadata: BTreeMap<String, String>,
    tables: FxHashMap<ContainerType, Vec<SegmentRow>>,
}

impl Segment {
    fn new(metadata: &StorageMetadata) -> Self {
        Segment {
            metadata: metadata
                .to_values()
                .into_iter()
                .map(|(key, value)| (key.to_string(), value))
                .collect(),
            tables: FxHashMap::default(),
        }
    }

    /// Rows of a type, empty when none were written
    pub fn rows(&self, container_type: ContainerType) -> &[SegmentRow] {
        self.tables
            .get(&container_type)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Row at a zero-based index
    pub fn row(&self, container_type: ContainerType, index: u64) -> Option<&SegmentRow> {
        let index = usize::try_from(index).ok()?;
        self.rows(container_type).get(index)
    }

    /// Append a row, returning its sequence number
    pub fn push(&mut self, container_type: ContainerType, row: SegmentRow) -> u64 {
        let rows = self.tables.entry(container_type).or_default();
        rows.push(row);
        rows.len() as u64
    }

    /// Replace the row at a zero-based index, returning whether it existed
    pub fn replace(&mut self, container_type: ContainerType, index: u64, row: SegmentRow) -> bool {
        let slot = usize::try_from(index)
            .ok()
            .and_then(|index| self.tables.get_mut(&container_type)?.get_mut(index));
        match slot {
            Some(slot) => {
                *slot = row;
                true
            }
            None => false,
        }
    }
}

/// In-memory space holding the segments of concurrently running tasks
///
/// Cloning is cheap and every clone refers to the same segments, so one
/// space can be handed to worker threads and to the task merger.
#[derive(Debug, Clone, Default)]
pub struct TransientSpace {
    segments: Arc<RwLock<FxHashMap<String, SharedSegment>>>,
}

impl TransientSpace {
    /// Create an empty space
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn segment(&self, task_identifier: &str) -> Option<SharedSegment> {
        self.segments.read().get(task_identifier).cloned()
    }

    /// Get the segment of a task, creating it with `metadata` if missing
    pub(crate) fn create_segment(
        &self,
        task_identifier: &str,
        metadata: &StorageMetadata,
    ) -> SharedSegment {
        let mut segments = self.segments.write();
        segments
            .entry(task_identifier.to_string())
            .or_insert_with(|| {
                debug!(task_identifier, "created transient segment");
                Arc::new(RwLock::new(Segment::new(metadata)))
            })
            .clone()
    }

    /// Discard the segment of a task
    ///
    /// Open store handles keep their rows alive until they are closed.
    /// Returns whether a segment was removed.
    pub fn remove_segment(&self, task_identifier: &str) -> bool {
        let removed = self.segments.write().remove(task_identifier).is_some();
        if removed {
            debug!(task_identifier, "removed transient segment");
        }
        removed
    }

    /// Number of segments
    pub fn len(&self) -> usize {
        self.segments.read().len()
    }

    /// Whether the space holds no segments
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
