//! Task merger
//!
//! Folds the transient segments of finished tasks into the session store.
//!
//! # Order
//!
//! Tasks are merged by ascending start time, ties by task identifier, so the
//! resulting session store does not depend on the order tasks finished or
//! were added. Within a task, containers are copied parents first:
//!
//! 1. EventSource
//! 2. EventDataStream
//! 3. EventData (refers to EventDataStream)
//! 4. Event (refers to EventData)
//! 5. EventTag (refers to Event)
//!
//! Every parent reference is rewritten to the identifier its parent received
//! in the session store. Task start/completion records stay in the segment.

use crate::config::StoreConfig;
use crate::traits::{ContainerStore, StoreState};
use crate::transient::{TransientSpace, TransientStore};
use chronicle_core::{ContainerType, Error, Identifier, Result, Task};
use rustc_hash::FxHashMap;
use std::collections::BTreeMap;
use tracing::{debug, info};

/// Container types copied from a task segment, parents first
pub const MERGE_ORDER: [ContainerType; 5] = [
    ContainerType::EventSource,
    ContainerType::EventDataStream,
    ContainerType::EventData,
    ContainerType::Event,
    ContainerType::EventTag,
];

/// Containers merged from one task
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergedTask {
    /// Identifier of the merged task
    pub task_identifier: String,
    /// Number of containers copied per type
    pub containers: BTreeMap<ContainerType, u64>,
}

/// Outcome of a merge
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MergeSummary {
    /// Merged tasks in merge order
    pub tasks: Vec<MergedTask>,
}

impl MergeSummary {
    /// Number of merged tasks
    pub fn number_of_tasks(&self) -> usize {
        self.tasks.len()
    }

    /// Containers of a type copied over all tasks
    pub fn number_of_containers(&self, container_type: ContainerType) -> u64 {
        self.tasks
            .iter()
            .filter_map(|task| task.containers.get(&container_type))
            .sum()
    }
}

/// Collects finished tasks and merges their segments
#[derive(Default)]
pub struct TaskMerger {
    tasks: Vec<(Task, Box<dyn ContainerStore>)>,
}

impl std::fmt::Debug for TaskMerger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list()
            .entries(self.tasks.iter().map(|(task, _)| &task.identifier))
            .finish()
    }
}

impl TaskMerger {
    /// Create an empty merger
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a task with the store holding its containers
    ///
    /// An unopened store is opened read-only when merged.
    pub fn add_task(&mut self, task: Task, segment: Box<dyn ContainerStore>) {
        self.tasks.push((task, segment));
    }

    /// Add a task whose containers are in a segment of `space`
    pub fn add_transient_task(&mut self, task: Task, space: &TransientSpace, config: StoreConfig) {
        let store = TransientStore::new(space.clone(), task.identifier.clone(), config);
        self.add_task(task, Box::new(store));
    }

    /// Number of pending tasks
    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    /// Whether no tasks are pending
    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// Merge all pending tasks into an open session store
    ///
    /// Stops at the first task that fails. Tasks merged before it stay in
    /// the session store, and so do the containers the failing task copied
    /// before the error. The caller decides whether to discard the session
    /// store or keep the partial merge.
    pub fn merge_into(mut self, target: &mut dyn ContainerStore) -> Result<MergeSummary> {
        target.state().ensure_open()?;
        self.tasks.sort_by(|(a, _), (b, _)| {
            a.start_time
                .cmp(&b.start_time)
                .then_with(|| a.identifier.cmp(&b.identifier))
        });

        let mut summary = MergeSummary::default();
        for (task, mut source) in self.tasks {
            if source.state() == StoreState::Unopened {
                source.open(true)?;
            }
            let copied = copy_task_containers(source.as_mut(), target);
            if source.state() == StoreState::Opened {
                source.close()?;
            }
            let containers = copied?;

            info!(
                task_identifier = %task.identifier,
                containers = containers.values().sum::<u64>(),
                "merged task"
            );
            summary.tasks.push(MergedTask {
                task_identifier: task.identifier,
                containers,
            });
        }
        Ok(summary)
    }
}

/// Copy the containers of one task, remapping parent references
fn copy_task_containers(
    source: &mut dyn ContainerStore,
    target: &mut dyn ContainerStore,
) -> Result<BTreeMap<ContainerType, u64>> {
    let mut remapped: FxHashMap<ContainerType, FxHashMap<u64, Identifier>> = FxHashMap::default();
    let mut counts = BTreeMap::new();

    for container_type in MERGE_ORDER {
        let mut copied = 0u64;
        for container in source.get_attribute_containers(container_type)? {
            let mut container = container?;
            let source_identifier = container
                .identifier()
                .ok_or(Error::MissingIdentifier(container_type))?;

            if let Some(reference) = container.parent_identifier() {
                let mapped = remapped
                    .get(&reference.container_type)
                    .and_then(|map| map.get(&reference.sequence_number))
                    .copied()
                    .ok_or(Error::UnresolvedReference {
                        container_type,
                        reference,
                    })?;
                container.set_parent_identifier(mapped);
            }

            let target_identifier = target.add_attribute_container(&mut container)?;
            remapped
                .entry(container_type)
                .or_default()
                .insert(source_identifier.sequence_number, target_identifier);
            copied += 1;
        }

        if copied > 0 {
            debug!(%container_type, copied, "copied task containers");
            counts.insert(container_type, copied);
        }
    }
    Ok(counts)
}
