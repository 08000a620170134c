//! Container cache
//!
//! Bounded per-type cache of recently materialized containers, keyed by
//! zero-based row index. It saves deserialization when producers read back
//! containers they just wrote (e.g. resolving an event's event data).
//!
//! # Eviction
//!
//! Each container type has its own bound. When a type is full the entry that
//! was inserted longest ago is evicted; lookups do not refresh an entry.
//! Re-caching an index (after an update) replaces the entry and counts as a
//! new insertion.
//!
//! The cache is purely an optimization: a miss only means the store reads
//! the row from its backend.

use chronicle_core::{AttributeContainer, ContainerType};
use lru::LruCache;
use rustc_hash::FxHashMap;
use std::num::NonZeroUsize;
use tracing::trace;

/// Default number of cached containers per container type
pub const DEFAULT_CACHE_SIZE: usize = 32768;

/// Bounded `(ContainerType, index) -> AttributeContainer` cache
#[derive(Debug)]
pub struct ContainerCache {
    capacity: Option<NonZeroUsize>,
    caches: FxHashMap<ContainerType, LruCache<u64, AttributeContainer>>,
}

impl Default for ContainerCache {
    fn default() -> Self {
        Self::new(DEFAULT_CACHE_SIZE)
    }
}

impl ContainerCache {
    /// Create a cache holding at most `capacity` containers per type
    ///
    /// A capacity of 0 disables caching.
    pub fn new(capacity: usize) -> Self {
        ContainerCache {
            capacity: NonZeroUsize::new(capacity),
            caches: FxHashMap::default(),
        }
    }

    /// Per-type capacity
    pub fn capacity(&self) -> usize {
        self.capacity.map_or(0, NonZeroUsize::get)
    }

    /// Cache a container under its type and a zero-based index
    pub fn cache_container(&mut self, container: AttributeContainer, index: u64) {
        let Some(capacity) = self.capacity else {
            return;
        };
        let container_type = container.container_type();
        let cache = self
            .caches
            .entry(container_type)
            .or_insert_with(|| LruCache::new(capacity));

        if let Some((evicted, _)) = cache.push(index, container) {
            if evicted != index {
                trace!(%container_type, index = evicted, "evicted cached container");
            }
        }
    }

    /// Look up a cached container
    pub fn get_cached_container(
        &self,
        container_type: ContainerType,
        index: u64,
    ) -> Option<AttributeContainer> {
        self.caches
            .get(&container_type)
            .and_then(|cache| cache.peek(&index))
            .cloned()
    }

    /// Drop one cached container
    pub fn invalidate(&mut self, container_type: ContainerType, index: u64) {
        if let Some(cache) = self.caches.get_mut(&container_type) {
            cache.pop(&index);
        }
    }

    /// Drop all cached containers
    pub fn clear(&mut self) {
        self.caches.clear();
    }

    /// Number of cached containers of one type
    pub fn len_of(&self, container_type: ContainerType) -> usize {
        self.caches.get(&container_type).map_or(0, LruCache::len)
    }

    /// Total number of cached containers
    pub fn len(&self) -> usize {
        self.caches.values().map(LruCache::len).sum()
    }

    /// Whether nothing is cached
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
