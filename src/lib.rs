//! Chronicle - attribute container store for forensic timelines
//!
//! Chronicle persists the typed records a timeline engine produces (events,
//! event data, event data streams, event sources, event tags, session and
//! task records) and streams events back in timestamp order.
//!
//! # Quick Start
//!
//! ```ignore
//! use chronicle::{ContainerStore, DurableStore, Event, StoreConfig};
//!
//! let mut store = DurableStore::open_file("timeline.db", false, StoreConfig::default())?;
//! let id = store.add_attribute_container(&mut Event::new(1_642_837_953_000_000, "Added Time").into())?;
//!
//! for event in store.get_sorted_events(None)? {
//!     println!("{}", event?.timestamp);
//! }
//! store.close()?;
//! ```
//!
//! # Architecture
//!
//! - `chronicle-core`: identifiers, container model, errors, time ranges
//! - `chronicle-storage`: durable and transient stores, writer, task merger
//!
//! Parallel workers each write a [`TransientStore`] segment; the
//! [`TaskMerger`] folds finished segments into the session's
//! [`DurableStore`].

pub use chronicle_core::*;
pub use chronicle_storage::*;
