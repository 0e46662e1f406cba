//! Latest-value state primitives
//!
//! Small, generic building blocks for holding "the most recent value" of
//! something and telling interested parties when it may have changed.
//!
//! # Features
//!
//! - **Full-replace slots**: [`Slot<T>`] stores one value behind an `Arc`;
//!   readers get whole snapshots, never partially written ones
//! - **Watch pattern**: [`WatchSet<Id>`] records interest in `(entity, key)`
//!   pairs
//! - **Change events**: invalidating an entity emits one [`ChangeEvent`] per
//!   watched key
//! - **Blocking iteration**: consume events with [`ChangeIterator`]
//!
//! # Quick Start
//!
//! ```rust
//! use state_store::{Slot, WatchSet};
//!
//! let slot = Slot::new();
//! let watch = WatchSet::<u32>::new();
//! watch.watch(1, "reading");
//!
//! slot.replace(21.5_f32);
//! watch.invalidate(&1, &["reading"]);
//!
//! let event = watch.iter().try_recv().unwrap();
//! assert_eq!(event.property_key, "reading");
//! assert_eq!(slot.load().as_deref(), Some(&21.5));
//! ```
//!
//! # Architecture
//!
//! ```text
//! Slot<T>
//!     └── RwLock<Option<Arc<T>>>   (+ replacement counter)
//!
//! WatchSet<Id>
//!     ├── watched: HashSet<(Id, key)>
//!     └── event_channel: mpsc::sync_channel<ChangeEvent<Id>>  (bounded)
//!             └── ChangeIterator<Id>
//! ```

pub mod event;
pub mod iter;
pub mod slot;
pub mod watch;

pub use event::ChangeEvent;
pub use iter::{ChangeIterator, TimeoutIter, TryIter};
pub use slot::Slot;
pub use watch::{WatchSet, DEFAULT_CAPACITY};

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::event::ChangeEvent;
    pub use crate::iter::ChangeIterator;
    pub use crate::slot::Slot;
    pub use crate::watch::WatchSet;
}
