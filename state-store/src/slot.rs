//! Latest-value storage with full-replace semantics
//!
//! A `Slot<T>` holds at most one value. Writers swap in a complete new value;
//! readers take a cheap `Arc` snapshot. A reader therefore always observes
//! either the previous value or the new one, never a mix.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;

/// Holder for the most recently stored value
///
/// # Example
///
/// ```rust
/// use state_store::Slot;
///
/// let slot = Slot::new();
/// assert!(slot.load().is_none());
///
/// slot.replace("first".to_string());
/// let snapshot = slot.load().unwrap();
///
/// // Replacing does not disturb snapshots already handed out
/// slot.replace("second".to_string());
/// assert_eq!(*snapshot, "first");
/// assert_eq!(*slot.load().unwrap(), "second");
/// assert_eq!(slot.version(), 2);
/// ```
pub struct Slot<T> {
    value: RwLock<Option<Arc<T>>>,
    /// Number of replacements so far
    version: AtomicU64,
}

impl<T> Slot<T> {
    /// Create an empty slot
    pub fn new() -> Self {
        Self {
            value: RwLock::new(None),
            version: AtomicU64::new(0),
        }
    }

    /// Replace the stored value in full, returning the previous one
    pub fn replace(&self, value: T) -> Option<Arc<T>> {
        let mut guard = self.value.write();
        self.version.fetch_add(1, Ordering::AcqRel);
        guard.replace(Arc::new(value))
    }

    /// Snapshot of the current value
    ///
    /// Returns `None` if nothing has been stored yet (or the slot was cleared).
    pub fn load(&self) -> Option<Arc<T>> {
        self.value.read().clone()
    }

    /// Drop the stored value, returning it
    pub fn clear(&self) -> Option<Arc<T>> {
        self.value.write().take()
    }

    /// Check whether the slot is empty
    pub fn is_empty(&self) -> bool {
        self.value.read().is_none()
    }

    /// Number of times `replace` has been called
    pub fn version(&self) -> u64 {
        self.version.load(Ordering::Acquire)
    }
}

impl<T> Default for Slot<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> std::fmt::Debug for Slot<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Slot")
            .field("occupied", &!self.is_empty())
            .field("version", &self.version())
            .finish()
    }
}
