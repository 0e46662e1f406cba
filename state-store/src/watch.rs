//! Watch registrations and change-event emission
//!
//! A `WatchSet<Id>` records which `(entity, key)` pairs somebody cares about.
//! When an entity is invalidated, one `ChangeEvent` is emitted per watched key
//! of that entity. Unwatched keys produce nothing.
//!
//! The event queue is bounded. Once it holds `capacity` undrained events,
//! further events are dropped until a reader catches up.

use std::collections::HashSet;
use std::hash::Hash;
use std::sync::{mpsc, Arc};

use parking_lot::{Mutex, RwLock};

use crate::event::ChangeEvent;
use crate::iter::ChangeIterator;

/// Queue capacity used by [`WatchSet::new`]
pub const DEFAULT_CAPACITY: usize = 1024;

/// Set of watched `(entity, key)` pairs plus the channel their events go to
///
/// Cloning shares the same watch set and channel.
///
/// # Example
///
/// ```rust
/// use state_store::WatchSet;
///
/// let watch = WatchSet::<String>::new();
/// watch.watch("sub-1".to_string(), "current_hp");
///
/// let emitted = watch.invalidate(&"sub-1".to_string(), &["current_hp", "max_hp"]);
/// assert_eq!(emitted, 1);
///
/// let event = watch.iter().try_recv().unwrap();
/// assert_eq!(event.property_key, "current_hp");
/// ```
pub struct WatchSet<Id>
where
    Id: Clone + Eq + Hash + Send + Sync + 'static,
{
    /// Watched pairs: (entity_id, key)
    watched: Arc<RwLock<HashSet<(Id, &'static str)>>>,

    /// Channel sender for change events (bounded)
    event_tx: mpsc::SyncSender<ChangeEvent<Id>>,

    /// Channel receiver for change events (shared by all iterators)
    event_rx: Arc<Mutex<mpsc::Receiver<ChangeEvent<Id>>>>,
}

impl<Id> WatchSet<Id>
where
    Id: Clone + Eq + Hash + Send + Sync + 'static,
{
    /// Create an empty watch set with the default queue capacity
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    /// Create an empty watch set whose queue holds at most `capacity` events
    ///
    /// A capacity of zero is raised to one.
    pub fn with_capacity(capacity: usize) -> Self {
        let (event_tx, event_rx) = mpsc::sync_channel(capacity.max(1));

        Self {
            watched: Arc::new(RwLock::new(HashSet::new())),
            event_tx,
            event_rx: Arc::new(Mutex::new(event_rx)),
        }
    }

    /// Register interest in a key for an entity
    pub fn watch(&self, entity_id: Id, key: &'static str) {
        self.watched.write().insert((entity_id, key));
    }

    /// Unregister interest in a key
    pub fn unwatch(&self, entity_id: &Id, key: &'static str) {
        self.watched.write().remove(&(entity_id.clone(), key));
    }

    /// Drop every watch registered for an entity
    pub fn unwatch_entity(&self, entity_id: &Id) {
        self.watched.write().retain(|(id, _)| id != entity_id);
    }

    /// Check if a key is being watched
    pub fn is_watched(&self, entity_id: &Id, key: &'static str) -> bool {
        self.watched.read().contains(&(entity_id.clone(), key))
    }

    /// Keys currently watched for an entity
    pub fn watched_keys(&self, entity_id: &Id) -> Vec<&'static str> {
        self.watched
            .read()
            .iter()
            .filter(|(id, _)| id == entity_id)
            .map(|(_, key)| *key)
            .collect()
    }

    /// Emit a change event for each watched key among `keys`
    ///
    /// Returns how many events were queued. Never blocks: events that do
    /// not fit in a full queue are dropped and not counted.
    pub fn invalidate(&self, entity_id: &Id, keys: &[&'static str]) -> usize {
        let to_emit: Vec<&'static str> = {
            let watched = self.watched.read();
            keys.iter()
                .copied()
                .filter(|key| watched.contains(&(entity_id.clone(), *key)))
                .collect()
        };

        to_emit
            .into_iter()
            .filter(|key| {
                self.event_tx
                    .try_send(ChangeEvent::new(entity_id.clone(), *key))
                    .is_ok()
            })
            .count()
    }

    /// Create a blocking iterator over change events
    ///
    /// All iterators share one queue; each event is delivered once.
    pub fn iter(&self) -> ChangeIterator<Id> {
        ChangeIterator::new(Arc::clone(&self.event_rx))
    }

    /// Get the event sender for external event injection
    ///
    /// The sender shares the bounded queue, so `send` blocks while it is full.
    pub fn event_sender(&self) -> mpsc::SyncSender<ChangeEvent<Id>> {
        self.event_tx.clone()
    }
}

impl<Id> Default for WatchSet<Id>
where
    Id: Clone + Eq + Hash + Send + Sync + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<Id> Clone for WatchSet<Id>
where
    Id: Clone + Eq + Hash + Send + Sync + 'static,
{
    fn clone(&self) -> Self {
        Self {
            watched: Arc::clone(&self.watched),
            event_tx: self.event_tx.clone(),
            event_rx: Arc::clone(&self.event_rx),
        }
    }
}

impl<Id> std::fmt::Debug for WatchSet<Id>
where
    Id: Clone + Eq + Hash + Send + Sync + 'static,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WatchSet")
            .field("watch_count", &self.watched.read().len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_watch_and_unwatch() {
        let watch = WatchSet::<String>::new();
        let id = "entity-1".to_string();

        assert!(!watch.is_watched(&id, "hp"));

        watch.watch(id.clone(), "hp");
        assert!(watch.is_watched(&id, "hp"));

        watch.unwatch(&id, "hp");
        assert!(!watch.is_watched(&id, "hp"));
    }

    #[test]
    fn test_invalidate_only_emits_watched_keys() {
        let watch = WatchSet::<String>::new();
        let id = "entity-1".to_string();
        watch.watch(id.clone(), "hp");
        watch.watch(id.clone(), "ac");

        let emitted = watch.invalidate(&id, &["hp", "ac", "turn"]);
        assert_eq!(emitted, 2);

        let mut keys: Vec<_> = watch.iter().try_iter().map(|e| e.property_key).collect();
        keys.sort();
        assert_eq!(keys, vec!["ac", "hp"]);
    }

    #[test]
    fn test_invalidate_unwatched_entity_is_silent() {
        let watch = WatchSet::<String>::new();
        watch.watch("entity-1".to_string(), "hp");

        assert_eq!(watch.invalidate(&"entity-2".to_string(), &["hp"]), 0);
        assert!(watch
            .iter()
            .recv_timeout(Duration::from_millis(20))
            .is_none());
    }

    #[test]
    fn test_unwatch_entity_removes_all_keys() {
        let watch = WatchSet::<String>::new();
        let a = "entity-a".to_string();
        let b = "entity-b".to_string();
        watch.watch(a.clone(), "hp");
        watch.watch(a.clone(), "ac");
        watch.watch(b.clone(), "hp");

        watch.unwatch_entity(&a);

        assert!(watch.watched_keys(&a).is_empty());
        assert_eq!(watch.watched_keys(&b), vec!["hp"]);
    }

    #[test]
    fn test_clone_shares_watches_and_channel() {
        let watch = WatchSet::<String>::new();
        let cloned = watch.clone();
        let id = "entity-1".to_string();

        cloned.watch(id.clone(), "hp");
        watch.invalidate(&id, &["hp"]);

        let event = cloned.iter().try_recv().unwrap();
        assert_eq!(event.entity_id, id);
    }

    #[test]
    fn test_full_queue_drops_instead_of_growing() {
        let watch = WatchSet::<String>::with_capacity(2);
        let id = "entity-1".to_string();
        watch.watch(id.clone(), "hp");

        let queued: Vec<usize> = (0..5).map(|_| watch.invalidate(&id, &["hp"])).collect();
        assert_eq!(queued, vec![1, 1, 0, 0, 0]);
        assert_eq!(watch.iter().try_iter().count(), 2);

        // Draining frees room again
        assert_eq!(watch.invalidate(&id, &["hp"]), 1);
        assert_eq!(watch.iter().try_iter().count(), 1);
    }
}
