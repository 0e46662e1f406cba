//! Change events for invalidated keys
//!
//! When a watched key of an entity is invalidated, a `ChangeEvent` is emitted
//! naming the entity and the key. The event carries no value; consumers read
//! the current value themselves.

use std::time::Instant;

/// A change event emitted for a watched key
///
/// # Example
///
/// ```rust,ignore
/// for event in watch.iter() {
///     if event.property_key == "current_hp" {
///         println!("HP now {}", handles[&event.entity_id].current_hp());
///     }
/// }
/// ```
#[derive(Debug, Clone)]
pub struct ChangeEvent<Id> {
    /// The entity the event is about
    pub entity_id: Id,

    /// The key that may have changed
    pub property_key: &'static str,

    /// When the event was emitted
    pub timestamp: Instant,
}

impl<Id> ChangeEvent<Id> {
    /// Create a new change event stamped with the current time
    pub fn new(entity_id: Id, property_key: &'static str) -> Self {
        Self {
            entity_id,
            property_key,
            timestamp: Instant::now(),
        }
    }
}

impl<Id: PartialEq> PartialEq for ChangeEvent<Id> {
    fn eq(&self, other: &Self) -> bool {
        // Timestamp not included in equality
        self.entity_id == other.entity_id && self.property_key == other.property_key
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_change_event_equality_ignores_timestamp() {
        let first = ChangeEvent::new("sub-1".to_string(), "current_hp");
        std::thread::sleep(std::time::Duration::from_millis(2));
        let second = ChangeEvent::new("sub-1".to_string(), "current_hp");

        assert_ne!(first.timestamp, second.timestamp);
        assert_eq!(first, second);
        assert_ne!(first, ChangeEvent::new("sub-2".to_string(), "current_hp"));
        assert_ne!(first, ChangeEvent::new("sub-1".to_string(), "max_hp"));
    }
}
