//! Slots and watch sets shared between writer and reader threads.

use std::sync::Arc;
use std::thread;
use std::time::Duration;

use state_store::{Slot, WatchSet};

#[derive(Debug, Clone, PartialEq)]
struct Reading {
    hp: i64,
    max_hp: i64,
}

#[test]
fn test_writer_invalidates_reader_wakes() {
    let slot = Arc::new(Slot::new());
    let watch = WatchSet::<&'static str>::new();
    watch.watch("table-1", "current_hp");

    let writer = {
        let slot = Arc::clone(&slot);
        let watch = watch.clone();
        thread::spawn(move || {
            for hp in 1..=5 {
                slot.replace(Reading { hp, max_hp: 5 });
                watch.invalidate(&"table-1", &["current_hp", "max_hp"]);
            }
        })
    };

    let events: Vec<_> = watch
        .iter()
        .timeout_iter(Duration::from_millis(500))
        .take(5)
        .collect();
    writer.join().unwrap();

    assert_eq!(events.len(), 5);
    assert!(events.iter().all(|e| e.property_key == "current_hp"));
    assert_eq!(slot.load().as_deref(), Some(&Reading { hp: 5, max_hp: 5 }));
    assert_eq!(slot.version(), 5);
}

#[test]
fn test_external_sender_feeds_iterator() {
    let watch = WatchSet::<u32>::new();
    let sender = watch.event_sender();

    thread::spawn(move || {
        sender
            .send(state_store::ChangeEvent::new(9, "combat_status"))
            .unwrap();
    });

    let event = watch.iter().recv_timeout(Duration::from_secs(1)).unwrap();
    assert_eq!(event.entity_id, 9);
    assert_eq!(event.property_key, "combat_status");
}
