//! Balanced-tree scheduler.

use crate::event::{EventAction, ScheduledEvent};
use crate::scheduler::Scheduler;
use crate::types::EventKey;
use std::collections::BTreeMap;

/// Scheduler backed by a `BTreeMap` keyed on `(time, uid)`.
///
/// O(log n) insert, dequeue and removal by key. This is the default
/// backend.
#[derive(Debug, Default)]
pub struct MapScheduler {
    events: BTreeMap<EventKey, EventAction>,
}

impl MapScheduler {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Scheduler for MapScheduler {
    fn insert(&mut self, event: ScheduledEvent) -> EventKey {
        let key = event.key;
        self.events.insert(key, event.action);
        key
    }

    fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    fn len(&self) -> usize {
        self.events.len()
    }

    fn peek_next(&self) -> Option<&EventKey> {
        self.events.keys().next()
    }

    fn remove_next(&mut self) -> Option<ScheduledEvent> {
        self.events
            .pop_first()
            .map(|(key, action)| ScheduledEvent::new(key, action))
    }

    fn remove(&mut self, key: &EventKey) -> Option<ScheduledEvent> {
        // The stored key keeps the original context.
        self.events
            .remove_entry(key)
            .map(|(key, action)| ScheduledEvent::new(key, action))
    }

    fn name(&self) -> &'static str {
        "map"
    }
}
