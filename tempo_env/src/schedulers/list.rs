//! Sorted-list scheduler.

use crate::event::ScheduledEvent;
use crate::scheduler::Scheduler;
use crate::types::EventKey;
use std::collections::VecDeque;

/// Scheduler backed by a deque kept sorted by key.
///
/// O(log n) search with O(n) shifting on insert, O(1) dequeue. Suits
/// workloads that mostly append at the tail (monotone delays).
#[derive(Debug, Default)]
pub struct ListScheduler {
    events: VecDeque<ScheduledEvent>,
}

impl ListScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    fn position_of(&self, key: &EventKey) -> Result<usize, usize> {
        self.events.binary_search_by(|event| event.key.cmp(key))
    }
}

impl Scheduler for ListScheduler {
    fn insert(&mut self, event: ScheduledEvent) -> EventKey {
        let key = event.key;
        // Uids are unique, so a key is never already present.
        let idx = match self.position_of(&key) {
            Ok(idx) | Err(idx) => idx,
        };
        self.events.insert(idx, event);
        key
    }

    fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    fn len(&self) -> usize {
        self.events.len()
    }

    fn peek_next(&self) -> Option<&EventKey> {
        self.events.front().map(|event| &event.key)
    }

    fn remove_next(&mut self) -> Option<ScheduledEvent> {
        self.events.pop_front()
    }

    fn remove(&mut self, key: &EventKey) -> Option<ScheduledEvent> {
        let idx = self.position_of(key).ok()?;
        self.events.remove(idx)
    }

    fn name(&self) -> &'static str {
        "list"
    }
}
