//! Binary-heap scheduler.
//!
//! `BinaryHeap` is a max-heap, so entries reverse the key ordering to pop
//! the smallest `(time, uid)` first.

use crate::event::{EventAction, ScheduledEvent};
use crate::scheduler::Scheduler;
use crate::types::EventKey;
use std::cmp::Ordering;
use std::collections::BinaryHeap;

#[derive(Debug)]
struct Entry {
    key: EventKey,
    action: EventAction,
}

impl PartialEq for Entry {
    fn eq(&self, other: &Self) -> bool {
        self.key == other.key
    }
}

impl Eq for Entry {}

impl Ord for Entry {
    fn cmp(&self, other: &Self) -> Ordering {
        other.key.cmp(&self.key)
    }
}

impl PartialOrd for Entry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Scheduler backed by a binary min-heap.
///
/// O(log n) insert and dequeue. Removal by key is O(n): the heap is
/// flattened, the entry dropped out, and the heap rebuilt.
#[derive(Debug, Default)]
pub struct HeapScheduler {
    heap: BinaryHeap<Entry>,
}

impl HeapScheduler {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Scheduler for HeapScheduler {
    fn insert(&mut self, event: ScheduledEvent) -> EventKey {
        let key = event.key;
        self.heap.push(Entry {
            key,
            action: event.action,
        });
        key
    }

    fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }

    fn len(&self) -> usize {
        self.heap.len()
    }

    fn peek_next(&self) -> Option<&EventKey> {
        self.heap.peek().map(|entry| &entry.key)
    }

    fn remove_next(&mut self) -> Option<ScheduledEvent> {
        self.heap
            .pop()
            .map(|entry| ScheduledEvent::new(entry.key, entry.action))
    }

    fn remove(&mut self, key: &EventKey) -> Option<ScheduledEvent> {
        let mut entries = std::mem::take(&mut self.heap).into_vec();
        let found = entries
            .iter()
            .position(|entry| entry.key == *key)
            .map(|idx| entries.swap_remove(idx));
        self.heap = BinaryHeap::from(entries);
        found.map(|entry| ScheduledEvent::new(entry.key, entry.action))
    }

    fn name(&self) -> &'static str {
        "heap"
    }
}
