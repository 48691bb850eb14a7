//! A user-defined scheduler plugged into the built-in kernel.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tempo_env::{
    scheduler_factory, DefaultSimulatorImpl, EventAction, EventKey, ScheduledEvent, Scheduler, SimulatorImpl, Time,
};

/// Unsorted vector; scans for the minimum key.
#[derive(Default)]
struct ScanScheduler {
    events: Vec<ScheduledEvent>,
}

impl ScanScheduler {
    fn min_index(&self) -> Option<usize> {
        (0..self.events.len()).min_by_key(|&i| self.events[i].key)
    }
}

impl Scheduler for ScanScheduler {
    fn insert(&mut self, event: ScheduledEvent) -> EventKey {
        let key = event.key;
        self.events.push(event);
        key
    }

    fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    fn len(&self) -> usize {
        self.events.len()
    }

    fn peek_next(&self) -> Option<&EventKey> {
        self.min_index().map(|i| &self.events[i].key)
    }

    fn remove_next(&mut self) -> Option<ScheduledEvent> {
        let i = self.min_index()?;
        Some(self.events.swap_remove(i))
    }

    fn remove(&mut self, key: &EventKey) -> Option<ScheduledEvent> {
        let i = self.events.iter().position(|e| e.key == *key)?;
        Some(self.events.swap_remove(i))
    }

    fn name(&self) -> &'static str {
        "scan"
    }
}

#[test]
fn test_custom_scheduler_keeps_kernel_semantics() {
    let built = Arc::new(AtomicUsize::new(0));
    let counter = built.clone();
    let factory = scheduler_factory(move || {
        counter.fetch_add(1, Ordering::SeqCst);
        ScanScheduler::default()
    });

    let kernel = DefaultSimulatorImpl::new();
    let order = Arc::new(Mutex::new(Vec::new()));
    for (delay, tag) in [(3, 'a'), (1, 'b'), (3, 'c'), (0, 'd')] {
        let order = order.clone();
        kernel
            .schedule(Time::from_ticks(delay), EventAction::new(move || order.lock().unwrap().push(tag)))
            .unwrap();
    }
    kernel.set_scheduler(&factory);
    assert_eq!(built.load(Ordering::SeqCst), 1);
    assert_eq!(kernel.scheduler_name(), "scan");

    let o = order.clone();
    let doomed = kernel
        .schedule(Time::from_ticks(2), EventAction::new(move || o.lock().unwrap().push('x')))
        .unwrap();
    kernel.remove(&doomed);

    kernel.run();
    assert_eq!(*order.lock().unwrap(), vec!['d', 'b', 'a', 'c']);
    assert_eq!(kernel.now(), Time::from_ticks(3));
    assert!(kernel.is_finished());
}
