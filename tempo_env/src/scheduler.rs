//! Scheduler abstraction: the ordering structure over pending events.

use crate::event::ScheduledEvent;
use crate::types::EventKey;
use std::sync::Arc;

/// Ordering structure over pending `(time, action)` pairs.
///
/// # Implementations
///
/// - **`MapScheduler`**: balanced ordered map (default)
/// - **`HeapScheduler`**: binary min-heap
/// - **`ListScheduler`**: sorted deque
///
/// # Ordering
///
/// Every implementation must hand events back in ascending `EventKey`
/// order, i.e. by time and then by uid. Since uids increase with every
/// scheduling call, simultaneous events come out first-in first-out.
pub trait Scheduler: Send + 'static {
    /// Inserts an event and returns its key, which serves as the handle
    /// for `remove`.
    fn insert(&mut self, event: ScheduledEvent) -> EventKey;

    /// Returns `true` if no events are pending.
    fn is_empty(&self) -> bool;

    /// Number of pending events.
    fn len(&self) -> usize;

    /// Key of the earliest pending event.
    fn peek_next(&self) -> Option<&EventKey>;

    /// Removes and returns the earliest pending event.
    fn remove_next(&mut self) -> Option<ScheduledEvent>;

    /// Removes the event with the given key, if still pending.
    fn remove(&mut self, key: &EventKey) -> Option<ScheduledEvent>;

    /// Short human-readable backend name (for logs).
    fn name(&self) -> &'static str;
}

/// Creates fresh scheduler instances; what the registry hands out.
pub type SchedulerFactory = Arc<dyn Fn() -> Box<dyn Scheduler> + Send + Sync>;

/// Wraps a constructor into a `SchedulerFactory`.
pub fn scheduler_factory<S, F>(make: F) -> SchedulerFactory
where
    S: Scheduler,
    F: Fn() -> S + Send + Sync + 'static,
{
    Arc::new(move || Box::new(make()) as Box<dyn Scheduler>)
}
