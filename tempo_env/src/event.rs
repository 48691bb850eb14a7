//! Event actions and scheduled-event records.

use crate::types::EventKey;
use std::fmt;

/// Deferred unit of work, run at most once.
///
/// Owned by the scheduler until it is invoked; cancelled or torn-down
/// events are released by dropping the action instead.
pub struct EventAction(Box<dyn FnOnce() + Send + 'static>);

impl EventAction {
    /// Wraps a closure.
    pub fn new<F>(f: F) -> Self
    where
        F: FnOnce() + Send + 'static,
    {
        Self(Box::new(f))
    }

    /// Runs the action, consuming it.
    pub fn invoke(self) {
        (self.0)()
    }
}

impl<F> From<F> for EventAction
where
    F: FnOnce() + Send + 'static,
{
    fn from(f: F) -> Self {
        Self::new(f)
    }
}

impl fmt::Debug for EventAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("EventAction(..)")
    }
}

/// A pending event as a scheduler stores it.
#[derive(Debug)]
pub struct ScheduledEvent {
    pub key: EventKey,
    pub action: EventAction,
}

impl ScheduledEvent {
    pub fn new(key: EventKey, action: EventAction) -> Self {
        Self { key, action }
    }
}
