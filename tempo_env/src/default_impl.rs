//! Built-in single-threaded kernel.

use crate::error::{SimError, SimResult};
use crate::event::{EventAction, ScheduledEvent};
use crate::kernel::SimulatorImpl;
use crate::scheduler::{Scheduler, SchedulerFactory};
use crate::schedulers::MapScheduler;
use crate::types::{ContextId, EventId, EventKey, EventKind, ImplId, Time, NO_CONTEXT};
use std::collections::{HashSet, VecDeque};
use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicI64, AtomicU32, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::{debug, trace};

/// First uid handed out; 0 is reserved for the default (invalid) handle.
const FIRST_UID: u64 = 1;

struct DestroyEvent {
    uid: u64,
    action: EventAction,
}

/// Everything the run loop mutates, behind one lock.
struct KernelState {
    scheduler: Box<dyn Scheduler>,

    /// Teardown events in registration order.
    destroy_events: VecDeque<DestroyEvent>,

    /// Uids of timed events that are scheduled and not cancelled.
    pending: HashSet<u64>,

    /// Uids still in the scheduler but cancelled; skipped at dequeue.
    cancelled: HashSet<u64>,

    next_uid: u64,
    event_count: u64,
}

impl KernelState {
    fn mint_uid(&mut self) -> u64 {
        let uid = self.next_uid;
        self.next_uid += 1;
        uid
    }

    fn take_destroy(&mut self, uid: u64) -> Option<EventAction> {
        let idx = self.destroy_events.iter().position(|ev| ev.uid == uid)?;
        self.destroy_events.remove(idx).map(|ev| ev.action)
    }
}

enum Step {
    Execute(ScheduledEvent),
    Skip(EventAction),
}

/// Single-threaded kernel: one run loop, one scheduler, one clock.
///
/// Exactly one action executes at a time and runs to completion. The
/// kernel lock is released before an action is invoked, so actions are
/// free to schedule, cancel and query through the facade.
///
/// `now` and `context` live outside the lock as atomics; diagnostic
/// printers read them from inside arbitrary logging calls.
///
/// Cancellation is lazy: a cancelled event stays in the scheduler and
/// is released when dequeued. `remove` takes it out eagerly.
pub struct DefaultSimulatorImpl {
    id: ImplId,
    system_id: u32,
    now: AtomicI64,
    context: AtomicU32,
    stop: Arc<AtomicBool>,
    state: Mutex<KernelState>,
}

impl DefaultSimulatorImpl {
    /// Creates a kernel with a `MapScheduler` attached.
    pub fn new() -> Self {
        Self::with_system_id(0)
    }

    /// Creates a kernel that reports `system_id` as its logical process.
    pub fn with_system_id(system_id: u32) -> Self {
        let id = ImplId::fresh();
        debug!(kernel = %id, system_id, "default simulator implementation created");
        Self {
            id,
            system_id,
            now: AtomicI64::new(0),
            context: AtomicU32::new(NO_CONTEXT),
            stop: Arc::new(AtomicBool::new(false)),
            state: Mutex::new(KernelState {
                scheduler: Box::new(MapScheduler::new()),
                destroy_events: VecDeque::new(),
                pending: HashSet::new(),
                cancelled: HashSet::new(),
                next_uid: FIRST_UID,
                event_count: 0,
            }),
        }
    }

    /// Creates an Arc-wrapped kernel, ready for `Simulator::set_implementation`.
    pub fn shared() -> Arc<Self> {
        Arc::new(Self::new())
    }

    /// Number of live timed events (cancelled ones excluded).
    pub fn pending_count(&self) -> usize {
        self.state().pending.len()
    }

    /// Name of the attached scheduler backend.
    pub fn scheduler_name(&self) -> &'static str {
        self.state().scheduler.name()
    }

    fn state(&self) -> MutexGuard<'_, KernelState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn insert(&self, context: ContextId, delay: Time, action: EventAction) -> SimResult<EventId> {
        if delay.is_negative() {
            return Err(SimError::NegativeDelay { delay });
        }
        let now = self.now();
        let ts = now
            .checked_add(delay)
            .ok_or(SimError::TimeOverflow { now, delay })?;

        let mut state = self.state();
        let uid = state.mint_uid();
        let key = state
            .scheduler
            .insert(ScheduledEvent::new(EventKey::new(ts, uid, context), action));
        state.pending.insert(uid);
        Ok(EventId::new(self.id, key))
    }

    /// Dequeues the next event, or `None` when the loop should return.
    fn next_step(&self) -> Option<Step> {
        let mut state = self.state();
        if self.stop.load(Ordering::SeqCst) {
            return None;
        }
        let event = state.scheduler.remove_next()?;
        let uid = event.key.uid;
        if state.cancelled.remove(&uid) {
            return Some(Step::Skip(event.action));
        }

        debug_assert!(event.key.ts >= self.now(), "virtual time went backwards");
        state.pending.remove(&uid);
        state.event_count += 1;
        self.now.store(event.key.ts.ticks(), Ordering::Relaxed);
        self.context.store(event.key.context, Ordering::Relaxed);
        Some(Step::Execute(event))
    }
}

impl Default for DefaultSimulatorImpl {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for DefaultSimulatorImpl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DefaultSimulatorImpl")
            .field("id", &self.id)
            .field("system_id", &self.system_id)
            .field("now", &self.now())
            .field("context", &self.context())
            .finish_non_exhaustive()
    }
}

impl SimulatorImpl for DefaultSimulatorImpl {
    fn id(&self) -> ImplId {
        self.id
    }

    fn set_scheduler(&self, factory: &SchedulerFactory) {
        let mut fresh = factory();
        let name = fresh.name();
        let (old, migrated) = {
            let mut state = self.state();
            let mut migrated = 0usize;
            while let Some(event) = state.scheduler.remove_next() {
                fresh.insert(event);
                migrated += 1;
            }
            (std::mem::replace(&mut state.scheduler, fresh), migrated)
        };
        debug!(kernel = %self.id, scheduler = name, replaced = old.name(), migrated, "scheduler attached");
    }

    fn destroy(&self) {
        debug!(kernel = %self.id, "destroying kernel");

        // Destroy events may register further destroy events.
        loop {
            let next = self.state().destroy_events.pop_front();
            match next {
                Some(event) => {
                    trace!(uid = event.uid, "executing destroy event");
                    event.action.invoke();
                }
                None => break,
            }
        }

        let old = {
            let mut state = self.state();
            state.pending.clear();
            state.cancelled.clear();
            std::mem::replace(&mut state.scheduler, Box::new(MapScheduler::new()))
        };
        let released = old.len();
        drop(old);
        debug!(kernel = %self.id, released, "kernel destroyed");
    }

    fn is_finished(&self) -> bool {
        self.state().pending.is_empty()
    }

    fn run(&self) {
        self.stop.store(false, Ordering::SeqCst);
        debug!(kernel = %self.id, now = %self.now(), pending = self.pending_count(), "run loop starting");

        while let Some(step) = self.next_step() {
            match step {
                Step::Skip(action) => drop(action),
                Step::Execute(event) => {
                    trace!(uid = event.key.uid, ts = %event.key.ts, context = event.key.context, "executing event");
                    event.action.invoke();
                }
            }
        }

        self.context.store(NO_CONTEXT, Ordering::Relaxed);
        debug!(kernel = %self.id, now = %self.now(), executed = self.event_count(), "run loop finished");
    }

    fn stop(&self) {
        self.stop.store(true, Ordering::SeqCst);
    }

    fn stop_after(&self, delay: Time) -> SimResult<EventId> {
        let stop = Arc::clone(&self.stop);
        self.schedule(delay, EventAction::new(move || stop.store(true, Ordering::SeqCst)))
    }

    fn now(&self) -> Time {
        Time::from_ticks(self.now.load(Ordering::Relaxed))
    }

    fn delay_left(&self, id: &EventId) -> SimResult<Time> {
        if self.is_expired(id) {
            return Err(SimError::InvalidHandle { uid: id.uid() });
        }
        match id.kind() {
            EventKind::Destroy => Ok(self.maximum_simulation_time() - self.now()),
            EventKind::Timed => Ok(id.ts() - self.now()),
        }
    }

    fn schedule(&self, delay: Time, action: EventAction) -> SimResult<EventId> {
        self.insert(self.context(), delay, action)
    }

    fn schedule_now(&self, action: EventAction) -> EventId {
        let now = self.now();
        let mut state = self.state();
        let uid = state.mint_uid();
        let key = state
            .scheduler
            .insert(ScheduledEvent::new(EventKey::new(now, uid, self.context()), action));
        state.pending.insert(uid);
        EventId::new(self.id, key)
    }

    fn schedule_with_context(
        &self,
        context: ContextId,
        delay: Time,
        action: EventAction,
    ) -> SimResult<EventId> {
        self.insert(context, delay, action)
    }

    fn schedule_destroy(&self, action: EventAction) -> EventId {
        let mut state = self.state();
        let uid = state.mint_uid();
        state.destroy_events.push_back(DestroyEvent { uid, action });
        EventId::destroy(self.id, self.now(), uid)
    }

    fn remove(&self, id: &EventId) {
        if id.owner() != self.id {
            return;
        }
        let released = {
            let mut state = self.state();
            match id.kind() {
                EventKind::Destroy => state.take_destroy(id.uid()),
                EventKind::Timed => {
                    let live = state.pending.remove(&id.uid());
                    let cancelled = state.cancelled.remove(&id.uid());
                    if live || cancelled {
                        state.scheduler.remove(&id.key()).map(|event| event.action)
                    } else {
                        None
                    }
                }
            }
        };
        drop(released);
    }

    fn cancel(&self, id: &EventId) {
        if id.owner() != self.id {
            return;
        }
        let released = {
            let mut state = self.state();
            match id.kind() {
                EventKind::Destroy => state.take_destroy(id.uid()),
                EventKind::Timed => {
                    if state.pending.remove(&id.uid()) {
                        state.cancelled.insert(id.uid());
                    }
                    None
                }
            }
        };
        drop(released);
    }

    fn is_expired(&self, id: &EventId) -> bool {
        if id.owner() != self.id {
            return true;
        }
        let state = self.state();
        match id.kind() {
            EventKind::Destroy => !state.destroy_events.iter().any(|ev| ev.uid == id.uid()),
            EventKind::Timed => !state.pending.contains(&id.uid()),
        }
    }

    fn maximum_simulation_time(&self) -> Time {
        Time::MAX
    }

    fn context(&self) -> ContextId {
        self.context.load(Ordering::Relaxed)
    }

    fn event_count(&self) -> u64 {
        self.state().event_count
    }

    fn system_id(&self) -> u32 {
        self.system_id
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scheduler::scheduler_factory;
    use crate::schedulers::{HeapScheduler, ListScheduler};

    type Log = Arc<Mutex<Vec<i64>>>;

    fn log() -> Log {
        Arc::new(Mutex::new(Vec::new()))
    }

    fn record(log: &Log, value: i64) -> EventAction {
        let log = log.clone();
        EventAction::new(move || log.lock().unwrap().push(value))
    }

    fn ticks(t: i64) -> Time {
        Time::from_ticks(t)
    }

    #[test]
    fn test_runs_in_time_order() {
        let kernel = DefaultSimulatorImpl::new();
        let seen = log();
        for delay in [5, 1, 3] {
            kernel.schedule(ticks(delay), record(&seen, delay)).unwrap();
        }
        kernel.run();
        assert_eq!(*seen.lock().unwrap(), vec![1, 3, 5]);
        assert_eq!(kernel.now(), ticks(5));
        assert_eq!(kernel.event_count(), 3);
        assert!(kernel.is_finished());
    }

    #[test]
    fn test_equal_times_run_fifo() {
        let kernel = DefaultSimulatorImpl::new();
        let seen = log();
        for value in 0..5 {
            kernel.schedule(ticks(7), record(&seen, value)).unwrap();
        }
        kernel.schedule_now(record(&seen, -1));
        kernel.run();
        assert_eq!(*seen.lock().unwrap(), vec![-1, 0, 1, 2, 3, 4]);
    }

    #[test]
    fn test_negative_delay_rejected() {
        let kernel = DefaultSimulatorImpl::new();
        let err = kernel.schedule(ticks(-1), EventAction::new(|| {})).unwrap_err();
        assert_eq!(err, SimError::NegativeDelay { delay: ticks(-1) });
        assert!(kernel.is_finished());
    }

    #[test]
    fn test_overflow_rejected() {
        let kernel = DefaultSimulatorImpl::new();
        kernel.schedule(ticks(10), EventAction::new(|| {})).unwrap();
        kernel.run();
        let err = kernel.schedule(Time::MAX, EventAction::new(|| {})).unwrap_err();
        assert!(matches!(err, SimError::TimeOverflow { .. }));
    }

    #[test]
    fn test_cancel_is_lazy_but_expires_immediately() {
        let kernel = DefaultSimulatorImpl::new();
        let seen = log();
        let id = kernel.schedule(ticks(10), record(&seen, 10)).unwrap();
        assert!(!kernel.is_expired(&id));

        kernel.cancel(&id);
        assert!(kernel.is_expired(&id));
        assert!(kernel.is_finished());
        assert_eq!(kernel.state().scheduler.len(), 1);

        kernel.run();
        assert!(seen.lock().unwrap().is_empty());
        assert_eq!(kernel.event_count(), 0);
        assert_eq!(kernel.state().scheduler.len(), 0);
    }

    #[test]
    fn test_remove_is_eager() {
        let kernel = DefaultSimulatorImpl::new();
        let token = Arc::new(());
        let held = token.clone();
        let id = kernel.schedule(ticks(4), EventAction::new(move || drop(held))).unwrap();

        kernel.remove(&id);
        assert!(kernel.is_expired(&id));
        assert_eq!(kernel.state().scheduler.len(), 0);
        assert_eq!(Arc::strong_count(&token), 1, "action released synchronously");
    }

    #[test]
    fn test_remove_after_cancel_releases() {
        let kernel = DefaultSimulatorImpl::new();
        let id = kernel.schedule(ticks(4), EventAction::new(|| {})).unwrap();
        kernel.cancel(&id);
        kernel.remove(&id);
        assert_eq!(kernel.state().scheduler.len(), 0);
        assert!(kernel.state().cancelled.is_empty());
    }

    #[test]
    fn test_executed_event_is_expired() {
        let kernel = DefaultSimulatorImpl::new();
        let id = kernel.schedule(ticks(2), EventAction::new(|| {})).unwrap();
        kernel.run();
        assert!(kernel.is_expired(&id));
        assert_eq!(kernel.delay_left(&id), Err(SimError::InvalidHandle { uid: id.uid() }));
        // Cancelling a finished event must not leave bookkeeping behind.
        kernel.cancel(&id);
        assert!(kernel.state().cancelled.is_empty());
    }

    #[test]
    fn test_foreign_handles_are_expired() {
        let a = DefaultSimulatorImpl::new();
        let b = DefaultSimulatorImpl::new();
        let id = a.schedule(ticks(1), EventAction::new(|| {})).unwrap();
        assert!(b.is_expired(&id));
        assert!(b.is_expired(&EventId::default()));
        b.cancel(&id);
        assert!(!a.is_expired(&id));
    }

    #[test]
    fn test_delay_left() {
        let kernel = Arc::new(DefaultSimulatorImpl::new());
        let target = kernel.schedule(ticks(10), EventAction::new(|| {})).unwrap();
        assert_eq!(kernel.delay_left(&target), Ok(ticks(10)));

        let observed = Arc::new(Mutex::new(None));
        let (k, o) = (kernel.clone(), observed.clone());
        kernel
            .schedule(ticks(4), EventAction::new(move || {
                *o.lock().unwrap() = k.delay_left(&target).ok();
            }))
            .unwrap();
        kernel.run();
        assert_eq!(*observed.lock().unwrap(), Some(ticks(6)));

        let destroy = kernel.schedule_destroy(EventAction::new(|| {}));
        assert_eq!(kernel.delay_left(&destroy), Ok(Time::MAX - ticks(10)));
    }

    #[test]
    fn test_stop_after() {
        let kernel = DefaultSimulatorImpl::new();
        let seen = log();
        for delay in [1, 2, 5] {
            kernel.schedule(ticks(delay), record(&seen, delay)).unwrap();
        }
        kernel.stop_after(ticks(3)).unwrap();
        kernel.run();
        assert_eq!(*seen.lock().unwrap(), vec![1, 2]);
        assert_eq!(kernel.now(), ticks(3));
        assert!(!kernel.is_finished());

        // A second run picks up where the first stopped.
        kernel.run();
        assert_eq!(*seen.lock().unwrap(), vec![1, 2, 5]);
        assert!(kernel.is_finished());
    }

    #[test]
    fn test_stop_from_inside_an_action() {
        let kernel = Arc::new(DefaultSimulatorImpl::new());
        let seen = log();
        let k = kernel.clone();
        kernel.schedule(ticks(1), EventAction::new(move || k.stop())).unwrap();
        kernel.schedule(ticks(2), record(&seen, 2)).unwrap();
        kernel.run();
        assert!(seen.lock().unwrap().is_empty());
        assert_eq!(kernel.now(), ticks(1));
    }

    #[test]
    fn test_context_inherited_and_explicit() {
        let kernel = Arc::new(DefaultSimulatorImpl::new());
        let seen = Arc::new(Mutex::new(Vec::new()));
        let (k, s) = (kernel.clone(), seen.clone());
        kernel
            .schedule_with_context(7, ticks(1), EventAction::new(move || {
                s.lock().unwrap().push(k.context());
                let (k2, s2) = (k.clone(), s.clone());
                k.schedule(ticks(1), EventAction::new(move || s2.lock().unwrap().push(k2.context())))
                    .unwrap();
            }))
            .unwrap();
        assert_eq!(kernel.context(), NO_CONTEXT);
        kernel.run();
        assert_eq!(*seen.lock().unwrap(), vec![7, 7]);
        assert_eq!(kernel.context(), NO_CONTEXT);
    }

    #[test]
    fn test_destroy_runs_destroy_events_in_order() {
        let kernel = Arc::new(DefaultSimulatorImpl::new());
        let seen = log();
        kernel.schedule_destroy(record(&seen, 1));
        let k = kernel.clone();
        let s = seen.clone();
        kernel.schedule_destroy(EventAction::new(move || {
            s.lock().unwrap().push(2);
            k.schedule_destroy(record(&s, 3));
        }));
        let cancelled = kernel.schedule_destroy(record(&seen, 99));
        kernel.cancel(&cancelled);

        kernel.run();
        assert!(seen.lock().unwrap().is_empty());
        kernel.destroy();
        assert_eq!(*seen.lock().unwrap(), vec![1, 2, 3]);
    }

    #[test]
    fn test_destroy_releases_pending_actions() {
        let kernel = DefaultSimulatorImpl::new();
        let token = Arc::new(());
        for delay in 1..4 {
            let held = token.clone();
            kernel.schedule(ticks(delay), EventAction::new(move || drop(held))).unwrap();
        }
        kernel.stop();
        assert_eq!(Arc::strong_count(&token), 4);
        kernel.destroy();
        assert_eq!(Arc::strong_count(&token), 1);
        assert!(kernel.is_finished());
    }

    #[test]
    fn test_set_scheduler_migrates_pending_events() {
        let kernel = DefaultSimulatorImpl::new();
        let seen = log();
        for delay in [9, 3, 6] {
            kernel.schedule(ticks(delay), record(&seen, delay)).unwrap();
        }
        let cancelled = kernel.schedule(ticks(4), record(&seen, 4)).unwrap();
        kernel.cancel(&cancelled);

        kernel.set_scheduler(&scheduler_factory(HeapScheduler::new));
        assert_eq!(kernel.scheduler_name(), "heap");
        kernel.set_scheduler(&scheduler_factory(ListScheduler::new));
        assert_eq!(kernel.scheduler_name(), "list");

        kernel.run();
        assert_eq!(*seen.lock().unwrap(), vec![3, 6, 9]);
    }

    #[test]
    fn test_system_id() {
        assert_eq!(DefaultSimulatorImpl::new().system_id(), 0);
        assert_eq!(DefaultSimulatorImpl::with_system_id(3).system_id(), 3);
    }
}
