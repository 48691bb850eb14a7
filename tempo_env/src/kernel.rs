//! Core kernel trait: the pluggable simulation backend.

use crate::error::SimResult;
use crate::event::EventAction;
use crate::scheduler::SchedulerFactory;
use crate::types::{ContextId, EventId, ImplId, Time};

/// The central interface of a simulation backend.
///
/// A kernel owns the virtual clock, the run/stop state machine, the
/// scheduler and the run loop. The `Simulator` facade resolves exactly
/// one kernel per process and forwards every call to it unchanged.
///
/// # Implementations
///
/// - **Built-in**: `DefaultSimulatorImpl` - single-threaded run loop
/// - **Plugged**: anything registered under a name in the facade's
///   registry and selected through `SimulatorImplementationType`
///
/// # Re-entrancy
///
/// Every method takes `&self`. Actions run by `run` call back into the
/// kernel (through the facade) to schedule follow-up events, so an
/// implementation must not hold internal locks while an action executes.
/// `now` and `context` are called from diagnostic printers at arbitrary
/// logging sites and should never block.
pub trait SimulatorImpl: Send + Sync + 'static {
    /// Identity stamped into every handle this kernel issues.
    fn id(&self) -> ImplId;

    /// Replaces the scheduler, migrating every pending event into the
    /// new one.
    fn set_scheduler(&self, factory: &SchedulerFactory);

    /// Runs destroy events in registration order, then releases every
    /// pending action and the scheduler.
    fn destroy(&self);

    /// Returns `true` when no live events are pending.
    fn is_finished(&self) -> bool;

    /// Executes events in time order until none remain or a stop is
    /// requested.
    fn run(&self);

    /// Requests the run loop to return once the current event completes.
    fn stop(&self);

    /// Schedules a stop at `now + delay`.
    fn stop_after(&self, delay: Time) -> SimResult<EventId>;

    /// Current virtual time.
    fn now(&self) -> Time;

    /// Virtual time left until the event fires.
    ///
    /// # Errors
    /// `SimError::InvalidHandle` if the handle is expired.
    fn delay_left(&self, id: &EventId) -> SimResult<Time>;

    /// Schedules `action` at `now + delay` under the current context.
    ///
    /// # Errors
    /// `SimError::NegativeDelay` for `delay < 0`, `SimError::TimeOverflow`
    /// if the target time is unrepresentable.
    fn schedule(&self, delay: Time, action: EventAction) -> SimResult<EventId>;

    /// Schedules `action` at the current time, after already-pending
    /// events with the same time.
    fn schedule_now(&self, action: EventAction) -> EventId;

    /// Schedules `action` at `now + delay` under an explicit context.
    fn schedule_with_context(
        &self,
        context: ContextId,
        delay: Time,
        action: EventAction,
    ) -> SimResult<EventId>;

    /// Registers `action` to run once during `destroy`.
    fn schedule_destroy(&self, action: EventAction) -> EventId;

    /// Removes the event from the scheduler synchronously.
    fn remove(&self, id: &EventId);

    /// Marks the event cancelled; it will not execute.
    fn cancel(&self, id: &EventId);

    /// Returns `true` if the event ran, was cancelled or removed, or the
    /// handle belongs to another kernel.
    fn is_expired(&self, id: &EventId) -> bool;

    /// Largest time this kernel can represent.
    fn maximum_simulation_time(&self) -> Time;

    /// Context of the executing event, or `NO_CONTEXT`.
    fn context(&self) -> ContextId;

    /// Number of events executed so far.
    fn event_count(&self) -> u64;

    /// Logical process id in distributed runs; 0 otherwise.
    fn system_id(&self) -> u32;
}
