//! The `Simulator` facade: one process-wide kernel, resolved on first use.
//!
//! Every operation resolves the process-wide kernel (building it from the
//! configured `SimulatorImplementationType` and `SchedulerType` if the slot
//! is empty) and forwards unchanged. The facade itself never orders
//! events; it guarantees the kernel's existence, identity and safe
//! construction.
//!
//! # Lifecycle
//!
//! ```text
//!  (empty) --first call / set_implementation--> (populated) --teardown--> (empty)
//! ```
//!
//! # Construction order
//!
//! 1. create the kernel from its factory
//! 2. publish it in the slot
//! 3. attach the configured scheduler
//! 4. install the diagnostic printers
//!
//! Teardown reverses this: printers go first, then the kernel's
//! `destroy`, then the slot is cleared. Nothing on the resolution path
//! logs.

use crate::config;
use crate::log_hooks;
use crate::registry;
use std::sync::{Arc, PoisonError, RwLock};
use tempo_env::{
    ContextId, EventAction, EventId, SchedulerFactory, SimError, SimResult, SimulatorImpl, Time, NO_CONTEXT,
};
use tracing::{debug, trace};

#[cfg(feature = "des-metrics")]
use crate::metrics::DesMetrics;

static SLOT: RwLock<Option<Arc<dyn SimulatorImpl>>> = RwLock::new(None);

fn peek_slot() -> Option<Arc<dyn SimulatorImpl>> {
    SLOT.read().unwrap_or_else(PoisonError::into_inner).clone()
}

/// Runs a leaf query against the installed kernel under the read lock,
/// without touching its reference count.
///
/// `query` must not re-enter the facade or release user actions.
#[inline]
fn query_slot<R>(query: impl FnOnce(&dyn SimulatorImpl) -> R) -> Option<R> {
    let slot = SLOT.read().unwrap_or_else(PoisonError::into_inner);
    slot.as_ref().map(|imp| query(imp.as_ref()))
}

/// Publishes `imp` unless the slot is taken; returns the occupant.
fn publish(imp: Arc<dyn SimulatorImpl>) -> Result<Arc<dyn SimulatorImpl>, Arc<dyn SimulatorImpl>> {
    let mut slot = SLOT.write().unwrap_or_else(PoisonError::into_inner);
    match slot.as_ref() {
        Some(existing) => Err(Arc::clone(existing)),
        None => {
            *slot = Some(Arc::clone(&imp));
            Ok(imp)
        }
    }
}

fn resolve() -> Arc<dyn SimulatorImpl> {
    if let Some(imp) = peek_slot() {
        return imp;
    }
    match construct() {
        Ok(imp) => imp,
        Err(err) => panic!("simulator construction failed: {err}"),
    }
}

fn construct() -> SimResult<Arc<dyn SimulatorImpl>> {
    let config = config::global();
    let make_impl = registry::lookup_simulator_impl(&config.simulator_implementation_type)?;
    let scheduler = registry::lookup_scheduler(&config.scheduler_type)?;

    let imp = match publish(make_impl()) {
        Ok(imp) => imp,
        // Lost a race against another constructor; the fresh kernel is dropped.
        Err(existing) => return Ok(existing),
    };
    imp.set_scheduler(&scheduler);
    log_hooks::install_default_printers();
    Ok(imp)
}

/// Entry point for scheduling, querying and running simulated events.
///
/// A namespace, not a value: all state lives in the process-wide kernel.
///
/// ```
/// use std::sync::{Arc, Mutex};
/// use tempo_core::{Simulator, Time};
///
/// let order = Arc::new(Mutex::new(Vec::new()));
/// for delay in [5, 1, 3] {
///     let order = order.clone();
///     Simulator::schedule(Time::from_ticks(delay), move || order.lock().unwrap().push(delay)).unwrap();
/// }
/// Simulator::run();
/// assert_eq!(*order.lock().unwrap(), vec![1, 3, 5]);
/// Simulator::teardown();
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct Simulator;

impl Simulator {
    /// Context reported outside of event execution.
    pub const NO_CONTEXT: ContextId = NO_CONTEXT;

    // =========================================================================
    // LIFECYCLE
    // =========================================================================

    /// Returns the process-wide kernel, constructing it on first call.
    ///
    /// # Panics
    /// If the configured kernel or scheduler name is not registered. This
    /// is a fatal configuration error; validate names through `config`
    /// setters to surface it earlier as a `SimError`.
    pub fn implementation() -> Arc<dyn SimulatorImpl> {
        resolve()
    }

    /// Returns the kernel without constructing one.
    pub fn peek() -> Option<Arc<dyn SimulatorImpl>> {
        peek_slot()
    }

    /// Installs a caller-built kernel instead of the configured one.
    ///
    /// Attaches the configured default scheduler, then installs the
    /// diagnostic printers.
    ///
    /// # Errors
    /// `SimError::ImplementationAlreadySet` if any facade call already
    /// resolved a kernel (call this first, or after `teardown`);
    /// `SimError::UnknownSchedulerType` if the configured scheduler is not
    /// registered. The slot is left untouched in both cases.
    pub fn set_implementation(imp: Arc<dyn SimulatorImpl>) -> SimResult<()> {
        let scheduler = registry::lookup_scheduler(&config::global().scheduler_type)?;
        let imp = publish(imp).map_err(|_| SimError::ImplementationAlreadySet)?;
        imp.set_scheduler(&scheduler);
        log_hooks::install_default_printers();
        Ok(())
    }

    /// Tears the kernel down so a fresh one can be built on next use.
    ///
    /// No-op without a kernel. Otherwise the diagnostic printers are
    /// removed, the kernel runs its destroy events and releases every
    /// pending action, and the slot is cleared. Outstanding handles all
    /// become expired.
    pub fn teardown() {
        let Some(imp) = peek_slot() else {
            return;
        };
        debug!(kernel = %imp.id(), executed = imp.event_count(), "tearing down simulator");

        log_hooks::uninstall_printers();
        imp.destroy();
        drop(imp);
        SLOT.write().unwrap_or_else(PoisonError::into_inner).take();
    }

    /// Replaces the kernel's scheduler; pending events migrate.
    pub fn set_scheduler(factory: &SchedulerFactory) {
        trace!("set_scheduler");
        resolve().set_scheduler(factory);
    }

    /// Replaces the kernel's scheduler by registry name.
    pub fn set_scheduler_type(name: &str) -> SimResult<()> {
        let factory = registry::lookup_scheduler(name)?;
        Self::set_scheduler(&factory);
        Ok(())
    }

    // =========================================================================
    // RUN / STOP
    // =========================================================================

    /// Returns `true` when no live events are pending.
    pub fn is_finished() -> bool {
        resolve().is_finished()
    }

    /// Runs events in time order until none remain or a stop is requested.
    pub fn run() {
        trace!("run");
        resolve().run();
    }

    /// Stops the run loop once the executing event returns.
    pub fn stop() {
        trace!("stop");
        resolve().stop();
    }

    /// Stops the run loop when virtual time reaches `now + delay`.
    pub fn stop_after(delay: Time) -> SimResult<EventId> {
        trace!(%delay, "stop_after");
        resolve().stop_after(delay)
    }

    // =========================================================================
    // SCHEDULING
    // =========================================================================

    /// Schedules `action` after `delay`, under the current context.
    ///
    /// # Errors
    /// `SimError::NegativeDelay` / `SimError::TimeOverflow` from the kernel.
    pub fn schedule<F>(delay: Time, action: F) -> SimResult<EventId>
    where
        F: FnOnce() + Send + 'static,
    {
        let imp = resolve();
        #[cfg(feature = "des-metrics")]
        DesMetrics::get().trace(imp.context(), imp.now(), delay);
        imp.schedule(delay, EventAction::new(action))
    }

    /// Schedules `action` at the current time, after events already
    /// pending for it.
    pub fn schedule_now<F>(action: F) -> EventId
    where
        F: FnOnce() + Send + 'static,
    {
        let imp = resolve();
        #[cfg(feature = "des-metrics")]
        DesMetrics::get().trace(imp.context(), imp.now(), Time::ZERO);
        imp.schedule_now(EventAction::new(action))
    }

    /// Schedules `action` after `delay` on behalf of `context`.
    ///
    /// The only way to attribute an event to another entity; the event and
    /// everything it schedules with `schedule` run under `context`.
    pub fn schedule_with_context<F>(context: ContextId, delay: Time, action: F) -> SimResult<EventId>
    where
        F: FnOnce() + Send + 'static,
    {
        let imp = resolve();
        #[cfg(feature = "des-metrics")]
        DesMetrics::get().trace_with_context(imp.context(), context, imp.now(), delay);
        imp.schedule_with_context(context, delay, EventAction::new(action))
    }

    /// Registers `action` to run once during `teardown`, in registration
    /// order.
    pub fn schedule_destroy<F>(action: F) -> EventId
    where
        F: FnOnce() + Send + 'static,
    {
        resolve().schedule_destroy(EventAction::new(action))
    }

    // =========================================================================
    // HANDLES
    // =========================================================================

    /// Removes the event synchronously. No-op without a kernel.
    pub fn remove(id: &EventId) {
        if let Some(imp) = peek_slot() {
            imp.remove(id);
        }
    }

    /// Cancels the event. No-op without a kernel.
    pub fn cancel(id: &EventId) {
        if let Some(imp) = peek_slot() {
            imp.cancel(id);
        }
    }

    /// Returns `true` if the event will not run (anymore). Always `true`
    /// without a kernel.
    pub fn is_expired(id: &EventId) -> bool {
        query_slot(|imp| imp.is_expired(id)).unwrap_or(true)
    }

    /// Virtual time left until the event fires.
    ///
    /// # Errors
    /// `SimError::InvalidHandle` if the handle is expired.
    pub fn delay_left(id: &EventId) -> SimResult<Time> {
        resolve().delay_left(id)
    }

    // =========================================================================
    // TIME & CONTEXT
    // =========================================================================

    /// Current virtual time. Never logs.
    #[inline]
    pub fn now() -> Time {
        match query_slot(|imp| imp.now()) {
            Some(now) => now,
            None => resolve().now(),
        }
    }

    /// Context of the executing event, or `NO_CONTEXT`.
    #[inline]
    pub fn context() -> ContextId {
        match query_slot(|imp| imp.context()) {
            Some(context) => context,
            None => resolve().context(),
        }
    }

    /// Logical process id; 0 without a kernel.
    pub fn system_id() -> u32 {
        query_slot(|imp| imp.system_id()).unwrap_or(0)
    }

    /// Number of events executed so far.
    pub fn event_count() -> u64 {
        resolve().event_count()
    }

    /// Largest time the kernel can represent.
    pub fn maximum_simulation_time() -> Time {
        trace!("maximum_simulation_time");
        resolve().maximum_simulation_time()
    }
}
