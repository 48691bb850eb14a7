//! Tempo Core - the process-wide simulator facade
//!
//! `Simulator` is the single entry point user code calls to schedule
//! events, advance virtual time and query the clock. Behind it sits one
//! kernel (`tempo_env::SimulatorImpl`), built lazily on first use from the
//! configured plugin names and torn down explicitly with
//! `Simulator::teardown()`.
//!
//! # Modules
//!
//! - `simulator`: the facade
//! - `registry`: name to factory maps for kernels and schedulers
//! - `config`: `SimulatorImplementationType` / `SchedulerType` values
//! - `log_hooks`: virtual-time stamps for `tracing` output
//! - `metrics`: scheduling trace (feature `des-metrics`)

pub mod config;
pub mod log_hooks;
pub mod registry;
pub mod simulator;

#[cfg(feature = "des-metrics")]
pub mod metrics;

pub use simulator::Simulator;
pub use tempo_env::{
    ContextId, EventAction, EventId, SchedulerFactory, SimError, SimResult, SimulatorImpl, Time, NO_CONTEXT,
};
