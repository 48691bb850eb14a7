//! Tempo Kernel Abstraction Layer
//!
//! This crate defines everything a simulation backend is made of, so the
//! `tempo_core` facade can drive any backend without knowing which one is
//! active:
//!
//! - Virtual time (`Time`) and context ids
//! - Event handles (`EventId`) and scheduler keys (`EventKey`)
//! - The pluggable event-ordering structure (`Scheduler`)
//! - The pluggable backend owning clock, scheduler and run loop
//!   (`SimulatorImpl`)
//!
//! # Built-ins
//!
//! - `DefaultSimulatorImpl`: single-threaded run loop
//! - `MapScheduler` (default), `HeapScheduler`, `ListScheduler`
//!
//! # Example
//!
//! ```
//! use std::sync::{Arc, Mutex};
//! use tempo_env::{DefaultSimulatorImpl, EventAction, SimulatorImpl, Time};
//!
//! let kernel = DefaultSimulatorImpl::new();
//! let order = Arc::new(Mutex::new(Vec::new()));
//! for delay in [5, 1, 3] {
//!     let order = order.clone();
//!     kernel
//!         .schedule(Time::from_ticks(delay), EventAction::new(move || order.lock().unwrap().push(delay)))
//!         .unwrap();
//! }
//! kernel.run();
//! assert_eq!(*order.lock().unwrap(), vec![1, 3, 5]);
//! ```

mod default_impl;
mod error;
mod event;
mod kernel;
mod scheduler;
pub mod schedulers;
mod types;

pub use default_impl::DefaultSimulatorImpl;
pub use error::{SimError, SimResult};
pub use event::{EventAction, ScheduledEvent};
pub use kernel::SimulatorImpl;
pub use scheduler::{scheduler_factory, Scheduler, SchedulerFactory};
pub use schedulers::{HeapScheduler, ListScheduler, MapScheduler};
pub use types::{ContextId, EventId, EventKey, EventKind, ImplId, Time, NO_CONTEXT};
