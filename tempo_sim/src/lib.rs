//! Tempo Scenario Harness
//!
//! Named end-to-end scenarios that drive the process-wide `Simulator`
//! facade and check its observable guarantees: time ordering, FIFO ties,
//! cancellation, stop-at, teardown, context propagation, kernel injection
//! and restart.
//!
//! # Usage
//!
//! ```no_run
//! use tempo_sim::{ScenarioId, ScenarioRunner};
//!
//! let runner = ScenarioRunner::new(42).with_scheduler("tempo::HeapScheduler");
//! let result = runner.run(ScenarioId::Ordering);
//! assert!(result.passed);
//! ```

mod runner;
pub mod scenarios;
pub mod settings;

pub use runner::{ScenarioResult, ScenarioRunner};
pub use scenarios::ScenarioId;
pub use settings::{load_config, select_schedulers, SettingsError};
