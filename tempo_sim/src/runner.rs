//! Scenario runner: drives the process-wide simulator through each scenario.

use crate::scenarios::ScenarioId;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use std::sync::{Arc, Mutex};
use tempo_core::registry::{self, MAP_SCHEDULER};
use tempo_core::{config, SimError, Simulator};
use tempo_env::{DefaultSimulatorImpl, SimulatorImpl, Time, NO_CONTEXT};
use tracing::{debug, info, warn};

/// Results from running a scenario.
#[derive(Debug, Clone)]
pub struct ScenarioResult {
    /// Scenario that was run
    pub scenario: ScenarioId,

    /// Scheduler the kernel ran with
    pub scheduler: String,

    /// Seed used
    pub seed: u64,

    /// Whether scenario passed all assertions
    pub passed: bool,

    /// Events executed by the kernel (stop events included)
    pub events_executed: u64,

    /// Virtual time when the scenario finished
    pub final_time: Time,

    /// Failure message if any
    pub failure_reason: Option<String>,
}

/// What a scenario observed before its final teardown.
#[derive(Debug, Clone, Copy, Default)]
struct Outcome {
    events_executed: u64,
    final_time: Time,
}

impl Outcome {
    fn capture() -> Self {
        Self {
            events_executed: Simulator::event_count(),
            final_time: Simulator::now(),
        }
    }
}

type Check = Result<Outcome, String>;

fn ensure(condition: bool, reason: impl FnOnce() -> String) -> Result<(), String> {
    if condition {
        Ok(())
    } else {
        Err(reason())
    }
}

fn sim(err: SimError) -> String {
    err.to_string()
}

type Log<T> = Arc<Mutex<Vec<T>>>;

fn log<T>() -> Log<T> {
    Arc::new(Mutex::new(Vec::new()))
}

fn snapshot<T: Clone>(log: &Log<T>) -> Vec<T> {
    log.lock().map(|v| v.clone()).unwrap_or_default()
}

fn push<T>(log: &Log<T>, value: T) {
    if let Ok(mut entries) = log.lock() {
        entries.push(value);
    }
}

fn ticks(t: i64) -> Time {
    Time::from_ticks(t)
}

/// Runs facade scenarios.
pub struct ScenarioRunner {
    /// Configuration seed
    seed: u64,

    /// Registry name of the scheduler to run with
    scheduler: String,

    /// Workload size for the bulk scenarios
    event_count: usize,
}

impl ScenarioRunner {
    /// Creates a new scenario runner.
    pub fn new(seed: u64) -> Self {
        Self {
            seed,
            scheduler: MAP_SCHEDULER.to_string(),
            event_count: 1_000,
        }
    }

    /// Sets the scheduler by registry name.
    pub fn with_scheduler(mut self, name: impl Into<String>) -> Self {
        self.scheduler = name.into();
        self
    }

    /// Sets the workload size for `fifo_ties` and `random_load`.
    pub fn with_event_count(mut self, n: usize) -> Self {
        self.event_count = n.max(1);
        self
    }

    /// Runs a scenario and returns the result.
    ///
    /// The facade is torn down before and after, and the global
    /// configuration is restored, so scenarios do not leak into each other.
    pub fn run(&self, scenario: ScenarioId) -> ScenarioResult {
        info!("Starting scenario: {} (seed={}, scheduler={})", scenario.name(), self.seed, self.scheduler);

        Simulator::teardown();
        let saved = config::global();

        let outcome = config::set_scheduler_type(&self.scheduler)
            .map_err(sim)
            .and_then(|()| match scenario {
                ScenarioId::Ordering => self.run_ordering(),
                ScenarioId::FifoTies => self.run_fifo_ties(),
                ScenarioId::Cancel => self.run_cancel(),
                ScenarioId::StopAt => self.run_stop_at(),
                ScenarioId::Destroy => self.run_destroy(),
                ScenarioId::ContextPropagation => self.run_context_propagation(),
                ScenarioId::Injection => self.run_injection(),
                ScenarioId::Restart => self.run_restart(),
                ScenarioId::RandomLoad => self.run_random_load(),
            });

        Simulator::teardown();
        if let Err(e) = config::apply(saved) {
            warn!("Failed to restore configuration: {}", e);
        }

        let (passed, outcome, failure_reason) = match outcome {
            Ok(outcome) => (true, outcome, None),
            Err(reason) => (false, Outcome::default(), Some(reason)),
        };
        debug!(
            "  {} executed={} final_time={}",
            scenario.name(),
            outcome.events_executed,
            outcome.final_time
        );

        ScenarioResult {
            scenario,
            scheduler: self.scheduler.clone(),
            seed: self.seed,
            passed,
            events_executed: outcome.events_executed,
            final_time: outcome.final_time,
            failure_reason,
        }
    }

    fn run_ordering(&self) -> Check {
        let seen = log();
        for delay in [5, 1, 3] {
            let seen = seen.clone();
            Simulator::schedule(ticks(delay), move || push(&seen, Simulator::now().ticks())).map_err(sim)?;
        }
        Simulator::run();

        let seen = snapshot(&seen);
        ensure(seen == [1, 3, 5], || format!("executed at {:?}, expected [1, 3, 5]", seen))?;
        ensure(Simulator::now() == ticks(5), || format!("clock at {}, expected 5", Simulator::now()))?;
        ensure(Simulator::is_finished(), || "events left after run".to_string())?;
        Ok(Outcome::capture())
    }

    fn run_fifo_ties(&self) -> Check {
        let seen = log();
        for i in 0..self.event_count {
            let seen = seen.clone();
            Simulator::schedule(ticks(10), move || push(&seen, i)).map_err(sim)?;
        }
        Simulator::run();

        let seen = snapshot(&seen);
        let first_out_of_order = seen.iter().enumerate().find(|(pos, i)| *pos != **i);
        ensure(seen.len() == self.event_count, || {
            format!("{} of {} events executed", seen.len(), self.event_count)
        })?;
        ensure(first_out_of_order.is_none(), || {
            format!("tie broken out of order at {:?}", first_out_of_order)
        })?;
        Ok(Outcome::capture())
    }

    fn run_cancel(&self) -> Check {
        let seen = log();
        let mut ids = Vec::new();
        for tag in ["cancelled", "removed", "kept"] {
            let seen = seen.clone();
            ids.push(Simulator::schedule(ticks(10), move || push(&seen, tag)).map_err(sim)?);
        }
        Simulator::cancel(&ids[0]);
        Simulator::remove(&ids[1]);

        ensure(Simulator::is_expired(&ids[0]), || "cancelled event not expired".to_string())?;
        ensure(Simulator::is_expired(&ids[1]), || "removed event not expired".to_string())?;
        ensure(!Simulator::is_expired(&ids[2]), || "live event reported expired".to_string())?;
        Simulator::run();

        let seen = snapshot(&seen);
        ensure(seen == ["kept"], || format!("executed {:?}", seen))?;
        ensure(Simulator::event_count() == 1, || {
            format!("event_count {} counts skipped events", Simulator::event_count())
        })?;
        Ok(Outcome::capture())
    }

    fn run_stop_at(&self) -> Check {
        let seen = log();
        for delay in [1, 2, 4, 5] {
            let seen = seen.clone();
            Simulator::schedule(ticks(delay), move || push(&seen, delay)).map_err(sim)?;
        }
        Simulator::stop_after(ticks(3)).map_err(sim)?;
        Simulator::run();

        let seen = snapshot(&seen);
        ensure(seen == [1, 2], || format!("executed {:?} before stop", seen))?;
        ensure(Simulator::now() == ticks(3), || format!("stopped at {}", Simulator::now()))?;
        ensure(!Simulator::is_finished(), || "events at 4 and 5 were lost".to_string())?;
        Ok(Outcome::capture())
    }

    fn run_destroy(&self) -> Check {
        let seen = log();
        for tag in 1..=3 {
            let seen = seen.clone();
            Simulator::schedule_destroy(move || push(&seen, tag));
        }
        Simulator::schedule(ticks(2), || {}).map_err(sim)?;
        Simulator::run();
        ensure(snapshot(&seen).is_empty(), || "destroy event ran during run()".to_string())?;
        let outcome = Outcome::capture();

        Simulator::teardown();
        Simulator::teardown();
        let seen = snapshot(&seen);
        ensure(seen == [1, 2, 3], || format!("destroy events ran as {:?}", seen))?;
        Ok(outcome)
    }

    fn run_context_propagation(&self) -> Check {
        let seen = log();
        let outer = seen.clone();
        Simulator::schedule_with_context(7, ticks(1), move || {
            push(&outer, Simulator::context());
            let inner = outer.clone();
            if let Err(e) = Simulator::schedule(ticks(1), move || push(&inner, Simulator::context())) {
                warn!("Nested schedule failed: {}", e);
            }
        })
        .map_err(sim)?;
        Simulator::run();

        let seen = snapshot(&seen);
        ensure(seen == [7, 7], || format!("contexts {:?}, expected [7, 7]", seen))?;
        ensure(Simulator::context() == NO_CONTEXT, || {
            format!("context {} leaked out of run()", Simulator::context())
        })?;
        Ok(Outcome::capture())
    }

    fn run_injection(&self) -> Check {
        let system_id = (self.seed % 1024) as u32;
        let kernel = Arc::new(DefaultSimulatorImpl::with_system_id(system_id));
        Simulator::set_implementation(kernel.clone()).map_err(sim)?;

        let factory = registry::lookup_scheduler(&self.scheduler).map_err(sim)?;
        let expected = factory().name();
        ensure(kernel.scheduler_name() == expected, || {
            format!("injected kernel runs {}, expected {}", kernel.scheduler_name(), expected)
        })?;
        ensure(Simulator::implementation().id() == kernel.id(), || "facade replaced the injected kernel".to_string())?;
        ensure(Simulator::system_id() == system_id, || format!("system id {}", Simulator::system_id()))?;

        let again = Simulator::set_implementation(DefaultSimulatorImpl::shared());
        ensure(again == Err(SimError::ImplementationAlreadySet), || {
            format!("second injection returned {:?}", again)
        })?;

        Simulator::schedule(ticks(4), || {}).map_err(sim)?;
        Simulator::run();
        ensure(kernel.now() == ticks(4), || "events did not reach the injected kernel".to_string())?;
        Ok(Outcome::capture())
    }

    fn run_restart(&self) -> Check {
        let released = Arc::new(());
        let held = released.clone();
        Simulator::schedule(ticks(1), || {}).map_err(sim)?;
        let stale = Simulator::schedule(ticks(10), move || drop(held)).map_err(sim)?;
        Simulator::stop_after(ticks(5)).map_err(sim)?;
        Simulator::run();
        let first = Simulator::implementation().id();

        Simulator::teardown();
        ensure(Arc::strong_count(&released) == 1, || "teardown kept a pending action alive".to_string())?;
        ensure(Simulator::peek().is_none(), || "slot populated after teardown".to_string())?;
        ensure(Simulator::is_expired(&stale), || "handle survived teardown".to_string())?;

        ensure(Simulator::now() == Time::ZERO, || format!("rebuilt kernel starts at {}", Simulator::now()))?;
        ensure(Simulator::implementation().id() != first, || "kernel was not rebuilt".to_string())?;
        Simulator::cancel(&stale);
        ensure(Simulator::is_expired(&stale), || "stale handle revived".to_string())?;

        Simulator::schedule(ticks(2), || {}).map_err(sim)?;
        Simulator::run();
        ensure(Simulator::now() == ticks(2), || format!("rebuilt kernel ended at {}", Simulator::now()))?;
        Ok(Outcome::capture())
    }

    fn run_random_load(&self) -> Check {
        let mut rng = ChaCha8Rng::seed_from_u64(self.seed);
        let seen = log();
        let mut model = Vec::with_capacity(self.event_count);
        let mut ids = Vec::with_capacity(self.event_count);

        for i in 0..self.event_count {
            let delay = rng.gen_range(0..1_000i64);
            let seen = seen.clone();
            let id = Simulator::schedule(ticks(delay), move || push(&seen, (Simulator::now().ticks(), i)))
                .map_err(sim)?;
            ids.push(id);
            model.push((delay, i));
        }

        let mut cancelled = 0usize;
        for (i, id) in ids.iter().enumerate() {
            if rng.gen_bool(0.2) {
                if rng.gen_bool(0.5) {
                    Simulator::cancel(id);
                } else {
                    Simulator::remove(id);
                }
                model[i].0 = -1;
                cancelled += 1;
            }
        }
        model.retain(|(delay, _)| *delay >= 0);
        model.sort();
        debug!("  random_load: {} scheduled, {} cancelled", ids.len(), cancelled);

        Simulator::run();

        let seen = snapshot(&seen);
        let divergence = seen.iter().zip(&model).position(|(a, b)| a != b);
        ensure(seen.len() == model.len(), || {
            format!("{} events executed, model expects {}", seen.len(), model.len())
        })?;
        ensure(divergence.is_none(), || format!("execution diverges from model at {:?}", divergence))?;
        ensure(Simulator::event_count() == model.len() as u64, || {
            format!("event_count {} vs {}", Simulator::event_count(), model.len())
        })?;
        Ok(Outcome::capture())
    }
}
