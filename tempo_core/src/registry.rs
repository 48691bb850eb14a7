//! Plugin selection registry.
//!
//! Maps type names to factories for kernels and schedulers. The facade
//! consults it once, when it first constructs the process-wide kernel;
//! the configuration layer consults it to validate names up front.

use std::collections::BTreeMap;
use std::sync::{Arc, OnceLock, RwLock, RwLockReadGuard, RwLockWriteGuard, PoisonError};
use tempo_env::{
    scheduler_factory, DefaultSimulatorImpl, HeapScheduler, ListScheduler, MapScheduler, SchedulerFactory,
    SimError, SimResult, SimulatorImpl,
};

/// Name of the built-in single-threaded kernel.
pub const DEFAULT_SIMULATOR_IMPL: &str = "tempo::DefaultSimulatorImpl";

/// Name of the balanced-tree scheduler (the default).
pub const MAP_SCHEDULER: &str = "tempo::MapScheduler";

/// Name of the binary-heap scheduler.
pub const HEAP_SCHEDULER: &str = "tempo::HeapScheduler";

/// Name of the sorted-list scheduler.
pub const LIST_SCHEDULER: &str = "tempo::ListScheduler";

/// Creates kernel instances.
pub type ImplFactory = Arc<dyn Fn() -> Arc<dyn SimulatorImpl> + Send + Sync>;

struct Registry {
    impls: BTreeMap<String, ImplFactory>,
    schedulers: BTreeMap<String, SchedulerFactory>,
}

impl Registry {
    fn with_builtins() -> Self {
        let mut impls: BTreeMap<String, ImplFactory> = BTreeMap::new();
        impls.insert(
            DEFAULT_SIMULATOR_IMPL.to_string(),
            Arc::new(|| Arc::new(DefaultSimulatorImpl::new()) as Arc<dyn SimulatorImpl>),
        );

        let mut schedulers = BTreeMap::new();
        schedulers.insert(MAP_SCHEDULER.to_string(), scheduler_factory(MapScheduler::new));
        schedulers.insert(HEAP_SCHEDULER.to_string(), scheduler_factory(HeapScheduler::new));
        schedulers.insert(LIST_SCHEDULER.to_string(), scheduler_factory(ListScheduler::new));

        Self { impls, schedulers }
    }
}

static REGISTRY: OnceLock<RwLock<Registry>> = OnceLock::new();

fn read() -> RwLockReadGuard<'static, Registry> {
    REGISTRY
        .get_or_init(|| RwLock::new(Registry::with_builtins()))
        .read()
        .unwrap_or_else(PoisonError::into_inner)
}

fn write() -> RwLockWriteGuard<'static, Registry> {
    REGISTRY
        .get_or_init(|| RwLock::new(Registry::with_builtins()))
        .write()
        .unwrap_or_else(PoisonError::into_inner)
}

/// Registers a kernel under `name`, returning the factory it replaced.
pub fn register_simulator_impl<F>(name: impl Into<String>, factory: F) -> Option<ImplFactory>
where
    F: Fn() -> Arc<dyn SimulatorImpl> + Send + Sync + 'static,
{
    write().impls.insert(name.into(), Arc::new(factory))
}

/// Registers a scheduler under `name`, returning the factory it replaced.
pub fn register_scheduler(name: impl Into<String>, factory: SchedulerFactory) -> Option<SchedulerFactory> {
    write().schedulers.insert(name.into(), factory)
}

/// Looks up a kernel factory by name.
pub fn lookup_simulator_impl(name: &str) -> SimResult<ImplFactory> {
    read()
        .impls
        .get(name)
        .cloned()
        .ok_or_else(|| SimError::UnknownSimulatorType(name.to_string()))
}

/// Looks up a scheduler factory by name.
pub fn lookup_scheduler(name: &str) -> SimResult<SchedulerFactory> {
    read()
        .schedulers
        .get(name)
        .cloned()
        .ok_or_else(|| SimError::UnknownSchedulerType(name.to_string()))
}

/// Registered kernel names, sorted.
pub fn simulator_impl_names() -> Vec<String> {
    read().impls.keys().cloned().collect()
}

/// Registered scheduler names, sorted.
pub fn scheduler_names() -> Vec<String> {
    read().schedulers.keys().cloned().collect()
}
