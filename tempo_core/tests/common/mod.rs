//! Shared helpers for tests that touch the process-wide simulator.

#![allow(dead_code)]

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tempo_core::{config, log_hooks, Simulator, Time};

static SERIAL: Mutex<()> = Mutex::new(());

/// Holds the process-wide slot for one test; resets it on both ends.
pub struct Serial {
    _lock: MutexGuard<'static, ()>,
}

pub fn serial() -> Serial {
    let lock = SERIAL.lock().unwrap_or_else(PoisonError::into_inner);
    reset();
    Serial { _lock: lock }
}

fn reset() {
    Simulator::teardown();
    log_hooks::set_time_printer(None);
    log_hooks::set_node_printer(None);
    config::reset();
}

impl Drop for Serial {
    fn drop(&mut self) {
        reset();
    }
}

pub type Log<T> = Arc<Mutex<Vec<T>>>;

pub fn log<T>() -> Log<T> {
    Arc::new(Mutex::new(Vec::new()))
}

pub fn entries<T: Clone>(log: &Log<T>) -> Vec<T> {
    log.lock().unwrap().clone()
}

pub fn ticks(t: i64) -> Time {
    Time::from_ticks(t)
}
