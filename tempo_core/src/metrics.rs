//! DES metrics: a trace of every scheduling call made through the facade.
//!
//! One record per `schedule`, `schedule_now` and `schedule_with_context`
//! call, whether the kernel accepted the event or not. The trace can be
//! exported as JSON for offline analysis of inter-entity traffic.

use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::Write;
use std::sync::{Mutex, MutexGuard, OnceLock, PoisonError};
use tempo_env::{ContextId, Time};

/// One scheduling call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TraceRecord {
    /// Context that issued the call.
    pub source: ContextId,

    /// Virtual time of the call.
    pub send_time: Time,

    /// Context the event will run under.
    pub target: ContextId,

    /// Virtual time the event is due (saturating).
    pub recv_time: Time,
}

/// Exported trace.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsReport {
    /// Name given to `initialize`, empty if never called.
    pub name: String,

    pub trace_count: usize,

    pub records: Vec<TraceRecord>,
}

#[derive(Debug, Default)]
struct Collector {
    name: String,
    records: Vec<TraceRecord>,
}

/// Process-wide trace collector.
#[derive(Debug)]
pub struct DesMetrics {
    inner: Mutex<Collector>,
}

static METRICS: OnceLock<DesMetrics> = OnceLock::new();

impl DesMetrics {
    /// Returns the collector, creating it on first use.
    pub fn get() -> &'static DesMetrics {
        METRICS.get_or_init(|| DesMetrics {
            inner: Mutex::new(Collector::default()),
        })
    }

    fn lock(&self) -> MutexGuard<'_, Collector> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Starts a fresh trace named `name`.
    pub fn initialize(&self, name: &str) {
        let mut inner = self.lock();
        inner.name = name.to_string();
        inner.records.clear();
    }

    /// Records an event scheduled by `source` for itself.
    pub fn trace(&self, source: ContextId, now: Time, delay: Time) {
        self.trace_with_context(source, source, now, delay);
    }

    /// Records an event scheduled by `source` for `target`.
    pub fn trace_with_context(&self, source: ContextId, target: ContextId, now: Time, delay: Time) {
        let recv_time = now.checked_add(delay).unwrap_or(if delay.is_negative() { Time::MIN } else { Time::MAX });
        self.lock().records.push(TraceRecord {
            source,
            send_time: now,
            target,
            recv_time,
        });
    }

    /// Snapshot of the records so far.
    pub fn records(&self) -> Vec<TraceRecord> {
        self.lock().records.clone()
    }

    pub fn report(&self) -> MetricsReport {
        let inner = self.lock();
        MetricsReport {
            name: inner.name.clone(),
            trace_count: inner.records.len(),
            records: inner.records.clone(),
        }
    }

    /// Writes `report()` as pretty JSON.
    pub fn write_to_file(&self, path: &str) -> std::io::Result<()> {
        let json = serde_json::to_string_pretty(&self.report())?;
        let mut file = File::create(path)?;
        file.write_all(json.as_bytes())?;
        Ok(())
    }

    /// Drops all records, keeping the name.
    pub fn clear(&self) {
        self.lock().records.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::serial;
    use crate::Simulator;
    use tempo_env::NO_CONTEXT;

    #[test]
    fn test_facade_calls_are_traced() {
        let _guard = serial();
        let metrics = DesMetrics::get();
        metrics.initialize("facade");

        Simulator::schedule_with_context(3, Time::from_ticks(10), || {
            Simulator::schedule(Time::from_ticks(5), || {}).unwrap();
        })
        .unwrap();
        Simulator::schedule_destroy(|| {});
        Simulator::run();

        let records = metrics.records();
        assert_eq!(records.len(), 2, "destroy events are not traced");
        assert_eq!(
            records[0],
            TraceRecord {
                source: NO_CONTEXT,
                send_time: Time::ZERO,
                target: 3,
                recv_time: Time::from_ticks(10),
            }
        );
        assert_eq!(records[1].source, 3);
        assert_eq!(records[1].target, 3);
        assert_eq!(records[1].send_time, Time::from_ticks(10));
        assert_eq!(records[1].recv_time, Time::from_ticks(15));

        metrics.clear();
        assert!(metrics.records().is_empty());
    }

    #[test]
    fn test_rejected_calls_are_traced() {
        let _guard = serial();
        let metrics = DesMetrics::get();
        metrics.initialize("rejected");

        assert!(Simulator::schedule(Time::from_ticks(-1), || {}).is_err());
        assert_eq!(metrics.records().len(), 1);
        assert_eq!(metrics.records()[0].recv_time, Time::from_ticks(-1));
    }

    #[test]
    fn test_report_json() {
        let _guard = serial();
        let metrics = DesMetrics::get();
        metrics.initialize("report");
        metrics.trace(1, Time::from_ticks(2), Time::MAX);

        let report = metrics.report();
        assert_eq!(report.name, "report");
        assert_eq!(report.trace_count, 1);
        assert_eq!(report.records[0].recv_time, Time::MAX);

        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["records"][0]["send_time"], 2);
    }
}
