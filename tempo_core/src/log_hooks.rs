//! Diagnostic printers: virtual-time and context stamps for log output.
//!
//! The facade installs `default_time_printer` and `default_node_printer`
//! once its kernel exists and removes them before the kernel is torn
//! down. `SimTimer` plugs the installed printers into a
//! `tracing-subscriber` fmt layer, so every log line carries the virtual
//! time and the context of the event that emitted it.
//!
//! The default printers call `Simulator::now()` and
//! `Simulator::context()`. Were they installed while the facade slot is
//! empty, the first log line emitted while building a kernel would
//! resolve (and build) another kernel, recursively. The facade therefore
//! installs them strictly after populating its slot.

use crate::simulator::Simulator;
use std::fmt;
use std::sync::{PoisonError, RwLock};
use tempo_env::NO_CONTEXT;
use tracing_subscriber::fmt::format::Writer;
use tracing_subscriber::fmt::time::FormatTime;

/// Writes the current virtual time.
pub type TimePrinter = fn(&mut dyn fmt::Write) -> fmt::Result;

/// Writes the current entity (context).
pub type NodePrinter = fn(&mut dyn fmt::Write) -> fmt::Result;

static TIME_PRINTER: RwLock<Option<TimePrinter>> = RwLock::new(None);
static NODE_PRINTER: RwLock<Option<NodePrinter>> = RwLock::new(None);

/// Installs (or with `None`, removes) the time printer. Idempotent.
pub fn set_time_printer(printer: Option<TimePrinter>) {
    *TIME_PRINTER.write().unwrap_or_else(PoisonError::into_inner) = printer;
}

/// Installs (or with `None`, removes) the node printer. Idempotent.
pub fn set_node_printer(printer: Option<NodePrinter>) {
    *NODE_PRINTER.write().unwrap_or_else(PoisonError::into_inner) = printer;
}

pub fn time_printer() -> Option<TimePrinter> {
    *TIME_PRINTER.read().unwrap_or_else(PoisonError::into_inner)
}

pub fn node_printer() -> Option<NodePrinter> {
    *NODE_PRINTER.read().unwrap_or_else(PoisonError::into_inner)
}

/// Returns `true` if either printer is installed.
pub fn printers_installed() -> bool {
    time_printer().is_some() || node_printer().is_some()
}

/// Writes `+<seconds>s`.
pub fn default_time_printer(w: &mut dyn fmt::Write) -> fmt::Result {
    write!(w, "+{:.9}s", Simulator::now().as_secs_f64())
}

/// Writes the current context, or `-1` outside event execution.
pub fn default_node_printer(w: &mut dyn fmt::Write) -> fmt::Result {
    match Simulator::context() {
        NO_CONTEXT => w.write_str("-1"),
        context => write!(w, "{context}"),
    }
}

pub(crate) fn install_default_printers() {
    set_time_printer(Some(default_time_printer));
    set_node_printer(Some(default_node_printer));
}

pub(crate) fn uninstall_printers() {
    set_time_printer(None);
    set_node_printer(None);
}

/// `FormatTime` that stamps log lines with the installed printers.
///
/// Writes nothing while no printers are installed (no simulation yet).
///
/// ```no_run
/// use tempo_core::log_hooks::SimTimer;
///
/// tracing_subscriber::fmt().with_timer(SimTimer).init();
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct SimTimer;

impl FormatTime for SimTimer {
    fn format_time(&self, w: &mut Writer<'_>) -> fmt::Result {
        let time = time_printer();
        let node = node_printer();
        if let Some(print) = time {
            print(&mut *w)?;
        }
        if let Some(print) = node {
            if time.is_some() {
                w.write_char(' ')?;
            }
            print(&mut *w)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fixed_time(w: &mut dyn fmt::Write) -> fmt::Result {
        w.write_str("T")
    }

    fn fixed_node(w: &mut dyn fmt::Write) -> fmt::Result {
        w.write_str("N")
    }

    #[test]
    fn test_sim_timer_formats_installed_printers() {
        let _guard = crate::test_support::serial();

        let mut out = String::new();
        SimTimer.format_time(&mut Writer::new(&mut out)).unwrap();
        assert_eq!(out, "");

        set_time_printer(Some(fixed_time));
        set_node_printer(Some(fixed_node));
        let mut out = String::new();
        SimTimer.format_time(&mut Writer::new(&mut out)).unwrap();
        assert_eq!(out, "T N");

        uninstall_printers();
        assert!(!printers_installed());
    }

    #[test]
    fn test_default_printers() {
        let _guard = crate::test_support::serial();

        let mut out = String::new();
        default_node_printer(&mut out).unwrap();
        assert_eq!(out, "-1");

        let mut out = String::new();
        default_time_printer(&mut out).unwrap();
        assert_eq!(out, "+0.000000000s");
    }
}
