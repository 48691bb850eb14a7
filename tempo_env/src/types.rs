//! Common types for the Tempo kernel abstraction.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::ops::{Add, AddAssign, Neg, Sub};
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};

/// A point (or span) of virtual time.
///
/// Signed tick count with one tick per nanosecond of simulated time.
/// Virtual time has no relationship to the wall clock; it only moves
/// when the kernel dequeues an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Time(i64);

impl Time {
    /// The zero-point of virtual time.
    pub const ZERO: Time = Time(0);

    /// The largest representable time.
    pub const MAX: Time = Time(i64::MAX);

    /// The smallest representable time.
    pub const MIN: Time = Time(i64::MIN);

    const NANOS_PER_MICRO: i64 = 1_000;
    const NANOS_PER_MILLI: i64 = 1_000_000;
    const NANOS_PER_SEC: i64 = 1_000_000_000;

    /// Creates a time from a raw tick count.
    #[inline]
    pub const fn from_ticks(ticks: i64) -> Self {
        Time(ticks)
    }

    /// Creates a time from nanoseconds (same as ticks).
    #[inline]
    pub const fn from_nanos(nanos: i64) -> Self {
        Time(nanos)
    }

    /// Creates a time from microseconds, saturating at the bounds.
    #[inline]
    pub const fn from_micros(micros: i64) -> Self {
        Time(micros.saturating_mul(Self::NANOS_PER_MICRO))
    }

    /// Creates a time from milliseconds, saturating at the bounds.
    #[inline]
    pub const fn from_millis(millis: i64) -> Self {
        Time(millis.saturating_mul(Self::NANOS_PER_MILLI))
    }

    /// Creates a time from seconds, saturating at the bounds.
    #[inline]
    pub const fn from_secs(secs: i64) -> Self {
        Time(secs.saturating_mul(Self::NANOS_PER_SEC))
    }

    /// Returns the raw tick count.
    #[inline]
    pub const fn ticks(self) -> i64 {
        self.0
    }

    /// Returns the time in (fractional) seconds.
    #[inline]
    pub fn as_secs_f64(self) -> f64 {
        self.0 as f64 / Self::NANOS_PER_SEC as f64
    }

    #[inline]
    pub const fn is_negative(self) -> bool {
        self.0 < 0
    }

    #[inline]
    pub const fn is_zero(self) -> bool {
        self.0 == 0
    }

    /// Returns `None` on overflow.
    #[inline]
    pub fn checked_add(self, rhs: Time) -> Option<Time> {
        self.0.checked_add(rhs.0).map(Time)
    }

    /// Returns `None` on overflow.
    #[inline]
    pub fn checked_sub(self, rhs: Time) -> Option<Time> {
        self.0.checked_sub(rhs.0).map(Time)
    }
}

impl Add for Time {
    type Output = Time;

    fn add(self, rhs: Time) -> Time {
        Time(self.0 + rhs.0)
    }
}

impl AddAssign for Time {
    fn add_assign(&mut self, rhs: Time) {
        self.0 += rhs.0;
    }
}

impl Sub for Time {
    type Output = Time;

    fn sub(self, rhs: Time) -> Time {
        Time(self.0 - rhs.0)
    }
}

impl Neg for Time {
    type Output = Time;

    fn neg(self) -> Time {
        Time(-self.0)
    }
}

impl fmt::Display for Time {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:+}ns", self.0)
    }
}

/// Identifier of the simulated entity on whose behalf an event runs.
///
/// A distributed backend uses it to route events to the owning logical
/// process; single-threaded backends only propagate it.
pub type ContextId = u32;

/// Context reported outside of event execution.
pub const NO_CONTEXT: ContextId = u32::MAX;

/// Process-unique identity of a kernel instance.
///
/// Event handles carry the identity of the kernel that issued them, so a
/// handle from a torn-down run is recognisably foreign to the next one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct ImplId(u64);

static NEXT_IMPL_ID: AtomicU64 = AtomicU64::new(1);

impl ImplId {
    /// Never issued to a kernel; owner of the default (invalid) handle.
    pub const NONE: ImplId = ImplId(0);

    /// Mints a fresh identity.
    pub fn fresh() -> Self {
        ImplId(NEXT_IMPL_ID.fetch_add(1, AtomicOrdering::Relaxed))
    }

    /// Returns the raw value.
    pub fn raw(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ImplId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "K#{}", self.0)
    }
}

/// Ordering key of a pending event.
///
/// Keys order by `(ts, uid)`. Uids are strictly increasing per kernel, so
/// events sharing a timestamp run in the order they were scheduled.
/// `context` rides along and takes no part in ordering or equality.
#[derive(Debug, Clone, Copy)]
pub struct EventKey {
    /// Virtual time at which the event fires.
    pub ts: Time,

    /// Per-kernel sequence number.
    pub uid: u64,

    /// Context the event executes under.
    pub context: ContextId,
}

impl EventKey {
    pub fn new(ts: Time, uid: u64, context: ContextId) -> Self {
        Self { ts, uid, context }
    }
}

impl PartialEq for EventKey {
    fn eq(&self, other: &Self) -> bool {
        self.ts == other.ts && self.uid == other.uid
    }
}

impl Eq for EventKey {}

impl Ord for EventKey {
    fn cmp(&self, other: &Self) -> Ordering {
        self.ts.cmp(&other.ts).then_with(|| self.uid.cmp(&other.uid))
    }
}

impl PartialOrd for EventKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Whether a handle refers to a timed event or a teardown event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum EventKind {
    #[default]
    Timed,
    Destroy,
}

/// Handle to a scheduled event.
///
/// A lookup key, never an owner: cancelling or querying goes through the
/// kernel that issued it. Once the event ran, was cancelled or removed, or
/// its kernel was torn down, every query treats the handle as expired.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct EventId {
    owner: ImplId,
    ts: Time,
    context: ContextId,
    uid: u64,
    kind: EventKind,
}

impl EventId {
    /// Handle for a timed event.
    pub fn new(owner: ImplId, key: EventKey) -> Self {
        Self {
            owner,
            ts: key.ts,
            context: key.context,
            uid: key.uid,
            kind: EventKind::Timed,
        }
    }

    /// Handle for an event that runs at kernel teardown.
    pub fn destroy(owner: ImplId, issued_at: Time, uid: u64) -> Self {
        Self {
            owner,
            ts: issued_at,
            context: NO_CONTEXT,
            uid,
            kind: EventKind::Destroy,
        }
    }

    pub fn owner(&self) -> ImplId {
        self.owner
    }

    /// Firing time for timed events; issue time for destroy events.
    pub fn ts(&self) -> Time {
        self.ts
    }

    pub fn context(&self) -> ContextId {
        self.context
    }

    pub fn uid(&self) -> u64 {
        self.uid
    }

    pub fn kind(&self) -> EventKind {
        self.kind
    }

    pub fn is_destroy(&self) -> bool {
        self.kind == EventKind::Destroy
    }

    /// The scheduler key this handle refers to.
    pub fn key(&self) -> EventKey {
        EventKey::new(self.ts, self.uid, self.context)
    }
}

impl fmt::Display for EventId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            EventKind::Timed => write!(f, "E#{}@{}", self.uid, self.ts),
            EventKind::Destroy => write!(f, "E#{}@destroy", self.uid),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_time_constructors() {
        assert_eq!(Time::from_secs(1).ticks(), 1_000_000_000);
        assert_eq!(Time::from_millis(3).ticks(), 3_000_000);
        assert_eq!(Time::from_micros(7).ticks(), 7_000);
        assert_eq!(Time::from_nanos(9), Time::from_ticks(9));
        assert_eq!(Time::from_secs(i64::MAX), Time::MAX);
    }

    #[test]
    fn test_time_arithmetic() {
        let t = Time::from_ticks(10);
        assert_eq!(t + Time::from_ticks(5), Time::from_ticks(15));
        assert_eq!(t - Time::from_ticks(15), Time::from_ticks(-5));
        assert!((-t).is_negative());
        assert!(Time::MAX.checked_add(Time::from_ticks(1)).is_none());
        assert_eq!(Time::from_millis(1500).as_secs_f64(), 1.5);
    }

    #[test]
    fn test_time_display() {
        assert_eq!(Time::from_ticks(42).to_string(), "+42ns");
        assert_eq!(Time::from_ticks(-3).to_string(), "-3ns");
    }

    #[test]
    fn test_key_orders_by_time_then_uid() {
        let a = EventKey::new(Time::from_ticks(5), 9, 0);
        let b = EventKey::new(Time::from_ticks(5), 10, 3);
        let c = EventKey::new(Time::from_ticks(1), 11, 0);
        assert!(a < b);
        assert!(c < a);
    }

    #[test]
    fn test_key_equality_ignores_context() {
        let a = EventKey::new(Time::from_ticks(5), 9, 0);
        let b = EventKey::new(Time::from_ticks(5), 9, 7);
        assert_eq!(a, b);
    }

    #[test]
    fn test_impl_ids_are_unique() {
        let a = ImplId::fresh();
        let b = ImplId::fresh();
        assert_ne!(a, b);
        assert_ne!(a, ImplId::NONE);
    }

    #[test]
    fn test_default_event_id_is_invalid() {
        let id = EventId::default();
        assert_eq!(id.owner(), ImplId::NONE);
        assert_eq!(id.uid(), 0);
        assert!(!id.is_destroy());
    }
}
