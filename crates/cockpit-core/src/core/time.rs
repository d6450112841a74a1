// crates/cockpit-core/src/core/time.rs
// ============================================================================
// Module: Cockpit Time Model
// Description: Clocks, reporting epochs, and lagged aggregation windows.
// Purpose: Keep every window computation explicit and replayable in tests.
// Dependencies: serde
// ============================================================================

//! ## Overview
//! Timestamps are unix nanoseconds (`i64`), matching the time-series store.
//! Components read time only through [`Clock`] so tests can pin "now".
//! An [`AggregationWindow`] is the half-open interval `(start, end]` lagged by
//! one epoch, so samples still in flight for the current epoch are never read.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::atomic::AtomicI64;
use std::sync::atomic::Ordering;
use std::time::Duration;
use std::time::SystemTime;
use std::time::UNIX_EPOCH;

use serde::Deserialize;
use serde::Serialize;

// ============================================================================
// SECTION: Clock
// ============================================================================

/// Source of the current time in unix nanoseconds.
pub trait Clock: Send + Sync {
    /// Returns the current time in unix nanoseconds.
    fn now_ns(&self) -> i64;
}

/// Wall clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_ns(&self) -> i64 {
        let nanos = SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default().as_nanos();
        i64::try_from(nanos).unwrap_or(i64::MAX)
    }
}

/// Manually advanced clock for tests and replays.
#[derive(Debug, Default)]
pub struct ManualClock {
    /// Current time in unix nanoseconds.
    now_ns: AtomicI64,
}

impl ManualClock {
    /// Creates a clock pinned at `now_ns`.
    #[must_use]
    pub const fn new(now_ns: i64) -> Self {
        Self {
            now_ns: AtomicI64::new(now_ns),
        }
    }

    /// Moves the clock to `now_ns`.
    pub fn set(&self, now_ns: i64) {
        self.now_ns.store(now_ns, Ordering::SeqCst);
    }

    /// Advances the clock by `delta_ns`.
    pub fn advance(&self, delta_ns: i64) {
        self.now_ns.fetch_add(delta_ns, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now_ns(&self) -> i64 {
        self.now_ns.load(Ordering::SeqCst)
    }
}

// ============================================================================
// SECTION: Epoch
// ============================================================================

/// Length of one reporting epoch.
///
/// # Invariants
/// - Always at least one nanosecond.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Epoch {
    /// Epoch length in nanoseconds.
    nanos: i64,
}

impl Epoch {
    /// Default epoch of one second.
    pub const DEFAULT: Self = Self {
        nanos: 1_000_000_000,
    };

    /// Builds an epoch from milliseconds; returns `None` for zero or overflow.
    #[must_use]
    pub fn from_millis(millis: u64) -> Option<Self> {
        if millis == 0 {
            return None;
        }
        let nanos = i64::try_from(millis).ok()?.checked_mul(1_000_000)?;
        Some(Self {
            nanos,
        })
    }

    /// Builds an epoch from nanoseconds; returns `None` unless positive.
    #[must_use]
    pub const fn from_nanos(nanos: i64) -> Option<Self> {
        if nanos <= 0 {
            return None;
        }
        Some(Self {
            nanos,
        })
    }

    /// Returns the epoch length in nanoseconds.
    #[must_use]
    pub const fn as_nanos(self) -> i64 {
        self.nanos
    }

    /// Returns the epoch length as a [`Duration`].
    #[must_use]
    pub const fn as_duration(self) -> Duration {
        Duration::from_nanos(self.nanos.unsigned_abs())
    }
}

impl Default for Epoch {
    fn default() -> Self {
        Self::DEFAULT
    }
}

// ============================================================================
// SECTION: Aggregation Window
// ============================================================================

/// Half-open time interval `(start_ns, end_ns]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AggregationWindow {
    /// Exclusive lower bound (unix nanoseconds).
    pub start_ns: i64,
    /// Inclusive upper bound (unix nanoseconds).
    pub end_ns: i64,
}

impl AggregationWindow {
    /// Returns the window `(now - 2e, now - e]` for epoch length `e`.
    #[must_use]
    pub const fn lagged(now_ns: i64, epoch: Epoch) -> Self {
        let end_ns = now_ns.saturating_sub(epoch.as_nanos());
        Self {
            start_ns: end_ns.saturating_sub(epoch.as_nanos()),
            end_ns,
        }
    }

    /// Returns true when `timestamp_ns` lies in `(start_ns, end_ns]`.
    #[must_use]
    pub const fn contains(&self, timestamp_ns: i64) -> bool {
        timestamp_ns > self.start_ns && timestamp_ns <= self.end_ns
    }

    /// Returns true when the two windows share at least one instant.
    #[must_use]
    pub const fn overlaps(&self, other: &Self) -> bool {
        self.start_ns < other.end_ns && other.start_ns < self.end_ns
    }
}
