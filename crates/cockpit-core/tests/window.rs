//! Aggregation window tests.
//!
//! ## Purpose
//! Verify the lagged `(now - 2e, now - e]` window and its boundary handling.
// crates/cockpit-core/tests/window.rs
// ============================================================================
// Module: Aggregation Window Tests
// Description: Window math and non-overlap checks.
// Purpose: Ensure report windows never include in-flight data or overlap.
// ============================================================================

#![allow(
    clippy::panic,
    clippy::unwrap_used,
    clippy::expect_used,
    reason = "Test-only assertions and helpers are permitted."
)]

use cockpit_core::AggregationWindow;
use cockpit_core::Clock;
use cockpit_core::Epoch;
use cockpit_core::ManualClock;
use proptest::prelude::*;

#[test]
fn lagged_window_trails_now_by_one_epoch() {
    let epoch = Epoch::from_millis(1_000).unwrap();
    let window = AggregationWindow::lagged(10_000_000_000, epoch);
    assert_eq!(window.start_ns, 8_000_000_000);
    assert_eq!(window.end_ns, 9_000_000_000);
}

#[test]
fn window_is_open_at_start_and_closed_at_end() {
    let window = AggregationWindow {
        start_ns: 100,
        end_ns: 200,
    };
    assert!(!window.contains(100));
    assert!(window.contains(101));
    assert!(window.contains(200));
    assert!(!window.contains(201));
}

#[test]
fn consecutive_report_ticks_share_only_the_boundary_instant() {
    let epoch = Epoch::DEFAULT;
    let clock = ManualClock::new(50_000_000_000);
    let first = AggregationWindow::lagged(clock.now_ns(), epoch);
    clock.advance(epoch.as_nanos());
    let second = AggregationWindow::lagged(clock.now_ns(), epoch);
    assert_eq!(first.end_ns, second.start_ns);
    assert!(!first.overlaps(&second));
    assert!(first.contains(first.end_ns));
    assert!(!second.contains(first.end_ns));
}

#[test]
fn zero_epoch_is_rejected() {
    assert!(Epoch::from_millis(0).is_none());
    assert!(Epoch::from_nanos(0).is_none());
    assert!(Epoch::from_nanos(-5).is_none());
}

proptest! {
    #[test]
    fn window_bounds_follow_epoch(
        now in 0_i64 .. 4_000_000_000_000_000_000,
        epoch_ms in 1_u64 .. 600_000,
    ) {
        let epoch = Epoch::from_millis(epoch_ms).unwrap();
        let window = AggregationWindow::lagged(now, epoch);
        prop_assert_eq!(window.end_ns, now - epoch.as_nanos());
        prop_assert_eq!(window.start_ns, now - 2 * epoch.as_nanos());
        prop_assert!(!window.contains(now - epoch.as_nanos() + 1));
    }

    #[test]
    fn windows_at_least_one_epoch_apart_never_overlap(
        now in 0_i64 .. 4_000_000_000_000_000_000,
        gap_epochs in 1_i64 .. 10,
        extra in 0_i64 .. 1_000_000,
        epoch_ms in 1_u64 .. 60_000,
    ) {
        let epoch = Epoch::from_millis(epoch_ms).unwrap();
        let later_now = now + gap_epochs * epoch.as_nanos() + extra;
        let first = AggregationWindow::lagged(now, epoch);
        let second = AggregationWindow::lagged(later_now, epoch);
        prop_assert!(!first.overlaps(&second));
        prop_assert!(!second.overlaps(&first));
    }
}
