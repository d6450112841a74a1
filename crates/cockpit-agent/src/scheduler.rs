// crates/cockpit-agent/src/scheduler.rs
// ============================================================================
// Module: Counter Flush Scheduler
// Description: Periodic exchange-to-zero of the throughput counter.
// Purpose: Publish one throughput value per epoch on an independent thread.
// Dependencies: cockpit-core
// ============================================================================

//! ## Overview
//! The scheduler wakes on fixed epoch boundaries measured from its start, so
//! a slow tick does not shift later ticks. Each tick calls
//! [`ThroughputCounter::flush`] and records a `counter_flush` audit event. A
//! failed flush is audited and the next tick proceeds; the counter store
//! still holds the unflushed increments, so nothing is lost.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::io;
use std::sync::Arc;
use std::sync::mpsc;
use std::sync::mpsc::RecvTimeoutError;
use std::thread;
use std::thread::JoinHandle;
use std::time::Instant;

use cockpit_core::AuditSink;
use cockpit_core::Epoch;
use cockpit_core::FlushAuditEvent;
use cockpit_core::ThroughputCounter;

// ============================================================================
// SECTION: Scheduler
// ============================================================================

/// Background counter flush thread. Dropping the scheduler stops it.
pub struct FlushScheduler {
    /// Stop signal; dropping the sender also stops the thread.
    stop: Option<mpsc::Sender<()>>,
    /// Flush thread.
    handle: Option<JoinHandle<()>>,
}

impl FlushScheduler {
    /// Starts flushing `counter` every `epoch`.
    ///
    /// # Errors
    ///
    /// Returns an I/O error when the thread cannot be spawned.
    pub fn spawn(
        counter: Arc<ThroughputCounter>,
        epoch: Epoch,
        audit: Arc<dyn AuditSink>,
    ) -> io::Result<Self> {
        let (stop_tx, stop_rx) = mpsc::channel::<()>();
        let name = format!("flush-{}", counter.database());
        let handle = thread::Builder::new()
            .name(name)
            .spawn(move || flush_loop(&counter, epoch, audit.as_ref(), &stop_rx))?;
        Ok(Self {
            stop: Some(stop_tx),
            handle: Some(handle),
        })
    }

    /// Stops the scheduler and waits for the thread to exit.
    pub fn stop(mut self) {
        self.halt();
    }

    /// Signals and joins the flush thread.
    fn halt(&mut self) {
        if let Some(stop) = self.stop.take() {
            let _ = stop.send(());
        }
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

impl Drop for FlushScheduler {
    fn drop(&mut self) {
        self.halt();
    }
}

/// Flushes on every epoch boundary until stopped.
fn flush_loop(
    counter: &ThroughputCounter,
    epoch: Epoch,
    audit: &dyn AuditSink,
    stop: &mpsc::Receiver<()>,
) {
    let period = epoch.as_duration();
    let mut next_tick = Instant::now() + period;
    loop {
        let wait = next_tick.saturating_duration_since(Instant::now());
        match stop.recv_timeout(wait) {
            Err(RecvTimeoutError::Timeout) => {}
            Ok(()) | Err(RecvTimeoutError::Disconnected) => return,
        }
        match counter.flush() {
            Ok(report) => audit.record_flush(&FlushAuditEvent::flushed(
                report.database_id,
                report.epoch,
                report.throughput,
            )),
            Err(err) => audit.record_flush(&FlushAuditEvent::failed(
                counter.database().clone(),
                err.to_string(),
            )),
        }
        next_tick += period;
        let now = Instant::now();
        while next_tick <= now {
            next_tick += period;
        }
    }
}
