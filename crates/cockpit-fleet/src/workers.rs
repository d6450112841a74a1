// crates/cockpit-fleet/src/workers.rs
// ============================================================================
// Module: Worker Pool
// Description: Per-instance worker threads draining a bounded task queue.
// Purpose: Execute generated queries and count successes per database.
// Dependencies: cockpit-core
// ============================================================================

//! ## Overview
//! A [`WorkerPool`] belongs to exactly one registered database. While
//! running, `number_workers` threads pop [`QueryTask`]s from a shared queue,
//! execute them through the instance's connection pool, and increment the
//! database's counter in the shared [`CounterStore`] for every success.
//! Closing the pool discards pending tasks and joins every worker; a task
//! already executing finishes first.
//!
//! The queue is bounded by [`MAX_QUEUE_LENGTH`]; tasks offered to a full or
//! closed queue are rejected and reported to the caller.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::Condvar;
use std::sync::Mutex;
use std::sync::PoisonError;
use std::sync::atomic::AtomicU64;
use std::sync::atomic::Ordering;
use std::thread;
use std::thread::JoinHandle;

use cockpit_core::CounterStore;
use cockpit_core::DatabaseId;
use cockpit_core::QueryExecutor;
use cockpit_core::QueryTask;

use crate::error::FleetError;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Maximum number of pending tasks per instance.
pub const MAX_QUEUE_LENGTH: usize = 10_000;

// ============================================================================
// SECTION: Task Queue
// ============================================================================

/// Queue contents guarded by one mutex.
#[derive(Debug, Default)]
struct QueueState {
    /// Pending tasks in arrival order.
    tasks: VecDeque<QueryTask>,
    /// True while workers accept tasks.
    open: bool,
}

/// Bounded blocking task queue.
#[derive(Debug, Default)]
struct TaskQueue {
    /// Pending tasks and open flag.
    state: Mutex<QueueState>,
    /// Signalled on push and on close.
    ready: Condvar,
}

impl TaskQueue {
    /// Blocks until a task is available; `None` once the queue is closed.
    fn pop(&self) -> Option<QueryTask> {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        loop {
            if !state.open {
                return None;
            }
            if let Some(task) = state.tasks.pop_front() {
                return Some(task);
            }
            state = self.ready.wait(state).unwrap_or_else(PoisonError::into_inner);
        }
    }
}

// ============================================================================
// SECTION: Worker Pool
// ============================================================================

/// Task counters shared with the worker threads.
#[derive(Debug, Default)]
struct PoolStats {
    /// Tasks executed successfully.
    succeeded: AtomicU64,
    /// Tasks the database rejected or that could not be counted.
    failed: AtomicU64,
}

/// Worker threads of one database instance.
pub struct WorkerPool {
    /// Owning database.
    database: DatabaseId,
    /// Number of worker threads started by [`WorkerPool::start`].
    size: u32,
    /// Connection pool of the owning database.
    executor: Arc<dyn QueryExecutor>,
    /// Shared throughput counters.
    counters: Arc<dyn CounterStore>,
    /// Pending tasks.
    queue: Arc<TaskQueue>,
    /// Running worker threads.
    threads: Mutex<Vec<JoinHandle<()>>>,
    /// Task outcome counters.
    stats: Arc<PoolStats>,
}

impl WorkerPool {
    /// Creates a stopped pool.
    #[must_use]
    pub fn new(
        database: DatabaseId,
        size: u32,
        executor: Arc<dyn QueryExecutor>,
        counters: Arc<dyn CounterStore>,
    ) -> Self {
        Self {
            database,
            size,
            executor,
            counters,
            queue: Arc::new(TaskQueue::default()),
            threads: Mutex::new(Vec::new()),
            stats: Arc::new(PoolStats::default()),
        }
    }

    /// Starts the worker threads. Returns false when already running.
    ///
    /// # Errors
    ///
    /// Returns [`FleetError::Internal`] when a thread cannot be spawned; any
    /// workers spawned before the failure are stopped again.
    pub fn start(&self) -> Result<bool, FleetError> {
        let mut threads = self.threads.lock().unwrap_or_else(PoisonError::into_inner);
        {
            let mut state = self.queue.state.lock().unwrap_or_else(PoisonError::into_inner);
            if state.open {
                return Ok(false);
            }
            state.open = true;
        }
        for index in 0 .. self.size {
            let spawned = thread::Builder::new()
                .name(format!("worker-{}-{index}", self.database))
                .spawn({
                    let queue = Arc::clone(&self.queue);
                    let executor = Arc::clone(&self.executor);
                    let counters = Arc::clone(&self.counters);
                    let stats = Arc::clone(&self.stats);
                    let database = self.database.clone();
                    move || {
                        worker_loop(
                            &queue,
                            executor.as_ref(),
                            counters.as_ref(),
                            &stats,
                            &database,
                        );
                    }
                });
            match spawned {
                Ok(handle) => threads.push(handle),
                Err(err) => {
                    drop(threads);
                    self.close();
                    return Err(FleetError::Internal(format!("worker spawn failed: {err}")));
                }
            }
        }
        Ok(true)
    }

    /// Stops accepting tasks, discards pending ones, and joins the workers.
    ///
    /// Returns the number of discarded tasks.
    pub fn close(&self) -> usize {
        let mut threads = self.threads.lock().unwrap_or_else(PoisonError::into_inner);
        let discarded = {
            let mut state = self.queue.state.lock().unwrap_or_else(PoisonError::into_inner);
            state.open = false;
            let discarded = state.tasks.len();
            state.tasks.clear();
            discarded
        };
        self.queue.ready.notify_all();
        for handle in threads.drain(..) {
            let _ = handle.join();
        }
        discarded
    }

    /// Offers a task; false when the pool is stopped or the queue is full.
    pub fn enqueue(&self, task: QueryTask) -> bool {
        {
            let mut state = self.queue.state.lock().unwrap_or_else(PoisonError::into_inner);
            if !state.open || state.tasks.len() >= MAX_QUEUE_LENGTH {
                return false;
            }
            state.tasks.push_back(task);
        }
        self.queue.ready.notify_one();
        true
    }

    /// Returns true while workers accept tasks.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.queue.state.lock().unwrap_or_else(PoisonError::into_inner).open
    }

    /// Returns the number of pending tasks.
    #[must_use]
    pub fn queue_length(&self) -> u64 {
        let state = self.queue.state.lock().unwrap_or_else(PoisonError::into_inner);
        u64::try_from(state.tasks.len()).unwrap_or(u64::MAX)
    }

    /// Returns the number of successfully executed tasks.
    #[must_use]
    pub fn succeeded(&self) -> u64 {
        self.stats.succeeded.load(Ordering::Relaxed)
    }

    /// Returns the number of failed tasks.
    #[must_use]
    pub fn failed(&self) -> u64 {
        self.stats.failed.load(Ordering::Relaxed)
    }
}

impl Drop for WorkerPool {
    fn drop(&mut self) {
        self.close();
    }
}

/// Executes tasks until the queue closes.
fn worker_loop(
    queue: &TaskQueue,
    executor: &dyn QueryExecutor,
    counters: &dyn CounterStore,
    stats: &PoolStats,
    database: &DatabaseId,
) {
    while let Some(task) = queue.pop() {
        let counted = executor.execute(&task.sql).is_ok() && counters.increment(database).is_ok();
        if counted {
            stats.succeeded.fetch_add(1, Ordering::Relaxed);
        } else {
            stats.failed.fetch_add(1, Ordering::Relaxed);
        }
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================
