// crates/cockpit-fleet/src/generator.rs
// ============================================================================
// Module: Workload Generator
// Description: Fixed-rate replay of a workload folder into a task sink.
// Purpose: Produce benchmark load for every running worker pool.
// Dependencies: cockpit-channel, cockpit-contract, cockpit-core, serde_json
// ============================================================================

//! ## Overview
//! A workload is a folder of `*.sql` files under the workloads root; each
//! file is one query whose number is the file stem. While running, one
//! producer thread submits `frequency` tasks per second to a
//! [`WorkloadSink`], cycling through the queries in file-name order. The
//! producer paces itself against its start instant, so a slow sink delays
//! tasks but does not lower the long-run rate.
//!
//! Only one workload runs at a time. Stopping is idempotent and joins the
//! producer, so no task is submitted after `stop workload` returns.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fs;
use std::path::Path;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::PoisonError;
use std::sync::atomic::AtomicU64;
use std::sync::atomic::Ordering;
use std::sync::mpsc;
use std::sync::mpsc::RecvTimeoutError;
use std::thread;
use std::thread::JoinHandle;
use std::time::Duration;
use std::time::Instant;

use cockpit_channel::CommandHandler;
use cockpit_contract::GeneratorCommand;
use cockpit_contract::bodies::StartWorkloadRequest;
use cockpit_core::ControlMessage;
use cockpit_core::DataFolder;
use cockpit_core::QueryTask;
use cockpit_core::empty_body;
use serde::Deserialize;
use serde_json::Value;

use crate::error::GeneratorError;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Highest accepted frequency (tasks per second).
pub const MAX_FREQUENCY: u32 = 100_000;

/// Producer pacing interval.
const TICK: Duration = Duration::from_millis(50);

// ============================================================================
// SECTION: Sink
// ============================================================================

/// Receiver of generated tasks.
pub trait WorkloadSink: Send + Sync {
    /// Offers one task; returns how many consumers accepted it.
    fn submit(&self, task: &QueryTask) -> usize;
}

impl<T: WorkloadSink + ?Sized> WorkloadSink for Arc<T> {
    fn submit(&self, task: &QueryTask) -> usize {
        (**self).submit(task)
    }
}

// ============================================================================
// SECTION: Workload Files
// ============================================================================

/// Loads the queries of workload `folder` under `root`, ordered by file name.
///
/// # Errors
///
/// Returns [`GeneratorError::Workload`] when the folder name is unsafe, the
/// folder cannot be read, or it holds no `.sql` file.
pub fn load_workload(root: &Path, folder: &str) -> Result<Vec<QueryTask>, GeneratorError> {
    let name = DataFolder::new(folder);
    if !name.is_safe_component() {
        return Err(GeneratorError::Workload(format!("invalid workload folder `{folder}`")));
    }
    let directory = root.join(name.as_str());
    let entries = fs::read_dir(&directory)
        .map_err(|err| GeneratorError::Workload(format!("unknown workload `{folder}`: {err}")))?;
    let mut files = Vec::new();
    for entry in entries {
        let path = entry.map_err(|err| GeneratorError::Workload(err.to_string()))?.path();
        if path.is_file() && path.extension().is_some_and(|ext| ext == "sql") {
            files.push(path);
        }
    }
    files.sort();

    let mut tasks = Vec::with_capacity(files.len());
    for path in files {
        let sql = fs::read_to_string(&path).map_err(|err| {
            GeneratorError::Workload(format!("reading `{}` failed: {err}", path.display()))
        })?;
        let query_no =
            path.file_stem().map(|stem| stem.to_string_lossy().into_owned()).unwrap_or_default();
        tasks.push(QueryTask {
            sql: sql.trim().to_string(),
            benchmark: folder.to_string(),
            query_no,
        });
    }
    if tasks.is_empty() {
        return Err(GeneratorError::Workload(format!("workload `{folder}` contains no queries")));
    }
    Ok(tasks)
}

// ============================================================================
// SECTION: Generator
// ============================================================================

/// Running producer thread.
struct Producer {
    /// Workload folder being replayed.
    folder: String,
    /// Stop signal.
    stop: mpsc::Sender<()>,
    /// Producer thread.
    handle: JoinHandle<()>,
}

/// Single-workload generator.
pub struct WorkloadGenerator {
    /// Root directory of workload folders.
    root: PathBuf,
    /// Task receiver.
    sink: Arc<dyn WorkloadSink>,
    /// Active producer.
    producer: Mutex<Option<Producer>>,
    /// Tasks submitted since construction.
    submitted: Arc<AtomicU64>,
}

impl WorkloadGenerator {
    /// Creates an idle generator.
    #[must_use]
    pub fn new(root: impl Into<PathBuf>, sink: Arc<dyn WorkloadSink>) -> Self {
        Self {
            root: root.into(),
            sink,
            producer: Mutex::new(None),
            submitted: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Starts replaying `folder` at `frequency` tasks per second.
    ///
    /// # Errors
    ///
    /// Returns [`GeneratorError::AlreadyRunning`] while another workload runs,
    /// [`GeneratorError::Frequency`] outside `1..=MAX_FREQUENCY`, and
    /// [`GeneratorError::Workload`] when the folder cannot be loaded.
    pub fn start(&self, folder: &str, frequency: u32) -> Result<(), GeneratorError> {
        if frequency == 0 || frequency > MAX_FREQUENCY {
            return Err(GeneratorError::Frequency(frequency));
        }
        let mut producer = self.producer.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(running) = producer.as_ref() {
            return Err(GeneratorError::AlreadyRunning(running.folder.clone()));
        }
        let tasks = load_workload(&self.root, folder)?;
        let (stop_tx, stop_rx) = mpsc::channel::<()>();
        let handle = thread::Builder::new()
            .name(format!("generator-{folder}"))
            .spawn({
                let sink = Arc::clone(&self.sink);
                let submitted = Arc::clone(&self.submitted);
                move || produce(&tasks, frequency, sink.as_ref(), &submitted, &stop_rx)
            })
            .map_err(|err| GeneratorError::Internal(format!("producer spawn failed: {err}")))?;
        *producer = Some(Producer {
            folder: folder.to_string(),
            stop: stop_tx,
            handle,
        });
        Ok(())
    }

    /// Stops the running workload. Returns false when none was running.
    pub fn stop(&self) -> bool {
        let producer = self.producer.lock().unwrap_or_else(PoisonError::into_inner).take();
        let Some(producer) = producer else {
            return false;
        };
        let _ = producer.stop.send(());
        let _ = producer.handle.join();
        true
    }

    /// Returns the folder being replayed.
    #[must_use]
    pub fn running_workload(&self) -> Option<String> {
        let producer = self.producer.lock().unwrap_or_else(PoisonError::into_inner);
        producer.as_ref().map(|running| running.folder.clone())
    }

    /// Returns the number of tasks submitted so far.
    #[must_use]
    pub fn submitted(&self) -> u64 {
        self.submitted.load(Ordering::Relaxed)
    }
}

impl Drop for WorkloadGenerator {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Submits tasks at `frequency` per second until stopped.
fn produce(
    tasks: &[QueryTask],
    frequency: u32,
    sink: &dyn WorkloadSink,
    submitted: &AtomicU64,
    stop: &mpsc::Receiver<()>,
) {
    let started = Instant::now();
    let mut sent: u128 = 0;
    let mut cursor = tasks.iter().cycle();
    loop {
        let due = u128::from(frequency) * started.elapsed().as_millis() / 1000;
        while sent < due {
            if let Some(task) = cursor.next() {
                sink.submit(task);
                submitted.fetch_add(1, Ordering::Relaxed);
            }
            sent += 1;
        }
        match stop.recv_timeout(TICK) {
            Err(RecvTimeoutError::Timeout) => {}
            Ok(()) | Err(RecvTimeoutError::Disconnected) => return,
        }
    }
}

// ============================================================================
// SECTION: Service
// ============================================================================

/// Control channel handler for the Workload Generator.
pub struct GeneratorService {
    /// Shared generator.
    generator: Arc<WorkloadGenerator>,
}

impl GeneratorService {
    /// Wraps a generator.
    #[must_use]
    pub const fn new(generator: Arc<WorkloadGenerator>) -> Self {
        Self {
            generator,
        }
    }

    /// Handles one command.
    ///
    /// # Errors
    ///
    /// Returns [`GeneratorError`] when the command fails.
    pub fn dispatch(&self, message: &ControlMessage) -> Result<Value, GeneratorError> {
        let Some(command) = GeneratorCommand::parse(message.command()) else {
            return Err(GeneratorError::UnknownCommand(message.command().to_string()));
        };
        match command {
            GeneratorCommand::StartWorkload => {
                let request = StartWorkloadRequest::deserialize(&message.body)
                    .map_err(|err| GeneratorError::InvalidParams(err.to_string()))?;
                self.generator.start(&request.folder_name, request.frequency)?;
            }
            GeneratorCommand::StopWorkload => {
                self.generator.stop();
            }
        }
        Ok(empty_body())
    }
}

impl CommandHandler for GeneratorService {
    fn handle(&mut self, request: ControlMessage) -> ControlMessage {
        match self.dispatch(&request) {
            Ok(body) => ControlMessage::success(request.command(), body),
            Err(err) => ControlMessage::failure(request.command(), err.status(), err.to_string()),
        }
    }
}
