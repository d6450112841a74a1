// crates/cockpit-channel/src/server.rs
// ============================================================================
// Module: Control Server
// Description: Framed TCP listener with a single sequential dispatch thread.
// Purpose: Serve control commands one at a time regardless of client count.
// Dependencies: cockpit-core, serde_json
// ============================================================================

//! ## Overview
//! [`ControlServer`] accepts connections on a background thread. Each
//! connection reads frames and forwards decoded requests to one dispatch
//! thread that owns the [`CommandHandler`]. Replies travel back to the
//! originating connection, so handling is strictly sequential and ordered.
//!
//! Requests that cannot be decoded never reach the handler; they are
//! answered with a `400` failure carrying the decode error.
//!
//! A connection stays tracked only while its thread runs: the thread drops
//! its stream entry on exit and finished thread handles are reaped on every
//! accept, so closed peers release their descriptors.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::HashMap;
use std::io;
use std::io::BufReader;
use std::net::Shutdown;
use std::net::SocketAddr;
use std::net::TcpListener;
use std::net::TcpStream;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::AtomicBool;
use std::sync::atomic::AtomicU64;
use std::sync::atomic::Ordering;
use std::sync::mpsc;
use std::thread;
use std::thread::JoinHandle;
use std::time::Duration;
use std::time::Instant;

use cockpit_core::AuditSink;
use cockpit_core::ChannelAuditEvent;
use cockpit_core::ControlMessage;
use cockpit_core::NoopAuditSink;
use cockpit_core::StatusCode;

use crate::framing::FrameError;
use crate::framing::read_frame;
use crate::framing::write_frame;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Command label used when a request cannot be decoded.
const UNDECODABLE_COMMAND: &str = "invalid request";

/// Accept loop poll interval.
const ACCEPT_POLL: Duration = Duration::from_millis(20);

// ============================================================================
// SECTION: Handler
// ============================================================================

/// Sequential command handler.
///
/// # Invariants
/// - `handle` is never called concurrently; the dispatch thread owns `self`.
/// - The reply's `header.message` echoes the request command.
pub trait CommandHandler: Send + 'static {
    /// Handles one request and produces its reply.
    fn handle(&mut self, request: ControlMessage) -> ControlMessage;
}

// ============================================================================
// SECTION: Settings
// ============================================================================

/// Server settings.
#[derive(Debug, Clone)]
pub struct ServerSettings {
    /// Logical server name used in audit events.
    pub name: String,
    /// Maximum accepted request size.
    pub max_body_bytes: usize,
}

impl ServerSettings {
    /// Creates settings with a 1 MiB body limit.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            max_body_bytes: 1024 * 1024,
        }
    }

    /// Returns the settings with `max_body_bytes` applied.
    #[must_use]
    pub const fn with_max_body_bytes(mut self, max_body_bytes: usize) -> Self {
        self.max_body_bytes = max_body_bytes;
        self
    }
}

// ============================================================================
// SECTION: Server
// ============================================================================

/// One request routed to the dispatch thread.
struct Job {
    /// Decoded request.
    request: ControlMessage,
    /// Reply route back to the connection.
    reply: mpsc::Sender<ControlMessage>,
}

/// Shared state between the accept loop and connection threads.
struct Shared {
    /// Server settings.
    settings: ServerSettings,
    /// Set when the server is shutting down.
    stopping: AtomicBool,
    /// Open connections by id, kept for shutdown.
    streams: Mutex<HashMap<u64, TcpStream>>,
    /// Next connection id.
    next_id: AtomicU64,
    /// Connection thread handles; finished ones are reaped on accept.
    workers: Mutex<Vec<JoinHandle<()>>>,
    /// Audit sink for served calls.
    audit: Arc<dyn AuditSink>,
}

/// Framed TCP control server.
pub struct ControlServer;

impl ControlServer {
    /// Binds `addr` and starts serving `handler`.
    ///
    /// # Errors
    ///
    /// Returns an I/O error when the listener cannot be bound.
    pub fn bind<H: CommandHandler>(
        addr: SocketAddr,
        settings: ServerSettings,
        handler: H,
    ) -> io::Result<ServerHandle> {
        Self::bind_with_audit(addr, settings, handler, Arc::new(NoopAuditSink))
    }

    /// Binds `addr` and starts serving `handler`, auditing each request.
    ///
    /// # Errors
    ///
    /// Returns an I/O error when the listener cannot be bound.
    pub fn bind_with_audit<H: CommandHandler>(
        addr: SocketAddr,
        settings: ServerSettings,
        handler: H,
        audit: Arc<dyn AuditSink>,
    ) -> io::Result<ServerHandle> {
        let listener = TcpListener::bind(addr)?;
        listener.set_nonblocking(true)?;
        let local_addr = listener.local_addr()?;
        let shared = Arc::new(Shared {
            settings,
            stopping: AtomicBool::new(false),
            streams: Mutex::new(HashMap::new()),
            next_id: AtomicU64::new(0),
            workers: Mutex::new(Vec::new()),
            audit,
        });
        let (job_tx, job_rx) = mpsc::channel::<Job>();
        let dispatcher = thread::Builder::new()
            .name(format!("{}-dispatch", shared.settings.name))
            .spawn(move || dispatch_loop(handler, &job_rx))?;
        let accept_shared = Arc::clone(&shared);
        let acceptor = thread::Builder::new()
            .name(format!("{}-accept", shared.settings.name))
            .spawn(move || accept_loop(&listener, &accept_shared, &job_tx))?;
        Ok(ServerHandle {
            local_addr,
            shared,
            acceptor: Some(acceptor),
            dispatcher: Some(dispatcher),
        })
    }
}

/// Handle to a running [`ControlServer`]. Dropping it stops the server.
pub struct ServerHandle {
    /// Bound address.
    local_addr: SocketAddr,
    /// Shared server state.
    shared: Arc<Shared>,
    /// Accept loop thread.
    acceptor: Option<JoinHandle<()>>,
    /// Dispatch thread.
    dispatcher: Option<JoinHandle<()>>,
}

impl ServerHandle {
    /// Returns the bound address.
    #[must_use]
    pub const fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Returns the number of connections currently being served.
    #[must_use]
    pub fn open_connections(&self) -> usize {
        self.shared.streams.lock().map_or(0, |streams| streams.len())
    }

    /// Stops accepting, closes open connections, and joins all threads.
    pub fn shutdown(mut self) {
        self.stop();
    }

    /// Stops the server in place.
    fn stop(&mut self) {
        if self.shared.stopping.swap(true, Ordering::AcqRel) {
            return;
        }
        if let Some(acceptor) = self.acceptor.take() {
            let _ = acceptor.join();
        }
        if let Ok(streams) = self.shared.streams.lock() {
            for stream in streams.values() {
                let _ = stream.shutdown(Shutdown::Both);
            }
        }
        let workers = self
            .shared
            .workers
            .lock()
            .map(|mut workers| std::mem::take(&mut *workers))
            .unwrap_or_default();
        for worker in workers {
            let _ = worker.join();
        }
        if let Some(dispatcher) = self.dispatcher.take() {
            let _ = dispatcher.join();
        }
    }
}

impl Drop for ServerHandle {
    fn drop(&mut self) {
        self.stop();
    }
}

// ============================================================================
// SECTION: Threads
// ============================================================================

/// Runs every job through `handler` in arrival order.
fn dispatch_loop<H: CommandHandler>(mut handler: H, jobs: &mpsc::Receiver<Job>) {
    for job in jobs {
        let reply = handler.handle(job.request);
        let _ = job.reply.send(reply);
    }
}

/// Accepts connections until the server stops.
fn accept_loop(listener: &TcpListener, shared: &Arc<Shared>, jobs: &mpsc::Sender<Job>) {
    while !shared.stopping.load(Ordering::Acquire) {
        match listener.accept() {
            Ok((stream, _)) => {
                let _ = register_connection(stream, shared, jobs);
            }
            Err(_) => thread::sleep(ACCEPT_POLL),
        }
    }
}

/// Starts a connection thread for `stream`.
fn register_connection(
    stream: TcpStream,
    shared: &Arc<Shared>,
    jobs: &mpsc::Sender<Job>,
) -> io::Result<()> {
    stream.set_nonblocking(false)?;
    stream.set_nodelay(true)?;
    let id = shared.next_id.fetch_add(1, Ordering::Relaxed);
    let tracked = stream.try_clone()?;
    if let Ok(mut streams) = shared.streams.lock() {
        streams.insert(id, tracked);
    }
    let conn_shared = Arc::clone(shared);
    let conn_jobs = jobs.clone();
    let spawned = thread::Builder::new()
        .name(format!("{}-conn", shared.settings.name))
        .spawn(move || {
            let _tracked = Tracked {
                shared: &conn_shared,
                id,
            };
            serve_connection(stream, &conn_shared, &conn_jobs);
        });
    let worker = match spawned {
        Ok(worker) => worker,
        Err(err) => {
            untrack(shared, id);
            return Err(err);
        }
    };
    if let Ok(mut workers) = shared.workers.lock() {
        let (finished, running): (Vec<_>, Vec<_>) =
            std::mem::take(&mut *workers).into_iter().partition(JoinHandle::is_finished);
        *workers = running;
        workers.push(worker);
        drop(workers);
        for handle in finished {
            let _ = handle.join();
        }
    }
    Ok(())
}

/// Keeps a connection registered for the lifetime of its thread.
struct Tracked<'a> {
    /// Shared server state.
    shared: &'a Shared,
    /// Connection id.
    id: u64,
}

impl Drop for Tracked<'_> {
    fn drop(&mut self) {
        untrack(self.shared, self.id);
    }
}

/// Drops the tracked stream of connection `id`, closing its descriptor.
fn untrack(shared: &Shared, id: u64) {
    if let Ok(mut streams) = shared.streams.lock() {
        streams.remove(&id);
    }
}

/// Serves frames on one connection until it closes.
fn serve_connection(stream: TcpStream, shared: &Shared, jobs: &mpsc::Sender<Job>) {
    let Ok(mut writer) = stream.try_clone() else {
        return;
    };
    let mut reader = BufReader::new(stream);
    loop {
        let bytes = match read_frame(&mut reader, shared.settings.max_body_bytes) {
            Ok(Some(bytes)) => bytes,
            Ok(None) | Err(FrameError::Closed | FrameError::TimedOut | FrameError::Io(_)) => {
                return;
            }
            Err(err @ (FrameError::Malformed(_) | FrameError::TooLarge(_))) => {
                let reply = ControlMessage::failure(
                    UNDECODABLE_COMMAND,
                    StatusCode::BAD_REQUEST,
                    err.to_string(),
                );
                let _ = send_reply(&mut writer, &reply);
                return;
            }
        };
        let started = Instant::now();
        let reply = match serde_json::from_slice::<ControlMessage>(&bytes) {
            Ok(request) => {
                let (reply_tx, reply_rx) = mpsc::channel();
                let job = Job {
                    request,
                    reply: reply_tx,
                };
                if jobs.send(job).is_err() {
                    return;
                }
                match reply_rx.recv() {
                    Ok(reply) => reply,
                    Err(_) => return,
                }
            }
            Err(err) => ControlMessage::failure(
                UNDECODABLE_COMMAND,
                StatusCode::BAD_REQUEST,
                format!("malformed request: {err}"),
            ),
        };
        shared.audit.record_channel(&ChannelAuditEvent::call(
            &shared.settings.name,
            reply.command(),
            reply.status().map(|status| status.as_u16()),
            None,
            started.elapsed().as_millis(),
        ));
        if send_reply(&mut writer, &reply).is_err() {
            return;
        }
    }
}

/// Encodes and writes one reply frame.
fn send_reply(writer: &mut TcpStream, reply: &ControlMessage) -> Result<(), FrameError> {
    let payload =
        serde_json::to_vec(reply).map_err(|err| FrameError::Malformed(err.to_string()))?;
    write_frame(writer, &payload)
}
