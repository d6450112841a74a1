// crates/cockpit-channel/tests/channel.rs
// ============================================================================
// Module: Control Channel Tests
// Description: Client/server exchanges over loopback TCP.
// Purpose: Validate validation, poisoning, rebuild, and sequential dispatch.
// Dependencies: cockpit-channel, cockpit-contract, cockpit-core, serde_json
// ============================================================================

//! Control channel behavior over real loopback sockets.

#![allow(
    clippy::panic,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::missing_docs_in_private_items,
    reason = "Test-only assertions and helpers are permitted."
)]

use std::io::BufReader;
use std::io::Write;
use std::net::SocketAddr;
use std::net::TcpStream;
use std::sync::Arc;
use std::sync::atomic::AtomicUsize;
use std::sync::atomic::Ordering;
use std::thread;
use std::time::Duration;

use cockpit_channel::ChannelError;
use cockpit_channel::ChannelSettings;
use cockpit_channel::CommandChannel;
use cockpit_channel::CommandHandler;
use cockpit_channel::ControlChannel;
use cockpit_channel::ControlServer;
use cockpit_channel::ServerHandle;
use cockpit_channel::ServerSettings;
use cockpit_channel::UnavailableKind;
use cockpit_channel::framing::read_frame;
use cockpit_channel::framing::write_frame;
use cockpit_contract::ChannelKind;
use cockpit_contract::ResponseValidator;
use cockpit_core::AuditSink;
use cockpit_core::ControlMessage;
use cockpit_core::MemoryAuditSink;
use cockpit_core::StatusCode;
use cockpit_core::empty_body;
use serde_json::json;

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Handler that replays a scripted reply per call.
struct Scripted<F>
where
    F: FnMut(usize, &ControlMessage) -> ControlMessage + Send + 'static,
{
    calls: usize,
    script: F,
}

impl<F> CommandHandler for Scripted<F>
where
    F: FnMut(usize, &ControlMessage) -> ControlMessage + Send + 'static,
{
    fn handle(&mut self, request: ControlMessage) -> ControlMessage {
        let reply = (self.script)(self.calls, &request);
        self.calls += 1;
        reply
    }
}

fn serve<F>(script: F) -> ServerHandle
where
    F: FnMut(usize, &ControlMessage) -> ControlMessage + Send + 'static,
{
    let addr: SocketAddr = "127.0.0.1:0".parse().unwrap();
    ControlServer::bind(
        addr,
        ServerSettings::new("test-agent"),
        Scripted {
            calls: 0,
            script,
        },
    )
    .unwrap()
}

fn agent_channel(server: &ServerHandle, timeout: Duration) -> ControlChannel {
    let validator = Arc::new(ResponseValidator::new(ChannelKind::InstanceAgent).unwrap());
    let settings = ChannelSettings::new("agent", server.local_addr().to_string())
        .with_timeout(timeout);
    ControlChannel::new(settings, validator)
}

fn throughput_request() -> ControlMessage {
    ControlMessage::request("throughput", empty_body())
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[test]
fn valid_response_is_returned() {
    let server = serve(|_, request| {
        ControlMessage::success(request.command(), json!({ "throughput": 7 }))
    });
    let channel = agent_channel(&server, Duration::from_secs(2));
    let response = channel.send(&throughput_request()).unwrap();
    assert!(response.is_success());
    assert_eq!(response.body["throughput"], 7);
    assert!(channel.is_connected());
}

#[test]
fn missing_body_field_is_protocol_violation() {
    let server = serve(|_, request| ControlMessage::success(request.command(), json!({})));
    let channel = agent_channel(&server, Duration::from_secs(2));
    let err = channel.send(&throughput_request()).unwrap_err();
    assert!(matches!(err, ChannelError::ProtocolViolation(_)), "{err}");
    // The exchange completed, so the connection stays usable.
    assert!(channel.is_connected());
}

#[test]
fn header_must_echo_issued_command() {
    let server = serve(|_, _| ControlMessage::success("workload", json!({ "executed": 1 })));
    let channel = agent_channel(&server, Duration::from_secs(2));
    let err = channel.send(&throughput_request()).unwrap_err();
    assert!(matches!(err, ChannelError::ProtocolViolation(_)));
}

#[test]
fn failure_reply_passes_with_error_body() {
    let server = serve(|_, request| {
        ControlMessage::failure(request.command(), StatusCode::NOT_IMPLEMENTED, "not implemented")
    });
    let channel = agent_channel(&server, Duration::from_secs(2));
    let response =
        channel.send(&ControlMessage::request("runtime_information", empty_body())).unwrap();
    assert_eq!(response.status(), Some(StatusCode::NOT_IMPLEMENTED));
    assert_eq!(response.error_message(), Some("not implemented"));
}

#[test]
fn unknown_command_reply_is_envelope_checked() {
    let server = serve(|_, request| {
        ControlMessage::failure(request.command(), StatusCode::BAD_REQUEST, "unknown command")
    });
    let channel = agent_channel(&server, Duration::from_secs(2));
    let response = channel.send(&ControlMessage::request("reboot", empty_body())).unwrap();
    assert_eq!(response.command(), "reboot");
    assert_eq!(response.status(), Some(StatusCode::BAD_REQUEST));
    assert_eq!(response.error_message(), Some("unknown command"));
}

#[test]
fn timeout_poisons_connection_and_next_call_rebuilds() {
    let server = serve(|call, request| {
        if call == 0 {
            thread::sleep(Duration::from_millis(400));
        }
        ControlMessage::success(request.command(), json!({ "throughput": call }))
    });
    let audit = Arc::new(MemoryAuditSink::new());
    let sink: Arc<dyn AuditSink> = audit.clone();
    let channel = agent_channel(&server, Duration::from_millis(150)).with_audit(sink);

    let err = channel.send(&throughput_request()).unwrap_err();
    assert!(matches!(
        err,
        ChannelError::Unavailable {
            kind: UnavailableKind::Timeout,
            ..
        }
    ));
    assert!(!channel.is_connected());
    assert_eq!(channel.rebuild_count(), 0);

    thread::sleep(Duration::from_millis(500));
    let response = channel.send(&throughput_request()).unwrap();
    assert_eq!(response.body["throughput"], 1);
    assert_eq!(channel.rebuild_count(), 1);
    assert_eq!(audit.events_named("channel_rebuild").len(), 1);
    let calls = audit.events_named("channel_call");
    assert_eq!(calls.len(), 2);
    assert_eq!(calls[0]["error_kind"], "channel_unavailable");
    assert_eq!(calls[1]["status"], 200);
}

#[test]
fn unreachable_peer_is_unavailable() {
    let validator = Arc::new(ResponseValidator::new(ChannelKind::InstanceAgent).unwrap());
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    let channel = ControlChannel::new(
        ChannelSettings::new("agent", addr.to_string()).with_timeout(Duration::from_millis(200)),
        validator,
    );
    let err = channel.send(&throughput_request()).unwrap_err();
    assert!(matches!(
        err,
        ChannelError::Unavailable {
            kind: UnavailableKind::Connect,
            ..
        }
    ));
}

#[test]
fn concurrent_callers_are_dispatched_one_at_a_time() {
    let in_flight = Arc::new(AtomicUsize::new(0));
    let peak = Arc::new(AtomicUsize::new(0));
    let handler_in_flight = Arc::clone(&in_flight);
    let handler_peak = Arc::clone(&peak);
    let server = serve(move |call, request| {
        let now = handler_in_flight.fetch_add(1, Ordering::AcqRel) + 1;
        handler_peak.fetch_max(now, Ordering::AcqRel);
        thread::sleep(Duration::from_millis(5));
        handler_in_flight.fetch_sub(1, Ordering::AcqRel);
        ControlMessage::success(request.command(), json!({ "throughput": call }))
    });
    let addr = server.local_addr();
    let workers: Vec<_> = (0 .. 4)
        .map(|_| {
            thread::spawn(move || {
                let validator =
                    Arc::new(ResponseValidator::new(ChannelKind::InstanceAgent).unwrap());
                let channel = ControlChannel::new(
                    ChannelSettings::new("agent", addr.to_string())
                        .with_timeout(Duration::from_secs(5)),
                    validator,
                );
                for _ in 0 .. 5 {
                    channel.send(&throughput_request()).unwrap();
                }
            })
        })
        .collect();
    for worker in workers {
        worker.join().unwrap();
    }
    assert_eq!(peak.load(Ordering::Acquire), 1);
}

#[test]
fn shared_channel_serializes_callers() {
    let server = serve(|call, request| {
        ControlMessage::success(request.command(), json!({ "throughput": call }))
    });
    let channel = Arc::new(agent_channel(&server, Duration::from_secs(5)));
    let workers: Vec<_> = (0 .. 4)
        .map(|_| {
            let channel = Arc::clone(&channel);
            thread::spawn(move || {
                (0 .. 10)
                    .map(|_| {
                        channel.send(&throughput_request()).unwrap().body["throughput"].clone()
                    })
                    .collect::<Vec<_>>()
            })
        })
        .collect();
    let mut seen: Vec<u64> = workers
        .into_iter()
        .flat_map(|worker| worker.join().unwrap())
        .map(|value| value.as_u64().unwrap())
        .collect();
    seen.sort_unstable();
    assert_eq!(seen, (0 .. 40).collect::<Vec<u64>>());
}

#[test]
fn malformed_request_gets_bad_request_reply() {
    let server = serve(|_, request| ControlMessage::success(request.command(), empty_body()));
    let mut stream = TcpStream::connect(server.local_addr()).unwrap();
    stream.set_read_timeout(Some(Duration::from_secs(2))).unwrap();
    write_frame(&mut stream, b"{not json").unwrap();
    stream.flush().unwrap();
    let mut reader = BufReader::new(stream.try_clone().unwrap());
    let bytes = read_frame(&mut reader, 4096).unwrap().unwrap();
    let reply: ControlMessage = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(reply.status(), Some(StatusCode::BAD_REQUEST));
    assert!(reply.error_message().unwrap().contains("malformed request"));

    // The connection keeps serving well-formed requests.
    let payload = serde_json::to_vec(&ControlMessage::request("query", empty_body())).unwrap();
    write_frame(&mut stream, &payload).unwrap();
    let bytes = read_frame(&mut reader, 4096).unwrap().unwrap();
    let reply: ControlMessage = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(reply.command(), "query");
    assert!(reply.is_success());
}

#[test]
fn shutdown_closes_open_connections() {
    let server = serve(|_, request| {
        ControlMessage::success(request.command(), json!({ "throughput": 0 }))
    });
    let channel = agent_channel(&server, Duration::from_secs(1));
    channel.send(&throughput_request()).unwrap();
    server.shutdown();
    let err = channel.send(&throughput_request()).unwrap_err();
    assert!(matches!(err, ChannelError::Unavailable { .. }));
    assert!(!channel.is_connected());
}

#[test]
fn closed_connections_are_released() {
    let server = serve(|_, request| {
        ControlMessage::success(request.command(), json!({ "throughput": 0 }))
    });
    let payload = serde_json::to_vec(&throughput_request()).unwrap();
    for _ in 0 .. 300 {
        let mut stream = TcpStream::connect(server.local_addr()).unwrap();
        stream.set_read_timeout(Some(Duration::from_secs(2))).unwrap();
        write_frame(&mut stream, &payload).unwrap();
        let mut reader = BufReader::new(stream.try_clone().unwrap());
        assert!(read_frame(&mut reader, 4096).unwrap().is_some());
    }
    let deadline = std::time::Instant::now() + Duration::from_secs(5);
    while server.open_connections() > 0 {
        assert!(
            std::time::Instant::now() < deadline,
            "{} connections still tracked",
            server.open_connections()
        );
        thread::sleep(Duration::from_millis(10));
    }

    let channel = agent_channel(&server, Duration::from_secs(1));
    channel.send(&throughput_request()).unwrap();
    assert_eq!(server.open_connections(), 1);
}
