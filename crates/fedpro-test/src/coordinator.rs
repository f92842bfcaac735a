//! Scripted coordinator
//!
//! Serves every connection opened through [`ScriptedCoordinator::connector`]
//! on its own thread: the handshake, heartbeats and session termination are
//! answered automatically, calls are recorded and answered from a per-tag
//! script (or a sensible default), and callbacks are pushed on demand.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use bytes::Bytes;
use fedpro_core::{
    FederateHandle, Handle, HandleKind, ObjectClass, ObjectInstance, PayloadWriter,
};
use fedpro_runtime::Callback;
use fedpro_time::TimeFactory;
use fedpro_transport::{Endpoint, MemoryConnector, MemoryPeer};
use fedpro_wire::{
    CallOutcome, CallbackOutcome, Envelope, Frame, Message, OperationTag, SessionStatus,
};
use parking_lot::Mutex;
use tracing::{debug, warn};

use crate::wait_until;

/// Scripted answer to one call
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Reply {
    Result(Bytes),
    Fault { name: String, details: String },
    /// Keep the call unanswered until [`ScriptedCoordinator::release_held`]
    Hold,
    /// Cut the connection instead of answering
    Sever(String),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RecordedCall {
    pub seq: u32,
    pub tag: u16,
    pub payload: Bytes,
}

impl RecordedCall {
    pub fn operation(&self) -> Option<OperationTag> {
        OperationTag::from_u16(self.tag)
    }
}

struct Shared {
    session_id: AtomicU64,
    status: Mutex<SessionStatus>,
    time_factory: Mutex<TimeFactory>,
    federate: FederateHandle,
    script: Mutex<HashMap<u16, VecDeque<Reply>>>,
    calls: Mutex<Vec<RecordedCall>>,
    held: Mutex<Vec<RecordedCall>>,
    callback_responses: Mutex<Vec<(u32, CallbackOutcome)>>,
    names: Mutex<HashMap<String, u32>>,
    heartbeats: AtomicU64,
    next_seq: AtomicU32,
    last_received: AtomicU32,
    peer: Mutex<Option<Arc<MemoryPeer>>>,
    stop: AtomicBool,
    servers: Mutex<Vec<JoinHandle<()>>>,
}

pub struct ScriptedCoordinator {
    shared: Arc<Shared>,
}

impl Default for ScriptedCoordinator {
    fn default() -> Self {
        Self::new()
    }
}

impl ScriptedCoordinator {
    pub fn new() -> Self {
        ScriptedCoordinator {
            shared: Arc::new(Shared {
                session_id: AtomicU64::new(0x5e55),
                status: Mutex::new(SessionStatus::Ok),
                time_factory: Mutex::new(TimeFactory::Integer64),
                federate: FederateHandle::from_u32(1),
                script: Mutex::new(HashMap::new()),
                calls: Mutex::new(Vec::new()),
                held: Mutex::new(Vec::new()),
                callback_responses: Mutex::new(Vec::new()),
                names: Mutex::new(HashMap::new()),
                heartbeats: AtomicU64::new(0),
                next_seq: AtomicU32::new(1),
                last_received: AtomicU32::new(0),
                peer: Mutex::new(None),
                stop: AtomicBool::new(false),
                servers: Mutex::new(Vec::new()),
            }),
        }
    }

    /// Time family handed out at join
    pub fn with_time_factory(self, factory: TimeFactory) -> Self {
        *self.shared.time_factory.lock() = factory;
        self
    }

    /// Answer new sessions with `status` instead of success.
    pub fn refuse_sessions(&self, status: SessionStatus) {
        *self.shared.status.lock() = status;
    }

    pub fn session_id(&self) -> u64 {
        self.shared.session_id.load(Ordering::SeqCst)
    }

    pub fn federate(&self) -> FederateHandle {
        self.shared.federate.clone()
    }

    /// Connector whose connections this coordinator serves.
    pub fn connector(&self) -> Arc<MemoryConnector> {
        let shared = Arc::clone(&self.shared);
        Arc::new(MemoryConnector::new(move |peer: MemoryPeer, endpoint: &Endpoint| {
            debug!(%endpoint, "coordinator accepted a connection");
            let peer = Arc::new(peer);
            *shared.peer.lock() = Some(Arc::clone(&peer));
            shared.session_id.fetch_add(1, Ordering::SeqCst);

            let server = Arc::clone(&shared);
            let spawned = thread::Builder::new()
                .name("fedpro-coordinator".into())
                .spawn(move || serve(server, peer));
            match spawned {
                Ok(handle) => shared.servers.lock().push(handle),
                Err(e) => warn!(error = %e, "coordinator thread not started"),
            }
        }))
    }

    /// Queue `reply` for the next call to `tag`.
    pub fn script(&self, tag: OperationTag, reply: Reply) {
        self.shared
            .script
            .lock()
            .entry(tag.to_u16())
            .or_default()
            .push_back(reply);
    }

    pub fn fault_next(&self, tag: OperationTag, name: &str, details: &str) {
        self.script(
            tag,
            Reply::Fault {
                name: name.into(),
                details: details.into(),
            },
        );
    }

    pub fn hold_next(&self, tag: OperationTag) {
        self.script(tag, Reply::Hold);
    }

    /// Answer every held call with its default result.
    pub fn release_held(&self) -> usize {
        let held: Vec<RecordedCall> = self.shared.held.lock().drain(..).collect();
        for call in &held {
            let payload = default_result(&self.shared, call);
            self.shared.send(&Message::CallResponse {
                response_to: call.seq,
                outcome: CallOutcome::Result(payload),
            });
        }
        held.len()
    }

    /// Push a callback; returns the sequence number it went out under.
    pub fn push_callback(&self, callback: &Callback) -> u32 {
        self.push_envelope(callback.encode())
    }

    pub fn push_envelope(&self, envelope: Envelope) -> u32 {
        self.shared.send(&Message::CallbackRequest(envelope))
    }

    /// Push any message, for protocol-level tests.
    pub fn push_message(&self, message: &Message) -> u32 {
        self.shared.send(message)
    }

    pub fn sever(&self, reason: &str) {
        if let Some(peer) = self.shared.peer.lock().as_ref() {
            peer.sever(reason);
        }
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.shared.calls.lock().clone()
    }

    pub fn calls_to(&self, tag: OperationTag) -> Vec<RecordedCall> {
        self.shared
            .calls
            .lock()
            .iter()
            .filter(|c| c.tag == tag.to_u16())
            .cloned()
            .collect()
    }

    pub fn call_count(&self, tag: OperationTag) -> usize {
        self.calls_to(tag).len()
    }

    pub fn callback_responses(&self) -> Vec<(u32, CallbackOutcome)> {
        self.shared.callback_responses.lock().clone()
    }

    pub fn heartbeats(&self) -> u64 {
        self.shared.heartbeats.load(Ordering::SeqCst)
    }

    pub fn wait_for_calls(&self, tag: OperationTag, count: usize, timeout: Duration) -> bool {
        wait_until(timeout, || self.call_count(tag) >= count)
    }

    pub fn wait_for_callback_responses(&self, count: usize, timeout: Duration) -> bool {
        wait_until(timeout, || self.shared.callback_responses.lock().len() >= count)
    }
}

impl Drop for ScriptedCoordinator {
    fn drop(&mut self) {
        self.shared.stop.store(true, Ordering::SeqCst);
        let servers: Vec<JoinHandle<()>> = self.shared.servers.lock().drain(..).collect();
        for server in servers {
            let _ = server.join();
        }
    }
}

impl Shared {
    fn send(&self, message: &Message) -> u32 {
        let seq = self.next_seq.fetch_add(1, Ordering::SeqCst);
        let packet = Frame::encode(
            message,
            seq,
            self.session_id.load(Ordering::SeqCst),
            self.last_received.load(Ordering::SeqCst),
        );
        if let Some(peer) = self.peer.lock().as_ref() {
            if let Err(e) = peer.send(packet) {
                debug!(error = %e, "coordinator send failed");
            }
        }
        seq
    }

    fn handle_id<K: HandleKind>(&self, name: &str) -> Handle<K> {
        let mut names = self.names.lock();
        let next = names.len() as u32 + 100;
        Handle::from_u32(*names.entry(name.to_string()).or_insert(next))
    }
}

fn serve(shared: Arc<Shared>, peer: Arc<MemoryPeer>) {
    let mut terminated = false;
    while !shared.stop.load(Ordering::SeqCst) && !terminated {
        let Some(packet) = peer.recv(Duration::from_millis(20)) else {
            if peer.is_severed() {
                break;
            }
            // recv returns at once when the client end is gone.
            thread::sleep(Duration::from_millis(5));
            continue;
        };
        let frame = match Frame::decode(&packet) {
            Ok(frame) => frame,
            Err(e) => {
                warn!(error = %e, "coordinator got an undecodable packet");
                continue;
            }
        };
        let seq = frame.header.sequence_number;
        shared.last_received.store(seq, Ordering::SeqCst);

        match frame.message {
            Message::NewSession { .. } => {
                let status = *shared.status.lock();
                shared.send(&Message::NewSessionStatus { status });
            }
            Message::Heartbeat => {
                shared.heartbeats.fetch_add(1, Ordering::SeqCst);
                shared.send(&Message::HeartbeatResponse { response_to: seq });
            }
            Message::TerminateSession => {
                shared.send(&Message::SessionTerminated);
                terminated = true;
            }
            Message::CallRequest(envelope) => {
                let call = RecordedCall {
                    seq,
                    tag: envelope.tag,
                    payload: envelope.payload,
                };
                shared.calls.lock().push(call.clone());
                answer(&shared, &peer, call);
            }
            Message::CallbackResponse {
                response_to,
                outcome,
            } => {
                shared.callback_responses.lock().push((response_to, outcome));
            }
            Message::HeartbeatResponse { .. } => {}
            other => warn!(message = other.message_type().name(), "coordinator ignored message"),
        }
    }
}

fn answer(shared: &Shared, peer: &MemoryPeer, call: RecordedCall) {
    let scripted = shared
        .script
        .lock()
        .get_mut(&call.tag)
        .and_then(|replies| replies.pop_front());

    let outcome = match scripted {
        Some(Reply::Hold) => {
            shared.held.lock().push(call);
            return;
        }
        Some(Reply::Sever(reason)) => {
            peer.sever(&reason);
            return;
        }
        Some(Reply::Fault { name, details }) => CallOutcome::Exception { name, details },
        Some(Reply::Result(payload)) => CallOutcome::Result(payload),
        None => CallOutcome::Result(default_result(shared, &call)),
    };
    shared.send(&Message::CallResponse {
        response_to: call.seq,
        outcome,
    });
}

/// What a cooperative coordinator would answer.
fn default_result(shared: &Shared, call: &RecordedCall) -> Bytes {
    use OperationTag::*;

    let mut w = PayloadWriter::new();
    let factory = *shared.time_factory.lock();
    match call.operation() {
        Some(JoinFederationExecution) => {
            w.put(&shared.federate).put(&factory);
        }
        Some(RegisterObjectInstance) => {
            let key = format!("object-{}", call.seq);
            w.put(&shared.handle_id::<ObjectInstance>(&key));
        }
        // Same name, same handle. Every handle kind shares one layout.
        Some(GetObjectClassHandle)
        | Some(GetInteractionClassHandle)
        | Some(GetAttributeHandle)
        | Some(GetParameterHandle) => {
            let key = format!("{}:{:?}", call.tag, call.payload);
            w.put(&shared.handle_id::<ObjectClass>(&key));
        }
        Some(QueryLogicalTime) => factory.make_initial().write_to(&mut w),
        Some(QueryGalt) => {
            w.put_bool(false);
        }
        Some(QueryLookahead) => factory.make_epsilon().write_to(&mut w),
        _ => {}
    }
    w.finish()
}
