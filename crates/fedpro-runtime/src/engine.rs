//! Session engine: call correlation, heartbeats and connection loss
//!
//! Every outbound request gets the next per-session sequence number and a
//! one-shot completion slot keyed by that number. Inbound traffic arrives on
//! the transport's reader thread through [`SessionSink`]:
//!
//! ```text
//! CALL_RESPONSE      -> complete the pending slot
//! CALLBACK_REQUEST   -> callback queue (dispatcher delivers later)
//! HEARTBEAT          -> answered inline
//! NEW_SESSION_STATUS -> handshake slot
//! ```
//!
//! Connection loss is handled once per session: every pending slot fails
//! with `NotConnected`, legality resets and a synthetic `connectionLost`
//! callback is queued unless the application is the one disconnecting.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use bytes::Bytes;
use fedpro_core::{exception, FederateHandle, PayloadReader, RtiError, RtiResult};
use fedpro_time::TimeFactory;
use fedpro_transport::{InboundSink, Transport};
use fedpro_wire::{
    CallOutcome, CallbackOutcome, Envelope, Frame, Message, OperationTag, SessionStatus,
    PROTOCOL_VERSION,
};
use parking_lot::{Condvar, Mutex};
use tracing::{debug, info, trace, warn};

use crate::dispatch::CallbackQueue;
use crate::stats::Counters;
use crate::{ClientSettings, Legality};

/// One-shot completion slot. The first completion wins; later ones are
/// ignored.
pub(crate) struct Slot<T> {
    state: Mutex<SlotState<T>>,
    ready: Condvar,
}

struct SlotState<T> {
    completed: bool,
    value: Option<RtiResult<T>>,
}

impl<T> Slot<T> {
    pub fn new() -> Self {
        Slot {
            state: Mutex::new(SlotState {
                completed: false,
                value: None,
            }),
            ready: Condvar::new(),
        }
    }

    pub fn complete(&self, value: RtiResult<T>) -> bool {
        let mut state = self.state.lock();
        if state.completed {
            return false;
        }
        state.completed = true;
        state.value = Some(value);
        self.ready.notify_all();
        true
    }

    /// Wait for the outcome. `None` once `timeout` passes without one.
    pub fn wait(&self, timeout: Option<Duration>) -> Option<RtiResult<T>> {
        let deadline = timeout.map(|t| Instant::now() + t);
        let mut state = self.state.lock();
        loop {
            if let Some(value) = state.value.take() {
                return Some(value);
            }
            match deadline {
                Some(deadline) => {
                    if self.ready.wait_until(&mut state, deadline).timed_out() {
                        return state.value.take();
                    }
                }
                None => self.ready.wait(&mut state),
            }
        }
    }
}

enum Pending {
    /// A caller is blocked on the slot
    Blocking { tag: u16, slot: Arc<Slot<CallOutcome>> },
    /// Fire-and-forget; the response is only logged
    Detached(u16),
}

/// Timers taken from the client settings at connect
#[derive(Clone, Copy, Debug)]
pub(crate) struct SessionTimers {
    pub connect: Option<Duration>,
    pub call: Option<Duration>,
    pub heartbeat: Duration,
    /// Silence from the coordinator longer than this is connection loss
    pub liveness: Option<Duration>,
}

impl SessionTimers {
    pub fn from_settings(settings: &ClientSettings) -> Self {
        SessionTimers {
            connect: Some(settings.connect_timeout()).filter(|d| !d.is_zero()),
            call: settings.call_timeout(),
            heartbeat: settings.heartbeat_interval,
            liveness: settings.call_timeout(),
        }
    }
}

struct Stopper {
    stopped: Mutex<bool>,
    wake: Condvar,
}

pub(crate) struct Session {
    id: AtomicU64,
    transport: Box<dyn Transport>,
    timers: SessionTimers,
    next_seq: AtomicU32,
    last_received: AtomicU32,
    last_activity: Mutex<Instant>,
    send_lock: Mutex<()>,
    pending: Mutex<HashMap<u32, Pending>>,
    handshake: Slot<u64>,
    terminated: Slot<()>,
    lost: AtomicBool,
    closing: AtomicBool,
    queue: Arc<CallbackQueue>,
    legality: Arc<Legality>,
    counters: Arc<Counters>,
    heartbeat_stop: Arc<Stopper>,
    heartbeat: Mutex<Option<JoinHandle<()>>>,
}

impl Session {
    /// Start the transport and run the `NEW_SESSION` handshake.
    pub fn open(
        transport: Box<dyn Transport>,
        timers: SessionTimers,
        queue: Arc<CallbackQueue>,
        legality: Arc<Legality>,
        counters: Arc<Counters>,
    ) -> RtiResult<Arc<Session>> {
        let session = Arc::new(Session {
            id: AtomicU64::new(0),
            transport,
            timers,
            next_seq: AtomicU32::new(1),
            last_received: AtomicU32::new(0),
            last_activity: Mutex::new(Instant::now()),
            send_lock: Mutex::new(()),
            pending: Mutex::new(HashMap::new()),
            handshake: Slot::new(),
            terminated: Slot::new(),
            lost: AtomicBool::new(false),
            closing: AtomicBool::new(false),
            queue,
            legality,
            counters,
            heartbeat_stop: Arc::new(Stopper {
                stopped: Mutex::new(false),
                wake: Condvar::new(),
            }),
            heartbeat: Mutex::new(None),
        });

        let sink = Arc::new(SessionSink {
            session: Arc::downgrade(&session),
        });
        session.transport.start(sink)?;

        let outcome = session
            .transmit(&Message::NewSession {
                protocol_version: PROTOCOL_VERSION,
            })
            .and_then(|_| {
                session.handshake.wait(timers.connect).unwrap_or_else(|| {
                    Err(RtiError::ConnectionFailed(
                        "no NEW_SESSION_STATUS before the connect timeout".into(),
                    ))
                })
            });

        match outcome {
            Ok(id) => {
                session.id.store(id, Ordering::SeqCst);
                session.start_heartbeat()?;
                info!(session = id, "session established");
                Ok(session)
            }
            Err(e) => {
                session.closing.store(true, Ordering::SeqCst);
                session.transport.close();
                Err(e)
            }
        }
    }

    pub fn id(&self) -> u64 {
        self.id.load(Ordering::SeqCst)
    }

    pub fn is_lost(&self) -> bool {
        self.lost.load(Ordering::SeqCst)
    }

    pub fn frames_sent(&self) -> u64 {
        self.transport.frames_sent()
    }

    fn transmit(&self, message: &Message) -> RtiResult<u32> {
        let _order = self.send_lock.lock();
        self.transmit_locked(message)
    }

    fn transmit_locked(&self, message: &Message) -> RtiResult<u32> {
        let seq = self.next_seq.fetch_add(1, Ordering::SeqCst);
        let packet = Frame::encode(
            message,
            seq,
            self.id(),
            self.last_received.load(Ordering::SeqCst),
        );
        self.transport.send(packet)?;
        Ok(seq)
    }

    /// Send `envelope` under `entry` and return its sequence number.
    fn register_and_send(&self, envelope: Envelope, entry: Pending) -> RtiResult<u32> {
        if self.is_lost() {
            return Err(RtiError::NotConnected("session is gone".into()));
        }

        let _order = self.send_lock.lock();
        let seq = self.next_seq.load(Ordering::SeqCst);
        self.pending.lock().insert(seq, entry);

        // A loss that raced the insert has already drained the table.
        if self.is_lost() {
            self.pending.lock().remove(&seq);
            return Err(RtiError::NotConnected("session is gone".into()));
        }

        match self.transmit_locked(&Message::CallRequest(envelope)) {
            Ok(sent) => Ok(sent),
            Err(e) => {
                self.pending.lock().remove(&seq);
                Err(e)
            }
        }
    }

    /// Send a call and block for its outcome.
    pub fn call(&self, envelope: Envelope) -> RtiResult<Bytes> {
        let tag = envelope.tag;
        let slot = Arc::new(Slot::new());
        let entry = Pending::Blocking {
            tag,
            slot: slot.clone(),
        };
        let seq = self.register_and_send(envelope, entry)?;
        Counters::bump(&self.counters.calls_sent);
        trace!(session = self.id(), seq, op = tag, "call sent");

        match slot.wait(self.timers.call) {
            Some(Ok(CallOutcome::Result(payload))) => Ok(payload),
            Some(Ok(CallOutcome::Exception { name, details })) => {
                Err(exception::create(&name, &details))
            }
            Some(Err(e)) => Err(e),
            None => {
                self.pending.lock().remove(&seq);
                let waited = self.timers.call.unwrap_or_default();
                let reason = format!(
                    "no response to call {} within {}",
                    seq,
                    humantime::format_duration(waited)
                );
                self.connection_lost(&reason);
                Err(RtiError::RtiInternalError(reason))
            }
        }
    }

    /// Send a call without waiting for its response.
    pub fn cast(&self, envelope: Envelope) -> RtiResult<()> {
        let tag = envelope.tag;
        let seq = self.register_and_send(envelope, Pending::Detached(tag))?;
        Counters::bump(&self.counters.casts_sent);
        trace!(session = self.id(), seq, op = tag, "call sent without waiting");
        Ok(())
    }

    pub fn respond_callback(&self, seq: u32, outcome: CallbackOutcome) {
        if self.is_lost() {
            return;
        }
        let response = Message::CallbackResponse {
            response_to: seq,
            outcome,
        };
        if let Err(e) = self.transmit(&response) {
            debug!(session = self.id(), seq, error = %e, "callback response not sent");
        }
    }

    fn handle(&self, frame: Frame) {
        let seq = frame.header.sequence_number;
        self.last_received.store(seq, Ordering::SeqCst);
        *self.last_activity.lock() = Instant::now();

        match frame.message {
            Message::NewSessionStatus { status } => {
                let outcome = match status {
                    SessionStatus::Ok => Ok(frame.header.session_id),
                    refused => Err(RtiError::ConnectionFailed(format!(
                        "coordinator refused the session: {}",
                        refused.describe()
                    ))),
                };
                self.handshake.complete(outcome);
            }
            Message::Heartbeat => {
                if let Err(e) = self.transmit(&Message::HeartbeatResponse { response_to: seq }) {
                    debug!(session = self.id(), error = %e, "heartbeat response not sent");
                }
            }
            Message::HeartbeatResponse { response_to } => {
                trace!(session = self.id(), seq = response_to, "heartbeat answered");
            }
            Message::TerminateSession => {
                if let Err(e) = self.transmit(&Message::SessionTerminated) {
                    debug!(session = self.id(), error = %e, "session terminated reply not sent");
                }
                self.connection_lost("coordinator terminated the session");
            }
            Message::SessionTerminated => {
                self.terminated.complete(Ok(()));
            }
            Message::CallResponse {
                response_to,
                outcome,
            } => self.resolve(response_to, outcome),
            Message::CallbackRequest(envelope) => {
                Counters::bump(&self.counters.callbacks_received);
                trace!(session = self.id(), seq, callback = envelope.tag, "callback queued");
                self.queue.push_request(seq, envelope);
            }
            other => {
                warn!(
                    session = self.id(),
                    seq,
                    message = other.message_type().name(),
                    "unexpected message from coordinator"
                );
            }
        }
    }

    fn resolve(&self, response_to: u32, outcome: CallOutcome) {
        Counters::bump(&self.counters.responses_received);
        if let CallOutcome::Exception { .. } = outcome {
            Counters::bump(&self.counters.faults_received);
        }

        let entry = self.pending.lock().remove(&response_to);
        match entry {
            Some(Pending::Blocking { tag, slot }) => {
                if let CallOutcome::Result(payload) = &outcome {
                    self.note_result(tag, payload);
                }
                slot.complete(Ok(outcome));
            }
            Some(Pending::Detached(tag)) => {
                if let CallOutcome::Exception { name, details } = outcome {
                    warn!(
                        session = self.id(),
                        seq = response_to,
                        op = tag,
                        fault = %name,
                        details = %details,
                        "unacknowledged call failed"
                    );
                }
            }
            None => {
                warn!(session = self.id(), seq = response_to, "response for unknown call discarded");
            }
        }
    }

    /// Record membership from a join result before the next inbound frame,
    /// so callbacks queued behind it decode with the federation's time type.
    fn note_result(&self, tag: u16, payload: &Bytes) {
        if tag != OperationTag::JoinFederationExecution.to_u16() {
            return;
        }
        match join_time_factory(payload) {
            Ok(factory) => self.legality.joined(factory),
            Err(e) => debug!(session = self.id(), error = %e, "join result left to the caller"),
        }
    }

    /// Tear the session down after a failure. Runs once.
    pub fn connection_lost(&self, reason: &str) {
        if self.lost.swap(true, Ordering::SeqCst) {
            return;
        }
        let closing = self.closing.load(Ordering::SeqCst);

        let drained: Vec<Pending> = self.pending.lock().drain().map(|(_, p)| p).collect();
        for entry in drained {
            if let Pending::Blocking { slot, .. } = entry {
                slot.complete(Err(RtiError::NotConnected(reason.to_string())));
            }
        }
        self.handshake
            .complete(Err(RtiError::ConnectionFailed(reason.to_string())));
        self.terminated.complete(Ok(()));
        self.signal_heartbeat_stop();
        self.transport.close();

        if closing {
            debug!(session = self.id(), reason, "session closed");
        } else {
            warn!(session = self.id(), reason, "connection lost");
            self.legality.reset();
            self.queue.push_lost(reason);
        }
    }

    /// Orderly shutdown: `TERMINATE_SESSION`, bounded wait, then close.
    pub fn terminate(&self) {
        self.closing.store(true, Ordering::SeqCst);
        if !self.is_lost() && self.transmit(&Message::TerminateSession).is_ok() {
            let bound = self.timers.call.or(self.timers.connect);
            if self.terminated.wait(bound).is_none() {
                debug!(session = self.id(), "no SESSION_TERMINATED before the timeout");
            }
        }
        self.connection_lost("session terminated by the federate");
        self.join_heartbeat();
    }

    fn start_heartbeat(self: &Arc<Self>) -> RtiResult<()> {
        if self.timers.heartbeat.is_zero() {
            return Ok(());
        }
        let weak = Arc::downgrade(self);
        let stop = self.heartbeat_stop.clone();
        let interval = self.timers.heartbeat;
        let handle = thread::Builder::new()
            .name(format!("fedpro-heartbeat-{}", self.id()))
            .spawn(move || heartbeat_loop(weak, stop, interval))
            .map_err(|e| RtiError::RtiInternalError(format!("heartbeat thread: {}", e)))?;
        *self.heartbeat.lock() = Some(handle);
        Ok(())
    }

    fn signal_heartbeat_stop(&self) {
        let mut stopped = self.heartbeat_stop.stopped.lock();
        *stopped = true;
        self.heartbeat_stop.wake.notify_all();
    }

    fn join_heartbeat(&self) {
        self.signal_heartbeat_stop();
        let handle = self.heartbeat.lock().take();
        if let Some(handle) = handle {
            if handle.thread().id() != thread::current().id() {
                let _ = handle.join();
            }
        }
    }

    /// True when nothing has arrived for longer than the liveness bound.
    fn coordinator_silent(&self) -> Option<Duration> {
        let limit = self.timers.liveness?;
        let silent = self.last_activity.lock().elapsed();
        (silent > limit).then_some(silent)
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        self.closing.store(true, Ordering::SeqCst);
        self.join_heartbeat();
        self.transport.close();
    }
}

fn heartbeat_loop(session: Weak<Session>, stop: Arc<Stopper>, interval: Duration) {
    loop {
        {
            let mut stopped = stop.stopped.lock();
            if !*stopped {
                stop.wake.wait_for(&mut stopped, interval);
            }
            if *stopped {
                return;
            }
        }

        let Some(session) = session.upgrade() else {
            return;
        };
        if let Some(silent) = session.coordinator_silent() {
            session.connection_lost(&format!(
                "coordinator silent for {}",
                humantime::format_duration(Duration::from_millis(silent.as_millis() as u64))
            ));
            return;
        }
        if let Err(e) = session.transmit(&Message::Heartbeat) {
            debug!(session = session.id(), error = %e, "heartbeat not sent");
            return;
        }
    }
}

fn join_time_factory(payload: &Bytes) -> RtiResult<TimeFactory> {
    let mut r = PayloadReader::new(payload.clone());
    let _federate: FederateHandle = r.get()?;
    let factory: TimeFactory = r.get()?;
    r.finish()?;
    Ok(factory)
}

/// Transport-facing half of the session
struct SessionSink {
    session: Weak<Session>,
}

impl InboundSink for SessionSink {
    fn on_frame(&self, packet: Bytes) {
        let Some(session) = self.session.upgrade() else {
            return;
        };
        match Frame::decode(&packet) {
            Ok(frame) => session.handle(frame),
            Err(e) => {
                warn!(session = session.id(), error = %e, len = packet.len(), "undecodable packet dropped")
            }
        }
    }

    fn on_connection_lost(&self, reason: &str) {
        if let Some(session) = self.session.upgrade() {
            session.connection_lost(reason);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fedpro_transport::{memory_pair, MemoryPeer};
    use fedpro_wire::MessageHeader;

    fn timers() -> SessionTimers {
        SessionTimers {
            connect: Some(Duration::from_secs(5)),
            call: Some(Duration::from_secs(5)),
            heartbeat: Duration::ZERO,
            liveness: None,
        }
    }

    fn reply(peer: &MemoryPeer, message: Message, session_id: u64) {
        peer.send(Frame::encode(&message, 1000, session_id, 0)).unwrap();
    }

    fn next_frame(peer: &MemoryPeer) -> Frame {
        let packet = peer.recv(Duration::from_secs(5)).expect("frame from client");
        Frame::decode(&packet).unwrap()
    }

    fn open_session(queue: Arc<CallbackQueue>) -> (Arc<Session>, MemoryPeer) {
        open_session_with(queue, Arc::new(Legality::new()))
    }

    /// Accept the handshake on a background thread and open a session.
    fn open_session_with(
        queue: Arc<CallbackQueue>,
        legality: Arc<Legality>,
    ) -> (Arc<Session>, MemoryPeer) {
        let (transport, peer) = memory_pair().unwrap();
        let accept = std::thread::spawn(move || {
            let frame = next_frame(&peer);
            assert_eq!(
                frame.message,
                Message::NewSession {
                    protocol_version: PROTOCOL_VERSION
                }
            );
            reply(&peer, Message::NewSessionStatus { status: SessionStatus::Ok }, 77);
            peer
        });
        let session = Session::open(
            Box::new(transport),
            timers(),
            queue,
            legality,
            Arc::new(Counters::default()),
        )
        .unwrap();
        (session, accept.join().unwrap())
    }

    #[test]
    fn test_slot_first_completion_wins() {
        let slot: Slot<u32> = Slot::new();
        assert!(slot.complete(Ok(1)));
        assert!(!slot.complete(Ok(2)));
        assert_eq!(slot.wait(None), Some(Ok(1)));
        assert_eq!(slot.wait(Some(Duration::from_millis(10))), None);
    }

    #[test]
    fn test_slot_times_out() {
        let slot: Slot<()> = Slot::new();
        let start = Instant::now();
        assert!(slot.wait(Some(Duration::from_millis(30))).is_none());
        assert!(start.elapsed() >= Duration::from_millis(30));
    }

    #[test]
    fn test_handshake_takes_session_id() {
        let (session, _peer) = open_session(Arc::new(CallbackQueue::new(16)));
        assert_eq!(session.id(), 77);
    }

    #[test]
    fn test_refused_session() {
        let (transport, peer) = memory_pair().unwrap();
        let accept = std::thread::spawn(move || {
            next_frame(&peer);
            reply(
                &peer,
                Message::NewSessionStatus {
                    status: SessionStatus::OutOfResources,
                },
                0,
            );
            peer
        });
        let result = Session::open(
            Box::new(transport),
            timers(),
            Arc::new(CallbackQueue::new(16)),
            Arc::new(Legality::new()),
            Arc::new(Counters::default()),
        );
        let _peer = accept.join().unwrap();
        assert!(matches!(result, Err(RtiError::ConnectionFailed(_))));
    }

    #[test]
    fn test_call_correlates_by_sequence() {
        let (session, peer) = open_session(Arc::new(CallbackQueue::new(16)));
        let coordinator = std::thread::spawn(move || {
            let frame = next_frame(&peer);
            let Message::CallRequest(envelope) = frame.message else {
                panic!("expected a call");
            };
            assert_eq!(envelope.tag, 42);
            // An unrelated response first; it must be discarded.
            reply(
                &peer,
                Message::CallResponse {
                    response_to: 9999,
                    outcome: CallOutcome::Result(Bytes::new()),
                },
                77,
            );
            reply(
                &peer,
                Message::CallResponse {
                    response_to: frame.header.sequence_number,
                    outcome: CallOutcome::Result(Bytes::from_static(b"ok")),
                },
                77,
            );
            peer
        });
        let result = session.call(Envelope::new(42, Bytes::new())).unwrap();
        let _peer = coordinator.join().unwrap();
        assert_eq!(result, Bytes::from_static(b"ok"));
        assert_eq!(session.counters.snapshot().responses_received, 2);
    }

    #[test]
    fn test_call_fault_is_typed() {
        let (session, peer) = open_session(Arc::new(CallbackQueue::new(16)));
        let coordinator = std::thread::spawn(move || {
            let frame = next_frame(&peer);
            reply(
                &peer,
                Message::CallResponse {
                    response_to: frame.header.sequence_number,
                    outcome: CallOutcome::Exception {
                        name: "InvalidLogicalTime".into(),
                        details: "in the past".into(),
                    },
                },
                77,
            );
            peer
        });
        let err = session.call(Envelope::new(74, Bytes::new())).unwrap_err();
        let _peer = coordinator.join().unwrap();
        assert_eq!(err, RtiError::InvalidLogicalTime("in the past".into()));
    }

    #[test]
    fn test_loss_fails_pending_and_queues_one_notice() {
        let queue = Arc::new(CallbackQueue::new(16));
        let (session, peer) = open_session(queue.clone());
        let waiter = {
            let session = session.clone();
            std::thread::spawn(move || session.call(Envelope::new(1, Bytes::new())))
        };
        next_frame(&peer);
        peer.sever("cable cut");

        assert!(matches!(waiter.join().unwrap(), Err(RtiError::NotConnected(_))));
        session.connection_lost("again");
        assert_eq!(queue.len(), 1);
        assert!(matches!(
            session.call(Envelope::new(1, Bytes::new())),
            Err(RtiError::NotConnected(_))
        ));
    }

    #[test]
    fn test_call_timeout_marks_session_lost() {
        let (transport, peer) = memory_pair().unwrap();
        let accept = std::thread::spawn(move || {
            next_frame(&peer);
            reply(&peer, Message::NewSessionStatus { status: SessionStatus::Ok }, 5);
            peer
        });
        let session = Session::open(
            Box::new(transport),
            SessionTimers {
                call: Some(Duration::from_millis(50)),
                ..timers()
            },
            Arc::new(CallbackQueue::new(16)),
            Arc::new(Legality::new()),
            Arc::new(Counters::default()),
        )
        .unwrap();
        let _peer = accept.join().unwrap();

        let err = session.call(Envelope::new(3, Bytes::new())).unwrap_err();
        assert!(matches!(err, RtiError::RtiInternalError(_)));
        assert!(session.is_lost());
    }

    #[test]
    fn test_heartbeat_answered() {
        let (_session, peer) = open_session(Arc::new(CallbackQueue::new(16)));
        peer.send(Frame::encode(&Message::Heartbeat, 321, 77, 0)).unwrap();
        let frame = next_frame(&peer);
        assert_eq!(frame.message, Message::HeartbeatResponse { response_to: 321 });
        assert_eq!(frame.header.last_received_sequence_number, 321);
        assert_eq!(frame.header.session_id, 77);
    }

    #[test]
    fn test_terminate_round_trip() {
        let queue = Arc::new(CallbackQueue::new(16));
        let (session, peer) = open_session(queue.clone());
        let coordinator = std::thread::spawn(move || {
            let frame = next_frame(&peer);
            assert_eq!(frame.message, Message::TerminateSession);
            reply(&peer, Message::SessionTerminated, 77);
            peer
        });
        session.terminate();
        let _peer = coordinator.join().unwrap();
        assert!(session.is_lost());
        // Orderly shutdown queues no connectionLost.
        assert_eq!(queue.len(), 0);
    }

    #[test]
    fn test_join_result_recorded_before_later_frames() {
        let legality = Arc::new(Legality::new());
        legality.mark_connected();
        let queue = Arc::new(CallbackQueue::new(16));
        let (session, peer) = open_session_with(queue.clone(), legality.clone());
        let join = OperationTag::JoinFederationExecution.to_u16();
        let coordinator = std::thread::spawn(move || {
            let frame = next_frame(&peer);
            let mut w = fedpro_core::PayloadWriter::new();
            w.put(&FederateHandle::from_u32(4)).put(&TimeFactory::Float64);
            reply(
                &peer,
                Message::CallResponse {
                    response_to: frame.header.sequence_number,
                    outcome: CallOutcome::Result(w.finish()),
                },
                77,
            );
            peer
        });
        session.call(Envelope::new(join, Bytes::new())).unwrap();
        let _peer = coordinator.join().unwrap();

        let flags = legality.snapshot();
        assert!(flags.joined);
        assert_eq!(flags.time_factory, Some(TimeFactory::Float64));
    }

    #[test]
    fn test_malformed_join_result_left_to_caller() {
        let legality = Arc::new(Legality::new());
        legality.mark_connected();
        let (session, peer) = open_session_with(Arc::new(CallbackQueue::new(16)), legality.clone());
        let join = OperationTag::JoinFederationExecution.to_u16();
        let coordinator = std::thread::spawn(move || {
            let frame = next_frame(&peer);
            reply(
                &peer,
                Message::CallResponse {
                    response_to: frame.header.sequence_number,
                    outcome: CallOutcome::Result(Bytes::from_static(b"\x01")),
                },
                77,
            );
            peer
        });
        let payload = session.call(Envelope::new(join, Bytes::new())).unwrap();
        let _peer = coordinator.join().unwrap();
        assert_eq!(payload, Bytes::from_static(b"\x01"));
        assert!(!legality.snapshot().joined);
    }

    #[test]
    fn test_coordinator_terminate_is_answered() {
        let queue = Arc::new(CallbackQueue::new(16));
        let (session, peer) = open_session(queue.clone());
        peer.send(Frame::encode(&Message::TerminateSession, 500, 77, 0)).unwrap();
        let frame = next_frame(&peer);
        assert_eq!(frame.message, Message::SessionTerminated);
        assert_eq!(frame.header.last_received_sequence_number, 500);
        let deadline = Instant::now() + Duration::from_secs(5);
        while queue.len() == 0 && Instant::now() < deadline {
            std::thread::sleep(Duration::from_millis(5));
        }
        assert!(session.is_lost());
        // Not the federate's doing, so the loss is reported.
        assert_eq!(queue.len(), 1);
    }

    #[test]
    fn test_header_of_first_call() {
        let (session, peer) = open_session(Arc::new(CallbackQueue::new(16)));
        session.cast(Envelope::new(51, Bytes::new())).unwrap();
        let frame = next_frame(&peer);
        let MessageHeader {
            sequence_number,
            session_id,
            ..
        } = frame.header;
        assert_eq!(sequence_number, 2);
        assert_eq!(session_id, 77);
    }
}
