//! Callback queue, reentrancy guard and dispatcher
//!
//! Pushed callbacks wait in a FIFO queue. They are delivered one at a time,
//! either by a dedicated thread (immediate model) or by the application
//! thread that evokes them (evoked model). Before the handler runs, the
//! callback's legality transition is applied and the delivering thread is
//! recorded as the current callback thread.

use std::any::Any;
use std::collections::VecDeque;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use std::thread::{self, JoinHandle, ThreadId};
use std::time::{Duration, Instant};

use fedpro_core::{CallbackModel, RtiError, RtiResult};
use fedpro_wire::{CallbackOutcome, Envelope};
use parking_lot::{Condvar, Mutex};
use tracing::{debug, warn};

use crate::engine::Session;
use crate::stats::Counters;
use crate::{Callback, FederateAmbassador, Legality};

pub(crate) enum Queued {
    Request { seq: u32, envelope: Envelope },
    ConnectionLost(String),
    /// Ends the immediate dispatch thread
    Stop,
}

struct QueueState {
    items: VecDeque<Queued>,
    enabled: bool,
    in_progress: bool,
    stopping: bool,
    backlog_warned: bool,
}

pub(crate) struct CallbackQueue {
    state: Mutex<QueueState>,
    changed: Condvar,
    backlog_limit: usize,
}

impl CallbackQueue {
    pub fn new(backlog_limit: usize) -> Self {
        CallbackQueue {
            state: Mutex::new(QueueState {
                items: VecDeque::new(),
                enabled: true,
                in_progress: false,
                stopping: false,
                backlog_warned: false,
            }),
            changed: Condvar::new(),
            backlog_limit,
        }
    }

    fn push(&self, item: Queued) {
        let mut state = self.state.lock();
        state.items.push_back(item);
        if self.backlog_limit > 0 && state.items.len() > self.backlog_limit {
            if !state.backlog_warned {
                state.backlog_warned = true;
                warn!(queued = state.items.len(), "callback backlog above configured size");
            }
        } else {
            state.backlog_warned = false;
        }
        self.changed.notify_all();
    }

    pub fn push_request(&self, seq: u32, envelope: Envelope) {
        self.push(Queued::Request { seq, envelope });
    }

    pub fn push_lost(&self, reason: &str) {
        self.push(Queued::ConnectionLost(reason.to_string()));
    }

    /// Queue the stop marker behind everything already queued.
    pub fn stop(&self) {
        self.state.lock().stopping = true;
        self.push(Queued::Stop);
    }

    /// Number of callbacks waiting, the stop marker excluded.
    pub fn len(&self) -> usize {
        self.state
            .lock()
            .items
            .iter()
            .filter(|item| !matches!(item, Queued::Stop))
            .count()
    }

    pub fn has_pending(&self) -> bool {
        self.len() > 0
    }

    pub fn set_enabled(&self, enabled: bool) {
        self.state.lock().enabled = enabled;
        self.changed.notify_all();
    }

    /// Take the next deliverable item, waiting until `deadline` (forever
    /// with `None`). A stopping queue with delivery disabled yields `Stop`
    /// immediately.
    fn next(&self, deadline: Option<Instant>) -> Option<Queued> {
        let mut state = self.state.lock();
        loop {
            if state.enabled && !state.in_progress {
                if let Some(item) = state.items.pop_front() {
                    state.in_progress = !matches!(item, Queued::Stop);
                    return Some(item);
                }
            }
            if state.stopping && !state.enabled {
                return Some(Queued::Stop);
            }
            match deadline {
                Some(deadline) if Instant::now() >= deadline => return None,
                Some(deadline) => {
                    self.changed.wait_until(&mut state, deadline);
                }
                None => self.changed.wait(&mut state),
            }
        }
    }

    fn done(&self) {
        self.state.lock().in_progress = false;
        self.changed.notify_all();
    }

    /// Block while a handler invocation is running.
    fn wait_idle(&self) {
        let mut state = self.state.lock();
        while state.in_progress {
            self.changed.wait(&mut state);
        }
    }
}

/// Records which thread, if any, is running a federate handler.
#[derive(Debug, Default)]
pub(crate) struct CallbackGuard {
    current: Mutex<Option<ThreadId>>,
}

impl CallbackGuard {
    pub fn is_current(&self) -> bool {
        *self.current.lock() == Some(thread::current().id())
    }

    fn enter(&self) -> GuardScope<'_> {
        *self.current.lock() = Some(thread::current().id());
        GuardScope { guard: self }
    }
}

struct GuardScope<'a> {
    guard: &'a CallbackGuard,
}

impl Drop for GuardScope<'_> {
    fn drop(&mut self) {
        *self.guard.current.lock() = None;
    }
}

pub(crate) struct Dispatcher {
    model: CallbackModel,
    queue: Arc<CallbackQueue>,
    guard: Arc<CallbackGuard>,
    federate: Mutex<Box<dyn FederateAmbassador>>,
    legality: Arc<Legality>,
    session: Arc<Session>,
    counters: Arc<Counters>,
    thread: Mutex<Option<JoinHandle<()>>>,
}

impl Dispatcher {
    pub fn new(
        model: CallbackModel,
        queue: Arc<CallbackQueue>,
        guard: Arc<CallbackGuard>,
        federate: Box<dyn FederateAmbassador>,
        legality: Arc<Legality>,
        session: Arc<Session>,
        counters: Arc<Counters>,
    ) -> Arc<Self> {
        Arc::new(Dispatcher {
            model,
            queue,
            guard,
            federate: Mutex::new(federate),
            legality,
            session,
            counters,
            thread: Mutex::new(None),
        })
    }

    pub fn model(&self) -> CallbackModel {
        self.model
    }

    /// Spawn the dispatch thread for the immediate model.
    pub fn start(self: &Arc<Self>) -> RtiResult<()> {
        if self.model != CallbackModel::Immediate {
            return Ok(());
        }
        let dispatcher = self.clone();
        let handle = thread::Builder::new()
            .name(format!("fedpro-callback-{}", self.session.id()))
            .spawn(move || dispatcher.run())
            .map_err(|e| RtiError::RtiInternalError(format!("dispatch thread: {}", e)))?;
        *self.thread.lock() = Some(handle);
        Ok(())
    }

    fn run(&self) {
        debug!(session = self.session.id(), "dispatch thread started");
        loop {
            match self.queue.next(None) {
                Some(Queued::Stop) | None => break,
                Some(item) => {
                    self.deliver(item);
                    self.queue.done();
                }
            }
        }
        debug!(session = self.session.id(), "dispatch thread stopped");
    }

    /// Stop and join the dispatch thread once queued callbacks are delivered.
    pub fn stop(&self) {
        self.queue.stop();
        let handle = self.thread.lock().take();
        if let Some(handle) = handle {
            if handle.thread().id() != thread::current().id() {
                let _ = handle.join();
            }
        }
    }

    pub fn evoke_callback(&self, min_wait: Duration) -> RtiResult<bool> {
        self.check_evoke("evokeCallback")?;
        if self.model == CallbackModel::Immediate {
            return Ok(false);
        }
        if let Some(item) = self.queue.next(Some(Instant::now() + min_wait)) {
            self.deliver(item);
            self.queue.done();
        }
        Ok(self.queue.has_pending())
    }

    pub fn evoke_multiple_callbacks(&self, min_wait: Duration, max_wait: Duration) -> RtiResult<bool> {
        self.check_evoke("evokeMultipleCallbacks")?;
        if self.model == CallbackModel::Immediate {
            return Ok(false);
        }
        let start = Instant::now();
        let end = start + max_wait.max(min_wait);

        let Some(first) = self.queue.next(Some(start + min_wait)) else {
            return Ok(self.queue.has_pending());
        };
        self.deliver(first);
        self.queue.done();

        while Instant::now() < end {
            match self.queue.next(Some(Instant::now())) {
                Some(item) => {
                    self.deliver(item);
                    self.queue.done();
                }
                None => break,
            }
        }
        Ok(self.queue.has_pending())
    }

    fn check_evoke(&self, op: &str) -> RtiResult<()> {
        if self.guard.is_current() {
            return Err(RtiError::CallNotAllowedFromWithinCallback(format!(
                "{} called from a callback handler",
                op
            )));
        }
        Ok(())
    }

    pub fn enable(&self) {
        self.queue.set_enabled(true);
    }

    /// Stop delivery. From outside a handler, also wait for a running one.
    pub fn disable(&self) {
        self.queue.set_enabled(false);
        if !self.guard.is_current() {
            self.queue.wait_idle();
        }
    }

    fn deliver(&self, item: Queued) {
        match item {
            Queued::Request { seq, envelope } => {
                let callback = match Callback::decode(&envelope, self.legality.time_factory()) {
                    Ok(callback) => callback,
                    Err(e) => {
                        Counters::bump(&self.counters.callbacks_failed);
                        warn!(
                            session = self.session.id(),
                            seq,
                            callback = envelope.tag,
                            error = %e,
                            "undecodable callback skipped"
                        );
                        self.session.respond_callback(seq, failed(&e));
                        return;
                    }
                };
                let outcome = self.invoke(&callback);
                self.session.respond_callback(seq, outcome);
            }
            Queued::ConnectionLost(reason) => {
                self.invoke(&Callback::ConnectionLost { reason });
            }
            Queued::Stop => {}
        }
    }

    fn invoke(&self, callback: &Callback) -> CallbackOutcome {
        self.legality.apply_callback(callback);

        let result = {
            let _scope = self.guard.enter();
            let mut federate = self.federate.lock();
            catch_unwind(AssertUnwindSafe(|| callback.deliver(federate.as_mut())))
        };

        let error = match result {
            Ok(Ok(())) => {
                Counters::bump(&self.counters.callbacks_dispatched);
                debug!(session = self.session.id(), callback = callback.name(), "callback delivered");
                return CallbackOutcome::Succeeded;
            }
            Ok(Err(e)) => e,
            Err(panic) => RtiError::FederateInternalError(panic_message(panic)),
        };

        Counters::bump(&self.counters.callbacks_failed);
        warn!(
            session = self.session.id(),
            callback = callback.name(),
            fault = error.name(),
            details = error.details(),
            "federate handler failed"
        );
        failed(&error)
    }
}

fn failed(error: &RtiError) -> CallbackOutcome {
    CallbackOutcome::Failed {
        name: error.name().to_string(),
        details: error.details().to_string(),
    }
}

fn panic_message(panic: Box<dyn Any + Send>) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "handler panicked".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;

    fn request(seq: u32) -> Queued {
        Queued::Request {
            seq,
            envelope: Envelope::new(21, Bytes::new()),
        }
    }

    fn seq_of(item: Option<Queued>) -> Option<u32> {
        match item {
            Some(Queued::Request { seq, .. }) => Some(seq),
            _ => None,
        }
    }

    #[test]
    fn test_queue_fifo() {
        let queue = CallbackQueue::new(0);
        queue.push(request(1));
        queue.push(request(2));
        assert_eq!(seq_of(queue.next(Some(Instant::now()))), Some(1));
        queue.done();
        assert_eq!(seq_of(queue.next(Some(Instant::now()))), Some(2));
        queue.done();
        assert!(queue.next(Some(Instant::now())).is_none());
    }

    #[test]
    fn test_disabled_queue_holds_items() {
        let queue = CallbackQueue::new(0);
        queue.push(request(1));
        queue.set_enabled(false);
        assert!(queue.next(Some(Instant::now() + Duration::from_millis(20))).is_none());
        assert!(queue.has_pending());
        queue.set_enabled(true);
        assert_eq!(seq_of(queue.next(None)), Some(1));
    }

    #[test]
    fn test_one_item_in_flight() {
        let queue = CallbackQueue::new(0);
        queue.push(request(1));
        queue.push(request(2));
        assert!(queue.next(None).is_some());
        // The first is still being handled.
        assert!(queue.next(Some(Instant::now())).is_none());
        queue.done();
        assert_eq!(seq_of(queue.next(None)), Some(2));
    }

    #[test]
    fn test_stop_behind_pending_and_when_disabled() {
        let queue = CallbackQueue::new(0);
        queue.push(request(1));
        queue.stop();
        assert_eq!(queue.len(), 1);
        assert_eq!(seq_of(queue.next(None)), Some(1));
        queue.done();
        assert!(matches!(queue.next(None), Some(Queued::Stop)));

        let disabled = CallbackQueue::new(0);
        disabled.push(request(7));
        disabled.set_enabled(false);
        disabled.stop();
        assert!(matches!(disabled.next(None), Some(Queued::Stop)));
    }

    #[test]
    fn test_wakes_waiter() {
        let queue = Arc::new(CallbackQueue::new(0));
        let waiter = {
            let queue = queue.clone();
            thread::spawn(move || seq_of(queue.next(Some(Instant::now() + Duration::from_secs(5)))))
        };
        thread::sleep(Duration::from_millis(20));
        queue.push(request(9));
        assert_eq!(waiter.join().unwrap(), Some(9));
    }

    #[test]
    fn test_guard_scope() {
        let guard = Arc::new(CallbackGuard::default());
        {
            let _scope = guard.enter();
            assert!(guard.is_current());
            let other = guard.clone();
            assert!(!thread::spawn(move || other.is_current()).join().unwrap());
        }
        assert!(!guard.is_current());
    }

    #[test]
    fn test_panic_message() {
        let caught = catch_unwind(|| panic!("bad handler")).unwrap_err();
        assert_eq!(panic_message(caught), "bad handler");
    }
}
