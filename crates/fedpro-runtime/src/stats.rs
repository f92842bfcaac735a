//! Per-session traffic counters

use std::sync::atomic::{AtomicU64, Ordering};

/// Point-in-time copy of the session counters
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RuntimeStats {
    /// Synchronous calls transmitted
    pub calls_sent: u64,
    pub responses_received: u64,
    /// Responses that carried an exception
    pub faults_received: u64,
    /// Fire-and-forget calls transmitted
    pub casts_sent: u64,
    pub callbacks_received: u64,
    pub callbacks_dispatched: u64,
    /// Callbacks acknowledged as failed (decode or handler error)
    pub callbacks_failed: u64,
}

#[derive(Debug, Default)]
pub(crate) struct Counters {
    pub calls_sent: AtomicU64,
    pub responses_received: AtomicU64,
    pub faults_received: AtomicU64,
    pub casts_sent: AtomicU64,
    pub callbacks_received: AtomicU64,
    pub callbacks_dispatched: AtomicU64,
    pub callbacks_failed: AtomicU64,
}

impl Counters {
    pub fn bump(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> RuntimeStats {
        let load = |c: &AtomicU64| c.load(Ordering::Relaxed);
        RuntimeStats {
            calls_sent: load(&self.calls_sent),
            responses_received: load(&self.responses_received),
            faults_received: load(&self.faults_received),
            casts_sent: load(&self.casts_sent),
            callbacks_received: load(&self.callbacks_received),
            callbacks_dispatched: load(&self.callbacks_dispatched),
            callbacks_failed: load(&self.callbacks_failed),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snapshot_reflects_bumps() {
        let counters = Counters::default();
        Counters::bump(&counters.calls_sent);
        Counters::bump(&counters.calls_sent);
        Counters::bump(&counters.callbacks_failed);
        let stats = counters.snapshot();
        assert_eq!(stats.calls_sent, 2);
        assert_eq!(stats.callbacks_failed, 1);
        assert_eq!(stats.casts_sent, 0);
    }
}
