//! FedPro Test Harness - End-to-end validation of the client runtime
//!
//! This crate provides:
//! - A scripted in-process coordinator speaking the full wire protocol
//! - A federate handler that records every delivery
//! - Scenario tests (`tests/`) and criterion benchmarks (`benches/`)

pub mod coordinator;
pub mod recording;

pub use coordinator::*;
pub use recording::*;

use std::time::{Duration, Instant};

/// Poll `cond` until it holds or `timeout` passes.
pub fn wait_until(timeout: Duration, mut cond: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + timeout;
    loop {
        if cond() {
            return true;
        }
        if Instant::now() >= deadline {
            return false;
        }
        std::thread::sleep(Duration::from_millis(2));
    }
}
