//! FedPro Runtime - Client session, callback dispatch and RTI ambassador
//!
//! An operation travels:
//! 1. Legality gate (connection, callback reentrancy, membership, save,
//!    restore, then operation-specific flags)
//! 2. Call engine (sequence number, pending slot, transmit)
//! 3. Outcome: typed result, typed fault, or connection failure
//!
//! A pushed callback travels:
//! 1. Transport reader thread into the callback queue
//! 2. Dispatcher (immediate thread or the evoking thread)
//! 3. Legality update, then the federate handler
//! 4. Callback response to the coordinator

pub mod ambassador;
pub mod callback;
pub mod config;
mod dispatch;
mod engine;
pub mod federate;
pub mod legality;
pub mod logging;
pub mod operation;
mod stats;

pub use ambassador::*;
pub use callback::Callback;
pub use config::*;
pub use federate::*;
pub use legality::*;
pub use logging::*;
pub use operation::*;
pub use stats::RuntimeStats;
