//! FedPro Transport Layer
//!
//! This crate provides:
//! - The transport contract the session engine drives ([`Transport`],
//!   [`InboundSink`], [`Connector`])
//! - Endpoint and protocol selection
//! - An in-process transport pair for tests and simulation

pub mod memory;
pub mod transport;

pub use memory::*;
pub use transport::*;
