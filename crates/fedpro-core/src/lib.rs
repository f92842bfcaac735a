//! FedPro Core - Fundamental types shared by every FedPro crate
//!
//! This crate defines:
//! - Opaque handles, one type per handle kind
//! - The RTI fault taxonomy and the wire-name exception registry
//! - Big-endian payload reader/writer used by envelopes and callbacks
//! - Service enumerations (callback model, resign action, order type)

pub mod codec;
pub mod error;
pub mod exception;
pub mod handle;
pub mod service;

pub use codec::*;
pub use error::*;
pub use handle::*;
pub use service::*;
