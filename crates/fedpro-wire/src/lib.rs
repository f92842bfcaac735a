//! FedPro Wire Protocol - Binary message format
//!
//! Every message exchanged with the coordinator is:
//! - A fixed 24-byte big-endian header
//! - A body whose layout depends on the message type
//!
//! Call and callback requests carry an [`Envelope`]: a u16 tag naming the
//! operation or callback, followed by its opaque payload.

pub mod envelope;
pub mod error;
pub mod header;
pub mod message;

pub use envelope::*;
pub use error::*;
pub use header::*;
pub use message::*;
