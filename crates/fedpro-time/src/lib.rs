//! FedPro Time - Logical time for federation time management
//!
//! Two families share one contract:
//! - `HLAinteger64Time`: discrete, overflow-checked
//! - `HLAfloat64Time`: continuous, always makes progress by at least one ULP
//!
//! [`TimeFactory`] selects a family by its negotiated name and produces the
//! family-tagged [`TimeValue`] / [`IntervalValue`] used across the runtime.

pub mod factory;
pub mod float64;
pub mod integer64;
pub mod logical;

pub use factory::*;
pub use float64::*;
pub use integer64::*;
pub use logical::*;
