//! Continuous time: `HLAfloat64Time`
//!
//! Values compare with IEEE total order so they can key maps. FINAL is the
//! largest finite double.

use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};

use fedpro_core::{RtiError, RtiResult};

use crate::logical::ulp;
use crate::{LogicalTime, LogicalTimeInterval, ENCODED_LENGTH};

/// Continuous logical time
#[derive(Clone, Copy, Default)]
pub struct Float64Time(f64);

/// Continuous logical time interval
#[derive(Clone, Copy, Default)]
pub struct Float64Interval(f64);

/// `base + delta`, nudged one ULP toward the addend when rounding swallows it.
fn step(base: f64, delta: f64, op: &str) -> RtiResult<f64> {
    let mut result = base + delta;
    if result.is_infinite() {
        return Err(RtiError::IllegalTimeArithmetic(format!(
            "calculation overflow in {}",
            op
        )));
    }
    if result.to_bits() == base.to_bits() && delta != 0.0 {
        let nudge = ulp(base);
        result = if delta > 0.0 { base + nudge } else { base - nudge };
        if result.is_infinite() {
            return Err(RtiError::IllegalTimeArithmetic(format!(
                "calculation overflow in {}",
                op
            )));
        }
    }
    Ok(result)
}

impl Float64Time {
    pub const NAME: &'static str = "HLAfloat64Time";

    #[inline]
    pub fn new(value: f64) -> Self {
        Float64Time(value)
    }

    #[inline]
    pub fn value(self) -> f64 {
        self.0
    }
}

impl Float64Interval {
    #[inline]
    pub fn new(value: f64) -> Self {
        Float64Interval(value)
    }

    #[inline]
    pub fn value(self) -> f64 {
        self.0
    }
}

impl LogicalTime for Float64Time {
    type Interval = Float64Interval;

    const INITIAL: Self = Float64Time(0.0);
    const FINAL: Self = Float64Time(f64::MAX);

    fn is_initial(&self) -> bool {
        self.0 == 0.0
    }

    fn is_final(&self) -> bool {
        self.0 == f64::MAX
    }

    fn add(&self, interval: Float64Interval) -> RtiResult<Self> {
        step(self.0, interval.0, "add").map(Float64Time)
    }

    fn subtract(&self, interval: Float64Interval) -> RtiResult<Self> {
        step(self.0, -interval.0, "subtract").map(Float64Time)
    }

    fn distance(&self, other: &Self) -> Float64Interval {
        Float64Interval((self.0 - other.0).abs())
    }

    fn to_be_bytes(&self) -> [u8; ENCODED_LENGTH] {
        self.0.to_be_bytes()
    }

    fn from_be_bytes(bytes: [u8; ENCODED_LENGTH]) -> RtiResult<Self> {
        Ok(Float64Time(f64::from_be_bytes(bytes)))
    }
}

impl LogicalTimeInterval for Float64Interval {
    const ZERO: Self = Float64Interval(0.0);
    // Smallest positive subnormal, bit pattern 0x1
    const EPSILON: Self = Float64Interval(5e-324);

    fn is_zero(&self) -> bool {
        self.0 == 0.0
    }

    fn is_epsilon(&self) -> bool {
        self.0.to_bits() == 1
    }

    fn add(&self, other: Self) -> RtiResult<Self> {
        step(self.0, other.0, "add").map(Float64Interval)
    }

    fn subtract(&self, other: Self) -> RtiResult<Self> {
        step(self.0, -other.0, "subtract").map(Float64Interval)
    }

    fn to_be_bytes(&self) -> [u8; ENCODED_LENGTH] {
        self.0.to_be_bytes()
    }

    fn from_be_bytes(bytes: [u8; ENCODED_LENGTH]) -> RtiResult<Self> {
        Ok(Float64Interval(f64::from_be_bytes(bytes)))
    }
}

macro_rules! total_order {
    ($ty:ty) => {
        impl PartialEq for $ty {
            fn eq(&self, other: &Self) -> bool {
                self.0.total_cmp(&other.0) == Ordering::Equal
            }
        }

        impl Eq for $ty {}

        impl PartialOrd for $ty {
            fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
                Some(self.cmp(other))
            }
        }

        impl Ord for $ty {
            fn cmp(&self, other: &Self) -> Ordering {
                self.0.total_cmp(&other.0)
            }
        }

        impl Hash for $ty {
            fn hash<H: Hasher>(&self, state: &mut H) {
                self.0.to_bits().hash(state);
            }
        }

        impl fmt::Debug for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                fmt::Display::fmt(self, f)
            }
        }
    };
}

total_order!(Float64Time);
total_order!(Float64Interval);

impl fmt::Display for Float64Time {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_final() {
            write!(f, "HLAfloat64Time(INF)")
        } else {
            write!(f, "HLAfloat64Time({})", self.0)
        }
    }
}

impl fmt::Display for Float64Interval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "HLAfloat64Interval({})", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_sentinels() {
        assert!(Float64Time::INITIAL.is_initial());
        assert!(Float64Time::FINAL.is_final());
        assert!(Float64Interval::EPSILON.is_epsilon());
        assert!(Float64Interval::EPSILON.value() > 0.0);
        assert!(Float64Time::FINAL > Float64Time::new(1e300));
    }

    #[test]
    fn test_tiny_addend_still_advances() {
        let t = Float64Time::new(1.0e16);
        let next = t.add(Float64Interval::new(0.5)).unwrap();
        assert!(next > t);
        assert_eq!(next.value(), 1.0e16 + ulp(1.0e16));

        let back = t.subtract(Float64Interval::new(0.5)).unwrap();
        assert!(back < t);
    }

    #[test]
    fn test_epsilon_from_initial() {
        let t = Float64Time::INITIAL.add(Float64Interval::EPSILON).unwrap();
        assert!(t > Float64Time::INITIAL);
        assert_eq!(t.value().to_bits(), 1);
    }

    #[test]
    fn test_zero_addend_is_identity() {
        let t = Float64Time::new(3.5);
        assert_eq!(t.add(Float64Interval::ZERO).unwrap(), t);
    }

    #[test]
    fn test_overflow_to_infinity() {
        let err = Float64Time::FINAL.add(Float64Interval::new(f64::MAX)).unwrap_err();
        assert!(matches!(err, RtiError::IllegalTimeArithmetic(_)));
        assert!(Float64Interval::new(-f64::MAX)
            .subtract(Float64Interval::new(f64::MAX))
            .is_err());
    }

    #[test]
    fn test_final_plus_tiny_overflows() {
        // Nudging FINAL up one ULP lands on infinity.
        assert!(Float64Time::FINAL.add(Float64Interval::new(1.0)).is_err());
    }

    #[test]
    fn test_display() {
        assert_eq!(Float64Time::new(2.5).to_string(), "HLAfloat64Time(2.5)");
        assert_eq!(Float64Time::FINAL.to_string(), "HLAfloat64Time(INF)");
        assert_eq!(Float64Interval::new(1.0).to_string(), "HLAfloat64Interval(1)");
    }

    #[test]
    fn test_sentinels_roundtrip() {
        let mut buf = [0u8; 8];
        for t in [Float64Time::INITIAL, Float64Time::FINAL] {
            t.encode(&mut buf, 0).unwrap();
            assert_eq!(Float64Time::decode(&buf, 0).unwrap(), t);
        }
        Float64Interval::EPSILON.encode(&mut buf, 0).unwrap();
        assert!(Float64Interval::decode(&buf, 0).unwrap().is_epsilon());
    }

    #[test]
    fn test_total_order_in_sets() {
        use std::collections::BTreeSet;
        let set: BTreeSet<_> = [3.0, 1.0, 2.0, 1.0]
            .into_iter()
            .map(Float64Time::new)
            .collect();
        let values: Vec<f64> = set.into_iter().map(Float64Time::value).collect();
        assert_eq!(values, vec![1.0, 2.0, 3.0]);
    }

    proptest! {
        #[test]
        fn prop_nonzero_add_moves_forward(v in 0.0f64..1e300, d in 1e-300f64..1e10) {
            let t = Float64Time::new(v);
            let next = t.add(Float64Interval::new(d)).unwrap();
            prop_assert!(next > t);
        }

        #[test]
        fn prop_encode_decode_finite(v in any::<f64>().prop_filter("finite", |v| v.is_finite())) {
            let mut buf = [0u8; 16];
            Float64Time::new(v).encode(&mut buf, 3).unwrap();
            prop_assert_eq!(Float64Time::decode(&buf, 3).unwrap(), Float64Time::new(v));
        }
    }
}
