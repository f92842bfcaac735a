//! Discrete time: `HLAinteger64Time`
//!
//! Times live in `[0, i64::MAX]`; intervals span the full signed range.
//! Arithmetic leaving either range is an `IllegalTimeArithmetic` fault.

use std::fmt;

use fedpro_core::{RtiError, RtiResult};

use crate::{LogicalTime, LogicalTimeInterval, ENCODED_LENGTH};

/// Discrete logical time
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Integer64Time(i64);

/// Discrete logical time interval
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Integer64Interval(i64);

impl Integer64Time {
    pub const NAME: &'static str = "HLAinteger64Time";

    /// Times below INITIAL are rejected.
    pub fn new(value: i64) -> RtiResult<Self> {
        if value < 0 {
            return Err(RtiError::InvalidLogicalTime(format!(
                "{} below initial time",
                value
            )));
        }
        Ok(Integer64Time(value))
    }

    #[inline]
    pub fn value(self) -> i64 {
        self.0
    }

    fn checked(value: Option<i64>, op: &str) -> RtiResult<Self> {
        match value {
            Some(v) if v >= 0 => Ok(Integer64Time(v)),
            Some(v) => Err(RtiError::IllegalTimeArithmetic(format!(
                "{} result {} below initial time",
                op, v
            ))),
            None => Err(RtiError::IllegalTimeArithmetic(format!(
                "calculation overflow in {}",
                op
            ))),
        }
    }
}

impl Integer64Interval {
    #[inline]
    pub fn new(value: i64) -> Self {
        Integer64Interval(value)
    }

    #[inline]
    pub fn value(self) -> i64 {
        self.0
    }
}

impl LogicalTime for Integer64Time {
    type Interval = Integer64Interval;

    const INITIAL: Self = Integer64Time(0);
    const FINAL: Self = Integer64Time(i64::MAX);

    #[inline]
    fn is_initial(&self) -> bool {
        *self == Self::INITIAL
    }

    #[inline]
    fn is_final(&self) -> bool {
        *self == Self::FINAL
    }

    fn add(&self, interval: Integer64Interval) -> RtiResult<Self> {
        Self::checked(self.0.checked_add(interval.0), "add")
    }

    fn subtract(&self, interval: Integer64Interval) -> RtiResult<Self> {
        Self::checked(self.0.checked_sub(interval.0), "subtract")
    }

    fn distance(&self, other: &Self) -> Integer64Interval {
        // Both operands are non-negative, so the difference fits.
        Integer64Interval(self.0.abs_diff(other.0) as i64)
    }

    #[inline]
    fn to_be_bytes(&self) -> [u8; ENCODED_LENGTH] {
        self.0.to_be_bytes()
    }

    fn from_be_bytes(bytes: [u8; ENCODED_LENGTH]) -> RtiResult<Self> {
        Integer64Time::new(i64::from_be_bytes(bytes))
            .map_err(|e| RtiError::CouldNotDecode(format!("{}: {}", Self::NAME, e)))
    }
}

impl LogicalTimeInterval for Integer64Interval {
    const ZERO: Self = Integer64Interval(0);
    const EPSILON: Self = Integer64Interval(1);

    #[inline]
    fn is_zero(&self) -> bool {
        self.0 == 0
    }

    #[inline]
    fn is_epsilon(&self) -> bool {
        self.0 == 1
    }

    fn add(&self, other: Self) -> RtiResult<Self> {
        self.0
            .checked_add(other.0)
            .map(Integer64Interval)
            .ok_or_else(|| RtiError::IllegalTimeArithmetic("calculation overflow in add".into()))
    }

    fn subtract(&self, other: Self) -> RtiResult<Self> {
        self.0
            .checked_sub(other.0)
            .map(Integer64Interval)
            .ok_or_else(|| {
                RtiError::IllegalTimeArithmetic("calculation overflow in subtract".into())
            })
    }

    #[inline]
    fn to_be_bytes(&self) -> [u8; ENCODED_LENGTH] {
        self.0.to_be_bytes()
    }

    #[inline]
    fn from_be_bytes(bytes: [u8; ENCODED_LENGTH]) -> RtiResult<Self> {
        Ok(Integer64Interval(i64::from_be_bytes(bytes)))
    }
}

impl fmt::Debug for Integer64Time {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

impl fmt::Display for Integer64Time {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_final() {
            write!(f, "HLAinteger64Time<INF>")
        } else {
            write!(f, "HLAinteger64Time<{}>", self.0)
        }
    }
}

impl fmt::Debug for Integer64Interval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

impl fmt::Display for Integer64Interval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "HLAinteger64Interval<{}>", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn t(v: i64) -> Integer64Time {
        Integer64Time::new(v).unwrap()
    }

    fn i(v: i64) -> Integer64Interval {
        Integer64Interval::new(v)
    }

    #[test]
    fn test_constants() {
        assert!(Integer64Time::INITIAL.is_initial());
        assert!(Integer64Time::FINAL.is_final());
        assert_eq!(Integer64Time::FINAL.value(), i64::MAX);
        assert!(Integer64Interval::ZERO.is_zero());
        assert!(Integer64Interval::EPSILON.is_epsilon());
    }

    #[test]
    fn test_subtract_below_initial() {
        let err = Integer64Time::INITIAL.subtract(i(1)).unwrap_err();
        assert!(matches!(err, RtiError::IllegalTimeArithmetic(_)));
    }

    #[test]
    fn test_add_past_final() {
        assert!(matches!(
            Integer64Time::FINAL.add(Integer64Interval::EPSILON),
            Err(RtiError::IllegalTimeArithmetic(_))
        ));
    }

    #[test]
    fn test_negative_interval() {
        assert_eq!(t(10).add(i(-4)).unwrap(), t(6));
        assert!(t(3).add(i(-4)).is_err());
    }

    #[test]
    fn test_interval_overflow() {
        assert!(i(i64::MAX).add(i(1)).is_err());
        assert!(i(i64::MIN).subtract(i(1)).is_err());
        assert_eq!(i(5).subtract(i(7)).unwrap(), i(-2));
    }

    #[test]
    fn test_distance() {
        assert_eq!(t(3).distance(&t(10)), i(7));
        assert_eq!(t(10).distance(&t(3)), i(7));
        assert_eq!(Integer64Time::INITIAL.distance(&Integer64Time::FINAL), i(i64::MAX));
    }

    #[test]
    fn test_display() {
        assert_eq!(t(42).to_string(), "HLAinteger64Time<42>");
        assert_eq!(Integer64Time::FINAL.to_string(), "HLAinteger64Time<INF>");
    }

    #[test]
    fn test_encode_at_offset() {
        let mut buf = [0xFFu8; 12];
        assert_eq!(t(0x0102).encode(&mut buf, 4).unwrap(), 8);
        assert_eq!(&buf[4..12], &[0, 0, 0, 0, 0, 0, 1, 2]);
        assert_eq!(Integer64Time::decode(&buf, 4).unwrap(), t(0x0102));
    }

    #[test]
    fn test_decode_short_and_negative() {
        assert!(matches!(
            Integer64Time::decode(&[0; 7], 0),
            Err(RtiError::CouldNotDecode(_))
        ));
        let negative = (-5i64).to_be_bytes();
        assert!(matches!(
            Integer64Time::decode(&negative, 0),
            Err(RtiError::CouldNotDecode(_))
        ));
        assert_eq!(Integer64Interval::decode(&negative, 0).unwrap(), i(-5));
    }

    proptest! {
        #[test]
        fn prop_add_then_subtract(a in 0i64..=i64::MAX / 2, b in 0i64..=i64::MAX / 2) {
            let sum = t(a).add(i(b)).unwrap();
            let mut buf = [0u8; 8];
            sum.encode(&mut buf, 0).unwrap();
            prop_assert_eq!(Integer64Time::decode(&buf, 0).unwrap(), sum);
            prop_assert_eq!(sum.subtract(i(b)).unwrap(), t(a));
        }

        #[test]
        fn prop_overflow_never_wraps(a in 0i64..=i64::MAX, b in any::<i64>()) {
            match t(a).add(i(b)) {
                Ok(sum) => prop_assert_eq!(sum.value() as i128, a as i128 + b as i128),
                Err(e) => prop_assert!(matches!(e, RtiError::IllegalTimeArithmetic(_))),
            }
        }
    }
}
