//! Time factory registry
//!
//! The coordinator negotiates a factory name at join. Everything above this
//! crate handles times through [`TimeValue`] / [`IntervalValue`], which carry
//! the family along with the value so that mixing families is caught at the
//! operation rather than silently reinterpreted.

use std::cmp::Ordering;
use std::fmt;

use fedpro_core::{Payload, PayloadReader, PayloadWriter, RtiError, RtiResult};

use crate::{
    Float64Interval, Float64Time, Integer64Interval, Integer64Time, LogicalTime,
    LogicalTimeInterval, ENCODED_LENGTH,
};

/// A logical time family
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TimeFactory {
    Integer64,
    Float64,
}

impl TimeFactory {
    pub const INTEGER64_NAME: &'static str = "HLAinteger64Time";
    pub const FLOAT64_NAME: &'static str = "HLAfloat64Time";

    /// Resolve a negotiated factory name.
    pub fn by_name(name: &str) -> RtiResult<Self> {
        match name {
            Self::INTEGER64_NAME => Ok(TimeFactory::Integer64),
            Self::FLOAT64_NAME => Ok(TimeFactory::Float64),
            other => Err(RtiError::CouldNotCreateLogicalTimeFactory(format!(
                "unknown logical time factory '{}'",
                other
            ))),
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            TimeFactory::Integer64 => Self::INTEGER64_NAME,
            TimeFactory::Float64 => Self::FLOAT64_NAME,
        }
    }

    pub fn make_initial(self) -> TimeValue {
        match self {
            TimeFactory::Integer64 => TimeValue::Integer64(Integer64Time::INITIAL),
            TimeFactory::Float64 => TimeValue::Float64(Float64Time::INITIAL),
        }
    }

    pub fn make_final(self) -> TimeValue {
        match self {
            TimeFactory::Integer64 => TimeValue::Integer64(Integer64Time::FINAL),
            TimeFactory::Float64 => TimeValue::Float64(Float64Time::FINAL),
        }
    }

    pub fn make_zero(self) -> IntervalValue {
        match self {
            TimeFactory::Integer64 => IntervalValue::Integer64(Integer64Interval::ZERO),
            TimeFactory::Float64 => IntervalValue::Float64(Float64Interval::ZERO),
        }
    }

    pub fn make_epsilon(self) -> IntervalValue {
        match self {
            TimeFactory::Integer64 => IntervalValue::Integer64(Integer64Interval::EPSILON),
            TimeFactory::Float64 => IntervalValue::Float64(Float64Interval::EPSILON),
        }
    }

    pub fn decode_time(self, buf: &[u8], offset: usize) -> RtiResult<TimeValue> {
        Ok(match self {
            TimeFactory::Integer64 => TimeValue::Integer64(Integer64Time::decode(buf, offset)?),
            TimeFactory::Float64 => TimeValue::Float64(Float64Time::decode(buf, offset)?),
        })
    }

    pub fn decode_interval(self, buf: &[u8], offset: usize) -> RtiResult<IntervalValue> {
        Ok(match self {
            TimeFactory::Integer64 => {
                IntervalValue::Integer64(Integer64Interval::decode(buf, offset)?)
            }
            TimeFactory::Float64 => IntervalValue::Float64(Float64Interval::decode(buf, offset)?),
        })
    }

    /// Read an eight-byte time from a payload.
    pub fn read_time(self, r: &mut PayloadReader) -> RtiResult<TimeValue> {
        let raw = r.get_raw(ENCODED_LENGTH)?;
        self.decode_time(&raw, 0)
    }

    pub fn read_interval(self, r: &mut PayloadReader) -> RtiResult<IntervalValue> {
        let raw = r.get_raw(ENCODED_LENGTH)?;
        self.decode_interval(&raw, 0)
    }
}

impl fmt::Display for TimeFactory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A logical time of either family
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TimeValue {
    Integer64(Integer64Time),
    Float64(Float64Time),
}

/// A logical time interval of either family
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum IntervalValue {
    Integer64(Integer64Interval),
    Float64(Float64Interval),
}

fn mixed_time(a: impl fmt::Display, b: impl fmt::Display) -> RtiError {
    RtiError::InvalidLogicalTime(format!("cannot combine {} with {}", a, b))
}

fn mixed_interval(a: impl fmt::Display, b: impl fmt::Display) -> RtiError {
    RtiError::InvalidLogicalTimeInterval(format!("cannot combine {} with {}", a, b))
}

impl TimeValue {
    pub fn factory(&self) -> TimeFactory {
        match self {
            TimeValue::Integer64(_) => TimeFactory::Integer64,
            TimeValue::Float64(_) => TimeFactory::Float64,
        }
    }

    pub fn is_initial(&self) -> bool {
        match self {
            TimeValue::Integer64(t) => t.is_initial(),
            TimeValue::Float64(t) => t.is_initial(),
        }
    }

    pub fn is_final(&self) -> bool {
        match self {
            TimeValue::Integer64(t) => t.is_final(),
            TimeValue::Float64(t) => t.is_final(),
        }
    }

    pub fn add(&self, interval: &IntervalValue) -> RtiResult<TimeValue> {
        match (self, interval) {
            (TimeValue::Integer64(t), IntervalValue::Integer64(i)) => {
                t.add(*i).map(TimeValue::Integer64)
            }
            (TimeValue::Float64(t), IntervalValue::Float64(i)) => t.add(*i).map(TimeValue::Float64),
            _ => Err(mixed_time(self, interval)),
        }
    }

    pub fn subtract(&self, interval: &IntervalValue) -> RtiResult<TimeValue> {
        match (self, interval) {
            (TimeValue::Integer64(t), IntervalValue::Integer64(i)) => {
                t.subtract(*i).map(TimeValue::Integer64)
            }
            (TimeValue::Float64(t), IntervalValue::Float64(i)) => {
                t.subtract(*i).map(TimeValue::Float64)
            }
            _ => Err(mixed_time(self, interval)),
        }
    }

    pub fn distance(&self, other: &TimeValue) -> RtiResult<IntervalValue> {
        match (self, other) {
            (TimeValue::Integer64(a), TimeValue::Integer64(b)) => {
                Ok(IntervalValue::Integer64(a.distance(b)))
            }
            (TimeValue::Float64(a), TimeValue::Float64(b)) => {
                Ok(IntervalValue::Float64(a.distance(b)))
            }
            _ => Err(mixed_time(self, other)),
        }
    }

    /// Total order within a family
    pub fn compare(&self, other: &TimeValue) -> RtiResult<Ordering> {
        match (self, other) {
            (TimeValue::Integer64(a), TimeValue::Integer64(b)) => Ok(a.cmp(b)),
            (TimeValue::Float64(a), TimeValue::Float64(b)) => Ok(a.cmp(b)),
            _ => Err(mixed_time(self, other)),
        }
    }

    pub fn to_be_bytes(&self) -> [u8; ENCODED_LENGTH] {
        match self {
            TimeValue::Integer64(t) => t.to_be_bytes(),
            TimeValue::Float64(t) => t.to_be_bytes(),
        }
    }

    pub fn encode(&self, buf: &mut [u8], offset: usize) -> RtiResult<usize> {
        match self {
            TimeValue::Integer64(t) => t.encode(buf, offset),
            TimeValue::Float64(t) => t.encode(buf, offset),
        }
    }

    /// Fail unless this value belongs to `factory`'s family.
    pub fn expect_factory(&self, factory: TimeFactory) -> RtiResult<()> {
        if self.factory() != factory {
            return Err(RtiError::InvalidLogicalTime(format!(
                "{} is not a {} value",
                self, factory
            )));
        }
        Ok(())
    }
}

impl IntervalValue {
    pub fn factory(&self) -> TimeFactory {
        match self {
            IntervalValue::Integer64(_) => TimeFactory::Integer64,
            IntervalValue::Float64(_) => TimeFactory::Float64,
        }
    }

    pub fn is_zero(&self) -> bool {
        match self {
            IntervalValue::Integer64(i) => i.is_zero(),
            IntervalValue::Float64(i) => i.is_zero(),
        }
    }

    pub fn is_epsilon(&self) -> bool {
        match self {
            IntervalValue::Integer64(i) => i.is_epsilon(),
            IntervalValue::Float64(i) => i.is_epsilon(),
        }
    }

    pub fn add(&self, other: &IntervalValue) -> RtiResult<IntervalValue> {
        match (self, other) {
            (IntervalValue::Integer64(a), IntervalValue::Integer64(b)) => {
                a.add(*b).map(IntervalValue::Integer64)
            }
            (IntervalValue::Float64(a), IntervalValue::Float64(b)) => {
                a.add(*b).map(IntervalValue::Float64)
            }
            _ => Err(mixed_interval(self, other)),
        }
    }

    pub fn subtract(&self, other: &IntervalValue) -> RtiResult<IntervalValue> {
        match (self, other) {
            (IntervalValue::Integer64(a), IntervalValue::Integer64(b)) => {
                a.subtract(*b).map(IntervalValue::Integer64)
            }
            (IntervalValue::Float64(a), IntervalValue::Float64(b)) => {
                a.subtract(*b).map(IntervalValue::Float64)
            }
            _ => Err(mixed_interval(self, other)),
        }
    }

    pub fn compare(&self, other: &IntervalValue) -> RtiResult<Ordering> {
        match (self, other) {
            (IntervalValue::Integer64(a), IntervalValue::Integer64(b)) => Ok(a.cmp(b)),
            (IntervalValue::Float64(a), IntervalValue::Float64(b)) => Ok(a.cmp(b)),
            _ => Err(mixed_interval(self, other)),
        }
    }

    pub fn to_be_bytes(&self) -> [u8; ENCODED_LENGTH] {
        match self {
            IntervalValue::Integer64(i) => i.to_be_bytes(),
            IntervalValue::Float64(i) => i.to_be_bytes(),
        }
    }

    pub fn encode(&self, buf: &mut [u8], offset: usize) -> RtiResult<usize> {
        match self {
            IntervalValue::Integer64(i) => i.encode(buf, offset),
            IntervalValue::Float64(i) => i.encode(buf, offset),
        }
    }

    pub fn expect_factory(&self, factory: TimeFactory) -> RtiResult<()> {
        if self.factory() != factory {
            return Err(RtiError::InvalidLogicalTimeInterval(format!(
                "{} is not a {} interval",
                self, factory
            )));
        }
        Ok(())
    }
}

impl fmt::Display for TimeValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TimeValue::Integer64(t) => fmt::Display::fmt(t, f),
            TimeValue::Float64(t) => fmt::Display::fmt(t, f),
        }
    }
}

impl fmt::Display for IntervalValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IntervalValue::Integer64(i) => fmt::Display::fmt(i, f),
            IntervalValue::Float64(i) => fmt::Display::fmt(i, f),
        }
    }
}

impl From<Integer64Time> for TimeValue {
    fn from(t: Integer64Time) -> Self {
        TimeValue::Integer64(t)
    }
}

impl From<Float64Time> for TimeValue {
    fn from(t: Float64Time) -> Self {
        TimeValue::Float64(t)
    }
}

impl From<Integer64Interval> for IntervalValue {
    fn from(i: Integer64Interval) -> Self {
        IntervalValue::Integer64(i)
    }
}

impl From<Float64Interval> for IntervalValue {
    fn from(i: Float64Interval) -> Self {
        IntervalValue::Float64(i)
    }
}

// On the wire a time is its eight raw bytes; the family is implied by the
// factory negotiated at join, so only writing is context-free.
impl TimeValue {
    pub fn write_to(&self, w: &mut PayloadWriter) {
        w.put_raw(&self.to_be_bytes());
    }
}

impl IntervalValue {
    pub fn write_to(&self, w: &mut PayloadWriter) {
        w.put_raw(&self.to_be_bytes());
    }
}

impl Payload for TimeFactory {
    fn write(&self, w: &mut PayloadWriter) {
        w.put_str(self.name());
    }

    fn read(r: &mut PayloadReader) -> RtiResult<Self> {
        let name = r.get_str()?;
        TimeFactory::by_name(&name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;

    #[test]
    fn test_by_name() {
        assert_eq!(TimeFactory::by_name("HLAinteger64Time").unwrap(), TimeFactory::Integer64);
        assert_eq!(TimeFactory::by_name("HLAfloat64Time").unwrap(), TimeFactory::Float64);
        assert!(matches!(
            TimeFactory::by_name("HLAinteger32Time"),
            Err(RtiError::CouldNotCreateLogicalTimeFactory(_))
        ));
    }

    #[test]
    fn test_constants_per_family() {
        for factory in [TimeFactory::Integer64, TimeFactory::Float64] {
            assert!(factory.make_initial().is_initial());
            assert!(factory.make_final().is_final());
            assert!(factory.make_zero().is_zero());
            assert!(factory.make_epsilon().is_epsilon());
            assert_eq!(factory.make_initial().factory(), factory);
        }
    }

    #[test]
    fn test_mixed_families_rejected() {
        let t = TimeFactory::Integer64.make_initial();
        let i = TimeFactory::Float64.make_epsilon();
        assert!(matches!(t.add(&i), Err(RtiError::InvalidLogicalTime(_))));
        assert!(matches!(
            TimeFactory::Integer64
                .make_zero()
                .add(&TimeFactory::Float64.make_zero()),
            Err(RtiError::InvalidLogicalTimeInterval(_))
        ));
        assert!(t.compare(&TimeFactory::Float64.make_initial()).is_err());
    }

    #[test]
    fn test_advance_by_epsilon() {
        let factory = TimeFactory::Integer64;
        let t = factory.make_initial().add(&factory.make_epsilon()).unwrap();
        assert_eq!(t, TimeValue::Integer64(Integer64Time::new(1).unwrap()));
        assert_eq!(t.compare(&factory.make_initial()).unwrap(), Ordering::Greater);
    }

    #[test]
    fn test_decode_through_factory() {
        let mut buf = [0u8; 8];
        TimeValue::from(Float64Time::new(12.25)).encode(&mut buf, 0).unwrap();
        let back = TimeFactory::Float64.decode_time(&buf, 0).unwrap();
        assert_eq!(back, TimeValue::Float64(Float64Time::new(12.25)));
    }

    #[test]
    fn test_payload_read_time() {
        let mut w = PayloadWriter::new();
        TimeValue::from(Integer64Time::new(77).unwrap()).write_to(&mut w);
        IntervalValue::from(Integer64Interval::new(-3)).write_to(&mut w);
        let mut r = PayloadReader::new(w.finish());
        let factory = TimeFactory::Integer64;
        assert_eq!(factory.read_time(&mut r).unwrap().to_string(), "HLAinteger64Time<77>");
        assert_eq!(
            factory.read_interval(&mut r).unwrap(),
            IntervalValue::Integer64(Integer64Interval::new(-3))
        );
        assert!(r.finish().is_ok());
    }

    #[test]
    fn test_factory_payload_unknown_name() {
        let mut w = PayloadWriter::new();
        w.put_str("HLAsomethingElse");
        let mut r = PayloadReader::new(w.finish());
        assert!(TimeFactory::read(&mut r).is_err());

        let mut r = PayloadReader::new(Bytes::from_static(&[0, 0, 0, 1]));
        assert!(matches!(TimeFactory::read(&mut r), Err(RtiError::CouldNotDecode(_))));
    }
}
