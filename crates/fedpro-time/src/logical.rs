//! Logical time contract

use std::fmt;
use std::hash::Hash;

use fedpro_core::{RtiError, RtiResult};

/// Every value in both families encodes to eight big-endian bytes.
pub const ENCODED_LENGTH: usize = 8;

/// A point on the federation time axis
pub trait LogicalTime: Copy + Ord + Hash + fmt::Debug + fmt::Display {
    type Interval: LogicalTimeInterval;

    const INITIAL: Self;
    const FINAL: Self;

    fn is_initial(&self) -> bool;
    fn is_final(&self) -> bool;

    fn add(&self, interval: Self::Interval) -> RtiResult<Self>;
    fn subtract(&self, interval: Self::Interval) -> RtiResult<Self>;

    /// Absolute distance between two times
    fn distance(&self, other: &Self) -> Self::Interval;

    fn to_be_bytes(&self) -> [u8; ENCODED_LENGTH];
    fn from_be_bytes(bytes: [u8; ENCODED_LENGTH]) -> RtiResult<Self>;

    #[inline]
    fn encoded_length(&self) -> usize {
        ENCODED_LENGTH
    }

    /// Write eight bytes at `offset`, returning the bytes written.
    fn encode(&self, buf: &mut [u8], offset: usize) -> RtiResult<usize> {
        write_fixed(buf, offset, self.to_be_bytes())
    }

    fn decode(buf: &[u8], offset: usize) -> RtiResult<Self> {
        Self::from_be_bytes(read_fixed(buf, offset)?)
    }
}

/// A span between two logical times
pub trait LogicalTimeInterval: Copy + Ord + Hash + fmt::Debug + fmt::Display {
    const ZERO: Self;
    const EPSILON: Self;

    fn is_zero(&self) -> bool;
    fn is_epsilon(&self) -> bool;

    fn add(&self, other: Self) -> RtiResult<Self>;
    fn subtract(&self, other: Self) -> RtiResult<Self>;

    fn to_be_bytes(&self) -> [u8; ENCODED_LENGTH];
    fn from_be_bytes(bytes: [u8; ENCODED_LENGTH]) -> RtiResult<Self>;

    #[inline]
    fn encoded_length(&self) -> usize {
        ENCODED_LENGTH
    }

    fn encode(&self, buf: &mut [u8], offset: usize) -> RtiResult<usize> {
        write_fixed(buf, offset, self.to_be_bytes())
    }

    fn decode(buf: &[u8], offset: usize) -> RtiResult<Self> {
        Self::from_be_bytes(read_fixed(buf, offset)?)
    }
}

pub(crate) fn write_fixed(buf: &mut [u8], offset: usize, bytes: [u8; ENCODED_LENGTH]) -> RtiResult<usize> {
    let buf_len = buf.len();
    let dest = offset
        .checked_add(ENCODED_LENGTH)
        .and_then(|end| buf.get_mut(offset..end))
        .ok_or_else(|| {
            RtiError::CouldNotEncode(format!(
                "need {} bytes at offset {}, buffer holds {}",
                ENCODED_LENGTH,
                offset,
                buf_len
            ))
        })?;
    dest.copy_from_slice(&bytes);
    Ok(ENCODED_LENGTH)
}

pub(crate) fn read_fixed(buf: &[u8], offset: usize) -> RtiResult<[u8; ENCODED_LENGTH]> {
    let src = offset
        .checked_add(ENCODED_LENGTH)
        .and_then(|end| buf.get(offset..end))
        .ok_or_else(|| {
            RtiError::CouldNotDecode(format!(
                "need {} bytes at offset {}, buffer holds {}",
                ENCODED_LENGTH,
                offset,
                buf.len()
            ))
        })?;
    let mut raw = [0u8; ENCODED_LENGTH];
    raw.copy_from_slice(src);
    Ok(raw)
}

/// Distance from `x` to the next representable value of larger magnitude.
pub(crate) fn ulp(x: f64) -> f64 {
    let a = x.abs();
    if a.is_nan() || a.is_infinite() {
        return a;
    }
    if a == f64::MAX {
        return a - f64::from_bits(a.to_bits() - 1);
    }
    f64::from_bits(a.to_bits() + 1) - a
}
