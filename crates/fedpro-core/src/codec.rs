//! Payload codec
//!
//! All multi-byte integers are big-endian. Strings and byte blobs carry a
//! u32 length prefix.

use bytes::{Buf, BufMut, Bytes, BytesMut};

use crate::{RtiError, RtiResult};

/// A value that can travel inside an envelope payload.
pub trait Payload: Sized {
    fn write(&self, w: &mut PayloadWriter);
    fn read(r: &mut PayloadReader) -> RtiResult<Self>;
}

/// Append-only payload builder
#[derive(Default)]
pub struct PayloadWriter {
    buf: BytesMut,
}

impl PayloadWriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        PayloadWriter {
            buf: BytesMut::with_capacity(capacity),
        }
    }

    #[inline]
    pub fn put_u8(&mut self, v: u8) -> &mut Self {
        self.buf.put_u8(v);
        self
    }

    #[inline]
    pub fn put_bool(&mut self, v: bool) -> &mut Self {
        self.put_u8(v as u8)
    }

    #[inline]
    pub fn put_u16(&mut self, v: u16) -> &mut Self {
        self.buf.put_u16(v);
        self
    }

    #[inline]
    pub fn put_u32(&mut self, v: u32) -> &mut Self {
        self.buf.put_u32(v);
        self
    }

    #[inline]
    pub fn put_u64(&mut self, v: u64) -> &mut Self {
        self.buf.put_u64(v);
        self
    }

    #[inline]
    pub fn put_i64(&mut self, v: i64) -> &mut Self {
        self.buf.put_i64(v);
        self
    }

    #[inline]
    pub fn put_f64(&mut self, v: f64) -> &mut Self {
        self.buf.put_f64(v);
        self
    }

    /// Length-prefixed byte blob
    pub fn put_bytes(&mut self, v: &[u8]) -> &mut Self {
        self.buf.put_u32(v.len() as u32);
        self.buf.put_slice(v);
        self
    }

    /// Length-prefixed UTF-8 string
    pub fn put_str(&mut self, v: &str) -> &mut Self {
        self.put_bytes(v.as_bytes())
    }

    /// Bytes with no prefix
    pub fn put_raw(&mut self, v: &[u8]) -> &mut Self {
        self.buf.put_slice(v);
        self
    }

    pub fn put<P: Payload>(&mut self, v: &P) -> &mut Self {
        v.write(self);
        self
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    pub fn finish(self) -> Bytes {
        self.buf.freeze()
    }
}

/// Cursor over a received payload
pub struct PayloadReader {
    buf: Bytes,
}

impl PayloadReader {
    pub fn new(buf: Bytes) -> Self {
        PayloadReader { buf }
    }

    fn need(&self, n: usize) -> RtiResult<()> {
        if self.buf.remaining() < n {
            return Err(RtiError::CouldNotDecode(format!(
                "payload truncated: expected {} more bytes, got {}",
                n,
                self.buf.remaining()
            )));
        }
        Ok(())
    }

    pub fn get_u8(&mut self) -> RtiResult<u8> {
        self.need(1)?;
        Ok(self.buf.get_u8())
    }

    pub fn get_bool(&mut self) -> RtiResult<bool> {
        match self.get_u8()? {
            0 => Ok(false),
            1 => Ok(true),
            other => Err(RtiError::CouldNotDecode(format!("invalid boolean byte {}", other))),
        }
    }

    pub fn get_u16(&mut self) -> RtiResult<u16> {
        self.need(2)?;
        Ok(self.buf.get_u16())
    }

    pub fn get_u32(&mut self) -> RtiResult<u32> {
        self.need(4)?;
        Ok(self.buf.get_u32())
    }

    pub fn get_u64(&mut self) -> RtiResult<u64> {
        self.need(8)?;
        Ok(self.buf.get_u64())
    }

    pub fn get_i64(&mut self) -> RtiResult<i64> {
        self.need(8)?;
        Ok(self.buf.get_i64())
    }

    pub fn get_f64(&mut self) -> RtiResult<f64> {
        self.need(8)?;
        Ok(self.buf.get_f64())
    }

    pub fn get_bytes(&mut self) -> RtiResult<Bytes> {
        let len = self.get_u32()? as usize;
        self.get_raw(len)
    }

    pub fn get_str(&mut self) -> RtiResult<String> {
        let raw = self.get_bytes()?;
        String::from_utf8(raw.to_vec())
            .map_err(|e| RtiError::CouldNotDecode(format!("invalid UTF-8 string: {}", e)))
    }

    pub fn get_raw(&mut self, len: usize) -> RtiResult<Bytes> {
        self.need(len)?;
        Ok(self.buf.split_to(len))
    }

    pub fn get<P: Payload>(&mut self) -> RtiResult<P> {
        P::read(self)
    }

    /// Everything not yet consumed
    pub fn rest(&mut self) -> Bytes {
        self.buf.split_off(0)
    }

    pub fn remaining(&self) -> usize {
        self.buf.remaining()
    }

    /// Fail if anything is left over.
    pub fn finish(self) -> RtiResult<()> {
        if self.buf.has_remaining() {
            return Err(RtiError::CouldNotDecode(format!(
                "{} trailing bytes in payload",
                self.buf.remaining()
            )));
        }
        Ok(())
    }
}

impl Payload for String {
    fn write(&self, w: &mut PayloadWriter) {
        w.put_str(self);
    }

    fn read(r: &mut PayloadReader) -> RtiResult<Self> {
        r.get_str()
    }
}

impl Payload for Bytes {
    fn write(&self, w: &mut PayloadWriter) {
        w.put_bytes(self);
    }

    fn read(r: &mut PayloadReader) -> RtiResult<Self> {
        r.get_bytes()
    }
}

impl Payload for u32 {
    fn write(&self, w: &mut PayloadWriter) {
        w.put_u32(*self);
    }

    fn read(r: &mut PayloadReader) -> RtiResult<Self> {
        r.get_u32()
    }
}

impl Payload for bool {
    fn write(&self, w: &mut PayloadWriter) {
        w.put_bool(*self);
    }

    fn read(r: &mut PayloadReader) -> RtiResult<Self> {
        r.get_bool()
    }
}

impl<P: Payload> Payload for Vec<P> {
    fn write(&self, w: &mut PayloadWriter) {
        w.put_u32(self.len() as u32);
        for item in self {
            item.write(w);
        }
    }

    fn read(r: &mut PayloadReader) -> RtiResult<Self> {
        let count = r.get_u32()? as usize;
        // Each element takes at least one byte; cap the preallocation.
        let mut items = Vec::with_capacity(count.min(r.remaining()));
        for _ in 0..count {
            items.push(P::read(r)?);
        }
        Ok(items)
    }
}

impl<A: Payload, B: Payload> Payload for (A, B) {
    fn write(&self, w: &mut PayloadWriter) {
        self.0.write(w);
        self.1.write(w);
    }

    fn read(r: &mut PayloadReader) -> RtiResult<Self> {
        Ok((A::read(r)?, B::read(r)?))
    }
}
