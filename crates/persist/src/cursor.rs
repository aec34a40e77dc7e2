//! Bounds-checked big-endian cursors over save buffers.
//!
//! # Invariants
//! - No read or write ever touches a byte outside the buffer's capacity.
//! - A failed access leaves the cursor position unchanged.

/// An access that would cross the end of the buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("out of bounds: need {needed} byte(s) at offset {offset}, capacity {capacity}")]
pub struct CursorError {
    pub offset: usize,
    pub needed: usize,
    pub capacity: usize,
}

/// Sequential reader over a borrowed byte slice.
#[derive(Debug, Clone)]
pub struct ReadCursor<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> ReadCursor<'a> {
    pub fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    pub fn position(&self) -> usize {
        self.pos
    }

    pub fn remaining(&self) -> usize {
        self.buf.len() - self.pos
    }

    fn take<const N: usize>(&mut self) -> Result<[u8; N], CursorError> {
        let end = self.pos.checked_add(N).filter(|&end| end <= self.buf.len());
        let Some(end) = end else {
            return Err(CursorError {
                offset: self.pos,
                needed: N,
                capacity: self.buf.len(),
            });
        };
        let mut out = [0u8; N];
        out.copy_from_slice(&self.buf[self.pos..end]);
        self.pos = end;
        Ok(out)
    }

    pub fn read_u8(&mut self) -> Result<u8, CursorError> {
        self.take::<1>().map(|[b]| b)
    }

    pub fn read_i8(&mut self) -> Result<i8, CursorError> {
        self.take::<1>().map(i8::from_be_bytes)
    }

    pub fn read_u16(&mut self) -> Result<u16, CursorError> {
        self.take::<2>().map(u16::from_be_bytes)
    }

    pub fn read_u32(&mut self) -> Result<u32, CursorError> {
        self.take::<4>().map(u32::from_be_bytes)
    }

    pub fn read_u64(&mut self) -> Result<u64, CursorError> {
        self.take::<8>().map(u64::from_be_bytes)
    }
}

/// Sequential writer over an owned buffer of fixed capacity.
#[derive(Debug)]
pub struct WriteCursor {
    buf: Box<[u8]>,
    pos: usize,
}

impl WriteCursor {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buf: vec![0u8; capacity].into_boxed_slice(),
            pos: 0,
        }
    }

    pub fn position(&self) -> usize {
        self.pos
    }

    pub fn capacity(&self) -> usize {
        self.buf.len()
    }

    pub fn remaining(&self) -> usize {
        self.buf.len() - self.pos
    }

    /// Bytes written so far.
    pub fn written(&self) -> &[u8] {
        &self.buf[..self.pos]
    }

    fn put(&mut self, bytes: &[u8]) -> Result<(), CursorError> {
        let end = self
            .pos
            .checked_add(bytes.len())
            .filter(|&end| end <= self.buf.len());
        let Some(end) = end else {
            return Err(CursorError {
                offset: self.pos,
                needed: bytes.len(),
                capacity: self.buf.len(),
            });
        };
        self.buf[self.pos..end].copy_from_slice(bytes);
        self.pos = end;
        Ok(())
    }

    pub fn write_u8(&mut self, v: u8) -> Result<(), CursorError> {
        self.put(&[v])
    }

    pub fn write_i8(&mut self, v: i8) -> Result<(), CursorError> {
        self.put(&v.to_be_bytes())
    }

    pub fn write_u16(&mut self, v: u16) -> Result<(), CursorError> {
        self.put(&v.to_be_bytes())
    }

    pub fn write_u32(&mut self, v: u32) -> Result<(), CursorError> {
        self.put(&v.to_be_bytes())
    }

    pub fn write_u64(&mut self, v: u64) -> Result<(), CursorError> {
        self.put(&v.to_be_bytes())
    }

    /// Consume the cursor, returning only the written prefix.
    pub fn into_bytes(self) -> Vec<u8> {
        let mut bytes = self.buf.into_vec();
        bytes.truncate(self.pos);
        bytes
    }
}
