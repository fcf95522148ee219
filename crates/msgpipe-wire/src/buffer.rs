use bytes::{BufMut, BytesMut};

use crate::error::{Result, WireError};

/// Abstracts placing encoded bytes into a buffer.
pub trait WireSink {
    fn put(&mut self, data: &[u8]);
}

impl WireSink for Vec<u8> {
    fn put(&mut self, data: &[u8]) {
        self.extend_from_slice(data);
    }
}

impl WireSink for BytesMut {
    fn put(&mut self, data: &[u8]) {
        self.put_slice(data);
    }
}

/// Abstracts taking encoded bytes out of a buffer.
pub trait WireSource {
    /// Take exactly `len` bytes, advancing the source position.
    ///
    /// Fails with [`WireError::Underflow`] when fewer than `len` bytes
    /// remain; the source position is unchanged in that case.
    fn take(&mut self, len: usize) -> Result<&[u8]>;
}

/// A [`WireSource`] over a byte slice.
#[derive(Debug)]
pub struct SliceSource<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> SliceSource<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    /// Bytes not yet taken.
    pub fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }
}

impl WireSource for SliceSource<'_> {
    fn take(&mut self, len: usize) -> Result<&[u8]> {
        if len > self.remaining() {
            return Err(WireError::Underflow {
                requested: len,
                available: self.remaining(),
            });
        }
        let taken = &self.data[self.pos..self.pos + len];
        self.pos += len;
        Ok(taken)
    }
}
