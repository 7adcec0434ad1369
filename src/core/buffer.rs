//! Encode output buffer
//!
//! Headers are synthesized innermost first, so the buffer grows toward the
//! front: each `allocate` hands out the bytes directly ahead of everything
//! written so far. Storage is fixed at construction and never reallocates.
//!
//! ```text
//! storage: [ headroom ............ | data (len) | pad (end) ]
//!                                  ^ size - off             ^ size
//! ```

use crate::error::{CodecError, Result};

/// Default encode capacity, one maximum-sized capture plus headroom
pub const DEFAULT_BUFFER_SIZE: usize = 65_535 + 256;

/// Alignment pad reserved ahead of the first link-layer write
pub const SPARC_TWIDDLE: usize = 2;

#[derive(Debug, Clone)]
pub struct Buffer {
    storage: Box<[u8]>,
    /// Bytes in use counted from the tail, pad included
    off: usize,
    /// Pad bytes at the tail
    end: usize,
}

impl Buffer {
    pub fn new(size: usize) -> Self {
        Self {
            storage: vec![0u8; size].into_boxed_slice(),
            off: 0,
            end: 0,
        }
    }

    /// Total storage size
    pub fn capacity(&self) -> usize {
        self.storage.len()
    }

    /// Bytes written, pad excluded
    pub fn len(&self) -> usize {
        self.off - self.end
    }

    pub fn is_empty(&self) -> bool {
        self.off == self.end
    }

    /// Alignment pad currently reserved
    pub fn pad(&self) -> usize {
        self.end
    }

    /// Room left in front of the data
    pub fn headroom(&self) -> usize {
        self.capacity() - self.off
    }

    /// Storage index of the first data byte
    pub fn data_offset(&self) -> usize {
        self.capacity() - self.off
    }

    /// Reserve `pad` bytes before anything is written.
    ///
    /// Only applies while the buffer is empty; returns whether the pad is
    /// in place afterwards.
    pub fn align(&mut self, pad: usize) -> bool {
        if !self.is_empty() || pad > self.capacity() {
            return false;
        }
        self.off = pad;
        self.end = pad;
        true
    }

    /// Grow toward the front by `n` bytes and return them for writing
    pub fn allocate(&mut self, n: usize) -> Result<&mut [u8]> {
        let available = self.headroom();
        if n > available {
            return Err(CodecError::BufferFull {
                needed: n,
                available,
            });
        }
        self.off += n;
        let start = self.capacity() - self.off;
        Ok(&mut self.storage[start..start + n])
    }

    /// Copy `bytes` in front of the current data
    pub fn prepend(&mut self, bytes: &[u8]) -> Result<()> {
        self.allocate(bytes.len())?.copy_from_slice(bytes);
        Ok(())
    }

    /// Encoded bytes in wire order
    pub fn data(&self) -> &[u8] {
        let size = self.capacity();
        &self.storage[size - self.off..size - self.end]
    }

    pub fn data_mut(&mut self) -> &mut [u8] {
        let size = self.capacity();
        &mut self.storage[size - self.off..size - self.end]
    }

    pub fn to_vec(&self) -> Vec<u8> {
        self.data().to_vec()
    }

    /// Drop all written data and any pad
    pub fn clear(&mut self) {
        self.off = 0;
        self.end = 0;
    }
}

impl Default for Buffer {
    fn default() -> Self {
        Self::new(DEFAULT_BUFFER_SIZE)
    }
}

impl AsRef<[u8]> for Buffer {
    fn as_ref(&self) -> &[u8] {
        self.data()
    }
}
