use std::fmt;

use bytes::{Bytes, BytesMut};

use crate::error::{BufferError, Result};

/// A circular byte store with a fixed capacity.
///
/// The buffer tracks the physical index of the oldest byte plus an explicit
/// length, so "empty" and "full" never share a representation.
#[derive(Clone)]
pub struct RingBuffer {
    storage: Box<[u8]>,
    head: usize,
    len: usize,
}

impl RingBuffer {
    /// Create an empty buffer holding at most `capacity` bytes.
    ///
    /// Returns `BufferError::InvalidCapacity` when `capacity` is zero.
    pub fn new(capacity: usize) -> Result<Self> {
        Ok(Self {
            storage: allocate(capacity)?,
            head: 0,
            len: 0,
        })
    }

    /// Maximum number of bytes the buffer can hold.
    pub fn capacity(&self) -> usize {
        self.storage.len()
    }

    /// Number of bytes currently buffered.
    pub fn len(&self) -> usize {
        self.len
    }

    /// Free space left before the buffer is full.
    pub fn space(&self) -> usize {
        self.capacity() - self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn is_full(&self) -> bool {
        self.len == self.capacity()
    }

    /// Append a single byte.
    pub fn push(&mut self, byte: u8) -> Result<()> {
        if self.is_full() {
            return Err(BufferError::Overflow {
                requested: 1,
                space: 0,
            });
        }
        let tail = self.wrap(self.head + self.len);
        self.storage[tail] = byte;
        self.len += 1;
        Ok(())
    }

    /// Append a block of bytes, preserving their order.
    ///
    /// Fails without writing anything if `bytes` does not fit in [`space`](Self::space).
    pub fn push_slice(&mut self, bytes: &[u8]) -> Result<()> {
        if bytes.len() > self.space() {
            return Err(BufferError::Overflow {
                requested: bytes.len(),
                space: self.space(),
            });
        }
        if bytes.is_empty() {
            return Ok(());
        }

        let tail = self.wrap(self.head + self.len);
        let first = bytes.len().min(self.capacity() - tail);
        let (to_end, from_start) = bytes.split_at(first);
        self.storage[tail..tail + first].copy_from_slice(to_end);
        self.storage[..from_start.len()].copy_from_slice(from_start);
        self.len += bytes.len();
        Ok(())
    }

    /// Remove and return the oldest byte.
    pub fn pop(&mut self) -> Result<u8> {
        let byte = self.peek()?;
        self.advance(1);
        Ok(byte)
    }

    /// Remove and return the oldest `n` bytes as an owned copy.
    pub fn pop_many(&mut self, n: usize) -> Result<Bytes> {
        let bytes = self.peek_many(n)?;
        self.advance(n);
        Ok(bytes)
    }

    /// Remove and return everything currently buffered.
    pub fn pop_all(&mut self) -> Bytes {
        let bytes = self.copy_range(0, self.len);
        self.clear();
        bytes
    }

    /// Remove the oldest `n` bytes without copying them out.
    pub fn discard(&mut self, n: usize) -> Result<()> {
        self.check_available(n)?;
        self.advance(n);
        Ok(())
    }

    /// Drop all buffered bytes.
    pub fn clear(&mut self) {
        self.head = 0;
        self.len = 0;
    }

    /// The oldest byte, without removing it.
    pub fn peek(&self) -> Result<u8> {
        self.peek_at(0)
    }

    /// The byte `n` positions after the oldest one, without removing it.
    pub fn peek_at(&self, n: usize) -> Result<u8> {
        if n >= self.len {
            return Err(BufferError::Underflow {
                requested: n.saturating_add(1),
                available: self.len,
            });
        }
        Ok(self.storage[self.wrap(self.head + n)])
    }

    /// Copy of the oldest `n` bytes, leaving the buffer untouched.
    pub fn peek_many(&self, n: usize) -> Result<Bytes> {
        self.check_available(n)?;
        Ok(self.copy_range(0, n))
    }

    /// Copy of everything currently buffered.
    pub fn peek_all(&self) -> Bytes {
        self.copy_range(0, self.len)
    }

    /// The buffered bytes as two contiguous slices, oldest segment first.
    ///
    /// The second slice is empty unless the contents wrap the end of storage.
    pub fn as_slices(&self) -> (&[u8], &[u8]) {
        self.segments(0, self.len)
    }

    /// True when the oldest bytes equal `prefix`. Never allocates.
    pub fn starts_with(&self, prefix: &[u8]) -> bool {
        if prefix.len() > self.len {
            return false;
        }
        let (first, second) = self.segments(0, prefix.len());
        let (head, rest) = prefix.split_at(first.len());
        first == head && second == rest
    }

    /// Logical offset of the first `byte` at or after offset `start`.
    pub fn position_from(&self, start: usize, byte: u8) -> Option<usize> {
        if start >= self.len {
            return None;
        }
        let (first, second) = self.segments(start, self.len - start);
        first
            .iter()
            .position(|&b| b == byte)
            .map(|i| start + i)
            .or_else(|| {
                second
                    .iter()
                    .position(|&b| b == byte)
                    .map(|i| start + first.len() + i)
            })
    }

    /// Reallocate storage with a new capacity.
    ///
    /// Keeps the newest `min(len, capacity)` bytes; shrinking below the current
    /// length drops the oldest excess. Afterwards the oldest byte sits at the
    /// start of storage.
    pub fn set_capacity(&mut self, capacity: usize) -> Result<()> {
        let mut storage = allocate(capacity)?;

        let keep = self.len.min(capacity);
        let dropped = self.len - keep;
        if dropped > 0 {
            tracing::debug!(dropped, capacity, "shrinking ring buffer drops oldest bytes");
        }

        let (first, second) = self.segments(dropped, keep);
        storage[..first.len()].copy_from_slice(first);
        storage[first.len()..keep].copy_from_slice(second);

        self.storage = storage;
        self.head = 0;
        self.len = keep;
        Ok(())
    }

    fn check_available(&self, n: usize) -> Result<()> {
        if n > self.len {
            return Err(BufferError::Underflow {
                requested: n,
                available: self.len,
            });
        }
        Ok(())
    }

    fn advance(&mut self, n: usize) {
        self.len -= n;
        self.head = if self.len == 0 {
            0
        } else {
            self.wrap(self.head + n)
        };
    }

    fn copy_range(&self, start: usize, n: usize) -> Bytes {
        let (first, second) = self.segments(start, n);
        let mut out = BytesMut::with_capacity(n);
        out.extend_from_slice(first);
        out.extend_from_slice(second);
        out.freeze()
    }

    // Caller guarantees `start + n <= len`.
    fn segments(&self, start: usize, n: usize) -> (&[u8], &[u8]) {
        if n == 0 {
            return (&[], &[]);
        }
        let begin = self.wrap(self.head + start);
        let first = n.min(self.capacity() - begin);
        (
            &self.storage[begin..begin + first],
            &self.storage[..n - first],
        )
    }

    fn wrap(&self, index: usize) -> usize {
        index % self.capacity()
    }
}

impl fmt::Debug for RingBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RingBuffer")
            .field("capacity", &self.capacity())
            .field("len", &self.len)
            .field("head", &self.head)
            .finish()
    }
}

/// Zeroed storage, reporting allocation failure instead of aborting.
fn allocate(capacity: usize) -> Result<Box<[u8]>> {
    if capacity == 0 {
        return Err(BufferError::InvalidCapacity);
    }
    let mut storage = Vec::new();
    storage
        .try_reserve_exact(capacity)
        .map_err(|_| BufferError::AllocationFailed { capacity })?;
    storage.resize(capacity, 0);
    Ok(storage.into_boxed_slice())
}
