/// Errors raised by [`RingBuffer`](crate::RingBuffer) operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BufferError {
    /// More bytes were pushed than the buffer has free space for.
    #[error("buffer overflow ({requested} bytes requested, {space} free)")]
    Overflow { requested: usize, space: usize },

    /// More bytes were read or removed than are currently buffered.
    #[error("buffer underflow ({requested} bytes requested, {available} buffered)")]
    Underflow { requested: usize, available: usize },

    /// A capacity of zero was requested.
    #[error("buffer capacity must be greater than zero")]
    InvalidCapacity,

    /// Storage for the requested capacity could not be allocated.
    #[error("cannot allocate ring buffer of {capacity} bytes")]
    AllocationFailed { capacity: usize },
}

pub type Result<T> = std::result::Result<T, BufferError>;
