//! Fixed-capacity circular byte buffer.
//!
//! This is the substrate the frame matcher reads and consumes from. The buffer
//! never grows on its own: pushing more than the free space is an error, and
//! the only way to change capacity is an explicit [`RingBuffer::set_capacity`].
//!
//! Every operation that spans a logical range copies at most two contiguous
//! segments, split where the range wraps the end of physical storage.

pub mod buffer;
pub mod error;

pub use buffer::RingBuffer;
pub use error::{BufferError, Result};
