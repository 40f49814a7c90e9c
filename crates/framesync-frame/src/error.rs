use framesync_ring::BufferError;

use crate::spec::FrameId;

/// Errors raised while assembling or running a frame driver.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FrameError {
    /// A frame spec was built with an empty header.
    #[error("frame {id}: header must contain at least one byte")]
    EmptyHeader { id: FrameId },

    /// A variable-length frame spec has no terminating byte.
    #[error("frame {id}: variable-length frames require a terminating byte")]
    MissingTerminator { id: FrameId },

    /// Header, payload and terminator lengths overflow `usize`.
    #[error("frame {id}: fixed payload length {length} is too large")]
    FrameTooLong { id: FrameId, length: usize },

    /// Two frame specs registered with the same id.
    #[error("duplicate frame id: {0}")]
    DuplicateFrameId(FrameId),

    /// A variable-length frame was registered without an explicit buffer size.
    #[error("frame {id}: variable-length frames require an explicit buffer size")]
    BufferSizeRequired { id: FrameId },

    /// The driver was built without any frame specs.
    #[error("at least one frame spec must be registered")]
    NoFrames,

    /// The underlying ring buffer rejected an operation.
    #[error("ring buffer error: {0}")]
    Buffer(#[from] BufferError),
}

pub type Result<T> = std::result::Result<T, FrameError>;
