//! Recognize configurable byte frames in serial and other continuous streams.
//!
//! framesync matches header/payload/terminator frame shapes against a byte
//! stream fed in arbitrary blocks, skipping noise one byte at a time until a
//! registered header lines up.
//!
//! # Crate Structure
//!
//! - [`ring`] - Fixed-capacity circular byte buffer
//! - [`frame`] - Frame specs, listeners and the matching driver
//! - [`config`] - JSON frame definitions (behind `config` feature)
//!
//! # Example
//!
//! ```
//! use framesync::frame::{Driver, Frame, FrameSpec};
//!
//! let spec = FrameSpec::builder(1, "+")
//!     .terminator(b';')
//!     .listener(|frame: &Frame| println!("frame {}: {:?}", frame.id, frame.payload))
//!     .build()?;
//! let mut driver = Driver::builder().buffer_size(32).frame(spec).build()?;
//!
//! driver.add(b"noise+123;")?;
//! assert_eq!(driver.stats().frames_matched, 1);
//! # Ok::<(), framesync::frame::FrameError>(())
//! ```

/// Re-export ring buffer types.
pub mod ring {
    pub use framesync_ring::*;
}

/// Re-export frame types.
pub mod frame {
    pub use framesync_frame::*;
}

/// Re-export config types (requires `config` feature).
#[cfg(feature = "config")]
pub mod config {
    pub use framesync_config::*;
}
