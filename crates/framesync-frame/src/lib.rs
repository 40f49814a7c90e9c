//! Multi-pattern frame recognition over a continuous byte stream.
//!
//! A frame is a header, a payload of fixed or terminator-delimited length, and
//! an optional terminating byte. Register any number of [`FrameSpec`]s with a
//! [`Driver`], feed it bytes as they arrive, and every completed frame is
//! handed to that spec's listeners exactly once, in stream order.
//!
//! Bytes that cannot start any registered frame are discarded one at a time
//! until the stream realigns on a header.

pub mod driver;
pub mod error;
pub mod listener;
pub mod spec;

pub use driver::{Driver, DriverBuilder, DriverStats};
pub use error::{FrameError, Result};
pub use framesync_ring::{BufferError, RingBuffer};
pub use listener::{FrameListener, ListenerId, Listeners};
pub use spec::{DataLength, Frame, FrameId, FrameSpec, FrameSpecBuilder, MatchOutcome};
