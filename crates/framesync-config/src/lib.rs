//! JSON frame definitions for framesync drivers.
//!
//! Describe a driver's buffer size and frame shapes in a JSON document, load
//! it with [`ParserConfig`], and turn it into a ready [`Driver`](framesync_frame::Driver).
//!
//! ```json
//! {
//!   "buffer_size": 64,
//!   "frames": [
//!     { "id": 1, "name": "reading", "header": "+", "terminator": ";" },
//!     { "id": 0, "header": [45], "length": 6 }
//!   ]
//! }
//! ```

pub mod config;
pub mod definition;
pub mod error;

pub use config::LoaderConfig;
pub use definition::{ByteSeq, ByteValue, FrameDefinition, ParserConfig};
pub use error::{ConfigError, Result};
