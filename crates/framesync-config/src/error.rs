use framesync_frame::{FrameError, FrameId};

/// Errors that can occur while loading or applying a frame config.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The config file could not be read or exceeded a loader limit.
    #[error("failed to load config: {0}")]
    LoadFailed(String),

    /// The document is not valid JSON or does not fit the config shape.
    #[error("config is not valid: {0}")]
    InvalidJson(#[from] serde_json::Error),

    /// A terminator does not encode exactly one byte.
    #[error("frame {id}: terminator must be a single byte, got {value:?}")]
    InvalidTerminator { id: FrameId, value: String },

    /// The frame definitions were rejected while building the driver.
    #[error(transparent)]
    Frame(#[from] FrameError),
}

pub type Result<T> = std::result::Result<T, ConfigError>;
