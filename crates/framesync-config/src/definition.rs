use std::io::Read;
use std::path::Path;

use framesync_frame::{
    DataLength, Driver, DriverBuilder, FrameId, FrameListener, FrameSpec, FrameSpecBuilder,
};
use serde::Deserialize;

use crate::config::LoaderConfig;
use crate::error::{ConfigError, Result};

/// A byte sequence written either as text or as an array of byte values.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum ByteSeq {
    Text(String),
    Bytes(Vec<u8>),
}

impl ByteSeq {
    pub fn as_bytes(&self) -> &[u8] {
        match self {
            ByteSeq::Text(text) => text.as_bytes(),
            ByteSeq::Bytes(bytes) => bytes.as_slice(),
        }
    }
}

/// A single byte written as an integer or a one-byte string.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum ByteValue {
    Byte(u8),
    Text(String),
}

impl ByteValue {
    /// The encoded byte, or `None` when a string is not exactly one byte long.
    pub fn to_byte(&self) -> Option<u8> {
        match self {
            ByteValue::Byte(byte) => Some(*byte),
            ByteValue::Text(text) => match text.as_bytes() {
                [byte] => Some(*byte),
                _ => None,
            },
        }
    }
}

/// One frame shape as written in a config document.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FrameDefinition {
    pub id: FrameId,
    /// Display label; defaults to the id.
    #[serde(default)]
    pub name: Option<String>,
    pub header: ByteSeq,
    /// Fixed payload length. Absent means the payload runs to the terminator.
    #[serde(default)]
    pub length: Option<usize>,
    #[serde(default)]
    pub terminator: Option<ByteValue>,
}

impl FrameDefinition {
    pub fn data_length(&self) -> DataLength {
        self.length.map_or(DataLength::Variable, DataLength::Fixed)
    }

    /// Header, payload and terminator length for fixed-length frames,
    /// saturating at `usize::MAX`.
    pub fn fixed_frame_len(&self) -> Option<usize> {
        let terminator = usize::from(self.terminator.is_some());
        self.length.map(|length| {
            self.header
                .as_bytes()
                .len()
                .saturating_add(length)
                .saturating_add(terminator)
        })
    }

    pub fn display_name(&self) -> String {
        self.name.clone().unwrap_or_else(|| self.id.to_string())
    }

    /// A spec builder carrying this definition's shape and no listeners.
    pub fn spec_builder(&self) -> Result<FrameSpecBuilder> {
        let mut builder = FrameSpec::builder(self.id, self.header.as_bytes().to_vec())
            .data_length(self.data_length());

        if let Some(value) = &self.terminator {
            let byte = value.to_byte().ok_or_else(|| ConfigError::InvalidTerminator {
                id: self.id,
                value: match value {
                    ByteValue::Byte(byte) => byte.to_string(),
                    ByteValue::Text(text) => text.clone(),
                },
            })?;
            builder = builder.terminator(byte);
        }

        Ok(builder)
    }
}

/// A driver description: requested buffer size plus frames in matching order.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ParserConfig {
    #[serde(default)]
    pub buffer_size: Option<usize>,
    pub frames: Vec<FrameDefinition>,
}

impl ParserConfig {
    /// Parse a config from a JSON string.
    pub fn from_json_str(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Load a config file with default limits.
    pub fn from_path(path: &Path) -> Result<Self> {
        Self::from_path_with_config(path, LoaderConfig::default())
    }

    /// Load a config file with explicit limits.
    pub fn from_path_with_config(path: &Path, loader: LoaderConfig) -> Result<Self> {
        let file = std::fs::File::open(path)
            .map_err(|err| ConfigError::LoadFailed(format!("{}: {err}", path.display())))?;
        let metadata = file
            .metadata()
            .map_err(|err| ConfigError::LoadFailed(format!("{}: {err}", path.display())))?;
        if metadata.len() > loader.max_file_size as u64 {
            return Err(ConfigError::LoadFailed(format!(
                "config file too large ({} bytes, max {}): {}",
                metadata.len(),
                loader.max_file_size,
                path.display()
            )));
        }

        let read_limit = u64::try_from(loader.max_file_size.saturating_add(1)).unwrap_or(u64::MAX);
        let mut content = String::new();
        file.take(read_limit)
            .read_to_string(&mut content)
            .map_err(|err| {
                ConfigError::LoadFailed(format!("failed reading {}: {err}", path.display()))
            })?;
        if content.len() > loader.max_file_size {
            return Err(ConfigError::LoadFailed(format!(
                "config file too large while reading: {}",
                path.display()
            )));
        }

        let config = Self::from_json_str(&content)?;
        if config.frames.len() > loader.max_frames {
            return Err(ConfigError::LoadFailed(format!(
                "frame count exceeds configured max ({}): {}",
                loader.max_frames,
                config.frames.len()
            )));
        }

        config.check_sizes(&loader)?;

        tracing::debug!(
            path = %path.display(),
            frames = config.frames.len(),
            buffer_size = ?config.buffer_size,
            "loaded frame config"
        );
        Ok(config)
    }

    fn check_sizes(&self, loader: &LoaderConfig) -> Result<()> {
        if let Some(size) = self.buffer_size {
            if size > loader.max_buffer_size {
                return Err(ConfigError::LoadFailed(format!(
                    "buffer_size {size} exceeds configured max ({})",
                    loader.max_buffer_size
                )));
            }
        }
        for definition in &self.frames {
            if let Some(frame_len) = definition.fixed_frame_len() {
                if frame_len > loader.max_frame_len {
                    return Err(ConfigError::LoadFailed(format!(
                        "frame {}: length {frame_len} exceeds configured max ({})",
                        definition.id, loader.max_frame_len
                    )));
                }
            }
        }
        Ok(())
    }

    pub fn frame(&self, id: FrameId) -> Option<&FrameDefinition> {
        self.frames.iter().find(|frame| frame.id == id)
    }

    /// A driver builder with every frame registered and no listeners attached.
    pub fn driver_builder(&self) -> Result<DriverBuilder> {
        self.driver_builder_with(|builder| builder)
    }

    /// Build a driver with a clone of `listener` attached to every frame.
    pub fn build_driver<L>(&self, listener: L) -> Result<Driver>
    where
        L: FrameListener + Clone + 'static,
    {
        let builder = self.driver_builder_with(|spec| spec.listener(listener.clone()))?;
        Ok(builder.build()?)
    }

    fn driver_builder_with<F>(&self, mut configure: F) -> Result<DriverBuilder>
    where
        F: FnMut(FrameSpecBuilder) -> FrameSpecBuilder,
    {
        let mut driver = Driver::builder();
        if let Some(size) = self.buffer_size {
            driver = driver.buffer_size(size);
        }
        for definition in &self.frames {
            let spec = configure(definition.spec_builder()?).build()?;
            driver = driver.frame(spec);
        }
        Ok(driver)
    }
}
