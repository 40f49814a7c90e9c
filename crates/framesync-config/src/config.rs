/// Limits applied when loading a config file from disk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoaderConfig {
    /// Maximum bytes accepted for a config file.
    pub max_file_size: usize,
    /// Maximum number of frame definitions in one config.
    pub max_frames: usize,
    /// Maximum on-the-wire length of a fixed-length frame definition.
    pub max_frame_len: usize,
    /// Maximum requested `buffer_size`.
    pub max_buffer_size: usize,
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            max_file_size: 256 * 1024,
            max_frames: 256,
            max_frame_len: 64 * 1024,
            max_buffer_size: 1024 * 1024,
        }
    }
}
