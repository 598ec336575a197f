use std::path::PathBuf;

use super::DEFAULT_MEMORY_BUFFER_SIZE;

/// Construction parameters for a [`ReplayableReader`](super::ReplayableReader).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplayOptions {
    /// Bytes kept in memory before captured data spills to the cache file.
    pub memory_capacity: usize,
    /// Where the cache file is created. `None` means the system temp directory.
    pub directory: Option<PathBuf>,
}

impl ReplayOptions {
    /// Sets how many captured bytes are kept in memory before spilling.
    pub fn memory_capacity(mut self, memory_capacity: usize) -> Self {
        self.memory_capacity = memory_capacity;
        self
    }

    /// Sets the directory the cache file is created in.
    pub fn directory(mut self, directory: impl Into<PathBuf>) -> Self {
        self.directory = Some(directory.into());
        self
    }
}

impl Default for ReplayOptions {
    fn default() -> Self {
        ReplayOptions {
            memory_capacity: DEFAULT_MEMORY_BUFFER_SIZE,
            directory: None,
        }
    }
}
