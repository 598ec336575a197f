mod buffer;
mod cache_file;
mod error;
mod file_buffered_reader;
mod hybrid_buffer;
mod options;
mod replayable_reader;

use std::path::Path;

pub use error::{ReplayError, Result};
pub use file_buffered_reader::FileBufferedReader;
pub use hybrid_buffer::{HybridBuffer, Mode};
pub use options::ReplayOptions;
pub use replayable_reader::ReplayableReader;

const DEFAULT_MEMORY_BUFFER_SIZE: usize = 1024;
const LAZY_CACHE_FILE_PREFIX: &str = "replay-cache-";
const EAGER_CACHE_FILE_PREFIX: &str = "replay-file-";

/// A reader that can return to a marked position and replay the bytes read
/// since, keeping them in a cache file when memory does not suffice.
pub trait ReplayStream: std::io::Read {
    /// Marks the current position. A subsequent `reset()` returns to it.
    /// Any previous mark is discarded.
    ///
    /// `read_limit` is accepted for parity with other markable readers and is
    /// ignored: replay is unbounded because captured bytes spill to disk.
    fn mark(&mut self, read_limit: usize) -> Result<()>;

    /// Returns to the last marked position.
    fn reset(&mut self) -> Result<()>;

    /// Tests whether `mark` and `reset` are supported.
    fn mark_supported(&self) -> bool {
        true
    }

    /// Writes all bytes captured since the mark to the cache file and syncs it.
    fn flush(&mut self) -> Result<()>;

    /// The cache file, or `None` if none has been created.
    fn cache_file(&self) -> Option<&Path>;

    /// Deletes the cache file and drops the source. Closing twice is a no-op.
    fn close(&mut self) -> Result<()>;

    /// Reads a single byte, returning `None` at the end of the stream.
    fn read_byte(&mut self) -> std::io::Result<Option<u8>> {
        let mut byte = [0_u8; 1];
        loop {
            match self.read(&mut byte) {
                Ok(0) => return Ok(None),
                Ok(_) => return Ok(Some(byte[0])),
                Err(e) if e.kind() == std::io::ErrorKind::Interrupted => {}
                Err(e) => return Err(e),
            }
        }
    }
}
