use std::path::{Path, PathBuf};

use super::{
    error::{ReplayError, Result},
    hybrid_buffer::HybridBuffer,
    options::ReplayOptions,
    ReplayStream,
};

/// Reads bytes from the inner source with the additional ability
/// to `mark` a stream at a point that can be returned to later
/// using a call to `reset()`.
///
/// Until the first mark, reads pass straight through to the source. From
/// then on every byte pulled from the source is also captured in a fixed-size
/// memory buffer. When the captured bytes no longer fit, they are moved to a
/// temporary cache file and capturing continues there, so replay is never
/// limited by memory. No file is created if the captured bytes always fit.
///
/// The cache file is deleted by `close()`, or when the reader is dropped.
pub struct ReplayableReader<R> {
    inner: Option<R>,
    memory_capacity: usize,
    directory: Option<PathBuf>,
    buffer: Option<HybridBuffer>,
}

impl<R> ReplayableReader<R>
where
    R: std::io::Read,
{
    /// Creates a new reader with a 1KB memory buffer and cache files in the
    /// system temp directory.
    ///
    /// # Example
    // ```
    // let file = std::fs::File::open("path.bin").unwrap();
    // let mut reader = ReplayableReader::new(file);
    // // now use anywhere you would use a standard reader
    // ```
    pub fn new(inner: R) -> ReplayableReader<R> {
        Self::with_options(inner, ReplayOptions::default())
    }

    /// Creates a new reader keeping at most `capacity` captured bytes in memory.
    ///
    /// # Example
    // ```
    // let file = std::fs::File::open("path.bin").unwrap();
    // let mut reader = ReplayableReader::with_capacity(64 * 1024, file);
    // ```
    pub fn with_capacity(capacity: usize, inner: R) -> ReplayableReader<R> {
        Self::with_options(inner, ReplayOptions::default().memory_capacity(capacity))
    }

    /// Creates a new reader using the memory capacity and cache file directory
    /// from `options`.
    ///
    /// # Example
    // ```
    // let file = std::fs::File::open("path.bin").unwrap();
    // let options = ReplayOptions::default().memory_capacity(4096).directory("/var/tmp");
    // let mut reader = ReplayableReader::with_options(file, options);
    // ```
    pub fn with_options(inner: R, options: ReplayOptions) -> ReplayableReader<R> {
        ReplayableReader {
            inner: Some(inner),
            memory_capacity: options.memory_capacity,
            directory: options.directory,
            buffer: None,
        }
    }

    /// Closes the replay buffer, deleting any cache file, and returns the
    /// inner reader without dropping it.
    pub fn into_inner(mut self) -> Result<R> {
        let inner = self.inner.take().ok_or(ReplayError::Closed)?;
        if let Some(buffer) = self.buffer.take() {
            buffer.close()?;
        }
        Ok(inner)
    }

    /// The replay buffer, once the reader has been marked.
    pub fn buffer(&self) -> Option<&HybridBuffer> {
        self.buffer.as_ref()
    }

    pub fn is_closed(&self) -> bool {
        self.inner.is_none()
    }

    /// Serves captured bytes first while replaying, then tops up from the
    /// inner reader and captures whatever it returns.
    fn read_into_buf(&mut self, buf: &mut [u8]) -> Result<usize> {
        let inner = self.inner.as_mut().ok_or(ReplayError::Closed)?;
        if buf.is_empty() {
            return Ok(0);
        }

        let Some(buffer) = self.buffer.as_mut() else {
            // Never marked, nothing to capture
            return Ok(inner.read(buf)?);
        };

        let mut buffer_bytes_read = 0;
        if buffer.is_reading() {
            buffer_bytes_read = buffer.read(buf)?;
            if buffer_bytes_read == buf.len() {
                return Ok(buffer_bytes_read);
            }
        }

        // Replayed bytes are already consumed from the buffer, so a source
        // error is deferred to the next call rather than dropping them.
        let inner_bytes_read = match inner.read(&mut buf[buffer_bytes_read..]) {
            Ok(n) => n,
            Err(e) if buffer_bytes_read > 0 => {
                tracing::trace!(error = %e, "inner reader failed after replay");
                0
            }
            Err(e) => return Err(e.into()),
        };

        if inner_bytes_read > 0 {
            buffer.write(&buf[buffer_bytes_read..buffer_bytes_read + inner_bytes_read])?;
        }
        Ok(buffer_bytes_read + inner_bytes_read)
    }
}

impl<R> ReplayStream for ReplayableReader<R>
where
    R: std::io::Read,
{
    /// Marks the current position, allocating the replay buffer on the first
    /// call. Has no effect once the reader is closed.
    fn mark(&mut self, _read_limit: usize) -> Result<()> {
        if self.inner.is_none() {
            return Ok(());
        }
        let buffer = self.buffer.get_or_insert_with(|| {
            HybridBuffer::new(self.memory_capacity, self.directory.clone())
        });
        buffer.mark();
        Ok(())
    }

    fn reset(&mut self) -> Result<()> {
        if self.inner.is_none() {
            return Err(ReplayError::Closed);
        }
        self.buffer
            .as_mut()
            .ok_or(ReplayError::MarkNotSet)?
            .rewind()
    }

    /// Writes all bytes captured since the first mark into the cache file.
    fn flush(&mut self) -> Result<()> {
        if self.inner.is_none() {
            return Err(ReplayError::Closed);
        }
        self.buffer
            .as_mut()
            .ok_or(ReplayError::MarkNotSet)?
            .flush()
    }

    fn cache_file(&self) -> Option<&Path> {
        self.buffer.as_ref().and_then(HybridBuffer::cache_file)
    }

    /// Releases the replay buffer and its cache file, then drops the inner
    /// reader. Both are released even if deleting the cache file fails.
    fn close(&mut self) -> Result<()> {
        let result = match self.buffer.take() {
            Some(buffer) => buffer.close(),
            None => Ok(()),
        };
        if self.inner.take().is_some() {
            tracing::debug!("closed replayable reader");
        }
        result
    }
}

impl<R> std::io::Read for ReplayableReader<R>
where
    R: std::io::Read,
{
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        Ok(self.read_into_buf(buf)?)
    }
}

impl<R> From<R> for ReplayableReader<R>
where
    R: std::io::Read,
{
    fn from(value: R) -> Self {
        ReplayableReader::new(value)
    }
}
