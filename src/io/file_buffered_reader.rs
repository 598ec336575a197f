use std::path::Path;

use super::{
    cache_file::CacheFile,
    error::{ReplayError, Result},
    ReplayStream, EAGER_CACHE_FILE_PREFIX,
};

/// Reads bytes from the inner source and writes every one of them through to
/// a temporary cache file, so the whole stream can be replayed.
///
/// The mark is fixed at the position the source had when this reader was
/// created; `reset()` always returns there. Calling `mark()` after data has
/// been read fails with [`ReplayError::MarkCannotBeReset`].
pub struct FileBufferedReader<R> {
    inner: Option<R>,
    file: Option<CacheFile>,
    replaying: bool,
}

impl<R> FileBufferedReader<R>
where
    R: std::io::Read,
{
    /// Creates the cache file in the system temp directory.
    pub fn new(inner: R) -> Result<FileBufferedReader<R>> {
        Self::new_in(inner, None)
    }

    /// Creates the cache file in `directory`, or the system temp directory if `None`.
    pub fn new_in(inner: R, directory: Option<&Path>) -> Result<FileBufferedReader<R>> {
        let file = CacheFile::create(EAGER_CACHE_FILE_PREFIX, directory)?;
        Ok(FileBufferedReader {
            inner: Some(inner),
            file: Some(file),
            replaying: false,
        })
    }

    fn open_parts(&mut self) -> Result<(&mut R, &mut CacheFile)> {
        match (self.inner.as_mut(), self.file.as_mut()) {
            (Some(inner), Some(file)) => Ok((inner, file)),
            _ => Err(ReplayError::Closed),
        }
    }

    fn read_into_buf(&mut self, buf: &mut [u8]) -> Result<usize> {
        let replaying = self.replaying;
        let (inner, file) = self.open_parts()?;
        if buf.is_empty() {
            return Ok(0);
        }

        if replaying {
            let bytes_read = file.read(buf)?;
            if bytes_read > 0 {
                return Ok(bytes_read);
            }
            self.replaying = false;
            return self.read_into_buf(buf);
        }

        let bytes_read = inner.read(buf)?;
        if bytes_read > 0 {
            file.append(&buf[..bytes_read])?;
        }
        Ok(bytes_read)
    }
}

impl<R> ReplayStream for FileBufferedReader<R>
where
    R: std::io::Read,
{
    /// Only allowed before any data has been read, since the mark is fixed.
    fn mark(&mut self, _read_limit: usize) -> Result<()> {
        match self.file.as_ref() {
            Some(file) if file.position() > 0 => Err(ReplayError::MarkCannotBeReset),
            _ => Ok(()),
        }
    }

    fn reset(&mut self) -> Result<()> {
        let (_, file) = self.open_parts()?;
        file.seek(0)?;
        self.replaying = true;
        Ok(())
    }

    fn flush(&mut self) -> Result<()> {
        let (_, file) = self.open_parts()?;
        file.sync()
    }

    fn cache_file(&self) -> Option<&Path> {
        self.file.as_ref().map(CacheFile::path)
    }

    fn close(&mut self) -> Result<()> {
        let result = match self.file.take() {
            Some(file) => file.close(),
            None => Ok(()),
        };
        if self.inner.take().is_some() {
            tracing::debug!("closed file buffered reader");
        }
        result
    }
}

impl<R> std::io::Read for FileBufferedReader<R>
where
    R: std::io::Read,
{
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        Ok(self.read_into_buf(buf)?)
    }
}
