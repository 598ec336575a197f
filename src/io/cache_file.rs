use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;

use super::error::{ReplayError, Result};

/// A temporary file holding spilled replay bytes.
///
/// The file only grows at its end. `pos` mirrors the OS file cursor so that
/// length and position never need a syscall.
#[derive(Debug)]
pub(crate) struct CacheFile {
    file: NamedTempFile,
    len: u64,
    pos: u64,
}

impl CacheFile {
    /// Creates an empty file with a unique name starting with `prefix`, in
    /// `directory` or the system temp directory.
    pub fn create(prefix: &str, directory: Option<&Path>) -> Result<CacheFile> {
        let mut builder = tempfile::Builder::new();
        builder.prefix(prefix);
        let file = match directory {
            Some(directory) => builder.tempfile_in(directory)?,
            None => builder.tempfile()?,
        };
        tracing::debug!(path = %file.path().display(), "created cache file");

        Ok(CacheFile { file, len: 0, pos: 0 })
    }

    pub fn path(&self) -> &Path {
        self.file.path()
    }

    pub fn len(&self) -> u64 {
        self.len
    }

    pub fn position(&self) -> u64 {
        self.pos
    }

    pub fn seek(&mut self, pos: u64) -> Result<()> {
        debug_assert!(pos <= self.len, "seek to {pos} beyond length {}", self.len);
        if pos != self.pos {
            self.file.as_file_mut().seek(SeekFrom::Start(pos))?;
            self.pos = pos;
        }
        Ok(())
    }

    /// Appends `buf` at the end of the file and leaves the cursor there.
    pub fn append(&mut self, buf: &[u8]) -> Result<()> {
        self.seek(self.len)?;
        self.file.as_file_mut().write_all(buf)?;
        self.len += buf.len() as u64;
        self.pos = self.len;
        Ok(())
    }

    /// Reads from the cursor until `buf` is full or the end of the file is
    /// reached. Returns `0` once the cursor is at the end.
    pub fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        let available = (self.len - self.pos).min(buf.len() as u64) as usize;
        self.file.as_file_mut().read_exact(&mut buf[..available])?;
        self.pos += available as u64;
        Ok(available)
    }

    /// Forces written bytes down to stable storage.
    pub fn sync(&mut self) -> Result<()> {
        self.file.as_file_mut().flush()?;
        self.file.as_file().sync_all()?;
        Ok(())
    }

    /// Closes the handle and deletes the file. The handle is released even
    /// when the deletion fails.
    pub fn close(self) -> Result<()> {
        let path: PathBuf = self.file.path().to_path_buf();
        match self.file.close() {
            Ok(()) => {
                tracing::debug!(path = %path.display(), "deleted cache file");
                Ok(())
            }
            Err(source) => Err(ReplayError::DeleteCacheFile { path, source }),
        }
    }
}
