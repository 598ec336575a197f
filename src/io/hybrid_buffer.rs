use std::path::{Path, PathBuf};

use super::{
    buffer::Buffer,
    cache_file::CacheFile,
    error::{ReplayError, Result},
    LAZY_CACHE_FILE_PREFIX,
};

/// Whether the buffer is recording new bytes or serving captured ones.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Writing,
    Reading,
}

/// A buffer for captured bytes, backed by a cache file once the fixed
/// memory region is too small for the amount of data to hold.
///
/// All captured bytes share one logical offset space: offsets below the file
/// length live in the file, the rest live in memory. At any time the logical
/// position is the file cursor plus the memory position.
///
/// The buffer starts in [`Mode::Writing`]. [`HybridBuffer::rewind`] switches to
/// [`Mode::Reading`] at the mark, and any write switches back, appending after
/// the last captured byte.
#[derive(Debug)]
pub struct HybridBuffer {
    memory: Buffer,
    mode: Mode,
    directory: Option<PathBuf>,
    file: Option<CacheFile>,
    mark: u64,
}

impl HybridBuffer {
    /// Allocates the memory region, but does not create the cache file yet.
    /// Without a `directory` the file goes to the system temp directory.
    pub fn new(memory_capacity: usize, directory: Option<PathBuf>) -> HybridBuffer {
        HybridBuffer {
            memory: Buffer::new(memory_capacity),
            mode: Mode::Writing,
            directory,
            file: None,
            mark: 0,
        }
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn is_reading(&self) -> bool {
        self.mode == Mode::Reading
    }

    /// The current logical offset.
    pub fn position(&self) -> u64 {
        self.file_position() + self.memory.position() as u64
    }

    pub fn mark_position(&self) -> u64 {
        self.mark
    }

    /// The cache file, if one has been created.
    pub fn cache_file(&self) -> Option<&Path> {
        self.file.as_ref().map(CacheFile::path)
    }

    /// Appends `buf` after the last captured byte, switching to writing mode
    /// first. Bytes not yet replayed stay captured but the read cursor is lost.
    ///
    /// When the memory region cannot take `buf`, its contents are spilled to
    /// the cache file (creating it on first need). Data that is larger than the
    /// whole region goes straight to the file.
    pub fn write(&mut self, buf: &[u8]) -> Result<()> {
        self.finish_reading()?;

        if buf.len() > self.memory.remaining() {
            self.spill()?;
        }

        if buf.len() > self.memory.remaining() {
            // the spill above emptied the region and created the file
            let file = ensure_file(&mut self.file, self.directory.as_deref())?;
            file.append(buf)?;
        } else {
            self.memory.put(buf);
        }
        Ok(())
    }

    /// Reads captured bytes into `buf`, draining the file cursor first and
    /// continuing with the memory region. Returns fewer bytes than requested
    /// only when every captured byte has been replayed, and `0` once nothing
    /// is left; this is not an end-of-stream signal.
    pub fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        if self.mode != Mode::Reading {
            return Err(ReplayError::NotReading);
        }

        let mut bytes_read = 0;
        if let Some(file) = self.file.as_mut() {
            bytes_read = file.read(buf)?;
        }
        bytes_read += self.memory.read_into(&mut buf[bytes_read..]);
        Ok(bytes_read)
    }

    /// Marks the current logical position so that a later
    /// [`HybridBuffer::rewind`] starts from it. Replaces any previous mark.
    pub fn mark(&mut self) {
        self.mark = self.position();
    }

    /// Switches to reading mode and moves the cursors to the mark. The mark
    /// may lie in the file, in memory, or (after a spill) the file may hold the
    /// start of the replay window and memory the rest.
    pub fn rewind(&mut self) -> Result<()> {
        match self.mode {
            Mode::Reading => self.memory.rewind(),
            Mode::Writing => {
                self.memory.flip();
                self.mode = Mode::Reading;
            }
        }

        let file_length = self.file_length();
        let file_position = self.mark.min(file_length);
        let memory_position = self.mark.saturating_sub(file_length) as usize;
        tracing::trace!(
            mark = self.mark,
            file_position,
            memory_position,
            "rewinding replay buffer"
        );

        if let Some(file) = self.file.as_mut() {
            file.seek(file_position)?;
        }
        self.memory.set_position(memory_position);
        Ok(())
    }

    /// Appends the captured bytes held in memory to the cache file, creating
    /// it if necessary, and syncs the file to stable storage.
    pub fn flush(&mut self) -> Result<()> {
        self.spill()?;
        let file = ensure_file(&mut self.file, self.directory.as_deref())?;
        file.sync()
    }

    /// Releases the memory region, then closes and deletes the cache file if
    /// one was created.
    pub fn close(self) -> Result<()> {
        let HybridBuffer { memory, file, .. } = self;
        drop(memory);
        match file {
            Some(file) => file.close(),
            None => Ok(()),
        }
    }

    /// Moves the valid bytes of the memory region to the end of the cache
    /// file. The logical position is unchanged: while reading, the file cursor
    /// takes over the bytes the memory cursor pointed at.
    fn spill(&mut self) -> Result<()> {
        let old_position = self.position();
        let valid = match self.mode {
            Mode::Writing => self.memory.position(),
            Mode::Reading => self.memory.limit(),
        };

        let file = ensure_file(&mut self.file, self.directory.as_deref())?;
        tracing::trace!(bytes = valid, file_length = file.len(), "spilling memory buffer");
        file.append(self.memory.head(valid))?;

        self.memory.clear();
        if self.mode == Mode::Reading {
            self.memory.set_limit(0);
        }
        file.seek(old_position)
    }

    fn finish_reading(&mut self) -> Result<()> {
        if self.mode == Mode::Reading {
            self.memory.set_position(self.memory.limit());
            self.memory.set_limit(self.memory.capacity());
            // set_limit keeps the position, now at the end of captured data
            if let Some(file) = self.file.as_mut() {
                file.seek(file.len())?;
            }
            self.mode = Mode::Writing;
        }
        Ok(())
    }

    fn file_position(&self) -> u64 {
        self.file.as_ref().map_or(0, CacheFile::position)
    }

    fn file_length(&self) -> u64 {
        self.file.as_ref().map_or(0, CacheFile::len)
    }
}

fn ensure_file<'a>(
    slot: &'a mut Option<CacheFile>,
    directory: Option<&Path>,
) -> Result<&'a mut CacheFile> {
    let file = match slot.take() {
        Some(file) => file,
        None => CacheFile::create(LAZY_CACHE_FILE_PREFIX, directory)?,
    };
    Ok(slot.insert(file))
}

#[cfg(test)]
mod tests {
    use super::{HybridBuffer, Mode};
    use crate::io::ReplayError;

    fn bytes(range: std::ops::Range<u8>) -> Vec<u8> {
        range.collect()
    }

    fn read_all(buffer: &mut HybridBuffer) -> Vec<u8> {
        let mut out = Vec::new();
        let mut chunk = [0_u8; 3];
        loop {
            let n = buffer.read(&mut chunk).expect("read should succeed");
            if n == 0 {
                return out;
            }
            out.extend_from_slice(&chunk[..n]);
        }
    }

    fn assert_position_invariant(buffer: &HybridBuffer) {
        assert_eq!(
            buffer.position(),
            buffer.file_position() + buffer.memory.position() as u64,
            "logical position should be file cursor plus memory position"
        );
    }

    #[test]
    fn test_starts_writing_without_file() {
        let buffer = HybridBuffer::new(8, None);
        assert_eq!(Mode::Writing, buffer.mode());
        assert!(buffer.cache_file().is_none());
        assert_eq!(0, buffer.position());
    }

    #[test]
    fn test_read_while_writing_fails() {
        let mut buffer = HybridBuffer::new(8, None);
        buffer.write(&[1, 2]).unwrap();

        match buffer.read(&mut [0; 2]) {
            Err(ReplayError::NotReading) => {}
            other => panic!("expected a usage error, got {other:?}"),
        }
    }

    #[test]
    fn test_file_created_only_on_overflow() {
        let dir = tempfile::tempdir().expect("tempdir");
        let mut buffer = HybridBuffer::new(4, Some(dir.path().to_path_buf()));

        buffer.write(&[0, 1, 2]).unwrap();
        buffer.write(&[3]).unwrap();
        assert!(buffer.cache_file().is_none(), "four bytes should fit in memory");

        buffer.write(&[4]).unwrap();
        let path = buffer.cache_file().expect("overflow should create the file");
        assert!(path.starts_with(dir.path()));
        assert_eq!(4, buffer.file_length(), "memory contents should be spilled");
        assert_eq!(5, buffer.position());
        assert_position_invariant(&buffer);

        buffer.close().unwrap();
    }

    #[test]
    fn test_large_write_bypasses_memory() {
        let mut buffer = HybridBuffer::new(4, None);
        buffer.write(&[0, 1]).unwrap();
        buffer.write(&bytes(2..12)).unwrap();

        assert_eq!(12, buffer.file_length(), "oversized data should go to the file");
        assert_eq!(0, buffer.memory.position());
        assert_eq!(12, buffer.position());

        buffer.rewind().unwrap();
        assert_eq!(bytes(0..12), read_all(&mut buffer));
        buffer.close().unwrap();
    }

    #[test]
    fn test_rewind_with_mark_in_memory() {
        let mut buffer = HybridBuffer::new(16, None);
        buffer.write(&[0, 1, 2]).unwrap();
        buffer.mark();
        buffer.write(&[3, 4, 5]).unwrap();

        buffer.rewind().unwrap();
        assert!(buffer.is_reading());
        assert_eq!(3, buffer.position());
        assert_eq!(vec![3, 4, 5], read_all(&mut buffer));

        buffer.rewind().unwrap();
        assert_eq!(vec![3, 4, 5], read_all(&mut buffer), "replay should be repeatable");
    }

    #[test]
    fn test_rewind_with_mark_in_file() {
        let mut buffer = HybridBuffer::new(4, None);
        buffer.mark();
        buffer.write(&bytes(0..3)).unwrap();
        buffer.write(&bytes(3..6)).unwrap();
        buffer.write(&bytes(6..9)).unwrap();
        assert!(buffer.file_length() > 0);

        buffer.rewind().unwrap();
        assert_position_invariant(&buffer);
        assert_eq!(bytes(0..9), read_all(&mut buffer));
        buffer.close().unwrap();
    }

    #[test]
    fn test_rewind_with_mark_straddling_file_and_memory() {
        let mut buffer = HybridBuffer::new(8, None);
        buffer.write(&bytes(0..4)).unwrap();
        buffer.mark();
        buffer.write(&bytes(4..6)).unwrap();
        buffer.flush().unwrap();
        buffer.write(&bytes(6..9)).unwrap();

        assert_eq!(6, buffer.file_length());
        buffer.rewind().unwrap();
        assert_eq!(4, buffer.position());
        assert_eq!(bytes(4..9), read_all(&mut buffer), "file part then memory part");
        buffer.close().unwrap();
    }

    #[test]
    fn test_mark_after_flush_lands_in_memory() {
        let mut buffer = HybridBuffer::new(8, None);
        buffer.write(&bytes(0..4)).unwrap();
        buffer.flush().unwrap();
        buffer.write(&bytes(4..7)).unwrap();
        buffer.mark();
        buffer.write(&bytes(7..9)).unwrap();

        buffer.rewind().unwrap();
        assert_eq!(4, buffer.file_position(), "file cursor should be at its end");
        assert_eq!(3, buffer.memory.position());
        assert_eq!(bytes(7..9), read_all(&mut buffer));
        buffer.close().unwrap();
    }

    #[test]
    fn test_write_while_reading_appends_at_end() {
        let mut buffer = HybridBuffer::new(16, None);
        buffer.mark();
        buffer.write(&bytes(0..6)).unwrap();
        buffer.rewind().unwrap();

        let mut partial = [0_u8; 2];
        assert_eq!(2, buffer.read(&mut partial).unwrap());

        buffer.write(&bytes(6..8)).unwrap();
        assert_eq!(Mode::Writing, buffer.mode());
        assert_eq!(8, buffer.position(), "write should resume after captured data");

        buffer.rewind().unwrap();
        assert_eq!(bytes(0..8), read_all(&mut buffer), "no captured byte may be lost");
    }

    #[test]
    fn test_spill_while_reading_keeps_cursor() {
        let mut buffer = HybridBuffer::new(8, None);
        buffer.mark();
        buffer.write(&bytes(0..6)).unwrap();
        buffer.rewind().unwrap();

        let mut partial = [0_u8; 2];
        buffer.read(&mut partial).unwrap();
        buffer.flush().unwrap();

        assert!(buffer.is_reading(), "flush should not change the mode");
        assert_eq!(2, buffer.position());
        assert_position_invariant(&buffer);
        assert_eq!(bytes(2..6), read_all(&mut buffer));
        buffer.close().unwrap();
    }

    #[test]
    fn test_flush_writes_exact_bytes() {
        let mut buffer = HybridBuffer::new(16, None);
        buffer.mark();
        buffer.write(&bytes(0..5)).unwrap();
        buffer.flush().unwrap();

        let path = buffer.cache_file().expect("flush should create the file");
        assert_eq!(bytes(0..5), std::fs::read(path).unwrap());
        assert_eq!(5, buffer.position());
        buffer.close().unwrap();
    }

    #[test]
    fn test_flush_without_data_creates_empty_file() {
        let mut buffer = HybridBuffer::new(4, None);
        buffer.flush().unwrap();

        let path = buffer.cache_file().expect("flush should create the file");
        assert_eq!(0, std::fs::metadata(path).unwrap().len());
        buffer.close().unwrap();
    }

    #[test]
    fn test_zero_capacity_goes_straight_to_file() {
        let mut buffer = HybridBuffer::new(0, None);
        buffer.mark();
        buffer.write(&[1]).unwrap();
        buffer.write(&[2, 3]).unwrap();
        assert_eq!(3, buffer.file_length());

        buffer.rewind().unwrap();
        assert_eq!(vec![1, 2, 3], read_all(&mut buffer));
        buffer.close().unwrap();
    }

    #[test]
    fn test_close_deletes_cache_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let mut buffer = HybridBuffer::new(2, Some(dir.path().to_path_buf()));
        buffer.write(&bytes(0..5)).unwrap();
        let path = buffer.cache_file().unwrap().to_path_buf();
        assert!(path.exists());

        buffer.close().unwrap();
        assert!(!path.exists());
        assert_eq!(0, std::fs::read_dir(dir.path()).unwrap().count());
    }

    #[test]
    fn test_close_reports_delete_failure() {
        let mut buffer = HybridBuffer::new(2, None);
        buffer.write(&bytes(0..5)).unwrap();
        let path = buffer.cache_file().unwrap().to_path_buf();
        std::fs::remove_file(&path).unwrap();

        match buffer.close() {
            Err(ReplayError::DeleteCacheFile { path: reported, .. }) => {
                assert_eq!(path, reported)
            }
            other => panic!("expected a delete error, got {other:?}"),
        }
    }
}
