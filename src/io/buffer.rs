/// A fixed-capacity memory region with a position and a limit.
///
/// While capturing, `pos` is the append cursor and `limit` equals the capacity.
/// While replaying, `limit` marks the end of the valid bytes and `pos` is the
/// read cursor. The backing storage is allocated once and never reallocated.
#[derive(Debug, PartialEq)]
pub(crate) struct Buffer {
    pos: usize,
    limit: usize,
    buffer: Box<[u8]>,
}

impl Buffer {
    /// Creates a new buffer holding at most `capacity` bytes.
    pub fn new(capacity: usize) -> Buffer {
        Buffer {
            pos: 0,
            limit: capacity,
            buffer: vec![0; capacity].into_boxed_slice(),
        }
    }

    pub fn capacity(&self) -> usize {
        self.buffer.len()
    }

    pub fn position(&self) -> usize {
        self.pos
    }

    pub fn limit(&self) -> usize {
        self.limit
    }

    /// Gets the number of bytes between the position and the limit
    pub fn remaining(&self) -> usize {
        self.limit - self.pos
    }

    pub fn set_position(&mut self, pos: usize) {
        debug_assert!(pos <= self.limit, "position {pos} beyond limit {}", self.limit);
        self.pos = pos;
    }

    pub fn set_limit(&mut self, limit: usize) {
        debug_assert!(limit <= self.capacity());
        self.limit = limit;
        self.pos = self.pos.min(limit);
    }

    /// Resets the position to zero and the limit to the capacity,
    /// discarding the contents.
    pub fn clear(&mut self) {
        self.pos = 0;
        self.limit = self.capacity();
    }

    /// Ends a capture: the limit becomes the current position and the
    /// position returns to the start, so the captured bytes can be replayed.
    pub fn flip(&mut self) {
        self.limit = self.pos;
        self.pos = 0;
    }

    /// Moves the position back to the start, keeping the limit.
    pub fn rewind(&mut self) {
        self.pos = 0;
    }

    /// Returns the first `end` bytes of the region.
    pub fn head(&self, end: usize) -> &[u8] {
        &self.buffer[..end]
    }

    /// Copies `buf` to the position and advances it. The caller must have
    /// checked `remaining()` beforehand.
    pub fn put(&mut self, buf: &[u8]) {
        let end = self.pos + buf.len();
        debug_assert!(end <= self.limit, "put of {} bytes overflows", buf.len());
        self.buffer[self.pos..end].copy_from_slice(buf);
        self.pos = end;
    }

    /// Reads values from this buffer into the provided `buf`.
    /// Returns the number of bytes placed in the provided `buf`
    pub fn read_into(&mut self, buf: &mut [u8]) -> usize {
        let bytes_to_read = self.remaining().min(buf.len());
        buf[..bytes_to_read].copy_from_slice(&self.buffer[self.pos..self.pos + bytes_to_read]);
        self.pos += bytes_to_read;
        bytes_to_read
    }
}
