//! Readers that can be marked and reset without holding the whole stream in memory.
//!
//! [`ReplayableReader`](io::ReplayableReader) wraps any [`Read`](std::io::Read).
//! Nothing is captured until the first `mark()`. After that, bytes read from
//! the source are kept in a small fixed-size memory buffer, and once that is
//! full they are moved to a temporary file. The file is only created when it
//! is needed, and it is deleted when the reader is closed or dropped.
//!
//! ```rust
//! use std::io::{Cursor, Read};
//! use replayable_reader::io::{ReplayStream, ReplayableReader};
//!
//! let data: Vec<u8> = (0..=255).collect();
//! let mut reader = ReplayableReader::with_capacity(16, Cursor::new(data.clone()));
//!
//! reader.mark(usize::MAX)?;
//! let mut head = [0_u8; 8];
//! reader.read_exact(&mut head)?;
//! assert!(reader.cache_file().is_none(), "eight bytes fit in memory");
//!
//! let mut rest = Vec::new();
//! reader.read_to_end(&mut rest)?;
//! assert!(reader.cache_file().is_some(), "the rest spilled to disk");
//!
//! reader.reset()?;
//! let mut replayed = Vec::new();
//! reader.read_to_end(&mut replayed)?;
//! assert_eq!(data, replayed);
//!
//! reader.close()?;
//! # Ok::<(), replayable_reader::io::ReplayError>(())
//! ```
//!
//! [`FileBufferedReader`](io::FileBufferedReader) skips the memory stage and
//! writes every byte to its cache file from the start.
pub mod io;
