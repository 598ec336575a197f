//! Error types for replayable streams.

use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur while capturing or replaying a stream.
#[derive(Error, Debug)]
pub enum ReplayError {
    /// The stream was used after `close()`
    #[error("stream is closed")]
    Closed,

    /// `reset()` or `flush()` was called before any `mark()`
    #[error("mark has not been set")]
    MarkNotSet,

    /// The hybrid buffer was read while capturing
    #[error("buffer not in reading mode")]
    NotReading,

    /// The eager stream was re-marked after data had been captured
    #[error("mark cannot be reset after data has been read")]
    MarkCannotBeReset,

    /// The cache file could not be removed on close
    #[error("could not delete temporary file {}", path.display())]
    DeleteCacheFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<ReplayError> for std::io::Error {
    fn from(value: ReplayError) -> Self {
        use std::io::ErrorKind;

        match value {
            ReplayError::Io(err) => err,
            other => {
                let kind = match &other {
                    ReplayError::DeleteCacheFile { source, .. } => source.kind(),
                    ReplayError::MarkNotSet
                    | ReplayError::NotReading
                    | ReplayError::MarkCannotBeReset => ErrorKind::InvalidInput,
                    ReplayError::Closed | ReplayError::Io(_) => ErrorKind::Other,
                };
                std::io::Error::new(kind, other)
            }
        }
    }
}

/// Result type alias for replay operations.
pub type Result<T> = std::result::Result<T, ReplayError>;
