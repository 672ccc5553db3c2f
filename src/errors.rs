//! ## Errors
//!
//! file object error types

use std::io;
use std::string::FromUtf8Error;

use crate::mode::ModeError;

/// Result returned by every file object operation
pub type FileObjResult<T> = Result<T, FileObjError>;

/// File object error.
///
/// Native failures are always wrapped, so the variants don't depend on the backend in use.
#[derive(Debug, thiserror::Error)]
pub enum FileObjError {
    #[error("invalid mode: '{mode}' ({reason})")]
    InvalidMode { mode: String, reason: ModeError },
    #[error("could not open {target}: {source}")]
    OpenError {
        target: String,
        #[source]
        source: io::Error,
    },
    #[error("file not open for reading")]
    NotReadable,
    #[error("file not open for writing")]
    NotWritable,
    #[error("unsupported operation: {0}")]
    UnsupportedOperation(&'static str),
    #[error("I/O operation on closed file")]
    Closed,
    #[error("{op} failed: {source}")]
    Io {
        op: &'static str,
        #[source]
        source: io::Error,
    },
    #[error("could not decode text: {0}")]
    Decode(#[from] FromUtf8Error),
}

impl FileObjError {
    pub(crate) fn invalid_mode<S: AsRef<str>>(mode: S, reason: ModeError) -> Self {
        Self::InvalidMode {
            mode: mode.as_ref().to_string(),
            reason,
        }
    }

    pub(crate) fn open<S: ToString>(target: S, source: io::Error) -> Self {
        Self::OpenError {
            target: target.to_string(),
            source,
        }
    }

    pub(crate) fn io(op: &'static str, source: io::Error) -> Self {
        Self::Io { op, source }
    }

    /// Returns the `io::ErrorKind` this error maps to
    pub fn io_kind(&self) -> io::ErrorKind {
        match self {
            Self::InvalidMode { .. } => io::ErrorKind::InvalidInput,
            Self::OpenError { source, .. } | Self::Io { source, .. } => source.kind(),
            Self::NotReadable | Self::NotWritable | Self::UnsupportedOperation(_) => {
                io::ErrorKind::Unsupported
            }
            Self::Closed => io::ErrorKind::Other,
            Self::Decode(_) => io::ErrorKind::InvalidData,
        }
    }
}

impl From<FileObjError> for io::Error {
    fn from(err: FileObjError) -> Self {
        io::Error::new(err.io_kind(), err)
    }
}
