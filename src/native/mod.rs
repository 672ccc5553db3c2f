//! ## Native
//!
//! The native layer the file object is built on: an opaque handle to a target,
//! and the chunk-oriented streams opened against it.
//!
//! Streams advertise optional features (seeking, truncation, descriptors) through
//! capability queries. A stream that doesn't support a feature must report `false`
//! (or `None`) from the query; the default operation bodies then fail with
//! `io::ErrorKind::Unsupported`.

use std::io;

pub mod local;
pub mod memory;
pub mod remote;

pub use local::LocalHandle;
pub use memory::{MemoryEvent, MemoryHandle};
pub use remote::RemoteHandle;

/// Kind of target a handle refers to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NativeKind {
    File,
    Directory,
}

/// Reference point for a seek offset
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Whence {
    #[default]
    Start,
    Current,
    End,
}

/// Disposition flags passed to the native layer when opening for write
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct OpenFlags {
    /// Create the target if absent
    pub create: bool,
    /// Truncate the target to 0 bytes
    pub truncate: bool,
    /// Every write lands at the end of the target
    pub append: bool,
    /// Fail if the target already exists
    pub exclusive: bool,
}

/// Opaque reference to a location, owned by the caller.
pub trait NativeHandle {
    /// Human readable description of the target, used in errors
    fn describe(&self) -> String;

    /// Query the kind of target. `None` if the target doesn't exist
    fn query_kind(&mut self) -> io::Result<Option<NativeKind>>;

    /// Open a stream to read the target from the start
    fn open_input(&mut self) -> io::Result<Box<dyn InputStream>>;

    /// Open a stream to write the target
    fn open_output(&mut self, flags: OpenFlags) -> io::Result<Box<dyn OutputStream>>;

    /// Open a stream to both read and write the target
    fn open_io(&mut self, flags: OpenFlags) -> io::Result<Box<dyn IoStream>>;
}

/// Operations and capability queries shared by every native stream
pub trait NativeStream {
    /// Close the stream. Closing a closed stream is a no-op
    fn close(&mut self) -> io::Result<()>;

    fn is_closed(&self) -> bool;

    fn can_seek(&self) -> bool {
        false
    }

    /// Current absolute position
    fn tell(&mut self) -> io::Result<u64> {
        Err(unsupported("tell"))
    }

    /// Move the position and return the new absolute position
    fn seek(&mut self, _offset: i64, _whence: Whence) -> io::Result<u64> {
        Err(unsupported("seek"))
    }

    fn can_truncate(&self) -> bool {
        false
    }

    fn truncate(&mut self, _size: u64) -> io::Result<()> {
        Err(unsupported("truncate"))
    }

    /// Size of the target in bytes, if known
    fn size_hint(&mut self) -> Option<u64> {
        None
    }

    /// Raw file descriptor, if the stream is descriptor backed
    fn fileno(&self) -> Option<i32> {
        None
    }
}

/// A stream bytes are read from
pub trait InputStream: NativeStream {
    /// Read up to `buf.len()` bytes. Fewer bytes are not an error; 0 means EOF
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize>;
}

/// A stream bytes are written to
pub trait OutputStream: NativeStream {
    /// Write some of `buf`, returning how many bytes were accepted
    fn write(&mut self, buf: &[u8]) -> io::Result<usize>;

    fn flush(&mut self) -> io::Result<()>;
}

/// A stream opened for both reading and writing
pub trait IoStream {
    /// Split into its input and output halves.
    /// Both halves view the same target and share its position
    fn split(self: Box<Self>) -> (Box<dyn InputStream>, Box<dyn OutputStream>);
}

pub(crate) fn unsupported(op: &str) -> io::Error {
    io::Error::new(
        io::ErrorKind::Unsupported,
        format!("{} is not supported by this stream", op),
    )
}

pub(crate) fn not_found(name: &str) -> io::Error {
    io::Error::new(
        io::ErrorKind::NotFound,
        format!("No such file or directory: '{}'", name),
    )
}

pub(crate) fn already_exists(name: &str) -> io::Error {
    io::Error::new(
        io::ErrorKind::AlreadyExists,
        format!("File exists: '{}'", name),
    )
}

pub(crate) fn is_a_directory(name: &str) -> io::Error {
    io::Error::new(io::ErrorKind::Other, format!("Is a directory: '{}'", name))
}

pub(crate) fn stream_closed() -> io::Error {
    io::Error::new(io::ErrorKind::Other, "stream is closed")
}

/// Resolve a seek request against the current position and the target size
pub(crate) fn resolve_seek(position: u64, size: u64, offset: i64, whence: Whence) -> io::Result<u64> {
    let base = match whence {
        Whence::Start => 0,
        Whence::Current => position as i128,
        Whence::End => size as i128,
    };
    let target = base + offset as i128;
    if target < 0 || target > u64::MAX as i128 {
        return Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("invalid seek to a negative or overflowing position ({})", target),
        ));
    }
    Ok(target as u64)
}
