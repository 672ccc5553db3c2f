#![crate_name = "filelike"]
#![crate_type = "lib"]

//! # filelike
//!
//! filelike turns handle-based native streams into file objects: opened with a mode string,
//! read and written with whole-buffer semantics, seekable when the native layer allows it,
//! and closed exactly once.
//!
//! ## Get started
//!
//! First of all you need to add **filelike** to your project dependencies:
//!
//! ```toml
//! filelike = "^0.1"
//! ```
//!
//! these features are supported:
//!
//! - `no-log`: disable logging. By default, this library will log via the `log` crate.
//!
//! ### Native handles
//!
//! A file object is opened from a [`NativeHandle`]. These handles are provided:
//!
//! - [`LocalHandle`]: a path on the local file system
//! - [`RemoteHandle`]: a path on any [remotefs](https://github.com/remotefs-rs/remotefs-rs) client
//! - [`MemoryHandle`]: an in-memory target
//!
//! ### Binary files
//!
//! ```rust
//! use filelike::{MemoryHandle, Whence};
//!
//! let mut handle = MemoryHandle::new();
//! let mut file = filelike::open(&mut handle, "w+b").unwrap();
//! assert_eq!(file.write(b"spam and eggs").unwrap(), 13);
//! // seek back and read
//! assert_eq!(file.seek(5, Whence::Start).unwrap(), 5);
//! assert_eq!(file.read(None).unwrap(), b"and eggs".to_vec());
//! assert!(file.close().is_ok());
//! ```
//!
//! ### Text files
//!
//! ```rust
//! use filelike::{MemoryHandle, TextOptions};
//!
//! let mut handle = MemoryHandle::with_contents("first\r\nsecond\n");
//! let mut file = filelike::open_text(&mut handle, "r", TextOptions::default()).unwrap();
//! assert_eq!(file.read_line().unwrap(), "first\n");
//! ```
//!

#![doc(html_playground_url = "https://play.rust-lang.org")]

// -- crates
#[macro_use]
extern crate log;

mod errors;
mod file;
mod mode;
pub mod native;
mod options;
mod text;

pub use errors::{FileObjError, FileObjResult};
pub use file::FileObject;
pub use mode::{Disposition, ModeError, DEFAULT_MODE};
pub use native::{
    InputStream, IoStream, LocalHandle, MemoryEvent, MemoryHandle, NativeHandle, NativeKind,
    NativeStream, OpenFlags, OutputStream, RemoteHandle, Whence,
};
pub use options::{DecodeErrors, FileObjOptions, Newline, TextOptions, DEFAULT_CHUNK_SIZE};
pub use text::{Lines, TextFile};

// -- utils
pub(crate) mod utils;
// -- mock
#[cfg(test)]
pub(crate) mod mock;

/// Open `handle` as a binary file object, see [`FileObject::open`]
pub fn open<H: NativeHandle + ?Sized>(handle: &mut H, mode: &str) -> FileObjResult<FileObject> {
    FileObject::open(handle, mode)
}

/// Open `handle` as a binary file object with `options`
pub fn open_with<H: NativeHandle + ?Sized>(
    handle: &mut H,
    mode: &str,
    options: FileObjOptions,
) -> FileObjResult<FileObject> {
    FileObject::open_with(handle, mode, options)
}

/// Open `handle` as a text file object
pub fn open_text<H: NativeHandle + ?Sized>(
    handle: &mut H,
    mode: &str,
    options: TextOptions,
) -> FileObjResult<TextFile> {
    TextFile::open(handle, mode, options)
}
