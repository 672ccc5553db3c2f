//! ## Remote
//!
//! Native backend for a path on a `remotefs` client.
//!
//! Remote streams are forward only: they never report the seek capability,
//! and they can't be opened for both reading and writing.

use std::cell::RefCell;
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use std::rc::Rc;

use remotefs::fs::{Metadata, ReadStream, UnixPex, WriteStream};
use remotefs::{RemoteError, RemoteErrorType, RemoteFs};

use super::{
    already_exists, not_found, stream_closed, InputStream, IoStream, NativeHandle, NativeKind,
    NativeStream, OpenFlags, OutputStream,
};

/// Handle to a path on a remote file system
pub struct RemoteHandle<C: RemoteFs> {
    client: Rc<RefCell<C>>,
    path: PathBuf,
    metadata: Metadata,
}

impl<C: RemoteFs> RemoteHandle<C> {
    /// Create a handle to `path`. The client must already be connected
    pub fn new<P: AsRef<Path>>(client: Rc<RefCell<C>>, path: P) -> Self {
        Self {
            client,
            path: path.as_ref().to_path_buf(),
            metadata: Metadata::default().mode(UnixPex::from(0o644)),
        }
    }

    /// Metadata passed to the client when the file is created or appended to
    pub fn metadata(mut self, metadata: Metadata) -> Self {
        self.metadata = metadata;
        self
    }

    pub fn path(&self) -> &Path {
        self.path.as_path()
    }

    fn exists(&self) -> io::Result<bool> {
        self.client
            .borrow_mut()
            .exists(self.path.as_path())
            .map_err(remote_error)
    }
}

impl<C: RemoteFs + 'static> NativeHandle for RemoteHandle<C> {
    fn describe(&self) -> String {
        self.path.display().to_string()
    }

    fn query_kind(&mut self) -> io::Result<Option<NativeKind>> {
        if !self.exists()? {
            return Ok(None);
        }
        let file = self
            .client
            .borrow_mut()
            .stat(self.path.as_path())
            .map_err(remote_error)?;
        Ok(Some(if file.is_dir() {
            NativeKind::Directory
        } else {
            NativeKind::File
        }))
    }

    fn open_input(&mut self) -> io::Result<Box<dyn InputStream>> {
        trace!("opening remote file {} for read", self.path.display());
        let stream = self
            .client
            .borrow_mut()
            .open(self.path.as_path())
            .map_err(remote_error)?;
        Ok(Box::new(RemoteInput {
            client: self.client.clone(),
            stream: Some(stream),
        }))
    }

    fn open_output(&mut self, flags: OpenFlags) -> io::Result<Box<dyn OutputStream>> {
        trace!(
            "opening remote file {} for write ({:?})",
            self.path.display(),
            flags
        );
        let exists = self.exists()?;
        if exists && flags.exclusive {
            return Err(already_exists(&self.describe()));
        }
        if !exists && !flags.create {
            return Err(not_found(&self.describe()));
        }
        let mut client = self.client.borrow_mut();
        let stream = if flags.append {
            client.append(self.path.as_path(), &self.metadata)
        } else {
            client.create(self.path.as_path(), &self.metadata)
        }
        .map_err(remote_error)?;
        Ok(Box::new(RemoteOutput {
            client: self.client.clone(),
            stream: Some(stream),
        }))
    }

    fn open_io(&mut self, _flags: OpenFlags) -> io::Result<Box<dyn IoStream>> {
        Err(io::Error::new(
            io::ErrorKind::Unsupported,
            "remote files can't be opened for both reading and writing",
        ))
    }
}

struct RemoteInput<C: RemoteFs> {
    client: Rc<RefCell<C>>,
    stream: Option<ReadStream>,
}

impl<C: RemoteFs> NativeStream for RemoteInput<C> {
    fn close(&mut self) -> io::Result<()> {
        match self.stream.take() {
            Some(stream) => self
                .client
                .borrow_mut()
                .on_read(stream)
                .map_err(remote_error),
            None => Ok(()),
        }
    }

    fn is_closed(&self) -> bool {
        self.stream.is_none()
    }
}

impl<C: RemoteFs> InputStream for RemoteInput<C> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.stream.as_mut().ok_or_else(stream_closed)?.read(buf)
    }
}

struct RemoteOutput<C: RemoteFs> {
    client: Rc<RefCell<C>>,
    stream: Option<WriteStream>,
}

impl<C: RemoteFs> NativeStream for RemoteOutput<C> {
    fn close(&mut self) -> io::Result<()> {
        match self.stream.take() {
            Some(mut stream) => {
                stream.flush()?;
                self.client
                    .borrow_mut()
                    .on_written(stream)
                    .map_err(remote_error)
            }
            None => Ok(()),
        }
    }

    fn is_closed(&self) -> bool {
        self.stream.is_none()
    }
}

impl<C: RemoteFs> OutputStream for RemoteOutput<C> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.stream.as_mut().ok_or_else(stream_closed)?.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.stream.as_mut().ok_or_else(stream_closed)?.flush()
    }
}

fn remote_error(err: RemoteError) -> io::Error {
    error!("remote file system error: {}", err);
    let kind = match err.kind {
        RemoteErrorType::UnsupportedFeature => io::ErrorKind::Unsupported,
        RemoteErrorType::FileCreateDenied => io::ErrorKind::PermissionDenied,
        RemoteErrorType::DirectoryAlreadyExists => io::ErrorKind::AlreadyExists,
        RemoteErrorType::ConnectionError => io::ErrorKind::NotConnected,
        _ => io::ErrorKind::Other,
    };
    io::Error::new(kind, err)
}
