//! ## Local
//!
//! Native backend for paths on the local file system

use std::fs::{self, File, OpenOptions};
use std::io::{self, Read, Seek, SeekFrom, Write};
#[cfg(target_family = "unix")]
use std::os::unix::io::AsRawFd;
use std::path::{Path, PathBuf};

use remotefs::fs::UnixPex;

use super::{
    stream_closed, unsupported, InputStream, IoStream, NativeHandle, NativeKind, NativeStream,
    OpenFlags, OutputStream, Whence,
};

/// Handle to a local path
#[derive(Debug, Clone)]
pub struct LocalHandle {
    path: PathBuf,
    create_mode: UnixPex,
}

impl LocalHandle {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            create_mode: UnixPex::from(0o644),
        }
    }

    /// Permissions given to files created through this handle (UNIX only)
    pub fn create_mode(mut self, mode: UnixPex) -> Self {
        self.create_mode = mode;
        self
    }

    pub fn path(&self) -> &Path {
        self.path.as_path()
    }

    fn write_options(&self, flags: OpenFlags) -> OpenOptions {
        let mut opts = OpenOptions::new();
        opts.write(true)
            .append(flags.append)
            .truncate(flags.truncate)
            .create(flags.create && !flags.exclusive)
            .create_new(flags.exclusive);
        #[cfg(target_family = "unix")]
        {
            use std::os::unix::fs::OpenOptionsExt;
            opts.mode(u32::from(self.create_mode));
        }
        opts
    }

    /// Open the file for writing. In append mode the offset is moved to the end,
    /// since `O_APPEND` only moves it on the first write
    fn open_for_write(&self, flags: OpenFlags, read: bool) -> io::Result<File> {
        let mut file = self
            .write_options(flags)
            .read(read)
            .open(self.path.as_path())?;
        if flags.append && file.metadata()?.is_file() {
            file.seek(SeekFrom::End(0))?;
        }
        Ok(file)
    }
}

impl NativeHandle for LocalHandle {
    fn describe(&self) -> String {
        self.path.display().to_string()
    }

    fn query_kind(&mut self) -> io::Result<Option<NativeKind>> {
        match fs::metadata(self.path.as_path()) {
            Ok(meta) if meta.is_dir() => Ok(Some(NativeKind::Directory)),
            Ok(_) => Ok(Some(NativeKind::File)),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err),
        }
    }

    fn open_input(&mut self) -> io::Result<Box<dyn InputStream>> {
        trace!("opening {} for read", self.path.display());
        let file = File::open(self.path.as_path())?;
        Ok(Box::new(LocalStream::try_new(file)?))
    }

    fn open_output(&mut self, flags: OpenFlags) -> io::Result<Box<dyn OutputStream>> {
        trace!("opening {} for write ({:?})", self.path.display(), flags);
        let file = self.open_for_write(flags, false)?;
        Ok(Box::new(LocalStream::try_new(file)?))
    }

    fn open_io(&mut self, flags: OpenFlags) -> io::Result<Box<dyn IoStream>> {
        trace!("opening {} for read/write ({:?})", self.path.display(), flags);
        let file = self.open_for_write(flags, true)?;
        // a duplicated descriptor shares the offset of the original one
        let input = file.try_clone()?;
        Ok(Box::new(LocalDuplex {
            input: LocalStream::try_new(input)?,
            output: LocalStream::try_new(file)?,
        }))
    }
}

struct LocalStream {
    file: Option<File>,
    seekable: bool,
    #[cfg(target_family = "unix")]
    fd: i32,
}

impl LocalStream {
    fn try_new(file: File) -> io::Result<Self> {
        // pipes, sockets and character devices can't seek
        let seekable = file.metadata()?.is_file();
        Ok(Self {
            #[cfg(target_family = "unix")]
            fd: file.as_raw_fd(),
            file: Some(file),
            seekable,
        })
    }

    fn file(&mut self) -> io::Result<&mut File> {
        self.file.as_mut().ok_or_else(stream_closed)
    }
}

impl NativeStream for LocalStream {
    fn close(&mut self) -> io::Result<()> {
        // dropping the file closes the descriptor
        self.file.take();
        Ok(())
    }

    fn is_closed(&self) -> bool {
        self.file.is_none()
    }

    fn can_seek(&self) -> bool {
        self.seekable
    }

    fn tell(&mut self) -> io::Result<u64> {
        if !self.seekable {
            return Err(unsupported("tell"));
        }
        self.file()?.stream_position()
    }

    fn seek(&mut self, offset: i64, whence: Whence) -> io::Result<u64> {
        if !self.seekable {
            return Err(unsupported("seek"));
        }
        let pos = match whence {
            Whence::Start => SeekFrom::Start(u64::try_from(offset).map_err(|_| {
                io::Error::new(io::ErrorKind::InvalidInput, "negative seek position")
            })?),
            Whence::Current => SeekFrom::Current(offset),
            Whence::End => SeekFrom::End(offset),
        };
        self.file()?.seek(pos)
    }

    fn can_truncate(&self) -> bool {
        self.seekable
    }

    fn truncate(&mut self, size: u64) -> io::Result<()> {
        if !self.seekable {
            return Err(unsupported("truncate"));
        }
        self.file()?.set_len(size)
    }

    fn size_hint(&mut self) -> Option<u64> {
        match self.file.as_ref() {
            Some(file) if self.seekable => file.metadata().ok().map(|meta| meta.len()),
            _ => None,
        }
    }

    #[cfg(target_family = "unix")]
    fn fileno(&self) -> Option<i32> {
        self.file.as_ref().map(|_| self.fd)
    }
}

impl InputStream for LocalStream {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.file()?.read(buf)
    }
}

impl OutputStream for LocalStream {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.file()?.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.file()?.flush()
    }
}

struct LocalDuplex {
    input: LocalStream,
    output: LocalStream,
}

impl IoStream for LocalDuplex {
    fn split(self: Box<Self>) -> (Box<dyn InputStream>, Box<dyn OutputStream>) {
        (Box::new(self.input), Box::new(self.output))
    }
}

#[cfg(test)]
mod test {

    use super::*;

    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    #[test]
    fn should_query_kind() {
        let tempdir = TempDir::new().unwrap();
        let mut handle = LocalHandle::new(tempdir.path());
        assert_eq!(handle.query_kind().unwrap(), Some(NativeKind::Directory));
        let mut handle = LocalHandle::new(tempdir.path().join("a.txt"));
        assert_eq!(handle.query_kind().unwrap(), None);
        std::fs::write(tempdir.path().join("a.txt"), b"test data\n").unwrap();
        assert_eq!(handle.query_kind().unwrap(), Some(NativeKind::File));
    }

    #[test]
    fn should_write_and_read_back() {
        let tempdir = TempDir::new().unwrap();
        let mut handle = LocalHandle::new(tempdir.path().join("a.txt"));
        let mut output = handle
            .open_output(OpenFlags {
                create: true,
                truncate: true,
                ..Default::default()
            })
            .unwrap();
        assert_eq!(output.write(b"test data\n").unwrap(), 10);
        output.close().unwrap();
        assert!(output.is_closed());
        let mut input = handle.open_input().unwrap();
        assert!(input.can_seek());
        assert_eq!(input.size_hint(), Some(10));
        let mut buf = [0u8; 16];
        assert_eq!(input.read(&mut buf).unwrap(), 10);
        assert_eq!(&buf[..10], b"test data\n");
    }

    #[test]
    fn should_not_create_exclusive_file_twice() {
        let tempdir = TempDir::new().unwrap();
        let mut handle = LocalHandle::new(tempdir.path().join("a.txt"));
        let flags = OpenFlags {
            create: true,
            exclusive: true,
            ..Default::default()
        };
        assert!(handle.open_output(flags).is_ok());
        assert_eq!(
            handle.open_output(flags).err().unwrap().kind(),
            io::ErrorKind::AlreadyExists
        );
    }

    #[test]
    fn should_share_offset_in_duplex_stream() {
        let tempdir = TempDir::new().unwrap();
        let path = tempdir.path().join("a.txt");
        std::fs::write(path.as_path(), b"0123456789").unwrap();
        let mut handle = LocalHandle::new(path);
        let (mut input, mut output) = handle.open_io(OpenFlags::default()).unwrap().split();
        assert_eq!(output.write(b"ab").unwrap(), 2);
        assert_eq!(input.tell().unwrap(), 2);
        assert_eq!(input.seek(-2, Whence::End).unwrap(), 8);
        assert_eq!(output.tell().unwrap(), 8);
    }

    #[test]
    fn should_open_append_streams_at_end() {
        let tempdir = TempDir::new().unwrap();
        let path = tempdir.path().join("a.txt");
        std::fs::write(path.as_path(), b"spam").unwrap();
        let mut handle = LocalHandle::new(path.as_path());
        let flags = OpenFlags {
            create: true,
            append: true,
            ..Default::default()
        };
        let mut output = handle.open_output(flags).unwrap();
        assert_eq!(output.tell().unwrap(), 4);
        output.close().unwrap();
        let (mut input, mut output) = handle.open_io(flags).unwrap().split();
        assert_eq!(output.tell().unwrap(), 4);
        assert_eq!(input.tell().unwrap(), 4);
        let mut buf = [0u8; 8];
        assert_eq!(input.read(&mut buf).unwrap(), 0);
        assert_eq!(output.write(b"eggs").unwrap(), 4);
        output.close().unwrap();
        input.close().unwrap();
        assert_eq!(std::fs::read(path).unwrap(), b"spameggs".to_vec());
    }

    #[test]
    #[cfg(target_family = "unix")]
    fn should_create_file_with_mode() {
        use std::os::unix::fs::PermissionsExt;

        let tempdir = TempDir::new().unwrap();
        let path = tempdir.path().join("a.sh");
        let mut handle = LocalHandle::new(path.as_path()).create_mode(UnixPex::from(0o600));
        handle
            .open_output(OpenFlags {
                create: true,
                truncate: true,
                ..Default::default()
            })
            .unwrap()
            .close()
            .unwrap();
        let mode = std::fs::metadata(path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }

    #[test]
    #[cfg(target_family = "unix")]
    fn should_expose_descriptor() {
        let tempdir = TempDir::new().unwrap();
        let path = tempdir.path().join("a.txt");
        std::fs::write(path.as_path(), b"").unwrap();
        let mut input = LocalHandle::new(path).open_input().unwrap();
        assert!(input.fileno().is_some());
        input.close().unwrap();
        assert_eq!(input.fileno(), None);
    }
}
