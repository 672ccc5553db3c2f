//! ## File
//!
//! The file object: read, write, seek and lifecycle operations on top of the
//! native streams opened for a mode string.

use std::io::{self, Read, Seek, SeekFrom, Write};

use crate::errors::{FileObjError, FileObjResult};
use crate::mode::Disposition;
use crate::native::{
    already_exists, is_a_directory, not_found, InputStream, NativeHandle, NativeKind,
    OutputStream, Whence,
};
use crate::options::FileObjOptions;
use crate::utils::tty;

/// Native streams owned by a file object
enum Streams {
    Input(Box<dyn InputStream>),
    Output(Box<dyn OutputStream>),
    Duplex(Box<dyn InputStream>, Box<dyn OutputStream>),
}

impl Streams {
    fn input(&mut self) -> Option<&mut dyn InputStream> {
        match self {
            Self::Input(input) | Self::Duplex(input, _) => Some(input.as_mut()),
            Self::Output(_) => None,
        }
    }

    fn output(&mut self) -> Option<&mut dyn OutputStream> {
        match self {
            Self::Output(output) | Self::Duplex(_, output) => Some(output.as_mut()),
            Self::Input(_) => None,
        }
    }

    fn can_seek(&self) -> bool {
        match self {
            Self::Input(input) => input.can_seek(),
            Self::Output(output) => output.can_seek(),
            Self::Duplex(input, output) => input.can_seek() && output.can_seek(),
        }
    }

    fn tell(&mut self) -> io::Result<u64> {
        match self {
            Self::Input(input) | Self::Duplex(input, _) => input.tell(),
            Self::Output(output) => output.tell(),
        }
    }

    fn seek(&mut self, offset: i64, whence: Whence) -> io::Result<u64> {
        match self {
            Self::Input(input) => input.seek(offset, whence),
            Self::Output(output) => output.seek(offset, whence),
            // move the output first, then align the input on the resolved position
            // on failure both halves are put back where they were
            Self::Duplex(input, output) => {
                let previous = output.tell()?;
                let aligned = output.seek(offset, whence).and_then(|position| {
                    let position = i64::try_from(position).map_err(|_| {
                        io::Error::new(io::ErrorKind::InvalidInput, "seek position out of range")
                    })?;
                    input.seek(position, Whence::Start)
                });
                if aligned.is_err() {
                    let restored = i64::try_from(previous)
                        .map_err(|_| {
                            io::Error::new(io::ErrorKind::InvalidInput, "seek position out of range")
                        })
                        .and_then(|previous| output.seek(previous, Whence::Start));
                    if let Err(err) = restored {
                        warn!("could not restore output position after a failed seek: {}", err);
                    }
                }
                aligned
            }
        }
    }

    fn fileno(&self) -> Option<i32> {
        match self {
            Self::Input(input) | Self::Duplex(input, _) => input.fileno(),
            Self::Output(output) => output.fileno(),
        }
    }

    /// Close output before input, so pending writes land before the input is released
    fn close(&mut self) -> io::Result<()> {
        match self {
            Self::Input(input) => input.close(),
            Self::Output(output) => close_output(output.as_mut()),
            Self::Duplex(input, output) => {
                let output = close_output(output.as_mut());
                let input = input.close();
                output.and(input)
            }
        }
    }
}

fn close_output(output: &mut dyn OutputStream) -> io::Result<()> {
    let flushed = output.flush();
    let closed = output.close();
    flushed.and(closed)
}

/// A file object over native streams.
///
/// The object exclusively owns the streams it opened; the handle they were opened
/// from stays with the caller. Dropping an open file object closes it.
pub struct FileObject {
    name: String,
    disposition: Disposition,
    options: FileObjOptions,
    streams: Streams,
    closed: bool,
}

impl FileObject {
    /// Open `handle` with `mode`, using default options
    pub fn open<H: NativeHandle + ?Sized>(handle: &mut H, mode: &str) -> FileObjResult<Self> {
        Self::open_with(handle, mode, FileObjOptions::default())
    }

    /// Open `handle` with `mode`.
    ///
    /// The mode is parsed before any native call is issued. Fails with `OpenError` if the
    /// native layer can't provide the streams the mode requires.
    pub fn open_with<H: NativeHandle + ?Sized>(
        handle: &mut H,
        mode: &str,
        options: FileObjOptions,
    ) -> FileObjResult<Self> {
        let disposition = Disposition::parse(mode)?;
        let name = handle.describe();
        debug!("opening {} with mode '{}'", name, disposition);
        Self::check_target(handle, &name, &disposition)?;
        let flags = disposition.open_flags();
        let opened = match (disposition.wants_read, disposition.wants_write) {
            (true, true) => handle.open_io(flags).map(|io| {
                let (input, output) = io.split();
                Streams::Duplex(input, output)
            }),
            (true, false) => handle.open_input().map(Streams::Input),
            (false, _) => handle.open_output(flags).map(Streams::Output),
        };
        let streams = opened.map_err(|err| {
            error!("could not open {}: {}", name, err);
            FileObjError::open(&name, err)
        })?;
        debug!("{} opened", name);
        Ok(Self {
            name,
            disposition,
            options,
            streams,
            closed: false,
        })
    }

    /// Open `handle` with `mode` and run `f` on the file object.
    ///
    /// The file object is closed on every exit path; a close failure is reported
    /// only if `f` succeeded.
    pub fn scoped<H, F, T>(handle: &mut H, mode: &str, f: F) -> FileObjResult<T>
    where
        H: NativeHandle + ?Sized,
        F: FnOnce(&mut FileObject) -> FileObjResult<T>,
    {
        let mut file = Self::open(handle, mode)?;
        let result = f(&mut file);
        let closed = file.close();
        let value = result?;
        closed?;
        Ok(value)
    }

    fn check_target<H: NativeHandle + ?Sized>(
        handle: &mut H,
        name: &str,
        disposition: &Disposition,
    ) -> FileObjResult<()> {
        let kind = handle
            .query_kind()
            .map_err(|err| FileObjError::open(name, err))?;
        trace!("{} is {:?}", name, kind);
        match kind {
            Some(NativeKind::Directory) => Err(FileObjError::open(name, is_a_directory(name))),
            Some(NativeKind::File) if disposition.exclusive => {
                Err(FileObjError::open(name, already_exists(name)))
            }
            None if disposition.requires_existing() => {
                Err(FileObjError::open(name, not_found(name)))
            }
            _ => Ok(()),
        }
    }

    // -- file object protocol

    /// Read up to `size` bytes.
    ///
    /// With `None`, everything until EOF is read. Otherwise native reads are repeated until
    /// `size` bytes are collected; fewer bytes are returned only when EOF is reached.
    pub fn read(&mut self, size: Option<usize>) -> FileObjResult<Vec<u8>> {
        let chunk_size = self.options.chunk_size;
        let input = self.input()?;
        match size {
            Some(0) => Ok(Vec::new()),
            Some(size) => read_up_to(input, size, chunk_size),
            None => read_all(input, chunk_size),
        }
    }

    /// Issue a single native read into `buf`, returning the amount of bytes read
    pub fn read_into(&mut self, buf: &mut [u8]) -> FileObjResult<usize> {
        let input = self.input()?;
        if buf.is_empty() {
            return Ok(0);
        }
        read_chunk(input, buf)
    }

    /// Read a line terminated by `\n`, which is kept.
    ///
    /// Stops after `limit` bytes if given. Returns an empty buffer at EOF.
    pub fn read_line(&mut self, limit: Option<usize>) -> FileObjResult<Vec<u8>> {
        let input = self.input()?;
        let mut line = Vec::new();
        let mut byte = [0u8; 1];
        while limit.map_or(true, |limit| line.len() < limit) {
            if read_chunk(input, &mut byte)? == 0 {
                break;
            }
            line.push(byte[0]);
            if byte[0] == b'\n' {
                break;
            }
        }
        Ok(line)
    }

    /// Read all the remaining lines
    pub fn read_lines(&mut self) -> FileObjResult<Vec<Vec<u8>>> {
        let mut lines = Vec::new();
        loop {
            let line = self.read_line(None)?;
            if line.is_empty() {
                break;
            }
            lines.push(line);
        }
        Ok(lines)
    }

    /// Write all of `data`, returning the amount of bytes written
    pub fn write(&mut self, data: &[u8]) -> FileObjResult<usize> {
        let output = self.output()?;
        let mut written = 0;
        while written < data.len() {
            match output.write(&data[written..]) {
                Ok(0) => {
                    return Err(native_failure(
                        "write",
                        io::Error::new(io::ErrorKind::WriteZero, "native stream accepted no bytes"),
                    ))
                }
                Ok(n) => written += n,
                Err(err) if err.kind() == io::ErrorKind::Interrupted => continue,
                Err(err) => return Err(native_failure("write", err)),
            }
        }
        trace!("written {} bytes", written);
        Ok(written)
    }

    /// Write every line in `lines`. No line separator is added
    pub fn write_lines<I, B>(&mut self, lines: I) -> FileObjResult<()>
    where
        I: IntoIterator<Item = B>,
        B: AsRef<[u8]>,
    {
        for line in lines {
            self.write(line.as_ref())?;
        }
        Ok(())
    }

    /// Move the position to `offset`, relative to `whence`; returns the new absolute position
    pub fn seek(&mut self, offset: i64, whence: Whence) -> FileObjResult<u64> {
        self.check_seekable("seek")?;
        trace!("seeking {} to {} from {:?}", self.name, offset, whence);
        self.streams
            .seek(offset, whence)
            .map_err(|err| native_failure("seek", err))
    }

    /// Current absolute position
    pub fn tell(&mut self) -> FileObjResult<u64> {
        self.check_seekable("tell")?;
        self.streams
            .tell()
            .map_err(|err| native_failure("tell", err))
    }

    /// Flush the output stream. Does nothing if the file is not writable
    pub fn flush(&mut self) -> FileObjResult<()> {
        self.check_open()?;
        match self.streams.output() {
            Some(output) => output.flush().map_err(|err| native_failure("flush", err)),
            None => Ok(()),
        }
    }

    /// Resize the target to `size` bytes, or to the current position.
    /// The position is not changed
    pub fn truncate(&mut self, size: Option<u64>) -> FileObjResult<u64> {
        self.check_open()?;
        if !self
            .streams
            .output()
            .map_or(false, |output| output.can_truncate())
        {
            return Err(FileObjError::UnsupportedOperation("truncate"));
        }
        let size = match size {
            Some(size) => size,
            None => self.tell()?,
        };
        if let Some(output) = self.streams.output() {
            output
                .truncate(size)
                .map_err(|err| native_failure("truncate", err))?;
        }
        Ok(size)
    }

    /// Close the native streams.
    ///
    /// Only the first call has an effect; the file object is closed even if a native
    /// stream fails to close.
    pub fn close(&mut self) -> FileObjResult<()> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;
        debug!("closing {}", self.name);
        self.streams
            .close()
            .map_err(|err| native_failure("close", err))
    }

    pub fn closed(&self) -> bool {
        self.closed
    }

    pub fn readable(&self) -> bool {
        self.disposition.wants_read
    }

    pub fn writable(&self) -> bool {
        self.disposition.wants_write
    }

    /// Whether the native streams can seek
    pub fn seekable(&self) -> FileObjResult<bool> {
        self.check_open()?;
        Ok(self.streams.can_seek())
    }

    /// Raw descriptor of the native stream
    pub fn fileno(&self) -> FileObjResult<i32> {
        self.check_open()?;
        self.streams
            .fileno()
            .ok_or(FileObjError::UnsupportedOperation("fileno"))
    }

    /// Whether the native stream is attached to a terminal
    pub fn isatty(&self) -> FileObjResult<bool> {
        self.check_open()?;
        Ok(self.streams.fileno().map_or(false, tty::is_terminal))
    }

    pub fn mode(&self) -> Disposition {
        self.disposition
    }

    /// Description of the target given by the native handle
    pub fn name(&self) -> &str {
        self.name.as_str()
    }

    // -- private

    fn check_open(&self) -> FileObjResult<()> {
        if self.closed {
            Err(FileObjError::Closed)
        } else {
            Ok(())
        }
    }

    fn check_seekable(&self, op: &'static str) -> FileObjResult<()> {
        self.check_open()?;
        if self.streams.can_seek() {
            Ok(())
        } else {
            Err(FileObjError::UnsupportedOperation(op))
        }
    }

    fn input(&mut self) -> FileObjResult<&mut dyn InputStream> {
        self.check_open()?;
        self.streams.input().ok_or(FileObjError::NotReadable)
    }

    fn output(&mut self) -> FileObjResult<&mut dyn OutputStream> {
        self.check_open()?;
        self.streams.output().ok_or(FileObjError::NotWritable)
    }
}

impl Drop for FileObject {
    fn drop(&mut self) {
        if let Err(err) = self.close() {
            warn!("failed to close {}: {}", self.name, err);
        }
    }
}

impl Read for FileObject {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.read_into(buf).map_err(io::Error::from)
    }
}

impl Write for FileObject {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        FileObject::write(self, buf).map_err(io::Error::from)
    }

    fn flush(&mut self) -> io::Result<()> {
        FileObject::flush(self).map_err(io::Error::from)
    }
}

impl Seek for FileObject {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        let (offset, whence) = match pos {
            SeekFrom::Start(offset) => (
                i64::try_from(offset).map_err(|_| {
                    io::Error::new(io::ErrorKind::InvalidInput, "seek offset out of range")
                })?,
                Whence::Start,
            ),
            SeekFrom::Current(offset) => (offset, Whence::Current),
            SeekFrom::End(offset) => (offset, Whence::End),
        };
        FileObject::seek(self, offset, whence).map_err(io::Error::from)
    }
}

// -- native transfers

fn native_failure(op: &'static str, err: io::Error) -> FileObjError {
    error!("native {} failed: {}", op, err);
    FileObjError::io(op, err)
}

/// A single native read; interrupted calls are reissued
fn read_chunk(input: &mut dyn InputStream, buf: &mut [u8]) -> FileObjResult<usize> {
    loop {
        match input.read(buf) {
            Err(err) if err.kind() == io::ErrorKind::Interrupted => continue,
            result => return result.map_err(|err| native_failure("read", err)),
        }
    }
}

fn read_up_to(
    input: &mut dyn InputStream,
    size: usize,
    chunk_size: usize,
) -> FileObjResult<Vec<u8>> {
    let mut data = Vec::new();
    while data.len() < size {
        let filled = data.len();
        // grow geometrically rather than trusting `size` for the allocation
        let request = (size - filled).min(filled.max(chunk_size));
        data.resize(filled + request, 0);
        let n = read_chunk(input, &mut data[filled..])?;
        data.truncate(filled + n);
        if n == 0 {
            break;
        }
    }
    trace!("read {} of {} bytes", data.len(), size);
    Ok(data)
}

fn read_all(input: &mut dyn InputStream, chunk_size: usize) -> FileObjResult<Vec<u8>> {
    // one byte more than what is left, so EOF is usually detected by the second read
    let mut bufsize = remaining(input)
        .and_then(|remaining| usize::try_from(remaining).ok())
        .map_or(chunk_size, |remaining| remaining.saturating_add(1));
    let mut data = Vec::new();
    loop {
        if data.len() >= bufsize {
            bufsize = data.len() + data.len().max(chunk_size);
        }
        let filled = data.len();
        data.resize(bufsize, 0);
        let n = read_chunk(input, &mut data[filled..])?;
        data.truncate(filled + n);
        if n == 0 {
            break;
        }
    }
    trace!("read {} bytes until EOF", data.len());
    Ok(data)
}

fn remaining(input: &mut dyn InputStream) -> Option<u64> {
    if !input.can_seek() {
        return None;
    }
    let size = input.size_hint()?;
    let position = input.tell().ok()?;
    Some(size.saturating_sub(position))
}
