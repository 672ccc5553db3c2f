//! ## Memory
//!
//! In-process native backend.
//!
//! Besides holding a target in memory, the handle can mimic the behaviour of
//! less friendly native layers: short reads and writes, pipe-like streams which
//! can't seek, and targets that can't be written.

use std::cell::{Cell, RefCell};
use std::io;
use std::rc::Rc;

use super::{
    already_exists, is_a_directory, not_found, resolve_seek, stream_closed, unsupported,
    InputStream, IoStream, NativeHandle, NativeKind, NativeStream, OpenFlags, OutputStream, Whence,
};

/// Native calls recorded by a `MemoryHandle`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemoryEvent {
    OpenedInput,
    OpenedOutput,
    OpenedIo,
    ClosedInput,
    ClosedOutput,
}

#[derive(Debug)]
enum Entry {
    File(Vec<u8>),
    Directory,
}

#[derive(Debug, Default)]
struct Shared {
    entry: Option<Entry>,
    events: Vec<MemoryEvent>,
}

/// Handle to an in-memory target.
///
/// Clones refer to the same target.
#[derive(Debug, Clone)]
pub struct MemoryHandle {
    shared: Rc<RefCell<Shared>>,
    name: String,
    chunk_limit: Option<usize>,
    seekable: bool,
    read_only: bool,
}

impl Default for MemoryHandle {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryHandle {
    /// Handle to a target which doesn't exist yet
    pub fn new() -> Self {
        Self {
            shared: Rc::new(RefCell::new(Shared::default())),
            name: String::from("<memory>"),
            chunk_limit: None,
            seekable: true,
            read_only: false,
        }
    }

    /// Handle to an existing target holding `data`
    pub fn with_contents<B: AsRef<[u8]>>(data: B) -> Self {
        let handle = Self::new();
        handle.shared.borrow_mut().entry = Some(Entry::File(data.as_ref().to_vec()));
        handle
    }

    /// Handle to a directory
    pub fn directory() -> Self {
        let handle = Self::new();
        handle.shared.borrow_mut().entry = Some(Entry::Directory);
        handle
    }

    pub fn name<S: AsRef<str>>(mut self, name: S) -> Self {
        self.name = name.as_ref().to_string();
        self
    }

    /// Max amount of bytes transferred by a single native read or write
    pub fn chunk_limit(mut self, limit: usize) -> Self {
        self.chunk_limit = Some(limit.max(1));
        self
    }

    /// Whether streams opened from now on can seek
    pub fn seekable(mut self, seekable: bool) -> Self {
        self.seekable = seekable;
        self
    }

    /// Refuse to open the target for writing
    pub fn read_only(mut self, read_only: bool) -> Self {
        self.read_only = read_only;
        self
    }

    /// Current contents of the target, if it is an existing file
    pub fn contents(&self) -> Option<Vec<u8>> {
        match self.shared.borrow().entry.as_ref() {
            Some(Entry::File(data)) => Some(data.clone()),
            _ => None,
        }
    }

    /// Native calls issued so far
    pub fn events(&self) -> Vec<MemoryEvent> {
        self.shared.borrow().events.clone()
    }

    fn record(&self, event: MemoryEvent) {
        self.shared.borrow_mut().events.push(event);
    }

    fn prepare_write(&mut self, flags: OpenFlags) -> io::Result<u64> {
        if self.read_only {
            return Err(io::Error::new(
                io::ErrorKind::PermissionDenied,
                format!("Permission denied: '{}'", self.name),
            ));
        }
        let mut shared = self.shared.borrow_mut();
        match shared.entry.as_mut() {
            Some(Entry::Directory) => Err(is_a_directory(&self.name)),
            Some(Entry::File(_)) if flags.exclusive => Err(already_exists(&self.name)),
            Some(Entry::File(data)) => {
                if flags.truncate {
                    data.clear();
                }
                Ok(if flags.append { data.len() as u64 } else { 0 })
            }
            None if flags.create => {
                shared.entry = Some(Entry::File(Vec::new()));
                Ok(0)
            }
            None => Err(not_found(&self.name)),
        }
    }

    fn stream(&self, role: Role, cursor: Rc<Cell<u64>>, append: bool) -> MemoryStream {
        MemoryStream {
            shared: self.shared.clone(),
            cursor,
            role,
            append,
            chunk_limit: self.chunk_limit,
            seekable: self.seekable,
            closed: false,
        }
    }
}

impl NativeHandle for MemoryHandle {
    fn describe(&self) -> String {
        self.name.clone()
    }

    fn query_kind(&mut self) -> io::Result<Option<NativeKind>> {
        Ok(match self.shared.borrow().entry {
            Some(Entry::File(_)) => Some(NativeKind::File),
            Some(Entry::Directory) => Some(NativeKind::Directory),
            None => None,
        })
    }

    fn open_input(&mut self) -> io::Result<Box<dyn InputStream>> {
        match self.shared.borrow().entry {
            Some(Entry::File(_)) => {}
            Some(Entry::Directory) => return Err(is_a_directory(&self.name)),
            None => return Err(not_found(&self.name)),
        }
        self.record(MemoryEvent::OpenedInput);
        Ok(Box::new(self.stream(
            Role::Input,
            Rc::new(Cell::new(0)),
            false,
        )))
    }

    fn open_output(&mut self, flags: OpenFlags) -> io::Result<Box<dyn OutputStream>> {
        let position = self.prepare_write(flags)?;
        self.record(MemoryEvent::OpenedOutput);
        Ok(Box::new(self.stream(
            Role::Output,
            Rc::new(Cell::new(position)),
            flags.append,
        )))
    }

    fn open_io(&mut self, flags: OpenFlags) -> io::Result<Box<dyn IoStream>> {
        let position = self.prepare_write(flags)?;
        self.record(MemoryEvent::OpenedIo);
        let cursor = Rc::new(Cell::new(position));
        Ok(Box::new(MemoryDuplex {
            input: self.stream(Role::Input, cursor.clone(), false),
            output: self.stream(Role::Output, cursor, flags.append),
        }))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Role {
    Input,
    Output,
}

struct MemoryStream {
    shared: Rc<RefCell<Shared>>,
    cursor: Rc<Cell<u64>>,
    role: Role,
    append: bool,
    chunk_limit: Option<usize>,
    seekable: bool,
    closed: bool,
}

impl MemoryStream {
    fn check_open(&self) -> io::Result<()> {
        if self.closed {
            Err(stream_closed())
        } else {
            Ok(())
        }
    }

    fn chunk(&self, requested: usize) -> usize {
        self.chunk_limit.map_or(requested, |limit| requested.min(limit))
    }

    fn with_data<T>(&self, f: impl FnOnce(&mut Vec<u8>) -> T) -> io::Result<T> {
        match self.shared.borrow_mut().entry.as_mut() {
            Some(Entry::File(data)) => Ok(f(data)),
            _ => Err(io::Error::new(
                io::ErrorKind::NotFound,
                "target has been removed",
            )),
        }
    }
}

impl NativeStream for MemoryStream {
    fn close(&mut self) -> io::Result<()> {
        if !self.closed {
            self.closed = true;
            self.shared.borrow_mut().events.push(match self.role {
                Role::Input => MemoryEvent::ClosedInput,
                Role::Output => MemoryEvent::ClosedOutput,
            });
        }
        Ok(())
    }

    fn is_closed(&self) -> bool {
        self.closed
    }

    fn can_seek(&self) -> bool {
        self.seekable
    }

    fn tell(&mut self) -> io::Result<u64> {
        self.check_open()?;
        if !self.seekable {
            return Err(unsupported("tell"));
        }
        Ok(self.cursor.get())
    }

    fn seek(&mut self, offset: i64, whence: Whence) -> io::Result<u64> {
        self.check_open()?;
        if !self.seekable {
            return Err(unsupported("seek"));
        }
        let size = self.with_data(|data| data.len() as u64)?;
        let position = resolve_seek(self.cursor.get(), size, offset, whence)?;
        self.cursor.set(position);
        Ok(position)
    }

    fn can_truncate(&self) -> bool {
        self.seekable && self.role == Role::Output
    }

    fn truncate(&mut self, size: u64) -> io::Result<()> {
        self.check_open()?;
        if !self.can_truncate() {
            return Err(unsupported("truncate"));
        }
        let size = to_index(size)?;
        self.with_data(|data| {
            if size < data.len() {
                data.truncate(size);
                Ok(())
            } else {
                grow(data, size)
            }
        })?
    }

    fn size_hint(&mut self) -> Option<u64> {
        if self.seekable {
            self.with_data(|data| data.len() as u64).ok()
        } else {
            None
        }
    }
}

impl InputStream for MemoryStream {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.check_open()?;
        let position = to_index(self.cursor.get())?;
        let amount = self.chunk(buf.len());
        let read = self.with_data(|data| {
            let available = data.len().saturating_sub(position);
            let n = amount.min(available);
            if n == 0 {
                return 0;
            }
            buf[..n].copy_from_slice(&data[position..position + n]);
            n
        })?;
        self.cursor.set((position + read) as u64);
        Ok(read)
    }
}

impl OutputStream for MemoryStream {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.check_open()?;
        let amount = self.chunk(buf.len());
        let append = self.append;
        let cursor = to_index(self.cursor.get())?;
        let end = self.with_data(|data| {
            let position = if append { data.len() } else { cursor };
            let end = position.checked_add(amount).ok_or_else(|| {
                io::Error::new(io::ErrorKind::InvalidInput, "write beyond the maximum size")
            })?;
            grow(data, end)?;
            data[position..end].copy_from_slice(&buf[..amount]);
            Ok::<usize, io::Error>(end)
        })??;
        self.cursor.set(end as u64);
        Ok(amount)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.check_open()
    }
}

fn to_index(position: u64) -> io::Result<usize> {
    usize::try_from(position).map_err(|_| {
        io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("position {} is beyond the addressable memory", position),
        )
    })
}

/// Zero-fill `data` up to `len` bytes, failing instead of aborting if it can't be allocated
fn grow(data: &mut Vec<u8>, len: usize) -> io::Result<()> {
    if data.len() < len {
        data.try_reserve(len - data.len())
            .map_err(|err| io::Error::new(io::ErrorKind::OutOfMemory, err))?;
        data.resize(len, 0);
    }
    Ok(())
}

struct MemoryDuplex {
    input: MemoryStream,
    output: MemoryStream,
}

impl IoStream for MemoryDuplex {
    fn split(self: Box<Self>) -> (Box<dyn InputStream>, Box<dyn OutputStream>) {
        let MemoryDuplex { input, output } = *self;
        (Box::new(input), Box::new(output))
    }
}
