//! ## Mock
//!
//! Contains mock for test units

use std::collections::{HashMap, HashSet};
use std::io::{self, Cursor, Read, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use remotefs::fs::{File, FileType, Metadata, ReadStream, UnixPex, Welcome, WriteStream};
use remotefs::{RemoteError, RemoteErrorType, RemoteFs, RemoteResult};

// -- logger

#[allow(dead_code)]
pub fn logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

// -- random data

pub fn random_bytes(len: usize) -> Vec<u8> {
    use rand::RngCore;

    let mut data = vec![0u8; len];
    rand::thread_rng().fill_bytes(&mut data);
    data
}

// -- remote fs

#[derive(Clone, Default)]
struct SharedBuffer(Arc<Mutex<Vec<u8>>>);

impl Write for SharedBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// In memory remote file system, supporting only what file objects use
#[derive(Default)]
pub struct MockRemoteFs {
    files: HashMap<PathBuf, SharedBuffer>,
    dirs: HashSet<PathBuf>,
    finalized_reads: usize,
    finalized_writes: usize,
}

impl MockRemoteFs {
    pub fn with_dir<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.dirs.insert(path.as_ref().to_path_buf());
        self
    }

    pub fn with_file<P: AsRef<Path>>(mut self, path: P, data: &[u8]) -> Self {
        self.files.insert(
            path.as_ref().to_path_buf(),
            SharedBuffer(Arc::new(Mutex::new(data.to_vec()))),
        );
        self
    }

    pub fn contents<P: AsRef<Path>>(&self, path: P) -> Option<Vec<u8>> {
        self.files
            .get(path.as_ref())
            .map(|buffer| buffer.0.lock().unwrap().clone())
    }

    pub fn finalized_reads(&self) -> usize {
        self.finalized_reads
    }

    pub fn finalized_writes(&self) -> usize {
        self.finalized_writes
    }

    fn unsupported<T>() -> RemoteResult<T> {
        Err(RemoteError::new(RemoteErrorType::UnsupportedFeature))
    }
}

impl RemoteFs for MockRemoteFs {
    fn connect(&mut self) -> RemoteResult<Welcome> {
        Ok(Welcome::default())
    }

    fn disconnect(&mut self) -> RemoteResult<()> {
        Ok(())
    }

    fn is_connected(&mut self) -> bool {
        true
    }

    fn pwd(&mut self) -> RemoteResult<PathBuf> {
        Ok(PathBuf::from("/"))
    }

    fn change_dir(&mut self, _dir: &Path) -> RemoteResult<PathBuf> {
        Self::unsupported()
    }

    fn list_dir(&mut self, _path: &Path) -> RemoteResult<Vec<File>> {
        Self::unsupported()
    }

    fn stat(&mut self, path: &Path) -> RemoteResult<File> {
        let metadata = if self.dirs.contains(path) {
            Metadata::default().file_type(FileType::Directory)
        } else if let Some(buffer) = self.files.get(path) {
            Metadata::default()
                .file_type(FileType::File)
                .size(buffer.0.lock().unwrap().len() as u64)
        } else {
            return Err(RemoteError::new_ex(
                RemoteErrorType::StatFailed,
                "no such file or directory",
            ));
        };
        Ok(File {
            path: path.to_path_buf(),
            metadata,
        })
    }

    fn setstat(&mut self, _path: &Path, _metadata: Metadata) -> RemoteResult<()> {
        Self::unsupported()
    }

    fn exists(&mut self, path: &Path) -> RemoteResult<bool> {
        Ok(self.dirs.contains(path) || self.files.contains_key(path))
    }

    fn remove_file(&mut self, path: &Path) -> RemoteResult<()> {
        self.files
            .remove(path)
            .map(|_| ())
            .ok_or_else(|| RemoteError::new(RemoteErrorType::CouldNotRemoveFile))
    }

    fn remove_dir(&mut self, _path: &Path) -> RemoteResult<()> {
        Self::unsupported()
    }

    fn create_dir(&mut self, path: &Path, _mode: UnixPex) -> RemoteResult<()> {
        self.dirs.insert(path.to_path_buf());
        Ok(())
    }

    fn symlink(&mut self, _path: &Path, _target: &Path) -> RemoteResult<()> {
        Self::unsupported()
    }

    fn copy(&mut self, _src: &Path, _dest: &Path) -> RemoteResult<()> {
        Self::unsupported()
    }

    fn mov(&mut self, _src: &Path, _dest: &Path) -> RemoteResult<()> {
        Self::unsupported()
    }

    fn exec(&mut self, _cmd: &str) -> RemoteResult<(u32, String)> {
        Self::unsupported()
    }

    fn append(&mut self, path: &Path, _metadata: &Metadata) -> RemoteResult<WriteStream> {
        let buffer = self.files.entry(path.to_path_buf()).or_default().clone();
        let writer: Box<dyn Write + Send> = Box::new(buffer);
        Ok(WriteStream::from(writer))
    }

    fn create(&mut self, path: &Path, _metadata: &Metadata) -> RemoteResult<WriteStream> {
        let buffer = SharedBuffer::default();
        self.files.insert(path.to_path_buf(), buffer.clone());
        let writer: Box<dyn Write + Send> = Box::new(buffer);
        Ok(WriteStream::from(writer))
    }

    fn open(&mut self, path: &Path) -> RemoteResult<ReadStream> {
        let data = self
            .files
            .get(path)
            .map(|buffer| buffer.0.lock().unwrap().clone())
            .ok_or_else(|| {
                RemoteError::new_ex(RemoteErrorType::CouldNotOpenFile, "no such file")
            })?;
        let reader: Box<dyn Read + Send> = Box::new(Cursor::new(data));
        Ok(ReadStream::from(reader))
    }

    fn on_read(&mut self, _readable: ReadStream) -> RemoteResult<()> {
        self.finalized_reads += 1;
        Ok(())
    }

    fn on_written(&mut self, _writable: WriteStream) -> RemoteResult<()> {
        self.finalized_writes += 1;
        Ok(())
    }
}
