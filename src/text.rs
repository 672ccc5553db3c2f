//! ## Text
//!
//! UTF-8 text access on top of a binary file object

use crate::errors::{FileObjError, FileObjResult};
use crate::file::FileObject;
use crate::mode::{Disposition, ModeError};
use crate::native::{NativeHandle, Whence};
use crate::options::{DecodeErrors, Newline, TextOptions};

/// A file object reading and writing UTF-8 text.
///
/// Bytes read ahead while looking for a line end are kept in a buffer; positions
/// returned by `tell` account for them, so they can be passed back to `seek_start`.
pub struct TextFile {
    inner: FileObject,
    options: TextOptions,
    pending: Vec<u8>,
    eof: bool,
}

impl TextFile {
    /// Open `handle` in text mode. Binary modes are rejected
    pub fn open<H: NativeHandle + ?Sized>(
        handle: &mut H,
        mode: &str,
        options: TextOptions,
    ) -> FileObjResult<Self> {
        if Disposition::parse(mode)?.binary {
            return Err(FileObjError::invalid_mode(mode, ModeError::TextAndBinary));
        }
        let inner = FileObject::open_with(handle, mode, options.file)?;
        debug!(
            "{} opened in text mode (newline: {:?})",
            inner.name(),
            options.newline
        );
        Ok(Self {
            inner,
            options,
            pending: Vec::new(),
            eof: false,
        })
    }

    /// Read everything until EOF
    pub fn read_to_string(&mut self) -> FileObjResult<String> {
        let mut data = std::mem::take(&mut self.pending);
        data.extend(self.inner.read(None)?);
        trace!("read {} bytes of text", data.len());
        let text = self.decode(data)?;
        Ok(match self.options.newline {
            Newline::Universal => text.replace("\r\n", "\n").replace('\r', "\n"),
            _ => text,
        })
    }

    /// Read the next line, terminator included. Returns an empty string at EOF
    pub fn read_line(&mut self) -> FileObjResult<String> {
        loop {
            let end = line_end(&self.pending, self.options.newline, self.eof);
            if let Some((len, terminator)) = end {
                let mut line: Vec<u8> = self.pending.drain(..len + terminator).collect();
                if self.options.newline == Newline::Universal {
                    line.truncate(len);
                    line.push(b'\n');
                }
                return self.decode(line);
            }
            if self.eof {
                let rest = std::mem::take(&mut self.pending);
                return self.decode(rest);
            }
            self.fill()?;
        }
    }

    /// Iterate over the remaining lines
    pub fn lines(&mut self) -> Lines<'_> {
        Lines { file: self }
    }

    /// Write `text`, returning the amount of characters written
    pub fn write_str(&mut self, text: &str) -> FileObjResult<usize> {
        self.discard_read_ahead()?;
        match self.options.newline.write_terminator() {
            Some(terminator) => self.inner.write(text.replace('\n', terminator).as_bytes())?,
            None => self.inner.write(text.as_bytes())?,
        };
        Ok(text.chars().count())
    }

    pub fn flush(&mut self) -> FileObjResult<()> {
        self.inner.flush()
    }

    /// Opaque position, in bytes from the start of the target
    pub fn tell(&mut self) -> FileObjResult<u64> {
        let position = self.inner.tell()?;
        Ok(position.saturating_sub(self.pending.len() as u64))
    }

    /// Move to a position previously returned by `tell`
    pub fn seek_start(&mut self, cookie: u64) -> FileObjResult<u64> {
        let offset = i64::try_from(cookie)
            .map_err(|_| FileObjError::UnsupportedOperation("seek beyond i64::MAX"))?;
        let position = self.inner.seek(offset, Whence::Start)?;
        self.pending.clear();
        self.eof = false;
        Ok(position)
    }

    pub fn close(&mut self) -> FileObjResult<()> {
        self.pending.clear();
        self.inner.close()
    }

    pub fn closed(&self) -> bool {
        self.inner.closed()
    }

    pub fn readable(&self) -> bool {
        self.inner.readable()
    }

    pub fn writable(&self) -> bool {
        self.inner.writable()
    }

    pub fn name(&self) -> &str {
        self.inner.name()
    }

    /// Get back the binary file object, positioned after the last character read
    pub fn into_inner(mut self) -> FileObjResult<FileObject> {
        self.discard_read_ahead()?;
        Ok(self.inner)
    }

    // -- private

    fn fill(&mut self) -> FileObjResult<()> {
        let filled = self.pending.len();
        self.pending.resize(filled + self.options.file.chunk_size, 0);
        let read = self.inner.read_into(&mut self.pending[filled..]);
        self.pending.truncate(filled + read.as_ref().map_or(0, |n| *n));
        self.eof = read? == 0;
        Ok(())
    }

    fn discard_read_ahead(&mut self) -> FileObjResult<()> {
        if self.pending.is_empty() {
            return Ok(());
        }
        trace!("rewinding {} bytes read ahead", self.pending.len());
        self.inner
            .seek(-(self.pending.len() as i64), Whence::Current)?;
        self.pending.clear();
        self.eof = false;
        Ok(())
    }

    fn decode(&self, data: Vec<u8>) -> FileObjResult<String> {
        match self.options.errors {
            DecodeErrors::Strict => Ok(String::from_utf8(data)?),
            DecodeErrors::Replace => Ok(String::from_utf8_lossy(&data).into_owned()),
        }
    }
}

/// Iterator over the lines of a `TextFile`
pub struct Lines<'a> {
    file: &'a mut TextFile,
}

impl Iterator for Lines<'_> {
    type Item = FileObjResult<String>;

    fn next(&mut self) -> Option<Self::Item> {
        match self.file.read_line() {
            Ok(line) if line.is_empty() => None,
            result => Some(result),
        }
    }
}

/// Locate the first line end in `data`, as (content length, terminator length).
/// `None` if more data is required to tell
fn line_end(data: &[u8], newline: Newline, eof: bool) -> Option<(usize, usize)> {
    match newline {
        Newline::Universal | Newline::Untranslated => {
            let pos = data.iter().position(|b| *b == b'\n' || *b == b'\r')?;
            if data[pos] == b'\n' {
                return Some((pos, 1));
            }
            match data.get(pos + 1) {
                Some(b'\n') => Some((pos, 2)),
                Some(_) => Some((pos, 1)),
                None if eof => Some((pos, 1)),
                None => None,
            }
        }
        Newline::Lf => data.iter().position(|b| *b == b'\n').map(|pos| (pos, 1)),
        Newline::Cr => data.iter().position(|b| *b == b'\r').map(|pos| (pos, 1)),
        Newline::CrLf => data
            .windows(2)
            .position(|w| w == b"\r\n")
            .map(|pos| (pos, 2)),
    }
}
