//! ## Options
//!
//! file object configuration

/// Default amount of bytes requested from the native layer when reading until EOF
pub const DEFAULT_CHUNK_SIZE: usize = 8192;

/// Options for a binary file object
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileObjOptions {
    pub(crate) chunk_size: usize,
}

impl Default for FileObjOptions {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
        }
    }
}

impl FileObjOptions {
    /// Chunk size used when the amount of bytes to read is unknown
    pub fn chunk_size(mut self, size: usize) -> Self {
        self.chunk_size = size.max(1);
        self
    }
}

/// How line endings are handled in text mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Newline {
    /// `\n`, `\r\n` and `\r` end a line and are read as `\n`;
    /// `\n` is written as the platform line separator
    #[default]
    Universal,
    /// `\n`, `\r\n` and `\r` end a line and are returned untranslated;
    /// nothing is translated on write
    Untranslated,
    Lf,
    CrLf,
    Cr,
}

impl Newline {
    /// Terminator written in place of `\n`. `None` if nothing is translated
    pub(crate) fn write_terminator(&self) -> Option<&'static str> {
        match self {
            Self::Universal if cfg!(target_family = "windows") => Some("\r\n"),
            Self::Universal | Self::Untranslated | Self::Lf => None,
            Self::CrLf => Some("\r\n"),
            Self::Cr => Some("\r"),
        }
    }
}

/// What to do with bytes which are not valid UTF-8
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DecodeErrors {
    #[default]
    Strict,
    /// Replace invalid sequences with U+FFFD
    Replace,
}

/// Options for a text file object
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TextOptions {
    pub(crate) newline: Newline,
    pub(crate) errors: DecodeErrors,
    pub(crate) file: FileObjOptions,
}

impl TextOptions {
    pub fn newline(mut self, newline: Newline) -> Self {
        self.newline = newline;
        self
    }

    pub fn errors(mut self, errors: DecodeErrors) -> Self {
        self.errors = errors;
        self
    }

    /// Options of the underlying binary file object
    pub fn file(mut self, options: FileObjOptions) -> Self {
        self.file = options;
        self
    }
}
