//! ## Mode
//!
//! Mode string parsing.
//!
//! A mode string is made of exactly one base character and optional modifiers,
//! each appearing at most once and in any order:
//!
//! | Character | Meaning                                          |
//! |-----------|--------------------------------------------------|
//! | `r`       | open for reading                                 |
//! | `w`       | open for writing, truncating the target first    |
//! | `x`       | create a new target, fail if it already exists   |
//! | `a`       | open for writing, appending to the end           |
//! | `b`       | binary mode                                      |
//! | `t`       | text mode (default)                              |
//! | `+`       | open for updating (reading and writing)          |

use std::fmt;

use crate::errors::{FileObjError, FileObjResult};
use crate::native::OpenFlags;

/// Mode used when the caller doesn't provide one
pub const DEFAULT_MODE: &str = "r";

/// Reason why a mode string was rejected
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum ModeError {
    #[error("mode string cannot be empty")]
    Empty,
    #[error("invalid mode character: '{0}'")]
    InvalidCharacter(char),
    #[error("duplicated mode character: '{0}'")]
    Duplicate(char),
    #[error("must have exactly one of create/read/write/append mode")]
    MissingBase,
    #[error("must have exactly one of create/read/write/append mode")]
    MultipleBase,
    #[error("can't have text and binary mode at once")]
    TextAndBinary,
}

/// Parsed, immutable description of what a mode string requests
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Disposition {
    pub wants_read: bool,
    pub wants_write: bool,
    pub append: bool,
    pub truncate: bool,
    pub create: bool,
    pub exclusive: bool,
    pub binary: bool,
}

impl Disposition {
    /// Parse `mode` into a `Disposition`
    pub fn parse(mode: &str) -> FileObjResult<Self> {
        parse_mode(mode).map_err(|reason| FileObjError::invalid_mode(mode, reason))
    }

    /// Both an input and an output stream are required
    pub fn is_duplex(&self) -> bool {
        self.wants_read && self.wants_write
    }

    /// The target has to exist before opening
    pub fn requires_existing(&self) -> bool {
        self.wants_read && !self.create
    }

    /// Flags to pass to the native layer when opening an output or duplex stream
    pub fn open_flags(&self) -> OpenFlags {
        OpenFlags {
            create: self.create,
            truncate: self.truncate,
            append: self.append,
            exclusive: self.exclusive,
        }
    }
}

impl fmt::Display for Disposition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let base = if self.exclusive {
            'x'
        } else if self.append {
            'a'
        } else if self.truncate {
            'w'
        } else {
            'r'
        };
        write!(f, "{}", base)?;
        if self.binary {
            write!(f, "b")?;
        }
        if self.is_duplex() {
            write!(f, "+")?;
        }
        Ok(())
    }
}

fn parse_mode(mode: &str) -> Result<Disposition, ModeError> {
    if mode.is_empty() {
        return Err(ModeError::Empty);
    }
    let mut base: Option<char> = None;
    let mut binary = false;
    let mut text = false;
    let mut updating = false;
    let mut seen = String::with_capacity(mode.len());
    for c in mode.chars() {
        if !"rwxabt+".contains(c) {
            return Err(ModeError::InvalidCharacter(c));
        }
        if seen.contains(c) {
            return Err(ModeError::Duplicate(c));
        }
        seen.push(c);
        match c {
            'r' | 'w' | 'x' | 'a' if base.is_some() => return Err(ModeError::MultipleBase),
            'r' | 'w' | 'x' | 'a' => base = Some(c),
            'b' => binary = true,
            't' => text = true,
            _ => updating = true,
        }
    }
    if binary && text {
        return Err(ModeError::TextAndBinary);
    }
    let base = base.ok_or(ModeError::MissingBase)?;
    Ok(Disposition {
        wants_read: base == 'r' || updating,
        wants_write: base != 'r' || updating,
        append: base == 'a',
        truncate: base == 'w',
        create: base != 'r',
        exclusive: base == 'x',
        binary,
    })
}
