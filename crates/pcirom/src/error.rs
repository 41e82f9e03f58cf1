use std::io;
use std::path::PathBuf;

use serde::Serialize;
use thiserror::Error;

/// Failure reading from a [`crate::ByteView`].
///
/// These never leave a decode pass: every call site turns them into an absent feature or an
/// "unknown" name.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RomError {
    #[error("read of {len} bytes at {offset:#x} exceeds ROM size {size:#x}")]
    OutOfRange { offset: usize, len: usize, size: usize },

    #[error("invalid byte range {start:#x}..={end:#x}")]
    InvalidRange { start: usize, end: usize },

    #[error("bytes at {offset:#x} are not valid text")]
    InvalidText { offset: usize },

    #[error("no {terminator:#04x} terminator after {offset:#x}")]
    Unterminated { offset: usize, terminator: u8 },
}

/// Why no PCI data structure could be resolved for an image base.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
pub enum LocateError {
    #[error("no PCIR header found at or after {base:#x}")]
    NoHeader { base: usize },

    #[error("expected PCIR signature at {offset:#x}")]
    SignatureMismatch { offset: usize },
}

#[derive(Debug, Error)]
pub enum DatabaseError {
    #[error("read identifier database {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    #[error("no PCI data structure in {len} byte ROM: {source}")]
    NoPciHeader {
        len: usize,
        #[source]
        source: LocateError,
    },
}

pub type Result<T> = std::result::Result<T, RomError>;
