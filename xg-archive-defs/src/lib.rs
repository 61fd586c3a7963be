// XG match archives (files produced by ExtremeGammon's "Save Match" / rollout
// export) are Delphi-era packed binary records wrapped in two nested
// containers:
//
// ----------------------------------------------------------------------------
// | Offset    | Size | Field       | Description                             |
// ----------------------------------------------------------------------------
// | 0x0000000 | 8232 | GDF header  | See the [`gdf::GameDataFormatHdrRecord`] |
// |           |      |             | struct below. Identifies the file and   |
// |           |      |             | carries free-text match metadata.       |
// ----------------------------------------------------------------------------
// | 0x0002028 | *    | ZLBArchive  | A "ZLBArchive 1.52" container (see      |
// |           |      |             | [`archive`]) holding the match's member  |
// |           |      |             | files (temp.xgi/temp.xgr/temp.xgc/      |
// |           |      |             | temp.xg), trailer-first.                |
// ----------------------------------------------------------------------------
//
// temp.xgi is a stream of fixed 2560-byte gamefile records (see [`gamefile`]),
// temp.xgr a stream of fixed 2184-byte rollout records (see [`rollout`]).
// Everything is little-endian; the format has exactly one target platform
// (Windows), so there's no byte-order negotiation to do here.

#![allow(non_camel_case_types)]
#![allow(clippy::upper_case_acronyms)]
#![allow(clippy::missing_transmute_annotations)]

pub mod archive;
pub mod gamefile;
pub mod gdf;
pub mod primitive;
pub mod rollout;
mod util;

pub(crate) use util::{assert_size, big_array, size_of, ArrayVisitor, BigArray, StreamLen};

use std::fmt::{self, Display};

big_array! {
    37,
    41,
    129,
    256,
    1024,
}

/// Errors this crate can return. Mirrors the taxonomy a caller actually needs
/// to branch on: "not an XG file at all", "the archive container is
/// corrupt", "a gamefile/rollout record is malformed", "the stream ran out
/// before a record did", and "the file claims a feature we don't decode".
#[derive(Debug)]
#[non_exhaustive]
pub enum ErrorKind {
    /// The GDF header's magic bytes don't spell `RGMH` (reversed on disk).
    NotXg,
    /// The ZLBArchive trailer, registry, or a member's CRC-32 didn't check
    /// out.
    ArchiveCorrupt(String),
    /// A gamefile or rollout record's tag byte or fields are nonsensical.
    InvalidRecord(String),
    /// The stream ended before a fixed-size record frame was fully read.
    Truncated { expected: u64, got: u64 },
    /// A field uses a format version this crate doesn't decode.
    Unsupported(String),
    /// Propagated [`std::io::Error`].
    Io(std::io::Error),
    /// Propagated `bincode` deserialization failure.
    Bincode(Box<bincode::ErrorKind>),
}

impl From<std::io::Error> for ErrorKind {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value)
    }
}

impl From<Box<bincode::ErrorKind>> for ErrorKind {
    fn from(value: Box<bincode::ErrorKind>) -> Self {
        Self::Bincode(value)
    }
}

impl Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotXg => write!(f, "not an XG archive (bad GDF magic)"),
            Self::ArchiveCorrupt(s) => write!(f, "archive corrupt: {s}"),
            Self::InvalidRecord(s) => write!(f, "invalid record: {s}"),
            Self::Truncated { expected, got } => {
                write!(f, "truncated record: expected {expected} bytes, got {got}")
            }
            Self::Unsupported(s) => write!(f, "unsupported: {s}"),
            Self::Io(e) => write!(f, "I/O error: {e}"),
            Self::Bincode(e) => write!(f, "bincode error: {e}"),
        }
    }
}

macro_rules! file_line_col {
    () => {
        ::std::format!("{}:{}:{}", file!(), line!(), column!())
    };
}
pub(crate) use file_line_col;

/// An error together with the call site that raised it and, when known, the
/// stream offset it happened at.
#[derive(Debug)]
pub struct Error {
    where_: String,
    kind: ErrorKind,
    off: Option<u64>,
}

impl Error {
    pub fn new(where_: String, kind: ErrorKind) -> Self {
        Self {
            where_,
            kind,
            off: None,
        }
    }

    pub fn new_with_offset(where_: String, off: u64, kind: ErrorKind) -> Self {
        Self {
            where_,
            kind,
            off: Some(off),
        }
    }

    pub fn kind(&self) -> &ErrorKind {
        &self.kind
    }

    pub fn where_(&self) -> &str {
        &self.where_
    }

    pub fn off(&self) -> Option<u64> {
        self.off
    }
}

impl Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.off {
            Some(off) => write!(f, "{} (at offset {off}): {}", self.where_, self.kind),
            None => write!(f, "{}: {}", self.where_, self.kind),
        }
    }
}

impl std::error::Error for Error {}

impl From<std::io::Error> for Error {
    fn from(value: std::io::Error) -> Self {
        Self::new(file_line_col!(), ErrorKind::Io(value))
    }
}

pub type Result<T> = std::result::Result<T, Error>;
