//! Decodes ExtremeGammon (XG) match archive files: a Windows-only outer
//! "Game Data Format" container wrapping an embedded, trailer-first
//! ZLBArchive, whose members are themselves fixed-frame record streams
//! (see [`xg_archive_defs`] for the wire-format type definitions this
//! crate decodes against).
//!
//! The public surface is [`orchestrator::XgArchive`] for walking an
//! archive's segments, and [`streams::decode_gamefile`] /
//! [`streams::decode_rollouts`] for decoding the two record streams once a
//! segment has been extracted.

pub mod archive;
pub mod gdf;
pub mod orchestrator;
pub mod streams;

pub use xg_archive_defs::{Error, ErrorKind, Result};

use serde::de::DeserializeOwned;
use std::io::Read;

macro_rules! file_line_col {
    () => {
        ::std::format!("{}:{}:{}", file!(), line!(), column!())
    };
}
pub(crate) use file_line_col;

/// Decodes a fixed-layout struct from `reader` using the same bincode
/// options (fixed-int, little-endian) every `xg_archive_defs` decoder
/// uses.
pub(crate) fn decode<T: DeserializeOwned>(reader: &mut impl Read) -> Result<T> {
    use bincode::Options;
    bincode::options()
        .with_fixint_encoding()
        .with_little_endian()
        .deserialize_from(reader)
        .map_err(|e| Error::new(file_line_col!(), ErrorKind::Bincode(e)))
}
