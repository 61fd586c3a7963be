//! The embedded "ZLBArchive 1.52" container: a trailer-first archive of
//! member files (temp.xgi, temp.xgr, temp.xgc, temp.xg), CRC-32 checked and
//! its file registry DEFLATE-compressed.

use serde::{Deserialize, Serialize};

use crate::{primitive::pascal_short, BigArray};

/// Trailing 36-byte record at the end of the archive (6 `i32`/`u32`s plus 12
/// reserved bytes).
#[derive(Clone, Copy, Serialize, Deserialize)]
pub struct ArchiveRecordRaw {
    pub crc: u32,
    pub filecount: i32,
    pub version: i32,
    pub registrysize: i32,
    pub archivesize: i32,
    pub compressedregistry: i32,
    pub reserved: [u8; 12],
}

impl ArchiveRecordRaw {
    pub const SIZEOFREC: usize = 36;
}

/// The ergonomic form of [`ArchiveRecordRaw`].
#[derive(Clone, Debug)]
pub struct ArchiveTrailer {
    pub crc: u32,
    pub filecount: u32,
    pub version: i32,
    pub registrysize: u32,
    pub archivesize: u32,
    pub compressedregistry: bool,
}

impl From<ArchiveRecordRaw> for ArchiveTrailer {
    fn from(raw: ArchiveRecordRaw) -> Self {
        Self {
            crc: raw.crc,
            filecount: raw.filecount as u32,
            version: raw.version,
            registrysize: raw.registrysize as u32,
            archivesize: raw.archivesize as u32,
            compressedregistry: raw.compressedregistry != 0,
        }
    }
}

/// A single 532-byte file registry entry.
#[derive(Clone, Copy, Serialize, Deserialize)]
pub struct FileRecordRaw {
    #[serde(with = "BigArray")]
    pub name: [u8; 256],
    #[serde(with = "BigArray")]
    pub path: [u8; 256],
    pub osize: i32,
    pub csize: i32,
    pub start: i32,
    pub crc: u32,
    pub compressed: u8,
    pub compressionlevel: u8,
    pub _pad: [u8; 2],
}

impl FileRecordRaw {
    pub const SIZEOFREC: usize = 532;
}

/// The ergonomic form of [`FileRecordRaw`].
#[derive(Clone, Debug)]
pub struct FileRecord {
    pub name: String,
    pub path: String,
    pub osize: u32,
    pub csize: u32,
    pub start: u32,
    pub crc: u32,
    pub compressed: bool,
    pub compressionlevel: u8,
}

impl From<FileRecordRaw> for FileRecord {
    fn from(raw: FileRecordRaw) -> Self {
        Self {
            name: pascal_short(&raw.name),
            path: pascal_short(&raw.path),
            osize: raw.osize as u32,
            csize: raw.csize as u32,
            start: raw.start as u32,
            crc: raw.crc,
            // Inverted on the wire: a zero byte means this member went
            // through DEFLATE; any other value means it's stored raw.
            compressed: raw.compressed == 0,
            compressionlevel: raw.compressionlevel,
        }
    }
}

crate::assert_size!(ArchiveRecordRaw, ArchiveRecordRaw::SIZEOFREC);
crate::assert_size!(FileRecordRaw, FileRecordRaw::SIZEOFREC);
