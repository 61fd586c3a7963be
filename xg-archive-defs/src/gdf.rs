//! The outer "Game Data Format" container: a fixed 8232-byte header that
//! wraps the embedded ZLBArchive (see [`crate::archive`]).

use serde::{Deserialize, Serialize};

use crate::{primitive::utf16_nt, BigArray};

/// On-disk magic, stored reversed (`HMGR` on disk reads as `RGMH`; XG writes
/// it byte-reversed for reasons lost to the Delphi original).
pub const GDF_MAGIC: [u8; 4] = *b"RGMH";

/// The 8232-byte on-disk layout, decoded field-for-field via `bincode`
/// (4+4+4+8+4+4+2+2+1+1+6 header bytes followed by four 1024-entry UTF-16
/// buffers).
#[derive(Clone, Copy, Serialize, Deserialize)]
pub struct GameDataFormatHdrRecordRaw {
    pub magic: [u8; 4],
    pub header_version: i32,
    pub header_size: i32,
    pub thumbnail_offset: i64,
    pub thumbnail_size: i32,
    pub guid_a: u32,
    pub guid_b: u16,
    pub guid_c: u16,
    pub guid_d: u8,
    pub guid_e: u8,
    pub guid_tail: [u8; 6],
    #[serde(with = "BigArray")]
    pub game_name: [u16; 1024],
    #[serde(with = "BigArray")]
    pub save_name: [u16; 1024],
    #[serde(with = "BigArray")]
    pub level_name: [u16; 1024],
    #[serde(with = "BigArray")]
    pub comments: [u16; 1024],
}

impl GameDataFormatHdrRecordRaw {
    pub const SIZEOFREC: usize = 8232;

    pub fn magic_is_valid(&self) -> bool {
        self.magic == GDF_MAGIC
    }
}

/// The ergonomic, owned form of [`GameDataFormatHdrRecordRaw`].
#[derive(Clone, Debug)]
pub struct GdfHeader {
    pub header_version: i32,
    pub header_size: i32,
    pub thumbnail_offset: i64,
    pub thumbnail_size: i32,
    pub guid: uuid::Uuid,
    pub game_name: String,
    pub save_name: String,
    pub level_name: String,
    pub comments: String,
}

impl From<GameDataFormatHdrRecordRaw> for GdfHeader {
    fn from(raw: GameDataFormatHdrRecordRaw) -> Self {
        let guid = crate::primitive::delphi_guid(
            raw.guid_a,
            raw.guid_b,
            raw.guid_c,
            raw.guid_d,
            raw.guid_e,
            raw.guid_tail,
        );
        Self {
            header_version: raw.header_version,
            header_size: raw.header_size,
            thumbnail_offset: raw.thumbnail_offset,
            thumbnail_size: raw.thumbnail_size,
            guid,
            game_name: utf16_nt(&raw.game_name),
            save_name: utf16_nt(&raw.save_name),
            level_name: utf16_nt(&raw.level_name),
            comments: utf16_nt(&raw.comments),
        }
    }
}

crate::assert_size!(GameDataFormatHdrRecordRaw, GameDataFormatHdrRecordRaw::SIZEOFREC);

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_raw() -> GameDataFormatHdrRecordRaw {
        let mut game_name = [0u16; 1024];
        for (i, c) in "Money Session".encode_utf16().enumerate() {
            game_name[i] = c;
        }
        GameDataFormatHdrRecordRaw {
            magic: GDF_MAGIC,
            header_version: 1,
            header_size: GameDataFormatHdrRecordRaw::SIZEOFREC as i32,
            thumbnail_offset: 0,
            thumbnail_size: 0,
            guid_a: 0xdead_beef,
            guid_b: 1,
            guid_c: 2,
            guid_d: 3,
            guid_e: 4,
            guid_tail: [5, 6, 7, 8, 9, 10],
            game_name,
            save_name: [0u16; 1024],
            level_name: [0u16; 1024],
            comments: [0u16; 1024],
        }
    }

    #[test]
    fn magic_is_byte_reversed_hmgr() {
        assert_eq!(&GDF_MAGIC, b"RGMH");
    }

    #[test]
    fn valid_magic_and_version_round_trip() {
        let raw = sample_raw();
        assert!(raw.magic_is_valid());
        let header: GdfHeader = raw.into();
        assert_eq!(header.header_version, 1);
        assert_eq!(header.game_name, "Money Session");
        assert_eq!(header.save_name, "");
    }

    #[test]
    fn wrong_magic_is_rejected() {
        let mut raw = sample_raw();
        raw.magic = *b"HXXX";
        assert!(!raw.magic_is_valid());
    }

    #[test]
    fn guid_fields_compose_canonical_string() {
        let raw = sample_raw();
        let header: GdfHeader = raw.into();
        assert_eq!(
            header.guid.to_string(),
            "deadbeef-0001-0002-0304-05060708090a"
        );
    }
}
