//! Reads the outer "Game Data Format" header and hands the remainder of the
//! stream off to the embedded archive. See [`crate::archive`].

use std::io::{Read, Seek, SeekFrom};

use xg_archive_defs::{
    gdf::{GameDataFormatHdrRecordRaw, GdfHeader},
    Error, ErrorKind, Result,
};

use crate::{decode, file_line_col};

/// Reads the fixed 8232-byte GDF header and validates its magic/version
/// (invariant 1 of the on-disk contract). On success, the stream is left
/// positioned wherever `fromstream` left it - right after the fixed header
/// region - matching the source's behavior of never rewinding on success.
pub fn read_gdf_header(stream: &mut (impl Read + Seek)) -> Result<GdfHeader> {
    let raw: GameDataFormatHdrRecordRaw = decode(stream)?;
    if !raw.magic_is_valid() || raw.header_version != 1 {
        return Err(Error::new(file_line_col!(), ErrorKind::NotXg));
    }
    Ok(raw.into())
}

/// Materializes the GDF header segment: the first `header.header_size`
/// bytes of the file, re-read from offset 0 (the header region may be
/// larger than the fixed 8232-byte struct - anything past it is opaque
/// padding we copy verbatim rather than try to interpret).
pub fn read_gdf_header_bytes(
    stream: &mut (impl Read + Seek),
    header: &GdfHeader,
) -> Result<Vec<u8>> {
    let pos = stream.stream_position()?;
    stream.seek(SeekFrom::Start(0))?;
    let mut buf = vec![0u8; header.header_size as usize];
    stream.read_exact(&mut buf)?;
    stream.seek(SeekFrom::Start(pos))?;
    Ok(buf)
}

/// Materializes the thumbnail segment, if any. The offset is *relative* to
/// wherever the stream currently sits (right after the fixed header
/// region), matching the source's `seek(ThumbnailOffset, SEEK_CUR)`.
pub fn read_thumbnail_bytes(
    stream: &mut (impl Read + Seek),
    header: &GdfHeader,
) -> Result<Option<Vec<u8>>> {
    if header.thumbnail_size <= 0 {
        return Ok(None);
    }
    stream.seek(SeekFrom::Current(header.thumbnail_offset))?;
    let mut buf = vec![0u8; header.thumbnail_size as usize];
    stream.read_exact(&mut buf)?;
    Ok(Some(buf))
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use bincode::Options;
    use xg_archive_defs::gdf::{GameDataFormatHdrRecordRaw, GDF_MAGIC};

    use super::*;

    fn enc(v: &GameDataFormatHdrRecordRaw) -> Vec<u8> {
        bincode::options()
            .with_fixint_encoding()
            .with_little_endian()
            .serialize(v)
            .unwrap()
    }

    fn sample_raw(magic: [u8; 4], header_version: i32, thumbnail_offset: i64, thumbnail_size: i32) -> GameDataFormatHdrRecordRaw {
        GameDataFormatHdrRecordRaw {
            magic,
            header_version,
            header_size: GameDataFormatHdrRecordRaw::SIZEOFREC as i32,
            thumbnail_offset,
            thumbnail_size,
            guid_a: 1,
            guid_b: 2,
            guid_c: 3,
            guid_d: 4,
            guid_e: 5,
            guid_tail: [0; 6],
            game_name: [0u16; 1024],
            save_name: [0u16; 1024],
            level_name: [0u16; 1024],
            comments: [0u16; 1024],
        }
    }

    #[test]
    fn wrong_magic_is_not_xg() {
        let bytes = enc(&sample_raw(*b"HXXX", 1, 0, 0));
        let mut stream = Cursor::new(bytes);
        let err = read_gdf_header(&mut stream).unwrap_err();
        assert!(matches!(err.kind(), ErrorKind::NotXg));
    }

    #[test]
    fn thumbnail_absent_when_size_is_zero() {
        let bytes = enc(&sample_raw(GDF_MAGIC, 1, 0, 0));
        let mut stream = Cursor::new(bytes);
        let header = read_gdf_header(&mut stream).unwrap();
        let thumb = read_thumbnail_bytes(&mut stream, &header).unwrap();
        assert!(thumb.is_none());
    }

    #[test]
    fn thumbnail_present_is_read_at_relative_offset() {
        let gap = vec![0xAAu8; 16];
        let thumb_bytes = vec![0xCDu8; 32];

        let mut bytes = enc(&sample_raw(GDF_MAGIC, 1, gap.len() as i64, thumb_bytes.len() as i32));
        bytes.extend(&gap);
        bytes.extend(&thumb_bytes);

        let mut stream = Cursor::new(bytes);
        let header = read_gdf_header(&mut stream).unwrap();
        let thumb = read_thumbnail_bytes(&mut stream, &header).unwrap();
        assert_eq!(thumb, Some(thumb_bytes));
    }

    #[test]
    fn header_bytes_are_reread_from_offset_zero() {
        let bytes = enc(&sample_raw(GDF_MAGIC, 1, 0, 0));
        let mut stream = Cursor::new(bytes.clone());
        let header = read_gdf_header(&mut stream).unwrap();
        let reread = read_gdf_header_bytes(&mut stream, &header).unwrap();
        assert_eq!(reread, bytes);
        // the stream's position is restored to where it was before the reread
        assert_eq!(stream.stream_position().unwrap(), bytes.len() as u64);
    }
}
