//! Delphi-era primitive decoding: Pascal short strings, null-terminated
//! UTF-16 buffers, `TDateTime`, Delphi's mixed-endian GUID encoding, and
//! streaming CRC-32.

use std::io::{Read, Seek, SeekFrom};

use chrono::{Duration, NaiveDate, NaiveDateTime};
use uuid::Uuid;

use crate::{file_line_col, Error, ErrorKind, Result};

/// Decodes a Delphi "short string" buffer: byte 0 is the content length,
/// bytes `1..=len` are the content (Windows-1252), and any remaining bytes
/// in `buf` are unused filler.
pub fn pascal_short(buf: &[u8]) -> String {
    let len = buf.first().copied().unwrap_or(0) as usize;
    let len = len.min(buf.len().saturating_sub(1));
    buf[1..=len].iter().map(|&b| b as char).collect()
}

/// Decodes a fixed-size null-terminated UTF-16 (little-endian) buffer,
/// stopping at the first NUL code unit or the end of `units`, whichever
/// comes first.
pub fn utf16_nt(units: &[u16]) -> String {
    let end = units.iter().position(|&u| u == 0).unwrap_or(units.len());
    String::from_utf16_lossy(&units[..end])
}

/// Delphi's `TDateTime`: a whole and fractional number of days since
/// 1899-12-30 (the "zero date" MS Office and Delphi share). `D = floor(x)`
/// whole days, `S = floor(86400*(x-D))` whole seconds; any fraction of a
/// second is discarded, not rounded.
pub fn delphi_datetime(value: f64) -> Option<NaiveDateTime> {
    let epoch = NaiveDate::from_ymd_opt(1899, 12, 30)?.and_hms_opt(0, 0, 0)?;
    let days = value.floor();
    let secs = (86_400.0 * (value - days)).floor() as i64;
    epoch.checked_add_signed(Duration::days(days as i64) + Duration::seconds(secs))
}

/// Delphi's `TGUID`: four fields (`u32`, `u16`, `u16`, `u8`, `u8`) followed
/// by a 6-byte tail, which is exactly [`Uuid::from_fields`]'s layout.
pub fn delphi_guid(a: u32, b: u16, c: u16, d: u8, e: u8, tail: [u8; 6]) -> Uuid {
    let mut node = [0u8; 8];
    node[0] = d;
    node[1] = e;
    node[2..8].copy_from_slice(&tail);
    Uuid::from_fields(a, b, c, &node[0..8])
}

/// CRC-32 (ZLIB/POSIX polynomial) of `numbytes` bytes starting at `startpos`
/// (or the current position, if `None`), restoring the stream's original
/// position before returning.
pub fn stream_crc32<S: Read + Seek>(
    stream: &mut S,
    startpos: Option<u64>,
    numbytes: u64,
) -> Result<u32> {
    let original = stream.stream_position()?;
    let start = match startpos {
        Some(p) => {
            stream.seek(SeekFrom::Start(p))?;
            p
        }
        None => original,
    };

    let mut hasher = crc32fast::Hasher::new();
    let mut remaining = numbytes;
    let mut buf = [0u8; 32 * 1024];
    while remaining > 0 {
        let chunk = remaining.min(buf.len() as u64) as usize;
        stream.read_exact(&mut buf[..chunk]).map_err(|e| {
            Error::new_with_offset(file_line_col!(), start, ErrorKind::Io(e))
        })?;
        hasher.update(&buf[..chunk]);
        remaining -= chunk as u64;
    }

    stream.seek(SeekFrom::Start(original))?;
    Ok(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pascal_short_decodes_length_prefix() {
        let mut buf = vec![0u8; 8];
        buf[0] = 5;
        buf[1..6].copy_from_slice(b"hello");
        assert_eq!(pascal_short(&buf), "hello");
    }

    #[test]
    fn pascal_short_empty() {
        let buf = [0u8; 4];
        assert_eq!(pascal_short(&buf), "");
    }

    #[test]
    fn utf16_nt_stops_at_nul() {
        let units: [u16; 6] = [b'h' as u16, b'i' as u16, 0, b'X' as u16, 0, 0];
        assert_eq!(utf16_nt(&units), "hi");
    }

    #[test]
    fn delphi_datetime_epoch_is_1899_12_30() {
        let dt = delphi_datetime(0.0).unwrap();
        assert_eq!(dt, NaiveDate::from_ymd_opt(1899, 12, 30).unwrap().and_hms_opt(0, 0, 0).unwrap());
    }

    #[test]
    fn delphi_datetime_25569_is_unix_epoch() {
        let dt = delphi_datetime(25569.0).unwrap();
        assert_eq!(dt, NaiveDate::from_ymd_opt(1970, 1, 1).unwrap().and_hms_opt(0, 0, 0).unwrap());
    }

    #[test]
    fn delphi_datetime_advances_by_86400s_per_whole_day() {
        let x = 25569.3333333;
        let a = delphi_datetime(x).unwrap();
        let b = delphi_datetime(x + 1.0).unwrap();
        assert_eq!((b - a).num_seconds(), 86_400);
    }

    #[test]
    fn delphi_datetime_discards_fractional_seconds() {
        // A fraction of a day that lands mid-second: the sub-second part is
        // truncated away, not rounded to the nearest second.
        let dt = delphi_datetime(0.0 + 1.0 / 86_400.0 * 1.9).unwrap();
        assert_eq!(dt.and_utc().timestamp_subsec_nanos(), 0);
    }

    #[test]
    fn stream_crc32_restores_position() {
        use std::io::Cursor;
        let data = b"0123456789".to_vec();
        let mut cur = Cursor::new(data);
        cur.set_position(4);
        let crc = stream_crc32(&mut cur, Some(0), 10).unwrap();
        assert_eq!(cur.position(), 4);
        assert_eq!(crc, crc32fast::hash(b"0123456789"));
    }
}
