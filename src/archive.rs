//! Traverses the embedded "ZLBArchive 1.52" container: locates the
//! trailer-first index, CRC-verifies the payload, and extracts individual
//! member files to scoped temporaries. See [`xg_archive_defs::archive`] for
//! the on-disk record shapes this module decodes.

use std::io::{Cursor, Read, Seek, SeekFrom, Write};

use inflate::InflateStream;
use tempfile::NamedTempFile;
use xg_archive_defs::{
    archive::{ArchiveRecordRaw, ArchiveTrailer, FileRecord, FileRecordRaw},
    file_line_col,
    primitive::stream_crc32,
    Error, ErrorKind, Result,
};

use crate::decode;

/// A 32 KiB read granularity, matching the source's `__MAXBUFSIZE` - small
/// enough to bound peak memory, large enough to keep syscall count sane.
const MAXBUFSIZE: usize = 32 * 1024;

/// An open ZLBArchive: the trailer, the decoded file registry, and enough
/// bookkeeping to extract individual members on demand.
pub struct ZlibArchive {
    pub trailer: ArchiveTrailer,
    pub registry: Vec<FileRecord>,
    startofarcdata: u64,
    endofarcdata: u64,
}

impl ZlibArchive {
    /// Opens the archive embedded in `stream` at its current position
    /// (conventionally right after the GDF header + thumbnail). On return,
    /// the stream's position is restored to what it was on entry - the
    /// trailer/registry are read via backward seeks that never disturb the
    /// caller's place in the file.
    pub fn open(stream: &mut (impl Read + Seek)) -> Result<Self> {
        let curstreampos = stream.stream_position()?;

        let result = (|| -> Result<Self> {
            stream.seek(SeekFrom::End(-(ArchiveRecordRaw::SIZEOFREC as i64)))?;
            let endofarcdata = stream.stream_position()?;
            let raw: ArchiveRecordRaw = decode(stream)?;
            let trailer: ArchiveTrailer = raw.into();

            stream.seek(SeekFrom::End(
                -(ArchiveRecordRaw::SIZEOFREC as i64) - trailer.registrysize as i64,
            ))?;
            let startofarcdata = stream.stream_position()? - trailer.archivesize as u64;

            let crc = stream_crc32(
                stream,
                Some(startofarcdata),
                endofarcdata - startofarcdata,
            )?;
            if crc != trailer.crc {
                return Err(Error::new(
                    file_line_col!(),
                    ErrorKind::ArchiveCorrupt("trailer CRC check failed - file corrupt".into()),
                ));
            }

            // The registry sits immediately before the trailer; its start
            // was already located by the seek above.
            stream.seek(SeekFrom::End(
                -(ArchiveRecordRaw::SIZEOFREC as i64) - trailer.registrysize as i64,
            ))?;
            let registry_bytes = extract_segment(
                stream,
                trailer.compressedregistry,
                trailer.registrysize as u64,
            )?;

            let mut registry = Vec::with_capacity(trailer.filecount as usize);
            let mut idx = Cursor::new(registry_bytes);
            for _ in 0..trailer.filecount {
                let raw: FileRecordRaw = decode(&mut idx)?;
                registry.push(raw.into());
            }

            Ok(ZlibArchive {
                trailer,
                registry,
                startofarcdata,
                endofarcdata,
            })
        })();

        stream.seek(SeekFrom::Start(curstreampos))?;
        result
    }

    /// Extracts `filerec` to a fresh temporary file, CRC-checks the
    /// uncompressed result, and returns the open handle positioned at byte
    /// 0.
    pub fn get_member(
        &self,
        stream: &mut (impl Read + Seek),
        filerec: &FileRecord,
    ) -> Result<std::fs::File> {
        stream.seek(SeekFrom::Start(self.startofarcdata + filerec.start as u64))?;
        let bytes = extract_segment(stream, filerec.compressed, filerec.csize as u64)?;

        let crc = crc32fast::hash(&bytes);
        if crc != filerec.crc {
            return Err(Error::new(
                file_line_col!(),
                ErrorKind::ArchiveCorrupt(format!(
                    "member '{}' CRC check failed - file corrupt",
                    filerec.name
                )),
            ));
        }

        let mut tmp = NamedTempFile::with_prefix("xg")?;
        tmp.write_all(&bytes)?;
        tmp.flush()?;
        let mut file = tmp.into_file();
        file.seek(SeekFrom::Start(0))?;
        Ok(file)
    }
}

/// Extracts one segment (the registry, or a member) from `stream` at its
/// current position into an in-memory buffer.
///
/// For compressed segments, the inflator is fed `MAXBUFSIZE`-sized chunks
/// from `stream` until it reports it consumed fewer bytes than it was
/// given (meaning the compressed data ended mid-chunk) or the stream is
/// exhausted - the archive may have more data immediately following this
/// segment, so we must never assume the whole chunk belongs to it. We
/// don't bother seeking the unconsumed remainder back onto the stream
/// (the source doesn't either): every caller of this function repositions
/// the stream explicitly before its next read. For uncompressed segments,
/// exactly `numbytes` bytes are copied.
fn extract_segment(
    stream: &mut (impl Read + Seek),
    compressed: bool,
    numbytes: u64,
) -> Result<Vec<u8>> {
    if !compressed {
        let mut buf = vec![0u8; numbytes as usize];
        stream.read_exact(&mut buf)?;
        return Ok(buf);
    }

    let mut inflater = InflateStream::from_zlib();
    let mut out = Vec::new();
    let mut block = vec![0u8; MAXBUFSIZE];
    loop {
        let n = stream.read(&mut block)?;
        if n == 0 {
            break;
        }
        let (consumed, decompressed) = inflater
            .update(&block[..n])
            .map_err(|e| Error::new(file_line_col!(), ErrorKind::ArchiveCorrupt(e)))?;
        out.extend_from_slice(decompressed);
        if consumed < n {
            break;
        }
    }

    if out.is_empty() {
        return Err(Error::new(
            file_line_col!(),
            ErrorKind::ArchiveCorrupt("error extracting archive segment".into()),
        ));
    }

    Ok(out)
}
