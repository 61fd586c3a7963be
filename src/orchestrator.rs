//! Composes the GDF reader, archive reader, and record-stream decoders into
//! the single pull pipeline collaborators actually use: open a file, get a
//! lazy sequence of [`Segment`]s in file order (GDF header, optional
//! thumbnail, then each archive member), each backed by its own scoped
//! temporary.

use std::{
    fs::File,
    io::{BufReader, Read, Seek, SeekFrom},
    path::Path,
};

use tempfile::NamedTempFile;
use xg_archive_defs::{gdf::GdfHeader, Error, ErrorKind, Result};

use crate::{archive::ZlibArchive, file_line_col, gdf};

/// Byte offset within the gamefile member where the `"DMLI"` magic must
/// appear (invariant 4).
const GAMEFILE_MAGIC_OFFSET: u64 = 556;
const GAMEFILE_MAGIC: &[u8; 4] = b"DMLI";

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum SegmentKind {
    GdfHeader,
    GdfImage,
    GameHdr,
    Gamefile,
    Rollouts,
    Comment,
}

impl SegmentKind {
    /// Suggested output suffix per kind - informational only; the core
    /// performs no file I/O on a collaborator's behalf beyond materializing
    /// the temporary this segment wraps.
    pub fn extension(self) -> &'static str {
        match self {
            Self::GdfHeader => "_gdh.bin",
            Self::GdfImage => ".jpg",
            Self::GameHdr => "_gamehdr.bin",
            Self::Gamefile => "_gamefile.bin",
            Self::Rollouts => "_rollouts.bin",
            Self::Comment => "_comments.bin",
        }
    }

    fn for_member_name(name: &str) -> Option<Self> {
        match name {
            "temp.xgi" => Some(Self::GameHdr),
            "temp.xgr" => Some(Self::Rollouts),
            "temp.xgc" => Some(Self::Comment),
            "temp.xg" => Some(Self::Gamefile),
            _ => None,
        }
    }
}

/// A materialized, owned region of the input file. The backing temporary is
/// unlinked when `Segment` is dropped.
pub struct Segment {
    pub kind: SegmentKind,
    tmp: NamedTempFile,
}

impl Segment {
    fn from_bytes(kind: SegmentKind, bytes: &[u8]) -> Result<Self> {
        use std::io::Write;
        let mut tmp = NamedTempFile::with_prefix("xg")?;
        tmp.write_all(bytes)?;
        tmp.flush()?;
        tmp.seek(SeekFrom::Start(0))?;
        Ok(Self { kind, tmp })
    }

    fn from_file(kind: SegmentKind, mut file: File) -> Result<Self> {
        // Re-home the already-extracted archive member under our own
        // NamedTempFile so every segment has one uniform ownership story.
        let mut tmp = NamedTempFile::with_prefix("xg")?;
        std::io::copy(&mut file, tmp.as_file_mut())?;
        tmp.seek(SeekFrom::Start(0))?;
        Ok(Self { kind, tmp })
    }

    /// Suggested output suffix for this segment's kind.
    pub fn extension(&self) -> &'static str {
        self.kind.extension()
    }

    /// A fresh, independent readable handle positioned at byte 0.
    pub fn open(&self) -> Result<File> {
        let mut file = self.tmp.reopen()?;
        file.seek(SeekFrom::Start(0))?;
        Ok(file)
    }
}

/// Opens an XG match archive and yields its segments in file order. The
/// input must be seekable - the embedded archive is trailer-first, so a
/// plain pipe can't be used as input.
pub struct XgArchive {
    file: BufReader<File>,
    archive: Option<ZlibArchive>,
    pending_header: Option<GdfHeader>,
    member_idx: usize,
    verbose: bool,
    emitted_header: bool,
    emitted_thumbnail: bool,
}

impl XgArchive {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        Self::open_with_verbose(path, false)
    }

    pub fn open_with_verbose(path: impl AsRef<Path>, verbose: bool) -> Result<Self> {
        let file = BufReader::new(File::open(path)?);
        Ok(Self {
            file,
            archive: None,
            pending_header: None,
            member_idx: 0,
            verbose,
            emitted_header: false,
            emitted_thumbnail: false,
        })
    }

    /// Returns the next segment in file order, or `Ok(None)` once every
    /// archive member has been yielded.
    pub fn next_segment(&mut self) -> Result<Option<Segment>> {
        if !self.emitted_header {
            self.emitted_header = true;
            let header = gdf::read_gdf_header(&mut self.file)?;
            if self.verbose {
                println!("xg: GDF header, version {}", header.header_version);
            }
            let bytes = gdf::read_gdf_header_bytes(&mut self.file, &header)?;
            self.pending_header = Some(header);
            return Ok(Some(Segment::from_bytes(SegmentKind::GdfHeader, &bytes)?));
        }

        if !self.emitted_thumbnail {
            self.emitted_thumbnail = true;
            if let Some(header) = self.pending_header.take() {
                if let Some(bytes) = gdf::read_thumbnail_bytes(&mut self.file, &header)? {
                    if self.verbose {
                        println!("xg: thumbnail, {} bytes", bytes.len());
                    }
                    return Ok(Some(Segment::from_bytes(SegmentKind::GdfImage, &bytes)?));
                }
            }
        }

        if self.archive.is_none() {
            self.archive = Some(ZlibArchive::open(&mut self.file)?);
        }
        let archive = self.archive.as_ref().unwrap();

        loop {
            if self.member_idx >= archive.registry.len() {
                return Ok(None);
            }
            let filerec = &archive.registry[self.member_idx];
            self.member_idx += 1;

            let Some(kind) = SegmentKind::for_member_name(&filerec.name) else {
                if self.verbose {
                    eprintln!("xg: skipping unrecognized archive member '{}'", filerec.name);
                }
                continue;
            };

            let mut member = archive.get_member(&mut self.file, filerec)?;

            if kind == SegmentKind::Gamefile {
                member.seek(SeekFrom::Start(GAMEFILE_MAGIC_OFFSET))?;
                let mut magic = [0u8; 4];
                member.read_exact(&mut magic)?;
                if &magic != GAMEFILE_MAGIC {
                    return Err(Error::new(
                        file_line_col!(),
                        ErrorKind::InvalidRecord("gamefile missing DMLI magic".into()),
                    ));
                }
                member.seek(SeekFrom::Start(0))?;
            }

            if self.verbose {
                println!("xg: extracted member '{}' ({kind:?})", filerec.name);
            }

            return Ok(Some(Segment::from_file(kind, member)?));
        }
    }
}
