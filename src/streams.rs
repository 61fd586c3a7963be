//! Drives the two fixed-frame record streams (`temp.xg`'s gamefile records
//! and `temp.xgr`'s rollout records) over an already-extracted member
//! handle. The per-kind payload shapes live in [`xg_archive_defs`]; this
//! module only owns the framing - remembering where each frame started,
//! dispatching on the tag byte, and skipping whatever filler the
//! kind-specific parser didn't consume.

use std::io::{Read, Seek, SeekFrom};

use xg_archive_defs::{
    gamefile::{self, GamefileRecord, RecordTag, FRAME_LEN as GAMEFILE_FRAME_LEN},
    rollout::{self, RolloutContext, FRAME_LEN as ROLLOUT_FRAME_LEN},
    Error, ErrorKind, Result,
};

use crate::file_line_col;

/// Iterates the `temp.xgi` gamefile stream, propagating the schema
/// `Version` discovered on the first (`HeaderMatch`) record to every record
/// that follows (invariant 5).
pub struct GamefileRecords<S> {
    stream: S,
    version: i32,
    done: bool,
}

impl<S: Read + Seek> GamefileRecords<S> {
    pub fn new(stream: S) -> Self {
        Self {
            stream,
            version: -1,
            done: false,
        }
    }
}

impl<S: Read + Seek> Iterator for GamefileRecords<S> {
    type Item = Result<GamefileRecord>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }

        match self.step() {
            Ok(Some(rec)) => Some(Ok(rec)),
            Ok(None) => {
                self.done = true;
                None
            }
            Err(e) => {
                self.done = true;
                Some(Err(e))
            }
        }
    }
}

impl<S: Read + Seek> GamefileRecords<S> {
    fn step(&mut self) -> Result<Option<GamefileRecord>> {
        let start = self.stream.stream_position()?;

        // Probe for clean end-of-stream: a gamefile whose length is an
        // exact multiple of FRAME_LEN terminates here, not with an error.
        let mut probe = [0u8; 1];
        let read = self.stream.read(&mut probe)?;
        if read == 0 {
            return Ok(None);
        }
        self.stream.seek(SeekFrom::Start(start))?;

        let mut prefix = [0u8; gamefile::PREFIX_LEN];
        self.stream.read_exact(&mut prefix).map_err(|_| {
            Error::new_with_offset(
                file_line_col!(),
                start,
                ErrorKind::Truncated {
                    expected: gamefile::PREFIX_LEN as u64,
                    got: 0,
                },
            )
        })?;
        let tag = RecordTag::from(prefix[8]);

        self.stream.seek(SeekFrom::Start(start + gamefile::PREFIX_LEN as u64))?;
        let record = gamefile::decode_record(&mut self.stream, tag, self.version)?;

        if let GamefileRecord::HeaderMatch(ref header) = record {
            self.version = header.version;
        }

        let consumed = self.stream.stream_position()? - start;
        if consumed > GAMEFILE_FRAME_LEN as u64 {
            return Err(Error::new_with_offset(
                file_line_col!(),
                start,
                ErrorKind::InvalidRecord(format!(
                    "record consumed {consumed} bytes, more than the {GAMEFILE_FRAME_LEN}-byte frame"
                )),
            ));
        }
        self.stream
            .seek(SeekFrom::Start(start + GAMEFILE_FRAME_LEN as u64))?;

        Ok(Some(record))
    }
}

/// Iterates the `temp.xgr` rollout stream. There's only one record kind and
/// no version gating, so this is simpler than [`GamefileRecords`].
pub struct RolloutRecords<S> {
    stream: S,
    done: bool,
}

impl<S: Read + Seek> RolloutRecords<S> {
    pub fn new(stream: S) -> Self {
        Self {
            stream,
            done: false,
        }
    }
}

impl<S: Read + Seek> Iterator for RolloutRecords<S> {
    type Item = Result<RolloutContext>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }

        match self.step() {
            Ok(Some(rec)) => Some(Ok(rec)),
            Ok(None) => {
                self.done = true;
                None
            }
            Err(e) => {
                self.done = true;
                Some(Err(e))
            }
        }
    }
}

impl<S: Read + Seek> RolloutRecords<S> {
    fn step(&mut self) -> Result<Option<RolloutContext>> {
        let start = self.stream.stream_position()?;

        let mut probe = [0u8; 1];
        let read = self.stream.read(&mut probe)?;
        if read == 0 {
            return Ok(None);
        }
        self.stream.seek(SeekFrom::Start(start))?;

        let record = rollout::decode_rollout_context(&mut self.stream)?;

        let consumed = self.stream.stream_position()? - start;
        if consumed > ROLLOUT_FRAME_LEN as u64 {
            return Err(Error::new_with_offset(
                file_line_col!(),
                start,
                ErrorKind::InvalidRecord(format!(
                    "record consumed {consumed} bytes, more than the {ROLLOUT_FRAME_LEN}-byte frame"
                )),
            ));
        }
        self.stream
            .seek(SeekFrom::Start(start + ROLLOUT_FRAME_LEN as u64))?;

        Ok(Some(record))
    }
}

/// Decodes every record in a gamefile member handle, in stream order.
pub fn decode_gamefile(handle: impl Read + Seek) -> GamefileRecords<impl Read + Seek> {
    GamefileRecords::new(handle)
}

/// Decodes every rollout context in a rollout member handle, in stream
/// order.
pub fn decode_rollouts(handle: impl Read + Seek) -> RolloutRecords<impl Read + Seek> {
    RolloutRecords::new(handle)
}
