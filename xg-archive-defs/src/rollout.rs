//! temp.xgr: a stream of fixed 2184-byte rollout records. Unlike the
//! gamefile stream there's only one record kind (`RolloutContext`) and no
//! version gating - every file reads the same 2174-byte payload followed by
//! 10 bytes of unused filler.

use std::io::Read;

use serde::Deserialize;

use crate::{file_line_col, BigArray, Error, ErrorKind, Result};

/// Fixed size of every rollout record frame.
pub const FRAME_LEN: usize = 2184;
/// Bytes actually parsed out of each frame; the remaining 10 bytes are
/// unused filler the source never reads meaningfully.
pub const PAYLOAD_LEN: usize = 2174;

fn decode<T: serde::de::DeserializeOwned>(reader: &mut impl Read) -> Result<T> {
    bincode::options()
        .with_fixint_encoding()
        .with_little_endian()
        .deserialize_from(reader)
        .map_err(|e| Error::new(file_line_col!(), ErrorKind::Bincode(e)))
}

use bincode::Options;

/// The 2174-byte on-disk layout of a rollout context record. Field order and
/// padding are taken directly from the reference's `struct` format string;
/// the comments noting "unused"/"not sure" fields are the original's, not
/// ours.
// Explicit `_padN` fields hold every other field at its natural alignment,
// but the declared wire size (2174) still isn't a multiple of 8 - the `f64`
// `BigArray`s push the struct past the last 8-byte boundary by 6 bytes, so a
// default layout would round `size_of` up to 2176. Packing recovers the
// exact wire size. `Serialize` can't be derived here: its generated impl
// references fields (including through `BigArray::serialize`) by `&self.field`,
// which panics under packing for anything wider than a byte - so this is
// decode-only, matching the teacher's `XFileHeader`/`XFile`/`XAssetList`.
#[derive(Clone, Copy, Deserialize)]
#[repr(C, packed)]
pub struct RolloutContextRaw {
    pub truncated: u8,
    pub error_limited: u8,
    pub _pad0: [u8; 2],
    pub truncate: i32,
    pub min_roll: i32,
    pub _pad1: [u8; 4],
    pub error_limit: f64,
    pub max_roll: i32,
    pub level1: i32,
    pub level2: i32,
    pub level_cut: i32,
    pub variance: u8,
    pub cubeless: u8,
    pub time: u8,
    pub _pad2: u8,
    pub level1c: i32,
    pub level2c: i32,
    pub time_limit: u32,
    pub truncate_bo: i32,
    pub random_seed: i32,
    pub random_seed_i: i32,
    pub roll_both: u8,
    pub _pad3: [u8; 3],
    pub search_interval: f32,
    /// Unused by the source.
    pub met: i32,
    pub first_roll: u8,
    pub do_double: u8,
    pub extent: u8,
    pub _pad4: u8,
    pub rolled: i32,
    pub double_first: u8,
    pub _pad5: [u8; 7],
    #[serde(with = "BigArray")]
    pub sum1: [f64; 37],
    #[serde(with = "BigArray")]
    pub sum_square1: [f64; 37],
    #[serde(with = "BigArray")]
    pub sum2: [f64; 37],
    #[serde(with = "BigArray")]
    pub sum_square2: [f64; 37],
    #[serde(with = "BigArray")]
    pub stdev1: [f64; 37],
    #[serde(with = "BigArray")]
    pub stdev2: [f64; 37],
    #[serde(with = "BigArray")]
    pub rolled_d: [i32; 37],
    pub error1: f32,
    pub error2: f32,
    pub result1: [f32; 7],
    pub result2: [f32; 7],
    pub mwc1: f32,
    pub mwc2: f32,
    /// Previous analyze level, kept around for deleting a rollout.
    pub prev_level: i32,
    pub prev_eval: [f32; 7],
    /// Despite the name, this is an `i32` on the wire, not a float.
    pub prev_nd: i32,
    pub prev_d: i32,
    pub duration: i32,
    pub level_trunc: i32,
    pub rolled2: i32,
    pub multiple_min: i32,
    pub multiple_stop_all: u8,
    pub multiple_stop_one: u8,
    pub _pad6: [u8; 2],
    pub multiple_stop_all_value: f32,
    pub multiple_stop_one_value: f32,
    pub as_take: u8,
    pub _pad7: [u8; 3],
    pub rotation: i32,
    pub user_interrupted: u8,
    pub _pad8: u8,
    pub ver_maj: u16,
    pub ver_min: u16,
}

impl RolloutContextRaw {
    pub const SIZEOFREC: usize = PAYLOAD_LEN;
}

/// The ergonomic form of [`RolloutContextRaw`]. Indices `1..=36` of the
/// per-first-roll arrays are the ones the source actually fills in; index 0
/// is left at its default (the arrays are one-indexed by die roll sum on
/// the wire, and we keep that shape rather than re-indexing it away).
#[derive(Clone, Debug)]
pub struct RolloutContext {
    pub truncated: bool,
    pub error_limited: bool,
    pub truncate: i32,
    pub min_roll: i32,
    pub error_limit: f64,
    pub max_roll: i32,
    pub level1: i32,
    pub level2: i32,
    pub level_cut: i32,
    pub variance: bool,
    pub cubeless: bool,
    pub time: bool,
    pub level1c: i32,
    pub level2c: i32,
    pub time_limit: u32,
    pub truncate_bo: i32,
    pub random_seed: i32,
    pub random_seed_i: i32,
    pub roll_both: bool,
    pub search_interval: f32,
    pub first_roll: bool,
    pub do_double: bool,
    pub extent: bool,
    pub rolled: i32,
    pub double_first: bool,
    pub sum1: [f64; 37],
    pub sum_square1: [f64; 37],
    pub sum2: [f64; 37],
    pub sum_square2: [f64; 37],
    pub stdev1: [f64; 37],
    pub stdev2: [f64; 37],
    pub rolled_d: [i32; 37],
    pub error1: f32,
    pub error2: f32,
    pub result1: [f32; 7],
    pub result2: [f32; 7],
    pub mwc1: f32,
    pub mwc2: f32,
    pub prev_level: i32,
    pub prev_eval: [f32; 7],
    pub duration: i32,
    pub level_trunc: i32,
    pub rolled2: i32,
    pub multiple_min: i32,
    pub multiple_stop_all: bool,
    pub multiple_stop_one: bool,
    pub multiple_stop_all_value: f32,
    pub multiple_stop_one_value: f32,
    pub as_take: bool,
    pub rotation: i32,
    pub user_interrupted: bool,
    pub ver_maj: u16,
    pub ver_min: u16,
}

impl From<RolloutContextRaw> for RolloutContext {
    fn from(raw: RolloutContextRaw) -> Self {
        Self {
            truncated: raw.truncated != 0,
            error_limited: raw.error_limited != 0,
            truncate: raw.truncate,
            min_roll: raw.min_roll,
            error_limit: raw.error_limit,
            max_roll: raw.max_roll,
            level1: raw.level1,
            level2: raw.level2,
            level_cut: raw.level_cut,
            variance: raw.variance != 0,
            cubeless: raw.cubeless != 0,
            time: raw.time != 0,
            level1c: raw.level1c,
            level2c: raw.level2c,
            time_limit: raw.time_limit,
            truncate_bo: raw.truncate_bo,
            random_seed: raw.random_seed,
            random_seed_i: raw.random_seed_i,
            roll_both: raw.roll_both != 0,
            search_interval: raw.search_interval,
            first_roll: raw.first_roll != 0,
            do_double: raw.do_double != 0,
            extent: raw.extent != 0,
            rolled: raw.rolled,
            double_first: raw.double_first != 0,
            sum1: raw.sum1,
            sum_square1: raw.sum_square1,
            sum2: raw.sum2,
            sum_square2: raw.sum_square2,
            stdev1: raw.stdev1,
            stdev2: raw.stdev2,
            rolled_d: raw.rolled_d,
            error1: raw.error1,
            error2: raw.error2,
            result1: raw.result1,
            result2: raw.result2,
            mwc1: raw.mwc1,
            mwc2: raw.mwc2,
            prev_level: raw.prev_level,
            prev_eval: raw.prev_eval,
            duration: raw.duration,
            level_trunc: raw.level_trunc,
            rolled2: raw.rolled2,
            multiple_min: raw.multiple_min,
            multiple_stop_all: raw.multiple_stop_all != 0,
            multiple_stop_one: raw.multiple_stop_one != 0,
            multiple_stop_all_value: raw.multiple_stop_all_value,
            multiple_stop_one_value: raw.multiple_stop_one_value,
            as_take: raw.as_take != 0,
            rotation: raw.rotation,
            user_interrupted: raw.user_interrupted != 0,
            ver_maj: raw.ver_maj,
            ver_min: raw.ver_min,
        }
    }
}

/// Decodes one 2174-byte rollout context payload. The caller is responsible
/// for skipping the remaining `FRAME_LEN - PAYLOAD_LEN` filler bytes to
/// reach the next frame.
pub fn decode_rollout_context(reader: &mut impl Read) -> Result<RolloutContext> {
    let raw: RolloutContextRaw = decode(reader)?;
    Ok(raw.into())
}
