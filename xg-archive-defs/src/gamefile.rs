//! temp.xgi: a stream of fixed 2560-byte gamefile records. Every frame
//! carries an 8-byte unused prefix followed by a 1-byte entry-type tag; the
//! payload that follows is tagged-union shaped and, for several kinds, its
//! trailing fields are gated by the match format `Version` first seen on the
//! `HeaderMatch` record.
//!
//! Callers own framing (each frame is read into a fixed-size buffer before
//! any of this module sees it, so a malformed record can never read into
//! its neighbor); this module only knows how to decode a payload once the
//! 9-byte prefix has already been consumed.

use std::io::Read;

use serde::{Deserialize, Serialize};

use crate::{
    file_line_col,
    primitive::{delphi_datetime, pascal_short, utf16_nt},
    Error, ErrorKind, Result,
};

/// Bytes consumed by every frame's shared prefix (8 unused + 1 tag byte)
/// before a kind-specific payload begins.
pub const PREFIX_LEN: usize = 9;
/// Fixed size of every gamefile record frame.
pub const FRAME_LEN: usize = 2560;

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum RecordTag {
    HeaderMatch = 0,
    HeaderGame = 1,
    Cube = 2,
    Move = 3,
    FooterGame = 4,
    FooterMatch = 5,
    Missing = 6,
    Unimplemented = 7,
}

impl From<u8> for RecordTag {
    /// Any tag outside `0..=7` is treated the same as tag 7: an
    /// `Unimplemented` placeholder. The frame is still fully consumed by the
    /// caller; we never abort a stream over an unrecognized tag byte.
    fn from(value: u8) -> Self {
        match value {
            0 => Self::HeaderMatch,
            1 => Self::HeaderGame,
            2 => Self::Cube,
            3 => Self::Move,
            4 => Self::FooterGame,
            5 => Self::FooterMatch,
            6 => Self::Missing,
            _ => Self::Unimplemented,
        }
    }
}

fn decode<T: serde::de::DeserializeOwned>(reader: &mut impl Read) -> Result<T> {
    bincode::options()
        .with_fixint_encoding()
        .with_little_endian()
        .deserialize_from(reader)
        .map_err(|e| Error::new(file_line_col!(), ErrorKind::Bincode(e)))
}

use bincode::Options;

// ============================================================================
// Shared sub-records embedded in Cube and Move entries.

#[derive(Clone, Copy, Serialize, Deserialize)]
pub struct TimeSettingRaw {
    pub clock_type: i32,
    pub per_game: u8,
    pub _pad: [u8; 3],
    pub time1: i32,
    pub time2: i32,
    pub penalty: i32,
    pub time_left1: i32,
    pub time_left2: i32,
    pub penalty_money: i32,
}

#[derive(Clone, Debug)]
pub struct TimeSetting {
    pub clock_type: i32,
    pub per_game: bool,
    pub time1: i32,
    pub time2: i32,
    pub penalty: i32,
    pub time_left1: i32,
    pub time_left2: i32,
    pub penalty_money: i32,
}

impl From<TimeSettingRaw> for TimeSetting {
    fn from(raw: TimeSettingRaw) -> Self {
        Self {
            clock_type: raw.clock_type,
            per_game: raw.per_game != 0,
            time1: raw.time1,
            time2: raw.time2,
            penalty: raw.penalty,
            time_left1: raw.time_left1,
            time_left2: raw.time_left2,
            penalty_money: raw.penalty_money,
        }
    }
}

#[derive(Clone, Copy, Default, Serialize, Deserialize)]
pub struct EvalLevelRaw {
    pub level: i16,
    pub is_double: u8,
    pub _pad: i8,
}

#[derive(Clone, Copy, Debug, Default)]
pub struct EvalLevel {
    pub level: i16,
    pub is_double: bool,
}

impl From<EvalLevelRaw> for EvalLevel {
    fn from(raw: EvalLevelRaw) -> Self {
        Self {
            level: raw.level,
            is_double: raw.is_double != 0,
        }
    }
}

/// The engine's analysis of every legal move at a decision point.
#[derive(Clone, Copy, Serialize, Deserialize)]
pub struct EngineStructBestMoveRecordRaw {
    pub pos: [i8; 26],
    pub _pad: [u8; 2],
    pub dice: [i32; 2],
    pub level: i32,
    pub score: [i32; 2],
    pub cube: i32,
    pub cube_pos: i32,
    pub crawford: i32,
    pub jacoby: i32,
    pub n_moves: i32,
    pub pos_played: [[i8; 26]; 32],
    pub moves: [[i8; 8]; 32],
    pub eval_level: [EvalLevelRaw; 32],
    pub eval: [[f32; 7]; 32],
    pub unused: i8,
    pub met: i8,
    pub choice0: i8,
    pub choice3: i8,
}

#[derive(Clone, Debug)]
pub struct EngineStructBestMove {
    pub pos: [i8; 26],
    pub dice: [i32; 2],
    pub level: i32,
    pub score: [i32; 2],
    pub cube: i32,
    pub cube_pos: i32,
    pub crawford: i32,
    pub jacoby: i32,
    pub n_moves: i32,
    pub pos_played: Vec<[i8; 26]>,
    pub moves: Vec<[i8; 8]>,
    pub eval_level: Vec<EvalLevel>,
    pub eval: Vec<[f32; 7]>,
}

impl From<EngineStructBestMoveRecordRaw> for EngineStructBestMove {
    fn from(raw: EngineStructBestMoveRecordRaw) -> Self {
        let n = raw.n_moves.max(0) as usize;
        let n = n.min(32);
        Self {
            pos: raw.pos,
            dice: raw.dice,
            level: raw.level,
            score: raw.score,
            cube: raw.cube,
            cube_pos: raw.cube_pos,
            crawford: raw.crawford,
            jacoby: raw.jacoby,
            n_moves: raw.n_moves,
            pos_played: raw.pos_played[..n].to_vec(),
            moves: raw.moves[..n].to_vec(),
            eval_level: raw.eval_level[..n].iter().copied().map(Into::into).collect(),
            eval: raw.eval[..n].to_vec(),
        }
    }
}

/// The engine's analysis of a single double/take/pass decision.
#[derive(Clone, Copy, Serialize, Deserialize)]
pub struct EngineStructDoubleActionRaw {
    pub pos: [i8; 26],
    pub _pad: [u8; 2],
    pub level: i32,
    pub score: [i32; 2],
    pub cube: i32,
    pub cube_pos: i32,
    pub jacoby: i32,
    pub crawford: i16,
    pub met: i16,
    pub flag_double: i16,
    pub is_beaver: i16,
    pub eval: [f32; 7],
    pub equ_b: f32,
    pub equ_double: f32,
    pub equ_drop: f32,
    pub level_request: i16,
    pub double_choice3: i16,
    pub eval_double: [f32; 7],
}

#[derive(Clone, Debug)]
pub struct EngineStructDoubleAction {
    pub pos: [i8; 26],
    pub level: i32,
    pub score: [i32; 2],
    pub cube: i32,
    pub cube_pos: i32,
    pub jacoby: bool,
    pub crawford: bool,
    pub flag_double: bool,
    pub is_beaver: bool,
    pub eval: [f32; 7],
    pub equ_b: f32,
    pub equ_double: f32,
    pub equ_drop: f32,
    pub eval_double: [f32; 7],
}

impl From<EngineStructDoubleActionRaw> for EngineStructDoubleAction {
    fn from(raw: EngineStructDoubleActionRaw) -> Self {
        Self {
            pos: raw.pos,
            level: raw.level,
            score: raw.score,
            cube: raw.cube,
            cube_pos: raw.cube_pos,
            jacoby: raw.jacoby != 0,
            crawford: raw.crawford != 0,
            flag_double: raw.flag_double != 0,
            is_beaver: raw.is_beaver != 0,
            eval: raw.eval,
            equ_b: raw.equ_b,
            equ_double: raw.equ_double,
            equ_drop: raw.equ_drop,
            eval_double: raw.eval_double,
        }
    }
}

// ============================================================================
// HeaderMatchEntry (tag 0)

// `f64`/`i32` fields keep this struct's natural alignment at 8, but its wire
// size (603) isn't a multiple of 8, so a default layout pads it past that.
// Packing recovers the exact wire size; `Serialize` can't be derived on a
// packed struct with non-byte-aligned fields (it would reference them by
// `&self.field`), so this is decode-only, matching the teacher's
// `XFileHeader`/`XFile`/`XAssetList`.
#[derive(Clone, Copy, Deserialize)]
#[repr(C, packed)]
pub struct HeaderMatchBaseRaw {
    #[serde(with = "crate::BigArray")]
    pub s_player1: [u8; 41],
    #[serde(with = "crate::BigArray")]
    pub s_player2: [u8; 41],
    pub _pad0: u8,
    pub match_length: i32,
    pub variation: i32,
    pub crawford: u8,
    pub jacoby: u8,
    pub beaver: u8,
    pub auto_double: u8,
    pub elo1: f64,
    pub elo2: f64,
    pub exp1: i32,
    pub exp2: i32,
    pub date: f64,
    #[serde(with = "crate::BigArray")]
    pub s_event: [u8; 129],
    pub _pad1: [u8; 3],
    pub game_id: i32,
    pub comp_level1: i32,
    pub comp_level2: i32,
    pub count_for_elo: u8,
    pub add_to_profile1: u8,
    pub add_to_profile2: u8,
    #[serde(with = "crate::BigArray")]
    pub s_location: [u8; 129],
    pub game_mode: i32,
    pub imported: u8,
    #[serde(with = "crate::BigArray")]
    pub s_round: [u8; 129],
    pub _pad2: [u8; 2],
    pub invert: i32,
    pub version: i32,
    pub magic: u32,
    pub money_init_g: i32,
    pub money_init_score: [i32; 2],
    pub entered: u8,
    pub counted: u8,
    pub unrated_imp: u8,
    pub _pad3: u8,
    pub comment_header_match: i32,
    pub comment_footer_match: i32,
    pub is_money_match: u8,
    pub _pad4: [u8; 3],
    // On the wire these three are single-precision, unlike every other
    // money/equity field in the format.
    pub win_money: f32,
    pub lose_money: f32,
    pub currency: i32,
    pub fee_money: f32,
    pub table_stake: i32,
    pub site_id: i32,
}

/// Present when `Version >= 8`.
#[derive(Clone, Copy, Serialize, Deserialize)]
pub struct HeaderMatchV8Raw {
    pub cube_limit: i32,
    pub auto_double_max: i32,
}

/// Present when `Version >= 24`: UTF-16 restatements of the Windows-1252
/// fields above, wide enough to round-trip non-Latin player names.
#[derive(Clone, Copy, Serialize, Deserialize)]
pub struct HeaderMatchV24Raw {
    pub transcribed: u8,
    pub _pad: u8,
    #[serde(with = "crate::BigArray")]
    pub event: [u16; 129],
    #[serde(with = "crate::BigArray")]
    pub player1: [u16; 129],
    #[serde(with = "crate::BigArray")]
    pub player2: [u16; 129],
    #[serde(with = "crate::BigArray")]
    pub location: [u16; 129],
    #[serde(with = "crate::BigArray")]
    pub round: [u16; 129],
}

/// Present when `Version >= 25`.
pub type HeaderMatchV25Raw = TimeSettingRaw;

/// Present when `Version >= 26`.
#[derive(Clone, Copy, Serialize, Deserialize)]
pub struct HeaderMatchV26Raw {
    pub tot_time_delay_move: i32,
    pub tot_time_delay_cube: i32,
    pub tot_time_delay_move_done: i32,
    pub tot_time_delay_cube_done: i32,
}

/// Present when `Version >= 30`.
#[derive(Clone, Copy, Serialize, Deserialize)]
pub struct HeaderMatchV30Raw {
    #[serde(with = "crate::BigArray")]
    pub transcriber: [u16; 129],
}

#[derive(Clone, Debug)]
pub struct HeaderMatchEntry {
    pub version: i32,
    pub player1: String,
    pub player2: String,
    pub match_length: i32,
    pub variation: i32,
    pub crawford: bool,
    pub jacoby: bool,
    pub beaver: bool,
    pub auto_double: bool,
    pub elo1: f64,
    pub elo2: f64,
    pub date: Option<chrono::NaiveDateTime>,
    pub event: String,
    pub location: String,
    pub round: String,
    pub game_id: i32,
    pub is_money_match: bool,
    pub win_money: f64,
    pub lose_money: f64,
    pub currency: i32,
    pub cube_limit: Option<i32>,
    pub auto_double_max: Option<i32>,
    pub transcribed: Option<bool>,
    pub time_setting: Option<TimeSetting>,
    pub transcriber: Option<String>,
}

pub fn decode_header_match(reader: &mut impl Read) -> Result<HeaderMatchEntry> {
    let base: HeaderMatchBaseRaw = decode(reader)?;
    let version = base.version;

    let v8 = if version >= 8 {
        Some(decode::<HeaderMatchV8Raw>(reader)?)
    } else {
        None
    };
    let v24 = if version >= 24 {
        Some(decode::<HeaderMatchV24Raw>(reader)?)
    } else {
        None
    };
    let v25 = if version >= 25 {
        Some(decode::<HeaderMatchV25Raw>(reader)?)
    } else {
        None
    };
    let v26 = if version >= 26 {
        Some(decode::<HeaderMatchV26Raw>(reader)?)
    } else {
        None
    };
    let v30 = if version >= 30 {
        Some(decode::<HeaderMatchV30Raw>(reader)?)
    } else {
        None
    };

    let (player1, player2, event, location, round) = if let Some(v24) = &v24 {
        (
            utf16_nt(&v24.player1),
            utf16_nt(&v24.player2),
            utf16_nt(&v24.event),
            utf16_nt(&v24.location),
            utf16_nt(&v24.round),
        )
    } else {
        (
            pascal_short(&base.s_player1),
            pascal_short(&base.s_player2),
            pascal_short(&base.s_event),
            pascal_short(&base.s_location),
            pascal_short(&base.s_round),
        )
    };

    Ok(HeaderMatchEntry {
        version,
        player1,
        player2,
        match_length: base.match_length,
        variation: base.variation,
        crawford: base.crawford != 0,
        jacoby: base.jacoby != 0,
        beaver: base.beaver != 0,
        auto_double: base.auto_double != 0,
        elo1: base.elo1,
        elo2: base.elo2,
        date: delphi_datetime(base.date),
        event,
        location,
        round,
        game_id: base.game_id,
        is_money_match: base.is_money_match != 0,
        win_money: base.win_money as f64,
        lose_money: base.lose_money as f64,
        currency: base.currency,
        cube_limit: v8.map(|v| v.cube_limit),
        auto_double_max: v8.map(|v| v.auto_double_max),
        transcribed: v24.as_ref().map(|v| v.transcribed != 0),
        time_setting: v25.map(Into::into),
        transcriber: v30.map(|v| utf16_nt(&v.transcriber)),
    })
}

// ============================================================================
// HeaderGameEntry (tag 1)
//
// Unlike Move/Cube, the Python reference reads this record's fields in one
// unconditional block and only conditionally *exposes* the trailing field
// depending on `Version`; the byte layout doesn't actually change between
// versions. We reproduce that by always decoding `number_of_auto_doubles`
// and zeroing it in the ergonomic type for `Version < 26`.

// Wire size 59 isn't a multiple of this struct's natural (4-byte) alignment;
// packed + decode-only for the same reason as `HeaderMatchBaseRaw` above.
#[derive(Clone, Copy, Deserialize)]
#[repr(C, packed)]
pub struct HeaderGameRaw {
    pub _pad0: [u8; 3],
    pub score1: i32,
    pub score2: i32,
    pub crawford_apply: u8,
    pub pos_init: [i8; 26],
    pub _pad1: u8,
    pub game_number: i32,
    pub in_progress: u8,
    pub _pad2: [u8; 3],
    pub comment_header_game: i32,
    pub comment_footer_game: i32,
    pub number_of_auto_doubles: i32,
}

#[derive(Clone, Debug)]
pub struct HeaderGameEntry {
    pub score1: i32,
    pub score2: i32,
    pub crawford_apply: bool,
    pub pos_init: [i8; 26],
    pub game_number: i32,
    pub in_progress: bool,
    pub comment_header_game: i32,
    pub comment_footer_game: i32,
    pub number_of_auto_doubles: Option<i32>,
}

pub fn decode_header_game(reader: &mut impl Read, version: i32) -> Result<HeaderGameEntry> {
    let raw: HeaderGameRaw = decode(reader)?;
    Ok(HeaderGameEntry {
        score1: raw.score1,
        score2: raw.score2,
        crawford_apply: raw.crawford_apply != 0,
        pos_init: raw.pos_init,
        game_number: raw.game_number,
        in_progress: raw.in_progress != 0,
        comment_header_game: raw.comment_header_game,
        comment_footer_game: raw.comment_footer_game,
        number_of_auto_doubles: (version >= 26).then_some(raw.number_of_auto_doubles),
    })
}

// ============================================================================
// CubeEntry (tag 2)
//
// Like HeaderGame, the Python reference issues a single unconditional read
// here (116 bytes) and only *interprets* the v24/v26/v27/v28 tail
// conditionally - the bytes are always on the wire. Move, below, is the one
// that genuinely varies its read length by version.

// Wire size 55 isn't a multiple of 4; packed + decode-only, see
// `HeaderMatchBaseRaw`.
#[derive(Clone, Copy, Deserialize)]
#[repr(C, packed)]
pub struct CubeBaseRaw {
    pub _pad0: [u8; 3],
    pub active_p: i32,
    pub double: i32,
    pub take: i32,
    pub beaverr: i32,
    pub raccoonr: i32,
    pub cubeb: i32,
    pub position: [i8; 26],
    pub _pad1: [u8; 2],
}

/// Unlike Move's suffixes, every one of these fields is always present on
/// the wire regardless of `Version` - the source reads this whole block in
/// a single unconditional call and only *interprets* the tail conditionally.
/// We mirror that: always decode the full 116 bytes, then gate exposure.
// Wire size 116 isn't a multiple of the 8-byte alignment its `f64` fields
// demand; packed + decode-only, see `HeaderMatchBaseRaw`.
#[derive(Clone, Copy, Deserialize)]
#[repr(C, packed)]
pub struct CubeTailRaw {
    pub _pad0: [u8; 4],
    pub err_cube: f64,
    pub dice_rolled: [u8; 3],
    pub _pad1: [u8; 5],
    pub err_take: f64,
    pub rollout_index_d: i32,
    pub comp_choice_d: i32,
    pub analyze_c: i32,
    pub _pad2: [u8; 4],
    pub err_beaver: f64,
    pub err_raccoon: f64,
    pub analyze_cr: i32,
    pub is_valid: i32,
    pub tutor_cube: i8,
    pub tutor_take: i8,
    pub _pad3: [u8; 6],
    pub err_tutor_cube: f64,
    pub err_tutor_take: f64,
    pub flagged_double: u8,
    pub _pad4: [u8; 3],
    pub comment_cube: i32,
    /// v24
    pub edited_cube: u8,
    /// v26
    pub time_delay_cube: u8,
    /// v26
    pub time_delay_cube_done: u8,
    pub _pad5: u8,
    /// v27
    pub number_of_auto_double_cube: i32,
    /// v28
    pub time_bot: i32,
    /// v28
    pub time_top: i32,
}

#[derive(Clone, Debug)]
pub struct CubeEntry {
    pub active_p: i32,
    pub double: i32,
    pub take: i32,
    pub beaverr: i32,
    pub raccoonr: i32,
    pub position: [i8; 26],
    pub doubled: EngineStructDoubleAction,
    pub err_cube: f64,
    pub dice_rolled: String,
    pub err_take: f64,
    pub err_beaver: f64,
    pub err_raccoon: f64,
    pub is_valid: bool,
    pub flagged_double: bool,
    pub comment_cube: i32,
    pub edited_cube: Option<bool>,
    pub time_delay_cube: Option<u8>,
    pub time_delay_cube_done: Option<u8>,
    pub number_of_auto_double_cube: Option<i32>,
    pub time_bot: Option<i32>,
    pub time_top: Option<i32>,
}

pub fn decode_cube(reader: &mut impl Read, version: i32) -> Result<CubeEntry> {
    let base: CubeBaseRaw = decode(reader)?;
    let doubled: EngineStructDoubleActionRaw = decode(reader)?;
    // The tail is always 116 bytes on the wire, whatever the file version;
    // version only gates which already-read fields are meaningful.
    let tail: CubeTailRaw = decode(reader)?;

    Ok(CubeEntry {
        active_p: base.active_p,
        double: base.double,
        take: base.take,
        beaverr: base.beaverr,
        raccoonr: base.raccoonr,
        position: base.position,
        doubled: doubled.into(),
        err_cube: tail.err_cube,
        dice_rolled: pascal_short(&tail.dice_rolled),
        err_take: tail.err_take,
        err_beaver: tail.err_beaver,
        err_raccoon: tail.err_raccoon,
        is_valid: tail.is_valid != 0,
        flagged_double: tail.flagged_double != 0,
        comment_cube: tail.comment_cube,
        edited_cube: (version >= 24).then_some(tail.edited_cube != 0),
        time_delay_cube: (version >= 26).then_some(tail.time_delay_cube),
        time_delay_cube_done: (version >= 26).then_some(tail.time_delay_cube_done),
        number_of_auto_double_cube: (version >= 27).then_some(tail.number_of_auto_double_cube),
        time_bot: (version >= 28).then_some(tail.time_bot),
        time_top: (version >= 28).then_some(tail.time_top),
    })
}

// ============================================================================
// MoveEntry (tag 3)

// Wire size 115 isn't a multiple of the 8-byte alignment `error_m` demands;
// packed + decode-only, see `HeaderMatchBaseRaw`.
#[derive(Clone, Copy, Deserialize)]
#[repr(C, packed)]
pub struct MoveBaseRaw {
    pub position_i: [i8; 26],
    pub position_end: [i8; 26],
    pub _pad: [u8; 3],
    pub active_p: i32,
    pub moves: [i32; 8],
    pub dice: [i32; 2],
    pub cube_a: i32,
    /// Unused by the source ("not sure"); on the wire as a double, not an
    /// int.
    pub error_m: f64,
    pub n_move_eval: i32,
}

// Wire size 220 isn't a multiple of 8; packed + decode-only, see
// `HeaderMatchBaseRaw`.
#[derive(Clone, Copy, Deserialize)]
#[repr(C, packed)]
pub struct MoveTailRaw {
    pub played: u8,
    pub _pad: [u8; 3],
    pub err_move: f64,
    pub err_luck: f64,
    pub comp_choice: i32,
    pub _pad2b: [u8; 4],
    pub init_eq: f64,
    pub rollout_index_m: [i32; 32],
    pub analyze_m: i32,
    pub analyze_l: i32,
    pub invalid_m: i32,
    pub position_tutor: [i8; 26],
    pub tutor: i8,
    pub _pad2: [u8; 1],
    pub err_tutor_move: f64,
    pub flagged: u8,
    pub _pad3: [u8; 3],
    pub comment_move: i32,
}

/// Present when `Version >= 24`.
#[derive(Clone, Copy, Serialize, Deserialize)]
pub struct MoveV24Raw {
    pub edited_move: u8,
}

/// Present when `Version >= 26`.
#[derive(Clone, Copy, Serialize, Deserialize)]
pub struct MoveV26Raw {
    pub _pad: [u8; 3],
    pub time_delay_move: u32,
    pub time_delay_move_done: u32,
}

/// Present when `Version >= 27`.
#[derive(Clone, Copy, Serialize, Deserialize)]
pub struct MoveV27Raw {
    pub number_of_auto_double_move: i32,
}

#[derive(Clone, Debug)]
pub struct MoveEntry {
    pub position_i: [i8; 26],
    pub position_end: [i8; 26],
    pub active_p: i32,
    pub moves: [i32; 8],
    pub dice: [i32; 2],
    pub cube_a: i32,
    pub data_moves: EngineStructBestMove,
    pub played: bool,
    pub err_move: f64,
    pub err_luck: f64,
    pub comp_choice: i32,
    pub init_eq: f64,
    pub analyze_m: i32,
    pub flagged: bool,
    pub comment_move: i32,
    pub edited_move: Option<bool>,
    pub time_delay_move: Option<u32>,
    pub time_delay_move_done: Option<u32>,
    pub number_of_auto_double_move: Option<i32>,
}

pub fn decode_move(reader: &mut impl Read, version: i32) -> Result<MoveEntry> {
    let base: MoveBaseRaw = decode(reader)?;
    let data_moves: EngineStructBestMoveRecordRaw = decode(reader)?;
    let tail: MoveTailRaw = decode(reader)?;

    let v24 = if version >= 24 {
        Some(decode::<MoveV24Raw>(reader)?)
    } else {
        None
    };
    let v26 = if version >= 26 {
        Some(decode::<MoveV26Raw>(reader)?)
    } else {
        None
    };
    let v27 = if version >= 27 {
        Some(decode::<MoveV27Raw>(reader)?)
    } else {
        None
    };

    Ok(MoveEntry {
        position_i: base.position_i,
        position_end: base.position_end,
        active_p: base.active_p,
        moves: base.moves,
        dice: base.dice,
        cube_a: base.cube_a,
        data_moves: data_moves.into(),
        played: tail.played != 0,
        err_move: tail.err_move,
        err_luck: tail.err_luck,
        comp_choice: tail.comp_choice,
        init_eq: tail.init_eq,
        analyze_m: tail.analyze_m,
        flagged: tail.flagged != 0,
        comment_move: tail.comment_move,
        edited_move: v24.map(|v| v.edited_move != 0),
        time_delay_move: v26.map(|v| v.time_delay_move),
        time_delay_move_done: v26.map(|v| v.time_delay_move_done),
        number_of_auto_double_move: v27.map(|v| v.number_of_auto_double_move),
    })
}

// ============================================================================
// FooterGameEntry (tag 4)

// Wire size 107 isn't a multiple of 8; packed + decode-only, see
// `HeaderMatchBaseRaw`.
#[derive(Clone, Copy, Deserialize)]
#[repr(C, packed)]
pub struct FooterGameRaw {
    pub _pad0: [u8; 3],
    pub score1: i32,
    pub score2: i32,
    pub crawford_apply: u8,
    pub _pad1: [u8; 3],
    pub winner: i32,
    pub points_won: i32,
    pub termination: i32,
    pub _pad2: [u8; 4],
    pub err_resign: f64,
    pub err_take_resign: f64,
    pub eval: [f64; 7],
    pub eval_level: i32,
}

#[derive(Clone, Debug)]
pub struct FooterGameEntry {
    pub score1: i32,
    pub score2: i32,
    pub crawford_apply: bool,
    pub winner: i32,
    pub points_won: i32,
    pub termination: i32,
    pub err_resign: f64,
    pub err_take_resign: f64,
    pub eval: [f64; 7],
    pub eval_level: i32,
}

pub fn decode_footer_game(reader: &mut impl Read) -> Result<FooterGameEntry> {
    let raw: FooterGameRaw = decode(reader)?;
    Ok(FooterGameEntry {
        score1: raw.score1,
        score2: raw.score2,
        crawford_apply: raw.crawford_apply != 0,
        winner: raw.winner,
        points_won: raw.points_won,
        termination: raw.termination,
        err_resign: raw.err_resign,
        err_take_resign: raw.err_take_resign,
        eval: raw.eval,
        eval_level: raw.eval_level,
    })
}

// ============================================================================
// FooterMatchEntry (tag 5)

// Wire size 47 isn't a multiple of 8; packed + decode-only, see
// `HeaderMatchBaseRaw`.
#[derive(Clone, Copy, Deserialize)]
#[repr(C, packed)]
pub struct FooterMatchRaw {
    pub _pad: [u8; 3],
    pub score1: i32,
    pub score2: i32,
    pub winner: i32,
    pub elo1: f64,
    pub elo2: f64,
    pub exp1: i32,
    pub exp2: i32,
    pub date: f64,
}

#[derive(Clone, Debug)]
pub struct FooterMatchEntry {
    pub score1: i32,
    pub score2: i32,
    pub winner: i32,
    pub elo1: f64,
    pub elo2: f64,
    pub exp1: i32,
    pub exp2: i32,
    pub date: Option<chrono::NaiveDateTime>,
}

pub fn decode_footer_match(reader: &mut impl Read) -> Result<FooterMatchEntry> {
    let raw: FooterMatchRaw = decode(reader)?;
    Ok(FooterMatchEntry {
        score1: raw.score1,
        score2: raw.score2,
        winner: raw.winner,
        elo1: raw.elo1,
        elo2: raw.elo2,
        exp1: raw.exp1,
        exp2: raw.exp2,
        date: delphi_datetime(raw.date),
    })
}

// ============================================================================
// MissingEntry (tag 6)

// Wire size 23 isn't a multiple of 8; packed + decode-only, see
// `HeaderMatchBaseRaw`.
#[derive(Clone, Copy, Deserialize)]
#[repr(C, packed)]
pub struct MissingRaw {
    pub _pad: [u8; 7],
    pub err_luck: f64,
    pub winner: i32,
    pub points: i32,
}

#[derive(Clone, Debug)]
pub struct MissingEntry {
    pub err_luck: f64,
    pub winner: i32,
    pub points: i32,
}

pub fn decode_missing(reader: &mut impl Read) -> Result<MissingEntry> {
    let raw: MissingRaw = decode(reader)?;
    Ok(MissingEntry {
        err_luck: raw.err_luck,
        winner: raw.winner,
        points: raw.points,
    })
}

// ============================================================================

#[derive(Clone, Debug)]
pub enum GamefileRecord {
    HeaderMatch(HeaderMatchEntry),
    HeaderGame(HeaderGameEntry),
    Cube(CubeEntry),
    Move(MoveEntry),
    FooterGame(FooterGameEntry),
    FooterMatch(FooterMatchEntry),
    Missing(MissingEntry),
    Unimplemented,
}

/// Decodes one record's payload, given its tag and the `Version` carried
/// forward from the stream's `HeaderMatch` record (tag 7, "unimplemented",
/// carries no payload worth decoding at all).
pub fn decode_record(reader: &mut impl Read, tag: RecordTag, version: i32) -> Result<GamefileRecord> {
    Ok(match tag {
        RecordTag::HeaderMatch => GamefileRecord::HeaderMatch(decode_header_match(reader)?),
        RecordTag::HeaderGame => GamefileRecord::HeaderGame(decode_header_game(reader, version)?),
        RecordTag::Cube => GamefileRecord::Cube(decode_cube(reader, version)?),
        RecordTag::Move => GamefileRecord::Move(decode_move(reader, version)?),
        RecordTag::FooterGame => GamefileRecord::FooterGame(decode_footer_game(reader)?),
        RecordTag::FooterMatch => GamefileRecord::FooterMatch(decode_footer_match(reader)?),
        RecordTag::Missing => GamefileRecord::Missing(decode_missing(reader)?),
        RecordTag::Unimplemented => GamefileRecord::Unimplemented,
    })
}

crate::assert_size!(TimeSettingRaw, 32);
crate::assert_size!(EvalLevelRaw, 4);
crate::assert_size!(EngineStructBestMoveRecordRaw, 2184);
crate::assert_size!(EngineStructDoubleActionRaw, 132);
crate::assert_size!(HeaderMatchBaseRaw, 603);
crate::assert_size!(HeaderMatchV8Raw, 8);
crate::assert_size!(HeaderMatchV24Raw, 1292);
crate::assert_size!(HeaderMatchV26Raw, 16);
crate::assert_size!(HeaderMatchV30Raw, 258);
crate::assert_size!(HeaderGameRaw, 59);
crate::assert_size!(CubeBaseRaw, 55);
crate::assert_size!(CubeTailRaw, 116);
crate::assert_size!(MoveBaseRaw, 115);
crate::assert_size!(MoveTailRaw, 220);
crate::assert_size!(FooterGameRaw, 107);
crate::assert_size!(FooterMatchRaw, 47);
crate::assert_size!(MissingRaw, 23);

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use super::*;

    fn enc<T: Serialize>(v: &T) -> Vec<u8> {
        bincode::options()
            .with_fixint_encoding()
            .with_little_endian()
            .serialize(v)
            .unwrap()
    }

    /// Reinterprets a `#[repr(C, packed)]` wire struct as its exact
    /// little-endian byte encoding. These structs can't derive `Serialize`
    /// (see their definitions), so tests build their frames this way instead
    /// of round-tripping through `enc`.
    fn packed_bytes<T: Copy, const N: usize>(v: T) -> Vec<u8> {
        debug_assert_eq!(core::mem::size_of::<T>(), N);
        // SAFETY: `T` is a packed wire struct with no padding; every byte of
        // `v` is initialized, so reinterpreting it as `[u8; N]` is exactly
        // the little-endian encoding `Serialize` would have produced.
        unsafe { core::mem::transmute_copy::<T, [u8; N]>(&v) }.to_vec()
    }

    fn pascal_into(buf: &mut [u8], s: &str) {
        buf[0] = s.len() as u8;
        buf[1..1 + s.len()].copy_from_slice(s.as_bytes());
    }

    fn utf16_into(buf: &mut [u16], s: &str) {
        for (i, c) in s.encode_utf16().enumerate() {
            buf[i] = c;
        }
    }

    fn base_raw(version: i32) -> HeaderMatchBaseRaw {
        let mut s_player1 = [0u8; 41];
        let mut s_player2 = [0u8; 41];
        pascal_into(&mut s_player1, "Ann");
        pascal_into(&mut s_player2, "Bob");
        HeaderMatchBaseRaw {
            s_player1,
            s_player2,
            _pad0: 0,
            match_length: 5,
            variation: 0,
            crawford: 1,
            jacoby: 0,
            beaver: 0,
            auto_double: 0,
            elo1: 1500.0,
            elo2: 1500.0,
            exp1: 0,
            exp2: 0,
            date: 0.0,
            s_event: [0u8; 129],
            _pad1: [0; 3],
            game_id: 1,
            comp_level1: 0,
            comp_level2: 0,
            count_for_elo: 0,
            add_to_profile1: 0,
            add_to_profile2: 0,
            s_location: [0u8; 129],
            game_mode: 0,
            imported: 0,
            s_round: [0u8; 129],
            _pad2: [0; 2],
            invert: 0,
            version,
            magic: 0,
            money_init_g: 0,
            money_init_score: [0, 0],
            entered: 0,
            counted: 0,
            unrated_imp: 0,
            _pad3: 0,
            comment_header_match: 0,
            comment_footer_match: 0,
            is_money_match: 0,
            _pad4: [0; 3],
            win_money: 0.0,
            lose_money: 0.0,
            currency: 0,
            fee_money: 0.0,
            table_stake: 0,
            site_id: 0,
        }
    }

    #[test]
    fn header_match_version_0_has_no_optional_suffixes() {
        let bytes = base_bytes(0);
        let mut cursor = Cursor::new(bytes);
        let entry = decode_header_match(&mut cursor).unwrap();
        assert_eq!(entry.version, 0);
        assert_eq!(entry.player1, "Ann");
        assert_eq!(entry.player2, "Bob");
        assert_eq!(entry.cube_limit, None);
        assert_eq!(entry.transcribed, None);
        assert!(entry.time_setting.is_none());
        assert_eq!(entry.transcriber, None);
        // every byte of the base record was consumed, none left over
        assert_eq!(cursor.position() as usize, cursor.get_ref().len());
    }

    #[test]
    fn header_match_version_30_decodes_all_suffixes() {
        let mut bytes = base_bytes(30);

        bytes.extend(enc(&HeaderMatchV8Raw {
            cube_limit: 1024,
            auto_double_max: 4,
        }));

        let mut v24 = HeaderMatchV24Raw {
            transcribed: 1,
            _pad: 0,
            event: [0u16; 129],
            player1: [0u16; 129],
            player2: [0u16; 129],
            location: [0u16; 129],
            round: [0u16; 129],
        };
        utf16_into(&mut v24.player1, "Anna");
        utf16_into(&mut v24.player2, "Bobby");
        bytes.extend(enc(&v24));

        bytes.extend(enc(&TimeSettingRaw {
            clock_type: 1,
            per_game: 1,
            _pad: [0; 3],
            time1: 600,
            time2: 600,
            penalty: 0,
            time_left1: 500,
            time_left2: 500,
            penalty_money: 0,
        }));

        bytes.extend(enc(&HeaderMatchV26Raw {
            tot_time_delay_move: 1,
            tot_time_delay_cube: 2,
            tot_time_delay_move_done: 3,
            tot_time_delay_cube_done: 4,
        }));

        let mut v30 = HeaderMatchV30Raw {
            transcriber: [0u16; 129],
        };
        utf16_into(&mut v30.transcriber, "Scribe");
        bytes.extend(enc(&v30));

        let mut cursor = Cursor::new(bytes);
        let entry = decode_header_match(&mut cursor).unwrap();
        assert_eq!(entry.version, 30);
        // v24 names win over the pascal-string base once present
        assert_eq!(entry.player1, "Anna");
        assert_eq!(entry.player2, "Bobby");
        assert_eq!(entry.cube_limit, Some(1024));
        assert_eq!(entry.transcribed, Some(true));
        assert!(entry.time_setting.is_some());
        assert_eq!(entry.time_setting.unwrap().time1, 600);
        assert_eq!(entry.transcriber.as_deref(), Some("Scribe"));
        assert_eq!(cursor.position() as usize, cursor.get_ref().len());
    }

    fn base_bytes(version: i32) -> Vec<u8> {
        packed_bytes::<_, 603>(base_raw(version))
    }

    fn header_game_raw(number_of_auto_doubles: i32) -> HeaderGameRaw {
        HeaderGameRaw {
            _pad0: [0; 3],
            score1: 3,
            score2: 1,
            crawford_apply: 0,
            pos_init: [0; 26],
            _pad1: 0,
            game_number: 2,
            in_progress: 1,
            _pad2: [0; 3],
            comment_header_game: 0,
            comment_footer_game: 0,
            number_of_auto_doubles,
        }
    }

    #[test]
    fn header_game_gates_auto_doubles_on_version() {
        let bytes = packed_bytes::<_, 59>(header_game_raw(2));

        let entry = decode_header_game(&mut Cursor::new(bytes.clone()), 10).unwrap();
        assert_eq!(entry.number_of_auto_doubles, None);

        let entry = decode_header_game(&mut Cursor::new(bytes), 26).unwrap();
        assert_eq!(entry.number_of_auto_doubles, Some(2));
    }

    fn cube_bytes() -> Vec<u8> {
        let base = CubeBaseRaw {
            _pad0: [0; 3],
            active_p: 1,
            double: 1,
            take: 0,
            beaverr: 0,
            raccoonr: 0,
            cubeb: 2,
            position: [0; 26],
            _pad1: [0; 2],
        };
        let doubled = unsafe { std::mem::zeroed::<EngineStructDoubleActionRaw>() };
        let tail = CubeTailRaw {
            _pad0: [0; 4],
            err_cube: 0.01,
            dice_rolled: [0; 3],
            _pad1: [0; 5],
            err_take: 0.02,
            rollout_index_d: -1,
            comp_choice_d: 0,
            analyze_c: 1,
            _pad2: [0; 4],
            err_beaver: 0.0,
            err_raccoon: 0.0,
            analyze_cr: 0,
            is_valid: 1,
            tutor_cube: 0,
            tutor_take: 0,
            _pad3: [0; 6],
            err_tutor_cube: 0.0,
            err_tutor_take: 0.0,
            flagged_double: 0,
            _pad4: [0; 3],
            comment_cube: -1,
            edited_cube: 1,
            time_delay_cube: 5,
            time_delay_cube_done: 7,
            _pad5: 0,
            number_of_auto_double_cube: 9,
            time_bot: 11,
            time_top: 13,
        };
        let mut bytes = packed_bytes::<_, 55>(base);
        bytes.extend(enc(&doubled));
        bytes.extend(packed_bytes::<_, 116>(tail));
        bytes
    }

    #[test]
    fn cube_tail_fields_gated_by_version_though_always_read() {
        let bytes = cube_bytes();

        let low = decode_cube(&mut Cursor::new(bytes.clone()), 10).unwrap();
        assert_eq!(low.edited_cube, None);
        assert_eq!(low.time_delay_cube, None);
        assert_eq!(low.number_of_auto_double_cube, None);
        assert_eq!(low.time_bot, None);

        let high = decode_cube(&mut Cursor::new(bytes), 28).unwrap();
        assert_eq!(high.edited_cube, Some(true));
        assert_eq!(high.time_delay_cube, Some(5));
        assert_eq!(high.number_of_auto_double_cube, Some(9));
        assert_eq!(high.time_bot, Some(11));
        assert_eq!(high.time_top, Some(13));
    }

    fn move_bytes(version: i32) -> Vec<u8> {
        let base = MoveBaseRaw {
            position_i: [0; 26],
            position_end: [0; 26],
            _pad: [0; 3],
            active_p: 1,
            moves: [0; 8],
            dice: [3, 5],
            cube_a: 1,
            error_m: 0.0,
            n_move_eval: 0,
        };
        let data_moves = unsafe { std::mem::zeroed::<EngineStructBestMoveRecordRaw>() };
        let tail = MoveTailRaw {
            played: 1,
            _pad: [0; 3],
            err_move: 0.0,
            err_luck: 0.0,
            comp_choice: 0,
            _pad2b: [0; 4],
            init_eq: 0.0,
            rollout_index_m: [0; 32],
            analyze_m: 1,
            analyze_l: 0,
            invalid_m: 0,
            position_tutor: [0; 26],
            tutor: 0,
            _pad2: [0; 1],
            err_tutor_move: 0.0,
            flagged: 0,
            _pad3: [0; 3],
            comment_move: -1,
        };

        let mut bytes = packed_bytes::<_, 115>(base);
        bytes.extend(enc(&data_moves));
        bytes.extend(packed_bytes::<_, 220>(tail));

        if version >= 24 {
            bytes.extend(enc(&MoveV24Raw { edited_move: 1 }));
        }
        if version >= 26 {
            bytes.extend(enc(&MoveV26Raw {
                _pad: [0; 3],
                time_delay_move: 2,
                time_delay_move_done: 4,
            }));
        }
        if version >= 27 {
            bytes.extend(enc(&MoveV27Raw {
                number_of_auto_double_move: 6,
            }));
        }
        bytes
    }

    #[test]
    fn move_decodes_version_gated_suffixes() {
        let bytes = move_bytes(0);
        let mut cursor = Cursor::new(bytes);
        let entry = decode_move(&mut cursor, 0).unwrap();
        assert_eq!(entry.edited_move, None);
        assert_eq!(entry.time_delay_move, None);
        assert_eq!(entry.number_of_auto_double_move, None);
        assert_eq!(cursor.position() as usize, cursor.get_ref().len());

        let bytes = move_bytes(27);
        let mut cursor = Cursor::new(bytes);
        let entry = decode_move(&mut cursor, 27).unwrap();
        assert_eq!(entry.edited_move, Some(true));
        assert_eq!(entry.time_delay_move, Some(2));
        assert_eq!(entry.time_delay_move_done, Some(4));
        assert_eq!(entry.number_of_auto_double_move, Some(6));
        assert_eq!(cursor.position() as usize, cursor.get_ref().len());
    }

    #[test]
    fn tag_from_byte_dispatch() {
        assert_eq!(RecordTag::from(0), RecordTag::HeaderMatch);
        assert_eq!(RecordTag::from(1), RecordTag::HeaderGame);
        assert_eq!(RecordTag::from(2), RecordTag::Cube);
        assert_eq!(RecordTag::from(3), RecordTag::Move);
        assert_eq!(RecordTag::from(4), RecordTag::FooterGame);
        assert_eq!(RecordTag::from(5), RecordTag::FooterMatch);
        assert_eq!(RecordTag::from(6), RecordTag::Missing);
        assert_eq!(RecordTag::from(7), RecordTag::Unimplemented);
        assert_eq!(RecordTag::from(0xEE), RecordTag::Unimplemented);
    }

    #[test]
    fn missing_and_footer_match_round_trip() {
        let raw = MissingRaw {
            _pad: [0; 7],
            err_luck: 0.25,
            winner: 1,
            points: 2,
        };
        let entry = decode_missing(&mut Cursor::new(packed_bytes::<_, 23>(raw))).unwrap();
        assert_eq!(entry.winner, 1);
        assert_eq!(entry.points, 2);

        let raw = FooterMatchRaw {
            _pad: [0; 3],
            score1: 7,
            score2: 5,
            winner: 1,
            elo1: 1500.0,
            elo2: 1480.0,
            exp1: 0,
            exp2: 0,
            date: 0.0,
        };
        let entry = decode_footer_match(&mut Cursor::new(packed_bytes::<_, 47>(raw))).unwrap();
        assert_eq!(entry.score1, 7);
        assert_eq!(entry.winner, 1);
    }
}
