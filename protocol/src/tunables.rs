//! Process-wide tunables. Kept as `pub const` items the way the teacher
//! keeps its protocol byte tags in `protocol/src/lib.rs`, rather than a
//! loaded config file — these are invariants of the *protocol*, not runtime
//! configuration.

/// The 15-color palette players are assigned from
/// (`original_source/flask-server/app/constants.py::AVAILABLE_COLORS`).
pub const COLOR_PALETTE: [&str; 15] = [
    "#f44336", "#e91e63", "#43a047", "#00796b", "#2196f3", "#3f51b5", "#827717", "#607d8b",
    "#0097a7", "#ef6c00", "#9c27b0", "#4a148c", "#33691e", "#795548", "#616161",
];

pub const MAX_PLAYERS: usize = 10;
pub const MIN_PLAYERS_TO_START: usize = 2;
pub const MIN_PLAYERS_PER_TEAM_TO_START: usize = 2;
pub const NAME_MIN_LEN: usize = 3;
pub const NAME_MAX_LEN: usize = 16;

// Timing constants, milliseconds.
pub const START_GAME_TIME_MS: u64 = 2_000;
pub const PREVIEW_TIME_MS: u64 = 5_000;
pub const PREVIEW_TIME_DRAWING_MS: u64 = 8_000;
pub const WAITING_TIME_MS: u64 = 17_000;
pub const WAITING_TIME_DRAWING_MS: u64 = 20_000;
pub const PHASE_TRANSITION_TIME_MS: u64 = 5_000;

// Scoring constants.
pub const POINTS_FOR_CORRECT_ANSWER: i64 = 100;
pub const POINTS_FOR_WORD_CHAIN: i64 = 50;
pub const POINTS_FOR_MATH_CORRECT_ANSWER: f64 = 75.0;
pub const POINTS_FOR_LETTER: i64 = 3;
pub const POINTS_FOR_SURVIVING_BOMB: i64 = 200;
pub const POINTS_FOR_CORRECT_ANSWER_GUESS_A_NUMBER: i64 = 150;
pub const POINTS_FOR_CORRECT_ANSWER_GUESS_A_NUMBER_FIRST_PHASE: i64 = 300;
pub const POINTS_FOR_EXACT_ANSWER: i64 = 200;
pub const POINTS_FOR_PLACEMENT: i64 = 100;
pub const ANAGRAM_PHASE_POINTS: i64 = 100;
pub const MAP_PHASE_POINTS: i64 = 100;
pub const BLIND_MAP_TEAM_MODE_POINTS: i64 = 200;
pub const DRAWER_COMPLETION_BONUS: i64 = 50;

// Word-chain constants.
pub const WORD_CHAIN_MIN_WORD_LEN: usize = 3;
pub const WORD_CHAIN_BOMB_MIN_SECS: u64 = 120;
pub const WORD_CHAIN_BOMB_MAX_SECS: u64 = 240;
