//! Polymorphic question record (spec.md §3, §9).
//!
//! One variant per question type; the shared dispatcher (`dispatcher.rs`)
//! matches on the tag and hands the live `Question` to the matching
//! handler module. Each variant mixes the fields loaded from the quiz
//! document with the runtime fields the engine mutates in place while the
//! question is live (answer tallies, eliminated players, selected words,
//! ...) — the spec treats a loaded question as immutable except for those
//! engine-written fields, so there is no separate "state" struct to keep in
//! sync.

use std::collections::{HashMap, HashSet};
use std::time::Duration;

use protocol::{BlindMapPhase, GuessPhase, RadiusPreset, Team};

#[derive(Debug, Clone)]
pub struct Question {
    pub length_seconds: u32,
    pub category: String,
    pub kind: QuestionKind,
}

impl Question {
    pub fn length_ms(&self) -> u64 {
        Duration::from_secs(self.length_seconds as u64).as_millis() as u64
    }
}

#[derive(Debug, Clone)]
pub enum QuestionKind {
    Abcd(ChoiceQuestion),
    TrueFalse(ChoiceQuestion),
    OpenAnswer(OpenAnswerQuestion),
    GuessANumber(GuessANumberQuestion),
    MathQuiz(MathQuizQuestion),
    WordChain(WordChainQuestion),
    Drawing(DrawingQuestion),
    BlindMap(BlindMapQuestion),
}

impl QuestionKind {
    pub fn is_word_chain(&self) -> bool {
        matches!(self, QuestionKind::WordChain(_))
    }
}

/// ABCD and TRUE_FALSE share one representation: TRUE_FALSE just loads with
/// `options.len() == 2`.
#[derive(Debug, Clone, Default)]
pub struct ChoiceQuestion {
    pub options: Vec<String>,
    pub answer: usize,

    // Runtime.
    pub answers_received: usize,
    pub answer_counts: Vec<u32>,
    /// Players (free-for-all) or teams (team mode) that already answered.
    pub answered: HashSet<String>,
    pub completed: bool,
}

#[derive(Debug, Clone, Default)]
pub struct OpenAnswerQuestion {
    pub open_answer: String,

    // Runtime.
    pub correct_players: HashSet<String>,
    pub revealed_positions: HashSet<usize>,
    pub correct_count: usize,
    pub player_answers: Vec<PlayerAnswer>,
    pub completed: bool,
}

#[derive(Debug, Clone)]
pub struct PlayerAnswer {
    pub player_name: String,
    pub answer: String,
    pub is_correct: bool,
    pub player_color: String,
}

#[derive(Debug, Clone, Default)]
pub struct GuessANumberQuestion {
    pub number_answer: f64,

    // Runtime, free-for-all.
    pub guesses: HashMap<String, f64>,

    // Runtime, team mode. Teams take their captain-guess/vote cycle one at
    // a time; `active_team` tracks whose turn it is, `team_results` the
    // locked-in answer each team has already produced.
    pub phase: Option<GuessPhase>,
    pub active_team: Option<Team>,
    pub captain_guess: Option<f64>,
    pub votes: HashMap<String, bool>,
    pub team_results: HashMap<Team, f64>,
    pub completed: bool,
}

#[derive(Debug, Clone)]
pub struct MathSequence {
    pub equation: String,
    pub answer: f64,
    pub length_seconds: u32,
}

#[derive(Debug, Clone, Default)]
pub struct MathQuizQuestion {
    pub sequences: Vec<MathSequence>,

    // Runtime.
    pub current_sequence: usize,
    pub eliminated_players: HashSet<String>,
    /// answered[sequence_index] = set of players who already locked an answer this sequence.
    pub answered: Vec<HashSet<String>>,
    pub teams_scored: Vec<HashSet<Team>>,
    pub sequence_start_ms: Vec<i64>,
    pub math_quiz_points: HashMap<String, i64>,
    pub completed: bool,
}

#[derive(Debug, Clone, Default)]
pub struct WordChainQuestion {
    pub first_word: Option<String>,

    // Runtime.
    pub current_letter: char,
    pub used_words: HashSet<String>,
    pub word_chain: Vec<ChainEntry>,
    pub player_order: Vec<String>,
    pub team_indexes: HashMap<Team, usize>,
    pub current_player: String,
    pub eliminated_players: HashSet<String>,
    pub previous_players: Vec<String>,
    pub next_players: Vec<String>,
    pub game_points: HashMap<String, i64>,
    pub bomb_duration_ms: u64,
    pub completed: bool,
}

#[derive(Debug, Clone)]
pub struct ChainEntry {
    pub word: String,
    pub player: String,
    pub team: Option<Team>,
}

#[derive(Debug, Clone, Default)]
pub struct DrawingQuestion {
    pub drawer: String,
    pub team: Option<Team>,
    pub words: Vec<String>,

    // Runtime.
    pub selected_word: Option<String>,
    pub is_late_selection: bool,
    pub revealed_positions: HashSet<usize>,
    pub correct_guessers: HashSet<String>,
    pub drawing_stats: Vec<PlayerAnswer>,
    pub drawer_points_earned: i64,
    pub completed: bool,
}

#[derive(Debug, Clone)]
pub struct BlindMapClues {
    pub clue1: Option<String>,
    pub clue2: Option<String>,
    pub clue3: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct BlindMapQuestion {
    pub city_name: String,
    pub anagram: String,
    pub location_x: f64,
    pub location_y: f64,
    pub map_type: String,
    pub radius_preset: Option<RadiusPreset>,
    pub clues: Option<BlindMapClues>,

    // Runtime.
    pub phase: Option<BlindMapPhase>,
    pub solved_order: Vec<String>,
    pub active_team: Option<Team>,
    pub locations: HashMap<String, (f64, f64)>,
    pub captain_submissions: HashMap<Team, (f64, f64)>,
    pub revealed_clue_index: usize,
    pub completed: bool,
}
