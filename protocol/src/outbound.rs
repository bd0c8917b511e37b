//! Server -> client events (spec.md §6). One variant per named event; each
//! carries a typed payload struct so handlers can't typo a field name the
//! way a loosely-typed `serde_json::Value` would let them.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

use crate::types::{BlindMapPhase, Team, TeamRole};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum OutboundEvent {
    PlayerJoined(PlayerJoined),
    PlayerNameChanged(PlayerNameChanged),
    PlayerLeft(PlayerLeft),
    ColorsUpdated(ColorsUpdated),

    GameStarted(GameStarted),
    GameStartedRemote(GameStarted),
    GameStartedMobile(GameStartedMobile),
    NextQuestion(Value),

    AnswerSubmitted(AnswerSubmitted),
    AnswerCorrectness(AnswerCorrectness),
    AllAnswersReceived(AllAnswersReceived),

    OpenAnswerSubmitted(OpenAnswerSubmitted),
    OpenAnswerLetterRevealed(LetterRevealed),
    OpenAnswerFeedback(Feedback),

    GuessFeedback(GuessFeedback),
    GuessSubmitted(Value),
    TeamGuessSubmitted(Value),
    TeamGuessesUpdate(Value),
    PhaseTransition(PhaseTransition),
    PlayerRoleUpdate(Value),
    SecondTeamVote(SecondTeamVote),

    MathFeedback(Feedback),
    MathQuizUpdate(MathQuizUpdate),
    MathSequenceChange(MathSequenceChange),
    FastForwardTimer(FastForwardTimer),

    WordChainUpdate(WordChainUpdate),
    WordChainFeedback(Feedback),
    WordChainResults(Value),

    DrawingUpdateBroadcast(Value),
    DrawingAnswerSubmitted(Value),
    DrawingAnswerFeedback(Feedback),
    WordSelected(WordSelected),
    DrawingLetterRevealed(LetterRevealed),
    DrawingWordResponse(Value),

    BlindMapFeedback(Feedback),
    BlindMapPhaseTransition(BlindMapPhaseTransition),
    BlindMapLocationSubmitted(Value),
    BlindMapAnagramSolved(Value),
    BlindMapClueRevealed(BlindMapClueRevealed),
    CaptainPreviewUpdate(CaptainPreviewUpdate),

    NavigateToFinalScore(Value),
    GameReset(ColorsUpdated),

    RemoteDisplayConnected(Value),
    IsRemoteConnected(Value),

    Error(ErrorPayload),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerJoined {
    pub player_name: String,
    pub color: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerNameChanged {
    pub old_name: String,
    pub new_name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerLeft {
    pub player_name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColorsUpdated {
    pub available_colors: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameStarted {
    pub is_team_mode: bool,
    pub question_start_ms: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameStartedMobile {
    pub team: Option<Team>,
    pub role: TeamRole,
    pub is_drawer: bool,
    pub quiz_phase: u8,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnswerSubmitted {
    pub answers_received: usize,
    pub answer_counts: [u32; 4],
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnswerCorrectness {
    pub correct: bool,
    pub points_earned: i64,
    pub total_points: i64,
    pub is_team_score: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AllAnswersReceived {
    pub scores: Value,
    pub correct_answer: Value,
    pub answer_counts: Option<[u32; 4]>,
    pub show_question_preview_at: i64,
    pub show_buttons_at: i64,
    #[serde(flatten)]
    pub extra: HashMap<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OpenAnswerSubmitted {
    pub player_count: usize,
    pub correct_count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LetterRevealed {
    pub revealed_positions: Vec<usize>,
    pub mask: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Feedback {
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GuessFeedback {
    pub placement: usize,
    pub accuracy_label: String,
    pub guess: Option<f64>,
    pub correct_answer: f64,
    pub points_earned: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhaseTransition {
    pub phase: String,
    pub starts_at: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SecondTeamVote {
    pub team: Team,
    pub more_votes: usize,
    pub less_votes: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MathQuizUpdate {
    pub has_answered: HashMap<String, bool>,
    pub is_eliminated: HashMap<String, bool>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MathSequenceChange {
    pub sequence_index: usize,
    pub equation: String,
    pub length_seconds: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FastForwardTimer {
    pub remaining_ms: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WordChainUpdate {
    pub chain: Vec<String>,
    pub current_letter: String,
    pub current_player: String,
    pub eliminated: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WordSelected {
    pub masked_word: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BlindMapPhaseTransition {
    pub phase: BlindMapPhase,
    pub active_team: Option<Team>,
    pub starts_at: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BlindMapClueRevealed {
    pub clue_index: usize,
    pub clue: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CaptainPreviewUpdate {
    pub team: Team,
    pub x: f64,
    pub y: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorPayload {
    pub error: String,
}
