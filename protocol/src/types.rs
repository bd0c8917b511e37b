//! Shared vocabulary types used by both inbound and outbound events and by
//! the engine's internal state.

use serde::{Deserialize, Serialize};

/// One of the two teams in team mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Team {
    Blue,
    Red,
}

impl Team {
    pub fn other(self) -> Team {
        match self {
            Team::Blue => Team::Red,
            Team::Red => Team::Blue,
        }
    }
}

impl std::fmt::Display for Team {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Team::Blue => write!(f, "blue"),
            Team::Red => write!(f, "red"),
        }
    }
}

/// A player's standing relative to their team for `game_started_mobile`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TeamRole {
    Captain,
    Player,
}

/// The tag discriminating the eight question-type protocols.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum QuestionType {
    Abcd,
    TrueFalse,
    OpenAnswer,
    GuessANumber,
    MathQuiz,
    WordChain,
    Drawing,
    BlindMap,
}

/// Blind-map exact-radius preset, normalized-coordinate units.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RadiusPreset {
    Easy,
    Hard,
}

impl RadiusPreset {
    pub fn exact_radius(self) -> f64 {
        match self {
            RadiusPreset::Easy => 0.045,
            RadiusPreset::Hard => 0.03,
        }
    }
}

impl Default for RadiusPreset {
    fn default() -> Self {
        RadiusPreset::Hard
    }
}

/// The sub-phase of a blind-map question.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BlindMapPhase {
    Anagram,
    Locate,
    /// Team mode only: the second team's turn to locate after the first missed.
    SecondLocate,
}

/// The sub-phase of a team-mode guess-a-number question.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GuessPhase {
    CaptainGuess,
    Vote,
}

/// A room addressing target for the message bus.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RoomTarget {
    Player(String),
    Team(Team),
    All,
}
