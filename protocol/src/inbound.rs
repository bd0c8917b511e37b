//! Client -> server events (spec.md §6). Deserializes directly from the
//! `{"event": "...", "data": {...}}` wire shape via serde's internally
//! tagged representation.

use serde::{Deserialize, Serialize};

use crate::types::Team;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum InboundEvent {
    JoinRoom {
        player_name: String,
    },
    PlayerNameChanged {
        old_name: String,
        new_name: String,
    },
    PlayerLeaving {
        player_name: String,
    },
    RemoteDisplayConnected,
    IsRemoteConnected,

    SubmitAnswer {
        player_name: String,
        answer: usize,
        answer_time: i64,
    },

    SubmitOpenAnswer {
        player_name: String,
        answer: String,
        answer_time: i64,
    },
    RevealOpenAnswerLetter,

    SubmitNumberGuess {
        player_name: String,
        value: f64,
    },
    SubmitCaptainChoice {
        player_name: String,
        team: Team,
        final_answer: f64,
    },
    SubmitMoreLessVote {
        player_name: String,
        team: Team,
        vote: bool,
    },

    SubmitMathAnswer {
        player_name: String,
        answer: String,
        answer_time: i64,
    },
    MathSequenceCompleted {
        current_index: usize,
        next_index: usize,
    },

    SubmitWordChainWord {
        player_name: String,
        word: String,
    },
    WordChainTimeout {
        player: String,
    },
    StartWordChain,

    SelectDrawingWord {
        player_name: String,
        selected_word: String,
        is_late_selection: bool,
    },
    DrawingUpdate {
        player_name: String,
        drawing_data: serde_json::Value,
        action: String,
    },
    SubmitDrawingAnswer {
        player_name: String,
        answer: String,
        answer_time: i64,
    },
    RevealDrawingLetter,
    GetCurrentDrawingWord,

    SubmitBlindMapAnagram {
        player_name: String,
        answer: String,
    },
    SubmitBlindMapLocation {
        player_name: String,
        x: f64,
        y: f64,
        question_id: String,
    },
    CaptainLocationPreview {
        team: Team,
        x: f64,
        y: f64,
    },
    RequestNextClue {
        clue_index: usize,
    },

    TimeUp,
    ShowFinalScore,
}
