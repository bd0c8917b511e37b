//! External collaborator traits (spec.md §6).
//!
//! The teacher's games read static level data inline; this server loads a
//! quiz document and a word dictionary from outside the dispatcher, so the
//! loader and word-chain handler depend on traits rather than concrete
//! file I/O — the same seam `backbone-lib`'s `SerializationCap` marker
//! trait draws between the transport and the bytes it carries, generalized
//! here to "the engine never assumes how its data gets fetched", which
//! keeps `game-engine` testable with deterministic in-memory doubles.

use crate::error::EngineError;

/// A single question as loaded from storage, before the loader expands it
/// into a live `Question` (see `loader.rs`).
#[derive(Debug, Clone)]
pub struct QuestionDocument {
    pub question_type: protocol::QuestionType,
    pub category: String,
    pub length_seconds: u32,
    pub options: Vec<String>,
    pub correct_index: Option<usize>,
    pub open_answer: Option<String>,
    pub number_answer: Option<f64>,
    pub math_sequences: Vec<(String, f64, u32)>,
    pub drawing_words: Vec<String>,
    pub city_name: Option<String>,
    pub anagram: Option<String>,
    pub location: Option<(f64, f64)>,
    pub map_type: Option<String>,
    pub clues: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct QuizDocument {
    pub questions: Vec<QuestionDocument>,
}

/// Source of quiz documents. The production implementation reads a JSON
/// asset bundled with the server; tests use an in-memory fixture.
pub trait QuizStore: Send + Sync {
    fn load_quiz(&self, quiz_id: &str) -> Result<QuizDocument, EngineError>;
}

/// Source of word-chain dictionary contents and random seed words, kept
/// separate from `QuizStore` since it is sourced from a different asset
/// (spec.md §4.8) and mocked independently in handler tests.
pub trait WordProvider: Send + Sync {
    fn dictionary_contents(&self) -> Option<String>;
    fn random_seed_word(&self) -> String;
}
