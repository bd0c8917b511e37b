//! File-backed `QuizStore`/`WordProvider` (spec.md §6). A thin adapter over
//! bundled JSON/text assets, same texture as the teacher's
//! `lobby::reload_config` reading `GameConfig.json` — there is no real
//! database or HTTP service behind this, just files shipped alongside the
//! server binary.

use std::collections::HashMap;
use std::sync::Arc;

use serde::Deserialize;

use game_engine::collaborators::{QuestionDocument, QuizDocument, QuizStore, WordProvider};
use game_engine::error::EngineError;

/// On-disk shape of one question; deserialized once at startup and mapped
/// into the engine's own `QuestionDocument`.
#[derive(Deserialize)]
struct QuestionEntry {
    question_type: protocol::QuestionType,
    category: String,
    length_seconds: u32,
    #[serde(default)]
    options: Vec<String>,
    #[serde(default)]
    correct_index: Option<usize>,
    #[serde(default)]
    open_answer: Option<String>,
    #[serde(default)]
    number_answer: Option<f64>,
    #[serde(default)]
    math_sequences: Vec<(String, f64, u32)>,
    #[serde(default)]
    drawing_words: Vec<String>,
    #[serde(default)]
    city_name: Option<String>,
    #[serde(default)]
    anagram: Option<String>,
    #[serde(default)]
    location: Option<(f64, f64)>,
    #[serde(default)]
    map_type: Option<String>,
    #[serde(default)]
    clues: Vec<String>,
}

impl From<QuestionEntry> for QuestionDocument {
    fn from(entry: QuestionEntry) -> Self {
        QuestionDocument {
            question_type: entry.question_type,
            category: entry.category,
            length_seconds: entry.length_seconds,
            options: entry.options,
            correct_index: entry.correct_index,
            open_answer: entry.open_answer,
            number_answer: entry.number_answer,
            math_sequences: entry.math_sequences,
            drawing_words: entry.drawing_words,
            city_name: entry.city_name,
            anagram: entry.anagram,
            location: entry.location,
            map_type: entry.map_type,
            clues: entry.clues,
        }
    }
}

#[derive(Deserialize)]
struct QuizEntry {
    questions: Vec<QuestionEntry>,
}

/// Reads every `quizzes/*.json` file up front and serves them from memory,
/// the same "load once, reload on demand" shape as the teacher's
/// `AppState::configs`, minus the hot-reload endpoint since a running game
/// can't swap its quiz mid-session anyway.
pub struct FileQuizStore {
    quizzes: HashMap<String, QuizDocument>,
}

impl FileQuizStore {
    /// Loads every `<dir>/<quiz_id>.json` file found under `dir`. Missing or
    /// unparseable files are logged and skipped rather than failing
    /// startup — a broken quiz file shouldn't take the whole server down
    /// before any game has even started.
    pub fn load_dir(dir: &str) -> Self {
        let mut quizzes = HashMap::new();
        let entries = match std::fs::read_dir(dir) {
            Ok(entries) => entries,
            Err(err) => {
                tracing::warn!(?err, dir, "quiz directory unreadable, starting with no quizzes loaded");
                return FileQuizStore { quizzes };
            }
        };

        for entry in entries.flatten() {
            let path = entry.path();
            if path.extension().and_then(|ext| ext.to_str()) != Some("json") {
                continue;
            }
            let Some(quiz_id) = path.file_stem().and_then(|stem| stem.to_str()) else {
                continue;
            };
            match std::fs::read_to_string(&path).and_then(|contents| {
                serde_json::from_str::<QuizEntry>(&contents).map_err(std::io::Error::from)
            }) {
                Ok(entry) => {
                    let questions = entry.questions.into_iter().map(QuestionDocument::from).collect();
                    quizzes.insert(quiz_id.to_string(), QuizDocument { questions });
                }
                Err(err) => tracing::warn!(?err, quiz_id, "failed to load quiz file, skipping"),
            }
        }
        FileQuizStore { quizzes }
    }
}

impl QuizStore for FileQuizStore {
    fn load_quiz(&self, quiz_id: &str) -> Result<QuizDocument, EngineError> {
        self.quizzes.get(quiz_id).cloned().ok_or_else(|| EngineError::NotFound(quiz_id.to_string()))
    }
}

/// Reads a Hunspell-style word list for the word-chain dictionary and the
/// random seed word draw. Falls back to a tiny builtin list rather than an
/// empty one, so a missing asset degrades to "chain starts from a fixed
/// word" instead of panicking.
pub struct FileWordProvider {
    contents: Option<String>,
    seed_words: Vec<String>,
}

const FALLBACK_SEED_WORDS: &[&str] = &["slovo", "kocka", "pes"];

impl FileWordProvider {
    pub fn load(path: &str) -> Self {
        match std::fs::read_to_string(path) {
            Ok(contents) => {
                let seed_words: Vec<String> = contents
                    .lines()
                    .filter_map(|line| {
                        let word = line.trim().split('/').next().unwrap_or("").to_lowercase();
                        (!word.is_empty()).then_some(word)
                    })
                    .collect();
                if seed_words.is_empty() {
                    FileWordProvider { contents: Some(contents), seed_words: fallback_seed_words() }
                } else {
                    FileWordProvider { contents: Some(contents), seed_words }
                }
            }
            Err(err) => {
                tracing::warn!(?err, path, "dictionary asset missing, word-chain will run in permissive mode");
                FileWordProvider { contents: None, seed_words: fallback_seed_words() }
            }
        }
    }
}

fn fallback_seed_words() -> Vec<String> {
    FALLBACK_SEED_WORDS.iter().map(|w| w.to_string()).collect()
}

impl WordProvider for FileWordProvider {
    fn dictionary_contents(&self) -> Option<String> {
        self.contents.clone()
    }

    fn random_seed_word(&self) -> String {
        use rand::seq::SliceRandom;
        let mut rng = rand::thread_rng();
        self.seed_words.choose(&mut rng).cloned().unwrap_or_else(|| "slovo".to_string())
    }
}

pub fn build_collaborators(quizzes_dir: &str, dictionary_path: &str) -> (Arc<dyn QuizStore>, Arc<dyn WordProvider>) {
    (Arc::new(FileQuizStore::load_dir(quizzes_dir)), Arc::new(FileWordProvider::load(dictionary_path)))
}
