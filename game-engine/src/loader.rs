//! Question loader (spec.md §4.4): expands a `QuizDocument` plus the
//! current roster into the ordered, fully-initialized `Question` list a
//! game runs through. This is the one place in the engine allowed to look
//! at the full roster up front — every handler afterwards only ever sees
//! the single question it owns.

use std::collections::{HashMap, HashSet};

use protocol::tunables::{WORD_CHAIN_BOMB_MAX_SECS, WORD_CHAIN_BOMB_MIN_SECS};
use protocol::QuestionType;
use rand::Rng;

use engine_core::dictionary::next_chain_letter;

use crate::collaborators::{QuestionDocument, QuizDocument, WordProvider};
use crate::question::{
    BlindMapClues, BlindMapQuestion, ChoiceQuestion, DrawingQuestion, GuessANumberQuestion,
    MathQuizQuestion, MathSequence, OpenAnswerQuestion, Question, QuestionKind, WordChainQuestion,
};
use crate::session::Session;

/// Expands `doc` into the live question list for `session`'s current
/// roster. `drawer_rotation` assigns one drawing question per player in
/// join order, cycling if there are more drawing questions than players.
pub fn load_questions(doc: &QuizDocument, session: &Session, words: &dyn WordProvider, rng_letter: impl Fn() -> char) -> Vec<Question> {
    let mut drawer_cursor = 0usize;
    let players: Vec<String> = {
        let mut names: Vec<String> = session.players.keys().cloned().collect();
        names.sort();
        names
    };
    // One shared bomb round length per session, drawn once here rather
    // than per question, so consecutive WORD_CHAIN questions keep ticking
    // down the same clock instead of each rolling its own.
    let bomb_duration_ms = random_bomb_duration_ms();

    doc.questions
        .iter()
        .map(|q| expand_one(q, session, &players, &mut drawer_cursor, words, &rng_letter, bomb_duration_ms))
        .collect()
}

fn random_bomb_duration_ms() -> u64 {
    let mut rng = rand::thread_rng();
    rng.gen_range(WORD_CHAIN_BOMB_MIN_SECS..=WORD_CHAIN_BOMB_MAX_SECS) * 1_000
}

fn expand_one(
    doc: &QuestionDocument,
    session: &Session,
    players: &[String],
    drawer_cursor: &mut usize,
    words: &dyn WordProvider,
    rng_letter: &impl Fn() -> char,
    bomb_duration_ms: u64,
) -> Question {
    let kind = match doc.question_type {
        QuestionType::Abcd => QuestionKind::Abcd(choice_from(doc)),
        QuestionType::TrueFalse => QuestionKind::TrueFalse(choice_from(doc)),
        QuestionType::OpenAnswer => QuestionKind::OpenAnswer(OpenAnswerQuestion {
            open_answer: doc.open_answer.clone().unwrap_or_default(),
            ..Default::default()
        }),
        QuestionType::GuessANumber => QuestionKind::GuessANumber(GuessANumberQuestion {
            number_answer: doc.number_answer.unwrap_or(0.0),
            ..Default::default()
        }),
        QuestionType::MathQuiz => QuestionKind::MathQuiz(MathQuizQuestion {
            sequences: doc
                .math_sequences
                .iter()
                .map(|(equation, answer, secs)| MathSequence {
                    equation: equation.clone(),
                    answer: *answer,
                    length_seconds: *secs,
                })
                .collect(),
            answered: vec![HashSet::new(); doc.math_sequences.len()],
            teams_scored: vec![HashSet::new(); doc.math_sequences.len()],
            sequence_start_ms: vec![0; doc.math_sequences.len()],
            ..Default::default()
        }),
        QuestionType::WordChain => QuestionKind::WordChain(word_chain_from(session, players, words, rng_letter, bomb_duration_ms)),
        QuestionType::Drawing => QuestionKind::Drawing(drawing_from(doc, session, players, drawer_cursor)),
        QuestionType::BlindMap => QuestionKind::BlindMap(blind_map_from(doc)),
    };

    Question {
        length_seconds: doc.length_seconds,
        category: doc.category.clone(),
        kind,
    }
}

fn choice_from(doc: &QuestionDocument) -> ChoiceQuestion {
    ChoiceQuestion {
        options: doc.options.clone(),
        answer: doc.correct_index.unwrap_or(0),
        answer_counts: vec![0; doc.options.len().max(1)],
        ..Default::default()
    }
}

fn word_chain_from(
    session: &Session,
    players: &[String],
    words: &dyn WordProvider,
    rng_letter: &impl Fn() -> char,
    bomb_duration_ms: u64,
) -> WordChainQuestion {
    let order: Vec<String> = if session.is_team_mode {
        let mut interleaved = Vec::new();
        let (blue, red) = (&session.blue_team, &session.red_team);
        for i in 0..blue.len().max(red.len()) {
            if let Some(p) = blue.get(i) {
                interleaved.push(p.clone());
            }
            if let Some(p) = red.get(i) {
                interleaved.push(p.clone());
            }
        }
        interleaved
    } else {
        players.to_vec()
    };

    let seed = words.random_seed_word();
    let letter = next_chain_letter(&seed, rng_letter);
    let current_player = order.first().cloned().unwrap_or_default();

    WordChainQuestion {
        first_word: Some(seed),
        current_letter: letter,
        player_order: order,
        current_player,
        bomb_duration_ms,
        ..Default::default()
    }
}

fn drawing_from(doc: &QuestionDocument, session: &Session, players: &[String], cursor: &mut usize) -> DrawingQuestion {
    let drawer = if players.is_empty() {
        String::new()
    } else {
        let name = players[*cursor % players.len()].clone();
        *cursor += 1;
        name
    };
    let team = session.team_of(&drawer);
    DrawingQuestion {
        drawer,
        team,
        words: doc.drawing_words.clone(),
        ..Default::default()
    }
}

fn blind_map_from(doc: &QuestionDocument) -> BlindMapQuestion {
    let (x, y) = doc.location.unwrap_or((0.0, 0.0));
    let clues = (!doc.clues.is_empty()).then(|| BlindMapClues {
        clue1: doc.clues.first().cloned(),
        clue2: doc.clues.get(1).cloned(),
        clue3: doc.clues.get(2).cloned(),
    });
    BlindMapQuestion {
        city_name: doc.city_name.clone().unwrap_or_default(),
        anagram: doc.anagram.clone().unwrap_or_default(),
        location_x: x,
        location_y: y,
        map_type: doc.map_type.clone().unwrap_or_default(),
        clues,
        locations: HashMap::new(),
        ..Default::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collaborators::QuestionDocument;

    struct FixedWords;
    impl WordProvider for FixedWords {
        fn dictionary_contents(&self) -> Option<String> {
            None
        }
        fn random_seed_word(&self) -> String {
            "pes".to_string()
        }
    }

    fn blank_doc(kind: QuestionType) -> QuestionDocument {
        QuestionDocument {
            question_type: kind,
            category: "general".into(),
            length_seconds: 15,
            options: vec!["a".into(), "b".into(), "c".into(), "d".into()],
            correct_index: Some(1),
            open_answer: Some("paris".into()),
            number_answer: Some(42.0),
            math_sequences: vec![("2+2".into(), 4.0, 5)],
            drawing_words: vec!["dog".into()],
            city_name: Some("Brno".into()),
            anagram: Some("onrb".into()),
            location: Some((0.5, 0.5)),
            map_type: Some("europe".into()),
            clues: vec!["clue1".into()],
        }
    }

    #[test]
    fn loader_assigns_drawers_round_robin() {
        let mut session = Session::new();
        session.add_player("alice".into());
        session.add_player("bob".into());
        let doc = QuizDocument {
            questions: vec![blank_doc(QuestionType::Drawing), blank_doc(QuestionType::Drawing), blank_doc(QuestionType::Drawing)],
        };
        let questions = load_questions(&doc, &session, &FixedWords, || 'z');
        let drawers: Vec<String> = questions
            .iter()
            .map(|q| match &q.kind {
                QuestionKind::Drawing(d) => d.drawer.clone(),
                _ => unreachable!(),
            })
            .collect();
        assert_eq!(drawers, vec!["alice", "bob", "alice"]);
    }

    #[test]
    fn word_chain_question_seeds_first_word_and_letter() {
        let mut session = Session::new();
        session.add_player("alice".into());
        let doc = QuizDocument {
            questions: vec![blank_doc(QuestionType::WordChain)],
        };
        let questions = load_questions(&doc, &session, &FixedWords, || 'z');
        match &questions[0].kind {
            QuestionKind::WordChain(w) => {
                assert_eq!(w.first_word.as_deref(), Some("pes"));
                assert_eq!(w.current_letter, 's');
                assert_eq!(w.current_player, "alice");
            }
            _ => unreachable!(),
        }
    }
}
