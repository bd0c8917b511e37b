//! Flow controller (spec.md §4.3): advances a game from the lobby through
//! every question's preview/live/results cycle up to the final score.
//! Mirrors the shape of `original_source/flask-server/app/socketio_events/
//! utils.py`'s `show_question_preview_at`/`show_buttons_at` timing
//! calculation, generalized here into explicit named phases the dispatcher
//! drives with the engine's own `Clock` instead of client-side `setTimeout`.

use engine_core::clock::now_ms;
use protocol::outbound::{ColorsUpdated, GameStarted};
use protocol::tunables::{
    PHASE_TRANSITION_TIME_MS, PREVIEW_TIME_DRAWING_MS, PREVIEW_TIME_MS, START_GAME_TIME_MS,
};
use protocol::{OutboundEvent, QuestionType, Team};
use serde_json::json;

use crate::collaborators::{QuizStore, WordProvider};
use crate::error::EngineError;
use crate::loader;
use crate::question::QuestionKind;
use crate::session::Session;
use crate::timers;
use crate::Command;

fn question_type_of(kind: &QuestionKind) -> QuestionType {
    match kind {
        QuestionKind::Abcd(_) => QuestionType::Abcd,
        QuestionKind::TrueFalse(_) => QuestionType::TrueFalse,
        QuestionKind::OpenAnswer(_) => QuestionType::OpenAnswer,
        QuestionKind::GuessANumber(_) => QuestionType::GuessANumber,
        QuestionKind::MathQuiz(_) => QuestionType::MathQuiz,
        QuestionKind::WordChain(_) => QuestionType::WordChain,
        QuestionKind::Drawing(_) => QuestionType::Drawing,
        QuestionKind::BlindMap(_) => QuestionType::BlindMap,
    }
}

/// Loads the quiz, locks the lobby, and schedules the first question's
/// preview after `START_GAME_TIME_MS`.
pub fn start_game(
    session: &mut Session,
    quiz_id: &str,
    quiz_store: &dyn QuizStore,
    words: &dyn WordProvider,
    rng_letter: impl Fn() -> char,
) -> Result<Vec<Command>, EngineError> {
    if session.is_game_running {
        return Err(EngineError::GameInProgress);
    }
    let doc = quiz_store.load_quiz(quiz_id)?;
    session.questions = loader::load_questions(&doc, session, words, rng_letter);
    session.current_index = None;
    session.is_game_running = true;
    session.is_quiz_active = true;

    let question_start_ms = now_ms() + START_GAME_TIME_MS as i64;
    Ok(vec![
        Command::emit_all(OutboundEvent::GameStarted(GameStarted {
            is_team_mode: session.is_team_mode,
            question_start_ms,
        })),
        Command::ArmTimer {
            id: timers::START_GAME,
            delay_ms: START_GAME_TIME_MS,
        },
    ])
}

/// Moves to the next question (or ends the game), emitting its preview and
/// arming the preview timer. Called when the start-game timer or the
/// previous question's phase-transition timer fires.
pub fn advance(session: &mut Session) -> Vec<Command> {
    let next_index = match session.current_index {
        None => 0,
        Some(i) => i + 1,
    };

    if next_index >= session.questions.len() {
        return show_final_score(session);
    }

    session.current_index = Some(next_index);
    apply_question_transition(session, next_index);
    let question = &session.questions[next_index];
    let question_type = question_type_of(&question.kind);
    let preview_ms = if matches!(question_type, QuestionType::Drawing) {
        PREVIEW_TIME_DRAWING_MS
    } else {
        PREVIEW_TIME_MS
    };

    let payload = json!({
        "index": next_index,
        "total": session.questions.len(),
        "category": question.category,
        "question_type": question_type,
        "length_seconds": question.length_seconds,
        "preview_ms": preview_ms,
    });

    vec![
        Command::emit_all(OutboundEvent::NextQuestion(payload)),
        Command::ArmTimer {
            id: timers::PREVIEW,
            delay_ms: preview_ms,
        },
    ]
}

/// Carries state forward across a question transition for the three types
/// that need continuity with what came before: consecutive WORD_CHAIN
/// questions keep their turn order instead of restarting it, team-mode
/// GUESS_A_NUMBER alternates which team goes first, and DRAWING picks up
/// the scheduled drawer's current team (in case it changed since the quiz
/// was loaded).
fn apply_question_transition(session: &mut Session, next_index: usize) {
    let is_team_mode = session.is_team_mode;

    let drawer_team = match &session.questions[next_index].kind {
        QuestionKind::Drawing(q) => Some(session.team_of(&q.drawer)),
        _ => None,
    };

    let prev_word_chain = match next_index.checked_sub(1).map(|i| &session.questions[i].kind) {
        Some(QuestionKind::WordChain(prev)) => Some((prev.player_order.clone(), prev.team_indexes.clone(), prev.current_player.clone())),
        _ => None,
    };

    let prev_active_team = is_team_mode.then(|| {
        session.questions[..next_index].iter().rev().find_map(|p| match &p.kind {
            QuestionKind::GuessANumber(prev_q) => Some(prev_q.active_team.unwrap_or(Team::Blue)),
            _ => None,
        })
    }).flatten();

    match &mut session.questions[next_index].kind {
        QuestionKind::WordChain(q) => {
            if let Some((order, indexes, current_player)) = prev_word_chain {
                q.player_order = order;
                q.team_indexes = indexes;
                q.current_player = current_player;
            }
        }
        QuestionKind::GuessANumber(q) => {
            if let Some(prev_team) = prev_active_team {
                q.active_team = Some(prev_team.other());
            }
        }
        QuestionKind::Drawing(q) => {
            q.team = drawer_team.flatten();
        }
        _ => {}
    }
}

/// Starts the live phase for the current question: records
/// `question_start_ms`. Arming the primary timer is left to the owning
/// handler's `initialize` (dispatched right after this call), since a
/// couple of question types need a timer other than the flat
/// `length_seconds` countdown (math-quiz arms per-sequence timers instead).
pub fn begin_live_phase(session: &mut Session) -> Vec<Command> {
    session.question_start_ms = Some(now_ms());
    Vec::new()
}

/// Ends the current question's answer window and schedules the next
/// question after the phase-transition delay. The per-type "all answers
/// received" summary is emitted by the owning handler's `on_time_up`, not
/// here — this only owns the flow-level transition.
pub fn time_up(_session: &mut Session) -> Vec<Command> {
    vec![Command::ArmTimer {
        id: timers::ADVANCE_DELAY,
        delay_ms: PHASE_TRANSITION_TIME_MS,
    }]
}

pub fn show_final_score(session: &mut Session) -> Vec<Command> {
    session.is_game_running = false;
    let scores = json!({
        "players": session.players.iter().map(|(name, p)| (name.clone(), p.score)).collect::<std::collections::HashMap<_, _>>(),
        "blue_team": session.team_scores.blue,
        "red_team": session.team_scores.red,
        "is_team_mode": session.is_team_mode,
    });
    vec![Command::emit_all(OutboundEvent::NavigateToFinalScore(scores))]
}

pub fn reset(session: &mut Session) -> Vec<Command> {
    session.reset();
    vec![Command::emit_all(OutboundEvent::GameReset(ColorsUpdated {
        available_colors: session.available_colors.clone(),
    }))]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collaborators::{QuestionDocument, QuizDocument};

    struct OneQuestionStore;
    impl QuizStore for OneQuestionStore {
        fn load_quiz(&self, _quiz_id: &str) -> Result<QuizDocument, EngineError> {
            Ok(QuizDocument {
                questions: vec![QuestionDocument {
                    question_type: QuestionType::Abcd,
                    category: "general".into(),
                    length_seconds: 10,
                    options: vec!["a".into(), "b".into(), "c".into(), "d".into()],
                    correct_index: Some(0),
                    open_answer: None,
                    number_answer: None,
                    math_sequences: vec![],
                    drawing_words: vec![],
                    city_name: None,
                    anagram: None,
                    location: None,
                    map_type: None,
                    clues: vec![],
                }],
            })
        }
    }

    struct NoWords;
    impl WordProvider for NoWords {
        fn dictionary_contents(&self) -> Option<String> {
            None
        }
        fn random_seed_word(&self) -> String {
            "pes".into()
        }
    }

    #[test]
    fn start_game_locks_the_lobby_and_loads_questions() {
        let mut session = Session::new();
        session.add_player("alice".into());
        let commands = start_game(&mut session, "quiz1", &OneQuestionStore, &NoWords, || 'z').unwrap();
        assert!(session.is_game_running);
        assert_eq!(session.questions.len(), 1);
        assert_eq!(commands.len(), 2);
    }

    #[test]
    fn start_game_rejects_a_running_game() {
        let mut session = Session::new();
        session.is_game_running = true;
        assert_eq!(
            start_game(&mut session, "quiz1", &OneQuestionStore, &NoWords, || 'z'),
            Err(EngineError::GameInProgress)
        );
    }

    #[test]
    fn advance_past_the_last_question_shows_final_score() {
        let mut session = Session::new();
        session.add_player("alice".into());
        start_game(&mut session, "quiz1", &OneQuestionStore, &NoWords, || 'z').unwrap();
        advance(&mut session);
        assert!(session.is_game_running);
        advance(&mut session);
        assert!(!session.is_game_running);
    }
}
