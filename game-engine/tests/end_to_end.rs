//! Literal end-to-end scenarios (spec.md §8), driven through `Dispatcher`
//! the same way a real connection would: join, start, let the preview
//! timer fire, submit answers, let the primary timer fire.

use std::sync::Arc;

use engine_core::dictionary::Dictionary;
use game_engine::collaborators::{QuestionDocument, QuizDocument, QuizStore, WordProvider};
use game_engine::dispatcher::Dispatcher;
use game_engine::error::EngineError;
use game_engine::question::QuestionKind;
use game_engine::timers;
use game_engine::Command;
use protocol::{InboundEvent, QuestionType, RoomTarget, Team};

struct OneQuestionQuiz(QuestionDocument);

impl QuizStore for OneQuestionQuiz {
    fn load_quiz(&self, _quiz_id: &str) -> Result<QuizDocument, EngineError> {
        Ok(QuizDocument { questions: vec![self.0.clone()] })
    }
}

struct FixedWords(&'static str);

impl WordProvider for FixedWords {
    fn dictionary_contents(&self) -> Option<String> {
        None
    }
    fn random_seed_word(&self) -> String {
        self.0.to_string()
    }
}

fn blank_doc(kind: QuestionType) -> QuestionDocument {
    QuestionDocument {
        question_type: kind,
        category: "general".into(),
        length_seconds: 10,
        options: vec!["a".into(), "b".into(), "c".into(), "d".into()],
        correct_index: Some(2),
        open_answer: None,
        number_answer: Some(42.0),
        math_sequences: vec![],
        drawing_words: vec![],
        city_name: None,
        anagram: None,
        location: Some((0.5, 0.5)),
        map_type: None,
        clues: vec![],
    }
}

fn new_dispatcher(doc: QuestionDocument) -> Dispatcher {
    Dispatcher::new(Arc::new(Dictionary::permissive()), Arc::new(OneQuestionQuiz(doc)), Arc::new(FixedWords("pes")))
}

fn run_to_live_question(dispatcher: &mut Dispatcher, quiz_id: &str) {
    dispatcher.start_game(quiz_id);
    dispatcher.handle_timer(timers::START_GAME);
    dispatcher.handle_timer(timers::PREVIEW);
}

/// Scenario 1: ABCD speed bonus in team mode. A (blue) answers correctly
/// with 2s elapsed out of 10s; B (red) answers wrong. Blue's team total
/// gains the speed-weighted bonus, red gains nothing.
#[test]
fn abcd_speed_scenario_awards_the_faster_correct_team() {
    let mut dispatcher = new_dispatcher(blank_doc(QuestionType::Abcd));
    dispatcher.handle_inbound(InboundEvent::JoinRoom { player_name: "alice".into() });
    dispatcher.handle_inbound(InboundEvent::JoinRoom { player_name: "bob".into() });
    dispatcher.session.is_team_mode = true;
    dispatcher.session.blue_team.push("alice".into());
    dispatcher.session.red_team.push("bob".into());
    dispatcher.session.players.get_mut("alice").unwrap().team = Some(Team::Blue);
    dispatcher.session.players.get_mut("bob").unwrap().team = Some(Team::Red);

    run_to_live_question(&mut dispatcher, "quiz1");
    let start = dispatcher.session.question_start_ms.unwrap();

    dispatcher.handle_inbound(InboundEvent::SubmitAnswer { player_name: "alice".into(), answer: 2, answer_time: start + 2_000 });
    dispatcher.handle_inbound(InboundEvent::SubmitAnswer { player_name: "bob".into(), answer: 0, answer_time: start + 3_000 });

    assert!(dispatcher.session.team_scores.get(Team::Blue) > 0);
    assert_eq!(dispatcher.session.team_scores.get(Team::Red), 0);

    // Both players answered; the primary timer was fast-forwarded to zero
    // rather than waiting out the full question length.
    dispatcher.handle_timer(timers::PRIMARY);
    assert!(dispatcher.session.is_game_running, "still in the phase-transition delay, not yet fully advanced");
}

/// Scenario 3: guess-a-number Phase-1 exact match ends the round
/// immediately for the guessing team, independent of the other team.
#[test]
fn guess_a_number_exact_match_locks_in_the_team_instantly() {
    let mut dispatcher = new_dispatcher(blank_doc(QuestionType::GuessANumber));
    for name in ["alice", "bob", "carol", "dave"] {
        dispatcher.handle_inbound(InboundEvent::JoinRoom { player_name: name.into() });
    }
    dispatcher.activate_team_mode().unwrap();

    run_to_live_question(&mut dispatcher, "quiz1");

    let captain = dispatcher.session.blue_team[0].clone();
    let other_captain = dispatcher.session.red_team[0].clone();
    dispatcher.handle_inbound(InboundEvent::SubmitCaptainChoice { player_name: captain, team: Team::Blue, final_answer: 42.0 });

    assert_eq!(dispatcher.session.team_scores.get(Team::Blue), 300, "exact phase-1 guess gets the full first-phase bonus");

    dispatcher.handle_inbound(InboundEvent::SubmitCaptainChoice { player_name: other_captain, team: Team::Red, final_answer: 10.0 });
    assert_eq!(dispatcher.session.team_scores.get(Team::Red), 0);
}

/// Scenario 6: blind-map team mode, HARD preset. A captain submission
/// within the exact radius (~0.022 here) scores the team and the other
/// team receives no points.
#[test]
fn blind_map_correct_submission_within_radius_scores_the_team() {
    let mut doc = blank_doc(QuestionType::BlindMap);
    doc.location = Some((0.50, 0.50));
    let mut dispatcher = new_dispatcher(doc);
    for name in ["alice", "bob", "carol", "dave"] {
        dispatcher.handle_inbound(InboundEvent::JoinRoom { player_name: name.into() });
    }
    dispatcher.activate_team_mode().unwrap();
    run_to_live_question(&mut dispatcher, "quiz1");
    dispatcher.handle_timer(timers::BLIND_MAP_PHASE); // ends the anagram phase, opens Locate with blue active

    let captain = dispatcher.session.blue_team[0].clone(); // activate_team_mode already made the first roster slot captain

    let commands = dispatcher.handle_inbound(InboundEvent::SubmitBlindMapLocation {
        player_name: captain,
        x: 0.52,
        y: 0.51,
        question_id: "q".into(),
    });

    assert_eq!(dispatcher.session.team_scores.get(Team::Blue), 200);
    assert_eq!(dispatcher.session.team_scores.get(Team::Red), 0);
    // A correct submission ends the question immediately rather than
    // giving the other team a turn; everyone (including red) learns the
    // outcome through the broadcast result, not a second locate phase.
    assert!(commands.iter().any(|c| matches!(c, Command::Emit { target: RoomTarget::All, .. })));
    assert!(commands.iter().any(|c| matches!(c, Command::ArmTimer { id, .. } if *id == timers::ADVANCE_DELAY)));
}

/// Invariant 7: at most one primary question timer is armed at a time — a
/// second `SubmitAnswer` after completion never re-arms it, it's simply
/// rejected as a duplicate.
#[test]
fn completion_fires_once_even_if_every_player_answers_twice() {
    let mut dispatcher = new_dispatcher(blank_doc(QuestionType::Abcd));
    dispatcher.handle_inbound(InboundEvent::JoinRoom { player_name: "alice".into() });
    run_to_live_question(&mut dispatcher, "quiz1");
    let start = dispatcher.session.question_start_ms.unwrap();

    dispatcher.handle_inbound(InboundEvent::SubmitAnswer { player_name: "alice".into(), answer: 2, answer_time: start });
    let score_after_first = dispatcher.session.players["alice"].score;
    dispatcher.handle_inbound(InboundEvent::SubmitAnswer { player_name: "alice".into(), answer: 2, answer_time: start });

    assert_eq!(dispatcher.session.players["alice"].score, score_after_first, "re-submitting is a no-op on score");
    match &dispatcher.session.current_question().unwrap().kind {
        QuestionKind::Abcd(c) => assert!(c.completed),
        _ => unreachable!(),
    }
}
