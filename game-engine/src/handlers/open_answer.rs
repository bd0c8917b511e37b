//! OPEN_ANSWER (spec.md §4.6). Grounded directly on
//! `original_source/flask-server/app/socketio_events/open_answer_events.py`:
//! `analyze_answer`'s length-ratio/similarity thresholds (lifted into
//! [`crate::scoring::classify_open_answer`]), and its progressive letter
//! reveal.

use std::collections::HashMap;

use engine_core::clock::{now_ms, TimerId};
use engine_core::traits::TypeHandler;
use protocol::outbound::{AllAnswersReceived, ErrorPayload, Feedback, LetterRevealed, OpenAnswerSubmitted};
use protocol::tunables::POINTS_FOR_CORRECT_ANSWER;
use protocol::{InboundEvent, OutboundEvent};

use serde_json::{json, Value};

use crate::question::{OpenAnswerQuestion, PlayerAnswer, QuestionKind};
use crate::scoring::{classify_open_answer, mask_word, similarity_ratio, speed_bonus, AnswerVerdict};
use crate::session::Session;
use crate::timers;
use crate::Command;

pub struct OpenAnswerHandler;

fn question_mut(session: &mut Session) -> Option<&mut OpenAnswerQuestion> {
    match &mut session.current_question_mut()?.kind {
        QuestionKind::OpenAnswer(q) => Some(q),
        _ => None,
    }
}

fn error(player_name: &str, message: &str) -> Vec<Command> {
    vec![Command::emit_player(player_name, OutboundEvent::Error(ErrorPayload { error: message.to_string() }))]
}

impl TypeHandler<Session, InboundEvent, OutboundEvent> for OpenAnswerHandler {
    fn initialize(&self, session: &mut Session) -> Vec<Command> {
        let Some(question) = session.current_question() else {
            return Vec::new();
        };
        vec![Command::ArmTimer { id: timers::PRIMARY, delay_ms: question.length_ms() }]
    }

    fn on_event(&self, session: &mut Session, event: InboundEvent) -> Vec<Command> {
        match event {
            InboundEvent::SubmitOpenAnswer { player_name, answer, answer_time } => {
                if !session.has_player(&player_name) {
                    return error(&player_name, "unknown player");
                }
                let start_ms = session.question_start_ms.unwrap_or_else(now_ms);
                let length_ms = session.current_question().map(|q| q.length_ms()).unwrap_or(0);
                let player_color = session.players.get(&player_name).map(|p| p.color.clone()).unwrap_or_default();
                let is_team_mode = session.is_team_mode;
                let team = session.team_of(&player_name);

                let Some(q) = question_mut(session) else {
                    return error(&player_name, "no active open-answer question");
                };
                // spec.md §4.5: only a correct answer locks a player out; a
                // wrong guess may be retried.
                if q.correct_players.contains(&player_name) {
                    return error(&player_name, "already answered correctly");
                }

                let verdict = classify_open_answer(&answer, &q.open_answer);
                let is_correct = matches!(verdict, AnswerVerdict::Correct);
                q.player_answers.push(PlayerAnswer {
                    player_name: player_name.clone(),
                    answer: answer.clone(),
                    is_correct,
                    player_color,
                });
                if is_correct {
                    q.correct_players.insert(player_name.clone());
                    q.correct_count += 1;
                }
                let player_count = q.player_answers.len();
                let correct_count = q.correct_count;
                let already_completed = q.completed;
                let correct_players = q.correct_players.clone();
                // team mode completes once both teams have one correct
                // member; free-for-all needs every player correct.
                let completed = !already_completed && super::all_players_answered(session, &correct_players);

                let elapsed = (answer_time - start_ms).max(0) as u64;
                let points = if is_correct { speed_bonus(POINTS_FOR_CORRECT_ANSWER, elapsed, length_ms) } else { 0 };
                if is_correct && is_team_mode {
                    if let Some(team) = team {
                        session.team_scores.add(team, points);
                    }
                } else {
                    session.award(&player_name, points);
                }

                let feedback_message = match verdict {
                    AnswerVerdict::Correct => "Correct!",
                    AnswerVerdict::Close => "Close, but not quite.",
                    AnswerVerdict::Incorrect => "Incorrect.",
                };

                // spec.md §4.5: a correct answer in team mode notifies every
                // team member; a wrong guess (or any free-for-all answer)
                // only ever goes back to the submitter.
                let feedback_target = match team {
                    Some(team) if is_team_mode && is_correct => protocol::RoomTarget::Team(team),
                    _ => protocol::RoomTarget::Player(player_name.clone()),
                };

                let mut commands = vec![
                    Command::emit_all(OutboundEvent::OpenAnswerSubmitted(OpenAnswerSubmitted { player_count, correct_count })),
                    Command::emit(
                        feedback_target,
                        OutboundEvent::OpenAnswerFeedback(Feedback { message: feedback_message.to_string() }),
                    ),
                ];
                if completed {
                    if let Some(q) = question_mut(session) {
                        q.completed = true;
                    }
                    commands.push(Command::ArmTimer { id: timers::PRIMARY, delay_ms: 0 });
                }
                commands
            }
            InboundEvent::RevealOpenAnswerLetter => {
                let Some(q) = question_mut(session) else {
                    return Vec::new();
                };
                let next_index = q
                    .open_answer
                    .chars()
                    .enumerate()
                    .find(|(i, c)| !c.is_whitespace() && !q.revealed_positions.contains(i))
                    .map(|(i, _)| i);
                let Some(index) = next_index else {
                    return Vec::new();
                };
                q.revealed_positions.insert(index);
                let mask = mask_word(&q.open_answer, &q.revealed_positions);
                vec![Command::emit_all(OutboundEvent::OpenAnswerLetterRevealed(LetterRevealed {
                    revealed_positions: q.revealed_positions.iter().copied().collect(),
                    mask,
                }))]
            }
            _ => Vec::new(),
        }
    }

    fn on_time_up(&self, session: &mut Session, timer_id: TimerId) -> Vec<Command> {
        if timer_id != timers::PRIMARY {
            return Vec::new();
        }
        let correct_answer = session
            .current_question()
            .and_then(|q| match &q.kind {
                QuestionKind::OpenAnswer(o) => Some(o.open_answer.clone()),
                _ => None,
            })
            .unwrap_or_default();

        // spec.md §4.5: sort attempts correct-first, then incorrect ones
        // ascending by similarity to the expected answer (least similar
        // first).
        let mut attempts = session
            .current_question()
            .and_then(|q| match &q.kind {
                QuestionKind::OpenAnswer(o) => Some(o.player_answers.clone()),
                _ => None,
            })
            .unwrap_or_default();
        attempts.sort_by(|a, b| {
            b.is_correct.cmp(&a.is_correct).then_with(|| {
                let sim_a = similarity_ratio(&a.answer, &correct_answer);
                let sim_b = similarity_ratio(&b.answer, &correct_answer);
                sim_a.partial_cmp(&sim_b).unwrap_or(std::cmp::Ordering::Equal)
            })
        });
        let player_answers: Vec<Value> = attempts
            .iter()
            .map(|a| json!({"player_name": a.player_name, "answer": a.answer, "is_correct": a.is_correct, "player_color": a.player_color}))
            .collect();

        let scores = json!(session.players.iter().map(|(n, p)| (n.clone(), p.score)).collect::<std::collections::HashMap<_, _>>());
        let mut extra = HashMap::new();
        extra.insert("player_answers".to_string(), json!(player_answers));
        vec![
            Command::emit_all(OutboundEvent::AllAnswersReceived(AllAnswersReceived {
                scores,
                correct_answer: json!(correct_answer),
                answer_counts: None,
                show_question_preview_at: now_ms() + 1,
                show_buttons_at: now_ms() + 1,
                extra,
            })),
            Command::AdvanceQuestion,
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::question::{OpenAnswerQuestion, Question};

    fn session_with_open_answer(expected: &str) -> Session {
        let mut session = Session::new();
        session.add_player("alice".into());
        session.questions.push(Question {
            length_seconds: 10,
            category: "general".into(),
            kind: QuestionKind::OpenAnswer(OpenAnswerQuestion { open_answer: expected.to_string(), ..Default::default() }),
        });
        session.current_index = Some(0);
        session.question_start_ms = Some(now_ms());
        session
    }

    #[test]
    fn exact_answer_is_correct_and_scores() {
        let mut session = session_with_open_answer("Paris");
        let handler = OpenAnswerHandler;
        let start = session.question_start_ms.unwrap();
        handler.on_event(&mut session, InboundEvent::SubmitOpenAnswer { player_name: "alice".into(), answer: "paris".into(), answer_time: start });
        assert!(session.players["alice"].score > 0);
    }

    #[test]
    fn reveal_letter_uncovers_one_position_at_a_time() {
        let mut session = session_with_open_answer("cat");
        let handler = OpenAnswerHandler;
        handler.on_event(&mut session, InboundEvent::RevealOpenAnswerLetter);
        let q = question_mut(&mut session).unwrap();
        assert_eq!(q.revealed_positions.len(), 1);
    }

    #[test]
    fn wrong_answer_can_be_retried() {
        let mut session = session_with_open_answer("Paris");
        let handler = OpenAnswerHandler;
        let start = session.question_start_ms.unwrap();
        handler.on_event(&mut session, InboundEvent::SubmitOpenAnswer { player_name: "alice".into(), answer: "berlin".into(), answer_time: start });
        let result = handler.on_event(&mut session, InboundEvent::SubmitOpenAnswer { player_name: "alice".into(), answer: "paris".into(), answer_time: start });
        assert!(matches!(result[1].clone(), Command::Emit { event: OutboundEvent::OpenAnswerFeedback(f), .. } if f.message == "Correct!"));
        assert!(session.players["alice"].score > 0);
    }

    #[test]
    fn team_mode_credits_team_score_not_player_score() {
        let mut session = session_with_open_answer("Paris");
        session.is_team_mode = true;
        session.add_player("bob".into());
        session.players.get_mut("alice").unwrap().team = Some(protocol::Team::Blue);
        session.players.get_mut("bob").unwrap().team = Some(protocol::Team::Red);
        let handler = OpenAnswerHandler;
        let start = session.question_start_ms.unwrap();
        handler.on_event(&mut session, InboundEvent::SubmitOpenAnswer { player_name: "alice".into(), answer: "paris".into(), answer_time: start });
        assert_eq!(session.players["alice"].score, 0);
        assert!(session.team_scores.get(protocol::Team::Blue) > 0);
    }
}
