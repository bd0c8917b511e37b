//! ABCD and TRUE_FALSE (spec.md §4.5): one handler serves both protocols
//! since TRUE_FALSE is just an ABCD question loaded with two options.

use engine_core::clock::now_ms;
use engine_core::traits::TypeHandler;
use protocol::outbound::{AllAnswersReceived, AnswerCorrectness, AnswerSubmitted, ErrorPayload};
use protocol::tunables::POINTS_FOR_CORRECT_ANSWER;
use protocol::{InboundEvent, OutboundEvent};
use serde_json::json;

use crate::question::{ChoiceQuestion, QuestionKind};
use crate::scoring::speed_bonus;
use crate::session::Session;
use crate::timers;
use crate::Command;

pub struct AbcdHandler;

fn choice_question(session: &mut Session) -> Option<&mut ChoiceQuestion> {
    match &mut session.current_question_mut()?.kind {
        QuestionKind::Abcd(q) | QuestionKind::TrueFalse(q) => Some(q),
        _ => None,
    }
}

fn error(player_name: &str, message: &str) -> Vec<Command> {
    vec![Command::emit_player(
        player_name,
        OutboundEvent::Error(ErrorPayload { error: message.to_string() }),
    )]
}

impl TypeHandler<Session, InboundEvent, OutboundEvent> for AbcdHandler {
    fn initialize(&self, session: &mut Session) -> Vec<Command> {
        let Some(question) = session.current_question() else {
            return Vec::new();
        };
        vec![Command::ArmTimer {
            id: timers::PRIMARY,
            delay_ms: question.length_ms(),
        }]
    }

    fn on_event(&self, session: &mut Session, event: InboundEvent) -> Vec<Command> {
        let InboundEvent::SubmitAnswer { player_name, answer, answer_time } = event else {
            return Vec::new();
        };
        if !session.has_player(&player_name) {
            return error(&player_name, "unknown player");
        }
        let start_ms = session.question_start_ms.unwrap_or_else(now_ms);
        let length_ms = session.current_question().map(|q| q.length_ms()).unwrap_or(0);
        let is_team_mode = session.is_team_mode;
        let team = session.team_of(&player_name);
        let answer_key = if is_team_mode {
            team.map(|t| t.to_string()).unwrap_or(player_name.clone())
        } else {
            player_name.clone()
        };

        let Some(q) = choice_question(session) else {
            return error(&player_name, "no active choice question");
        };
        if q.answered.contains(&answer_key) {
            return error(&player_name, "already answered");
        }
        if answer >= q.options.len() {
            return error(&player_name, "invalid option index");
        }

        q.answered.insert(answer_key);
        q.answers_received += 1;
        if let Some(slot) = q.answer_counts.get_mut(answer) {
            *slot += 1;
        }
        let is_correct = answer == q.answer;
        let answers_received = q.answers_received;
        let mut counts = [0u32; 4];
        for (i, c) in q.answer_counts.iter().enumerate().take(4) {
            counts[i] = *c;
        }
        let already_completed = q.completed;
        let answered_snapshot = q.answered.clone();
        let completed = !already_completed && super::all_players_answered(session, &answered_snapshot);

        let elapsed = (answer_time - start_ms).max(0) as u64;
        let points = if is_correct { speed_bonus(POINTS_FOR_CORRECT_ANSWER, elapsed, length_ms) } else { 0 };
        session.award(&player_name, points);
        let total_points = match team {
            Some(team) if is_team_mode => session.team_scores.get(team),
            _ => session.players.get(&player_name).map(|p| p.score).unwrap_or(0),
        };

        // spec.md §4.5: in team mode every member of the scoring team is
        // notified together (and thereby blocked from a redundant submit);
        // free-for-all notifies only the submitter.
        let correctness_target = match team {
            Some(team) if is_team_mode => protocol::RoomTarget::Team(team),
            _ => protocol::RoomTarget::Player(player_name.clone()),
        };

        let mut commands = vec![
            Command::emit_all(OutboundEvent::AnswerSubmitted(AnswerSubmitted {
                answers_received,
                answer_counts: counts,
            })),
            Command::emit(
                correctness_target,
                OutboundEvent::AnswerCorrectness(AnswerCorrectness {
                    correct: is_correct,
                    points_earned: points,
                    total_points,
                    is_team_score: is_team_mode,
                }),
            ),
        ];

        if completed {
            if let Some(q) = choice_question(session) {
                q.completed = true;
            }
            // Every player already answered; fast-forward the primary timer
            // to zero instead of duplicating the results summary here — it
            // runs through the same `on_time_up` path a natural timeout
            // would take.
            commands.push(Command::emit_all(OutboundEvent::FastForwardTimer(
                protocol::outbound::FastForwardTimer { remaining_ms: 0 },
            )));
            commands.push(Command::ArmTimer { id: timers::PRIMARY, delay_ms: 0 });
        }
        commands
    }

    fn on_time_up(&self, session: &mut Session, timer_id: engine_core::clock::TimerId) -> Vec<Command> {
        if timer_id != timers::PRIMARY {
            return Vec::new();
        }
        let correct_answer = session
            .current_question()
            .and_then(|q| match &q.kind {
                QuestionKind::Abcd(c) | QuestionKind::TrueFalse(c) => Some(c.answer),
                _ => None,
            })
            .unwrap_or(0);
        let counts = session
            .current_question()
            .and_then(|q| match &q.kind {
                QuestionKind::Abcd(c) | QuestionKind::TrueFalse(c) => Some(c.answer_counts.clone()),
                _ => None,
            })
            .unwrap_or_default();
        let mut fixed = [0u32; 4];
        for (i, c) in counts.iter().enumerate().take(4) {
            fixed[i] = *c;
        }

        let scores = json!(session.players.iter().map(|(n, p)| (n.clone(), p.score)).collect::<std::collections::HashMap<_, _>>());
        vec![
            Command::emit_all(OutboundEvent::AllAnswersReceived(AllAnswersReceived {
                scores,
                correct_answer: json!(correct_answer),
                answer_counts: Some(fixed),
                show_question_preview_at: now_ms() + 1,
                show_buttons_at: now_ms() + 1,
                extra: Default::default(),
            })),
            Command::AdvanceQuestion,
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::question::{ChoiceQuestion, Question};

    fn session_with_choice_question(options: usize, answer: usize, length_seconds: u32) -> Session {
        let mut session = Session::new();
        session.add_player("alice".into());
        session.add_player("bob".into());
        session.questions.push(Question {
            length_seconds,
            category: "general".into(),
            kind: QuestionKind::Abcd(ChoiceQuestion {
                options: (0..options).map(|i| i.to_string()).collect(),
                answer,
                answer_counts: vec![0; options],
                ..Default::default()
            }),
        });
        session.current_index = Some(0);
        session.question_start_ms = Some(now_ms());
        session
    }

    #[test]
    fn correct_answer_awards_points() {
        let mut session = session_with_choice_question(4, 1, 10);
        let handler = AbcdHandler;
        let answer_time = session.question_start_ms.unwrap();
        handler.on_event(
            &mut session,
            InboundEvent::SubmitAnswer { player_name: "alice".into(), answer: 1, answer_time },
        );
        assert!(session.players["alice"].score > 0);
    }

    #[test]
    fn duplicate_submission_is_rejected() {
        let mut session = session_with_choice_question(4, 1, 10);
        let handler = AbcdHandler;
        let start = session.question_start_ms.unwrap();
        handler.on_event(&mut session, InboundEvent::SubmitAnswer { player_name: "alice".into(), answer: 1, answer_time: start });
        let score_after_first = session.players["alice"].score;
        handler.on_event(&mut session, InboundEvent::SubmitAnswer { player_name: "alice".into(), answer: 1, answer_time: start });
        assert_eq!(session.players["alice"].score, score_after_first);
    }

    #[test]
    fn wrong_answer_awards_nothing() {
        let mut session = session_with_choice_question(4, 1, 10);
        let handler = AbcdHandler;
        let start = session.question_start_ms.unwrap();
        handler.on_event(&mut session, InboundEvent::SubmitAnswer { player_name: "alice".into(), answer: 0, answer_time: start });
        assert_eq!(session.players["alice"].score, 0);
    }

    #[test]
    fn last_player_answering_marks_the_question_complete() {
        let mut session = session_with_choice_question(4, 1, 10);
        let handler = AbcdHandler;
        let start = session.question_start_ms.unwrap();
        handler.on_event(&mut session, InboundEvent::SubmitAnswer { player_name: "alice".into(), answer: 1, answer_time: start });
        handler.on_event(&mut session, InboundEvent::SubmitAnswer { player_name: "bob".into(), answer: 0, answer_time: start });
        match &session.current_question().unwrap().kind {
            QuestionKind::Abcd(c) => assert!(c.completed),
            _ => unreachable!(),
        }
    }
}
