//! MATH_QUIZ (spec.md §4.9): a question made of several short arithmetic
//! sequences run back to back. A player who answers a sequence wrong (or
//! not at all before it times out) is eliminated from scoring on every
//! sequence after it, but stays connected to watch the rest play out.

use std::collections::HashSet;

use engine_core::clock::{now_ms, TimerId};
use engine_core::traits::TypeHandler;
use protocol::outbound::{ErrorPayload, Feedback, FastForwardTimer, MathQuizUpdate, MathSequenceChange};
use protocol::tunables::POINTS_FOR_MATH_CORRECT_ANSWER;
use protocol::{InboundEvent, OutboundEvent, Team};

use crate::question::{MathQuizQuestion, QuestionKind};
use crate::scoring::math_quiz_speed_points;
use crate::session::Session;
use crate::timers;
use crate::Command;

pub struct MathQuizHandler;

fn question_mut(session: &mut Session) -> Option<&mut MathQuizQuestion> {
    match &mut session.current_question_mut()?.kind {
        QuestionKind::MathQuiz(q) => Some(q),
        _ => None,
    }
}

fn error(player_name: &str, message: &str) -> Vec<Command> {
    vec![Command::emit_player(player_name, OutboundEvent::Error(ErrorPayload { error: message.to_string() }))]
}

fn remaining_players(session: &Session, eliminated: &HashSet<String>) -> Vec<String> {
    session.players.keys().filter(|name| !eliminated.contains(*name)).cloned().collect()
}

impl TypeHandler<Session, InboundEvent, OutboundEvent> for MathQuizHandler {
    fn initialize(&self, session: &mut Session) -> Vec<Command> {
        self.begin_sequence(session, 0)
    }

    fn on_event(&self, session: &mut Session, event: InboundEvent) -> Vec<Command> {
        match event {
            InboundEvent::SubmitMathAnswer { player_name, answer, answer_time } => {
                self.submit_answer(session, player_name, answer, answer_time)
            }
            InboundEvent::MathSequenceCompleted { current_index, .. } => {
                let matches_current = session
                    .current_question()
                    .map(|q| matches!(&q.kind, QuestionKind::MathQuiz(m) if m.current_sequence == current_index))
                    .unwrap_or(false);
                if matches_current {
                    vec![Command::ArmTimer { id: timers::PRIMARY, delay_ms: 0 }]
                } else {
                    Vec::new()
                }
            }
            _ => Vec::new(),
        }
    }

    fn on_time_up(&self, session: &mut Session, timer_id: TimerId) -> Vec<Command> {
        if timer_id != timers::PRIMARY {
            return Vec::new();
        }
        self.finish_sequence(session)
    }
}

impl MathQuizHandler {
    fn begin_sequence(&self, session: &mut Session, index: usize) -> Vec<Command> {
        let start_ms = now_ms();
        let Some(q) = question_mut(session) else {
            return Vec::new();
        };
        if index >= q.sequences.len() {
            q.completed = true;
            return vec![Command::AdvanceQuestion];
        }
        q.current_sequence = index;
        if q.sequence_start_ms.len() > index {
            q.sequence_start_ms[index] = start_ms;
        }
        let sequence = q.sequences[index].clone();
        let eliminated = q.eliminated_players.clone();

        vec![
            Command::emit_all(OutboundEvent::MathSequenceChange(MathSequenceChange {
                sequence_index: index,
                equation: sequence.equation,
                length_seconds: sequence.length_seconds,
            })),
            Command::emit_all(OutboundEvent::MathQuizUpdate(MathQuizUpdate {
                has_answered: remaining_players(session, &eliminated).into_iter().map(|n| (n, false)).collect(),
                is_eliminated: session.players.keys().map(|n| (n.clone(), eliminated.contains(n))).collect(),
            })),
            Command::ArmTimer { id: timers::PRIMARY, delay_ms: (sequence.length_seconds as u64) * 1_000 },
        ]
    }

    fn submit_answer(&self, session: &mut Session, player_name: String, answer: String, answer_time: i64) -> Vec<Command> {
        if !session.has_player(&player_name) {
            return error(&player_name, "unknown player");
        }
        let is_team_mode = session.is_team_mode;
        let team = session.team_of(&player_name);

        // Scoped borrow of the live sequence: compute everything that needs
        // `q` here, then drop it before touching team rosters/scores on
        // `session` directly (team mode needs both at once).
        let (is_correct, team_credit): (bool, Option<(Team, i64, usize)>) = {
            let Some(q) = question_mut(session) else {
                return error(&player_name, "no active question");
            };
            if q.eliminated_players.contains(&player_name) {
                return error(&player_name, "you have been eliminated");
            }
            let index = q.current_sequence;
            if q.answered.get(index).map(|s| s.contains(&player_name)).unwrap_or(false) {
                return error(&player_name, "already answered this sequence");
            }
            let Some(expected) = q.sequences.get(index).map(|s| s.answer) else {
                return error(&player_name, "no active sequence");
            };
            let normalized = answer.trim().replace(',', ".");
            let parsed: Option<f64> = normalized.parse().ok();
            let is_correct = parsed.map(|v| (v - expected).abs() < 1e-3).unwrap_or(false);

            if let Some(set) = q.answered.get_mut(index) {
                set.insert(player_name.clone());
            }
            let team_already_scored = team.map(|t| q.teams_scored.get(index).map(|s| s.contains(&t)).unwrap_or(false)).unwrap_or(false);

            let mut team_credit = None;
            if !is_correct {
                q.eliminated_players.insert(player_name.clone());
            } else {
                let start_ms = q.sequence_start_ms.get(index).copied().unwrap_or(answer_time);
                let length_ms = q.sequences.get(index).map(|s| s.length_seconds as u64 * 1_000).unwrap_or(0);
                let elapsed = (answer_time - start_ms).max(0) as u64;
                let points = math_quiz_speed_points(POINTS_FOR_MATH_CORRECT_ANSWER, elapsed, length_ms);

                if is_team_mode {
                    if let Some(team) = team {
                        if !team_already_scored {
                            if let Some(set) = q.teams_scored.get_mut(index) {
                                set.insert(team);
                            }
                            team_credit = Some((team, points, index));
                        }
                    }
                } else {
                    *q.math_quiz_points.entry(player_name.clone()).or_insert(0) += points;
                }
            }
            (is_correct, team_credit)
        };

        if let Some((team, points, index)) = team_credit {
            // The whole team is considered answered for this sequence once
            // one member scores (spec.md §4.9 `math_quiz_update` semantics).
            let teammates: Vec<String> = session.roster(team).to_vec();
            if let Some(q) = question_mut(session) {
                if let Some(set) = q.answered.get_mut(index) {
                    for mate in &teammates {
                        set.insert(mate.clone());
                    }
                }
            }
            session.team_scores.add(team, points);
        }

        let mut commands = vec![Command::emit_player(
            player_name,
            OutboundEvent::MathFeedback(Feedback { message: if is_correct { "Correct!".into() } else { "Eliminated.".into() } }),
        )];
        commands.push(self.broadcast_update(session));
        if let Some(delay_ms) = self.auto_complete_remaining_ms(session) {
            if delay_ms == 0 {
                commands.push(Command::ArmTimer { id: timers::PRIMARY, delay_ms: 0 });
            } else {
                commands.push(Command::emit_all(OutboundEvent::FastForwardTimer(FastForwardTimer { remaining_ms: delay_ms })));
                commands.push(Command::ArmTimer { id: timers::PRIMARY, delay_ms });
            }
        }
        commands
    }

    fn broadcast_update(&self, session: &mut Session) -> Command {
        let index = question_mut(session).map(|q| q.current_sequence).unwrap_or(0);
        let (eliminated, answered) = {
            let q = question_mut(session);
            match q {
                Some(q) => (q.eliminated_players.clone(), q.answered.get(index).cloned().unwrap_or_default()),
                None => (HashSet::new(), HashSet::new()),
            }
        };
        Command::emit_all(OutboundEvent::MathQuizUpdate(MathQuizUpdate {
            has_answered: session.players.keys().map(|n| (n.clone(), answered.contains(n))).collect(),
            is_eliminated: session.players.keys().map(|n| (n.clone(), eliminated.contains(n))).collect(),
        }))
    }

    /// spec.md §4.9 auto-completion: free-for-all ends once every remaining
    /// player has answered the current sequence; team mode ends once both
    /// teams are fully eliminated, or fast-forwards to a short remainder once
    /// one team has scored while the other is fully eliminated.
    fn auto_complete_remaining_ms(&self, session: &mut Session) -> Option<u64> {
        let is_team_mode = session.is_team_mode;
        let blue_roster = session.blue_team.clone();
        let red_roster = session.red_team.clone();

        let (eliminated, answered, teams_scored) = {
            let q = question_mut(session)?;
            let index = q.current_sequence;
            (q.eliminated_players.clone(), q.answered.get(index).cloned().unwrap_or_default(), q.teams_scored.get(index).cloned().unwrap_or_default())
        };

        if is_team_mode {
            let blue_alive = blue_roster.iter().any(|n| !eliminated.contains(n));
            let red_alive = red_roster.iter().any(|n| !eliminated.contains(n));
            if !blue_alive && !red_alive {
                return Some(0);
            }
            let blue_scored = teams_scored.contains(&Team::Blue);
            let red_scored = teams_scored.contains(&Team::Red);
            if (blue_scored && !red_alive) || (red_scored && !blue_alive) {
                return Some(2_000);
            }
            None
        } else {
            let remaining: Vec<String> = session.players.keys().filter(|n| !eliminated.contains(*n)).cloned().collect();
            if remaining.is_empty() {
                return Some(0);
            }
            if remaining.iter().all(|n| answered.contains(n)) {
                Some(0)
            } else {
                None
            }
        }
    }

    fn finish_sequence(&self, session: &mut Session) -> Vec<Command> {
        let is_team_mode = session.is_team_mode;
        let (points, next_index, answered, teams_scored) = {
            let Some(q) = question_mut(session) else {
                return vec![Command::AdvanceQuestion];
            };
            let index = q.current_sequence;
            let answered = q.answered.get(index).cloned().unwrap_or_default();
            let teams_scored = q.teams_scored.get(index).cloned().unwrap_or_default();
            let points = std::mem::take(&mut q.math_quiz_points);
            (points, index + 1, answered, teams_scored)
        };

        // Anyone who never locked in an answer for the sequence that just
        // ended is eliminated now, team-mate scoring notwithstanding.
        let names: Vec<String> = session.players.keys().cloned().collect();
        for name in &names {
            if !answered.contains(name) {
                if let Some(q) = question_mut(session) {
                    q.eliminated_players.insert(name.clone());
                }
            }
        }
        if is_team_mode {
            for team in [Team::Blue, Team::Red] {
                if !teams_scored.contains(&team) {
                    for name in session.roster(team).to_vec() {
                        if let Some(q) = question_mut(session) {
                            q.eliminated_players.insert(name);
                        }
                    }
                }
            }
        }
        if !is_team_mode {
            for (player_name, pts) in points {
                session.award(&player_name, pts);
            }
        }
        self.begin_sequence(session, next_index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::question::{MathQuizQuestion, MathSequence, Question};

    fn session_with_math_quiz() -> Session {
        let mut session = Session::new();
        session.add_player("alice".into());
        session.add_player("bob".into());
        session.questions.push(Question {
            length_seconds: 10,
            category: "math".into(),
            kind: QuestionKind::MathQuiz(MathQuizQuestion {
                sequences: vec![MathSequence { equation: "2+2".into(), answer: 4.0, length_seconds: 5 }],
                answered: vec![HashSet::new()],
                teams_scored: vec![HashSet::new()],
                sequence_start_ms: vec![0],
                ..Default::default()
            }),
        });
        session.current_index = Some(0);
        session.question_start_ms = Some(now_ms());
        session
    }

    #[test]
    fn wrong_answer_eliminates_the_player() {
        let mut session = session_with_math_quiz();
        let handler = MathQuizHandler;
        handler.begin_sequence(&mut session, 0);
        let now = now_ms();
        handler.submit_answer(&mut session, "alice".into(), "3".into(), now);
        let q = question_mut(&mut session).unwrap();
        assert!(q.eliminated_players.contains("alice"));
    }

    #[test]
    fn correct_answer_accrues_points_for_the_sequence() {
        let mut session = session_with_math_quiz();
        let handler = MathQuizHandler;
        handler.begin_sequence(&mut session, 0);
        let now = now_ms();
        handler.submit_answer(&mut session, "alice".into(), "4".into(), now);
        let q = question_mut(&mut session).unwrap();
        assert!(q.math_quiz_points.get("alice").copied().unwrap_or(0) > 0);
        handler.finish_sequence(&mut session);
        assert!(session.players["alice"].score > 0);
    }
}
