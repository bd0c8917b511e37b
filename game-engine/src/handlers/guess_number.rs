//! GUESS_A_NUMBER (spec.md §4.7). Free-for-all players submit one guess
//! each and are scored by proximity and placement; team mode runs each
//! team through a captain-guess/teammate-vote cycle in turn before locking
//! in the team's single answer.

use engine_core::clock::{now_ms, TimerId};
use engine_core::traits::TypeHandler;
use protocol::outbound::{ErrorPayload, GuessFeedback, PhaseTransition, SecondTeamVote};
use protocol::tunables::{POINTS_FOR_CORRECT_ANSWER_GUESS_A_NUMBER, POINTS_FOR_CORRECT_ANSWER_GUESS_A_NUMBER_FIRST_PHASE};
use protocol::{GuessPhase, InboundEvent, OutboundEvent, Team};
use serde_json::json;

use crate::question::{GuessANumberQuestion, QuestionKind};
use crate::scoring::{guess_number_accuracy_bonus, guess_number_placement_points, proximity_bonus};
use crate::session::Session;
use crate::timers;
use crate::Command;

pub struct GuessANumberHandler;

fn question_mut(session: &mut Session) -> Option<&mut GuessANumberQuestion> {
    match &mut session.current_question_mut()?.kind {
        QuestionKind::GuessANumber(q) => Some(q),
        _ => None,
    }
}

fn error(player_name: &str, message: &str) -> Vec<Command> {
    vec![Command::emit_player(player_name, OutboundEvent::Error(ErrorPayload { error: message.to_string() }))]
}

impl TypeHandler<Session, InboundEvent, OutboundEvent> for GuessANumberHandler {
    fn initialize(&self, session: &mut Session) -> Vec<Command> {
        let is_team_mode = session.is_team_mode;
        let length_ms = session.current_question().map(|q| q.length_ms()).unwrap_or(0);
        let mut commands = vec![Command::ArmTimer { id: timers::PRIMARY, delay_ms: length_ms }];
        if is_team_mode {
            if let Some(q) = question_mut(session) {
                // flow::advance already alternates `active_team` across
                // consecutive questions; only default to Blue the first
                // time a GUESS_A_NUMBER question is ever played.
                q.active_team = Some(q.active_team.unwrap_or(Team::Blue));
                q.phase = Some(GuessPhase::CaptainGuess);
            }
            commands.push(Command::emit_all(OutboundEvent::PhaseTransition(PhaseTransition {
                phase: "captain_guess".into(),
                starts_at: now_ms(),
            })));
        }
        commands
    }

    fn on_event(&self, session: &mut Session, event: InboundEvent) -> Vec<Command> {
        match event {
            InboundEvent::SubmitNumberGuess { player_name, value } => self.free_for_all_guess(session, player_name, value),
            InboundEvent::SubmitCaptainChoice { player_name, team, final_answer } => {
                self.captain_guess(session, player_name, team, final_answer)
            }
            InboundEvent::SubmitMoreLessVote { player_name, team, vote } => self.teammate_vote(session, player_name, team, vote),
            _ => Vec::new(),
        }
    }

    fn on_time_up(&self, session: &mut Session, timer_id: TimerId) -> Vec<Command> {
        if timer_id != timers::PRIMARY {
            return Vec::new();
        }
        self.score_and_finish(session)
    }
}

impl GuessANumberHandler {
    fn free_for_all_guess(&self, session: &mut Session, player_name: String, value: f64) -> Vec<Command> {
        if !session.has_player(&player_name) {
            return error(&player_name, "unknown player");
        }
        let Some(q) = question_mut(session) else {
            return error(&player_name, "no active question");
        };
        if q.guesses.contains_key(&player_name) {
            return error(&player_name, "already answered");
        }
        q.guesses.insert(player_name.clone(), value);
        let guesses_len = q.guesses.len();
        let completed = guesses_len >= session.player_count();

        let mut commands = vec![Command::emit_all(OutboundEvent::GuessSubmitted(json!({ "player_name": player_name })))];
        if completed {
            commands.push(Command::ArmTimer { id: timers::PRIMARY, delay_ms: 0 });
        }
        commands
    }

    fn captain_guess(&self, session: &mut Session, player_name: String, team: Team, final_answer: f64) -> Vec<Command> {
        let is_captain = session.players.get(&player_name).map(|p| p.is_captain && p.team == Some(team)).unwrap_or(false);
        if !is_captain {
            return error(&player_name, "only the team captain can submit a guess");
        }
        let Some(q) = question_mut(session) else {
            return error(&player_name, "no active question");
        };
        if q.active_team != Some(team) || q.phase != Some(GuessPhase::CaptainGuess) {
            return error(&player_name, "it is not your team's turn");
        }
        q.captain_guess = Some(final_answer);

        // An exact guess (within a tiny epsilon) ends the question
        // immediately, skipping the second team's turn and the more/less
        // vote entirely.
        if (final_answer - q.number_answer).abs() < 1e-4 {
            q.completed = true;
            session.team_scores.add(team, POINTS_FOR_CORRECT_ANSWER_GUESS_A_NUMBER_FIRST_PHASE);
            let feedback = OutboundEvent::GuessFeedback(GuessFeedback {
                placement: 1,
                accuracy_label: "exact".into(),
                guess: Some(final_answer),
                correct_answer: final_answer,
                points_earned: POINTS_FOR_CORRECT_ANSWER_GUESS_A_NUMBER_FIRST_PHASE,
            });
            return vec![
                Command::emit(protocol::RoomTarget::Team(team), feedback.clone()),
                Command::emit(protocol::RoomTarget::Team(team.other()), feedback),
                Command::AdvanceQuestion,
            ];
        }

        q.phase = Some(GuessPhase::Vote);
        q.votes.clear();

        vec![
            Command::emit_all(OutboundEvent::TeamGuessSubmitted(json!({ "team": team, "value": final_answer }))),
            Command::emit_all(OutboundEvent::PhaseTransition(PhaseTransition { phase: "vote".into(), starts_at: now_ms() })),
        ]
    }

    fn teammate_vote(&self, session: &mut Session, player_name: String, team: Team, vote: bool) -> Vec<Command> {
        let in_team = session.team_of(&player_name) == Some(team);
        if !in_team {
            return error(&player_name, "you are not on that team");
        }
        let team_size = session.roster(team).len();
        let Some(q) = question_mut(session) else {
            return error(&player_name, "no active question");
        };
        if q.active_team != Some(team) || q.phase != Some(GuessPhase::Vote) {
            return error(&player_name, "voting is not open");
        }
        q.votes.insert(player_name, vote);
        let more_votes = q.votes.values().filter(|v| **v).count();
        let less_votes = q.votes.values().filter(|v| !**v).count();
        let all_voted = q.votes.len() + 1 >= team_size; // captain doesn't vote

        let mut commands = vec![Command::emit_all(OutboundEvent::SecondTeamVote(SecondTeamVote { team, more_votes, less_votes }))];
        if all_voted {
            commands.extend(self.lock_in_team(session, team));
        }
        commands
    }

    fn lock_in_team(&self, session: &mut Session, team: Team) -> Vec<Command> {
        let Some(q) = question_mut(session) else {
            return Vec::new();
        };
        let value = q.captain_guess.unwrap_or(0.0);
        q.team_results.insert(team, value);
        let next_team = if q.team_results.contains_key(&Team::Blue) && q.team_results.contains_key(&Team::Red) {
            None
        } else {
            Some(team.other())
        };
        q.active_team = next_team;
        q.phase = next_team.map(|_| GuessPhase::CaptainGuess);
        q.captain_guess = None;
        q.votes.clear();

        match next_team {
            Some(next) => vec![Command::emit_all(OutboundEvent::PhaseTransition(PhaseTransition {
                phase: format!("captain_guess:{next}"),
                starts_at: now_ms(),
            }))],
            None => vec![Command::ArmTimer { id: timers::PRIMARY, delay_ms: 0 }],
        }
    }

    fn score_and_finish(&self, session: &mut Session) -> Vec<Command> {
        let mut commands = Vec::new();
        let is_team_mode = session.is_team_mode;

        if is_team_mode {
            let Some(q) = question_mut(session) else {
                return vec![Command::AdvanceQuestion];
            };
            let answer = q.number_answer;
            let results: Vec<(Team, f64)> = q.team_results.iter().map(|(t, v)| (*t, *v)).collect();
            q.completed = true;
            for (team, value) in results {
                let exact = (value - answer).abs() < f64::EPSILON;
                let points = if exact {
                    POINTS_FOR_CORRECT_ANSWER_GUESS_A_NUMBER_FIRST_PHASE
                } else {
                    proximity_bonus(POINTS_FOR_CORRECT_ANSWER_GUESS_A_NUMBER, value, answer, answer.abs().max(1.0))
                };
                session.team_scores.add(team, points);
                commands.push(Command::emit(
                    protocol::RoomTarget::Team(team),
                    OutboundEvent::GuessFeedback(GuessFeedback {
                        placement: 0,
                        accuracy_label: if exact { "exact".into() } else { "close".into() },
                        guess: Some(value),
                        correct_answer: answer,
                        points_earned: points,
                    }),
                ));
            }
        } else {
            let Some(q) = question_mut(session) else {
                return vec![Command::AdvanceQuestion];
            };
            let answer = q.number_answer;
            let mut guesses: Vec<(String, f64)> = q.guesses.iter().map(|(n, v)| (n.clone(), *v)).collect();
            q.completed = true;
            guesses.sort_by(|a, b| (a.1 - answer).abs().partial_cmp(&(b.1 - answer).abs()).unwrap());
            let submitted: std::collections::HashSet<String> = guesses.iter().map(|(n, _)| n.clone()).collect();
            // N is the whole roster, not just who submitted — late players
            // still rank, just behind everyone who answered.
            let total = session.player_count();

            for (placement, (player_name, value)) in guesses.into_iter().enumerate() {
                let exact = (value - answer).abs() < f64::EPSILON;
                // placement component (based on rank) plus an accuracy
                // component (based on normalized distance); an exact guess
                // maxes out both.
                let points = guess_number_placement_points(placement + 1, total) + guess_number_accuracy_bonus(value, answer);
                session.award(&player_name, points);
                commands.push(Command::emit_player(
                    player_name,
                    OutboundEvent::GuessFeedback(GuessFeedback {
                        placement: placement + 1,
                        accuracy_label: if exact { "exact".into() } else { "ranked".into() },
                        guess: Some(value),
                        correct_answer: answer,
                        points_earned: points,
                    }),
                ));
            }

            for player_name in session.players.keys().filter(|n| !submitted.contains(*n)).cloned().collect::<Vec<_>>() {
                commands.push(Command::emit_player(
                    player_name,
                    OutboundEvent::GuessFeedback(GuessFeedback {
                        placement: total + 1,
                        accuracy_label: "too_late".into(),
                        guess: None,
                        correct_answer: answer,
                        points_earned: 0,
                    }),
                ));
            }
        }

        commands.push(Command::AdvanceQuestion);
        commands
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::question::{GuessANumberQuestion, Question};

    fn session_with_guess(answer: f64) -> Session {
        let mut session = Session::new();
        session.add_player("alice".into());
        session.add_player("bob".into());
        session.questions.push(Question {
            length_seconds: 10,
            category: "general".into(),
            kind: QuestionKind::GuessANumber(GuessANumberQuestion { number_answer: answer, ..Default::default() }),
        });
        session.current_index = Some(0);
        session.question_start_ms = Some(now_ms());
        session
    }

    #[test]
    fn closest_guess_scores_more_than_the_farthest() {
        let mut session = session_with_guess(100.0);
        let handler = GuessANumberHandler;
        handler.on_event(&mut session, InboundEvent::SubmitNumberGuess { player_name: "alice".into(), value: 95.0 });
        handler.on_event(&mut session, InboundEvent::SubmitNumberGuess { player_name: "bob".into(), value: 10.0 });
        handler.score_and_finish(&mut session);
        assert!(session.players["alice"].score > session.players["bob"].score);
    }

    #[test]
    fn exact_guess_gets_max_placement_plus_accuracy_bonus() {
        let mut session = session_with_guess(50.0);
        let handler = GuessANumberHandler;
        handler.on_event(&mut session, InboundEvent::SubmitNumberGuess { player_name: "alice".into(), value: 50.0 });
        handler.on_event(&mut session, InboundEvent::SubmitNumberGuess { player_name: "bob".into(), value: 10.0 });
        handler.score_and_finish(&mut session);
        // first place (100) + exact accuracy bonus (200).
        assert_eq!(session.players["alice"].score, 300);
    }

    #[test]
    fn non_submitter_gets_a_too_late_result() {
        let mut session = session_with_guess(50.0);
        let handler = GuessANumberHandler;
        handler.on_event(&mut session, InboundEvent::SubmitNumberGuess { player_name: "alice".into(), value: 50.0 });
        let commands = handler.score_and_finish(&mut session);
        assert_eq!(session.players["bob"].score, 0);
        assert!(commands.iter().any(|c| matches!(
            c,
            Command::Emit { target: protocol::RoomTarget::Player(p), event: OutboundEvent::GuessFeedback(f) }
                if p == "bob" && f.points_earned == 0 && f.placement == 2
        )));
    }

    #[test]
    fn captain_exact_guess_ends_question_immediately() {
        let mut session = session_with_guess(50.0);
        session.is_team_mode = true;
        session.add_player("carol".into());
        session.players.get_mut("alice").unwrap().team = Some(Team::Blue);
        session.players.get_mut("alice").unwrap().is_captain = true;
        session.players.get_mut("bob").unwrap().team = Some(Team::Red);
        session.players.get_mut("carol").unwrap().team = Some(Team::Red);
        session.players.get_mut("carol").unwrap().is_captain = true;
        let handler = GuessANumberHandler;
        handler.initialize(&mut session);
        let commands =
            handler.on_event(&mut session, InboundEvent::SubmitCaptainChoice { player_name: "alice".into(), team: Team::Blue, final_answer: 50.0 });
        assert!(commands.iter().any(|c| matches!(c, Command::AdvanceQuestion)));
        assert_eq!(session.team_scores.get(Team::Blue), POINTS_FOR_CORRECT_ANSWER_GUESS_A_NUMBER_FIRST_PHASE);
        assert_eq!(session.team_scores.get(Team::Red), 0);
    }
}
