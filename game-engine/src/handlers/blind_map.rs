//! BLIND_MAP (spec.md §4.12): players unscramble an anagram of a city name,
//! then place a pin on a map near its true location. Team mode runs the
//! locate phase as alternating team turns gated behind the captain, the same
//! captain-driven pattern GUESS_A_NUMBER uses for its vote cycle.

use engine_core::clock::{now_ms, TimerId};
use engine_core::traits::TypeHandler;
use protocol::outbound::{BlindMapClueRevealed, BlindMapPhaseTransition, CaptainPreviewUpdate, ErrorPayload, Feedback};
use protocol::tunables::{ANAGRAM_PHASE_POINTS, BLIND_MAP_TEAM_MODE_POINTS, MAP_PHASE_POINTS, WAITING_TIME_MS};
use protocol::{BlindMapPhase, InboundEvent, OutboundEvent, RoomTarget, Team};
use serde_json::json;

use crate::question::{BlindMapQuestion, QuestionKind};
use crate::scoring::placement_bonus;
use crate::session::Session;
use crate::timers;
use crate::Command;

pub struct BlindMapHandler;

fn question_mut(session: &mut Session) -> Option<&mut BlindMapQuestion> {
    match &mut session.current_question_mut()?.kind {
        QuestionKind::BlindMap(q) => Some(q),
        _ => None,
    }
}

fn error(player_name: &str, message: &str) -> Vec<Command> {
    vec![Command::emit_player(player_name, OutboundEvent::Error(ErrorPayload { error: message.to_string() }))]
}

fn distance(ax: f64, ay: f64, bx: f64, by: f64) -> f64 {
    ((ax - bx).powi(2) + (ay - by).powi(2)).sqrt()
}

impl TypeHandler<Session, InboundEvent, OutboundEvent> for BlindMapHandler {
    fn initialize(&self, session: &mut Session) -> Vec<Command> {
        let length_ms = session.current_question().map(|q| q.length_ms()).unwrap_or(0);
        if let Some(q) = question_mut(session) {
            q.phase = Some(BlindMapPhase::Anagram);
        }
        vec![
            Command::ArmTimer { id: timers::PRIMARY, delay_ms: length_ms },
            Command::ArmTimer { id: timers::BLIND_MAP_PHASE, delay_ms: length_ms },
            Command::emit_all(OutboundEvent::BlindMapPhaseTransition(BlindMapPhaseTransition {
                phase: BlindMapPhase::Anagram,
                active_team: None,
                starts_at: now_ms(),
            })),
        ]
    }

    fn on_event(&self, session: &mut Session, event: InboundEvent) -> Vec<Command> {
        match event {
            InboundEvent::SubmitBlindMapAnagram { player_name, answer } => self.submit_anagram(session, player_name, answer),
            InboundEvent::SubmitBlindMapLocation { player_name, x, y, question_id: _ } => self.submit_location(session, player_name, x, y),
            InboundEvent::CaptainLocationPreview { team, x, y } => self.captain_preview(session, team, x, y),
            InboundEvent::RequestNextClue { clue_index } => self.reveal_clue(session, clue_index),
            _ => Vec::new(),
        }
    }

    fn on_time_up(&self, session: &mut Session, timer_id: TimerId) -> Vec<Command> {
        if timer_id == timers::PRIMARY {
            // The overall question timeout: whatever phase we're in, time's up.
            return self.finish(session);
        }
        if timer_id != timers::BLIND_MAP_PHASE {
            return Vec::new();
        }
        let phase = question_mut(session).and_then(|q| q.phase);
        match phase {
            Some(BlindMapPhase::Anagram) => self.begin_locate_phase(session),
            _ => self.finish(session),
        }
    }
}

impl BlindMapHandler {
    fn submit_anagram(&self, session: &mut Session, player_name: String, answer: String) -> Vec<Command> {
        if !session.has_player(&player_name) {
            return error(&player_name, "unknown player");
        }
        let player_count = session.player_count();
        let Some(q) = question_mut(session) else {
            return error(&player_name, "no active blind map question");
        };
        if q.phase != Some(BlindMapPhase::Anagram) {
            return error(&player_name, "the anagram phase has ended");
        }
        if q.solved_order.contains(&player_name) {
            return error(&player_name, "already solved");
        }
        let is_correct = answer.trim().eq_ignore_ascii_case(q.city_name.trim());
        if !is_correct {
            return vec![Command::emit_player(player_name, OutboundEvent::BlindMapFeedback(Feedback { message: "Not quite.".into() }))];
        }
        q.solved_order.push(player_name.clone());
        let placement = q.solved_order.len();
        let all_solved = placement >= player_count;

        let points = placement_bonus(ANAGRAM_PHASE_POINTS, placement, player_count);
        session.award(&player_name, points);

        let mut commands = vec![Command::emit_all(OutboundEvent::BlindMapAnagramSolved(json!({
            "player_name": player_name,
            "placement": placement,
        })))];
        if all_solved {
            commands.push(Command::ArmTimer { id: timers::BLIND_MAP_PHASE, delay_ms: 0 });
        }
        commands
    }

    fn submit_location(&self, session: &mut Session, player_name: String, x: f64, y: f64) -> Vec<Command> {
        if !session.has_player(&player_name) {
            return error(&player_name, "unknown player");
        }
        let is_team_mode = session.is_team_mode;
        let team = session.team_of(&player_name);
        let is_captain = session.players.get(&player_name).map(|p| p.is_captain).unwrap_or(false);
        let player_count = session.player_count();

        if is_team_mode {
            self.team_submit_location(session, player_name, team, is_captain, x, y)
        } else {
            self.free_for_all_submit_location(session, player_name, player_count, x, y)
        }
    }

    fn free_for_all_submit_location(&self, session: &mut Session, player_name: String, player_count: usize, x: f64, y: f64) -> Vec<Command> {
        let Some(q) = question_mut(session) else {
            return error(&player_name, "no active blind map question");
        };
        if q.phase != Some(BlindMapPhase::Locate) {
            return error(&player_name, "the locate phase hasn't started");
        }
        if q.locations.contains_key(&player_name) {
            return error(&player_name, "already submitted a location");
        }
        let radius = q.radius_preset.unwrap_or_default().exact_radius();
        let is_correct = distance(x, y, q.location_x, q.location_y) <= radius;
        q.locations.insert(player_name.clone(), (x, y));
        let submitted_count = q.locations.len();
        let all_submitted = submitted_count >= player_count;

        let points = if is_correct { placement_bonus(MAP_PHASE_POINTS, submitted_count, player_count) } else { 0 };

        let mut commands = vec![Command::emit_all(OutboundEvent::BlindMapLocationSubmitted(json!({
            "player_name": player_name,
            "correct": is_correct,
        })))];
        if points != 0 {
            session.award(&player_name, points);
        }
        if all_submitted {
            commands.push(Command::ArmTimer { id: timers::BLIND_MAP_PHASE, delay_ms: 0 });
        }
        commands
    }

    fn team_submit_location(&self, session: &mut Session, player_name: String, team: Option<Team>, is_captain: bool, x: f64, y: f64) -> Vec<Command> {
        let Some(team) = team else {
            return error(&player_name, "you aren't on a team");
        };
        if !is_captain {
            return error(&player_name, "only the team captain can lock in a location");
        }
        let Some(q) = question_mut(session) else {
            return error(&player_name, "no active blind map question");
        };
        if q.active_team != Some(team) {
            return error(&player_name, "it is not your team's turn");
        }
        let radius = q.radius_preset.unwrap_or_default().exact_radius();
        let is_correct = distance(x, y, q.location_x, q.location_y) <= radius;
        q.captain_submissions.insert(team, (x, y));
        let already_second_attempt = q.phase == Some(BlindMapPhase::SecondLocate);
        let both_missed = already_second_attempt && !is_correct;
        let done = is_correct || both_missed;
        q.completed = done;
        let next_team = if done { None } else { Some(team.other()) };
        q.active_team = next_team;
        q.phase = next_team.map(|_| BlindMapPhase::SecondLocate);

        let mut commands = vec![Command::emit_all(OutboundEvent::BlindMapLocationSubmitted(json!({
            "team": team,
            "correct": is_correct,
        })))];

        if is_correct {
            session.team_scores.add(team, BLIND_MAP_TEAM_MODE_POINTS);
        } else if both_missed {
            // Both captains missed: the closer one still takes the points.
            commands.extend(self.award_closer_captain(session));
        }
        if done {
            commands.push(Command::AdvanceQuestion);
        } else {
            commands.push(Command::emit_all(OutboundEvent::BlindMapPhaseTransition(BlindMapPhaseTransition {
                phase: BlindMapPhase::SecondLocate,
                active_team: next_team,
                starts_at: now_ms(),
            })));
        }
        commands
    }

    /// Awards `MAP_PHASE_POINTS` to whichever team's captain submission is
    /// closer to the true location; if a captain never submitted at all,
    /// there's nothing to compare so the round ends with no winner.
    fn award_closer_captain(&self, session: &mut Session) -> Vec<Command> {
        let Some(q) = question_mut(session) else {
            return Vec::new();
        };
        let (loc_x, loc_y) = (q.location_x, q.location_y);
        let blue = q.captain_submissions.get(&Team::Blue).copied();
        let red = q.captain_submissions.get(&Team::Red).copied();
        let (Some((bx, by)), Some((rx, ry))) = (blue, red) else {
            return vec![Command::emit_all(OutboundEvent::BlindMapFeedback(Feedback { message: "Nobody got it.".into() }))];
        };
        let winner = if distance(bx, by, loc_x, loc_y) <= distance(rx, ry, loc_x, loc_y) { Team::Blue } else { Team::Red };
        session.team_scores.add(winner, MAP_PHASE_POINTS);
        vec![Command::emit_all(OutboundEvent::BlindMapFeedback(Feedback {
            message: format!("{winner} team was closer and takes the round."),
        }))]
    }

    fn captain_preview(&self, session: &mut Session, team: Team, x: f64, y: f64) -> Vec<Command> {
        let is_active = question_mut(session).map(|q| q.active_team == Some(team)).unwrap_or(false);
        if !is_active {
            return Vec::new();
        }
        vec![Command::emit(RoomTarget::Team(team), OutboundEvent::CaptainPreviewUpdate(CaptainPreviewUpdate { team, x, y }))]
    }

    fn reveal_clue(&self, session: &mut Session, clue_index: usize) -> Vec<Command> {
        let Some(q) = question_mut(session) else {
            return Vec::new();
        };
        let Some(clues) = &q.clues else {
            return Vec::new();
        };
        let clue_text = match clue_index {
            0 => clues.clue1.clone(),
            1 => clues.clue2.clone(),
            2 => clues.clue3.clone(),
            _ => None,
        };
        let Some(clue_text) = clue_text else {
            return Vec::new();
        };
        q.revealed_clue_index = q.revealed_clue_index.max(clue_index);
        vec![Command::emit_all(OutboundEvent::BlindMapClueRevealed(BlindMapClueRevealed { clue_index, clue: clue_text }))]
    }

    fn begin_locate_phase(&self, session: &mut Session) -> Vec<Command> {
        let is_team_mode = session.is_team_mode;
        let Some(q) = question_mut(session) else {
            return vec![Command::AdvanceQuestion];
        };
        q.phase = Some(BlindMapPhase::Locate);
        q.active_team = if is_team_mode { Some(Team::Blue) } else { None };
        let active_team = q.active_team;

        vec![
            Command::ArmTimer { id: timers::BLIND_MAP_PHASE, delay_ms: WAITING_TIME_MS },
            Command::emit_all(OutboundEvent::BlindMapPhaseTransition(BlindMapPhaseTransition {
                phase: BlindMapPhase::Locate,
                active_team,
                starts_at: now_ms(),
            })),
        ]
    }

    fn finish(&self, session: &mut Session) -> Vec<Command> {
        let is_team_mode = session.is_team_mode;
        let phase = question_mut(session).and_then(|q| q.phase);

        // A whole-question timeout behaves differently in team mode
        // depending on which leg of the locate phase it interrupts. The
        // anagram phase and free-for-all just close out with whatever
        // results already stand.
        if is_team_mode {
            if phase == Some(BlindMapPhase::Locate) {
                // The first team's captain never locked in a guess: hand
                // the turn to the other team instead of ending blank, the
                // same as an explicit miss.
                if let Some(q) = question_mut(session) {
                    if let Some(active) = q.active_team {
                        q.active_team = Some(active.other());
                        q.phase = Some(BlindMapPhase::SecondLocate);
                        let active_team = q.active_team;
                        return vec![
                            Command::ArmTimer { id: timers::PRIMARY, delay_ms: WAITING_TIME_MS },
                            Command::emit_all(OutboundEvent::BlindMapPhaseTransition(BlindMapPhaseTransition {
                                phase: BlindMapPhase::SecondLocate,
                                active_team,
                                starts_at: now_ms(),
                            })),
                        ];
                    }
                }
            } else if phase == Some(BlindMapPhase::SecondLocate) {
                // The second team's captain never locked in a guess either:
                // finalize, awarding the closer captain if both submitted
                // (both_missed is handled on submit) or a neutral result if
                // one side never showed up at all.
                let mut commands = self.award_closer_captain(session);
                if let Some(q) = question_mut(session) {
                    q.completed = true;
                }
                commands.push(Command::AdvanceQuestion);
                return commands;
            }
        }

        if let Some(q) = question_mut(session) {
            q.completed = true;
        }
        vec![Command::AdvanceQuestion]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::question::{BlindMapQuestion, Question};
    use protocol::RadiusPreset;

    fn session_with_blind_map() -> Session {
        let mut session = Session::new();
        session.add_player("alice".into());
        session.add_player("bob".into());
        session.questions.push(Question {
            length_seconds: 20,
            category: "geography".into(),
            kind: QuestionKind::BlindMap(BlindMapQuestion {
                city_name: "Prague".into(),
                anagram: "GUPERA".into(),
                location_x: 0.5,
                location_y: 0.5,
                map_type: "europe".into(),
                radius_preset: Some(RadiusPreset::Easy),
                ..Default::default()
            }),
        });
        session.current_index = Some(0);
        session.question_start_ms = Some(now_ms());
        session
    }

    #[test]
    fn solving_the_anagram_awards_points_and_records_order() {
        let mut session = session_with_blind_map();
        let handler = BlindMapHandler;
        handler.initialize(&mut session);
        handler.on_event(&mut session, InboundEvent::SubmitBlindMapAnagram { player_name: "alice".into(), answer: "prague".into() });
        assert!(session.players["alice"].score > 0);
        let q = question_mut(&mut session).unwrap();
        assert_eq!(q.solved_order, vec!["alice".to_string()]);
    }

    #[test]
    fn wrong_anagram_guess_awards_nothing() {
        let mut session = session_with_blind_map();
        let handler = BlindMapHandler;
        handler.initialize(&mut session);
        handler.on_event(&mut session, InboundEvent::SubmitBlindMapAnagram { player_name: "alice".into(), answer: "berlin".into() });
        assert_eq!(session.players["alice"].score, 0);
    }

    #[test]
    fn locating_near_the_answer_scores_inside_the_radius() {
        let mut session = session_with_blind_map();
        let handler = BlindMapHandler;
        handler.begin_locate_phase(&mut session);
        handler.on_event(&mut session, InboundEvent::SubmitBlindMapLocation { player_name: "alice".into(), x: 0.505, y: 0.5, question_id: "q0".into() });
        assert!(session.players["alice"].score > 0);
    }

    #[test]
    fn locating_far_from_the_answer_scores_nothing() {
        let mut session = session_with_blind_map();
        let handler = BlindMapHandler;
        handler.begin_locate_phase(&mut session);
        handler.on_event(&mut session, InboundEvent::SubmitBlindMapLocation { player_name: "alice".into(), x: 0.0, y: 0.0, question_id: "q0".into() });
        assert_eq!(session.players["alice"].score, 0);
    }

    fn team_session_with_blind_map() -> Session {
        let mut session = session_with_blind_map();
        session.is_team_mode = true;
        session.players.get_mut("alice").unwrap().team = Some(Team::Blue);
        session.players.get_mut("alice").unwrap().is_captain = true;
        session.players.get_mut("bob").unwrap().team = Some(Team::Red);
        session.players.get_mut("bob").unwrap().is_captain = true;
        session
    }

    #[test]
    fn when_both_captains_miss_the_closer_team_still_scores() {
        let mut session = team_session_with_blind_map();
        let handler = BlindMapHandler;
        handler.begin_locate_phase(&mut session);
        handler.on_event(&mut session, InboundEvent::SubmitBlindMapLocation { player_name: "alice".into(), x: 0.9, y: 0.9, question_id: "q0".into() });
        handler.on_event(&mut session, InboundEvent::SubmitBlindMapLocation { player_name: "bob".into(), x: 0.8, y: 0.8, question_id: "q0".into() });
        assert_eq!(session.team_scores.get(Team::Blue), 0);
        assert_eq!(session.team_scores.get(Team::Red), MAP_PHASE_POINTS);
    }

    #[test]
    fn time_up_during_the_first_teams_turn_hands_it_to_the_other_team() {
        let mut session = team_session_with_blind_map();
        let handler = BlindMapHandler;
        handler.begin_locate_phase(&mut session);
        let commands = handler.finish(&mut session);
        let q = question_mut(&mut session).unwrap();
        assert_eq!(q.phase, Some(BlindMapPhase::SecondLocate));
        assert_eq!(q.active_team, Some(Team::Red));
        assert!(!commands.iter().any(|c| matches!(c, Command::AdvanceQuestion)));
    }

    #[test]
    fn time_up_during_the_second_teams_turn_with_no_submission_ends_neutrally() {
        let mut session = team_session_with_blind_map();
        let handler = BlindMapHandler;
        handler.begin_locate_phase(&mut session);
        handler.on_event(&mut session, InboundEvent::SubmitBlindMapLocation { player_name: "alice".into(), x: 0.9, y: 0.9, question_id: "q0".into() });
        let commands = handler.finish(&mut session);
        assert_eq!(session.team_scores.get(Team::Blue), 0);
        assert_eq!(session.team_scores.get(Team::Red), 0);
        assert!(commands.iter().any(|c| matches!(c, Command::AdvanceQuestion)));
    }
}
