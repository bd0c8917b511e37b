//! DRAWING (spec.md §4.10): one player picks a word and draws it while
//! everyone else guesses. Scoring favors fast correct guesses the same way
//! OPEN_ANSWER does, plus a completion bonus for the drawer once at least
//! one guesser gets it.

use std::collections::HashMap;

use engine_core::clock::{now_ms, TimerId};
use engine_core::traits::TypeHandler;
use protocol::outbound::{AllAnswersReceived, AnswerCorrectness, ErrorPayload, Feedback, LetterRevealed, WordSelected};
use protocol::tunables::{DRAWER_COMPLETION_BONUS, POINTS_FOR_CORRECT_ANSWER};
use protocol::{InboundEvent, OutboundEvent, RoomTarget};
use serde_json::{json, Value};

use crate::question::{DrawingQuestion, PlayerAnswer, QuestionKind};
use crate::scoring::{classify_open_answer, mask_word, similarity_ratio, speed_bonus, AnswerVerdict};
use crate::session::Session;
use crate::timers;
use crate::Command;

pub struct DrawingHandler;

fn question_mut(session: &mut Session) -> Option<&mut DrawingQuestion> {
    match &mut session.current_question_mut()?.kind {
        QuestionKind::Drawing(q) => Some(q),
        _ => None,
    }
}

fn error(player_name: &str, message: &str) -> Vec<Command> {
    vec![Command::emit_player(player_name, OutboundEvent::Error(ErrorPayload { error: message.to_string() }))]
}

impl TypeHandler<Session, InboundEvent, OutboundEvent> for DrawingHandler {
    fn initialize(&self, session: &mut Session) -> Vec<Command> {
        let Some(question) = session.current_question() else {
            return Vec::new();
        };
        vec![Command::ArmTimer { id: timers::PRIMARY, delay_ms: question.length_ms() }]
    }

    fn on_event(&self, session: &mut Session, event: InboundEvent) -> Vec<Command> {
        match event {
            InboundEvent::SelectDrawingWord { player_name, selected_word, is_late_selection } => {
                self.select_word(session, player_name, selected_word, is_late_selection)
            }
            InboundEvent::DrawingUpdate { player_name, drawing_data, action } => {
                self.relay_stroke(session, player_name, drawing_data, action)
            }
            InboundEvent::SubmitDrawingAnswer { player_name, answer, answer_time } => {
                self.submit_answer(session, player_name, answer, answer_time)
            }
            InboundEvent::RevealDrawingLetter => self.reveal_letter(session),
            InboundEvent::GetCurrentDrawingWord => Vec::new(),
            _ => Vec::new(),
        }
    }

    fn on_time_up(&self, session: &mut Session, timer_id: TimerId) -> Vec<Command> {
        if timer_id != timers::PRIMARY {
            return Vec::new();
        }
        if let Some(q) = question_mut(session) {
            q.completed = true;
        }
        self.emit_results(session)
    }
}

impl DrawingHandler {
    /// spec.md §4.9: shared by both natural timeout and early completion —
    /// sorted attempts plus the drawer's own stats.
    fn emit_results(&self, session: &mut Session) -> Vec<Command> {
        let Some((drawer, drawer_team, selected_word, mut attempts, drawer_points_earned, is_late)) =
            session.current_question().and_then(|q| match &q.kind {
                QuestionKind::Drawing(d) => Some((
                    d.drawer.clone(),
                    d.team,
                    d.selected_word.clone().unwrap_or_default(),
                    d.drawing_stats.clone(),
                    d.drawer_points_earned,
                    d.is_late_selection,
                )),
                _ => None,
            })
        else {
            return vec![Command::AdvanceQuestion];
        };

        attempts.sort_by(|a, b| {
            b.is_correct.cmp(&a.is_correct).then_with(|| {
                let sim_a = similarity_ratio(&a.answer, &selected_word);
                let sim_b = similarity_ratio(&b.answer, &selected_word);
                sim_a.partial_cmp(&sim_b).unwrap_or(std::cmp::Ordering::Equal)
            })
        });
        let correct_count = attempts.iter().filter(|a| a.is_correct).count();
        let total_guessers = session.players.keys().filter(|n| **n != drawer).count();

        let is_team_mode = session.is_team_mode;
        let drawer_total_points = if is_team_mode {
            drawer_team.map(|t| session.team_scores.get(t)).unwrap_or(0)
        } else {
            session.players.get(&drawer).map(|p| p.score).unwrap_or(0)
        };

        let player_answers: Vec<Value> = attempts
            .iter()
            .map(|a| json!({"player_name": a.player_name, "answer": a.answer, "is_correct": a.is_correct, "player_color": a.player_color}))
            .collect();
        let scores = json!(session.players.iter().map(|(n, p)| (n.clone(), p.score)).collect::<HashMap<_, _>>());
        let mut extra = HashMap::new();
        extra.insert("player_answers".to_string(), json!(player_answers));
        extra.insert(
            "drawer_stats".to_string(),
            json!({
                "pointsEarned": drawer_points_earned,
                "totalPoints": drawer_total_points,
                "correct_count": correct_count,
                "total_guessers": total_guessers,
                "is_late_selection": is_late,
            }),
        );
        extra.insert("drawer".to_string(), json!(drawer));

        vec![
            Command::emit_all(OutboundEvent::AllAnswersReceived(AllAnswersReceived {
                scores,
                correct_answer: json!(selected_word),
                answer_counts: None,
                show_question_preview_at: now_ms() + 1,
                show_buttons_at: now_ms() + 1,
                extra,
            })),
            Command::AdvanceQuestion,
        ]
    }
}

impl DrawingHandler {
    fn select_word(&self, session: &mut Session, player_name: String, selected_word: String, is_late_selection: bool) -> Vec<Command> {
        let Some(q) = question_mut(session) else {
            return error(&player_name, "no active drawing question");
        };
        if q.drawer != player_name {
            return error(&player_name, "only the drawer selects the word");
        }
        if !q.words.iter().any(|w| w.eq_ignore_ascii_case(&selected_word)) {
            return error(&player_name, "not one of the offered words");
        }
        q.selected_word = Some(selected_word.clone());
        q.is_late_selection = is_late_selection;
        let drawer = q.drawer.clone();
        let mask = mask_word(&selected_word, &std::collections::HashSet::new());

        // spec.md §4.9: broadcast the masked version first, then privately
        // overwrite the drawer's own view with the full word.
        vec![
            Command::emit_all(OutboundEvent::WordSelected(WordSelected { masked_word: mask })),
            Command::emit(
                RoomTarget::Player(drawer),
                OutboundEvent::WordSelected(WordSelected { masked_word: selected_word }),
            ),
        ]
    }

    fn relay_stroke(&self, session: &mut Session, player_name: String, drawing_data: serde_json::Value, action: String) -> Vec<Command> {
        let is_drawer = question_mut(session).map(|q| q.drawer == player_name).unwrap_or(false);
        if !is_drawer {
            return error(&player_name, "only the drawer can draw");
        }
        vec![Command::emit_all(OutboundEvent::DrawingUpdateBroadcast(json!({
            "drawing_data": drawing_data,
            "action": action,
        })))]
    }

    fn submit_answer(&self, session: &mut Session, player_name: String, answer: String, answer_time: i64) -> Vec<Command> {
        if !session.has_player(&player_name) {
            return error(&player_name, "unknown player");
        }
        let start_ms = session.question_start_ms.unwrap_or_else(now_ms);
        let length_ms = session.current_question().map(|q| q.length_ms()).unwrap_or(0);
        let player_color = session.players.get(&player_name).map(|p| p.color.clone()).unwrap_or_default();
        let is_team_mode = session.is_team_mode;
        let player_team = session.team_of(&player_name);
        let all_names: Vec<String> = session.players.keys().cloned().collect();

        let Some(q) = question_mut(session) else {
            return error(&player_name, "no active drawing question");
        };
        if q.drawer == player_name {
            return error(&player_name, "the drawer cannot guess");
        }
        if q.correct_guessers.contains(&player_name) {
            return error(&player_name, "already guessed correctly");
        }
        // spec.md §4.9: in team mode only players on the drawer's team may
        // guess at all.
        if is_team_mode && player_team != q.team {
            return vec![Command::emit_player(
                player_name,
                OutboundEvent::DrawingAnswerFeedback(Feedback { message: "Only players on the drawer's team can guess.".into() }),
            )];
        }
        let Some(expected) = q.selected_word.clone() else {
            return error(&player_name, "the word hasn't been chosen yet");
        };
        let drawer = q.drawer.clone();
        let is_late = q.is_late_selection;

        let verdict = classify_open_answer(&answer, &expected);
        let is_correct = matches!(verdict, AnswerVerdict::Correct);

        q.drawing_stats.push(PlayerAnswer { player_name: player_name.clone(), answer, is_correct, player_color });

        if is_correct {
            q.correct_guessers.insert(player_name.clone());
        }
        let correct_count = q.correct_guessers.len();
        let non_drawer_count = all_names.iter().filter(|n| **n != drawer).count();
        // free-for-all needs every non-drawer correct; team mode needs one
        // correct guess from the drawer's own team.
        let required_correct = if is_team_mode { 1 } else { non_drawer_count };
        let already_completed = q.completed;
        let all_guessed = !already_completed && correct_count >= required_correct.max(1);
        if all_guessed {
            q.completed = true;
        }

        let mut commands = vec![Command::emit_all(OutboundEvent::DrawingAnswerSubmitted(json!({
            "player_count": non_drawer_count,
            "correct_count": correct_count,
            "player_name": player_name,
        })))];

        if is_correct {
            let elapsed = (answer_time - start_ms).max(0) as u64;
            let points = speed_bonus(POINTS_FOR_CORRECT_ANSWER, elapsed, length_ms);
            if is_team_mode {
                if let Some(team) = player_team {
                    session.team_scores.add(team, points);
                    let total_points = session.team_scores.get(team);
                    commands.push(Command::emit(
                        RoomTarget::Team(team),
                        OutboundEvent::AnswerCorrectness(AnswerCorrectness {
                            correct: true,
                            points_earned: points,
                            total_points,
                            is_team_score: true,
                        }),
                    ));
                }
            } else {
                session.award(&player_name, points);
                let total_points = session.players.get(&player_name).map(|p| p.score).unwrap_or(0);
                commands.push(Command::emit_player(
                    player_name.clone(),
                    OutboundEvent::AnswerCorrectness(AnswerCorrectness {
                        correct: true,
                        points_earned: points,
                        total_points,
                        is_team_score: false,
                    }),
                ));

                let total_guessers = non_drawer_count.max(1) as i64;
                let mut points_per_guess = POINTS_FOR_CORRECT_ANSWER / total_guessers;
                if is_late {
                    points_per_guess /= 2;
                }
                session.award(&drawer, points_per_guess);
                if let Some(q) = question_mut(session) {
                    q.drawer_points_earned += points_per_guess;
                }
            }
        } else {
            let feedback_message = match verdict {
                AnswerVerdict::Correct => "Correct!",
                AnswerVerdict::Close => "Close, but not quite.",
                AnswerVerdict::Incorrect => "Not quite.",
            };
            commands.push(Command::emit_player(
                player_name,
                OutboundEvent::DrawingAnswerFeedback(Feedback { message: feedback_message.to_string() }),
            ));
        }

        if all_guessed {
            if !is_team_mode {
                let mut bonus = DRAWER_COMPLETION_BONUS;
                if is_late {
                    bonus /= 2;
                }
                session.award(&drawer, bonus);
                if let Some(q) = question_mut(session) {
                    q.drawer_points_earned += bonus;
                }
            }
            commands.push(Command::ArmTimer { id: timers::PRIMARY, delay_ms: 0 });
        }
        commands
    }

    fn reveal_letter(&self, session: &mut Session) -> Vec<Command> {
        let Some(q) = question_mut(session) else {
            return Vec::new();
        };
        let Some(word) = q.selected_word.clone() else {
            return Vec::new();
        };
        let next_index = word.chars().enumerate().find(|(i, c)| !c.is_whitespace() && !q.revealed_positions.contains(i)).map(|(i, _)| i);
        let Some(index) = next_index else {
            return Vec::new();
        };
        q.revealed_positions.insert(index);
        vec![Command::emit_all(OutboundEvent::DrawingLetterRevealed(LetterRevealed {
            revealed_positions: q.revealed_positions.iter().copied().collect(),
            mask: mask_word(&word, &q.revealed_positions),
        }))]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::question::{DrawingQuestion, Question};

    fn session_with_drawing() -> Session {
        let mut session = Session::new();
        session.add_player("alice".into());
        session.add_player("bob".into());
        session.questions.push(Question {
            length_seconds: 30,
            category: "general".into(),
            kind: QuestionKind::Drawing(DrawingQuestion { drawer: "alice".into(), words: vec!["dog".into(), "cat".into()], ..Default::default() }),
        });
        session.current_index = Some(0);
        session.question_start_ms = Some(now_ms());
        session
    }

    #[test]
    fn non_drawer_cannot_select_the_word() {
        let mut session = session_with_drawing();
        let h = DrawingHandler;
        let commands = h.select_word(&mut session, "bob".into(), "dog".into(), false);
        assert_eq!(commands.len(), 1);
        assert!(question_mut(&mut session).unwrap().selected_word.is_none());
    }

    #[test]
    fn correct_guess_scores_guesser_and_drawer() {
        let mut session = session_with_drawing();
        let h = DrawingHandler;
        h.select_word(&mut session, "alice".into(), "dog".into(), false);
        let now = now_ms();
        h.submit_answer(&mut session, "bob".into(), "dog".into(), now);
        assert!(session.players["bob"].score > 0);
        assert!(session.players["alice"].score > 0);
    }

    #[test]
    fn team_mode_rejects_cross_team_guesses() {
        let mut session = session_with_drawing();
        session.is_team_mode = true;
        session.add_player("carol".into());
        session.players.get_mut("alice").unwrap().team = Some(protocol::Team::Blue);
        session.players.get_mut("bob").unwrap().team = Some(protocol::Team::Red);
        session.players.get_mut("carol").unwrap().team = Some(protocol::Team::Blue);
        question_mut(&mut session).unwrap().team = Some(protocol::Team::Blue);
        let h = DrawingHandler;
        h.select_word(&mut session, "alice".into(), "dog".into(), false);
        let now = now_ms();
        h.submit_answer(&mut session, "bob".into(), "dog".into(), now);
        assert_eq!(session.team_scores.get(protocol::Team::Red), 0);
    }

    #[test]
    fn team_mode_credits_only_the_drawers_team() {
        let mut session = session_with_drawing();
        session.is_team_mode = true;
        session.players.get_mut("alice").unwrap().team = Some(protocol::Team::Blue);
        session.players.get_mut("bob").unwrap().team = Some(protocol::Team::Blue);
        question_mut(&mut session).unwrap().team = Some(protocol::Team::Blue);
        let h = DrawingHandler;
        h.select_word(&mut session, "alice".into(), "dog".into(), false);
        let now = now_ms();
        h.submit_answer(&mut session, "bob".into(), "dog".into(), now);
        assert!(session.team_scores.get(protocol::Team::Blue) > 0);
        assert_eq!(session.players["bob"].score, 0);
    }
}
