//! WORD_CHAIN (spec.md §4.8): players take turns extending a chain of
//! words, each new word starting with the previous word's last letter. A
//! hidden "bomb" timer, restarted with a new random duration after every
//! explosion, eliminates whoever is holding the turn when it goes off;
//! everyone else still standing banks a survival bonus.
//!
//! Grounded on `original_source/flask-server/app/socketio_events/
//! word_chain_events.py`: `submit_word_chain_word`'s validation order
//! (turn -> length -> not already used -> starts with the current letter
//! -> real word), `get_next_player`'s skip-the-eliminated rotation, and
//! `get_last_valid_letter`'s fold-then-reject-invalid-endings rule (see
//! `engine_core::dictionary::next_chain_letter`).

use std::sync::Arc;

use engine_core::clock::{now_ms, TimerId};
use engine_core::dictionary::{is_valid_chain_letter, next_chain_letter, starts_with_letter, Dictionary};
use engine_core::traits::TypeHandler;
use protocol::outbound::{ErrorPayload, Feedback, WordChainUpdate};
use protocol::tunables::{POINTS_FOR_LETTER, POINTS_FOR_SURVIVING_BOMB, WORD_CHAIN_BOMB_MAX_SECS, WORD_CHAIN_BOMB_MIN_SECS, WORD_CHAIN_MIN_WORD_LEN};
use protocol::{InboundEvent, OutboundEvent};
use rand::Rng;
use serde_json::json;

use crate::question::{ChainEntry, QuestionKind, WordChainQuestion};
use crate::session::Session;
use crate::timers;
use crate::Command;

pub struct WordChainHandler {
    pub dictionary: Arc<Dictionary>,
}

fn question_mut(session: &mut Session) -> Option<&mut WordChainQuestion> {
    match &mut session.current_question_mut()?.kind {
        QuestionKind::WordChain(q) => Some(q),
        _ => None,
    }
}

fn error(player_name: &str, message: &str) -> Vec<Command> {
    vec![Command::emit_player(player_name, OutboundEvent::Error(ErrorPayload { error: message.to_string() }))]
}

fn update_event(q: &WordChainQuestion) -> Command {
    Command::emit_all(OutboundEvent::WordChainUpdate(WordChainUpdate {
        chain: q.word_chain.iter().map(|e| e.word.clone()).collect(),
        current_letter: q.current_letter.to_string(),
        current_player: q.current_player.clone(),
        eliminated: q.eliminated_players.iter().cloned().collect(),
    }))
}

fn random_letter() -> char {
    let mut rng = rand::thread_rng();
    loop {
        let c = (b'a' + rng.gen_range(0..26)) as char;
        if is_valid_chain_letter(c) {
            return c;
        }
    }
}

fn random_bomb_duration_ms() -> u64 {
    let mut rng = rand::thread_rng();
    rng.gen_range(WORD_CHAIN_BOMB_MIN_SECS..=WORD_CHAIN_BOMB_MAX_SECS) * 1_000
}

impl TypeHandler<Session, InboundEvent, OutboundEvent> for WordChainHandler {
    fn initialize(&self, session: &mut Session) -> Vec<Command> {
        let length_ms = session.current_question().map(|q| q.length_ms()).unwrap_or(0);
        let bomb_ms = question_mut(session).map(|q| q.bomb_duration_ms).unwrap_or_else(random_bomb_duration_ms);
        let mut commands = vec![
            Command::ArmTimer { id: timers::PRIMARY, delay_ms: length_ms },
            Command::ArmTimer { id: timers::WORD_CHAIN_BOMB, delay_ms: bomb_ms },
        ];
        if let Some(q) = question_mut(session) {
            commands.insert(0, update_event(q));
        }
        commands
    }

    fn on_event(&self, session: &mut Session, event: InboundEvent) -> Vec<Command> {
        match event {
            InboundEvent::StartWordChain => {
                let Some(q) = question_mut(session) else { return Vec::new() };
                vec![update_event(q)]
            }
            InboundEvent::SubmitWordChainWord { player_name, word } => self.submit_word(session, player_name, word),
            InboundEvent::WordChainTimeout { player } => self.eliminate(session, &player, 0),
            _ => Vec::new(),
        }
    }

    fn on_time_up(&self, session: &mut Session, timer_id: TimerId) -> Vec<Command> {
        if timer_id == timers::WORD_CHAIN_BOMB {
            let holder = question_mut(session).map(|q| q.current_player.clone()).unwrap_or_default();
            return self.detonate(session, &holder);
        }
        if timer_id == timers::PRIMARY {
            if let Some(q) = question_mut(session) {
                q.completed = true;
            }
            return vec![Command::AdvanceQuestion];
        }
        Vec::new()
    }
}

impl WordChainHandler {
    fn submit_word(&self, session: &mut Session, player_name: String, word: String) -> Vec<Command> {
        if !session.has_player(&player_name) {
            return error(&player_name, "unknown player");
        }
        let team = session.team_of(&player_name);
        let Some(q) = question_mut(session) else {
            return error(&player_name, "no active word-chain question");
        };
        if q.current_player != player_name {
            return error(&player_name, "it is not your turn");
        }
        let lowered = word.trim().to_lowercase();
        if lowered.chars().count() < WORD_CHAIN_MIN_WORD_LEN {
            return vec![Command::emit_player(player_name, OutboundEvent::WordChainFeedback(Feedback { message: "too short".into() }))];
        }
        if q.used_words.contains(&lowered) {
            return vec![Command::emit_player(player_name, OutboundEvent::WordChainFeedback(Feedback { message: "already used".into() }))];
        }
        if !starts_with_letter(&lowered, q.current_letter) {
            return vec![Command::emit_player(
                player_name,
                OutboundEvent::WordChainFeedback(Feedback { message: format!("must start with {}", q.current_letter) }),
            )];
        }
        if !self.dictionary.contains(&lowered) {
            return vec![Command::emit_player(player_name, OutboundEvent::WordChainFeedback(Feedback { message: "not a real word".into() }))];
        }

        let word_len = lowered.chars().count() as i64;
        q.used_words.insert(lowered.clone());
        q.word_chain.push(ChainEntry { word: lowered.clone(), player: player_name.clone(), team });
        q.current_letter = next_chain_letter(&lowered, random_letter);
        // spec.md §4.8: free-for-all words bank per-letter points; team mode
        // scores nothing per word, the bomb survival bonus decides instead.
        if !session.is_team_mode {
            let points = word_len * POINTS_FOR_LETTER;
            session.award(&player_name, points);
            if let Some(q) = question_mut(session) {
                *q.game_points.entry(player_name.clone()).or_insert(0) += points;
            }
        }
        self.advance_turn(session);

        let mut commands = vec![Command::emit_player(player_name, OutboundEvent::WordChainFeedback(Feedback { message: "accepted".into() }))];
        if let Some(q) = question_mut(session) {
            commands.push(update_event(q));
        }
        commands
    }

    /// Moves `current_player` to the next non-eliminated entry in
    /// `player_order`, wrapping around.
    fn advance_turn(&self, session: &mut Session) {
        let Some(q) = question_mut(session) else { return };
        if q.player_order.is_empty() {
            return;
        }
        let current_pos = q.player_order.iter().position(|p| *p == q.current_player).unwrap_or(0);
        for step in 1..=q.player_order.len() {
            let idx = (current_pos + step) % q.player_order.len();
            let candidate = &q.player_order[idx];
            if !q.eliminated_players.contains(candidate) {
                q.current_player = candidate.clone();
                return;
            }
        }
    }

    fn eliminate(&self, session: &mut Session, player: &str, bonus_for_survivors: i64) -> Vec<Command> {
        let Some(q) = question_mut(session) else { return Vec::new() };
        if q.eliminated_players.contains(player) {
            return Vec::new();
        }
        q.eliminated_players.insert(player.to_string());
        let was_current = q.current_player == player;
        let survivors: Vec<String> = q.player_order.iter().filter(|p| !q.eliminated_players.contains(*p)).cloned().collect();

        if was_current {
            self.advance_turn(session);
        }

        if bonus_for_survivors != 0 {
            for survivor in &survivors {
                session.award(survivor, bonus_for_survivors);
            }
        }

        let remaining = survivors.len();
        let mut commands = Vec::new();
        if let Some(q) = question_mut(session) {
            commands.push(update_event(q));
        }
        if remaining <= 1 {
            if let Some(q) = question_mut(session) {
                q.completed = true;
            }
            commands.push(Command::AdvanceQuestion);
        }
        commands
    }

    /// The bomb detonates on whoever currently holds the turn. Free-for-all:
    /// they're eliminated, every other surviving player banks the survival
    /// bonus, and (if more than one player remains) a fresh bomb starts
    /// ticking. Team mode: the holder's team "explodes" and the round ends
    /// immediately, with the other team's score banking the survival bonus
    /// (spec.md §4.8 `time_up` team-mode semantics).
    fn detonate(&self, session: &mut Session, holder: &str) -> Vec<Command> {
        if session.is_team_mode {
            return self.team_explode(session, holder);
        }
        let mut commands = self.eliminate(session, holder, POINTS_FOR_SURVIVING_BOMB);
        let still_running = session
            .current_question()
            .map(|q| matches!(&q.kind, QuestionKind::WordChain(w) if !w.completed))
            .unwrap_or(false);
        if still_running {
            commands.push(Command::ArmTimer { id: timers::WORD_CHAIN_BOMB, delay_ms: random_bomb_duration_ms() });
        }
        commands
    }

    fn team_explode(&self, session: &mut Session, holder: &str) -> Vec<Command> {
        let exploded_team = session.team_of(holder);
        let chain: Vec<String> = question_mut(session).map(|q| q.word_chain.iter().map(|e| e.word.clone()).collect()).unwrap_or_default();
        if let Some(q) = question_mut(session) {
            q.eliminated_players.insert(holder.to_string());
            q.completed = true;
        }
        let winning_team = exploded_team.map(|t| t.other());
        if let Some(winning_team) = winning_team {
            session.team_scores.add(winning_team, POINTS_FOR_SURVIVING_BOMB);
        }
        vec![
            Command::emit_all(OutboundEvent::WordChainResults(json!({
                "exploded_team": exploded_team,
                "winning_team": winning_team,
                "exploded_player": holder,
                "chain": chain,
            }))),
            Command::AdvanceQuestion,
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::question::{Question, WordChainQuestion};

    fn session_with_chain(order: Vec<&str>) -> Session {
        let mut session = Session::new();
        for name in &order {
            session.add_player((*name).into());
        }
        session.questions.push(Question {
            length_seconds: 120,
            category: "general".into(),
            kind: QuestionKind::WordChain(WordChainQuestion {
                current_letter: 'p',
                player_order: order.iter().map(|s| s.to_string()).collect(),
                current_player: order[0].to_string(),
                bomb_duration_ms: 120_000,
                ..Default::default()
            }),
        });
        session.current_index = Some(0);
        session.question_start_ms = Some(now_ms());
        session
    }

    fn handler() -> WordChainHandler {
        WordChainHandler { dictionary: Arc::new(Dictionary::load("pes\nslon\nkocka\n")) }
    }

    #[test]
    fn accepted_word_advances_the_turn_and_letter() {
        let mut session = session_with_chain(vec!["alice", "bob"]);
        let h = handler();
        h.submit_word(&mut session, "alice".into(), "pes".into());
        let q = question_mut(&mut session).unwrap();
        assert_eq!(q.current_player, "bob");
        assert_eq!(q.current_letter, 's');
        assert!(q.used_words.contains("pes"));
    }

    #[test]
    fn wrong_turn_is_rejected() {
        let mut session = session_with_chain(vec!["alice", "bob"]);
        let h = handler();
        let commands = h.submit_word(&mut session, "bob".into(), "pes".into());
        assert_eq!(commands.len(), 1);
        let q = question_mut(&mut session).unwrap();
        assert_eq!(q.current_player, "alice");
    }

    #[test]
    fn elimination_skips_to_the_next_survivor() {
        let mut session = session_with_chain(vec!["alice", "bob", "carol"]);
        let h = handler();
        h.eliminate(&mut session, "alice", 0);
        let q = question_mut(&mut session).unwrap();
        assert_eq!(q.current_player, "bob");
    }

    #[test]
    fn last_survivor_completes_the_question() {
        let mut session = session_with_chain(vec!["alice", "bob"]);
        let h = handler();
        let commands = h.eliminate(&mut session, "alice", 0);
        let q = question_mut(&mut session).unwrap();
        assert!(q.completed);
        assert!(commands.iter().any(|c| matches!(c, Command::AdvanceQuestion)));
    }

    #[test]
    fn team_mode_words_earn_no_player_points() {
        let mut session = session_with_chain(vec!["alice", "bob"]);
        session.is_team_mode = true;
        session.blue_team.push("alice".into());
        session.players.get_mut("alice").unwrap().team = Some(protocol::Team::Blue);
        let h = handler();
        h.submit_word(&mut session, "alice".into(), "pes".into());
        assert_eq!(session.players["alice"].score, 0);
    }

    #[test]
    fn bomb_explosion_in_team_mode_ends_the_round_and_credits_the_other_team() {
        let mut session = session_with_chain(vec!["alice", "bob"]);
        session.is_team_mode = true;
        session.blue_team.push("alice".into());
        session.red_team.push("bob".into());
        session.players.get_mut("alice").unwrap().team = Some(protocol::Team::Blue);
        session.players.get_mut("bob").unwrap().team = Some(protocol::Team::Red);
        let h = handler();
        let commands = h.detonate(&mut session, "alice");
        assert_eq!(session.team_scores.get(protocol::Team::Red), POINTS_FOR_SURVIVING_BOMB);
        assert_eq!(session.team_scores.get(protocol::Team::Blue), 0);
        let q = question_mut(&mut session).unwrap();
        assert!(q.completed);
        assert!(commands.iter().any(|c| matches!(c, Command::AdvanceQuestion)));
    }
}
