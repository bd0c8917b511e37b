//! Canonical game state (spec.md §3), owned exclusively by the dispatcher
//! actor. No handler holds a reference across an `.await` point — every
//! mutation happens inside a single synchronous `TypeHandler` call, which is
//! what lets this struct skip interior mutability entirely, unlike the
//! teacher's `Room` (shared behind the lobby's channel pair because several
//! relay tasks touch it concurrently).

use std::collections::HashMap;

use protocol::tunables::COLOR_PALETTE;
use protocol::Team;

use crate::question::Question;

#[derive(Debug, Clone)]
pub struct Player {
    pub color: String,
    pub score: i64,
    pub team: Option<Team>,
    pub is_captain: bool,
}

impl Player {
    fn new(color: String) -> Self {
        Player {
            color,
            score: 0,
            team: None,
            is_captain: false,
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct TeamScores {
    pub blue: i64,
    pub red: i64,
}

impl TeamScores {
    pub fn get(&self, team: Team) -> i64 {
        match team {
            Team::Blue => self.blue,
            Team::Red => self.red,
        }
    }

    pub fn add(&mut self, team: Team, points: i64) {
        match team {
            Team::Blue => self.blue += points,
            Team::Red => self.red += points,
        }
    }
}

/// The full state of one trivia lobby/game, per spec.md §3's invariant list.
pub struct Session {
    pub players: HashMap<String, Player>,
    pub available_colors: Vec<String>,

    pub is_team_mode: bool,
    pub is_remote_connected: bool,
    pub is_quiz_active: bool,
    pub is_game_running: bool,

    pub blue_team: Vec<String>,
    pub red_team: Vec<String>,
    pub team_scores: TeamScores,

    pub questions: Vec<Question>,
    pub current_index: Option<usize>,
    pub question_start_ms: Option<i64>,
}

impl Default for Session {
    fn default() -> Self {
        Session::new()
    }
}

impl Session {
    pub fn new() -> Self {
        Session {
            players: HashMap::new(),
            available_colors: COLOR_PALETTE.iter().map(|s| s.to_string()).collect(),
            is_team_mode: false,
            is_remote_connected: false,
            is_quiz_active: false,
            is_game_running: false,
            blue_team: Vec::new(),
            red_team: Vec::new(),
            team_scores: TeamScores::default(),
            questions: Vec::new(),
            current_index: None,
            question_start_ms: None,
        }
    }

    /// Resets everything back to an empty lobby (spec.md §4.2 `reset`),
    /// keeping no player or score state across games.
    pub fn reset(&mut self) {
        *self = Session::new();
    }

    pub fn player_count(&self) -> usize {
        self.players.len()
    }

    pub fn has_player(&self, name: &str) -> bool {
        self.players.contains_key(name)
    }

    /// Assigns the next available color and inserts the player, returning
    /// the color assigned. Caller is expected to have already checked
    /// `available_colors` is non-empty and the lobby has room.
    pub fn add_player(&mut self, name: String) -> String {
        let color = self.available_colors.remove(0);
        self.players.insert(name, Player::new(color.clone()));
        color
    }

    pub fn remove_player(&mut self, name: &str) -> Option<Player> {
        let player = self.players.remove(name)?;
        self.blue_team.retain(|n| n != name);
        self.red_team.retain(|n| n != name);
        self.available_colors.push(player.color.clone());
        Some(player)
    }

    pub fn rename_player(&mut self, old_name: &str, new_name: String) {
        if let Some(player) = self.players.remove(old_name) {
            for roster in [&mut self.blue_team, &mut self.red_team] {
                if let Some(slot) = roster.iter_mut().find(|n| *n == old_name) {
                    *slot = new_name.clone();
                }
            }
            self.players.insert(new_name, player);
        }
    }

    pub fn team_of(&self, name: &str) -> Option<Team> {
        self.players.get(name).and_then(|p| p.team)
    }

    pub fn roster(&self, team: Team) -> &[String] {
        match team {
            Team::Blue => &self.blue_team,
            Team::Red => &self.red_team,
        }
    }

    pub fn award(&mut self, name: &str, points: i64) {
        if let Some(player) = self.players.get_mut(name) {
            player.score += points;
            if let Some(team) = player.team {
                self.team_scores.add(team, points);
            }
        }
    }

    pub fn current_question(&self) -> Option<&Question> {
        self.current_index.and_then(|i| self.questions.get(i))
    }

    pub fn current_question_mut(&mut self) -> Option<&mut Question> {
        self.current_index.and_then(move |i| self.questions.get_mut(i))
    }

    pub fn is_last_question(&self) -> bool {
        match self.current_index {
            Some(i) => i + 1 >= self.questions.len(),
            None => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn adding_a_player_assigns_the_first_available_color() {
        let mut session = Session::new();
        let color = session.add_player("alice".into());
        assert_eq!(color, COLOR_PALETTE[0]);
        assert!(session.has_player("alice"));
        assert!(!session.available_colors.contains(&color));
    }

    #[test]
    fn removing_a_player_returns_their_color_to_the_pool() {
        let mut session = Session::new();
        session.add_player("alice".into());
        let before = session.available_colors.len();
        session.remove_player("alice");
        assert_eq!(session.available_colors.len(), before + 1);
        assert!(!session.has_player("alice"));
    }

    #[test]
    fn renaming_preserves_score_and_team_slot() {
        let mut session = Session::new();
        session.add_player("alice".into());
        session.blue_team.push("alice".into());
        session.award("alice", 50);
        session.rename_player("alice", "alicia".into());
        assert!(!session.has_player("alice"));
        assert_eq!(session.players.get("alicia").unwrap().score, 50);
        assert_eq!(session.blue_team, vec!["alicia".to_string()]);
    }

    #[test]
    fn awarding_points_to_a_teamed_player_also_credits_the_team() {
        let mut session = Session::new();
        session.add_player("alice".into());
        session.players.get_mut("alice").unwrap().team = Some(Team::Blue);
        session.award("alice", 30);
        assert_eq!(session.players["alice"].score, 30);
        assert_eq!(session.team_scores.get(Team::Blue), 30);
    }

    #[test]
    fn reset_clears_every_field() {
        let mut session = Session::new();
        session.add_player("alice".into());
        session.is_game_running = true;
        session.reset();
        assert_eq!(session.player_count(), 0);
        assert!(!session.is_game_running);
        assert_eq!(session.available_colors.len(), COLOR_PALETTE.len());
    }
}
