//! Lobby controller (spec.md §4.2): the pre-game and between-games surface
//! — joining, renaming, leaving, activating team mode, and resetting back
//! to an empty lobby. Grounded on the shape of the teacher's
//! `relay-server/src/lobby.rs` `Room` mutations (join/leave update a
//! shared registry and immediately broadcast the new state), adapted from
//! "relay two peers" to "maintain N named players plus two team rosters".

use protocol::tunables::{MAX_PLAYERS, MIN_PLAYERS_PER_TEAM_TO_START, MIN_PLAYERS_TO_START, NAME_MAX_LEN, NAME_MIN_LEN};
use protocol::outbound::{ColorsUpdated, PlayerJoined, PlayerLeft, PlayerNameChanged};
use protocol::OutboundEvent;

use crate::error::EngineError;
use crate::session::Session;
use crate::Command;

fn validate_name(name: &str) -> Result<(), EngineError> {
    let len = name.chars().count();
    if !(NAME_MIN_LEN..=NAME_MAX_LEN).contains(&len) {
        return Err(EngineError::InvalidArgs(format!(
            "player name must be {NAME_MIN_LEN}-{NAME_MAX_LEN} characters"
        )));
    }
    Ok(())
}

pub fn join(session: &mut Session, player_name: String) -> Result<Vec<Command>, EngineError> {
    if session.is_game_running {
        return Err(EngineError::GameInProgress);
    }
    if session.player_count() >= MAX_PLAYERS {
        return Err(EngineError::Full);
    }
    validate_name(&player_name)?;
    if session.has_player(&player_name) {
        return Err(EngineError::NameTaken);
    }
    if session.available_colors.is_empty() {
        return Err(EngineError::ColorTaken);
    }

    let color = session.add_player(player_name.clone());
    Ok(vec![
        Command::emit_all(OutboundEvent::PlayerJoined(PlayerJoined {
            player_name,
            color,
        })),
        Command::emit_all(OutboundEvent::ColorsUpdated(ColorsUpdated {
            available_colors: session.available_colors.clone(),
        })),
    ])
}

pub fn rename(session: &mut Session, old_name: String, new_name: String) -> Result<Vec<Command>, EngineError> {
    if !session.has_player(&old_name) {
        return Err(EngineError::NotFound(old_name));
    }
    validate_name(&new_name)?;
    if old_name != new_name && session.has_player(&new_name) {
        return Err(EngineError::NameTaken);
    }

    session.rename_player(&old_name, new_name.clone());
    Ok(vec![Command::emit_all(OutboundEvent::PlayerNameChanged(PlayerNameChanged {
        old_name,
        new_name,
    }))])
}

pub fn player_leaving(session: &mut Session, player_name: String) -> Result<Vec<Command>, EngineError> {
    let removed = session.remove_player(&player_name);
    if removed.is_none() {
        return Err(EngineError::NotFound(player_name));
    }
    Ok(vec![
        Command::emit_all(OutboundEvent::PlayerLeft(PlayerLeft {
            player_name,
        })),
        Command::emit_all(OutboundEvent::ColorsUpdated(ColorsUpdated {
            available_colors: session.available_colors.clone(),
        })),
    ])
}

/// Assigns every current player to a team, alternating blue/red in join
/// order, each with the first joiner on each side as captain (spec.md
/// §4.2's team-assignment rule — the original always seats two captains
/// before dealing the rest of the roster out).
pub fn activate_team_mode(session: &mut Session) -> Result<(), EngineError> {
    if session.player_count() < MIN_PLAYERS_TO_START {
        return Err(EngineError::InvalidArgs("not enough players to start".into()));
    }
    let mut names: Vec<String> = session.players.keys().cloned().collect();
    names.sort();

    session.blue_team.clear();
    session.red_team.clear();
    for (i, name) in names.into_iter().enumerate() {
        let team = if i % 2 == 0 { protocol::Team::Blue } else { protocol::Team::Red };
        let roster = match team {
            protocol::Team::Blue => &mut session.blue_team,
            protocol::Team::Red => &mut session.red_team,
        };
        let is_captain = roster.is_empty();
        roster.push(name.clone());
        if let Some(player) = session.players.get_mut(&name) {
            player.team = Some(team);
            player.is_captain = is_captain;
        }
    }

    if session.blue_team.len() < MIN_PLAYERS_PER_TEAM_TO_START || session.red_team.len() < MIN_PLAYERS_PER_TEAM_TO_START {
        return Err(EngineError::InvalidArgs("each team needs at least two players".into()));
    }
    session.is_team_mode = true;
    Ok(())
}

pub fn reset(session: &mut Session) {
    session.reset();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn join_assigns_a_color_and_broadcasts() {
        let mut session = Session::new();
        let commands = join(&mut session, "alice".into()).unwrap();
        assert_eq!(commands.len(), 2);
        assert!(session.has_player("alice"));
    }

    #[test]
    fn join_rejects_a_full_lobby() {
        let mut session = Session::new();
        for i in 0..MAX_PLAYERS {
            join(&mut session, format!("player{i:02}")).unwrap();
        }
        assert_eq!(join(&mut session, "overflow".into()), Err(EngineError::Full));
    }

    #[test]
    fn join_rejects_a_short_name() {
        let mut session = Session::new();
        assert!(matches!(join(&mut session, "ab".into()), Err(EngineError::InvalidArgs(_))));
    }

    #[test]
    fn join_rejects_a_duplicate_name() {
        let mut session = Session::new();
        join(&mut session, "alice".into()).unwrap();
        assert_eq!(join(&mut session, "alice".into()), Err(EngineError::NameTaken));
    }

    #[test]
    fn activate_team_mode_alternates_and_assigns_captains() {
        let mut session = Session::new();
        for name in ["alice", "bob", "carol", "dave"] {
            join(&mut session, name.into()).unwrap();
        }
        activate_team_mode(&mut session).unwrap();
        assert_eq!(session.blue_team.len(), 2);
        assert_eq!(session.red_team.len(), 2);
        assert!(session.players[&session.blue_team[0]].is_captain);
        assert!(session.players[&session.red_team[0]].is_captain);
    }

    #[test]
    fn activate_team_mode_rejects_too_few_players() {
        let mut session = Session::new();
        join(&mut session, "alice".into()).unwrap();
        assert!(activate_team_mode(&mut session).is_err());
    }
}
