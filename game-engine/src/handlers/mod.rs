//! One `TypeHandler` implementation per question-type protocol (spec.md
//! §4.5-§4.12, §9). Grounded on the teacher's `games/tic-tac-toe/src/
//! tic_tac_toe_logic/backend.rs`: a `BackEndArchitecture` implementation
//! that only ever mutates its own state and returns commands, never
//! touching a socket directly. Each module here keeps that same shape.

pub mod abcd;
pub mod blind_map;
pub mod drawing;
pub mod guess_number;
pub mod math_quiz;
pub mod open_answer;
pub mod word_chain;

use crate::session::Session;

/// True once every player who can answer (or, in team mode, every team)
/// has answered — the shared "is this question done" predicate several
/// handlers need before emitting their completion summary.
///
/// Team mode is considered done once each team is represented in
/// `answered`, however the caller tracks that: some handlers (ABCD)
/// record the team's own name as the key once it answers, others
/// (OPEN_ANSWER) record the name of whichever teammate answered
/// correctly. Both are accepted so this stays usable either way.
pub(crate) fn all_players_answered(session: &Session, answered: &std::collections::HashSet<String>) -> bool {
    if session.is_team_mode {
        let teams_answered = [protocol::Team::Blue, protocol::Team::Red]
            .into_iter()
            .filter(|t| answered.contains(&t.to_string()) || session.roster(*t).iter().any(|name| answered.contains(name)))
            .count();
        teams_answered >= 2
    } else if session.players.is_empty() {
        false
    } else {
        session.players.keys().all(|name| answered.contains(name))
    }
}
