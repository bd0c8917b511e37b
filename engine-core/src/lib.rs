//! Networking-agnostic middleware shared by the trivia engine: the room
//! registry / message bus (§4.1), the cancellable timer scheduler (§5), the
//! dictionary (§4.8), and the `TypeHandler` contract the per-question-type
//! state machines implement (§4.11, §9).
//!
//! This crate plays the same role the teacher's `backbone-lib` plays for
//! its client-hosted games: a reusable layer game logic builds on, kept
//! free of any single game's domain types.

pub mod clock;
pub mod dictionary;
pub mod room;
pub mod traits;
