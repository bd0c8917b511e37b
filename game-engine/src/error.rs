//! Domain error kinds (spec.md §7).
//!
//! The teacher has no error enum of its own — `backbone-lib` reports
//! problems through `tracing::warn!`/`error!` and otherwise just drops bad
//! input — but every other repo in the pack reaches for `thiserror` at a
//! domain boundary like this one, and spec.md §7 enumerates a closed error
//! vocabulary the client is meant to render, so this is grounded in the
//! pack's ambient convention rather than in the teacher file-for-file.
//! Every variant maps to an `OutboundEvent::Error` sent back to the
//! offending connection only; it never stops the dispatcher loop.

use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum EngineError {
    #[error("the lobby is closed")]
    LobbyClosed,

    #[error("a game is already in progress")]
    GameInProgress,

    #[error("the lobby is full")]
    Full,

    #[error("that name is already taken")]
    NameTaken,

    #[error("that color is already taken")]
    ColorTaken,

    #[error("{0} was not found")]
    NotFound(String),

    #[error("invalid arguments: {0}")]
    InvalidArgs(String),

    #[error("it is not your turn")]
    WrongTurn,

    #[error("you already answered this question")]
    AlreadyAnswered,

    #[error("this question does not belong to you")]
    NotYourQuestion,

    #[error("there is no active question")]
    NoActiveQuestion,

    #[error("the question source is unavailable")]
    UpstreamUnavailable,
}
